//! Pattern CRUD and query operations.

use chrono::{DateTime, Utc};
use libsql::params_from_iter;
use sona_core::embeddings::embedding_to_bytes;
use sona_core::pattern::Pattern;
use sona_core::store::PatternFilter;
use sona_core::{Error, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::TursoPatternStorage;
use crate::rows::{PATTERN_COLUMNS, row_to_pattern};

fn placeholders(count: usize) -> String {
    std::iter::repeat_n("?", count).collect::<Vec<_>>().join(", ")
}

impl TursoPatternStorage {
    pub(crate) async fn insert_pattern_row(&self, pattern: &Pattern) -> Result<()> {
        debug!(pattern_id = %pattern.id, "Storing pattern");
        let conn = self.connection()?;

        const SQL: &str = r#"
            INSERT INTO patterns (
                pattern_id, context_embedding, skill_id, skill_features, context_data,
                outcome_type, outcome_reward, importance, original_score, source,
                access_count, created_at, last_accessed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let skill_features =
            serde_json::to_string(&pattern.skill_features).map_err(Error::Serialization)?;
        let context_data =
            serde_json::to_string(&pattern.context_data).map_err(Error::Serialization)?;

        conn.execute(
            SQL,
            libsql::params![
                pattern.id.to_string(),
                embedding_to_bytes(&pattern.context_embedding),
                pattern.skill_features.skill_id.clone(),
                skill_features,
                context_data,
                pattern.outcome_type.to_string(),
                f64::from(pattern.outcome_reward),
                f64::from(pattern.importance),
                f64::from(pattern.original_score),
                pattern.source.to_string(),
                i64::from(pattern.access_count),
                pattern.created_at.timestamp(),
                pattern.last_accessed_at.timestamp(),
            ],
        )
        .await
        .map_err(|e| Error::Storage(format!("Failed to store pattern: {e}")))?;
        Ok(())
    }

    pub(crate) async fn get_pattern_row(&self, id: Uuid) -> Result<Option<Pattern>> {
        let conn = self.connection()?;
        let sql = format!("SELECT {PATTERN_COLUMNS} FROM patterns WHERE pattern_id = ?");

        let mut rows = conn
            .query(&sql, libsql::params![id.to_string()])
            .await
            .map_err(|e| Error::Storage(format!("Failed to query pattern: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("Failed to fetch pattern row: {e}")))?
        {
            Some(row) => Ok(Some(row_to_pattern(&row, self.dimension())?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn update_pattern_row(&self, pattern: &Pattern) -> Result<()> {
        let conn = self.connection()?;
        const SQL: &str = r#"
            UPDATE patterns
            SET importance = ?, access_count = ?, last_accessed_at = ?
            WHERE pattern_id = ?
        "#;

        let affected = conn
            .execute(
                SQL,
                libsql::params![
                    f64::from(pattern.importance),
                    i64::from(pattern.access_count),
                    pattern.last_accessed_at.timestamp(),
                    pattern.id.to_string(),
                ],
            )
            .await
            .map_err(|e| Error::Storage(format!("Failed to update pattern: {e}")))?;

        if affected == 0 {
            return Err(Error::NotFound(pattern.id));
        }
        Ok(())
    }

    pub(crate) async fn update_importances_rows(&self, updates: &[(Uuid, f32)]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let conn = self.connection()?;
        const SQL: &str = "UPDATE patterns SET importance = ? WHERE pattern_id = ?";

        for (id, importance) in updates {
            conn.execute(
                SQL,
                libsql::params![f64::from(*importance), id.to_string()],
            )
            .await
            .map_err(|e| Error::Storage(format!("Failed to update importance: {e}")))?;
        }
        Ok(())
    }

    pub(crate) async fn record_access_rows(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.connection()?;
        let sql = format!(
            "UPDATE patterns SET access_count = access_count + 1, last_accessed_at = ? \
             WHERE pattern_id IN ({})",
            placeholders(ids.len())
        );

        let mut params: Vec<libsql::Value> = vec![libsql::Value::from(at.timestamp())];
        params.extend(ids.iter().map(|id| libsql::Value::from(id.to_string())));

        conn.execute(&sql, params_from_iter(params))
            .await
            .map_err(|e| Error::Storage(format!("Failed to record access: {e}")))?;
        Ok(())
    }

    pub(crate) async fn query_pattern_rows(&self, filter: &PatternFilter) -> Result<Vec<Pattern>> {
        let conn = self.connection()?;

        let mut sql = format!("SELECT {PATTERN_COLUMNS} FROM patterns WHERE 1=1");
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref skill_id) = filter.skill_id {
            sql.push_str(" AND skill_id = ?");
            params.push(libsql::Value::from(skill_id.clone()));
        }
        if let Some(ref category) = filter.category {
            sql.push_str(" AND json_extract(skill_features, '$.category') = ?");
            params.push(libsql::Value::from(category.clone()));
        }
        if let Some(outcome_type) = filter.outcome_type {
            sql.push_str(" AND outcome_type = ?");
            params.push(libsql::Value::from(outcome_type.to_string()));
        }
        if let Some(min_importance) = filter.min_importance {
            sql.push_str(" AND importance >= ?");
            params.push(libsql::Value::from(f64::from(min_importance)));
        }
        if filter.positive_only {
            sql.push_str(" AND outcome_reward > 0");
        }
        sql.push_str(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params.push(libsql::Value::from(limit as i64));
        }

        let mut rows = conn
            .query(&sql, params_from_iter(params))
            .await
            .map_err(|e| Error::Storage(format!("Failed to query patterns: {e}")))?;

        let mut patterns = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("Failed to fetch pattern row: {e}")))?
        {
            match row_to_pattern(&row, self.dimension()) {
                Ok(pattern) => patterns.push(pattern),
                Err(err) if err.is_corruption() => {
                    warn!("Skipping corrupt pattern row: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(patterns)
    }

    pub(crate) async fn delete_pattern_rows(&self, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = self.connection()?;
        let sql = format!(
            "DELETE FROM patterns WHERE pattern_id IN ({})",
            placeholders(ids.len())
        );
        let params: Vec<libsql::Value> = ids
            .iter()
            .map(|id| libsql::Value::from(id.to_string()))
            .collect();

        let deleted = conn
            .execute(&sql, params_from_iter(params))
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete patterns: {e}")))?;
        Ok(deleted as usize)
    }

    pub(crate) async fn count_pattern_rows(&self) -> Result<usize> {
        let conn = self.connection()?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM patterns", ())
            .await
            .map_err(|e| Error::Storage(format!("Failed to count patterns: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("Failed to fetch count: {e}")))?
            .ok_or_else(|| Error::Storage("COUNT query returned no rows".to_string()))?;
        let count: i64 = row.get(0).map_err(|e| Error::Storage(e.to_string()))?;
        Ok(count.max(0) as usize)
    }

    pub(crate) async fn recent_embedding_rows(&self, limit: usize) -> Result<Vec<Vec<f32>>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT context_embedding FROM patterns ORDER BY created_at DESC LIMIT ?",
                libsql::params![limit as i64],
            )
            .await
            .map_err(|e| Error::Storage(format!("Failed to query embeddings: {e}")))?;

        let mut embeddings = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("Failed to fetch embedding row: {e}")))?
        {
            let blob: Vec<u8> = row.get(0).map_err(|e| Error::Storage(e.to_string()))?;
            match sona_core::embeddings::embedding_from_bytes(&blob, self.dimension()) {
                Ok(embedding) => embeddings.push(embedding),
                Err(err) => warn!("Skipping corrupt embedding blob: {err}"),
            }
        }
        Ok(embeddings)
    }

    pub(crate) async fn sample_pattern_rows(&self, limit: usize) -> Result<Vec<Pattern>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.connection()?;
        let sql = format!("SELECT {PATTERN_COLUMNS} FROM patterns ORDER BY RANDOM() LIMIT ?");
        let mut rows = conn
            .query(&sql, libsql::params![limit as i64])
            .await
            .map_err(|e| Error::Storage(format!("Failed to sample patterns: {e}")))?;

        let mut patterns = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("Failed to fetch sampled row: {e}")))?
        {
            match row_to_pattern(&row, self.dimension()) {
                Ok(pattern) => patterns.push(pattern),
                Err(err) if err.is_corruption() => {
                    warn!("Skipping corrupt pattern row in sample: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(patterns)
    }
}
