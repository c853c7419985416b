//! Fisher singleton and consolidation history persistence.

use sona_core::store::{ConsolidationRecord, FisherRecord};
use sona_core::{Error, Result};
use tracing::debug;

use crate::TursoPatternStorage;
use crate::rows::row_to_consolidation;

impl TursoPatternStorage {
    pub(crate) async fn load_fisher_row(&self) -> Result<Option<FisherRecord>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT matrix_data, update_count, last_decay_at, updated_at \
                 FROM fisher_info WHERE id = 1",
                (),
            )
            .await
            .map_err(|e| Error::Storage(format!("Failed to load Fisher matrix: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("Failed to fetch Fisher row: {e}")))?
        else {
            return Ok(None);
        };

        let matrix_data: Vec<u8> = row.get(0).map_err(|e| Error::Storage(e.to_string()))?;
        let update_count: i64 = row.get(1).map_err(|e| Error::Storage(e.to_string()))?;
        let last_decay_at: Option<i64> = row.get(2).map_err(|e| Error::Storage(e.to_string()))?;
        let updated_at: i64 = row.get(3).map_err(|e| Error::Storage(e.to_string()))?;

        Ok(Some(FisherRecord {
            matrix_data,
            update_count: update_count.clamp(0, i64::from(u32::MAX)) as u32,
            last_decay_at: last_decay_at.and_then(|secs| chrono::DateTime::from_timestamp(secs, 0)),
            updated_at: chrono::DateTime::from_timestamp(updated_at, 0)
                .ok_or_else(|| Error::Storage(format!("Invalid timestamp: {updated_at}")))?,
        }))
    }

    pub(crate) async fn save_fisher_row(&self, record: &FisherRecord) -> Result<()> {
        let conn = self.connection()?;
        const SQL: &str = r#"
            INSERT OR REPLACE INTO fisher_info (id, matrix_data, update_count, last_decay_at, updated_at)
            VALUES (1, ?, ?, ?, ?)
        "#;

        let last_decay_at = match record.last_decay_at {
            Some(at) => libsql::Value::from(at.timestamp()),
            None => libsql::Value::Null,
        };
        conn.execute(
            SQL,
            libsql::params![
                record.matrix_data.clone(),
                i64::from(record.update_count),
                last_decay_at,
                record.updated_at.timestamp(),
            ],
        )
        .await
        .map_err(|e| Error::Storage(format!("Failed to save Fisher matrix: {e}")))?;
        debug!(
            bytes = record.matrix_data.len(),
            update_count = record.update_count,
            "Persisted Fisher matrix"
        );
        Ok(())
    }

    pub(crate) async fn append_consolidation_row(&self, record: &ConsolidationRecord) -> Result<()> {
        let conn = self.connection()?;
        const SQL: &str = r#"
            INSERT INTO consolidation_history (
                timestamp, patterns_processed, patterns_preserved, patterns_pruned,
                preservation_rate, duration_ms, average_importance
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;

        conn.execute(
            SQL,
            libsql::params![
                record.timestamp.timestamp(),
                record.patterns_processed as i64,
                record.patterns_preserved as i64,
                record.patterns_pruned as i64,
                f64::from(record.preservation_rate),
                record.duration_ms as i64,
                f64::from(record.average_importance),
            ],
        )
        .await
        .map_err(|e| Error::Storage(format!("Failed to append consolidation history: {e}")))?;
        Ok(())
    }

    pub(crate) async fn consolidation_history_rows(
        &self,
        limit: usize,
    ) -> Result<Vec<ConsolidationRecord>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT timestamp, patterns_processed, patterns_preserved, patterns_pruned, \
                 preservation_rate, duration_ms, average_importance \
                 FROM consolidation_history ORDER BY timestamp DESC, id DESC LIMIT ?",
                libsql::params![limit as i64],
            )
            .await
            .map_err(|e| Error::Storage(format!("Failed to query consolidation history: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Storage(format!("Failed to fetch history row: {e}")))?
        {
            records.push(row_to_consolidation(&row)?);
        }
        Ok(records)
    }
}
