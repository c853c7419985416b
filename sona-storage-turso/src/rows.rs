//! Row-to-type converters.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use libsql::Row;
use sona_core::embeddings::embedding_from_bytes;
use sona_core::pattern::{OutcomeType, Pattern, PatternContext, RecommendationSource, SkillFeatures};
use sona_core::store::ConsolidationRecord;
use sona_core::{Error, Result};
use uuid::Uuid;

/// Column list shared by every pattern SELECT.
pub(crate) const PATTERN_COLUMNS: &str = "pattern_id, context_embedding, skill_id, \
    skill_features, context_data, outcome_type, outcome_reward, importance, \
    original_score, source, access_count, created_at, last_accessed_at";

fn storage_err(e: impl std::fmt::Display) -> Error {
    Error::Storage(e.to_string())
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::Storage(format!("Invalid timestamp: {secs}")))
}

/// Convert a `patterns` row, validating the embedding dimension.
///
/// A mis-sized embedding blob surfaces as [`Error::CorruptEmbedding`] so
/// callers can skip the row instead of failing the query.
pub(crate) fn row_to_pattern(row: &Row, dimension: usize) -> Result<Pattern> {
    let pattern_id: String = row.get(0).map_err(storage_err)?;
    let embedding_blob: Vec<u8> = row.get(1).map_err(storage_err)?;
    let _skill_id: String = row.get(2).map_err(storage_err)?;
    let skill_features_json: String = row.get(3).map_err(storage_err)?;
    let context_data_json: String = row.get(4).map_err(storage_err)?;
    let outcome_type: String = row.get(5).map_err(storage_err)?;
    let outcome_reward: f64 = row.get(6).map_err(storage_err)?;
    let importance: f64 = row.get(7).map_err(storage_err)?;
    let original_score: f64 = row.get(8).map_err(storage_err)?;
    let source: String = row.get(9).map_err(storage_err)?;
    let access_count: i64 = row.get(10).map_err(storage_err)?;
    let created_at: i64 = row.get(11).map_err(storage_err)?;
    let last_accessed_at: i64 = row.get(12).map_err(storage_err)?;

    let id = Uuid::parse_str(&pattern_id)
        .map_err(|e| Error::Storage(format!("Invalid pattern id '{pattern_id}': {e}")))?;
    let context_embedding = embedding_from_bytes(&embedding_blob, dimension)?;

    let skill_features: SkillFeatures =
        serde_json::from_str(&skill_features_json).map_err(Error::Serialization)?;
    let context_data: PatternContext =
        serde_json::from_str(&context_data_json).map_err(Error::Serialization)?;
    let outcome_type = OutcomeType::from_str(&outcome_type).map_err(Error::Storage)?;
    let source = RecommendationSource::from_str(&source).map_err(Error::Storage)?;

    Ok(Pattern {
        id,
        context_embedding,
        skill_features,
        context_data,
        outcome_type,
        outcome_reward: outcome_reward as f32,
        importance: importance as f32,
        original_score: original_score as f32,
        source,
        access_count: access_count.max(0) as u32,
        created_at: timestamp(created_at)?,
        last_accessed_at: timestamp(last_accessed_at)?,
    })
}

/// Convert a `consolidation_history` row.
pub(crate) fn row_to_consolidation(row: &Row) -> Result<ConsolidationRecord> {
    let ts: i64 = row.get(0).map_err(storage_err)?;
    let processed: i64 = row.get(1).map_err(storage_err)?;
    let preserved: i64 = row.get(2).map_err(storage_err)?;
    let pruned: i64 = row.get(3).map_err(storage_err)?;
    let preservation_rate: f64 = row.get(4).map_err(storage_err)?;
    let duration_ms: i64 = row.get(5).map_err(storage_err)?;
    let average_importance: f64 = row.get(6).map_err(storage_err)?;

    Ok(ConsolidationRecord {
        timestamp: timestamp(ts)?,
        patterns_processed: processed.max(0) as usize,
        patterns_preserved: preserved.max(0) as usize,
        patterns_pruned: pruned.max(0) as usize,
        preservation_rate: preservation_rate as f32,
        duration_ms: duration_ms.max(0) as u64,
        average_importance: average_importance as f32,
    })
}
