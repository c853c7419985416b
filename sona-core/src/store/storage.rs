//! Storage contract consumed by the pattern store.
//!
//! One durable implementation lives in `sona-storage-turso`; the
//! `test-utils` crate provides an in-memory implementation for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::Result;
use crate::pattern::{OutcomeType, Pattern};

/// Candidate filter for pattern queries.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    /// Restrict to a single skill
    pub skill_id: Option<String>,
    /// Restrict to a skill category
    pub category: Option<String>,
    /// Restrict to a single outcome class
    pub outcome_type: Option<OutcomeType>,
    /// Drop rows below this importance
    pub min_importance: Option<f32>,
    /// Keep only rows with positive reward
    pub positive_only: bool,
    /// Cap the number of rows returned
    pub limit: Option<usize>,
}

impl PatternFilter {
    /// Filter matching every pattern for one skill.
    #[must_use]
    pub fn for_skill(skill_id: impl Into<String>) -> Self {
        Self {
            skill_id: Some(skill_id.into()),
            ..Self::default()
        }
    }

    /// Whether `pattern` passes this filter (limit excluded).
    #[must_use]
    pub fn matches(&self, pattern: &Pattern) -> bool {
        if let Some(ref skill_id) = self.skill_id {
            if pattern.skill_features.skill_id != *skill_id {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if pattern.skill_features.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(outcome_type) = self.outcome_type {
            if pattern.outcome_type != outcome_type {
                return false;
            }
        }
        if let Some(min_importance) = self.min_importance {
            if pattern.importance < min_importance {
                return false;
            }
        }
        if self.positive_only && pattern.outcome_reward <= 0.0 {
            return false;
        }
        true
    }
}

/// Persisted Fisher matrix singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FisherRecord {
    /// Serialized matrix (`4 + 8·D` bytes)
    pub matrix_data: Vec<u8>,
    /// Update count mirrored out of the blob for quick inspection
    pub update_count: u32,
    /// When decay last ran
    pub last_decay_at: Option<DateTime<Utc>>,
    /// Last write time
    pub updated_at: DateTime<Utc>,
}

/// One consolidation history row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationRecord {
    /// When the pass ran
    pub timestamp: DateTime<Utc>,
    /// Patterns examined
    pub patterns_processed: usize,
    /// Patterns kept
    pub patterns_preserved: usize,
    /// Patterns deleted
    pub patterns_pruned: usize,
    /// preserved / (preserved + pruned), 1.0 when nothing was at stake
    pub preservation_rate: f32,
    /// Wall-clock duration of the pass
    pub duration_ms: u64,
    /// Mean importance of surviving patterns
    pub average_importance: f32,
}

/// Persistence contract for the EWC++ pattern store.
///
/// All operations are async and atomic per call: a failed call leaves the
/// backing store unchanged.
#[async_trait]
pub trait PatternStorage: Send + Sync {
    /// Insert a new pattern row.
    async fn insert_pattern(&self, pattern: &Pattern) -> Result<()>;

    /// Fetch one pattern by id.
    async fn get_pattern(&self, id: Uuid) -> Result<Option<Pattern>>;

    /// Overwrite the mutable fields of an existing pattern
    /// (`importance`, `access_count`, `last_accessed_at`).
    async fn update_pattern(&self, pattern: &Pattern) -> Result<()>;

    /// Batch-update importances, keyed by pattern id.
    async fn update_importances(&self, updates: &[(Uuid, f32)]) -> Result<()>;

    /// Increment `access_count` and stamp `last_accessed_at` for `ids`.
    async fn record_access(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<()>;

    /// Fetch patterns matching `filter`.
    async fn query_patterns(&self, filter: &PatternFilter) -> Result<Vec<Pattern>>;

    /// Fetch every stored pattern.
    async fn all_patterns(&self) -> Result<Vec<Pattern>>;

    /// Delete the given patterns, returning how many rows went away.
    async fn delete_patterns(&self, ids: &[Uuid]) -> Result<usize>;

    /// Total number of stored patterns.
    async fn count_patterns(&self) -> Result<usize>;

    /// Embeddings of the most recently created patterns, newest first.
    async fn recent_embeddings(&self, limit: usize) -> Result<Vec<Vec<f32>>>;

    /// Uniformly sampled patterns for Fisher refresh.
    async fn sample_patterns(&self, limit: usize) -> Result<Vec<Pattern>>;

    /// Load the Fisher singleton, if one was ever saved.
    async fn load_fisher(&self) -> Result<Option<FisherRecord>>;

    /// Overwrite the Fisher singleton.
    async fn save_fisher(&self, record: &FisherRecord) -> Result<()>;

    /// Append one consolidation history row.
    async fn append_consolidation(&self, record: &ConsolidationRecord) -> Result<()>;

    /// Most recent consolidation rows, newest first.
    async fn consolidation_history(&self, limit: usize) -> Result<Vec<ConsolidationRecord>>;
}
