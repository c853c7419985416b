//! `PatternStorage` implementation wiring.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sona_core::Result;
use sona_core::pattern::Pattern;
use sona_core::store::{ConsolidationRecord, FisherRecord, PatternFilter, PatternStorage};
use uuid::Uuid;

use crate::TursoPatternStorage;

#[async_trait]
impl PatternStorage for TursoPatternStorage {
    async fn insert_pattern(&self, pattern: &Pattern) -> Result<()> {
        self.insert_pattern_row(pattern).await
    }

    async fn get_pattern(&self, id: Uuid) -> Result<Option<Pattern>> {
        self.get_pattern_row(id).await
    }

    async fn update_pattern(&self, pattern: &Pattern) -> Result<()> {
        self.update_pattern_row(pattern).await
    }

    async fn update_importances(&self, updates: &[(Uuid, f32)]) -> Result<()> {
        self.update_importances_rows(updates).await
    }

    async fn record_access(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<()> {
        self.record_access_rows(ids, at).await
    }

    async fn query_patterns(&self, filter: &PatternFilter) -> Result<Vec<Pattern>> {
        self.query_pattern_rows(filter).await
    }

    async fn all_patterns(&self) -> Result<Vec<Pattern>> {
        self.query_pattern_rows(&PatternFilter::default()).await
    }

    async fn delete_patterns(&self, ids: &[Uuid]) -> Result<usize> {
        self.delete_pattern_rows(ids).await
    }

    async fn count_patterns(&self) -> Result<usize> {
        self.count_pattern_rows().await
    }

    async fn recent_embeddings(&self, limit: usize) -> Result<Vec<Vec<f32>>> {
        self.recent_embedding_rows(limit).await
    }

    async fn sample_patterns(&self, limit: usize) -> Result<Vec<Pattern>> {
        self.sample_pattern_rows(limit).await
    }

    async fn load_fisher(&self) -> Result<Option<FisherRecord>> {
        self.load_fisher_row().await
    }

    async fn save_fisher(&self, record: &FisherRecord) -> Result<()> {
        self.save_fisher_row(record).await
    }

    async fn append_consolidation(&self, record: &ConsolidationRecord) -> Result<()> {
        self.append_consolidation_row(record).await
    }

    async fn consolidation_history(&self, limit: usize) -> Result<Vec<ConsolidationRecord>> {
        self.consolidation_history_rows(limit).await
    }
}
