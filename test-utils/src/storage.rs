//! In-memory `PatternStorage` for unit and integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sona_core::pattern::Pattern;
use sona_core::store::{ConsolidationRecord, FisherRecord, PatternFilter, PatternStorage};
use sona_core::{Error, Result};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    patterns: HashMap<Uuid, Pattern>,
    fisher: Option<FisherRecord>,
    history: Vec<ConsolidationRecord>,
}

/// HashMap-backed `PatternStorage`.
///
/// Mirrors the durable backend's observable behavior closely enough for
/// store-level tests: filtered queries, newest-first embeddings, and a
/// deterministic pseudo-random sampler.
#[derive(Default)]
pub struct MemoryPatternStorage {
    inner: Mutex<Inner>,
}

impl MemoryPatternStorage {
    /// Fresh empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct insertion for fixture setup, bypassing the store.
    pub fn seed(&self, pattern: Pattern) {
        self.inner.lock().patterns.insert(pattern.id, pattern);
    }
}

#[async_trait]
impl PatternStorage for MemoryPatternStorage {
    async fn insert_pattern(&self, pattern: &Pattern) -> Result<()> {
        self.inner
            .lock()
            .patterns
            .insert(pattern.id, pattern.clone());
        Ok(())
    }

    async fn get_pattern(&self, id: Uuid) -> Result<Option<Pattern>> {
        Ok(self.inner.lock().patterns.get(&id).cloned())
    }

    async fn update_pattern(&self, pattern: &Pattern) -> Result<()> {
        let mut inner = self.inner.lock();
        let existing = inner
            .patterns
            .get_mut(&pattern.id)
            .ok_or(Error::NotFound(pattern.id))?;
        existing.importance = pattern.importance;
        existing.access_count = pattern.access_count;
        existing.last_accessed_at = pattern.last_accessed_at;
        Ok(())
    }

    async fn update_importances(&self, updates: &[(Uuid, f32)]) -> Result<()> {
        let mut inner = self.inner.lock();
        for (id, importance) in updates {
            if let Some(pattern) = inner.patterns.get_mut(id) {
                pattern.importance = *importance;
            }
        }
        Ok(())
    }

    async fn record_access(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock();
        for id in ids {
            if let Some(pattern) = inner.patterns.get_mut(id) {
                pattern.access_count += 1;
                pattern.last_accessed_at = at;
            }
        }
        Ok(())
    }

    async fn query_patterns(&self, filter: &PatternFilter) -> Result<Vec<Pattern>> {
        let inner = self.inner.lock();
        let mut matching: Vec<Pattern> = inner
            .patterns
            .values()
            .filter(|pattern| filter.matches(pattern))
            .cloned()
            .collect();
        matching.sort_by_key(|pattern| std::cmp::Reverse(pattern.created_at));
        if let Some(limit) = filter.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn all_patterns(&self) -> Result<Vec<Pattern>> {
        self.query_patterns(&PatternFilter::default()).await
    }

    async fn delete_patterns(&self, ids: &[Uuid]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let mut deleted = 0;
        for id in ids {
            if inner.patterns.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn count_patterns(&self) -> Result<usize> {
        Ok(self.inner.lock().patterns.len())
    }

    async fn recent_embeddings(&self, limit: usize) -> Result<Vec<Vec<f32>>> {
        let inner = self.inner.lock();
        let mut patterns: Vec<&Pattern> = inner.patterns.values().collect();
        patterns.sort_by_key(|pattern| std::cmp::Reverse(pattern.created_at));
        Ok(patterns
            .into_iter()
            .take(limit)
            .map(|pattern| pattern.context_embedding.clone())
            .collect())
    }

    async fn sample_patterns(&self, limit: usize) -> Result<Vec<Pattern>> {
        let inner = self.inner.lock();
        let mut candidates: Vec<&Pattern> = inner.patterns.values().collect();
        candidates.sort_by_key(|pattern| pattern.id);
        let len = candidates.len();
        if limit == 0 || len == 0 {
            return Ok(Vec::new());
        }

        // Deterministic partial shuffle so tests are reproducible.
        let mut rng = ChaCha8Rng::seed_from_u64(len as u64);
        let take = limit.min(len);
        let mut indices: Vec<usize> = (0..len).collect();
        for i in 0..take {
            let j = rng.random_range(i..len);
            indices.swap(i, j);
        }
        Ok(indices
            .into_iter()
            .take(take)
            .map(|i| candidates[i].clone())
            .collect())
    }

    async fn load_fisher(&self) -> Result<Option<FisherRecord>> {
        Ok(self.inner.lock().fisher.clone())
    }

    async fn save_fisher(&self, record: &FisherRecord) -> Result<()> {
        self.inner.lock().fisher = Some(record.clone());
        Ok(())
    }

    async fn append_consolidation(&self, record: &ConsolidationRecord) -> Result<()> {
        self.inner.lock().history.push(record.clone());
        Ok(())
    }

    async fn consolidation_history(&self, limit: usize) -> Result<Vec<ConsolidationRecord>> {
        let inner = self.inner.lock();
        Ok(inner.history.iter().rev().take(limit).cloned().collect())
    }
}
