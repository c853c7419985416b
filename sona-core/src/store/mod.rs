//! EWC++ pattern store.
//!
//! Persistent, importance-weighted memory of (context → skill → outcome)
//! tuples. Near-duplicate recordings merge into the existing pattern, every
//! insertion feeds the Fisher matrix, and periodic consolidation re-scores
//! and prunes so the store learns continuously without forgetting the
//! patterns that mattered.

mod consolidation;
mod metrics;
mod storage;

pub use crate::config::PatternStoreConfig;
pub use consolidation::ConsolidationReport;
pub use metrics::QueryStats;
pub use storage::{ConsolidationRecord, FisherRecord, PatternFilter, PatternStorage};

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::embeddings::{EmbeddingProvider, cosine_similarity, importance_weighted_similarity};
use crate::error::{Error, Result};
use crate::ewc::FisherMatrix;
use crate::pattern::{
    Pattern, PatternDraft, RecordedOutcome, SimilarPattern, SimilarityQuery, initial_importance,
    pattern_importance,
};

use metrics::QueryLatencyWindow;

/// How many same-skill candidates the dedup probe inspects.
const DEDUP_PROBE_K: usize = 5;

pub(crate) struct StoreState {
    pub(crate) patterns_since_consolidation: usize,
    pub(crate) last_consolidation: DateTime<Utc>,
    pub(crate) last_decay_at: Option<DateTime<Utc>>,
}

/// Persistent store of recommendation patterns with EWC++ consolidation.
///
/// Designed for single-threaded cooperative use per logical caller;
/// concurrent callers are serialized by the interior locks. The Fisher
/// matrix and the storage handle are owned by this instance and never
/// shared.
pub struct PatternStore {
    storage: Arc<dyn PatternStorage>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: PatternStoreConfig,
    fisher: Mutex<FisherMatrix>,
    state: Mutex<StoreState>,
    latency: Mutex<QueryLatencyWindow>,
}

impl PatternStore {
    /// Open a store over `storage`, restoring the persisted Fisher matrix.
    ///
    /// A corrupt Fisher blob resets the matrix and continues with a
    /// warning; it is never fatal.
    pub async fn open(
        storage: Arc<dyn PatternStorage>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: PatternStoreConfig,
    ) -> Result<Self> {
        config.validate()?;
        if embedder.dimension() != config.embedding_dimension {
            return Err(Error::Configuration(format!(
                "embedder dimension {} does not match configured dimension {}",
                embedder.dimension(),
                config.embedding_dimension
            )));
        }

        let mut fisher = FisherMatrix::new(config.embedding_dimension);
        if let Some(record) = storage.load_fisher().await? {
            match fisher.load(&record.matrix_data) {
                Ok(()) => {
                    debug!(
                        update_count = fisher.update_count(),
                        "Restored Fisher matrix"
                    );
                }
                Err(err) => {
                    warn!("Discarding corrupt Fisher matrix: {err}");
                }
            }
        }

        let last_consolidation = storage
            .consolidation_history(1)
            .await?
            .first()
            .map_or(DateTime::<Utc>::UNIX_EPOCH, |record| record.timestamp);

        Ok(Self {
            storage,
            embedder,
            config,
            fisher: Mutex::new(fisher),
            state: Mutex::new(StoreState {
                patterns_since_consolidation: 0,
                last_consolidation,
                last_decay_at: None,
            }),
            latency: Mutex::new(QueryLatencyWindow::new()),
        })
    }

    /// Record an outcome for a recommendation.
    ///
    /// A near-duplicate of an existing same-skill pattern (cosine above the
    /// configured dedup threshold) updates that pattern in place and
    /// returns its id; otherwise a new pattern is inserted. Either way the
    /// Fisher matrix absorbs the recording, and consolidation runs
    /// synchronously when due and enabled.
    pub async fn store_pattern(
        &self,
        draft: PatternDraft,
        outcome: RecordedOutcome,
    ) -> Result<Uuid> {
        if draft.skill_features.skill_id.is_empty() {
            return Err(Error::InvalidInput(
                "pattern draft requires a skill_id".to_string(),
            ));
        }

        let query_embedding = self.embedder.embed(&draft.context_data.embedding_text());
        let now = Utc::now();

        // Dedup probe: closest same-skill patterns, any outcome sign.
        let candidates = self
            .storage
            .query_patterns(&PatternFilter::for_skill(&draft.skill_features.skill_id))
            .await?;
        let mut scored: Vec<(f32, Pattern)> = candidates
            .into_iter()
            .map(|pattern| {
                let similarity = cosine_similarity(&query_embedding, &pattern.context_embedding);
                (similarity, pattern)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(DEDUP_PROBE_K);

        if let Some((similarity, existing)) = scored.into_iter().next() {
            if similarity > self.config.dedup_similarity {
                debug!(
                    pattern_id = %existing.id,
                    similarity,
                    "Near-duplicate recording merged into existing pattern"
                );
                return self.merge_into_existing(existing, &query_embedding, now).await;
            }
        }

        self.insert_new(draft, outcome, query_embedding, now).await
    }

    async fn merge_into_existing(
        &self,
        mut existing: Pattern,
        query_embedding: &[f32],
        now: DateTime<Utc>,
    ) -> Result<Uuid> {
        let gradient = subtract(query_embedding, &existing.context_embedding);
        let fisher_importance = {
            let mut fisher = self.fisher.lock();
            fisher.update(&gradient)?;
            fisher.importance_vector().to_vec()
        };

        existing.importance =
            pattern_importance(&existing, &fisher_importance, self.config.ewc_lambda, now);
        existing.access_count += 1;
        existing.last_accessed_at = now;

        self.storage.update_pattern(&existing).await?;
        self.persist_fisher(now).await?;
        Ok(existing.id)
    }

    async fn insert_new(
        &self,
        draft: PatternDraft,
        outcome: RecordedOutcome,
        query_embedding: Vec<f32>,
        now: DateTime<Utc>,
    ) -> Result<Uuid> {
        let reward = outcome.reward();
        let importance =
            initial_importance(reward, draft.confidence, self.config.importance_threshold);

        let pattern = Pattern {
            id: Uuid::new_v4(),
            context_embedding: query_embedding.clone(),
            skill_features: draft.skill_features,
            context_data: draft.context_data,
            outcome_type: outcome.outcome_type,
            outcome_reward: reward,
            importance,
            original_score: draft.original_score.clamp(0.0, 1.0),
            source: draft.source,
            access_count: 0,
            created_at: now,
            last_accessed_at: now,
        };
        // Mean over embeddings stored so far; zero vector for the first
        // pattern, so its gradient is the embedding itself.
        let average = self.average_embedding().await?;
        self.storage.insert_pattern(&pattern).await?;

        let gradient = subtract(&query_embedding, &average);
        {
            self.fisher.lock().update(&gradient)?;
        }

        {
            let mut state = self.state.lock();
            state.patterns_since_consolidation += 1;
        }

        if self.config.auto_consolidate && self.should_consolidate().await? {
            self.consolidate().await?;
        }

        self.persist_fisher(now).await?;
        info!(
            pattern_id = %pattern.id,
            skill_id = %pattern.skill_features.skill_id,
            outcome = %pattern.outcome_type,
            "Stored pattern"
        );
        Ok(pattern.id)
    }

    /// Rank stored patterns against a query context.
    ///
    /// Candidates pass the query's filters, then sort by Fisher-weighted
    /// cosine similarity. The top K get their `access_count` bumped when
    /// access tracking is enabled.
    pub async fn find_similar_patterns(
        &self,
        query: &SimilarityQuery,
        limit: usize,
    ) -> Result<Vec<SimilarPattern>> {
        let started = std::time::Instant::now();
        let query_embedding = self.embedder.embed(&query.context.embedding_text());

        let filter = PatternFilter {
            skill_id: query.skill_id.clone(),
            category: query.category.clone(),
            outcome_type: query.outcome_type,
            min_importance: query.min_importance,
            positive_only: query.positive_only,
            limit: None,
        };
        let candidates = self.storage.query_patterns(&filter).await?;
        let fisher_importance = self.fisher.lock().importance_vector().to_vec();

        let mut results: Vec<SimilarPattern> = candidates
            .into_iter()
            .map(|pattern| {
                let similarity = cosine_similarity(&query_embedding, &pattern.context_embedding);
                let weighted_similarity = importance_weighted_similarity(
                    &query_embedding,
                    &pattern.context_embedding,
                    &fisher_importance,
                );
                SimilarPattern {
                    pattern,
                    similarity,
                    weighted_similarity,
                    rank: 0,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.weighted_similarity
                .partial_cmp(&a.weighted_similarity)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(limit);
        for (index, result) in results.iter_mut().enumerate() {
            result.rank = index + 1;
        }

        if self.config.track_access && !results.is_empty() {
            let now = Utc::now();
            let ids: Vec<Uuid> = results.iter().map(|r| r.pattern.id).collect();
            self.storage.record_access(&ids, now).await?;
            for result in &mut results {
                result.pattern.access_count += 1;
                result.pattern.last_accessed_at = now;
            }
        }

        self.latency
            .lock()
            .record(started.elapsed().as_secs_f64() * 1000.0);
        debug!(
            results = results.len(),
            limit, "Similarity query completed"
        );
        Ok(results)
    }

    /// Whether a consolidation pass is due.
    ///
    /// Requires the configured interval since the last pass AND either the
    /// new-pattern ratio crossing its threshold or the store running close
    /// to capacity.
    pub async fn should_consolidate(&self) -> Result<bool> {
        let (since, last) = {
            let state = self.state.lock();
            (state.patterns_since_consolidation, state.last_consolidation)
        };

        let interval = chrono::TimeDelta::from_std(self.config.consolidation_interval)
            .unwrap_or(chrono::TimeDelta::MAX);
        if Utc::now().signed_duration_since(last) < interval {
            return Ok(false);
        }

        let total = self.storage.count_patterns().await?;
        if total == 0 {
            return Ok(false);
        }

        let new_ratio = since as f32 / total as f32;
        Ok(new_ratio >= self.config.consolidation_threshold
            || total as f32 > 0.9 * self.config.max_patterns as f32)
    }

    /// Fetch a read-only snapshot of one pattern.
    pub async fn get_pattern(&self, id: Uuid) -> Result<Option<Pattern>> {
        self.storage.get_pattern(id).await
    }

    /// Total number of stored patterns.
    pub async fn pattern_count(&self) -> Result<usize> {
        self.storage.count_patterns().await
    }

    /// Most recent consolidation history rows, newest first.
    pub async fn consolidation_history(&self, limit: usize) -> Result<Vec<ConsolidationRecord>> {
        self.storage.consolidation_history(limit).await
    }

    /// Snapshot of recent similarity-query latencies.
    #[must_use]
    pub fn query_stats(&self) -> QueryStats {
        self.latency.lock().snapshot()
    }

    /// Clone of the current Fisher matrix.
    #[must_use]
    pub fn fisher_snapshot(&self) -> FisherMatrix {
        self.fisher.lock().clone()
    }

    /// Store configuration.
    #[must_use]
    pub fn config(&self) -> &PatternStoreConfig {
        &self.config
    }

    pub(crate) async fn persist_fisher(&self, now: DateTime<Utc>) -> Result<()> {
        let (matrix_data, update_count) = {
            let fisher = self.fisher.lock();
            (fisher.serialize(), fisher.update_count())
        };
        let last_decay_at = self.state.lock().last_decay_at;
        self.storage
            .save_fisher(&FisherRecord {
                matrix_data,
                update_count,
                last_decay_at,
                updated_at: now,
            })
            .await
    }

    /// Mean of the newest stored embeddings, or the zero vector when the
    /// store is empty. Rows with a foreign dimension are skipped with a
    /// warning.
    pub(crate) async fn average_embedding(&self) -> Result<Vec<f32>> {
        let dimension = self.config.embedding_dimension;
        let embeddings = self
            .storage
            .recent_embeddings(self.config.avg_embedding_sample)
            .await?;

        let mut sum = vec![0.0f32; dimension];
        let mut used = 0usize;
        for embedding in &embeddings {
            if embedding.len() == dimension {
                for (slot, value) in sum.iter_mut().zip(embedding) {
                    *slot += value;
                }
                used += 1;
            } else {
                warn!(
                    expected = dimension,
                    actual = embedding.len(),
                    "Skipping stored embedding with mismatched dimension"
                );
            }
        }

        if used > 0 {
            for slot in &mut sum {
                *slot /= used as f32;
            }
        }
        Ok(sum)
    }
}

pub(crate) fn subtract(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter()
        .zip(b)
        .map(|(x, y)| x - y)
        .collect()
}

