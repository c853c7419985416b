//! Consolidation: Fisher decay, importance recomputation, and pruning.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Result;
use crate::pattern::pattern_importance;

use super::storage::ConsolidationRecord;
use super::{PatternStore, subtract};

/// Outcome of one consolidation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationReport {
    /// Patterns examined
    pub processed: usize,
    /// Patterns kept
    pub preserved: usize,
    /// Patterns deleted
    pub pruned: usize,
    /// preserved / (preserved + pruned); 1.0 when nothing was at stake
    pub preservation_rate: f32,
    /// Wall-clock duration of the pass
    pub duration_ms: u64,
    /// Mean importance of surviving patterns
    pub avg_importance: f32,
    /// True when the pass returned early without touching the store
    pub skipped: bool,
}

impl ConsolidationReport {
    fn noop(total: usize) -> Self {
        Self {
            processed: total,
            preserved: total,
            pruned: 0,
            preservation_rate: 1.0,
            duration_ms: 0,
            avg_importance: 0.0,
            skipped: true,
        }
    }
}

impl PatternStore {
    /// Run one consolidation pass.
    ///
    /// Returns a no-op report when the new-pattern ratio is below the
    /// configured threshold and the store is not over capacity. A real
    /// pass decays the Fisher matrix, refreshes it from a random pattern
    /// sample, recomputes every pattern's importance, prunes the
    /// low-importance tail, and appends a history row.
    ///
    /// A preservation rate below 0.95 is an observability signal, not an
    /// error: it is logged and recorded in history only.
    pub async fn consolidate(&self) -> Result<ConsolidationReport> {
        let started = std::time::Instant::now();
        let now = Utc::now();
        let config = self.config().clone();

        let total = self.storage.count_patterns().await?;
        let since = self.state.lock().patterns_since_consolidation;
        let new_ratio = if total == 0 {
            0.0
        } else {
            since as f32 / total as f32
        };
        let overfull = total > config.max_patterns;

        if new_ratio < config.consolidation_threshold && !overfull {
            debug!(new_ratio, total, "Consolidation skipped: too little new data");
            return Ok(ConsolidationReport::noop(total));
        }

        // Decay old evidence, then refresh from a random sample so the
        // matrix tracks the current distribution, not just history.
        {
            self.fisher.lock().decay(config.fisher_decay)?;
        }
        let average = self.average_embedding().await?;
        let samples = self
            .storage
            .sample_patterns(config.fisher_sample_size)
            .await?;
        let gradients: Vec<Vec<f32>> = samples
            .iter()
            .map(|pattern| subtract(&pattern.context_embedding, &average))
            .collect();
        {
            let mut fisher = self.fisher.lock();
            for gradient in &gradients {
                fisher.update(gradient)?;
            }
        }

        // Re-score everything under the refreshed matrix.
        let mut patterns = self.storage.all_patterns().await?;
        let fisher_importance = self.fisher.lock().importance_vector().to_vec();
        for pattern in &mut patterns {
            pattern.importance =
                pattern_importance(pattern, &fisher_importance, config.ewc_lambda, now);
        }
        let updates: Vec<(Uuid, f32)> = patterns
            .iter()
            .map(|pattern| (pattern.id, pattern.importance))
            .collect();
        self.storage.update_importances(&updates).await?;

        // Prune: over capacity, only the lowest-importance excess below the
        // threshold goes; otherwise only near-zero importance goes.
        patterns.sort_by(|a, b| {
            a.importance
                .partial_cmp(&b.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut pruned_ids: Vec<Uuid> = Vec::new();
        if overfull {
            let excess = total - config.max_patterns;
            for pattern in patterns.iter().take(excess) {
                if pattern.importance < config.importance_threshold {
                    pruned_ids.push(pattern.id);
                }
            }
        } else {
            for pattern in &patterns {
                if pattern.importance < 0.1 * config.importance_threshold {
                    pruned_ids.push(pattern.id);
                }
            }
        }
        let pruned = self.storage.delete_patterns(&pruned_ids).await?;

        let processed = patterns.len();
        let preserved = processed.saturating_sub(pruned);
        let preservation_rate = if preserved + pruned == 0 {
            1.0
        } else {
            preserved as f32 / (preserved + pruned) as f32
        };
        if preservation_rate < 0.95 {
            warn!(
                preservation_rate,
                pruned, "Consolidation preserved less than 95% of patterns"
            );
        }

        let surviving: Vec<&crate::pattern::Pattern> = patterns
            .iter()
            .filter(|pattern| !pruned_ids.contains(&pattern.id))
            .collect();
        let avg_importance = if surviving.is_empty() {
            0.0
        } else {
            surviving.iter().map(|p| p.importance).sum::<f32>() / surviving.len() as f32
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let record = ConsolidationRecord {
            timestamp: now,
            patterns_processed: processed,
            patterns_preserved: preserved,
            patterns_pruned: pruned,
            preservation_rate,
            duration_ms,
            average_importance: avg_importance,
        };
        self.storage.append_consolidation(&record).await?;

        {
            let mut state = self.state.lock();
            state.patterns_since_consolidation = 0;
            state.last_consolidation = now;
            state.last_decay_at = Some(now);
        }
        self.persist_fisher(now).await?;

        info!(
            processed,
            preserved, pruned, preservation_rate, duration_ms, "Consolidation completed"
        );
        Ok(ConsolidationReport {
            processed,
            preserved,
            pruned,
            preservation_rate,
            duration_ms,
            avg_importance,
            skipped: false,
        })
    }
}

