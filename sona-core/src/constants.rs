//! Global constants for the skill-discovery core
//!
//! Centralizes the magic numbers shared across the pattern store, router,
//! and swarm so configuration defaults stay in one place.

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    // Embeddings
    pub const EMBEDDING_DIMENSION: usize = 384;

    // Pattern store
    pub const MAX_PATTERNS: usize = 10_000;
    pub const IMPORTANCE_THRESHOLD: f32 = 0.01;
    pub const DEDUP_SIMILARITY: f32 = 0.95;
    pub const CONSOLIDATION_THRESHOLD: f32 = 0.1;
    pub const CONSOLIDATION_INTERVAL: Duration = Duration::from_secs(3600);
    pub const FISHER_DECAY: f32 = 0.95;
    pub const FISHER_SAMPLE_SIZE: usize = 50;
    pub const EWC_LAMBDA: f32 = 1.0;
    pub const AVG_EMBEDDING_SAMPLE: usize = 100;
    pub const QUERY_LATENCY_WINDOW: usize = 100;

    // Router
    pub const DECISION_CACHE_SIZE: usize = 500;
    pub const DECISION_CACHE_TTL: Duration = Duration::from_secs(60);
    pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
    pub const SUCCESS_RATE_EMA_ALPHA: f32 = 0.01;
    pub const MAX_ELIGIBLE_LOAD: f32 = 0.95;
    pub const DEGRADED_LOAD: f32 = 0.9;
    pub const LATENCY_SCORE_SCALE_MS: f64 = 200.0;
    pub const SPECIALIZATION_BONUS: f32 = 1.1;
    pub const PRIORITY_TIEBREAK_DIVISOR: f32 = 10_000.0;

    // Swarm
    pub const MAX_CONCURRENT_WORKERS: usize = 4;
    pub const GLOBAL_RATE_LIMIT: u32 = 10;
    pub const SEARCH_PAGE_SIZE: u32 = 50;
}

/// Identifier of the synthetic expert used when no registered expert is
/// eligible or when a chosen expert's execution fails.
pub const FALLBACK_EXPERT_ID: &str = "direct-fallback";

/// Prefix for fallback decision reasons
pub const FALLBACK_REASON_PREFIX: &str = "Fallback: ";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_in_range() {
        assert!(defaults::IMPORTANCE_THRESHOLD > 0.0);
        assert!(defaults::DEDUP_SIMILARITY > 0.0 && defaults::DEDUP_SIMILARITY < 1.0);
        assert!(defaults::FISHER_DECAY > 0.0 && defaults::FISHER_DECAY <= 1.0);
        assert!(defaults::MAX_ELIGIBLE_LOAD > defaults::DEGRADED_LOAD);
    }

    #[test]
    fn test_fallback_identifiers() {
        assert_eq!(FALLBACK_EXPERT_ID, "direct-fallback");
        assert!(FALLBACK_REASON_PREFIX.starts_with("Fallback"));
    }
}
