//! Configuration for the pattern store, router, and swarm.
//!
//! All configuration is composed at construction time; the core never
//! reads the process environment. Validation failures surface as
//! [`Error::Configuration`](crate::Error::Configuration).

use std::collections::HashMap;
use std::time::Duration;

use crate::constants::defaults;
use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use crate::router::{Expert, ScoreWeights};

/// Configuration for the EWC++ pattern store.
///
/// # Examples
///
/// ```
/// use sona_core::store::PatternStoreConfig;
///
/// let config = PatternStoreConfig {
///     max_patterns: 1_000,
///     auto_consolidate: false,
///     ..PatternStoreConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PatternStoreConfig {
    /// Store-wide embedding dimension; all persisted vectors use it
    pub embedding_dimension: usize,
    /// Soft capacity; consolidation prunes toward this bound
    pub max_patterns: usize,
    /// Patterns below this importance are candidates for pruning
    pub importance_threshold: f32,
    /// Cosine similarity above which a new pattern updates an existing one
    pub dedup_similarity: f32,
    /// New-pattern ratio that makes a consolidation pass worthwhile
    pub consolidation_threshold: f32,
    /// Minimum wall-clock spacing between automatic consolidations
    pub consolidation_interval: Duration,
    /// Fisher running-sum decay factor applied each consolidation, in (0, 1]
    pub fisher_decay: f32,
    /// Number of random patterns re-fed to the Fisher matrix per consolidation
    pub fisher_sample_size: usize,
    /// EWC lambda scaling the Fisher dimension term in importance
    pub ewc_lambda: f32,
    /// How many recent embeddings feed the running mean used as gradient origin
    pub avg_embedding_sample: usize,
    /// Run consolidation synchronously inside `store_pattern` when due
    pub auto_consolidate: bool,
    /// Increment `access_count` on patterns returned from similarity search
    pub track_access: bool,
}

impl Default for PatternStoreConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: defaults::EMBEDDING_DIMENSION,
            max_patterns: defaults::MAX_PATTERNS,
            importance_threshold: defaults::IMPORTANCE_THRESHOLD,
            dedup_similarity: defaults::DEDUP_SIMILARITY,
            consolidation_threshold: defaults::CONSOLIDATION_THRESHOLD,
            consolidation_interval: defaults::CONSOLIDATION_INTERVAL,
            fisher_decay: defaults::FISHER_DECAY,
            fisher_sample_size: defaults::FISHER_SAMPLE_SIZE,
            ewc_lambda: defaults::EWC_LAMBDA,
            avg_embedding_sample: defaults::AVG_EMBEDDING_SAMPLE,
            auto_consolidate: true,
            track_access: true,
        }
    }
}

impl PatternStoreConfig {
    /// Validate field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dimension == 0 {
            return Err(Error::Configuration(
                "embedding_dimension must be positive".to_string(),
            ));
        }
        if self.max_patterns == 0 {
            return Err(Error::Configuration(
                "max_patterns must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dedup_similarity) {
            return Err(Error::Configuration(format!(
                "dedup_similarity must be in [0, 1], got {}",
                self.dedup_similarity
            )));
        }
        if self.fisher_decay <= 0.0 || self.fisher_decay > 1.0 {
            return Err(Error::Configuration(format!(
                "fisher_decay must be in (0, 1], got {}",
                self.fisher_decay
            )));
        }
        if self.importance_threshold < 0.0 {
            return Err(Error::Configuration(
                "importance_threshold must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.consolidation_threshold) {
            return Err(Error::Configuration(format!(
                "consolidation_threshold must be in [0, 1], got {}",
                self.consolidation_threshold
            )));
        }
        Ok(())
    }
}

/// Configuration for the SONA router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Static expert catalog; defaults to the built-in eight experts
    pub experts: Vec<Expert>,
    /// Per-tool scoring weight profiles
    pub tool_weights: HashMap<String, ScoreWeights>,
    /// Weights used for tools without a dedicated profile
    pub default_weights: ScoreWeights,
    /// Cache routing decisions for repeated (tool, arguments) pairs
    pub enable_cache: bool,
    /// Decision cache capacity
    pub cache_size: usize,
    /// Decision cache entry lifetime
    pub cache_ttl: Duration,
    /// Retry a failed execution once through the direct fallback expert
    pub enable_fallback: bool,
    /// Spacing for the background health-check loop
    pub health_check_interval: Duration,
}

impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("experts", &self.experts.len())
            .field("enable_cache", &self.enable_cache)
            .field("cache_size", &self.cache_size)
            .field("cache_ttl", &self.cache_ttl)
            .field("enable_fallback", &self.enable_fallback)
            .finish_non_exhaustive()
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            experts: Expert::default_catalog(),
            tool_weights: ScoreWeights::default_tool_profiles(),
            default_weights: ScoreWeights::balanced(),
            enable_cache: true,
            cache_size: defaults::DECISION_CACHE_SIZE,
            cache_ttl: defaults::DECISION_CACHE_TTL,
            enable_fallback: true,
            health_check_interval: defaults::HEALTH_CHECK_INTERVAL,
        }
    }
}

impl RouterConfig {
    /// Validate the catalog and weight profiles.
    pub fn validate(&self) -> Result<()> {
        if self.experts.is_empty() {
            return Err(Error::Configuration(
                "expert catalog must not be empty".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for expert in &self.experts {
            if !seen.insert(expert.id.as_str()) {
                return Err(Error::Configuration(format!(
                    "duplicate expert id: {}",
                    expert.id
                )));
            }
            expert.weights.validate(&expert.id)?;
        }
        for (tool, weights) in &self.tool_weights {
            weights.validate(tool)?;
        }
        if self.cache_size == 0 {
            return Err(Error::Configuration(
                "cache_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the swarm indexer.
#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// Upper bound on workers progressing concurrently
    pub max_concurrent_workers: usize,
    /// Token bucket capacity, in requests per second
    pub global_rate_limit: u32,
    /// Keep indexing remaining repositories after a fetch fails
    pub continue_on_error: bool,
    /// Repositories requested per search page
    pub per_page: u32,
    /// Backoff policy for transient adapter failures
    pub retry: RetryConfig,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: defaults::MAX_CONCURRENT_WORKERS,
            global_rate_limit: defaults::GLOBAL_RATE_LIMIT,
            continue_on_error: true,
            per_page: defaults::SEARCH_PAGE_SIZE,
            retry: RetryConfig::default(),
        }
    }
}

impl SwarmConfig {
    /// Validate field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_workers == 0 {
            return Err(Error::Configuration(
                "max_concurrent_workers must be positive".to_string(),
            ));
        }
        if self.global_rate_limit == 0 {
            return Err(Error::Configuration(
                "global_rate_limit must be positive".to_string(),
            ));
        }
        if self.per_page == 0 {
            return Err(Error::Configuration(
                "per_page must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
