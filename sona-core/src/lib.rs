#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::float_cmp)]

//! # SONA Core
//!
//! Learning and routing core for the skill-discovery platform.
//!
//! Three tightly coupled subsystems live here:
//!
//! - **Pattern store with EWC++**: a vector-indexed, importance-weighted
//!   memory of past (context → skill → outcome) tuples. A diagonal Fisher
//!   information matrix tracks which embedding dimensions matter, so
//!   consolidation can prune aggressively without forgetting what worked.
//! - **SONA router**: a mixture-of-experts router that scores eight
//!   specialized experts per request against per-tool weight profiles,
//!   with health tracking, an LRU decision cache, and fallback execution.
//! - **Swarm indexer**: a partitioned, rate-limited parallel fetcher that
//!   populates the skill corpus the other two subsystems operate over.
//!
//! ## Module Organization
//!
//! - [`store`]: pattern store orchestration and the storage contract
//! - [`ewc`]: diagonal Fisher information matrix
//! - [`embeddings`]: embedding provider, similarity math, binary codec
//! - [`router`]: expert registry, decision cache, routing, execution
//! - [`swarm`]: partitions, token bucket, workers, collaborator traits
//! - [`pattern`]: pattern data model and importance formulas
//! - [`retry`]: backoff policy for transient collaborator failures
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use sona_core::embeddings::HashEmbedder;
//! use sona_core::pattern::{OutcomeType, PatternContext, PatternDraft, RecordedOutcome,
//!     RecommendationSource, SkillFeatures, SimilarityQuery};
//! use sona_core::store::{PatternStore, PatternStoreConfig};
//! use test_utils::MemoryPatternStorage;
//!
//! #[tokio::main]
//! async fn main() -> sona_core::Result<()> {
//!     let config = PatternStoreConfig::default();
//!     let embedder = Arc::new(HashEmbedder::new(config.embedding_dimension));
//!     let storage = Arc::new(MemoryPatternStorage::new());
//!     let store = PatternStore::open(storage, embedder, config).await?;
//!
//!     // Record that recommending `jest-helper` in a React project worked.
//!     let draft = PatternDraft {
//!         skill_features: SkillFeatures::for_skill("jest-helper"),
//!         context_data: PatternContext {
//!             frameworks: vec!["react".to_string()],
//!             ..PatternContext::default()
//!         },
//!         original_score: 0.9,
//!         source: RecommendationSource::Recommend,
//!         confidence: None,
//!     };
//!     store.store_pattern(draft, RecordedOutcome::of(OutcomeType::Accept)).await?;
//!
//!     // Later: what worked in similar contexts?
//!     let query = SimilarityQuery {
//!         context: PatternContext {
//!             frameworks: vec!["react".to_string()],
//!             ..PatternContext::default()
//!         },
//!         ..SimilarityQuery::default()
//!     };
//!     let similar = store.find_similar_patterns(&query, 5).await?;
//!     println!("{} similar patterns", similar.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod embeddings;
pub mod error;
pub mod ewc;
pub mod pattern;
pub mod retry;
pub mod router;
pub mod store;
pub mod swarm;

// Re-export commonly used types
pub use config::{PatternStoreConfig, RouterConfig, SwarmConfig};
pub use embeddings::{EmbeddingProvider, HashEmbedder, cosine_similarity};
pub use error::{Error, Result};
pub use ewc::FisherMatrix;
pub use pattern::{
    OutcomeType, Pattern, PatternContext, PatternDraft, RecommendationSource, RecordedOutcome,
    SimilarPattern, SimilarityQuery, SkillFeatures,
};
pub use retry::{RetryConfig, RetryPolicy};
pub use router::{
    Expert, ExpertRegistry, ExpertState, ExpertStatus, ExpertType, RequestPriority,
    RoutedExecution, RoutingDecision, RoutingOutcome, RoutingRequest, ScoreWeights, SonaRouter,
    V3Integration,
};
pub use store::{ConsolidationReport, PatternStorage, PatternStore};
pub use swarm::{
    FetchedSkill, IndexResult, Partition, SearchRequest, SearchResults, Skill, SkillLocation,
    SkillMetadata, SkillRepository, SourceAdapter, SwarmIndexer, SwarmResult, TokenBucket,
    UpsertAction, UpsertOutcome, WorkerSnapshot, WorkerState,
};
