//! Unit-level pattern store scenarios (moved out of `sona-core`'s own unit
//! tests to avoid a cyclic dev-dependency: `test-utils` depends on
//! `sona-core`, so `sona-core`'s unit test binary and `test-utils`'s copy of
//! `sona-core` would otherwise be two distinct compilations of the same
//! crate).

use std::sync::Arc;

use sona_core::Error;
use sona_core::embeddings::HashEmbedder;
use sona_core::pattern::{
    OutcomeType, PatternContext, PatternDraft, RecommendationSource, RecordedOutcome,
    SimilarityQuery, SkillFeatures,
};
use sona_core::store::{PatternStore, PatternStoreConfig};
use test_utils::MemoryPatternStorage;

fn draft(skill_id: &str, keywords: &[&str]) -> PatternDraft {
    PatternDraft {
        skill_features: SkillFeatures::for_skill(skill_id),
        context_data: PatternContext {
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            ..PatternContext::default()
        },
        original_score: 0.8,
        source: RecommendationSource::Recommend,
        confidence: None,
    }
}

async fn open_store(config: PatternStoreConfig) -> PatternStore {
    let embedder = Arc::new(HashEmbedder::new(config.embedding_dimension));
    let storage = Arc::new(MemoryPatternStorage::new());
    PatternStore::open(storage, embedder, config)
        .await
        .unwrap()
}

fn small_config() -> PatternStoreConfig {
    PatternStoreConfig {
        embedding_dimension: 64,
        auto_consolidate: false,
        ..PatternStoreConfig::default()
    }
}

#[tokio::test]
async fn test_store_and_count() {
    let store = open_store(small_config()).await;
    store
        .store_pattern(
            draft("jest-helper", &["unit", "testing"]),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();
    assert_eq!(store.pattern_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_near_duplicate_merges() {
    let store = open_store(small_config()).await;
    let first = store
        .store_pattern(
            draft("jest-helper", &["unit", "testing"]),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();
    // Identical context embeds identically: cosine 1.0 > 0.95.
    let second = store
        .store_pattern(
            draft("jest-helper", &["unit", "testing"]),
            RecordedOutcome::of(OutcomeType::Usage),
        )
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(store.pattern_count().await.unwrap(), 1);

    let survivor = store.get_pattern(first).await.unwrap().unwrap();
    assert!(survivor.access_count >= 1);
    // The original outcome is preserved; the merge only refreshes
    // importance and access bookkeeping.
    assert_eq!(survivor.outcome_type, OutcomeType::Accept);
}

#[tokio::test]
async fn test_distinct_contexts_insert_separately() {
    let store = open_store(small_config()).await;
    store
        .store_pattern(
            draft("jest-helper", &["unit"]),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();
    store
        .store_pattern(
            draft("jest-helper", &["terraform", "infra", "deploy"]),
            RecordedOutcome::of(OutcomeType::Dismiss),
        )
        .await
        .unwrap();
    assert_eq!(store.pattern_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_find_similar_exact_match_ranks_first() {
    let store = open_store(small_config()).await;
    store
        .store_pattern(
            draft("jest-helper", &["react", "testing"]),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();
    store
        .store_pattern(
            draft("eslint-fix", &["lint", "javascript"]),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();

    let query = SimilarityQuery {
        context: PatternContext {
            keywords: vec!["react".to_string(), "testing".to_string()],
            ..PatternContext::default()
        },
        ..SimilarityQuery::default()
    };
    let results = store.find_similar_patterns(&query, 5).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].rank, 1);
    assert_eq!(results[0].pattern.skill_features.skill_id, "jest-helper");
    assert!((results[0].similarity - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_find_similar_positive_only_filter() {
    let store = open_store(small_config()).await;
    store
        .store_pattern(
            draft("jest-helper", &["react"]),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();
    store
        .store_pattern(
            draft("mocha-setup", &["mocha", "node", "tests"]),
            RecordedOutcome::of(OutcomeType::Dismiss),
        )
        .await
        .unwrap();

    let query = SimilarityQuery {
        positive_only: true,
        ..SimilarityQuery::default()
    };
    let results = store.find_similar_patterns(&query, 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].pattern.skill_features.skill_id, "jest-helper");
}

#[tokio::test]
async fn test_access_tracking_increments() {
    let store = open_store(small_config()).await;
    let id = store
        .store_pattern(
            draft("jest-helper", &["react"]),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();

    let query = SimilarityQuery::default();
    store.find_similar_patterns(&query, 5).await.unwrap();
    store.find_similar_patterns(&query, 5).await.unwrap();

    let pattern = store.get_pattern(id).await.unwrap().unwrap();
    assert_eq!(pattern.access_count, 2);
}

#[tokio::test]
async fn test_empty_skill_id_rejected() {
    let store = open_store(small_config()).await;
    let result = store
        .store_pattern(draft("", &["x"]), RecordedOutcome::of(OutcomeType::Accept))
        .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn test_query_stats_window_populates() {
    let store = open_store(small_config()).await;
    store
        .store_pattern(
            draft("jest-helper", &["react"]),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();
    store
        .find_similar_patterns(&SimilarityQuery::default(), 5)
        .await
        .unwrap();
    assert_eq!(store.query_stats().count, 1);
}

#[tokio::test]
async fn test_embedder_dimension_mismatch_rejected() {
    let config = PatternStoreConfig {
        embedding_dimension: 64,
        ..PatternStoreConfig::default()
    };
    let embedder = Arc::new(HashEmbedder::new(32));
    let storage = Arc::new(MemoryPatternStorage::new());
    let result = PatternStore::open(storage, embedder, config).await;
    assert!(matches!(result, Err(Error::Configuration(_))));
}
