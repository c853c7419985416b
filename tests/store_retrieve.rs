//! Store-then-retrieve scenarios for the pattern store.

use std::sync::Arc;

use sona_core::embeddings::HashEmbedder;
use sona_core::pattern::{
    OutcomeType, PatternContext, PatternDraft, RecommendationSource, RecordedOutcome,
    SimilarityQuery, SkillFeatures,
};
use sona_core::store::{PatternStore, PatternStoreConfig};
use test_utils::MemoryPatternStorage;

const DIMENSION: usize = 64;

async fn open_store() -> PatternStore {
    let config = PatternStoreConfig {
        embedding_dimension: DIMENSION,
        auto_consolidate: false,
        ..PatternStoreConfig::default()
    };
    PatternStore::open(
        Arc::new(MemoryPatternStorage::new()),
        Arc::new(HashEmbedder::new(DIMENSION)),
        config,
    )
    .await
    .unwrap()
}

fn react_context() -> PatternContext {
    PatternContext {
        installed: vec!["commit".to_string()],
        frameworks: vec!["react".to_string()],
        ..PatternContext::default()
    }
}

fn draft(skill_id: &str, context: PatternContext) -> PatternDraft {
    PatternDraft {
        skill_features: SkillFeatures::for_skill(skill_id),
        context_data: context,
        original_score: 0.9,
        source: RecommendationSource::Recommend,
        confidence: None,
    }
}

/// S1: store a pattern and retrieve it with the identical context.
#[tokio::test]
async fn test_store_then_retrieve_identical_context() {
    let store = open_store().await;
    let id = store
        .store_pattern(
            draft("jest-helper", react_context()),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();

    let results = store
        .find_similar_patterns(
            &SimilarityQuery {
                context: react_context(),
                ..SimilarityQuery::default()
            },
            5,
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let top = &results[0];
    assert_eq!(top.rank, 1);
    assert!((top.similarity - 1.0).abs() < 1e-6);
    assert_eq!(top.pattern.outcome_type, OutcomeType::Accept);
    assert_eq!(top.pattern.outcome_reward, 1.0);

    let stored = store.get_pattern(id).await.unwrap().unwrap();
    assert!(stored.access_count >= 1);
}

/// Near-duplicate inserts leave exactly one row with a bumped access count.
#[tokio::test]
async fn test_near_duplicate_store_dedups() {
    let store = open_store().await;
    let first = store
        .store_pattern(
            draft("jest-helper", react_context()),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();
    let second = store
        .store_pattern(
            draft("jest-helper", react_context()),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(store.pattern_count().await.unwrap(), 1);
    let survivor = store.get_pattern(first).await.unwrap().unwrap();
    assert!(survivor.access_count >= 1);
}

/// Dedup is scoped per skill: the same context for two skills stays two rows.
#[tokio::test]
async fn test_same_context_different_skills_both_stored() {
    let store = open_store().await;
    store
        .store_pattern(
            draft("jest-helper", react_context()),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();
    store
        .store_pattern(
            draft("eslint-fix", react_context()),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();
    assert_eq!(store.pattern_count().await.unwrap(), 2);
}

/// Read-your-writes: a store followed by a matching query sees the row.
#[tokio::test]
async fn test_read_your_writes() {
    let store = open_store().await;
    for i in 0..5 {
        let context = PatternContext {
            keywords: vec![format!("topic-{i}")],
            ..PatternContext::default()
        };
        store
            .store_pattern(
                draft(&format!("skill-{i}"), context.clone()),
                RecordedOutcome::of(OutcomeType::Accept),
            )
            .await
            .unwrap();

        let results = store
            .find_similar_patterns(
                &SimilarityQuery {
                    context,
                    skill_id: Some(format!("skill-{i}")),
                    ..SimilarityQuery::default()
                },
                1,
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1, "write {i} not visible to its own query");
    }
}

/// Outcome and importance filters compose.
#[tokio::test]
async fn test_filtered_retrieval() {
    let store = open_store().await;
    store
        .store_pattern(
            draft("jest-helper", react_context()),
            RecordedOutcome::of(OutcomeType::Accept),
        )
        .await
        .unwrap();
    let vue_context = PatternContext {
        frameworks: vec!["vue".to_string()],
        ..PatternContext::default()
    };
    store
        .store_pattern(
            draft("vue-devtools", vue_context),
            RecordedOutcome::of(OutcomeType::Uninstall),
        )
        .await
        .unwrap();

    let positives = store
        .find_similar_patterns(
            &SimilarityQuery {
                positive_only: true,
                ..SimilarityQuery::default()
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(positives.len(), 1);
    assert_eq!(positives[0].pattern.skill_features.skill_id, "jest-helper");

    let uninstalls = store
        .find_similar_patterns(
            &SimilarityQuery {
                outcome_type: Some(OutcomeType::Uninstall),
                ..SimilarityQuery::default()
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(uninstalls.len(), 1);
    assert_eq!(uninstalls[0].pattern.outcome_reward, -0.7);
}

/// An explicit reward overrides the outcome default and is clamped.
#[tokio::test]
async fn test_explicit_reward_override() {
    let store = open_store().await;
    let id = store
        .store_pattern(
            draft("jest-helper", react_context()),
            RecordedOutcome::with_reward(OutcomeType::Usage, 0.9),
        )
        .await
        .unwrap();
    let stored = store.get_pattern(id).await.unwrap().unwrap();
    assert!((stored.outcome_reward - 0.9).abs() < 1e-6);
}
