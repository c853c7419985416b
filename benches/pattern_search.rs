//! Similarity-search throughput over a seeded pattern store.

use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use sona_core::embeddings::HashEmbedder;
use sona_core::pattern::{
    OutcomeType, PatternContext, PatternDraft, RecommendationSource, RecordedOutcome,
    SimilarityQuery, SkillFeatures,
};
use sona_core::store::{PatternStore, PatternStoreConfig};
use test_utils::MemoryPatternStorage;

const DIMENSION: usize = 384;

async fn seeded_store(patterns: usize) -> PatternStore {
    let config = PatternStoreConfig {
        embedding_dimension: DIMENSION,
        auto_consolidate: false,
        track_access: false,
        ..PatternStoreConfig::default()
    };
    let store = PatternStore::open(
        Arc::new(MemoryPatternStorage::new()),
        Arc::new(HashEmbedder::new(DIMENSION)),
        config,
    )
    .await
    .expect("store opens");

    for i in 0..patterns {
        let draft = PatternDraft {
            skill_features: SkillFeatures::for_skill(format!("skill-{}", i % 50)),
            context_data: PatternContext {
                keywords: vec![format!("keyword-{i}")],
                frameworks: vec![format!("framework-{}", i % 7)],
                ..PatternContext::default()
            },
            original_score: 0.8,
            source: RecommendationSource::Search,
            confidence: None,
        };
        store
            .store_pattern(draft, RecordedOutcome::of(OutcomeType::Accept))
            .await
            .expect("store succeeds");
    }
    store
}

fn bench_find_similar(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let store = runtime.block_on(seeded_store(1_000));

    let query = SimilarityQuery {
        context: PatternContext {
            keywords: vec!["keyword-500".to_string()],
            frameworks: vec!["framework-3".to_string()],
            ..PatternContext::default()
        },
        ..SimilarityQuery::default()
    };

    c.bench_function("find_similar_patterns_1k", |b| {
        b.to_async(&runtime).iter(|| async {
            store
                .find_similar_patterns(&query, 10)
                .await
                .expect("query succeeds")
        });
    });

    let skill_query = SimilarityQuery {
        skill_id: Some("skill-25".to_string()),
        ..query.clone()
    };
    c.bench_function("find_similar_patterns_1k_skill_filtered", |b| {
        b.to_async(&runtime).iter(|| async {
            store
                .find_similar_patterns(&skill_query, 10)
                .await
                .expect("query succeeds")
        });
    });
}

fn bench_store_pattern(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let store = runtime.block_on(seeded_store(100));

    let mut counter = 0u64;
    c.bench_function("store_pattern_distinct_contexts", |b| {
        b.to_async(&runtime).iter(|| {
            counter += 1;
            let draft = PatternDraft {
                skill_features: SkillFeatures::for_skill("bench-skill"),
                context_data: PatternContext {
                    keywords: vec![format!("bench-{counter}")],
                    ..PatternContext::default()
                },
                original_score: 0.5,
                source: RecommendationSource::Recommend,
                confidence: None,
            };
            async {
                store
                    .store_pattern(draft, RecordedOutcome::of(OutcomeType::Usage))
                    .await
                    .expect("store succeeds")
            }
        });
    });
}

criterion_group!(benches, bench_find_similar, bench_store_pattern);
criterion_main!(benches);
