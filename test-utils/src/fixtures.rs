//! Pattern fixtures.

use chrono::Utc;
use sona_core::embeddings::{EmbeddingProvider, HashEmbedder};
use sona_core::pattern::{
    OutcomeType, Pattern, PatternContext, RecommendationSource, SkillFeatures,
};
use uuid::Uuid;

/// A ready-made pattern for storage-level tests.
///
/// The embedding is deterministic in `skill_id` so fixtures are stable
/// across runs; reward and outcome follow the outcome type's defaults.
#[must_use]
pub fn pattern_fixture(skill_id: &str, outcome_type: OutcomeType, dimension: usize) -> Pattern {
    let embedder = HashEmbedder::new(dimension);
    let context = PatternContext {
        keywords: vec![skill_id.to_string()],
        ..PatternContext::default()
    };
    let now = Utc::now();

    Pattern {
        id: Uuid::new_v4(),
        context_embedding: embedder.embed(&context.embedding_text()),
        skill_features: SkillFeatures::for_skill(skill_id),
        context_data: context,
        outcome_type,
        outcome_reward: outcome_type.default_reward(),
        importance: 0.15,
        original_score: 0.8,
        source: RecommendationSource::Recommend,
        access_count: 0,
        created_at: now,
        last_accessed_at: now,
    }
}
