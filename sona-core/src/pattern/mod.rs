//! Pattern data model and importance formulas.

mod importance;
mod types;

pub use importance::{initial_importance, pattern_importance};
pub use types::{
    OutcomeType, Pattern, PatternContext, PatternDraft, RecommendationSource, RecordedOutcome,
    SimilarPattern, SimilarityQuery, SkillFeatures,
};
