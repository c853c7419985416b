//! Core pattern types: outcomes, features, contexts, and search results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the user responded to a recommended skill.
///
/// Each outcome carries a default reward in [-1, 1]; explicit rewards can
/// override it per recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeType {
    /// Recommendation was accepted outright
    Accept,
    /// Skill was used after installation
    Usage,
    /// Skill became part of the user's regular toolkit
    Frequent,
    /// Recommendation was dismissed
    Dismiss,
    /// Installed but abandoned before meaningful use
    Abandonment,
    /// Explicitly uninstalled
    Uninstall,
}

impl OutcomeType {
    /// Default reward assigned when no explicit reward is recorded.
    #[must_use]
    pub fn default_reward(self) -> f32 {
        match self {
            OutcomeType::Accept => 1.0,
            OutcomeType::Usage => 0.3,
            OutcomeType::Frequent => 0.5,
            OutcomeType::Dismiss => -0.5,
            OutcomeType::Abandonment => -0.3,
            OutcomeType::Uninstall => -0.7,
        }
    }
}

impl std::fmt::Display for OutcomeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeType::Accept => write!(f, "accept"),
            OutcomeType::Usage => write!(f, "usage"),
            OutcomeType::Frequent => write!(f, "frequent"),
            OutcomeType::Dismiss => write!(f, "dismiss"),
            OutcomeType::Abandonment => write!(f, "abandonment"),
            OutcomeType::Uninstall => write!(f, "uninstall"),
        }
    }
}

impl std::str::FromStr for OutcomeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "accept" => Ok(OutcomeType::Accept),
            "usage" => Ok(OutcomeType::Usage),
            "frequent" => Ok(OutcomeType::Frequent),
            "dismiss" => Ok(OutcomeType::Dismiss),
            "abandonment" => Ok(OutcomeType::Abandonment),
            "uninstall" => Ok(OutcomeType::Uninstall),
            _ => Err(format!("Unknown OutcomeType: {s}")),
        }
    }
}

/// Which surface produced the recommendation being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Direct search result
    Search,
    /// Proactive recommendation
    Recommend,
    /// Install flow
    Install,
    /// Side-by-side comparison
    Compare,
}

impl std::fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationSource::Search => write!(f, "search"),
            RecommendationSource::Recommend => write!(f, "recommend"),
            RecommendationSource::Install => write!(f, "install"),
            RecommendationSource::Compare => write!(f, "compare"),
        }
    }
}

impl std::str::FromStr for RecommendationSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "search" => Ok(RecommendationSource::Search),
            "recommend" => Ok(RecommendationSource::Recommend),
            "install" => Ok(RecommendationSource::Install),
            "compare" => Ok(RecommendationSource::Compare),
            _ => Err(format!("Unknown RecommendationSource: {s}")),
        }
    }
}

/// Features of the skill a pattern is evidence about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillFeatures {
    /// Registry-wide skill identifier
    pub skill_id: String,
    /// Skill category, when known
    pub category: Option<String>,
    /// Publisher trust tier, when known
    pub trust_tier: Option<String>,
    /// Free-form tags
    pub tags: Vec<String>,
}

impl SkillFeatures {
    /// Features naming only the skill.
    #[must_use]
    pub fn for_skill(skill_id: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            ..Self::default()
        }
    }
}

/// User context captured at recommendation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternContext {
    /// Skills already installed
    pub installed: Vec<String>,
    /// Frameworks detected in the workspace
    pub frameworks: Vec<String>,
    /// Query or task keywords
    pub keywords: Vec<String>,
    /// Temporal hints such as "weekday-morning"
    pub temporal_hints: Vec<String>,
}

impl PatternContext {
    /// Canonical text rendering fed to the embedding provider.
    ///
    /// Field order and separators are fixed so the same context always
    /// produces the same embedding.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        format!(
            "installed:{} frameworks:{} keywords:{} temporal:{}",
            self.installed.join(","),
            self.frameworks.join(","),
            self.keywords.join(","),
            self.temporal_hints.join(","),
        )
    }
}

/// A recorded (context → skill → outcome) tuple.
///
/// Owned exclusively by the pattern store; callers work with snapshots.
/// Immutable after insertion except for `importance`, `access_count`, and
/// `last_accessed_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Opaque unique identifier
    pub id: Uuid,
    /// Embedded recommendation context
    pub context_embedding: Vec<f32>,
    /// Features of the recommended skill
    pub skill_features: SkillFeatures,
    /// Context captured at recommendation time
    pub context_data: PatternContext,
    /// Outcome class
    pub outcome_type: OutcomeType,
    /// Reward in [-1, 1]
    pub outcome_reward: f32,
    /// Consolidation-weighted importance, ≥ 0
    pub importance: f32,
    /// Recommendation score at recording time, in [0, 1]
    pub original_score: f32,
    /// Surface that produced the recommendation
    pub source: RecommendationSource,
    /// Retrievals that returned this pattern in the top K
    pub access_count: u32,
    /// Insertion time
    pub created_at: DateTime<Utc>,
    /// Last retrieval time
    pub last_accessed_at: DateTime<Utc>,
}

/// Input for recording a new pattern.
#[derive(Debug, Clone)]
pub struct PatternDraft {
    /// Features of the recommended skill
    pub skill_features: SkillFeatures,
    /// Context captured at recommendation time
    pub context_data: PatternContext,
    /// Recommendation score at recording time, in [0, 1]
    pub original_score: f32,
    /// Surface that produced the recommendation
    pub source: RecommendationSource,
    /// Optional confidence multiplier for the initial importance
    pub confidence: Option<f32>,
}

/// An outcome being recorded, with an optional explicit reward.
#[derive(Debug, Clone, Copy)]
pub struct RecordedOutcome {
    /// Outcome class
    pub outcome_type: OutcomeType,
    /// Explicit reward override; defaults to the outcome's fixed reward
    pub reward: Option<f32>,
}

impl RecordedOutcome {
    /// Outcome with the type's default reward.
    #[must_use]
    pub fn of(outcome_type: OutcomeType) -> Self {
        Self {
            outcome_type,
            reward: None,
        }
    }

    /// Outcome with an explicit reward; clamped to [-1, 1] at read time.
    #[must_use]
    pub fn with_reward(outcome_type: OutcomeType, reward: f32) -> Self {
        Self {
            outcome_type,
            reward: Some(reward),
        }
    }

    /// Effective reward for this recording.
    #[must_use]
    pub fn reward(&self) -> f32 {
        self.reward
            .unwrap_or_else(|| self.outcome_type.default_reward())
            .clamp(-1.0, 1.0)
    }
}

/// Filters for similarity search.
#[derive(Debug, Clone, Default)]
pub struct SimilarityQuery {
    /// Context to embed and compare against stored patterns
    pub context: PatternContext,
    /// Restrict to a single skill
    pub skill_id: Option<String>,
    /// Restrict to a skill category
    pub category: Option<String>,
    /// Drop candidates below this importance
    pub min_importance: Option<f32>,
    /// Restrict to a single outcome class
    pub outcome_type: Option<OutcomeType>,
    /// Keep only positive-reward patterns
    pub positive_only: bool,
}

/// One ranked similarity-search result.
#[derive(Debug, Clone)]
pub struct SimilarPattern {
    /// Snapshot of the matched pattern
    pub pattern: Pattern,
    /// Plain cosine similarity in [-1, 1]
    pub similarity: f32,
    /// Fisher-importance-weighted cosine similarity
    pub weighted_similarity: f32,
    /// 1-based rank by weighted similarity
    pub rank: usize,
}
