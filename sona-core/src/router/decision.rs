//! Routing requests, decisions, and scoring weight profiles.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Request priority. High-priority requests bypass the decision cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// A routing request for one MCP tool invocation.
#[derive(Debug, Clone)]
pub struct RoutingRequest {
    /// Tool tag, e.g. `search` or `recommend`
    pub tool: String,
    /// Tool arguments; hashed for the decision cache key
    pub arguments: serde_json::Value,
    /// Priority; `High` skips the cache probe
    pub priority: RequestPriority,
    /// Latency budget hint; exceeding experts score lower but still run
    pub max_latency_ms: Option<f64>,
    /// Skill the request concerns, when there is one
    pub skill_id: Option<String>,
}

impl RoutingRequest {
    /// Request with default priority and no hints.
    #[must_use]
    pub fn new(tool: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            priority: RequestPriority::default(),
            max_latency_ms: None,
            skill_id: None,
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: RequestPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set a latency budget hint in milliseconds.
    #[must_use]
    pub fn with_max_latency_ms(mut self, max_latency_ms: f64) -> Self {
        self.max_latency_ms = Some(max_latency_ms);
        self
    }

    /// Name the skill this request concerns.
    #[must_use]
    pub fn with_skill_id(mut self, skill_id: impl Into<String>) -> Self {
        self.skill_id = Some(skill_id.into());
        self
    }

    /// Cache key over (tool, canonical argument rendering).
    ///
    /// `serde_json::Value` renders maps in key order, so structurally
    /// equal arguments hash identically within a process.
    #[must_use]
    pub fn cache_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tool.hash(&mut hasher);
        self.arguments.to_string().hash(&mut hasher);
        hasher.finish()
    }
}

/// Four-component scoring weights summing to 1.0.
///
/// Used both for each expert's declared profile and for the per-tool
/// profiles the router scores against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub accuracy: f32,
    pub latency: f32,
    pub reliability: f32,
    pub efficiency: f32,
}

impl ScoreWeights {
    /// Construct a profile.
    #[must_use]
    pub fn new(accuracy: f32, latency: f32, reliability: f32, efficiency: f32) -> Self {
        Self {
            accuracy,
            latency,
            reliability,
            efficiency,
        }
    }

    /// Even-handed profile used for tools without a dedicated entry.
    #[must_use]
    pub fn balanced() -> Self {
        Self::new(0.4, 0.3, 0.15, 0.15)
    }

    /// Built-in per-tool profiles.
    #[must_use]
    pub fn default_tool_profiles() -> HashMap<String, ScoreWeights> {
        HashMap::from([
            ("search".to_string(), Self::new(0.7, 0.2, 0.05, 0.05)),
            ("recommend".to_string(), Self::new(0.6, 0.15, 0.15, 0.1)),
            ("install".to_string(), Self::new(0.3, 0.2, 0.4, 0.1)),
            ("compare".to_string(), Self::new(0.5, 0.3, 0.1, 0.1)),
        ])
    }

    /// Reject profiles that do not sum to 1.0 (within float tolerance).
    pub fn validate(&self, owner: &str) -> Result<()> {
        let sum = self.accuracy + self.latency + self.reliability + self.efficiency;
        if (sum - 1.0).abs() > 1e-3 {
            return Err(Error::Configuration(format!(
                "score weights for '{owner}' sum to {sum}, expected 1.0"
            )));
        }
        if [self.accuracy, self.latency, self.reliability, self.efficiency]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err(Error::Configuration(format!(
                "score weights for '{owner}' contain a negative component"
            )));
        }
        Ok(())
    }
}

/// Component scores for the chosen expert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpertScores {
    pub accuracy_score: f32,
    pub latency_score: f32,
    pub reliability_score: f32,
    pub efficiency_score: f32,
    /// Weighted total including bonus and tiebreak
    pub total_score: f32,
}

impl ExpertScores {
    /// Perfect scores, used for fallback decisions.
    #[must_use]
    pub fn perfect() -> Self {
        Self {
            accuracy_score: 1.0,
            latency_score: 1.0,
            reliability_score: 1.0,
            efficiency_score: 1.0,
            total_score: 1.0,
        }
    }
}

/// A runner-up expert and its total score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeScore {
    pub expert_id: String,
    pub total_score: f32,
}

/// The routing verdict for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Chosen expert, or `direct-fallback`
    pub expert_id: String,
    /// Confidence in [0.5, 1.0] from the score margin; 1.0 when unopposed
    pub confidence: f32,
    /// Human-readable selection rationale
    pub reason: String,
    /// Whether this decision came from the cache
    pub cache_hit: bool,
    /// Wall-clock routing time, entry to exit
    pub decision_time_ms: f64,
    /// Component scores of the chosen expert
    pub scores: ExpertScores,
    /// Losing candidates, best first
    pub alternatives: Vec<AlternativeScore>,
}
