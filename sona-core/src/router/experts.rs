//! Static expert catalog and runtime health tracking.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::defaults;

use super::decision::ScoreWeights;

/// What an expert is optimized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertType {
    /// Best answers, slower
    Accuracy,
    /// Fast answers, less precise
    Latency,
    /// Middle of the road
    Balanced,
    /// Tuned for exactly one tool
    Specialized,
}

/// Runtime health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertState {
    Healthy,
    Degraded,
    Unhealthy,
    WarmingUp,
}

/// One static expert definition, loaded at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expert {
    /// Stable identifier
    pub id: String,
    /// Optimization profile
    pub expert_type: ExpertType,
    /// Human-readable name
    pub name: String,
    /// Tool tags this expert can serve
    pub supported_tools: Vec<String>,
    /// Concurrent request ceiling
    pub max_concurrency: u32,
    /// Declared average latency
    pub avg_latency_ms: f64,
    /// Declared accuracy in [0, 1]
    pub accuracy_score: f32,
    /// Declared capability weight profile
    pub weights: ScoreWeights,
    /// Integer tiebreaker; higher wins among equals
    pub priority: u32,
}

impl Expert {
    /// Whether this expert serves `tool`.
    #[must_use]
    pub fn supports(&self, tool: &str) -> bool {
        self.supported_tools.iter().any(|t| t == tool)
    }

    /// The built-in catalog of eight experts.
    #[must_use]
    pub fn default_catalog() -> Vec<Expert> {
        let tools = |names: &[&str]| names.iter().map(|n| (*n).to_string()).collect::<Vec<_>>();
        vec![
            Expert {
                id: "precision-search".to_string(),
                expert_type: ExpertType::Accuracy,
                name: "Precision Search".to_string(),
                supported_tools: tools(&["search", "compare"]),
                max_concurrency: 8,
                avg_latency_ms: 120.0,
                accuracy_score: 0.95,
                weights: ScoreWeights::new(0.6, 0.1, 0.2, 0.1),
                priority: 100,
            },
            Expert {
                id: "rapid-search".to_string(),
                expert_type: ExpertType::Latency,
                name: "Rapid Search".to_string(),
                supported_tools: tools(&["search"]),
                max_concurrency: 32,
                avg_latency_ms: 30.0,
                accuracy_score: 0.8,
                weights: ScoreWeights::new(0.2, 0.6, 0.1, 0.1),
                priority: 90,
            },
            Expert {
                id: "balanced-discovery".to_string(),
                expert_type: ExpertType::Balanced,
                name: "Balanced Discovery".to_string(),
                supported_tools: tools(&["search", "recommend"]),
                max_concurrency: 16,
                avg_latency_ms: 80.0,
                accuracy_score: 0.85,
                weights: ScoreWeights::new(0.3, 0.3, 0.2, 0.2),
                priority: 80,
            },
            Expert {
                id: "context-recommender".to_string(),
                expert_type: ExpertType::Accuracy,
                name: "Context Recommender".to_string(),
                supported_tools: tools(&["recommend", "compare"]),
                max_concurrency: 8,
                avg_latency_ms: 150.0,
                accuracy_score: 0.92,
                weights: ScoreWeights::new(0.55, 0.1, 0.2, 0.15),
                priority: 85,
            },
            Expert {
                id: "install-advisor".to_string(),
                expert_type: ExpertType::Specialized,
                name: "Install Advisor".to_string(),
                supported_tools: tools(&["install"]),
                max_concurrency: 12,
                avg_latency_ms: 100.0,
                accuracy_score: 0.88,
                weights: ScoreWeights::new(0.3, 0.2, 0.35, 0.15),
                priority: 70,
            },
            Expert {
                id: "compare-matrix".to_string(),
                expert_type: ExpertType::Specialized,
                name: "Compare Matrix".to_string(),
                supported_tools: tools(&["compare"]),
                max_concurrency: 6,
                avg_latency_ms: 140.0,
                accuracy_score: 0.9,
                weights: ScoreWeights::new(0.5, 0.15, 0.2, 0.15),
                priority: 75,
            },
            Expert {
                id: "catalog-scan".to_string(),
                expert_type: ExpertType::Latency,
                name: "Catalog Scan".to_string(),
                supported_tools: tools(&["search", "install"]),
                max_concurrency: 24,
                avg_latency_ms: 40.0,
                accuracy_score: 0.78,
                weights: ScoreWeights::new(0.2, 0.5, 0.15, 0.15),
                priority: 60,
            },
            Expert {
                id: "deep-context".to_string(),
                expert_type: ExpertType::Accuracy,
                name: "Deep Context".to_string(),
                supported_tools: tools(&["recommend", "compare"]),
                max_concurrency: 4,
                avg_latency_ms: 180.0,
                accuracy_score: 0.93,
                weights: ScoreWeights::new(0.6, 0.05, 0.2, 0.15),
                priority: 65,
            },
        ]
    }
}

/// Runtime status tracked per expert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpertStatus {
    /// Health classification
    pub state: ExpertState,
    /// Load fraction in [0, 1]
    pub load: f32,
    /// Requests currently executing
    pub active_requests: u32,
    /// Exponential moving average of execution successes
    pub success_rate: f32,
    /// Observed p95 latency
    pub p95_latency_ms: f64,
    /// When the health loop last classified this expert
    pub last_health_check: DateTime<Utc>,
}

impl Default for ExpertStatus {
    fn default() -> Self {
        Self {
            state: ExpertState::Healthy,
            load: 0.0,
            active_requests: 0,
            success_rate: 1.0,
            p95_latency_ms: 0.0,
            last_health_check: Utc::now(),
        }
    }
}

/// Catalog of experts plus their runtime status.
///
/// Status mutations are serialized by an interior lock; the catalog itself
/// is immutable after construction.
pub struct ExpertRegistry {
    experts: Vec<Expert>,
    status: Mutex<HashMap<String, ExpertStatus>>,
}

impl ExpertRegistry {
    /// Build a registry over a validated catalog.
    #[must_use]
    pub fn new(experts: Vec<Expert>) -> Self {
        let status = experts
            .iter()
            .map(|expert| (expert.id.clone(), ExpertStatus::default()))
            .collect();
        Self {
            experts,
            status: Mutex::new(status),
        }
    }

    /// All experts in the catalog.
    #[must_use]
    pub fn experts(&self) -> &[Expert] {
        &self.experts
    }

    /// Look up one expert definition.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Expert> {
        self.experts.iter().find(|expert| expert.id == id)
    }

    /// Current status for one expert.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<ExpertStatus> {
        self.status.lock().get(id).copied()
    }

    /// Experts that support `tool`, are not unhealthy, and are below the
    /// eligibility load ceiling.
    #[must_use]
    pub fn eligible_for(&self, tool: &str) -> Vec<Expert> {
        let status = self.status.lock();
        self.experts
            .iter()
            .filter(|expert| {
                if !expert.supports(tool) {
                    return false;
                }
                let Some(current) = status.get(&expert.id) else {
                    return false;
                };
                current.state != ExpertState::Unhealthy
                    && current.load < defaults::MAX_ELIGIBLE_LOAD
            })
            .cloned()
            .collect()
    }

    /// Force an expert's health state (used by health checks and tests).
    pub fn set_state(&self, id: &str, state: ExpertState) {
        if let Some(status) = self.status.lock().get_mut(id) {
            status.state = state;
        }
    }

    /// Update an expert's load fraction, clamped to [0, 1].
    pub fn set_load(&self, id: &str, load: f32) {
        if let Some(status) = self.status.lock().get_mut(id) {
            status.load = load.clamp(0.0, 1.0);
        }
    }

    /// Fold one execution outcome into the expert's success-rate EMA.
    pub fn record_result(&self, id: &str, success: bool) {
        let alpha = defaults::SUCCESS_RATE_EMA_ALPHA;
        if let Some(status) = self.status.lock().get_mut(id) {
            let observation = if success { 1.0 } else { 0.0 };
            status.success_rate = (1.0 - alpha) * status.success_rate + alpha * observation;
        }
    }

    /// Mark one request in flight; load is active requests over declared
    /// max concurrency.
    pub fn begin_request(&self, id: &str) {
        let Some(max_concurrency) = self.get(id).map(|e| e.max_concurrency.max(1)) else {
            return;
        };
        if let Some(status) = self.status.lock().get_mut(id) {
            status.active_requests += 1;
            status.load = (status.active_requests as f32 / max_concurrency as f32).clamp(0.0, 1.0);
        }
    }

    /// Mark one request finished, folding its latency into the p95 estimate.
    pub fn finish_request(&self, id: &str, latency_ms: f64) {
        let Some(max_concurrency) = self.get(id).map(|e| e.max_concurrency.max(1)) else {
            return;
        };
        if let Some(status) = self.status.lock().get_mut(id) {
            status.active_requests = status.active_requests.saturating_sub(1);
            status.load = (status.active_requests as f32 / max_concurrency as f32).clamp(0.0, 1.0);
            status.p95_latency_ms = if latency_ms >= status.p95_latency_ms {
                latency_ms
            } else {
                0.99 * status.p95_latency_ms + 0.01 * latency_ms
            };
        }
    }

    /// Reclassify every expert from its current load.
    ///
    /// Load above 0.95 is unhealthy, above 0.9 degraded, else healthy.
    pub fn run_health_checks(&self) {
        let now = Utc::now();
        let mut status = self.status.lock();
        for (id, current) in status.iter_mut() {
            let next = if current.load > defaults::MAX_ELIGIBLE_LOAD {
                ExpertState::Unhealthy
            } else if current.load > defaults::DEGRADED_LOAD {
                ExpertState::Degraded
            } else {
                ExpertState::Healthy
            };
            if next != current.state {
                debug!(expert_id = %id, ?next, "Expert health transition");
            }
            current.state = next;
            current.last_health_check = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_shape() {
        let catalog = Expert::default_catalog();
        assert_eq!(catalog.len(), 8);

        // Ids are unique and every declared weight profile is valid.
        let mut ids: Vec<&str> = catalog.iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        for expert in &catalog {
            expert.weights.validate(&expert.id).unwrap();
            assert!(!expert.supported_tools.is_empty());
        }
    }

    #[test]
    fn test_every_tool_has_coverage() {
        let catalog = Expert::default_catalog();
        for tool in ["search", "recommend", "install", "compare"] {
            assert!(
                catalog.iter().any(|e| e.supports(tool)),
                "no expert supports {tool}"
            );
        }
    }

    #[test]
    fn test_eligible_excludes_unhealthy() {
        let registry = ExpertRegistry::new(Expert::default_catalog());
        let before = registry.eligible_for("search");
        assert!(!before.is_empty());

        for expert in &before {
            registry.set_state(&expert.id, ExpertState::Unhealthy);
        }
        assert!(registry.eligible_for("search").is_empty());
    }

    #[test]
    fn test_eligible_excludes_overloaded() {
        let registry = ExpertRegistry::new(Expert::default_catalog());
        registry.set_load("rapid-search", 0.97);
        assert!(
            !registry
                .eligible_for("search")
                .iter()
                .any(|e| e.id == "rapid-search")
        );
    }

    #[test]
    fn test_health_check_thresholds() {
        let registry = ExpertRegistry::new(Expert::default_catalog());
        registry.set_load("rapid-search", 0.96);
        registry.set_load("precision-search", 0.92);
        registry.set_load("balanced-discovery", 0.5);
        registry.run_health_checks();

        assert_eq!(
            registry.status("rapid-search").unwrap().state,
            ExpertState::Unhealthy
        );
        assert_eq!(
            registry.status("precision-search").unwrap().state,
            ExpertState::Degraded
        );
        assert_eq!(
            registry.status("balanced-discovery").unwrap().state,
            ExpertState::Healthy
        );
    }

    #[test]
    fn test_success_rate_ema() {
        let registry = ExpertRegistry::new(Expert::default_catalog());
        registry.record_result("rapid-search", false);
        let after_failure = registry.status("rapid-search").unwrap().success_rate;
        assert!((after_failure - 0.99).abs() < 1e-6);

        registry.record_result("rapid-search", true);
        let after_success = registry.status("rapid-search").unwrap().success_rate;
        assert!((after_success - (0.99 * 0.99 + 0.01)).abs() < 1e-6);
    }

    #[test]
    fn test_request_lifecycle_tracks_load_and_latency() {
        let registry = ExpertRegistry::new(Expert::default_catalog());

        // deep-context has max_concurrency 4: two in flight is load 0.5.
        registry.begin_request("deep-context");
        registry.begin_request("deep-context");
        let busy = registry.status("deep-context").unwrap();
        assert_eq!(busy.active_requests, 2);
        assert!((busy.load - 0.5).abs() < 1e-6);

        registry.finish_request("deep-context", 120.0);
        let after = registry.status("deep-context").unwrap();
        assert_eq!(after.active_requests, 1);
        assert!((after.load - 0.25).abs() < 1e-6);
        assert!((after.p95_latency_ms - 120.0).abs() < 1e-9);

        // A faster request decays the estimate instead of replacing it.
        registry.finish_request("deep-context", 10.0);
        let decayed = registry.status("deep-context").unwrap();
        assert!(decayed.p95_latency_ms < 120.0);
        assert!(decayed.p95_latency_ms > 10.0);
    }

    #[test]
    fn test_unknown_expert_is_noop() {
        let registry = ExpertRegistry::new(Expert::default_catalog());
        registry.record_result("no-such-expert", true);
        registry.set_state("no-such-expert", ExpertState::Unhealthy);
        assert!(registry.status("no-such-expert").is_none());
    }
}
