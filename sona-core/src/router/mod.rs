//! SONA mixture-of-experts router.
//!
//! Routes each tool request to one of eight specialized experts by
//! weighted scoring against the tool's profile, with an LRU decision
//! cache, runtime health tracking, and a direct-fallback execution path.

mod cache;
mod decision;
mod experts;
mod outcome;
mod v3;

pub use crate::config::RouterConfig;
pub use cache::{CacheMetrics, DecisionCache};
pub use decision::{
    AlternativeScore, ExpertScores, RequestPriority, RoutingDecision, RoutingRequest, ScoreWeights,
};
pub use experts::{Expert, ExpertRegistry, ExpertState, ExpertStatus, ExpertType};
pub use outcome::{RoutingOutcome, spawn_outcome_recorder};
pub use v3::V3Integration;

use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::{FALLBACK_EXPERT_ID, FALLBACK_REASON_PREFIX, defaults};
use crate::error::{Error, Result};
use crate::pattern::OutcomeType;

/// A routed and executed request, with timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedExecution {
    /// Executor result payload
    pub result: serde_json::Value,
    /// Expert that produced the result
    pub expert_id: String,
    /// The routing decision behind the execution
    pub routing: RoutingDecision,
    /// Executor wall-clock time
    pub execution_time_ms: f64,
    /// Whether the direct fallback produced the result
    pub fallback_used: bool,
}

/// Mixture-of-experts router over a static expert catalog.
///
/// The scoring path performs no I/O; interior state (cache, expert status)
/// is serialized by locks, so the router is shared behind an `Arc`.
pub struct SonaRouter {
    registry: ExpertRegistry,
    cache: DecisionCache,
    config: RouterConfig,
    outcomes: Option<mpsc::UnboundedSender<RoutingOutcome>>,
    v3: Option<Arc<dyn V3Integration>>,
}

impl SonaRouter {
    /// Build a router from a validated configuration.
    pub fn new(config: RouterConfig) -> Result<Self> {
        config.validate()?;
        let registry = ExpertRegistry::new(config.experts.clone());
        let cache = DecisionCache::new(config.cache_size, config.cache_ttl);
        Ok(Self {
            registry,
            cache,
            config,
            outcomes: None,
            v3: None,
        })
    }

    /// Attach an external weight optimizer as an observer.
    #[must_use]
    pub fn with_v3(mut self, v3: Arc<dyn V3Integration>) -> Self {
        self.v3 = Some(v3);
        self
    }

    /// Open the outcome stream.
    ///
    /// Call before sharing the router; executed requests are then
    /// published as [`RoutingOutcome`] events for a consumer such as
    /// [`spawn_outcome_recorder`].
    pub fn outcome_stream(&mut self) -> mpsc::UnboundedReceiver<RoutingOutcome> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outcomes = Some(tx);
        rx
    }

    /// Expert registry, for health management and introspection.
    #[must_use]
    pub fn registry(&self) -> &ExpertRegistry {
        &self.registry
    }

    /// Decision cache counters.
    #[must_use]
    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Route one request to the best eligible expert.
    ///
    /// Non-high-priority requests probe the decision cache first. With no
    /// eligible expert the decision falls back to `direct-fallback` with
    /// full confidence. Decision time is wall-clock from entry to exit.
    pub fn route(&self, request: &RoutingRequest) -> Result<RoutingDecision> {
        let started = std::time::Instant::now();
        if request.tool.is_empty() {
            return Err(Error::InvalidInput(
                "routing request requires a tool".to_string(),
            ));
        }

        let cache_key = request.cache_key();
        if self.config.enable_cache && request.priority != RequestPriority::High {
            if let Some(mut decision) = self.cache.get(cache_key) {
                decision.cache_hit = true;
                debug!(tool = %request.tool, expert_id = %decision.expert_id, "Decision cache hit");
                return Ok(decision);
            }
        }

        let eligible = self.registry.eligible_for(&request.tool);
        if eligible.is_empty() {
            warn!(tool = %request.tool, "No eligible experts, routing to direct fallback");
            return Ok(Self::fallback_decision(started));
        }

        let mut scored: Vec<(Expert, ExpertScores)> = eligible
            .into_iter()
            .map(|expert| {
                let scores = self.score_expert(&expert, request);
                (expert, scores)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.total_score
                .partial_cmp(&a.1.total_score)
                .unwrap_or(Ordering::Equal)
        });

        let (winner, winner_scores) = scored[0].clone();
        let confidence = match scored.get(1) {
            Some((_, runner_up)) => {
                let margin = winner_scores.total_score - runner_up.total_score;
                (0.5 + 2.0 * margin).min(1.0)
            }
            None => 1.0,
        };
        let alternatives: Vec<AlternativeScore> = scored[1..]
            .iter()
            .map(|(expert, scores)| AlternativeScore {
                expert_id: expert.id.clone(),
                total_score: scores.total_score,
            })
            .collect();

        let decision = RoutingDecision {
            expert_id: winner.id.clone(),
            confidence,
            reason: format!(
                "Selected {} for '{}' with score {:.3}",
                winner.id, request.tool, winner_scores.total_score
            ),
            cache_hit: false,
            decision_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            scores: winner_scores,
            alternatives,
        };

        if self.config.enable_cache {
            self.cache.insert(cache_key, decision.clone());
        }
        debug!(
            tool = %request.tool,
            expert_id = %decision.expert_id,
            confidence = decision.confidence,
            "Routed request"
        );
        Ok(decision)
    }

    fn fallback_decision(started: std::time::Instant) -> RoutingDecision {
        RoutingDecision {
            expert_id: FALLBACK_EXPERT_ID.to_string(),
            confidence: 1.0,
            reason: format!("{FALLBACK_REASON_PREFIX}NO_ELIGIBLE_EXPERTS"),
            cache_hit: false,
            decision_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            scores: ExpertScores::perfect(),
            alternatives: vec![],
        }
    }

    fn score_expert(&self, expert: &Expert, request: &RoutingRequest) -> ExpertScores {
        let status = self.registry.status(&expert.id).unwrap_or_default();

        let accuracy_score = expert.accuracy_score * (1.0 - 0.1 * status.load);

        let mut latency_score =
            (1.0 - expert.avg_latency_ms / defaults::LATENCY_SCORE_SCALE_MS).max(0.0) as f32;
        if let Some(budget) = request.max_latency_ms {
            if expert.avg_latency_ms > budget {
                latency_score *= 0.5;
            }
        }

        let reliability_score = status.success_rate;
        let efficiency_score = 1.0 - status.load;

        let weights = self
            .config
            .tool_weights
            .get(&request.tool)
            .copied()
            .unwrap_or(self.config.default_weights);

        let mut total_score = weights.accuracy * accuracy_score
            + weights.latency * latency_score
            + weights.reliability * reliability_score
            + weights.efficiency * efficiency_score;

        if expert.expert_type == ExpertType::Specialized && expert.supported_tools.len() == 1 {
            total_score *= defaults::SPECIALIZATION_BONUS;
        }
        total_score += expert.priority as f32 / defaults::PRIORITY_TIEBREAK_DIVISOR;

        ExpertScores {
            accuracy_score,
            latency_score,
            reliability_score,
            efficiency_score,
            total_score,
        }
    }

    /// Route and execute, with one fallback attempt on failure.
    ///
    /// Success folds into the expert's success-rate EMA; failure does too,
    /// then the direct fallback gets exactly one try (when enabled and the
    /// chosen expert was not already the fallback). If the fallback also
    /// fails, the original error surfaces with expert metadata.
    pub async fn execute_with_routing<F, Fut>(
        &self,
        request: &RoutingRequest,
        executor: F,
    ) -> Result<RoutedExecution>
    where
        F: Fn(String, RoutingRequest) -> Fut,
        Fut: Future<Output = Result<serde_json::Value>>,
    {
        let decision = self.route(request)?;
        let started = std::time::Instant::now();

        self.registry.begin_request(&decision.expert_id);
        let primary = executor(decision.expert_id.clone(), request.clone()).await;
        self.registry
            .finish_request(&decision.expert_id, started.elapsed().as_secs_f64() * 1000.0);

        match primary {
            Ok(result) => {
                self.record_outcome(request, &decision.expert_id, true, decision.confidence);
                Ok(RoutedExecution {
                    result,
                    expert_id: decision.expert_id.clone(),
                    routing: decision,
                    execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                    fallback_used: false,
                })
            }
            Err(primary_error) => {
                self.record_outcome(request, &decision.expert_id, false, decision.confidence);
                warn!(
                    expert_id = %decision.expert_id,
                    tool = %request.tool,
                    "Expert execution failed: {primary_error}"
                );

                if self.config.enable_fallback && decision.expert_id != FALLBACK_EXPERT_ID {
                    match executor(FALLBACK_EXPERT_ID.to_string(), request.clone()).await {
                        Ok(result) => {
                            self.record_outcome(
                                request,
                                FALLBACK_EXPERT_ID,
                                true,
                                decision.confidence,
                            );
                            info!(tool = %request.tool, "Direct fallback recovered execution");
                            return Ok(RoutedExecution {
                                result,
                                expert_id: FALLBACK_EXPERT_ID.to_string(),
                                routing: decision,
                                execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                                fallback_used: true,
                            });
                        }
                        Err(fallback_error) => {
                            warn!("Direct fallback also failed: {fallback_error}");
                        }
                    }
                }

                Err(Error::ExecutorFailed {
                    expert_id: decision.expert_id,
                    message: primary_error.to_string(),
                })
            }
        }
    }

    fn record_outcome(&self, request: &RoutingRequest, expert_id: &str, success: bool, confidence: f32) {
        self.registry.record_result(expert_id, success);

        let outcome_type = if success {
            OutcomeType::Usage
        } else {
            OutcomeType::Dismiss
        };
        if let Some(v3) = &self.v3 {
            v3.update_expert_weights(expert_id, outcome_type.default_reward());
        }
        if let Some(outcomes) = &self.outcomes {
            let event = RoutingOutcome::finished(
                request.tool.clone(),
                expert_id,
                request.skill_id.clone(),
                success,
                confidence,
            );
            // A dropped receiver just means nobody is learning from outcomes.
            let _ = outcomes.send(event);
        }
    }

    /// Spawn the periodic health-check loop.
    ///
    /// The loop holds only a weak reference and exits when the router is
    /// dropped.
    #[must_use]
    pub fn spawn_health_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let interval = self.config.health_check_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(router) = weak.upgrade() else {
                    break;
                };
                router.registry.run_health_checks();
            }
        })
    }
}
