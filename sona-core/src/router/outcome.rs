//! Outcome stream decoupling the router from the pattern store.
//!
//! The router publishes [`RoutingOutcome`] events on a channel; a consumer
//! task feeds them into the pattern store. Neither side holds a reference
//! to the other, so the "routing outcome → pattern update → next scoring"
//! cycle stays acyclic in the object graph.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::pattern::{
    OutcomeType, PatternContext, PatternDraft, RecommendationSource, RecordedOutcome,
    SkillFeatures,
};
use crate::store::PatternStore;

/// One executed routing decision, as published on the outcome stream.
#[derive(Debug, Clone)]
pub struct RoutingOutcome {
    /// Tool that was routed
    pub tool: String,
    /// Expert that executed the request
    pub expert_id: String,
    /// Skill the request concerned, when known
    pub skill_id: Option<String>,
    /// Whether the execution succeeded
    pub success: bool,
    /// Outcome class for pattern recording (success → usage, failure → dismiss)
    pub outcome_type: OutcomeType,
    /// Routing confidence at decision time
    pub confidence: f32,
    /// When the execution finished
    pub finished_at: DateTime<Utc>,
}

/// Spawn a task that records routing outcomes as patterns.
///
/// Outcomes without a `skill_id` carry no recommendation evidence and are
/// skipped. Storage errors are logged and swallowed; the consumer never
/// takes the router down. The task ends when the sender side is dropped.
pub fn spawn_outcome_recorder(
    store: Arc<PatternStore>,
    mut outcomes: mpsc::UnboundedReceiver<RoutingOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outcome) = outcomes.recv().await {
            let Some(skill_id) = outcome.skill_id.clone() else {
                debug!(tool = %outcome.tool, "Skipping outcome without skill context");
                continue;
            };

            let draft = PatternDraft {
                skill_features: SkillFeatures::for_skill(skill_id),
                context_data: PatternContext {
                    keywords: vec![outcome.tool.clone()],
                    ..PatternContext::default()
                },
                original_score: outcome.confidence.clamp(0.0, 1.0),
                source: RecommendationSource::Recommend,
                confidence: None,
            };
            if let Err(err) = store
                .store_pattern(draft, RecordedOutcome::of(outcome.outcome_type))
                .await
            {
                warn!(
                    tool = %outcome.tool,
                    expert_id = %outcome.expert_id,
                    "Failed to record routing outcome: {err}"
                );
            }
        }
        debug!("Outcome recorder drained");
    })
}

impl RoutingOutcome {
    /// Build the outcome for one finished execution.
    #[must_use]
    pub fn finished(
        tool: impl Into<String>,
        expert_id: impl Into<String>,
        skill_id: Option<String>,
        success: bool,
        confidence: f32,
    ) -> Self {
        Self {
            tool: tool.into(),
            expert_id: expert_id.into(),
            skill_id,
            success,
            outcome_type: if success {
                OutcomeType::Usage
            } else {
                OutcomeType::Dismiss
            },
            confidence,
            finished_at: Utc::now(),
        }
    }
}
