//! Optional V3 optimizer integration.

/// Observer hook for an external expert-weight optimizer.
///
/// When present, the router notifies it after every execution outcome.
/// It is an observer, not a contract: routing semantics never depend on
/// it, and its absence degrades to the local scoring algorithm.
pub trait V3Integration: Send + Sync {
    /// Observe the reward attributed to one expert's execution.
    fn update_expert_weights(&self, expert_id: &str, reward: f32);
}
