//! Pattern importance formulas.
//!
//! Importance decides what consolidation preserves. The shape is
//! `base · recency · access · lambda_scaled`, where positive outcomes get
//! a 1.5× base boost, recency decays as `exp(-age_days / 30)`, access
//! grows as `1 + ln(1 + count)`, and the Fisher term rewards patterns
//! whose strong dimensions the matrix marks as consequential.

use chrono::{DateTime, Utc};

use super::types::Pattern;

/// Importance assigned at insertion time, before any consolidation.
#[must_use]
pub fn initial_importance(reward: f32, confidence: Option<f32>, importance_threshold: f32) -> f32 {
    let base = reward.abs() * if reward > 0.0 { 1.5 } else { 1.0 };
    base * confidence.unwrap_or(1.0) * importance_threshold * 10.0
}

/// Full importance recomputation used by consolidation and dedup updates.
#[must_use]
pub fn pattern_importance(
    pattern: &Pattern,
    fisher_importance: &[f32],
    lambda: f32,
    now: DateTime<Utc>,
) -> f32 {
    let reward = pattern.outcome_reward;
    let base = reward.abs() * if reward > 0.0 { 1.5 } else { 1.0 };

    let age_days = (now - pattern.created_at).num_seconds().max(0) as f32 / 86_400.0;
    let recency = (-age_days / 30.0).exp();

    let access_factor = 1.0 + (1.0 + pattern.access_count as f32).ln();

    let dimension = dimension_importance(&pattern.context_embedding, fisher_importance);
    let lambda_scaled = 1.0 + lambda * dimension / 10.0;

    base * recency * access_factor * lambda_scaled
}

/// Mean over dimensions of `fisher_importance[i] · |embedding[i]|`.
fn dimension_importance(embedding: &[f32], fisher_importance: &[f32]) -> f32 {
    if embedding.is_empty() {
        return 0.0;
    }

    let sum: f32 = embedding
        .iter()
        .enumerate()
        .map(|(i, value)| fisher_importance.get(i).copied().unwrap_or(0.0) * value.abs())
        .sum();
    sum / embedding.len() as f32
}
