//! Degradation diagnosis: table-driven causal hints for reduced autonomous
//! reliability.
//!
//! Best-effort only. A full diagnostic subsystem would inspect the
//! reliability estimator's internal factors; here the estimate arrives as an
//! opaque score, so the factors are plausible hints keyed on thresholds.

use crate::authority::types::ModeRecommendation;
use crate::core::config::EngineConfig;

/// Derive plausible causal factors for degraded autonomous performance.
///
/// Always returns at least one factor.
#[must_use]
pub fn diagnose_degradation(rec: &ModeRecommendation, config: &EngineConfig) -> Vec<String> {
    let mut factors = Vec::new();

    if rec.autonomous_reliability < config.low_threshold {
        factors.push("Navigation accuracy reduced (possible USBL degradation)".to_string());
        factors.push("Environmental conditions affecting stability".to_string());
    }

    if let Some(docking) = rec.docking_reliability
        && docking < config.docking_degraded_threshold
    {
        factors.push(format!(
            "Docking conditions suboptimal (reliability: {:.0}%)",
            docking * 100.0
        ));
    }

    if factors.is_empty() {
        factors.push("Minor performance degradation detected".to_string());
    }

    factors
}
