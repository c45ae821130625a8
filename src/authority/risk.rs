//! Phase risk classification.
//!
//! Maps (mission phase, task criticality) to an ordered risk level. The phase
//! vocabulary is open: unknown phases classify as `Medium`, the fail-safe
//! middle ground, and unknown criticalities contribute no modifier. Neither is
//! an error.

use crate::authority::types::PhaseRiskLevel;

/// Base risk for a mission phase. Unknown phases default to `Medium`.
#[must_use]
pub fn base_risk(phase: &str) -> PhaseRiskLevel {
    match phase {
        "Docking" | "DockingApproach" => PhaseRiskLevel::Critical,
        "Undocking" => PhaseRiskLevel::High,
        "Inspection" => PhaseRiskLevel::Medium,
        "Transit" => PhaseRiskLevel::Low,
        "Charging" => PhaseRiskLevel::Safe,
        _ => PhaseRiskLevel::Medium,
    }
}

/// Risk-level steps added for task criticality. Unknown criticalities add none.
#[must_use]
pub fn criticality_modifier(criticality: &str) -> u8 {
    match criticality {
        "Important" => 1,
        "Critical" => 2,
        _ => 0,
    }
}

/// Effective risk: base escalated by the criticality modifier, clamped at
/// `Critical`. Never drops below the phase's base risk.
#[must_use]
pub fn risk_level(phase: &str, criticality: &str) -> PhaseRiskLevel {
    base_risk(phase).escalate(criticality_modifier(criticality))
}

/// The single hard safety gate: autonomous operation is prohibited whenever
/// the effective risk is `Critical`.
#[must_use]
pub fn is_autonomous_allowed(phase: &str, criticality: &str) -> bool {
    risk_level(phase, criticality) != PhaseRiskLevel::Critical
}
