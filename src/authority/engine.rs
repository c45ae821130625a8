//! The authority rule engine: a deterministic five-tier priority chain.
//!
//! Tiers, evaluated strictly in order; the first matching tier returns:
//! 1. Operator override (can itself be blocked by the autonomy gate)
//! 2. Hard safety rules A and B
//! 3. Anti-oscillation hysteresis
//! 4. Phase-dependent rules, dispatched on effective risk
//! 5. Maintain current mode
//!
//! Hard safety rules are checked BEFORE hysteresis: rule B fires inside the
//! minimum-mode-duration window. The engine holds only immutable thresholds;
//! current mode and elapsed time arrive as arguments, so `evaluate` is a pure
//! function of its inputs and every call yields a complete decision.

use crate::authority::diagnosis::diagnose_degradation;
use crate::authority::explain::{ExplanationScenario, compose, render_text};
use crate::authority::risk::{is_autonomous_allowed, risk_level};
use crate::authority::types::{
    ActionType, AuthorityDecision, ControlMode, DecisionReason, ModeRecommendation,
    PhaseRiskLevel, Urgency,
};
use crate::core::config::EngineConfig;

/// Confirmation deadlines per phase-rule cell, in seconds.
const SHARED_ASK_TIMEOUT_SECS: u32 = 30;
const HIGH_RISK_ASK_TIMEOUT_SECS: u32 = 45;
const MEDIUM_RISK_ASK_TIMEOUT_SECS: u32 = 60;

/// Phase-dependent authority arbitration engine.
///
/// Construction fixes the thresholds; the engine never mutates afterwards and
/// is freely shareable across calls.
#[derive(Debug, Clone)]
pub struct AuthorityRuleEngine {
    config: EngineConfig,
}

impl AuthorityRuleEngine {
    /// Create an engine with the given thresholds.
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The thresholds this engine was constructed with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one arbitration cycle.
    ///
    /// Preconditions owned by the caller (enforced at feed ingestion): all
    /// reliability/confidence scalars in `[0, 1]`, `elapsed_seconds`
    /// non-negative, at least one recommendation received.
    #[must_use]
    pub fn evaluate(
        &self,
        current_mode: ControlMode,
        recommendation: &ModeRecommendation,
        phase: &str,
        criticality: &str,
        elapsed_seconds: f64,
        operator_override: Option<ControlMode>,
    ) -> AuthorityDecision {
        let risk = risk_level(phase, criticality);

        // Tier 1: operator override.
        if let Some(requested) = operator_override {
            return self.handle_operator_override(requested, current_mode, risk, phase);
        }

        // Tier 2: hard safety rules.
        if let Some(decision) =
            self.apply_safety_rules(current_mode, recommendation, risk, phase)
        {
            return decision;
        }

        // Tier 3: hysteresis window.
        if elapsed_seconds < self.config.minimum_mode_duration_secs
            && recommendation.recommended_mode != current_mode
        {
            return self.hysteresis_hold(current_mode, elapsed_seconds);
        }

        // Tiers 4-5: phase-dependent rules with a maintain default.
        self.apply_phase_rules(current_mode, recommendation, risk, phase)
    }

    // ──────────────────── tier 1: operator override ────────────────────

    fn handle_operator_override(
        &self,
        requested: ControlMode,
        current_mode: ControlMode,
        risk: PhaseRiskLevel,
        phase: &str,
    ) -> AuthorityDecision {
        // The autonomy gate outranks the override.
        if requested == ControlMode::Autonomous && risk == PhaseRiskLevel::Critical {
            return AuthorityDecision {
                action: ActionType::Block,
                target_mode: current_mode,
                message: format!("Autonomous mode not allowed during {phase}"),
                explanation: format!(
                    "Safety rules prohibit autonomous operation during {phase} phase. \
                     This is a critical phase requiring human judgment. \
                     Shared control is available if you need assistance."
                ),
                urgency: Urgency::High,
                allow_decline: false,
                timeout_seconds: None,
                reason: DecisionReason::OverrideBlocked {
                    phase: phase.to_string(),
                    risk_level: risk,
                    alternative: "Shared control available".to_string(),
                },
            };
        }

        let warning = if risk >= PhaseRiskLevel::High {
            format!(" Warning: {phase} is a high-risk phase.")
        } else {
            String::new()
        };

        AuthorityDecision {
            action: ActionType::AutoSwitch,
            target_mode: requested,
            message: format!("Operator override accepted: {requested}{warning}"),
            explanation: format!(
                "You have manually selected {requested} mode. \
                 The system will respect your decision.{warning}"
            ),
            urgency: Urgency::from_risk(risk),
            allow_decline: false,
            timeout_seconds: None,
            reason: DecisionReason::OverrideAccepted {
                phase: phase.to_string(),
                risk_level: risk,
            },
        }
    }

    // ──────────────────── tier 2: hard safety rules ────────────────────

    /// Rule A, then rule B, in that fixed order. Both are independent of
    /// hysteresis and of the recommended/current mode comparison beyond what
    /// each rule states.
    fn apply_safety_rules(
        &self,
        current_mode: ControlMode,
        rec: &ModeRecommendation,
        risk: PhaseRiskLevel,
        phase: &str,
    ) -> Option<AuthorityDecision> {
        // Rule A: critically low human reliability during a critical phase.
        if risk == PhaseRiskLevel::Critical
            && current_mode == ControlMode::Human
            && rec.human_reliability < self.config.critical_low_threshold
        {
            return Some(AuthorityDecision {
                action: ActionType::Notify,
                target_mode: current_mode,
                message: format!("SAFETY ALERT: Critical fatigue during {phase}"),
                explanation: format!(
                    "Your reliability is critically low ({:.2}) during {phase} phase. \
                     Consider aborting operation and returning to safe zone. \
                     Autonomous mode is not allowed during this critical phase. \
                     Shared control can provide assistance.",
                    rec.human_reliability
                ),
                urgency: Urgency::Critical,
                allow_decline: false,
                timeout_seconds: None,
                reason: DecisionReason::SafetyAlert {
                    human_reliability: rec.human_reliability,
                    threshold: self.config.critical_low_threshold,
                    phase: phase.to_string(),
                    recommendation: "abort_and_rest".to_string(),
                },
            });
        }

        // Rule B: degraded autonomy handing off to the operator. Evaluated
        // before hysteresis, so it fires inside the dwell window.
        if current_mode == ControlMode::Autonomous
            && rec.recommended_mode == ControlMode::Human
            && rec.autonomous_reliability < self.config.low_threshold
        {
            let factors = diagnose_degradation(rec, &self.config);
            return Some(AuthorityDecision {
                action: ActionType::AutoSwitch,
                target_mode: ControlMode::Human,
                message: "Autonomous performance degraded, switching to human control"
                    .to_string(),
                explanation: format!(
                    "Autonomous control reliability has dropped to {:.2}. \
                     Reasons: {}. Human control required for safety.",
                    rec.autonomous_reliability,
                    factors.join("; ")
                ),
                urgency: Urgency::High,
                allow_decline: false,
                timeout_seconds: None,
                reason: DecisionReason::DegradedAutoSwitch {
                    autonomous_reliability: rec.autonomous_reliability,
                    threshold: self.config.low_threshold,
                    factors,
                },
            });
        }

        None
    }

    // ──────────────────── tier 3: hysteresis ────────────────────

    fn hysteresis_hold(&self, current_mode: ControlMode, elapsed_seconds: f64) -> AuthorityDecision {
        AuthorityDecision {
            action: ActionType::None,
            target_mode: current_mode,
            message: format!("Mode stable for {:.0}s", elapsed_seconds.floor()),
            explanation: "Minimum mode duration has not elapsed; suppressing changes to \
                          prevent rapid mode switching."
                .to_string(),
            urgency: Urgency::Low,
            allow_decline: false,
            timeout_seconds: None,
            reason: DecisionReason::Hysteresis {
                elapsed_seconds,
                remaining_seconds: self.config.minimum_mode_duration_secs - elapsed_seconds,
            },
        }
    }

    // ──────────────────── tiers 4-5: phase rules ────────────────────

    fn apply_phase_rules(
        &self,
        current_mode: ControlMode,
        rec: &ModeRecommendation,
        risk: PhaseRiskLevel,
        phase: &str,
    ) -> AuthorityDecision {
        if current_mode == rec.recommended_mode {
            return AuthorityDecision {
                action: ActionType::None,
                target_mode: current_mode,
                message: format!("Mode stable: {current_mode}"),
                explanation: format!("Current mode is optimal for {phase} phase."),
                urgency: Urgency::Low,
                allow_decline: false,
                timeout_seconds: None,
                reason: DecisionReason::ModeStable {
                    phase: phase.to_string(),
                },
            };
        }

        match risk {
            PhaseRiskLevel::Critical => self.handle_critical_phase(current_mode, rec, phase),
            PhaseRiskLevel::High => self.handle_high_risk_phase(current_mode, rec, phase),
            PhaseRiskLevel::Medium => self.handle_medium_risk_phase(current_mode, rec, phase),
            PhaseRiskLevel::Low => self.handle_low_risk_phase(current_mode, rec, phase),
            PhaseRiskLevel::Safe => self.handle_safe_phase(current_mode, rec, phase),
        }
    }

    fn handle_critical_phase(
        &self,
        current_mode: ControlMode,
        rec: &ModeRecommendation,
        phase: &str,
    ) -> AuthorityDecision {
        match (current_mode, rec.recommended_mode) {
            (ControlMode::Autonomous, ControlMode::Human) => {
                let facts = compose(
                    ExplanationScenario::AutoToHumanCritical,
                    phase,
                    rec,
                    "Autonomous system detected conditions requiring human judgment",
                    &self.config,
                );
                AuthorityDecision {
                    action: ActionType::AutoSwitch,
                    target_mode: ControlMode::Human,
                    message: "Critical phase: switching to human control".to_string(),
                    explanation: render_text(&facts),
                    urgency: Urgency::Critical,
                    allow_decline: false,
                    timeout_seconds: None,
                    reason: DecisionReason::CriticalHandoff {
                        phase: phase.to_string(),
                        autonomous_reliability: rec.autonomous_reliability,
                        human_reliability: rec.human_reliability,
                    },
                }
            }
            (ControlMode::Human, ControlMode::Autonomous) => AuthorityDecision {
                action: ActionType::Block,
                target_mode: current_mode,
                message: format!("Autonomous mode blocked during {phase}"),
                explanation: format!(
                    "Autonomous operation is not permitted during {phase}. \
                     This critical phase requires human judgment and decision-making. \
                     Shared control is available if you need assistance with positioning \
                     or stabilization."
                ),
                urgency: Urgency::High,
                allow_decline: false,
                timeout_seconds: None,
                reason: DecisionReason::CriticalBlocked {
                    phase: phase.to_string(),
                },
            },
            (_, ControlMode::Shared) => {
                let facts = compose(
                    ExplanationScenario::SuggestSharedCritical,
                    phase,
                    rec,
                    "Shared control can assist during this critical phase",
                    &self.config,
                );
                AuthorityDecision {
                    action: ActionType::Ask,
                    target_mode: ControlMode::Shared,
                    message: format!("Shared control recommended for {phase}"),
                    explanation: render_text(&facts),
                    urgency: Urgency::Medium,
                    allow_decline: true,
                    timeout_seconds: Some(SHARED_ASK_TIMEOUT_SECS),
                    reason: DecisionReason::SharedAssist {
                        phase: phase.to_string(),
                        risk_level: PhaseRiskLevel::Critical,
                        from: current_mode,
                    },
                }
            }
            _ => self.maintain(current_mode, phase),
        }
    }

    fn handle_high_risk_phase(
        &self,
        current_mode: ControlMode,
        rec: &ModeRecommendation,
        phase: &str,
    ) -> AuthorityDecision {
        match (current_mode, rec.recommended_mode) {
            (ControlMode::Autonomous, ControlMode::Human) => {
                let facts = compose(
                    ExplanationScenario::AutoToHumanHigh,
                    phase,
                    rec,
                    "Autonomous reliability has decreased",
                    &self.config,
                );
                AuthorityDecision {
                    action: ActionType::AutoSwitch,
                    target_mode: ControlMode::Human,
                    message: "High-risk phase: switching to human control".to_string(),
                    explanation: render_text(&facts),
                    urgency: Urgency::High,
                    allow_decline: false,
                    timeout_seconds: None,
                    reason: DecisionReason::HighRiskHandoff {
                        phase: phase.to_string(),
                        autonomous_reliability: rec.autonomous_reliability,
                        human_reliability: rec.human_reliability,
                    },
                }
            }
            (ControlMode::Human, ControlMode::Autonomous) => {
                let fatigued = rec.human_reliability < self.config.low_threshold;
                let (urgency, prefix) = if fatigued {
                    (Urgency::High, "Your fatigue is high. ")
                } else {
                    (Urgency::Medium, "")
                };
                let facts = compose(
                    ExplanationScenario::HumanToAutoHigh,
                    phase,
                    rec,
                    &format!("{prefix}Autonomous system can handle {phase}"),
                    &self.config,
                );
                AuthorityDecision {
                    action: ActionType::Ask,
                    target_mode: ControlMode::Autonomous,
                    message: format!("{prefix}Switch to autonomous for {phase}?"),
                    explanation: render_text(&facts),
                    urgency,
                    allow_decline: true,
                    timeout_seconds: Some(HIGH_RISK_ASK_TIMEOUT_SECS),
                    reason: DecisionReason::AutonomyOffer {
                        phase: phase.to_string(),
                        human_reliability: rec.human_reliability,
                        autonomous_reliability: rec.autonomous_reliability,
                        fatigue_warning: fatigued,
                    },
                }
            }
            (_, ControlMode::Shared) => {
                let facts = compose(
                    ExplanationScenario::SuggestShared,
                    phase,
                    rec,
                    "Shared control balances human oversight with system assistance",
                    &self.config,
                );
                AuthorityDecision {
                    action: ActionType::Suggest,
                    target_mode: ControlMode::Shared,
                    message: format!("Shared control available for {phase}"),
                    explanation: render_text(&facts),
                    urgency: Urgency::Medium,
                    allow_decline: true,
                    timeout_seconds: Some(SHARED_ASK_TIMEOUT_SECS),
                    reason: DecisionReason::SharedAssist {
                        phase: phase.to_string(),
                        risk_level: PhaseRiskLevel::High,
                        from: current_mode,
                    },
                }
            }
            _ => self.maintain(current_mode, phase),
        }
    }

    fn handle_medium_risk_phase(
        &self,
        current_mode: ControlMode,
        rec: &ModeRecommendation,
        phase: &str,
    ) -> AuthorityDecision {
        match (current_mode, rec.recommended_mode) {
            (ControlMode::Autonomous, ControlMode::Human) => {
                let facts = compose(
                    ExplanationScenario::AutoDegradedMedium,
                    phase,
                    rec,
                    "Autonomous performance has decreased but can continue",
                    &self.config,
                );
                AuthorityDecision {
                    action: ActionType::Ask,
                    target_mode: ControlMode::Human,
                    message: "Autonomous performance degraded. Switch to manual?".to_string(),
                    explanation: format!(
                        "{} Autonomous mode can continue if you prefer.",
                        render_text(&facts)
                    ),
                    urgency: Urgency::Medium,
                    allow_decline: true,
                    timeout_seconds: Some(MEDIUM_RISK_ASK_TIMEOUT_SECS),
                    reason: DecisionReason::DegradedButContinuable {
                        phase: phase.to_string(),
                        autonomous_reliability: rec.autonomous_reliability,
                    },
                }
            }
            (ControlMode::Human, ControlMode::Autonomous) => {
                let facts = compose(
                    ExplanationScenario::OfferAutoAssist,
                    phase,
                    rec,
                    "Autopilot can handle routine inspection tasks",
                    &self.config,
                );
                AuthorityDecision {
                    action: ActionType::Suggest,
                    target_mode: ControlMode::Autonomous,
                    message: "Autopilot available. Enable to conserve attention?".to_string(),
                    explanation: format!(
                        "{} You can monitor without active control.",
                        render_text(&facts)
                    ),
                    urgency: Urgency::Low,
                    allow_decline: true,
                    timeout_seconds: None,
                    reason: DecisionReason::WorkloadRelief {
                        phase: phase.to_string(),
                        autonomous_reliability: rec.autonomous_reliability,
                    },
                }
            }
            (_, ControlMode::Shared) => {
                let facts = compose(
                    ExplanationScenario::SuggestShared,
                    phase,
                    rec,
                    "Shared control optimizes human-system performance",
                    &self.config,
                );
                AuthorityDecision {
                    action: ActionType::Suggest,
                    target_mode: ControlMode::Shared,
                    message: "Shared control recommended".to_string(),
                    explanation: render_text(&facts),
                    urgency: Urgency::Low,
                    allow_decline: true,
                    timeout_seconds: None,
                    reason: DecisionReason::SharedAssist {
                        phase: phase.to_string(),
                        risk_level: PhaseRiskLevel::Medium,
                        from: current_mode,
                    },
                }
            }
            _ => self.maintain(current_mode, phase),
        }
    }

    fn handle_low_risk_phase(
        &self,
        current_mode: ControlMode,
        rec: &ModeRecommendation,
        phase: &str,
    ) -> AuthorityDecision {
        match (current_mode, rec.recommended_mode) {
            (ControlMode::Autonomous, ControlMode::Human) => {
                let facts = compose(
                    ExplanationScenario::AutoDegradedLow,
                    phase,
                    rec,
                    "Autonomous performance decreased",
                    &self.config,
                );
                AuthorityDecision {
                    action: ActionType::Notify,
                    target_mode: current_mode,
                    message: "Autonomous performance note: available to take control"
                        .to_string(),
                    explanation: format!(
                        "{} No immediate action required during this low-risk phase.",
                        render_text(&facts)
                    ),
                    urgency: Urgency::Low,
                    allow_decline: false,
                    timeout_seconds: None,
                    reason: DecisionReason::LowRiskNotice {
                        phase: phase.to_string(),
                        autonomous_reliability: rec.autonomous_reliability,
                    },
                }
            }
            (ControlMode::Human, ControlMode::Autonomous) => {
                let facts = compose(
                    ExplanationScenario::OfferAutoRest,
                    phase,
                    rec,
                    &format!("Autopilot can handle {phase} to conserve your attention"),
                    &self.config,
                );
                AuthorityDecision {
                    action: ActionType::Suggest,
                    target_mode: ControlMode::Autonomous,
                    message: "Autopilot available. Rest and monitor?".to_string(),
                    explanation: format!(
                        "{} This allows you to conserve attention for more demanding \
                         phases ahead.",
                        render_text(&facts)
                    ),
                    urgency: Urgency::Low,
                    allow_decline: true,
                    timeout_seconds: None,
                    reason: DecisionReason::RestOpportunity {
                        phase: phase.to_string(),
                        human_reliability: rec.human_reliability,
                    },
                }
            }
            // Remaining transitions involve Shared on one side; a mild
            // suggestion toward the recommended mode is enough here.
            _ => AuthorityDecision {
                action: ActionType::Suggest,
                target_mode: rec.recommended_mode,
                message: format!("Consider {} mode?", rec.recommended_mode),
                explanation: format!(
                    "{} mode is available during low-risk {phase}.",
                    rec.recommended_mode
                ),
                urgency: Urgency::Low,
                allow_decline: true,
                timeout_seconds: None,
                reason: DecisionReason::LowRiskSuggestion {
                    phase: phase.to_string(),
                    to: rec.recommended_mode,
                },
            },
        }
    }

    fn handle_safe_phase(
        &self,
        current_mode: ControlMode,
        rec: &ModeRecommendation,
        phase: &str,
    ) -> AuthorityDecision {
        // While parked and charging, autonomy is preferred for monitoring.
        if rec.recommended_mode == ControlMode::Autonomous
            && current_mode != ControlMode::Autonomous
        {
            return AuthorityDecision {
                action: ActionType::AutoSwitch,
                target_mode: ControlMode::Autonomous,
                message: format!("Switching to autonomous mode during {phase}"),
                explanation: "Vehicle is safely docked and charging. Autonomous mode will \
                              monitor systems. You can take control at any time if needed."
                    .to_string(),
                urgency: Urgency::Low,
                allow_decline: false,
                timeout_seconds: None,
                reason: DecisionReason::SafePhaseAutonomy {
                    phase: phase.to_string(),
                },
            };
        }

        AuthorityDecision {
            action: ActionType::None,
            target_mode: current_mode,
            message: format!("System monitoring during {phase}"),
            explanation: format!("Current mode is appropriate for {phase}."),
            urgency: Urgency::Low,
            allow_decline: false,
            timeout_seconds: None,
            reason: DecisionReason::Maintain {
                phase: phase.to_string(),
            },
        }
    }

    /// Tier-5 default: no rule produced a transition.
    fn maintain(&self, current_mode: ControlMode, phase: &str) -> AuthorityDecision {
        AuthorityDecision {
            action: ActionType::None,
            target_mode: current_mode,
            message: format!("Maintaining {current_mode} mode"),
            explanation: format!("Current mode is appropriate for {phase}."),
            urgency: Urgency::Low,
            allow_decline: false,
            timeout_seconds: None,
            reason: DecisionReason::Maintain {
                phase: phase.to_string(),
            },
        }
    }
}

impl Default for AuthorityRuleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine() -> AuthorityRuleEngine {
        AuthorityRuleEngine::default()
    }

    fn rec(mode: ControlMode, human: f64, autonomous: f64) -> ModeRecommendation {
        ModeRecommendation {
            recommended_mode: mode,
            confidence: 0.75,
            human_reliability: human,
            autonomous_reliability: autonomous,
            docking_reliability: None,
        }
    }

    // ──── tier 1: operator override ────

    #[test]
    fn override_to_autonomous_blocked_in_critical_phase() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.99, 0.99);
        let d = e.evaluate(
            ControlMode::Human,
            &r,
            "Docking",
            "Routine",
            500.0,
            Some(ControlMode::Autonomous),
        );
        assert_eq!(d.action, ActionType::Block);
        assert_eq!(d.target_mode, ControlMode::Human);
        assert_eq!(d.urgency, Urgency::High);
        assert!(!d.allow_decline);
        assert!(d.explanation.contains("Shared control is available"));
        assert!(matches!(d.reason, DecisionReason::OverrideBlocked { .. }));
    }

    #[test]
    fn override_block_ignores_reliability_values() {
        // The block holds regardless of reliability values.
        let e = engine();
        for (h, a) in [(0.0, 0.0), (1.0, 1.0), (0.3, 0.95)] {
            let r = rec(ControlMode::Human, h, a);
            let d = e.evaluate(
                ControlMode::Human,
                &r,
                "Docking",
                "Routine",
                500.0,
                Some(ControlMode::Autonomous),
            );
            assert_eq!(d.action, ActionType::Block);
            assert_eq!(d.target_mode, ControlMode::Human);
        }
    }

    #[test]
    fn override_accepted_with_risk_scaled_urgency() {
        let e = engine();
        let r = rec(ControlMode::Autonomous, 0.9, 0.9);

        let d = e.evaluate(
            ControlMode::Autonomous,
            &r,
            "Transit",
            "Routine",
            500.0,
            Some(ControlMode::Human),
        );
        assert_eq!(d.action, ActionType::AutoSwitch);
        assert_eq!(d.target_mode, ControlMode::Human);
        assert_eq!(d.urgency, Urgency::Low);
        assert!(!d.allow_decline);

        let d = e.evaluate(
            ControlMode::Autonomous,
            &r,
            "Docking",
            "Routine",
            500.0,
            Some(ControlMode::Human),
        );
        assert_eq!(d.urgency, Urgency::Critical);
    }

    #[test]
    fn override_in_high_risk_phase_appends_warning() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.9);
        let d = e.evaluate(
            ControlMode::Human,
            &r,
            "Undocking",
            "Routine",
            500.0,
            Some(ControlMode::Shared),
        );
        assert_eq!(d.action, ActionType::AutoSwitch);
        assert!(d.message.contains("high-risk phase"));
        assert!(d.explanation.contains("high-risk phase"));
    }

    #[test]
    fn override_in_low_risk_phase_has_no_warning() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.9);
        let d = e.evaluate(
            ControlMode::Human,
            &r,
            "Transit",
            "Routine",
            500.0,
            Some(ControlMode::Shared),
        );
        assert!(!d.message.contains("Warning"));
    }

    #[test]
    fn override_beats_hysteresis() {
        let e = engine();
        let r = rec(ControlMode::Autonomous, 0.9, 0.9);
        let d = e.evaluate(
            ControlMode::Autonomous,
            &r,
            "Transit",
            "Routine",
            5.0,
            Some(ControlMode::Human),
        );
        assert_eq!(d.action, ActionType::AutoSwitch);
    }

    #[test]
    fn shared_override_allowed_even_in_critical_phase() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.9);
        let d = e.evaluate(
            ControlMode::Human,
            &r,
            "DockingApproach",
            "Routine",
            500.0,
            Some(ControlMode::Shared),
        );
        assert_eq!(d.action, ActionType::AutoSwitch);
        assert_eq!(d.target_mode, ControlMode::Shared);
        assert_eq!(d.urgency, Urgency::Critical);
    }

    // ──── tier 2: hard safety rules ────

    #[test]
    fn rule_a_fires_on_critical_fatigue_in_critical_phase() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.45, 0.9);
        let d = e.evaluate(ControlMode::Human, &r, "Docking", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::Notify);
        assert_eq!(d.target_mode, ControlMode::Human);
        assert_eq!(d.urgency, Urgency::Critical);
        assert!(d.explanation.contains("aborting"));
        match &d.reason {
            DecisionReason::SafetyAlert {
                human_reliability,
                threshold,
                ..
            } => {
                assert!((human_reliability - 0.45).abs() < f64::EPSILON);
                assert!((threshold - 0.5).abs() < f64::EPSILON);
            }
            other => panic!("expected SafetyAlert, got {other:?}"),
        }
    }

    #[test]
    fn rule_a_takes_priority_over_rule_b_ordering() {
        // Rule A is checked first; with current=Human rule B cannot fire, but
        // a recommendation toward Human does not suppress rule A either.
        let e = engine();
        let r = rec(ControlMode::Shared, 0.4, 0.4);
        let d = e.evaluate(ControlMode::Human, &r, "Docking", "Routine", 500.0, None);
        assert!(matches!(d.reason, DecisionReason::SafetyAlert { .. }));
    }

    #[test]
    fn rule_b_fires_inside_hysteresis_window() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.5);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Transit", "Routine", 10.0, None);
        assert_eq!(d.action, ActionType::AutoSwitch);
        assert_eq!(d.target_mode, ControlMode::Human);
        assert_eq!(d.urgency, Urgency::High);
        match &d.reason {
            DecisionReason::DegradedAutoSwitch { factors, .. } => {
                assert!(!factors.is_empty());
            }
            other => panic!("expected DegradedAutoSwitch, got {other:?}"),
        }
    }

    #[test]
    fn rule_b_explanation_names_degradation_factors() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.55);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Transit", "Routine", 200.0, None);
        assert!(d.explanation.contains("Navigation accuracy"));
    }

    #[test]
    fn rule_b_needs_all_three_conditions() {
        let e = engine();

        // Healthy autonomy: no rule B even though handoff is recommended.
        let r = rec(ControlMode::Human, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Transit", "Routine", 10.0, None);
        assert_eq!(d.action, ActionType::None);

        // Degraded autonomy but recommendation is not Human.
        let r = rec(ControlMode::Shared, 0.9, 0.5);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Transit", "Routine", 10.0, None);
        assert_eq!(d.action, ActionType::None);
    }

    // ──── tier 3: hysteresis ────

    #[test]
    fn hysteresis_holds_mode_inside_window() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Transit", "Routine", 100.0, None);
        assert_eq!(d.action, ActionType::None);
        assert_eq!(d.target_mode, ControlMode::Autonomous);
        match &d.reason {
            DecisionReason::Hysteresis {
                remaining_seconds, ..
            } => {
                assert!((remaining_seconds - 20.0).abs() < 1e-9);
            }
            other => panic!("expected Hysteresis, got {other:?}"),
        }
    }

    #[test]
    fn hysteresis_ignores_matching_recommendation() {
        let e = engine();
        let r = rec(ControlMode::Autonomous, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Transit", "Routine", 10.0, None);
        assert!(matches!(d.reason, DecisionReason::ModeStable { .. }));
    }

    #[test]
    fn window_boundary_is_inclusive_of_expiry() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.9);
        // Exactly at the window edge the hold no longer applies.
        let d = e.evaluate(ControlMode::Autonomous, &r, "Transit", "Routine", 120.0, None);
        assert!(!matches!(d.reason, DecisionReason::Hysteresis { .. }));
    }

    // ──── tier 4: phase rules ────

    #[test]
    fn stable_mode_yields_none() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Human, &r, "Inspection", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::None);
        assert!(matches!(d.reason, DecisionReason::ModeStable { .. }));
    }

    #[test]
    fn critical_auto_to_human_autoswitches() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Docking", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::AutoSwitch);
        assert_eq!(d.target_mode, ControlMode::Human);
        assert_eq!(d.urgency, Urgency::Critical);
    }

    #[test]
    fn critical_human_to_autonomous_blocked() {
        let e = engine();
        let r = rec(ControlMode::Autonomous, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Human, &r, "Docking", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::Block);
        assert_eq!(d.target_mode, ControlMode::Human);
        assert!(matches!(d.reason, DecisionReason::CriticalBlocked { .. }));
    }

    #[test]
    fn critical_shared_recommendation_asks_with_timeout() {
        let e = engine();
        let r = rec(ControlMode::Shared, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Human, &r, "Docking", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::Ask);
        assert_eq!(d.target_mode, ControlMode::Shared);
        assert!(d.allow_decline);
        assert_eq!(d.timeout_seconds, Some(30));
    }

    #[test]
    fn critical_shared_to_human_maintains() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Shared, &r, "Docking", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::None);
        assert!(matches!(d.reason, DecisionReason::Maintain { .. }));
    }

    #[test]
    fn high_auto_to_human_autoswitches() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.75);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Undocking", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::AutoSwitch);
        assert_eq!(d.urgency, Urgency::High);
        assert!(matches!(d.reason, DecisionReason::HighRiskHandoff { .. }));
    }

    #[test]
    fn high_human_to_autonomous_asks_with_fatigue_flag() {
        let e = engine();
        let r = rec(ControlMode::Autonomous, 0.5, 0.9);
        let d = e.evaluate(ControlMode::Human, &r, "Undocking", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::Ask);
        assert_eq!(d.target_mode, ControlMode::Autonomous);
        assert_eq!(d.urgency, Urgency::High);
        assert_eq!(d.timeout_seconds, Some(45));
        assert!(d.message.starts_with("Your fatigue is high."));
        match &d.reason {
            DecisionReason::AutonomyOffer { fatigue_warning, .. } => assert!(fatigue_warning),
            other => panic!("expected AutonomyOffer, got {other:?}"),
        }
    }

    #[test]
    fn high_human_to_autonomous_medium_urgency_when_rested() {
        let e = engine();
        let r = rec(ControlMode::Autonomous, 0.85, 0.9);
        let d = e.evaluate(ControlMode::Human, &r, "Undocking", "Routine", 500.0, None);
        assert_eq!(d.urgency, Urgency::Medium);
        assert!(!d.message.contains("fatigue"));
    }

    #[test]
    fn high_shared_recommendation_suggests() {
        let e = engine();
        let r = rec(ControlMode::Shared, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Undocking", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::Suggest);
        assert_eq!(d.timeout_seconds, Some(30));
    }

    #[test]
    fn medium_auto_to_human_asks_and_may_continue() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.65);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Inspection", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::Ask);
        assert_eq!(d.timeout_seconds, Some(60));
        assert!(d.explanation.contains("can continue"));
        assert!(matches!(d.reason, DecisionReason::DegradedButContinuable { .. }));
    }

    #[test]
    fn medium_human_to_autonomous_suggests_workload_relief() {
        let e = engine();
        let r = rec(ControlMode::Autonomous, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Human, &r, "Inspection", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::Suggest);
        assert_eq!(d.timeout_seconds, None);
        assert!(matches!(d.reason, DecisionReason::WorkloadRelief { .. }));
    }

    #[test]
    fn low_auto_to_human_notifies_only() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.9, 0.7);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Transit", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::Notify);
        assert_eq!(d.target_mode, ControlMode::Autonomous);
        assert_eq!(d.urgency, Urgency::Low);
    }

    #[test]
    fn low_human_to_autonomous_suggests_rest() {
        let e = engine();
        let r = rec(ControlMode::Autonomous, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Human, &r, "Transit", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::Suggest);
        assert_eq!(d.target_mode, ControlMode::Autonomous);
        assert!(matches!(d.reason, DecisionReason::RestOpportunity { .. }));
    }

    #[test]
    fn low_other_transition_suggests_recommended() {
        let e = engine();
        let r = rec(ControlMode::Shared, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Human, &r, "Transit", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::Suggest);
        assert_eq!(d.target_mode, ControlMode::Shared);
        assert!(matches!(d.reason, DecisionReason::LowRiskSuggestion { .. }));
    }

    #[test]
    fn safe_phase_prefers_autonomy() {
        let e = engine();
        let r = rec(ControlMode::Autonomous, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Human, &r, "Charging", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::AutoSwitch);
        assert_eq!(d.target_mode, ControlMode::Autonomous);
        assert_eq!(d.urgency, Urgency::Low);
    }

    #[test]
    fn safe_phase_other_transitions_maintain() {
        let e = engine();
        let r = rec(ControlMode::Shared, 0.9, 0.9);
        let d = e.evaluate(ControlMode::Autonomous, &r, "Charging", "Routine", 500.0, None);
        assert_eq!(d.action, ActionType::None);
    }

    // ──── determinism ────

    #[test]
    fn evaluation_is_idempotent() {
        let e = engine();
        let r = rec(ControlMode::Human, 0.62, 0.58);
        let a = e.evaluate(ControlMode::Autonomous, &r, "Undocking", "Important", 95.0, None);
        let b = e.evaluate(ControlMode::Autonomous, &r, "Undocking", "Important", 95.0, None);
        assert_eq!(a, b);
    }

    proptest! {
        // Every reachable branch yields a decision whose target equals the
        // current mode unless the action can transition.
        #[test]
        fn non_transition_actions_keep_current_mode(
            current in 0usize..3,
            recommended in 0usize..3,
            human in 0.0f64..=1.0,
            autonomous in 0.0f64..=1.0,
            elapsed in 0.0f64..600.0,
            phase in prop::sample::select(vec![
                "Docking", "DockingApproach", "Undocking", "Inspection",
                "Transit", "Charging", "SurveyGrid",
            ]),
            criticality in prop::sample::select(vec!["Routine", "Important", "Critical"]),
        ) {
            let modes = [ControlMode::Autonomous, ControlMode::Human, ControlMode::Shared];
            let e = engine();
            let r = ModeRecommendation {
                recommended_mode: modes[recommended],
                confidence: 0.7,
                human_reliability: human,
                autonomous_reliability: autonomous,
                docking_reliability: None,
            };
            let d = e.evaluate(modes[current], &r, phase, criticality, elapsed, None);
            if !d.action.is_transition() {
                prop_assert_eq!(d.target_mode, modes[current]);
            }
            prop_assert!(!d.message.is_empty());
        }
    }
}
