//! Value types exchanged between the arbitration engine and its callers.
//!
//! Everything here is an immutable value: constructed fresh per evaluation
//! cycle, passed by value or shared reference, never mutated in place. The
//! engine returns a fully populated [`AuthorityDecision`] on every call; no
//! branch yields a partial result.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::ArbError;

// ──────────────────── control mode ────────────────────

/// Who holds control authority over the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Autonomous controller has full authority.
    Autonomous,
    /// Human operator has full authority.
    Human,
    /// Blended authority: operator steers, controller assists.
    Shared,
}

impl ControlMode {
    /// Canonical lowercase token, matching the wire vocabulary.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Autonomous => "autonomous",
            Self::Human => "human",
            Self::Shared => "shared",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlMode {
    type Err = ArbError;

    /// Parse a wire token. Unrecognized tokens are rejected, not defaulted;
    /// the transport layer must surface the error instead of guessing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autonomous" => Ok(Self::Autonomous),
            "human" => Ok(Self::Human),
            "shared" => Ok(Self::Shared),
            _ => Err(ArbError::InvalidModeToken {
                token: s.to_string(),
            }),
        }
    }
}

// ──────────────────── risk level ────────────────────

/// Ordered risk posture derived from (phase, criticality).
///
/// Integer-valued so criticality modifiers can be added and clamped at
/// `Critical`. Never stored independently of the inputs it was derived from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum PhaseRiskLevel {
    Safe = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl PhaseRiskLevel {
    /// Numeric rank for clamped arithmetic.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Raise the level by `steps`, clamped at `Critical`. Never lowers.
    #[must_use]
    pub const fn escalate(self, steps: u8) -> Self {
        match self.rank().saturating_add(steps) {
            0 => Self::Safe,
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            _ => Self::Critical,
        }
    }
}

impl fmt::Display for PhaseRiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// ──────────────────── action type ────────────────────

/// What the caller must do with a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Apply the mode change immediately, no confirmation.
    AutoSwitch,
    /// Obtain operator confirmation before applying.
    Ask,
    /// Offer the change; operator may apply at leisure.
    Suggest,
    /// Information only, no mode change.
    Notify,
    /// Refuse a requested mode change.
    Block,
    /// Nothing to do.
    None,
}

impl ActionType {
    /// Whether this action can move the system to a different mode.
    #[must_use]
    pub const fn is_transition(self) -> bool {
        matches!(self, Self::AutoSwitch | Self::Ask | Self::Suggest)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoSwitch => write!(f, "auto_switch"),
            Self::Ask => write!(f, "ask"),
            Self::Suggest => write!(f, "suggest"),
            Self::Notify => write!(f, "notify"),
            Self::Block => write!(f, "block"),
            Self::None => write!(f, "none"),
        }
    }
}

// ──────────────────── urgency ────────────────────

/// Severity tag driving operator-interface prioritization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Fixed risk-to-urgency table used for operator overrides.
    #[must_use]
    pub const fn from_risk(risk: PhaseRiskLevel) -> Self {
        match risk {
            PhaseRiskLevel::Safe | PhaseRiskLevel::Low => Self::Low,
            PhaseRiskLevel::Medium => Self::Medium,
            PhaseRiskLevel::High => Self::High,
            PhaseRiskLevel::Critical => Self::Critical,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// ──────────────────── recommendation ────────────────────

/// Snapshot of the external reliability estimator for one evaluation cycle.
///
/// All scalars lie in `[0, 1]`; range enforcement happens at feed ingestion,
/// before a value ever reaches this type. The engine performs no clamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeRecommendation {
    /// Mode the estimator recommends.
    pub recommended_mode: ControlMode,
    /// Estimator confidence in the recommendation.
    pub confidence: f64,
    /// Current trustworthiness of human control.
    pub human_reliability: f64,
    /// Current trustworthiness of autonomous control.
    pub autonomous_reliability: f64,
    /// Docking-specific reliability, when the estimator produces one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docking_reliability: Option<f64>,
}

// ──────────────────── decision reason ────────────────────

/// Per-rule diagnostic payload attached to every decision.
///
/// One variant per rule in the priority chain, each carrying exactly the
/// fields that rule is specified to record. Serialized into the audit trail;
/// never consumed programmatically by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DecisionReason {
    /// Operator asked for a mode the phase prohibits.
    OverrideBlocked {
        phase: String,
        risk_level: PhaseRiskLevel,
        alternative: String,
    },
    /// Operator override honored.
    OverrideAccepted {
        phase: String,
        risk_level: PhaseRiskLevel,
    },
    /// Hard safety rule A: critically low human reliability in a critical phase.
    SafetyAlert {
        human_reliability: f64,
        threshold: f64,
        phase: String,
        recommendation: String,
    },
    /// Hard safety rule B: degraded autonomy handing off to the operator.
    DegradedAutoSwitch {
        autonomous_reliability: f64,
        threshold: f64,
        factors: Vec<String>,
    },
    /// Minimum-mode-duration window still open.
    Hysteresis {
        elapsed_seconds: f64,
        remaining_seconds: f64,
    },
    /// Recommendation matches the current mode.
    ModeStable { phase: String },
    /// Critical phase: autonomy hands control to the operator.
    CriticalHandoff {
        phase: String,
        autonomous_reliability: f64,
        human_reliability: f64,
    },
    /// Critical phase: autonomy request refused.
    CriticalBlocked { phase: String },
    /// Shared control offered as assistance.
    SharedAssist {
        phase: String,
        risk_level: PhaseRiskLevel,
        from: ControlMode,
    },
    /// High-risk phase: autonomy hands control to the operator.
    HighRiskHandoff {
        phase: String,
        autonomous_reliability: f64,
        human_reliability: f64,
    },
    /// High-risk phase: autonomy offered to a possibly fatigued operator.
    AutonomyOffer {
        phase: String,
        human_reliability: f64,
        autonomous_reliability: f64,
        fatigue_warning: bool,
    },
    /// Medium-risk phase: degraded autonomy, operator may decline the handoff.
    DegradedButContinuable {
        phase: String,
        autonomous_reliability: f64,
    },
    /// Medium-risk phase: autonomy offered to reduce operator workload.
    WorkloadRelief {
        phase: String,
        autonomous_reliability: f64,
    },
    /// Low-risk phase: informational note, no action required.
    LowRiskNotice {
        phase: String,
        autonomous_reliability: f64,
    },
    /// Low-risk phase: autonomy offered so the operator can rest.
    RestOpportunity {
        phase: String,
        human_reliability: f64,
    },
    /// Low-risk phase: mild suggestion toward the recommended mode.
    LowRiskSuggestion { phase: String, to: ControlMode },
    /// Safe phase: autonomy preferred while parked.
    SafePhaseAutonomy { phase: String },
    /// No rule produced a transition; current mode maintained.
    Maintain { phase: String },
}

impl DecisionReason {
    /// Stable label identifying the triggering rule in audit output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OverrideBlocked { .. } => "override_blocked",
            Self::OverrideAccepted { .. } => "override_accepted",
            Self::SafetyAlert { .. } => "safety_alert",
            Self::DegradedAutoSwitch { .. } => "degraded_auto_switch",
            Self::Hysteresis { .. } => "hysteresis",
            Self::ModeStable { .. } => "mode_stable",
            Self::CriticalHandoff { .. } => "critical_handoff",
            Self::CriticalBlocked { .. } => "critical_blocked",
            Self::SharedAssist { .. } => "shared_assist",
            Self::HighRiskHandoff { .. } => "high_risk_handoff",
            Self::AutonomyOffer { .. } => "autonomy_offer",
            Self::DegradedButContinuable { .. } => "degraded_but_continuable",
            Self::WorkloadRelief { .. } => "workload_relief",
            Self::LowRiskNotice { .. } => "low_risk_notice",
            Self::RestOpportunity { .. } => "rest_opportunity",
            Self::LowRiskSuggestion { .. } => "low_risk_suggestion",
            Self::SafePhaseAutonomy { .. } => "safe_phase_autonomy",
            Self::Maintain { .. } => "maintain",
        }
    }
}

// ──────────────────── decision ────────────────────

/// Complete output of one arbitration cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityDecision {
    /// What the caller must do.
    pub action: ActionType,
    /// Mode the action points at. Equals the current mode for
    /// `Notify`/`Block`/`None`.
    pub target_mode: ControlMode,
    /// Short operator-facing headline.
    pub message: String,
    /// Long rendered rationale. See [`crate::authority::explain`].
    pub explanation: String,
    /// Interface prioritization tag.
    pub urgency: Urgency,
    /// Whether the operator may decline this action.
    pub allow_decline: bool,
    /// Confirmation deadline in seconds, when the action expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,
    /// Typed diagnostic payload for the audit trail.
    pub reason: DecisionReason,
}

// ──────────────────── tests ────────────────────
