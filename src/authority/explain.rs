//! Explanation composition: structured rationale facts plus a plain-text
//! renderer.
//!
//! The facts model is the contract: identical inputs produce an identical
//! [`ExplanationFacts`] value. Rendering is a separate step so alternate
//! presentations (operator console payloads, plain text) share one source of
//! truth and tests assert on facts instead of formatted strings.

use std::fmt;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::authority::diagnosis::diagnose_degradation;
use crate::authority::types::ModeRecommendation;
use crate::core::config::EngineConfig;

/// Boundary between `Good` and `Fair`, between `high_threshold` and
/// `low_threshold` in the label ladder.
const GOOD_THRESHOLD: f64 = 0.7;

// ──────────────────── qualitative labels ────────────────────

/// Qualitative label for a reliability score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ReliabilityLabel {
    Excellent,
    Good,
    Fair,
    Low,
    Critical,
}

impl ReliabilityLabel {
    /// Classify a score against the engine thresholds.
    #[must_use]
    pub fn classify(score: f64, config: &EngineConfig) -> Self {
        if score >= config.high_threshold {
            Self::Excellent
        } else if score >= GOOD_THRESHOLD {
            Self::Good
        } else if score >= config.low_threshold {
            Self::Fair
        } else if score >= config.critical_low_threshold {
            Self::Low
        } else {
            Self::Critical
        }
    }
}

impl fmt::Display for ReliabilityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excellent => write!(f, "Excellent"),
            Self::Good => write!(f, "Good"),
            Self::Fair => write!(f, "Fair"),
            Self::Low => write!(f, "Low"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// Estimator confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ConfidenceBand {
    VeryConfident,
    Confident,
    ModeratelyConfident,
}

impl ConfidenceBand {
    /// Classify a confidence score.
    #[must_use]
    pub fn classify(confidence: f64) -> Self {
        if confidence > 0.8 {
            Self::VeryConfident
        } else if confidence > 0.6 {
            Self::Confident
        } else {
            Self::ModeratelyConfident
        }
    }

    /// Descriptor inserted into the rendered sentence.
    #[must_use]
    pub const fn descriptor(self) -> &'static str {
        match self {
            Self::VeryConfident => "very confident",
            Self::Confident => "confident",
            Self::ModeratelyConfident => "moderately confident",
        }
    }
}

// ──────────────────── scenario ────────────────────

/// Which arbitration scenario an explanation is being composed for.
///
/// Selects the optional supporting block: autonomous-to-human transitions get
/// degradation factors, operator-initiated autonomy offers get an
/// operator-state block when reliability is low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplanationScenario {
    /// Critical phase, autonomy handing off to the operator.
    AutoToHumanCritical,
    /// High-risk phase, autonomy handing off to the operator.
    AutoToHumanHigh,
    /// Medium-risk phase, degraded autonomy that may continue.
    AutoDegradedMedium,
    /// Low-risk phase, informational degradation note.
    AutoDegradedLow,
    /// High-risk phase, autonomy offered to the operator.
    HumanToAutoHigh,
    /// Medium-risk phase, autonomy offered to reduce workload.
    OfferAutoAssist,
    /// Low-risk phase, autonomy offered as a rest opportunity.
    OfferAutoRest,
    /// Shared control suggested.
    SuggestShared,
    /// Shared control suggested during a critical phase.
    SuggestSharedCritical,
}

impl ExplanationScenario {
    /// Whether the scenario is an autonomous-to-human handoff.
    #[must_use]
    pub const fn concerns_auto_handoff(self) -> bool {
        matches!(self, Self::AutoToHumanCritical | Self::AutoToHumanHigh)
    }

    /// Whether the scenario should surface operator state when reliability
    /// is below the low threshold.
    #[must_use]
    pub const fn concerns_operator_state(self) -> bool {
        matches!(self, Self::HumanToAutoHigh)
    }
}

// ──────────────────── facts ────────────────────

/// A reliability score paired with its qualitative label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ReliabilityMetric {
    pub score: f64,
    pub label: ReliabilityLabel,
}

#[allow(missing_docs)]
impl ReliabilityMetric {
    #[must_use]
    pub fn new(score: f64, config: &EngineConfig) -> Self {
        Self {
            score,
            label: ReliabilityLabel::classify(score, config),
        }
    }
}

/// Structured rationale for one decision. Deterministic in its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationFacts {
    /// One-sentence summary of why the decision was made.
    pub summary: String,
    /// Operator reliability with label.
    pub human: ReliabilityMetric,
    /// Autonomous-system reliability with label.
    pub autonomous: ReliabilityMetric,
    /// Docking reliability, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docking: Option<f64>,
    /// Degradation factors (autonomous-to-human scenarios only).
    pub system_status: Vec<String>,
    /// Operator-state observations (low-reliability operator scenarios only).
    pub operator_state: Vec<String>,
    /// Mission phase named in the context line.
    pub phase: String,
    /// Raw estimator confidence.
    pub confidence: f64,
    /// Confidence band derived from `confidence`.
    pub confidence_band: ConfidenceBand,
}

/// Compose the structured rationale for a scenario.
#[must_use]
pub fn compose(
    scenario: ExplanationScenario,
    phase: &str,
    rec: &ModeRecommendation,
    summary: &str,
    config: &EngineConfig,
) -> ExplanationFacts {
    let system_status = if scenario.concerns_auto_handoff() {
        diagnose_degradation(rec, config)
    } else {
        Vec::new()
    };

    let operator_state = if scenario.concerns_operator_state()
        && rec.human_reliability < config.low_threshold
    {
        if rec.human_reliability < config.critical_low_threshold {
            vec![
                "Fatigue level is critically high".to_string(),
                "Attention capacity is significantly reduced".to_string(),
                "Cognitive workload may be elevated".to_string(),
            ]
        } else {
            vec![
                "Fatigue is accumulating".to_string(),
                "Consider using automation to reduce workload".to_string(),
            ]
        }
    } else {
        Vec::new()
    };

    ExplanationFacts {
        summary: summary.to_string(),
        human: ReliabilityMetric::new(rec.human_reliability, config),
        autonomous: ReliabilityMetric::new(rec.autonomous_reliability, config),
        docking: rec.docking_reliability,
        system_status,
        operator_state,
        phase: phase.to_string(),
        confidence: rec.confidence,
        confidence_band: ConfidenceBand::classify(rec.confidence),
    }
}

/// Render the facts as operator-facing plain text.
#[must_use]
pub fn render_text(facts: &ExplanationFacts) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}.", facts.summary);

    let _ = write!(out, "\n\nPerformance assessment:");
    let _ = write!(
        out,
        "\n  - Operator reliability: {:.0}% ({})",
        facts.human.score * 100.0,
        facts.human.label
    );
    let _ = write!(
        out,
        "\n  - System reliability: {:.0}% ({})",
        facts.autonomous.score * 100.0,
        facts.autonomous.label
    );
    if let Some(docking) = facts.docking {
        let _ = write!(out, "\n  - Docking reliability: {:.0}%", docking * 100.0);
    }

    if !facts.system_status.is_empty() {
        let _ = write!(out, "\n\nAutonomous system status:");
        for factor in &facts.system_status {
            let _ = write!(out, "\n  - {factor}");
        }
    }

    if !facts.operator_state.is_empty() {
        let _ = write!(out, "\n\nYour current state:");
        for item in &facts.operator_state {
            let _ = write!(out, "\n  - {item}");
        }
    }

    let _ = write!(out, "\n\nMission context: {} phase.", facts.phase);
    let _ = write!(
        out,
        "\n\nSystem is {} in this recommendation ({:.0}%).",
        facts.confidence_band.descriptor(),
        facts.confidence * 100.0
    );

    out
}

// ──────────────────── tests ────────────────────
