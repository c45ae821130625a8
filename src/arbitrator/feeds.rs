//! Validated feed ingestion.
//!
//! Every value from the transport layer passes through here before it can
//! reach the engine: reliability/confidence scalars are range-checked against
//! `[0, 1]`, mode tokens are parsed against the closed vocabulary, and
//! violations are rejected with typed errors while the previous validated
//! value is retained. The engine downstream performs no clamping; a value that
//! clears ingestion is trusted everywhere.
//!
//! Phase and criticality are open vocabularies and pass through untouched;
//! unknown values are handled as deterministic fail-safe defaults inside the
//! risk classifier, not here.

use crate::authority::types::{ControlMode, ModeRecommendation};
use crate::core::errors::{ArbError, Result};

/// One validated update from the transport layer.
///
/// Construction is the validation boundary: a `FeedUpdate` can only hold
/// values that already passed the range and vocabulary checks.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    /// Recommended control mode.
    Recommendation(ControlMode),
    /// Human operator reliability.
    HumanReliability(f64),
    /// Autonomous system reliability.
    AutonomousReliability(f64),
    /// Docking-specific reliability.
    DockingReliability(f64),
    /// Estimator confidence.
    Confidence(f64),
    /// Mission phase name (open vocabulary).
    Phase(String),
    /// Task criticality (open vocabulary).
    Criticality(String),
}

impl FeedUpdate {
    /// Parse a recommended-mode token. Unknown tokens are rejected.
    pub fn recommendation(token: &str) -> Result<Self> {
        Ok(Self::Recommendation(token.parse()?))
    }

    /// Validate a human-reliability sample.
    pub fn human_reliability(value: f64) -> Result<Self> {
        Ok(Self::HumanReliability(unit_interval(
            "human_reliability",
            value,
        )?))
    }

    /// Validate an autonomous-reliability sample.
    pub fn autonomous_reliability(value: f64) -> Result<Self> {
        Ok(Self::AutonomousReliability(unit_interval(
            "autonomous_reliability",
            value,
        )?))
    }

    /// Validate a docking-reliability sample.
    pub fn docking_reliability(value: f64) -> Result<Self> {
        Ok(Self::DockingReliability(unit_interval(
            "docking_reliability",
            value,
        )?))
    }

    /// Validate a confidence sample.
    pub fn confidence(value: f64) -> Result<Self> {
        Ok(Self::Confidence(unit_interval("confidence", value)?))
    }

    /// Accept a phase name as-is.
    #[must_use]
    pub fn phase(name: &str) -> Self {
        Self::Phase(name.to_string())
    }

    /// Accept a criticality label as-is.
    #[must_use]
    pub fn criticality(label: &str) -> Self {
        Self::Criticality(label.to_string())
    }
}

/// Parse an operator override token. Same closed vocabulary as
/// recommendations.
pub fn parse_override(token: &str) -> Result<ControlMode> {
    token.parse()
}

/// Validate an elapsed-time sample supplied by an external caller.
pub fn validate_elapsed(value: f64) -> Result<f64> {
    if value >= 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ArbError::NegativeElapsed { value })
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ArbError::OutOfRange { field, value })
    }
}

// ──────────────────── feed state ────────────────────

/// Latest validated value of every feed.
///
/// Reliability defaults match a healthy startup posture; the recommendation
/// itself has no default. Arbitration is a hard precondition on having
/// received at least one recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    recommendation: Option<ControlMode>,
    human_reliability: f64,
    autonomous_reliability: f64,
    docking_reliability: Option<f64>,
    confidence: f64,
    phase: String,
    criticality: String,
}

impl FeedState {
    /// Initial feed state with the given mission context.
    #[must_use]
    pub fn new(initial_phase: &str, initial_criticality: &str) -> Self {
        Self {
            recommendation: None,
            human_reliability: 0.85,
            autonomous_reliability: 0.80,
            docking_reliability: None,
            confidence: 0.70,
            phase: initial_phase.to_string(),
            criticality: initial_criticality.to_string(),
        }
    }

    /// Fold one validated update into the state.
    pub fn apply(&mut self, update: FeedUpdate) {
        match update {
            FeedUpdate::Recommendation(mode) => self.recommendation = Some(mode),
            FeedUpdate::HumanReliability(v) => self.human_reliability = v,
            FeedUpdate::AutonomousReliability(v) => self.autonomous_reliability = v,
            FeedUpdate::DockingReliability(v) => self.docking_reliability = Some(v),
            FeedUpdate::Confidence(v) => self.confidence = v,
            FeedUpdate::Phase(p) => self.phase = p,
            FeedUpdate::Criticality(c) => self.criticality = c,
        }
    }

    /// Whether at least one recommendation has arrived.
    #[must_use]
    pub const fn has_recommendation(&self) -> bool {
        self.recommendation.is_some()
    }

    /// Latest recommended mode, if any has arrived.
    #[must_use]
    pub const fn latest_recommendation(&self) -> Option<ControlMode> {
        self.recommendation
    }

    /// Build the per-cycle recommendation snapshot for the engine.
    pub fn recommendation(&self) -> Result<ModeRecommendation> {
        let recommended_mode = self
            .recommendation
            .ok_or(ArbError::MissingRecommendation)?;
        Ok(ModeRecommendation {
            recommended_mode,
            confidence: self.confidence,
            human_reliability: self.human_reliability,
            autonomous_reliability: self.autonomous_reliability,
            docking_reliability: self.docking_reliability,
        })
    }

    /// Current mission phase.
    #[must_use]
    pub fn phase(&self) -> &str {
        &self.phase
    }

    /// Current task criticality.
    #[must_use]
    pub fn criticality(&self) -> &str {
        &self.criticality
    }

    /// Latest human reliability.
    #[must_use]
    pub const fn human_reliability(&self) -> f64 {
        self.human_reliability
    }

    /// Latest autonomous reliability.
    #[must_use]
    pub const fn autonomous_reliability(&self) -> f64 {
        self.autonomous_reliability
    }

    /// Latest estimator confidence.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }
}

// ──────────────────── tests ────────────────────
