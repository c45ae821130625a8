//! Caller-owned arbitration state.
//!
//! The engine is stateless; everything that evolves across cycles lives here:
//! the committed control mode, the dwell timer behind the hysteresis window,
//! the at-most-one pending operator confirmation, and the mode-change history.
//! All time arithmetic uses caller-supplied [`Instant`]s, so the state machine
//! is fully deterministic under test.
//!
//! Pending policy: no new ask while one is outstanding. The arbitration cycle
//! is suppressed while the overlay is occupied; the overlay resolves only by
//! operator response or deadline expiry, and expiry maintains the current
//! mode.

use std::time::Instant;

use serde::Serialize;

use crate::arbitrator::feeds::FeedState;
use crate::authority::types::{ActionType, AuthorityDecision, ControlMode};

// ──────────────────── events ────────────────────

/// A committed mode change, recorded for the audit trail.
///
/// Timestamping happens at the audit sink; the state layer never reads a
/// wall clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeChangeEvent {
    /// Mode before the change.
    pub old_mode: ControlMode,
    /// Mode after the change.
    pub new_mode: ControlMode,
    /// Mission phase at the time of the change.
    pub phase: String,
    /// Human-readable cause.
    pub reason: String,
    /// Human reliability at the time of the change.
    pub human_reliability: f64,
    /// Autonomous reliability at the time of the change.
    pub autonomous_reliability: f64,
}

/// How a pending decision left the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingOutcome {
    /// Operator confirmed; the target mode was committed.
    Accepted,
    /// Operator declined; current mode maintained.
    Declined,
    /// Deadline elapsed without a response; current mode maintained.
    TimedOut,
}

/// An Ask decision awaiting operator confirmation.
#[derive(Debug, Clone)]
pub struct PendingDecision {
    /// The decision awaiting confirmation.
    pub decision: AuthorityDecision,
    /// When the confirmation request was issued.
    pub requested_at: Instant,
}

/// Result of resolving or expiring a pending decision.
#[derive(Debug, Clone)]
pub struct PendingResolution {
    /// How the overlay was cleared.
    pub outcome: PendingOutcome,
    /// The decision that had been pending.
    pub decision: AuthorityDecision,
    /// Mode change committed by an acceptance, if any.
    pub mode_change: Option<ModeChangeEvent>,
}

// ──────────────────── status snapshot ────────────────────

/// Serializable snapshot for periodic status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Committed control mode.
    pub current_mode: ControlMode,
    /// Current mission phase.
    pub phase: String,
    /// Current task criticality.
    pub task_criticality: String,
    /// Latest human reliability.
    pub human_reliability: f64,
    /// Latest autonomous reliability.
    pub autonomous_reliability: f64,
    /// Latest recommended mode, if any has arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<ControlMode>,
    /// Latest estimator confidence.
    pub confidence: f64,
    /// Whether a confirmation is outstanding.
    pub pending_decision: bool,
    /// Committed mode changes so far.
    pub mode_change_count: usize,
}

// ──────────────────── arbitrator state ────────────────────

/// The evolving state one arbitration loop owns.
#[derive(Debug)]
pub struct ArbitratorState {
    current_mode: ControlMode,
    mode_entered_at: Instant,
    pending: Option<PendingDecision>,
    mode_changes: Vec<ModeChangeEvent>,
}

impl ArbitratorState {
    /// Start in `initial_mode`, with the dwell timer anchored at `now`.
    #[must_use]
    pub fn new(initial_mode: ControlMode, now: Instant) -> Self {
        Self {
            current_mode: initial_mode,
            mode_entered_at: now,
            pending: None,
            mode_changes: Vec::new(),
        }
    }

    /// Committed control mode.
    #[must_use]
    pub const fn current_mode(&self) -> ControlMode {
        self.current_mode
    }

    /// Seconds since the last committed mode change.
    #[must_use]
    pub fn elapsed_seconds(&self, now: Instant) -> f64 {
        now.duration_since(self.mode_entered_at).as_secs_f64()
    }

    /// Whether a confirmation is outstanding.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The outstanding confirmation, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<&PendingDecision> {
        self.pending.as_ref()
    }

    /// Committed mode-change history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[ModeChangeEvent] {
        &self.mode_changes
    }

    /// Commit a mode change and reset the dwell timer.
    pub fn commit_mode_change(
        &mut self,
        new_mode: ControlMode,
        reason: &str,
        feeds: &FeedState,
        now: Instant,
    ) -> ModeChangeEvent {
        let event = ModeChangeEvent {
            old_mode: self.current_mode,
            new_mode,
            phase: feeds.phase().to_string(),
            reason: reason.to_string(),
            human_reliability: feeds.human_reliability(),
            autonomous_reliability: feeds.autonomous_reliability(),
        };
        self.current_mode = new_mode;
        self.mode_entered_at = now;
        self.mode_changes.push(event.clone());
        event
    }

    /// Park an `Ask` decision in the overlay.
    ///
    /// Returns `false` without replacing anything when a confirmation is
    /// already outstanding or the decision is not an ask.
    pub fn open_pending(&mut self, decision: AuthorityDecision, now: Instant) -> bool {
        if self.pending.is_some() || decision.action != ActionType::Ask {
            return false;
        }
        self.pending = Some(PendingDecision {
            decision,
            requested_at: now,
        });
        true
    }

    /// Apply an operator response to the outstanding confirmation.
    ///
    /// Returns `None` when nothing is pending (a stale response; ignored).
    pub fn resolve_pending(
        &mut self,
        accepted: bool,
        feeds: &FeedState,
        now: Instant,
    ) -> Option<PendingResolution> {
        let pending = self.pending.take()?;
        if accepted {
            let reason = format!("Operator accepted: {}", pending.decision.message);
            let event =
                self.commit_mode_change(pending.decision.target_mode, &reason, feeds, now);
            Some(PendingResolution {
                outcome: PendingOutcome::Accepted,
                decision: pending.decision,
                mode_change: Some(event),
            })
        } else {
            Some(PendingResolution {
                outcome: PendingOutcome::Declined,
                decision: pending.decision,
                mode_change: None,
            })
        }
    }

    /// Expire the outstanding confirmation when its deadline has passed.
    ///
    /// Decisions without a timeout never expire. Expiry maintains the current
    /// mode.
    pub fn expire_pending(&mut self, now: Instant) -> Option<PendingResolution> {
        let pending = self.pending.as_ref()?;
        let timeout = pending.decision.timeout_seconds?;
        let elapsed = now.duration_since(pending.requested_at).as_secs_f64();
        if elapsed > f64::from(timeout) {
            let pending = self.pending.take()?;
            Some(PendingResolution {
                outcome: PendingOutcome::TimedOut,
                decision: pending.decision,
                mode_change: None,
            })
        } else {
            None
        }
    }

    /// Snapshot for status reporting.
    #[must_use]
    pub fn snapshot(&self, feeds: &FeedState) -> StatusSnapshot {
        StatusSnapshot {
            current_mode: self.current_mode,
            phase: feeds.phase().to_string(),
            task_criticality: feeds.criticality().to_string(),
            human_reliability: feeds.human_reliability(),
            autonomous_reliability: feeds.autonomous_reliability(),
            recommendation: feeds.latest_recommendation(),
            confidence: feeds.confidence(),
            pending_decision: self.pending.is_some(),
            mode_change_count: self.mode_changes.len(),
        }
    }
}

// ──────────────────── tests ────────────────────
