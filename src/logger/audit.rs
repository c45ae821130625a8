//! Audit record model and the append-only audit trail facade.
//!
//! Two record kinds share one JSONL stream: per-cycle decision records and
//! committed mode-change events. Every record is self-contained; downstream
//! analysis never needs to join lines.

use serde::{Deserialize, Serialize};

use crate::arbitrator::feeds::FeedState;
use crate::arbitrator::state::{ModeChangeEvent, PendingOutcome};
use crate::authority::types::{
    ActionType, AuthorityDecision, ControlMode, DecisionReason, Urgency,
};
use crate::core::config::Config;
use crate::logger::jsonl::{JsonlConfig, JsonlWriter, format_utc_now};

// ──────────────────── record model ────────────────────

/// What happened to a decision after the engine produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Mode change applied immediately.
    AutoSwitch,
    /// Operator confirmation requested.
    AskedOperator,
    /// Suggestion surfaced to the operator interface.
    Suggested,
    /// Informational message surfaced.
    Notified,
    /// Requested change refused.
    Blocked,
    /// Operator accepted a pending confirmation.
    OperatorAccepted,
    /// Operator declined a pending confirmation.
    OperatorDeclined,
    /// Pending confirmation expired without a response.
    Timeout,
}

impl From<PendingOutcome> for Disposition {
    fn from(outcome: PendingOutcome) -> Self {
        match outcome {
            PendingOutcome::Accepted => Self::OperatorAccepted,
            PendingOutcome::Declined => Self::OperatorDeclined,
            PendingOutcome::TimedOut => Self::Timeout,
        }
    }
}

/// One arbitration decision as it entered the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// What the caller did with the decision.
    pub disposition: Disposition,
    /// Engine action type.
    pub action: ActionType,
    /// Mode at evaluation time.
    pub current_mode: ControlMode,
    /// Mode the decision pointed at.
    pub target_mode: ControlMode,
    /// Mission phase at evaluation time.
    pub phase: String,
    /// Task criticality at evaluation time.
    pub task_criticality: String,
    /// Human reliability at evaluation time.
    pub human_reliability: f64,
    /// Autonomous reliability at evaluation time.
    pub autonomous_reliability: f64,
    /// Estimator confidence at evaluation time.
    pub confidence: f64,
    /// Decision urgency.
    pub urgency: Urgency,
    /// Typed per-rule diagnostic payload.
    pub reason: DecisionReason,
}

/// One committed mode change as it entered the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeChangeRecord {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
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

/// A single line in the audit stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditRecord {
    /// Per-cycle decision record.
    Decision(DecisionRecord),
    /// Committed mode-change event.
    ModeChange(ModeChangeRecord),
}

// ──────────────────── audit trail ────────────────────

/// Append-only audit trail over the JSONL writer.
pub struct AuditTrail {
    writer: JsonlWriter,
}

impl AuditTrail {
    /// Open the audit trail described by the configuration.
    #[must_use]
    pub fn open(config: &Config) -> Self {
        Self {
            writer: JsonlWriter::open(JsonlConfig {
                path: config.paths.audit_log.clone(),
                fallback_path: config.paths.audit_fallback.clone(),
                max_size_bytes: config.audit.max_size_bytes,
                max_rotated_files: config.audit.max_rotated_files,
                fsync_interval_secs: config.audit.fsync_interval_secs,
            }),
        }
    }

    /// Open an audit trail writing to an explicit JSONL configuration.
    #[must_use]
    pub fn with_jsonl(jsonl: JsonlConfig) -> Self {
        Self {
            writer: JsonlWriter::open(jsonl),
        }
    }

    /// Append a decision record.
    pub fn record_decision(
        &mut self,
        disposition: Disposition,
        decision: &AuthorityDecision,
        current_mode: ControlMode,
        feeds: &FeedState,
    ) {
        let record = AuditRecord::Decision(DecisionRecord {
            ts: format_utc_now(),
            disposition,
            action: decision.action,
            current_mode,
            target_mode: decision.target_mode,
            phase: feeds.phase().to_string(),
            task_criticality: feeds.criticality().to_string(),
            human_reliability: feeds.human_reliability(),
            autonomous_reliability: feeds.autonomous_reliability(),
            confidence: feeds.confidence(),
            urgency: decision.urgency,
            reason: decision.reason.clone(),
        });
        self.writer.write_entry(&record);
    }

    /// Append a committed mode-change event.
    pub fn record_mode_change(&mut self, event: &ModeChangeEvent) {
        let record = AuditRecord::ModeChange(ModeChangeRecord {
            ts: format_utc_now(),
            old_mode: event.old_mode,
            new_mode: event.new_mode,
            phase: event.phase.clone(),
            reason: event.reason.clone(),
            human_reliability: event.human_reliability,
            autonomous_reliability: event.autonomous_reliability,
        });
        self.writer.write_entry(&record);
    }

    /// Flush buffered records to the file.
    pub fn flush(&mut self) {
        self.writer.flush();
    }

    /// Force durability of everything written so far.
    pub fn fsync(&mut self) {
        self.writer.fsync();
    }

    /// Degradation state of the underlying writer.
    #[must_use]
    pub fn state(&self) -> &str {
        self.writer.state()
    }
}

// ──────────────────── tests ────────────────────
