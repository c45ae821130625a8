//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use authority_arbiter::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, EngineConfig};
pub use crate::core::errors::{ArbError, Result};

// Authority engine
pub use crate::authority::engine::AuthorityRuleEngine;
pub use crate::authority::explain::{ExplanationFacts, render_text};
pub use crate::authority::risk::{is_autonomous_allowed, risk_level};
pub use crate::authority::types::{
    ActionType, AuthorityDecision, ControlMode, DecisionReason, ModeRecommendation,
    PhaseRiskLevel, Urgency,
};

// Arbitration shell
pub use crate::arbitrator::feeds::{FeedState, FeedUpdate};
pub use crate::arbitrator::state::{ArbitratorState, PendingOutcome, StatusSnapshot};

// Audit trail
pub use crate::logger::audit::{AuditRecord, AuditTrail, Disposition};
