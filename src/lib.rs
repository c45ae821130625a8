#![forbid(unsafe_code)]

//! Authority Arbiter (arb) — control-authority arbitration for remotely
//! operated vehicles.
//!
//! Decides, each cycle, who controls the vehicle: a human operator, the
//! autonomous controller, or a shared blend. The decision function is a
//! strict five-tier priority chain:
//! 1. **Operator override** — honored unless the phase prohibits autonomy
//! 2. **Hard safety rules** — critical fatigue alerts and degraded-autonomy
//!    handoffs, evaluated before everything below
//! 3. **Hysteresis** — a minimum dwell time suppressing mode oscillation
//! 4. **Phase-dependent rules** — risk-scaled dispatch per transition
//! 5. **Default** — maintain the current mode
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use authority_arbiter::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use authority_arbiter::authority::engine::AuthorityRuleEngine;
//! use authority_arbiter::authority::risk::risk_level;
//! ```

pub mod prelude;

pub mod arbitrator;
pub mod authority;
pub mod core;
pub mod logger;
