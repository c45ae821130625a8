//! Arbitration shell around the pure engine: validated feed ingestion,
//! caller-owned state (current mode, pending-decision overlay, history), and
//! the channel-driven arbitration loop.

pub mod feeds;
#[cfg(feature = "daemon")]
pub mod loop_main;
pub mod state;
