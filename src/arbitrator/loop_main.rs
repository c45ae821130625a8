//! Main arbitration loop: channel-fed, tick-driven, single thread of control.
//!
//! One thread owns the authoritative state; bounded crossbeam channels carry
//! validated feed updates and operator commands in, and operator-interface
//! events out. Each tick runs one full arbitration cycle and applies its
//! side effects before the next cycle can observe the state, which preserves
//! the engine's serialization requirement.
//!
//! While an operator confirmation is outstanding, ticks do not re-invoke the
//! engine: no new ask while one is pending. Overrides still cut through
//! immediately, matching the engine's tier-1 priority.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use parking_lot::RwLock;
use serde::Serialize;

use crate::arbitrator::feeds::{FeedState, FeedUpdate};
use crate::arbitrator::state::{ArbitratorState, PendingResolution, StatusSnapshot};
use crate::authority::engine::AuthorityRuleEngine;
use crate::authority::types::{
    ActionType, AuthorityDecision, ControlMode, ModeRecommendation, Urgency,
};
use crate::core::config::Config;
use crate::core::errors::{ArbError, Result};
use crate::logger::audit::{AuditTrail, Disposition};

// ──────────────────── channel capacities ────────────────────

/// Transport → loop: bounded(64). Feeds arrive at a few Hz; backpressure here
/// means the transport is far ahead of the arbitration cadence.
const COMMAND_CHANNEL_CAP: usize = 64;
/// Loop → operator interface: bounded(64). Events are dropped when the
/// consumer stalls; the audit trail, not this channel, is the system of
/// record.
const UI_CHANNEL_CAP: usize = 64;

// ──────────────────── messages ────────────────────

/// Commands accepted by the arbitration loop.
#[derive(Debug, Clone)]
pub enum LoopCommand {
    /// A validated feed update.
    Feed(FeedUpdate),
    /// Operator manual override request.
    OperatorOverride(ControlMode),
    /// Operator response to the outstanding confirmation.
    OperatorResponse(bool),
    /// Stop the loop after flushing the audit trail.
    Shutdown,
}

/// Events published to the operator interface.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    /// Confirmation request requiring a yes/no response.
    Prompt {
        current_mode: ControlMode,
        requested_mode: ControlMode,
        message: String,
        explanation: String,
        urgency: Urgency,
        allow_decline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_seconds: Option<u32>,
    },
    /// Non-binding suggestion.
    Suggestion {
        current_mode: ControlMode,
        suggested_mode: ControlMode,
        message: String,
        explanation: String,
        urgency: Urgency,
    },
    /// Informational message.
    Info { message: String, urgency: Urgency },
    /// A mode change was committed.
    ModeChanged {
        old_mode: ControlMode,
        new_mode: ControlMode,
        reason: String,
    },
    /// Periodic status snapshot.
    Status(StatusSnapshot),
}

#[allow(missing_docs)]
impl UiEvent {
    fn info(message: impl Into<String>, urgency: Urgency) -> Self {
        Self::Info {
            message: message.into(),
            urgency,
        }
    }
}

// ──────────────────── the loop ────────────────────

/// The arbitration loop: owns the engine, the state, the feeds, and the audit
/// trail.
pub struct ArbitrationLoop {
    engine: AuthorityRuleEngine,
    state: ArbitratorState,
    feeds: FeedState,
    audit: AuditTrail,
    ui_tx: Sender<UiEvent>,
    /// Latest snapshot, shared with [`LoopHandle::latest_status`] readers.
    shared_status: Arc<RwLock<StatusSnapshot>>,
    tick_interval: Duration,
    status_interval: Duration,
}

impl ArbitrationLoop {
    /// Build a loop from configuration. Returns the loop and the receiver for
    /// operator-interface events.
    pub fn new(
        config: &Config,
        audit: AuditTrail,
        now: Instant,
    ) -> Result<(Self, Receiver<UiEvent>)> {
        let initial_mode: ControlMode = config.arbitration.initial_mode.parse()?;
        let (ui_tx, ui_rx) = bounded(UI_CHANNEL_CAP);
        let state = ArbitratorState::new(initial_mode, now);
        let feeds = FeedState::new(
            &config.arbitration.initial_phase,
            &config.arbitration.initial_criticality,
        );
        let shared_status = Arc::new(RwLock::new(state.snapshot(&feeds)));
        let looper = Self {
            engine: AuthorityRuleEngine::new(config.engine.clone()),
            state,
            feeds,
            audit,
            ui_tx,
            shared_status,
            tick_interval: Duration::from_millis(config.arbitration.tick_interval_ms),
            status_interval: Duration::from_millis(config.arbitration.status_interval_ms),
        };
        Ok((looper, ui_rx))
    }

    /// Run until a `Shutdown` command arrives or the command channel closes.
    pub fn run(mut self, commands: &Receiver<LoopCommand>) -> Result<()> {
        let ticker = tick(self.tick_interval);
        let status_ticker = tick(self.status_interval);

        loop {
            select! {
                recv(commands) -> msg => match msg {
                    Ok(cmd) => {
                        if !self.handle_command(cmd, Instant::now()) {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                recv(ticker) -> _ => self.arbitration_tick(Instant::now()),
                recv(status_ticker) -> _ => self.publish_status(),
            }
        }

        self.audit.fsync();
        Ok(())
    }

    /// Current committed control mode. Exposed for shell tests.
    #[must_use]
    pub const fn current_mode(&self) -> ControlMode {
        self.state.current_mode()
    }

    /// Status snapshot. Exposed for shell tests and the status reporter.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.state.snapshot(&self.feeds)
    }

    // ──────────────────── command handling ────────────────────

    /// Apply one command. Returns `false` on shutdown.
    pub fn handle_command(&mut self, cmd: LoopCommand, now: Instant) -> bool {
        match cmd {
            LoopCommand::Feed(update) => self.feeds.apply(update),
            LoopCommand::OperatorOverride(requested) => {
                self.process_override(requested, now);
            }
            LoopCommand::OperatorResponse(accepted) => {
                self.process_response(accepted, now);
            }
            LoopCommand::Shutdown => return false,
        }
        true
    }

    /// Run one arbitration cycle: expire the overlay, then evaluate unless a
    /// confirmation is outstanding or no recommendation has arrived.
    pub fn arbitration_tick(&mut self, now: Instant) {
        if let Some(resolution) = self.state.expire_pending(now) {
            self.finish_resolution(&resolution);
        }

        if self.state.has_pending() || !self.feeds.has_recommendation() {
            return;
        }

        let Ok(recommendation) = self.feeds.recommendation() else {
            return;
        };
        let decision = self.engine.evaluate(
            self.state.current_mode(),
            &recommendation,
            self.feeds.phase(),
            self.feeds.criticality(),
            self.state.elapsed_seconds(now),
            None,
        );
        self.apply_decision(decision, now);
    }

    fn process_override(&mut self, requested: ControlMode, now: Instant) {
        // An override is evaluated immediately, pending overlay or not. The
        // recommendation context falls back to the requested mode before the
        // first feed arrives.
        let recommendation = self.feeds.recommendation().unwrap_or(ModeRecommendation {
            recommended_mode: requested,
            confidence: self.feeds.confidence(),
            human_reliability: self.feeds.human_reliability(),
            autonomous_reliability: self.feeds.autonomous_reliability(),
            docking_reliability: None,
        });
        let decision = self.engine.evaluate(
            self.state.current_mode(),
            &recommendation,
            self.feeds.phase(),
            self.feeds.criticality(),
            self.state.elapsed_seconds(now),
            Some(requested),
        );
        self.apply_decision(decision, now);
    }

    fn process_response(&mut self, accepted: bool, now: Instant) {
        if let Some(resolution) = self.state.resolve_pending(accepted, &self.feeds, now) {
            self.finish_resolution(&resolution);
        }
    }

    // ──────────────────── decision application ────────────────────

    fn apply_decision(&mut self, decision: AuthorityDecision, now: Instant) {
        let current = self.state.current_mode();
        match decision.action {
            ActionType::None => {}
            ActionType::AutoSwitch => {
                self.audit
                    .record_decision(Disposition::AutoSwitch, &decision, current, &self.feeds);
                let event = self.state.commit_mode_change(
                    decision.target_mode,
                    &decision.message,
                    &self.feeds,
                    now,
                );
                self.audit.record_mode_change(&event);
                self.publish(UiEvent::ModeChanged {
                    old_mode: event.old_mode,
                    new_mode: event.new_mode,
                    reason: event.reason.clone(),
                });
                self.publish(UiEvent::info(decision.explanation, decision.urgency));
            }
            ActionType::Ask => {
                self.audit.record_decision(
                    Disposition::AskedOperator,
                    &decision,
                    current,
                    &self.feeds,
                );
                let prompt = UiEvent::Prompt {
                    current_mode: current,
                    requested_mode: decision.target_mode,
                    message: decision.message.clone(),
                    explanation: decision.explanation.clone(),
                    urgency: decision.urgency,
                    allow_decline: decision.allow_decline,
                    timeout_seconds: decision.timeout_seconds,
                };
                if self.state.open_pending(decision, now) {
                    self.publish(prompt);
                }
            }
            ActionType::Suggest => {
                self.audit
                    .record_decision(Disposition::Suggested, &decision, current, &self.feeds);
                self.publish(UiEvent::Suggestion {
                    current_mode: current,
                    suggested_mode: decision.target_mode,
                    message: decision.message,
                    explanation: decision.explanation,
                    urgency: decision.urgency,
                });
            }
            ActionType::Notify => {
                self.audit
                    .record_decision(Disposition::Notified, &decision, current, &self.feeds);
                self.publish(UiEvent::info(decision.explanation, decision.urgency));
            }
            ActionType::Block => {
                self.audit
                    .record_decision(Disposition::Blocked, &decision, current, &self.feeds);
                self.publish(UiEvent::info(decision.explanation, Urgency::High));
            }
        }
    }

    fn finish_resolution(&mut self, resolution: &PendingResolution) {
        self.audit.record_decision(
            resolution.outcome.into(),
            &resolution.decision,
            self.state.current_mode(),
            &self.feeds,
        );
        if let Some(event) = &resolution.mode_change {
            self.audit.record_mode_change(event);
            self.publish(UiEvent::ModeChanged {
                old_mode: event.old_mode,
                new_mode: event.new_mode,
                reason: event.reason.clone(),
            });
        } else {
            let message = match resolution.outcome {
                crate::arbitrator::state::PendingOutcome::Declined => format!(
                    "Mode change declined. Maintaining {} mode.",
                    self.state.current_mode()
                ),
                _ => format!(
                    "Decision timeout. Maintaining {} mode.",
                    self.state.current_mode()
                ),
            };
            self.publish(UiEvent::info(message, Urgency::Medium));
        }
    }

    fn publish_status(&self) {
        let snapshot = self.state.snapshot(&self.feeds);
        *self.shared_status.write() = snapshot.clone();
        self.publish(UiEvent::Status(snapshot));
    }

    /// Best-effort publish: a stalled consumer drops events rather than
    /// blocking arbitration.
    fn publish(&self, event: UiEvent) {
        let _ = self.ui_tx.try_send(event);
    }
}

// ──────────────────── spawn helper ────────────────────

/// A running arbitration loop with its channel endpoints.
pub struct LoopHandle {
    /// Command sender for the transport layer and operator interface.
    pub commands: Sender<LoopCommand>,
    /// Operator-interface event stream.
    pub events: Receiver<UiEvent>,
    status: Arc<RwLock<StatusSnapshot>>,
    join: thread::JoinHandle<Result<()>>,
}

impl LoopHandle {
    /// Latest status snapshot, refreshed on the status cadence.
    #[must_use]
    pub fn latest_status(&self) -> StatusSnapshot {
        self.status.read().clone()
    }

    /// Request shutdown and wait for the loop thread to exit.
    pub fn shutdown(self) -> Result<()> {
        let _ = self.commands.send(LoopCommand::Shutdown);
        self.join.join().map_err(|_| ArbError::Runtime {
            details: "arbitration loop thread panicked".to_string(),
        })?
    }
}

/// Spawn the arbitration loop on its own thread.
pub fn spawn(config: &Config) -> Result<LoopHandle> {
    let audit = AuditTrail::open(config);
    let (looper, events) = ArbitrationLoop::new(config, audit, Instant::now())?;
    let status = Arc::clone(&looper.shared_status);
    let (cmd_tx, cmd_rx) = bounded(COMMAND_CHANNEL_CAP);
    let join = thread::Builder::new()
        .name("arb-loop".to_string())
        .spawn(move || looper.run(&cmd_rx))
        .map_err(|e| ArbError::Runtime {
            details: format!("failed to spawn arbitration loop: {e}"),
        })?;
    Ok(LoopHandle {
        commands: cmd_tx,
        events,
        status,
        join,
    })
}

/// Install SIGTERM/SIGINT handlers that send `Shutdown` to the loop.
pub fn install_shutdown_handler(commands: Sender<LoopCommand>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|e| ArbError::Runtime {
        details: format!("failed to register signal handlers: {e}"),
    })?;
    thread::Builder::new()
        .name("arb-signals".to_string())
        .spawn(move || {
            if signals.forever().next().is_some() {
                let _ = commands.send(LoopCommand::Shutdown);
            }
        })
        .map_err(|e| ArbError::Runtime {
            details: format!("failed to spawn signal thread: {e}"),
        })?;
    Ok(())
}

// ──────────────────── tests ────────────────────
