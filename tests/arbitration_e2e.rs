//! End-to-end arbitration shell tests: feed ingestion through the loop to
//! committed mode changes and audit records, driven with synthetic clocks so
//! nothing here sleeps.

use std::fs;
use std::time::{Duration, Instant};

use authority_arbiter::arbitrator::feeds::FeedUpdate;
use authority_arbiter::arbitrator::loop_main::{ArbitrationLoop, LoopCommand, UiEvent, spawn};
use authority_arbiter::core::config::Config;
use authority_arbiter::logger::audit::{AuditRecord, AuditTrail};
use authority_arbiter::logger::jsonl::JsonlConfig;
use authority_arbiter::prelude::*;

fn test_config(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.paths.audit_log = dir.path().join("audit.jsonl");
    config.paths.audit_fallback = None;
    config
}

fn test_loop(dir: &tempfile::TempDir) -> (ArbitrationLoop, crossbeam_channel::Receiver<UiEvent>, Instant) {
    let config = test_config(dir);
    let audit = AuditTrail::with_jsonl(JsonlConfig {
        path: config.paths.audit_log.clone(),
        fallback_path: None,
        ..JsonlConfig::default()
    });
    let t0 = Instant::now();
    let (looper, events) = ArbitrationLoop::new(&config, audit, t0).unwrap();
    (looper, events, t0)
}

fn read_audit(dir: &tempfile::TempDir) -> Vec<AuditRecord> {
    let contents = fs::read_to_string(dir.path().join("audit.jsonl")).unwrap_or_default();
    contents
        .lines()
        .map(|line| serde_json::from_str(line).expect("audit line must parse"))
        .collect()
}

#[test]
fn docking_mission_sequence_produces_expected_audit_trail() {
    let dir = tempfile::tempdir().unwrap();
    let (mut looper, _events, t0) = test_loop(&dir);

    // Transit leg: estimator wants autonomy, operator is fresh.
    looper.handle_command(LoopCommand::Feed(FeedUpdate::phase("Transit")), t0);
    looper.handle_command(
        LoopCommand::Feed(FeedUpdate::recommendation("autonomous").unwrap()),
        t0,
    );
    let t1 = t0 + Duration::from_secs(150);
    looper.arbitration_tick(t1);
    // Low risk: suggestion only, mode unchanged.
    assert_eq!(looper.current_mode(), ControlMode::Human);

    // Approach: phase flips to DockingApproach, estimator flips to human.
    looper.handle_command(LoopCommand::Feed(FeedUpdate::phase("DockingApproach")), t1);
    looper.handle_command(
        LoopCommand::Feed(FeedUpdate::recommendation("human").unwrap()),
        t1,
    );
    looper.arbitration_tick(t1 + Duration::from_secs(1));
    // Already in human control: stable, nothing to do.
    assert_eq!(looper.current_mode(), ControlMode::Human);

    // Operator tries to hand the docking to the autopilot: refused.
    looper.handle_command(
        LoopCommand::OperatorOverride(ControlMode::Autonomous),
        t1 + Duration::from_secs(2),
    );
    assert_eq!(looper.current_mode(), ControlMode::Human);

    drop(looper);
    let records = read_audit(&dir);
    assert!(records.iter().any(|r| matches!(
        r,
        AuditRecord::Decision(d)
            if d.disposition == Disposition::Blocked && d.phase == "DockingApproach"
    )));
}

#[test]
fn degraded_autonomy_handoff_is_committed_and_audited() {
    let dir = tempfile::tempdir().unwrap();
    let (mut looper, events, t0) = test_loop(&dir);

    // Start autonomous via override, then degrade the autonomy estimate.
    looper.handle_command(LoopCommand::Feed(FeedUpdate::phase("Transit")), t0);
    looper.handle_command(LoopCommand::OperatorOverride(ControlMode::Autonomous), t0);
    assert_eq!(looper.current_mode(), ControlMode::Autonomous);

    looper.handle_command(
        LoopCommand::Feed(FeedUpdate::recommendation("human").unwrap()),
        t0,
    );
    looper.handle_command(
        LoopCommand::Feed(FeedUpdate::autonomous_reliability(0.5).unwrap()),
        t0,
    );

    // Ten seconds after the override: still inside the dwell window, but
    // the hard safety rule cuts through it.
    looper.arbitration_tick(t0 + Duration::from_secs(10));
    assert_eq!(looper.current_mode(), ControlMode::Human);

    let events: Vec<UiEvent> = events.try_iter().collect();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, UiEvent::ModeChanged { new_mode, .. } if *new_mode == ControlMode::Human))
    );

    drop(looper);
    let records = read_audit(&dir);
    let mode_changes: Vec<_> = records
        .iter()
        .filter(|r| matches!(r, AuditRecord::ModeChange(_)))
        .collect();
    // Override commit plus the safety handoff.
    assert_eq!(mode_changes.len(), 2);
    assert!(records.iter().any(|r| matches!(
        r,
        AuditRecord::Decision(d) if matches!(d.reason, DecisionReason::DegradedAutoSwitch { .. })
    )));
}

#[test]
fn ask_timeout_maintains_mode_and_logs_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let (mut looper, _events, t0) = test_loop(&dir);

    looper.handle_command(LoopCommand::Feed(FeedUpdate::phase("Undocking")), t0);
    looper.handle_command(
        LoopCommand::Feed(FeedUpdate::recommendation("autonomous").unwrap()),
        t0,
    );
    let t1 = t0 + Duration::from_secs(200);
    looper.arbitration_tick(t1);
    assert!(looper.snapshot().pending_decision);

    // Deadline passes with no operator response.
    looper.arbitration_tick(t1 + Duration::from_secs(50));
    assert_eq!(looper.current_mode(), ControlMode::Human);

    drop(looper);
    let records = read_audit(&dir);
    assert!(records.iter().any(|r| matches!(
        r,
        AuditRecord::Decision(d) if d.disposition == Disposition::Timeout
    )));
}

#[test]
fn audit_decision_records_carry_full_context() {
    let dir = tempfile::tempdir().unwrap();
    let (mut looper, _events, t0) = test_loop(&dir);

    looper.handle_command(LoopCommand::Feed(FeedUpdate::phase("Inspection")), t0);
    looper.handle_command(LoopCommand::Feed(FeedUpdate::criticality("Important")), t0);
    looper.handle_command(
        LoopCommand::Feed(FeedUpdate::human_reliability(0.72).unwrap()),
        t0,
    );
    looper.handle_command(
        LoopCommand::Feed(FeedUpdate::confidence(0.88).unwrap()),
        t0,
    );
    looper.handle_command(
        LoopCommand::Feed(FeedUpdate::recommendation("shared").unwrap()),
        t0,
    );
    looper.arbitration_tick(t0 + Duration::from_secs(300));

    drop(looper);
    let records = read_audit(&dir);
    let decision = records
        .iter()
        .find_map(|r| match r {
            AuditRecord::Decision(d) => Some(d),
            AuditRecord::ModeChange(_) => None,
        })
        .expect("at least one decision record");

    // Inspection escalated by Important criticality lands at High risk, so a
    // shared recommendation is suggested.
    assert_eq!(decision.disposition, Disposition::Suggested);
    assert_eq!(decision.phase, "Inspection");
    assert_eq!(decision.task_criticality, "Important");
    assert!((decision.human_reliability - 0.72).abs() < f64::EPSILON);
    assert!((decision.confidence - 0.88).abs() < f64::EPSILON);
    assert_eq!(decision.current_mode, ControlMode::Human);
    assert_eq!(decision.target_mode, ControlMode::Shared);
}

#[test]
fn spawned_loop_runs_against_wall_clock() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    config.arbitration.tick_interval_ms = 5;
    config.arbitration.status_interval_ms = 20;

    let handle = spawn(&config).unwrap();
    handle
        .commands
        .send(LoopCommand::Feed(FeedUpdate::phase("Transit")))
        .unwrap();
    handle
        .commands
        .send(LoopCommand::Feed(
            FeedUpdate::recommendation("human").unwrap(),
        ))
        .unwrap();

    // Wait for at least one status snapshot to prove the loop is ticking.
    let status = handle
        .events
        .iter()
        .find(|e| matches!(e, UiEvent::Status(_)));
    assert!(status.is_some());
    assert_eq!(handle.latest_status().phase, "Transit");

    handle.shutdown().unwrap();
    assert!(dir.path().join("audit.jsonl").exists());
}
