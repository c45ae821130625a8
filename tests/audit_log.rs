//! Audit trail integration tests: record shape, append-only behavior,
//! rotation, and fallback degradation.

use std::fs;

use authority_arbiter::arbitrator::feeds::FeedState;
use authority_arbiter::arbitrator::state::ModeChangeEvent;
use authority_arbiter::authority::types::{
    ActionType, AuthorityDecision, ControlMode, DecisionReason, Urgency,
};
use authority_arbiter::logger::audit::{AuditRecord, AuditTrail, Disposition};
use authority_arbiter::logger::jsonl::JsonlConfig;

fn jsonl_config(path: std::path::PathBuf) -> JsonlConfig {
    JsonlConfig {
        path,
        fallback_path: None,
        max_size_bytes: 1024 * 1024,
        max_rotated_files: 3,
        fsync_interval_secs: 60,
    }
}

fn notify_decision() -> AuthorityDecision {
    AuthorityDecision {
        action: ActionType::Notify,
        target_mode: ControlMode::Human,
        message: "SAFETY ALERT: Critical fatigue during Docking".to_string(),
        explanation: "Your reliability is critically low".to_string(),
        urgency: Urgency::Critical,
        allow_decline: false,
        timeout_seconds: None,
        reason: DecisionReason::SafetyAlert {
            human_reliability: 0.42,
            threshold: 0.5,
            phase: "Docking".to_string(),
            recommendation: "abort_and_rest".to_string(),
        },
    }
}

#[test]
fn audit_stream_interleaves_decisions_and_mode_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let mut trail = AuditTrail::with_jsonl(jsonl_config(path.clone()));
    let feeds = FeedState::new("Docking", "Critical");

    trail.record_decision(
        Disposition::Notified,
        &notify_decision(),
        ControlMode::Human,
        &feeds,
    );
    trail.record_mode_change(&ModeChangeEvent {
        old_mode: ControlMode::Human,
        new_mode: ControlMode::Shared,
        phase: "Docking".to_string(),
        reason: "Operator accepted: Shared control recommended for Docking".to_string(),
        human_reliability: 0.42,
        autonomous_reliability: 0.88,
    });
    trail.record_decision(
        Disposition::OperatorAccepted,
        &notify_decision(),
        ControlMode::Shared,
        &feeds,
    );
    trail.flush();

    let contents = fs::read_to_string(&path).unwrap();
    let records: Vec<AuditRecord> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 3);
    assert!(matches!(records[0], AuditRecord::Decision(_)));
    assert!(matches!(records[1], AuditRecord::ModeChange(_)));
    assert!(matches!(records[2], AuditRecord::Decision(_)));
}

#[test]
fn decision_reason_survives_the_round_trip_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let mut trail = AuditTrail::with_jsonl(jsonl_config(path.clone()));
    let feeds = FeedState::new("Docking", "Critical");

    trail.record_decision(
        Disposition::Notified,
        &notify_decision(),
        ControlMode::Human,
        &feeds,
    );
    trail.flush();

    let contents = fs::read_to_string(&path).unwrap();
    let record: AuditRecord = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    match record {
        AuditRecord::Decision(d) => match d.reason {
            DecisionReason::SafetyAlert {
                human_reliability,
                threshold,
                phase,
                recommendation,
            } => {
                assert!((human_reliability - 0.42).abs() < f64::EPSILON);
                assert!((threshold - 0.5).abs() < f64::EPSILON);
                assert_eq!(phase, "Docking");
                assert_eq!(recommendation, "abort_and_rest");
            }
            other => panic!("expected SafetyAlert, got {other:?}"),
        },
        AuditRecord::ModeChange(_) => panic!("expected decision record"),
    }
}

#[test]
fn reopening_appends_rather_than_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let feeds = FeedState::new("Transit", "Routine");

    {
        let mut trail = AuditTrail::with_jsonl(jsonl_config(path.clone()));
        trail.record_decision(
            Disposition::Notified,
            &notify_decision(),
            ControlMode::Human,
            &feeds,
        );
        trail.flush();
    }
    {
        let mut trail = AuditTrail::with_jsonl(jsonl_config(path.clone()));
        trail.record_decision(
            Disposition::Notified,
            &notify_decision(),
            ControlMode::Human,
            &feeds,
        );
        trail.flush();
    }

    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);
}

#[test]
fn rotation_keeps_the_stream_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let mut config = jsonl_config(path.clone());
    config.max_size_bytes = 512;
    let mut trail = AuditTrail::with_jsonl(config);
    let feeds = FeedState::new("Transit", "Routine");

    for _ in 0..50 {
        trail.record_decision(
            Disposition::Notified,
            &notify_decision(),
            ControlMode::Human,
            &feeds,
        );
    }
    trail.flush();

    assert!(path.exists());
    let rotated = dir.path().join("audit.jsonl.1");
    assert!(rotated.exists());
    // Every surviving line still parses.
    for file in [&path, &rotated] {
        for line in fs::read_to_string(file).unwrap().lines() {
            let _: AuditRecord = serde_json::from_str(line).unwrap();
        }
    }
}

#[test]
fn unwritable_primary_falls_back_without_losing_records() {
    let dir = tempfile::tempdir().unwrap();
    let fallback = dir.path().join("fallback.jsonl");
    let mut config = jsonl_config(std::path::PathBuf::from(
        "/nonexistent_arb_audit_test/audit.jsonl",
    ));
    config.fallback_path = Some(fallback.clone());
    let mut trail = AuditTrail::with_jsonl(config);
    let feeds = FeedState::new("Transit", "Routine");

    assert_eq!(trail.state(), "fallback");
    trail.record_decision(
        Disposition::Notified,
        &notify_decision(),
        ControlMode::Human,
        &feeds,
    );
    trail.flush();

    let contents = fs::read_to_string(&fallback).unwrap();
    assert_eq!(contents.lines().count(), 1);
}
