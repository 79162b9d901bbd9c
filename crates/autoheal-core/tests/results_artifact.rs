use std::fs;

use autoheal_core::results::digest_path;
use autoheal_core::{
    read_results, score, write_results, BugType, CiTimelineEntry, Failure, Fix, HealError,
    RunResult, RunStatus, RunSummary, TimelineStatus,
};
use chrono::Utc;
use tempfile::tempdir;

fn sample_result() -> RunResult {
    let now = Utc::now();
    let mut fix = Fix::applied(
        &Failure::new("app.py", 2, BugType::Syntax, "Missing colon at end of line"),
        "Added missing colon at end of line",
    );
    fix.committed = true;
    fix.pushed = true;
    RunResult {
        run_id: "run-artifact".to_string(),
        status: RunStatus::Completed,
        branch: "TEAM_A_LEAD_B_AI_Fix".to_string(),
        repo_url: "https://github.com/example/project.git".to_string(),
        team: "Team A".to_string(),
        leader: "Lead B".to_string(),
        started_at: now,
        completed_at: now,
        fixes: vec![fix],
        summary: RunSummary {
            total_fixes: 1,
            total_failures_detected: Some(1),
            tests_passed: true,
        },
        error: None,
        iterations_used: 2,
        max_retries: 5,
        ci_timeline: vec![
            CiTimelineEntry {
                iteration: 1,
                status: TimelineStatus::Failed,
                timestamp: now,
            },
            CiTimelineEntry {
                iteration: 2,
                status: TimelineStatus::Passed,
                timestamp: now,
            },
        ],
        score: score(1_000, 1),
    }
}

#[test]
fn artifact_round_trips_with_digest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("output").join("results.json");
    let result = sample_result();

    write_results(&result, &path).unwrap();

    assert!(digest_path(&path).exists());
    assert_eq!(read_results(&path).unwrap(), Some(result));
}

#[test]
fn artifact_uses_camel_case_wire_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.json");
    write_results(&sample_result(), &path).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(value["runId"], "run-artifact");
    assert_eq!(value["status"], "completed");
    assert_eq!(value["iterationsUsed"], 2);
    assert_eq!(value["ciTimeline"][1]["status"], "PASSED");
    assert_eq!(value["score"]["finalScore"], 110);
    assert_eq!(value["summary"]["totalFailuresDetected"], 1);
    assert_eq!(value["fixes"][0]["bugType"], "SYNTAX");
    assert!(value["error"].is_null());
}

#[test]
fn tampered_artifact_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.json");
    write_results(&sample_result(), &path).unwrap();

    let tampered = fs::read_to_string(&path)
        .unwrap()
        .replace("run-artifact", "run-forged");
    fs::write(&path, tampered).unwrap();

    let err = read_results(&path).unwrap_err();
    assert!(matches!(err, HealError::DigestMismatch { .. }));
}

#[test]
fn later_write_overwrites_earlier_one() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.json");
    write_results(&sample_result(), &path).unwrap();

    let mut second = sample_result();
    second.run_id = "run-second".to_string();
    second.status = RunStatus::Failed;
    second.error = Some("Max retries reached without passing".to_string());
    write_results(&second, &path).unwrap();

    let stored = read_results(&path).unwrap().unwrap();
    assert_eq!(stored.run_id, "run-second");
    assert!(!stored.passed());
}
