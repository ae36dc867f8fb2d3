//! Scenario: match-finished may arrive before or after the record left NEW;
//! both orders end in FINISHED once grace has elapsed.

use chrono::Duration;
use msync_schemas::MatchState;
use msync_testkit::{match_finished, server_ready, Harness};

#[tokio::test]
async fn finished_after_remote_creation() {
    let h = Harness::new();
    h.deliver(&server_ready("m1")).await.unwrap();
    h.sweep().await;
    assert_eq!(h.state("m1").await, MatchState::InProgress);

    h.deliver(&match_finished("m1")).await.unwrap();
    h.advance(Duration::minutes(11));
    h.sweep().await;
    assert_eq!(h.state("m1").await, MatchState::Finished);
}

#[tokio::test]
async fn finished_before_remote_creation() {
    let h = Harness::new();
    h.deliver(&server_ready("m1")).await.unwrap();
    h.deliver(&match_finished("m1")).await.unwrap();

    let rec = h.record("m1").await;
    assert_eq!(rec.state, MatchState::New);
    assert!(rec.finished_at.is_some());

    // Creation still happens; the stamp survives it.
    h.sweep().await;
    let rec = h.record("m1").await;
    assert_eq!(rec.state, MatchState::InProgress);
    assert!(rec.finished_at.is_some());

    h.advance(Duration::minutes(11));
    h.sweep().await;
    assert_eq!(h.state("m1").await, MatchState::Finished);
}

#[tokio::test]
async fn finished_stamp_and_sweep_interleave_without_loss() {
    let h = Harness::new();
    h.deliver(&server_ready("m1")).await.unwrap();

    // The sweep and the finished event race on the same row.
    let finished = match_finished("m1");
    let (report, outcome) = tokio::join!(h.sweep(), h.deliver(&finished));
    assert_eq!(report.created, 1);
    outcome.unwrap();

    let rec = h.record("m1").await;
    assert_eq!(rec.state, MatchState::InProgress);
    assert!(rec.finished_at.is_some(), "stamp must not be overwritten by the sweep");
    assert_eq!(rec.remote_match_id.as_deref(), Some("r1"));
}

#[tokio::test]
async fn finished_without_server_ready_is_dropped() {
    let h = Harness::new();
    assert!(h.deliver(&match_finished("ghost")).await.is_err());
    assert!(h.store.is_empty());
}
