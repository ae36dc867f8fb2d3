//! Scenario: a sweep that starts while another is running is skipped, and
//! the gate opens again once the first one finishes.

use msync_reconcile::SweepOutcome;
use msync_schemas::MatchState;
use msync_testkit::{server_ready, Harness};
use std::sync::Arc;

#[tokio::test]
async fn overlapping_sweep_is_skipped() {
    let h = Harness::new();
    h.deliver(&server_ready("m1")).await.unwrap();
    let hold = h.api.hold_creates();

    let first = tokio::spawn({
        let reconciler = Arc::clone(&h.reconciler);
        async move { reconciler.sweep().await }
    });
    hold.entered.notified().await;
    assert!(h.reconciler.gate().is_in_flight());

    assert_eq!(h.reconciler.sweep().await, SweepOutcome::Skipped);

    hold.release.notify_one();
    match first.await.unwrap() {
        SweepOutcome::Completed(report) => assert_eq!(report.created, 1),
        other => panic!("first sweep should complete, got {other:?}"),
    }
    assert!(!h.reconciler.gate().is_in_flight());
    assert_eq!(h.api.create_count(), 1);
    assert_eq!(h.state("m1").await, MatchState::InProgress);
}

#[tokio::test]
async fn next_sweep_runs_after_the_first_finishes() {
    let h = Harness::new();
    h.deliver(&server_ready("m1")).await.unwrap();
    h.sweep().await;

    h.deliver(&server_ready("m2")).await.unwrap();
    let report = h.sweep().await;
    assert_eq!(report.listed, 2);
    assert_eq!(report.created, 1);
    assert_eq!(report.waiting, 1);
}
