//! Scenario: one match from server-ready to remote deletion, with the
//! rendered body checked against the payload.

use chrono::Duration;
use msync_schemas::MatchState;
use msync_testkit::{match_finished, server_ready, t0, Harness};

#[tokio::test]
async fn server_ready_to_remote_delete() {
    let h = Harness::new();

    h.deliver(&server_ready("m1")).await.unwrap();
    let rec = h.record("m1").await;
    assert_eq!(rec.state, MatchState::New);
    assert_eq!(rec.created_at, t0());

    let report = h.sweep().await;
    assert_eq!(report.created, 1);
    let rec = h.record("m1").await;
    assert_eq!(rec.state, MatchState::InProgress);
    assert_eq!(rec.remote_match_id.as_deref(), Some("r1"));
    assert!(h.api.is_live("r1"));

    let body = &h.sent_bodies()[0];
    assert_eq!(body["teamA"]["name"], "Team1");
    assert_eq!(body["teamB"]["name"], "Team2");
    assert_eq!(body["gameServer"]["ip"], "10.0.0.5");
    assert_eq!(body["gameServer"]["port"], 27015);
    assert_eq!(body["gameServer"]["rconPassword"], "rcon");
    assert_eq!(body["mapPool"][0], "de_mirage");
    assert_eq!(body["externalId"], "m1");

    h.advance(Duration::minutes(30));
    h.deliver(&match_finished("m1")).await.unwrap();
    assert_eq!(h.record("m1").await.finished_at, Some(t0() + Duration::minutes(30)));

    // Still inside grace.
    assert_eq!(h.sweep().await.waiting, 1);
    assert!(h.api.deletes().is_empty());

    h.advance(Duration::minutes(10) + Duration::seconds(1));
    assert_eq!(h.sweep().await.promoted, 1);
    assert_eq!(h.state("m1").await, MatchState::Finished);

    assert_eq!(h.sweep().await.deleted, 1);
    assert_eq!(h.api.deletes(), vec!["r1".to_string()]);
    assert!(!h.api.is_live("r1"));

    // FINISHED records stay listed and are asked to be deleted again.
    assert_eq!(h.sweep().await.deleted, 1);
    assert_eq!(h.api.deletes().len(), 2);
    assert_eq!(h.api.create_count(), 1);
}

#[tokio::test]
async fn unrelated_events_leave_the_store_alone() {
    let h = Harness::new();
    let env = msync_schemas::EventEnvelope::new(
        "UNWINDIA_MATCH_CREATED",
        serde_json::json!({ "id": "m9" }),
    );
    h.deliver(&env).await.unwrap();
    assert!(h.store.is_empty());
    assert_eq!(h.sweep().await.listed, 0);
}
