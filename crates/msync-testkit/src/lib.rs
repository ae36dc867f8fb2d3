//! msync-testkit
//!
//! In-process wiring of the whole engine for scenario tests: in-memory
//! store, scripted orchestration API, manual clock, dispatcher and
//! reconciler sharing them. Nothing here touches the network or a database.

mod scripted;

pub use scripted::{CreateHold, ScriptedOrchestrator};

use chrono::{DateTime, Duration, TimeZone, Utc};
use msync_db::{MatchStore, MemoryMatchStore};
use msync_reconcile::{
    DispatchOutcome, Dispatcher, IngestError, ManualClock, Reconciler, SweepOutcome, SweepReport,
    WorkerPool,
};
use msync_schemas::{EventEnvelope, MatchIdSource, MatchRecord, MatchState};
use msync_tmt2::MatchTemplate;
use serde_json::{json, Value};
use std::sync::Arc;

pub const SERVER_READY: &str = "UNWINDIA_MATCH_SERVER_READY";
pub const MATCH_FINISHED: &str = "UNWINDIA_MATCH_FINISHED";

/// Create-match body used by the harness; covers nested and derived fields.
pub const TEST_TEMPLATE: &str = r#"{
    "teamA": { "name": "{{ team1.name }}" },
    "teamB": { "name": "{{ team2.name }}" },
    "gameServer": { "ip": "{{ serverHost }}", "port": {{ serverPort }}, "rconPassword": "{{ serverPasswordMgmt }}" },
    "mapPool": ["{{ map }}"],
    "externalId": "{{ id }}"
}"#;

/// Fixed start time for the manual clock.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Server-ready envelope for `match_id` with a realistic payload.
pub fn server_ready(match_id: &str) -> EventEnvelope {
    EventEnvelope::new(
        SERVER_READY,
        json!({
            "id": match_id,
            "msId": format!("ms-{match_id}"),
            "team1": { "id": "t1", "name": "Team1", "ready": true },
            "team2": { "id": "t2", "name": "Team2", "ready": true },
            "playerAmount": 10,
            "game": "cs2",
            "map": "de_mirage",
            "serverAddress": "10.0.0.5:27015",
            "serverPasswordMgmt": "rcon",
            "ready": true
        }),
    )
}

pub fn match_finished(match_id: &str) -> EventEnvelope {
    EventEnvelope::new(MATCH_FINISHED, json!({ "id": match_id }))
}

pub struct HarnessBuilder {
    grace: Duration,
    workers: usize,
    id_source: MatchIdSource,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            grace: Duration::minutes(10),
            workers: 4,
            id_source: MatchIdSource::Native,
        }
    }
}

impl HarnessBuilder {
    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn id_source(mut self, id_source: MatchIdSource) -> Self {
        self.id_source = id_source;
        self
    }

    pub fn build(self) -> Harness {
        let store = Arc::new(MemoryMatchStore::new());
        let api = Arc::new(ScriptedOrchestrator::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let template = match MatchTemplate::parse("TMT2_MATCH", TEST_TEMPLATE) {
            Ok(t) => t,
            Err(e) => panic!("test template must parse: {e}"),
        };

        let dispatcher = Dispatcher::new(store.clone(), self.id_source, clock.clone());
        let reconciler = Reconciler::new(
            store.clone(),
            api.clone(),
            template,
            WorkerPool::new(self.workers),
            clock.clone(),
            self.grace,
        );

        Harness {
            store,
            api,
            clock,
            dispatcher,
            reconciler: Arc::new(reconciler),
        }
    }
}

/// The engine wired against in-memory collaborators.
pub struct Harness {
    pub store: Arc<MemoryMatchStore>,
    pub api: Arc<ScriptedOrchestrator>,
    pub clock: Arc<ManualClock>,
    pub dispatcher: Dispatcher,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub async fn deliver(&self, env: &EventEnvelope) -> Result<DispatchOutcome, IngestError> {
        self.dispatcher.dispatch(env).await
    }

    /// Run one sweep; panics unless it completed.
    pub async fn sweep(&self) -> SweepReport {
        match self.reconciler.sweep().await {
            SweepOutcome::Completed(report) => report,
            other => panic!("expected a completed sweep, got {other:?}"),
        }
    }

    pub async fn record(&self, match_id: &str) -> MatchRecord {
        match self.store.get_by_match_id(match_id).await {
            Ok(r) => r,
            Err(e) => panic!("record {match_id} should exist: {e}"),
        }
    }

    pub async fn state(&self, match_id: &str) -> MatchState {
        self.record(match_id).await.state
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Parsed create bodies, in call order.
    pub fn sent_bodies(&self) -> Vec<Value> {
        self.api
            .create_bodies()
            .iter()
            .filter_map(|b| serde_json::from_str(b).ok())
            .collect()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
