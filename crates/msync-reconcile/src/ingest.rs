//! Ingestion dispatcher.
//!
//! Applies one inbound event to the store:
//! - server-ready creates the record in NEW unless one exists
//! - match-finished stamps `finished_at` on an existing record; state is
//!   left for the sweep to advance
//! - anything else is ignored
//!
//! Never calls the orchestration API.

use msync_db::{MatchStore, StoreError};
use msync_schemas::{EventEnvelope, MatchIdSource, MatchRecord, Notification};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{metrics, Clock, IngestError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Created { match_id: String },
    /// Server-ready for a match already on record.
    Duplicate { match_id: String },
    FinishedStamped { match_id: String },
    /// Match-finished redelivered; the first stamp stands.
    AlreadyFinished { match_id: String },
    Ignored { sub_type: String },
}

pub struct Dispatcher {
    store: Arc<dyn MatchStore>,
    id_source: MatchIdSource,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn MatchStore>, id_source: MatchIdSource, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            id_source,
            clock,
        }
    }

    fn id_label(&self) -> &'static str {
        match self.id_source {
            MatchIdSource::Native => "match",
            MatchIdSource::MatchService => "match-service",
        }
    }

    pub async fn dispatch(&self, env: &EventEnvelope) -> Result<DispatchOutcome, IngestError> {
        let notification = env.notification();
        if let Notification::Unknown(sub_type) = notification {
            return Ok(DispatchOutcome::Ignored { sub_type });
        }

        let info = env.match_info().map_err(IngestError::Decode)?;
        let match_id = info
            .resolve_id(self.id_source)
            .ok_or(IngestError::MissingId(self.id_label()))?
            .to_string();

        match notification {
            Notification::ServerReady => {
                match self.store.get_by_match_id(&match_id).await {
                    Ok(_) => return Ok(DispatchOutcome::Duplicate { match_id }),
                    Err(StoreError::NotFound(_)) => {}
                    Err(e) => return Err(IngestError::Store(e)),
                }

                let record = MatchRecord::new(match_id.clone(), info, self.clock.now());
                match self.store.create(&record).await {
                    Ok(_) => Ok(DispatchOutcome::Created { match_id }),
                    // Lost a race with a concurrent delivery of the same event.
                    Err(StoreError::Duplicate(_)) => Ok(DispatchOutcome::Duplicate { match_id }),
                    Err(e) => Err(IngestError::Store(e)),
                }
            }
            Notification::MatchFinished => {
                let mut record = match self.store.get_by_match_id(&match_id).await {
                    Ok(r) => r,
                    Err(StoreError::NotFound(_)) => return Err(IngestError::NotFound(match_id)),
                    Err(e) => return Err(IngestError::Store(e)),
                };

                if !record.stamp_finished(self.clock.now()) {
                    return Ok(DispatchOutcome::AlreadyFinished { match_id });
                }
                self.store
                    .update(&record)
                    .await
                    .map_err(IngestError::Store)?;
                Ok(DispatchOutcome::FinishedStamped { match_id })
            }
            Notification::Unknown(sub_type) => Ok(DispatchOutcome::Ignored { sub_type }),
        }
    }

    /// Dispatch, then log and count the result. Errors stop here.
    pub async fn handle(&self, env: EventEnvelope) {
        metrics::event(env.notification().as_label());

        match self.dispatch(&env).await {
            Ok(DispatchOutcome::Created { match_id }) => {
                info!(match_id = %match_id, "match record created");
            }
            Ok(DispatchOutcome::Duplicate { match_id }) => {
                debug!(match_id = %match_id, "server ready for known match, ignored");
            }
            Ok(DispatchOutcome::FinishedStamped { match_id }) => {
                info!(match_id = %match_id, "match finished, awaiting grace period");
            }
            Ok(DispatchOutcome::AlreadyFinished { match_id }) => {
                debug!(match_id = %match_id, "match finished redelivered, ignored");
            }
            Ok(DispatchOutcome::Ignored { sub_type }) => {
                debug!(sub_type = %sub_type, "unhandled notification, ignored");
            }
            Err(e @ IngestError::Store(_)) => {
                metrics::event_dropped(e.reason());
                error!(sub_type = %env.sub_type, error = %e, "event dropped");
            }
            Err(e) => {
                metrics::event_dropped(e.reason());
                warn!(sub_type = %env.sub_type, error = %e, "event dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use chrono::{TimeZone, Utc};
    use msync_db::MemoryMatchStore;
    use msync_schemas::MatchState;
    use serde_json::json;

    fn setup(source: MatchIdSource) -> (Dispatcher, Arc<MemoryMatchStore>) {
        let store = Arc::new(MemoryMatchStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0).unwrap(),
        ));
        (Dispatcher::new(store.clone(), source, clock), store)
    }

    fn ready(data: serde_json::Value) -> EventEnvelope {
        EventEnvelope::new("UNWINDIA_MATCH_SERVER_READY", data)
    }

    fn finished(data: serde_json::Value) -> EventEnvelope {
        EventEnvelope::new("UNWINDIA_MATCH_FINISHED", data)
    }

    #[tokio::test]
    async fn server_ready_twice_creates_one_record() {
        let (d, store) = setup(MatchIdSource::Native);
        let env = ready(json!({ "id": "m1", "map": "de_nuke" }));

        assert_eq!(
            d.dispatch(&env).await.unwrap(),
            DispatchOutcome::Created { match_id: "m1".into() }
        );
        assert_eq!(
            d.dispatch(&env).await.unwrap(),
            DispatchOutcome::Duplicate { match_id: "m1".into() }
        );
        assert_eq!(store.len(), 1);

        let rec = store.get_by_match_id("m1").await.unwrap();
        assert_eq!(rec.state, MatchState::New);
        assert_eq!(rec.match_info.map, "de_nuke");
        assert!(rec.finished_at.is_none());
    }

    #[tokio::test]
    async fn match_service_id_keys_the_record() {
        let (d, store) = setup(MatchIdSource::MatchService);
        d.dispatch(&ready(json!({ "id": "native", "msId": "ms-7" })))
            .await
            .unwrap();
        assert!(store.get_by_match_id("ms-7").await.is_ok());
        assert!(store.get_by_match_id("native").await.is_err());

        let err = d.dispatch(&ready(json!({ "id": "native" }))).await.unwrap_err();
        assert!(matches!(err, IngestError::MissingId(_)), "{err}");
    }

    #[tokio::test]
    async fn finished_stamps_without_changing_state() {
        let (d, store) = setup(MatchIdSource::Native);
        d.dispatch(&ready(json!({ "id": "m1" }))).await.unwrap();

        assert_eq!(
            d.dispatch(&finished(json!({ "id": "m1" }))).await.unwrap(),
            DispatchOutcome::FinishedStamped { match_id: "m1".into() }
        );
        let rec = store.get_by_match_id("m1").await.unwrap();
        assert_eq!(rec.state, MatchState::New);
        assert_eq!(
            rec.finished_at,
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0).unwrap())
        );

        assert_eq!(
            d.dispatch(&finished(json!({ "id": "m1" }))).await.unwrap(),
            DispatchOutcome::AlreadyFinished { match_id: "m1".into() }
        );
    }

    #[tokio::test]
    async fn finished_for_unknown_match_is_not_synthesized() {
        let (d, store) = setup(MatchIdSource::Native);
        let err = d
            .dispatch(&finished(json!({ "id": "ghost" })))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotFound(ref id) if id == "ghost"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn undecodable_payload_is_dropped() {
        let (d, store) = setup(MatchIdSource::Native);
        let err = d.dispatch(&ready(json!(["not", "a", "match"]))).await.unwrap_err();
        assert_eq!(err.reason(), "decode");
        // handle() swallows it.
        d.handle(ready(json!(42))).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unknown_sub_type_is_ignored_before_decoding() {
        let (d, store) = setup(MatchIdSource::Native);
        let out = d
            .dispatch(&EventEnvelope::new("UNWINDIA_MATCH_CREATED", json!("garbage")))
            .await
            .unwrap();
        assert_eq!(
            out,
            DispatchOutcome::Ignored { sub_type: "UNWINDIA_MATCH_CREATED".into() }
        );
        assert!(store.is_empty());
    }
}
