//! Deterministic in-process orchestration API.
//!
//! Remote ids are handed out as `r1`, `r2`, ... in call order. Individual
//! create calls can be scripted to fail, and creates can be held open to
//! simulate a slow remote. No network I/O.

use async_trait::async_trait;
use msync_tmt2::{parse_remote_id, CreateMatchResponse, MatchOrchestrator, OrchestratorError};
use serde_json::{json, Value};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// Handle for a held-open create: `entered` fires when a create call starts
/// waiting, `release` lets one waiting call continue.
#[derive(Debug, Default)]
pub struct CreateHold {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    /// `(status, body)` answers consumed before the default 201.
    script: VecDeque<(u16, String)>,
    create_bodies: Vec<String>,
    deletes: Vec<String>,
    live: BTreeSet<String>,
    failing_deletes: usize,
}

#[derive(Debug, Default)]
pub struct ScriptedOrchestrator {
    inner: Mutex<Inner>,
    hold: Mutex<Option<Arc<CreateHold>>>,
}

impl ScriptedOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not poison the fake for the others.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer the next `n` creates with `status` and an error body.
    pub fn fail_next_creates(&self, status: u16, n: usize) {
        let mut inner = self.inner();
        for _ in 0..n {
            inner
                .script
                .push_back((status, format!(r#"{{"error":"scripted {status}"}}"#)));
        }
    }

    /// Answer the next create with exactly this status and body.
    pub fn respond_next_create(&self, status: u16, body: impl Into<String>) {
        self.inner().script.push_back((status, body.into()));
    }

    /// Make the next delete calls fail with a transport-like error.
    pub fn fail_next_deletes(&self, n: usize) {
        self.inner().failing_deletes += n;
    }

    /// Hold every create open until released through the returned handle.
    pub fn hold_creates(&self) -> Arc<CreateHold> {
        let hold = Arc::new(CreateHold::default());
        *self.hold.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&hold));
        hold
    }

    pub fn create_count(&self) -> usize {
        self.inner().create_bodies.len()
    }

    pub fn create_bodies(&self) -> Vec<String> {
        self.inner().create_bodies.clone()
    }

    /// Remote ids passed to delete, in call order (repeats included).
    pub fn deletes(&self) -> Vec<String> {
        self.inner().deletes.clone()
    }

    pub fn is_live(&self, remote_id: &str) -> bool {
        self.inner().live.contains(remote_id)
    }
}

#[async_trait]
impl MatchOrchestrator for ScriptedOrchestrator {
    async fn create_match(&self, body: &str) -> Result<CreateMatchResponse, OrchestratorError> {
        let hold = self.hold.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }

        let mut inner = self.inner();
        inner.create_bodies.push(body.to_string());
        let (status, body) = match inner.script.pop_front() {
            Some(scripted) => scripted,
            None => {
                inner.next_id += 1;
                (201, json!({ "id": format!("r{}", inner.next_id) }).to_string())
            }
        };
        let remote_id = parse_remote_id(&body);
        if (200..300).contains(&status) {
            if let Some(id) = &remote_id {
                inner.live.insert(id.clone());
            }
        }
        Ok(CreateMatchResponse {
            status,
            body,
            remote_id,
        })
    }

    async fn delete_match(&self, remote_id: &str) -> Result<(), OrchestratorError> {
        let mut inner = self.inner();
        inner.deletes.push(remote_id.to_string());
        if inner.failing_deletes > 0 {
            inner.failing_deletes -= 1;
            return Err(OrchestratorError::InvalidResponse(
                "scripted delete failure".to_string(),
            ));
        }
        inner.live.remove(remote_id);
        Ok(())
    }

    async fn get_match(&self, remote_id: &str) -> Result<Option<Value>, OrchestratorError> {
        Ok(self
            .inner()
            .live
            .contains(remote_id)
            .then(|| json!({ "id": remote_id })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_sequential_and_scripts_come_first() {
        let api = ScriptedOrchestrator::new();
        api.fail_next_creates(500, 1);

        let first = api.create_match("{}").await.unwrap();
        assert_eq!(first.status, 500);
        assert!(first.remote_id.is_none());

        let second = api.create_match("{}").await.unwrap();
        assert_eq!(second.status, 201);
        assert_eq!(second.remote_id.as_deref(), Some("r1"));
        assert!(api.is_live("r1"));

        api.delete_match("r1").await.unwrap();
        assert!(!api.is_live("r1"));
        assert_eq!(api.get_match("r1").await.unwrap(), None);
        assert_eq!(api.create_count(), 2);
    }

    #[tokio::test]
    async fn scripted_delete_failure_is_recorded() {
        let api = ScriptedOrchestrator::new();
        api.fail_next_deletes(1);
        assert!(api.delete_match("r9").await.is_err());
        assert!(api.delete_match("r9").await.is_ok());
        assert_eq!(api.deletes(), vec!["r9", "r9"]);
    }
}
