//! Reconciliation scheduler.
//!
//! Every tick spawns one sweep. A sweep first takes the single-flight gate
//! (or is dropped), lists every record and processes each one on the worker
//! pool under its match-id lock:
//!
//! | state         | action                                                        |
//! |---------------|---------------------------------------------------------------|
//! | `NEW`         | render template, create remote match, store `IN_PROGRESS` + id |
//! | `IN_PROGRESS` | store `FINISHED` once `finished_at + grace` is in the past     |
//! | `FINISHED`    | delete the remote match (best effort, repeated every sweep)    |
//!
//! Failures stay with their record: it keeps its state and the next sweep
//! tries again. No backoff, no attempt ceiling.

use chrono::Duration as ChronoDuration;
use msync_db::MatchStore;
use msync_schemas::{MatchRecord, MatchState};
use msync_tmt2::{MatchOrchestrator, MatchTemplate, OrchestratorError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{metrics, Clock, KeyedLock, ReconcileError, SingleFlight, WorkerPool};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one record in one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Created { remote_id: String },
    Promoted,
    /// `IN_PROGRESS` and not due yet.
    Waiting,
    DeleteRequested,
    /// Another worker holds the match-id lock.
    Locked,
    /// Shutdown began before the record was picked up.
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub listed: usize,
    pub created: usize,
    pub promoted: usize,
    pub waiting: usize,
    pub deleted: usize,
    pub skipped_locked: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl SweepReport {
    fn tally(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Created { .. } => self.created += 1,
            RecordOutcome::Promoted => self.promoted += 1,
            RecordOutcome::Waiting => self.waiting += 1,
            RecordOutcome::DeleteRequested => self.deleted += 1,
            RecordOutcome::Locked => self.skipped_locked += 1,
            RecordOutcome::Cancelled => self.cancelled += 1,
            RecordOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Another sweep held the gate.
    Skipped,
    /// Listing the store failed; nothing was processed.
    ListFailed,
    Completed(SweepReport),
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler {
    store: Arc<dyn MatchStore>,
    api: Arc<dyn MatchOrchestrator>,
    template: MatchTemplate,
    locks: Arc<KeyedLock>,
    gate: SingleFlight,
    pool: WorkerPool,
    clock: Arc<dyn Clock>,
    grace: ChronoDuration,
    cancel: CancellationToken,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn MatchStore>,
        api: Arc<dyn MatchOrchestrator>,
        template: MatchTemplate,
        pool: WorkerPool,
        clock: Arc<dyn Clock>,
        grace: ChronoDuration,
    ) -> Self {
        Self {
            store,
            api,
            template,
            locks: Arc::new(KeyedLock::new()),
            gate: SingleFlight::new(),
            pool,
            clock,
            grace,
            cancel: CancellationToken::new(),
        }
    }

    /// Share the match-id lock with other entry points.
    pub fn with_locks(mut self, locks: Arc<KeyedLock>) -> Self {
        self.locks = locks;
        self
    }

    /// Stop picking up records once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn locks(&self) -> &Arc<KeyedLock> {
        &self.locks
    }

    pub fn gate(&self) -> &SingleFlight {
        &self.gate
    }

    /// One full list-and-process pass.
    pub async fn sweep(self: &Arc<Self>) -> SweepOutcome {
        let Some(_permit) = self.gate.try_acquire() else {
            debug!("skip sweep, previous sweep still running");
            metrics::sweep("skipped");
            return SweepOutcome::Skipped;
        };
        debug!("sweep started");

        let records = match self.store.list_all().await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "sweep could not list match records");
                metrics::sweep("list_failed");
                return SweepOutcome::ListFailed;
            }
        };

        let mut report = SweepReport {
            listed: records.len(),
            ..Default::default()
        };

        let handles: Vec<_> = records
            .into_iter()
            .map(|record| {
                let this = Arc::clone(self);
                self.pool.submit(async move { this.process_guarded(record).await })
            })
            .collect();

        for handle in handles {
            let outcome = match handle.await {
                Ok(Some(outcome)) => outcome,
                // Pool closed during shutdown.
                Ok(None) => RecordOutcome::Cancelled,
                Err(e) => {
                    error!(error = %e, "record task panicked");
                    RecordOutcome::Failed
                }
            };
            report.tally(&outcome);
        }

        debug!(?report, "sweep finished");
        metrics::sweep("completed");
        SweepOutcome::Completed(report)
    }

    /// Lock, process, unlock. The lock is released on every path.
    pub async fn process_guarded(&self, record: MatchRecord) -> RecordOutcome {
        if self.cancel.is_cancelled() {
            return RecordOutcome::Cancelled;
        }
        let Some(_guard) = self.locks.try_guard(&record.match_id) else {
            debug!(match_id = %record.match_id, "record locked elsewhere, skipped");
            metrics::record(record.state.as_str(), "locked");
            return RecordOutcome::Locked;
        };

        let match_id = record.match_id.clone();
        let state = record.state;
        match self.process_record(record).await {
            Ok(outcome) => {
                metrics::record(state.as_str(), outcome_label(&outcome));
                outcome
            }
            Err(e) => {
                error!(match_id = %match_id, state = %state, error = %e, "error processing match");
                metrics::record(state.as_str(), "failed");
                RecordOutcome::Failed
            }
        }
    }

    async fn process_record(&self, mut record: MatchRecord) -> Result<RecordOutcome, ReconcileError> {
        match record.state {
            MatchState::New => {
                let body = self.template.render(&record.match_info)?;
                let resp = self.api.create_match(&body).await;
                metrics::remote_call("create", matches!(&resp, Ok(r) if r.is_success()));
                let resp = resp?;

                if !resp.is_success() {
                    return Err(OrchestratorError::Status {
                        status: resp.status,
                        body: resp.body,
                    }
                    .into());
                }
                let remote_id = resp
                    .remote_id
                    .ok_or_else(|| ReconcileError::MissingRemoteId(record.match_id.clone()))?;

                record.mark_in_progress(remote_id.clone(), self.clock.now())?;
                self.store.update(&record).await?;
                info!(match_id = %record.match_id, remote_id = %remote_id, "created remote match");
                Ok(RecordOutcome::Created { remote_id })
            }
            MatchState::InProgress => {
                if !record.promote_if_expired(self.clock.now(), self.grace)? {
                    return Ok(RecordOutcome::Waiting);
                }
                self.store.update(&record).await?;
                info!(match_id = %record.match_id, "match finished, grace period elapsed");
                Ok(RecordOutcome::Promoted)
            }
            MatchState::Finished => {
                let remote_id = record
                    .remote_match_id
                    .as_deref()
                    .ok_or_else(|| ReconcileError::MissingRemoteId(record.match_id.clone()))?;
                let res = self.api.delete_match(remote_id).await;
                metrics::remote_call("delete", res.is_ok());
                res?;
                debug!(match_id = %record.match_id, remote_id = %remote_id, "deleted remote match");
                Ok(RecordOutcome::DeleteRequested)
            }
        }
    }

    /// Tick every `interval` until `cancel` fires. The first tick comes one
    /// interval after start. Each tick spawns a sweep and does not wait for
    /// it; the gate keeps overlapping ticks from running a second one.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = interval.as_millis() as u64, "reconciler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("reconciler stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        this.sweep().await;
                    });
                }
            }
        }
    }
}

fn outcome_label(outcome: &RecordOutcome) -> &'static str {
    match outcome {
        RecordOutcome::Created { .. } => "created",
        RecordOutcome::Promoted => "promoted",
        RecordOutcome::Waiting => "waiting",
        RecordOutcome::DeleteRequested => "deleted",
        RecordOutcome::Locked => "locked",
        RecordOutcome::Cancelled => "cancelled",
        RecordOutcome::Failed => "failed",
    }
}
