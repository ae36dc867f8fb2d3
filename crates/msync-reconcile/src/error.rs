use msync_db::StoreError;
use msync_schemas::TransitionError;
use msync_tmt2::{OrchestratorError, TemplateError};

/// Why an inbound event was dropped.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("event payload is not a match: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("event payload has no {0} id")]
    MissingId(&'static str),

    /// A match-finished event for a match never seen as server-ready.
    #[error("no record for match {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

impl IngestError {
    /// Short label for the dropped-events counter.
    pub fn reason(&self) -> &'static str {
        match self {
            IngestError::Decode(_) => "decode",
            IngestError::MissingId(_) => "missing_id",
            IngestError::NotFound(_) => "not_found",
            IngestError::Store(_) => "store",
        }
    }
}

/// Why one record could not be advanced during a sweep. The record is left
/// as it was and retried on the next sweep.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] OrchestratorError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("match {0} has no remote match id")]
    MissingRemoteId(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}
