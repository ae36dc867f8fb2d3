//! msync-tmt2
//!
//! The external orchestration API seen from this service: the
//! `MatchOrchestrator` port, its reqwest implementation against TMT2, and
//! the template renderer that turns a `MatchInfo` into a create-match body.

mod client;
mod template;

pub use client::{parse_remote_id, Tmt2Client, Tmt2ClientOptions};
pub use template::{render, MatchTemplate, TemplateError};

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("orchestration api transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("orchestration api returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("orchestration api returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

/// Raw outcome of a create-match call.
///
/// Returned for every HTTP status; the caller decides that `status >= 300`
/// is a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMatchResponse {
    pub status: u16,
    pub body: String,
    /// `id` from the response body, when it parses.
    pub remote_id: Option<String>,
}

impl CreateMatchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Remote match lifecycle operations.
#[async_trait]
pub trait MatchOrchestrator: Send + Sync {
    /// POST a rendered create-match body.
    async fn create_match(&self, body: &str) -> Result<CreateMatchResponse, OrchestratorError>;

    async fn delete_match(&self, remote_id: &str) -> Result<(), OrchestratorError>;

    /// `None` when the remote side does not know the id.
    async fn get_match(&self, remote_id: &str) -> Result<Option<Value>, OrchestratorError>;
}
