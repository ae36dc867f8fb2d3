//! Response bodies for the admin HTTP surface. No logic lives here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

/// 202 body for `POST /api/internal/events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAcceptedResponse {
    pub accepted: bool,
    /// Notification kind as decoded from `subType`.
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
