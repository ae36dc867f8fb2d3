use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::{CreateMatchResponse, MatchOrchestrator, OrchestratorError};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Connection settings for the orchestration API.
#[derive(Debug, Clone)]
pub struct Tmt2ClientOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub insecure_tls: bool,
}

impl Default for Tmt2ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(600),
            pool_max_idle_per_host: 10,
            insecure_tls: false,
        }
    }
}

/// reqwest-backed client for the TMT2 REST API.
///
/// The access token is sent verbatim as `Authorization`; do not log it.
#[derive(Clone)]
pub struct Tmt2Client {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl std::fmt::Debug for Tmt2Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tmt2Client")
            .field("base_url", &self.base_url)
            .field("access_token", &"<REDACTED>")
            .finish()
    }
}

impl Tmt2Client {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        options: Tmt2ClientOptions,
    ) -> Result<Self, OrchestratorError> {
        let http = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .pool_idle_timeout(options.pool_idle_timeout)
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .danger_accept_invalid_certs(options.insecure_tls)
            .build()
            .map_err(OrchestratorError::Transport)?;

        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn matches_url(&self, remote_id: &str) -> String {
        self.url(&format!("/api/matches/{remote_id}"))
    }

    /// Startup probe: proves the URL is reachable and the token accepted.
    pub async fn login(&self) -> Result<(), OrchestratorError> {
        let resp = self
            .http
            .post(self.url("/api/login"))
            .header(AUTHORIZATION, &self.access_token)
            .send()
            .await
            .map_err(OrchestratorError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OrchestratorError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(status = status.as_u16(), "tmt2 login ok");
        Ok(())
    }
}

/// Pull the remote id out of a create-match response body.
///
/// TMT2 answers `{"id": "...", ...}`; numeric ids are accepted too.
pub fn parse_remote_id(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    match v.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl MatchOrchestrator for Tmt2Client {
    async fn create_match(&self, body: &str) -> Result<CreateMatchResponse, OrchestratorError> {
        let resp = self
            .http
            .post(self.url("/api/matches"))
            .header(AUTHORIZATION, &self.access_token)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await
            .map_err(OrchestratorError::Transport)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(OrchestratorError::Transport)?;
        let remote_id = parse_remote_id(&body);

        Ok(CreateMatchResponse {
            status,
            body,
            remote_id,
        })
    }

    async fn delete_match(&self, remote_id: &str) -> Result<(), OrchestratorError> {
        let resp = self
            .http
            .delete(self.matches_url(remote_id))
            .header(AUTHORIZATION, &self.access_token)
            .send()
            .await
            .map_err(OrchestratorError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OrchestratorError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn get_match(&self, remote_id: &str) -> Result<Option<Value>, OrchestratorError> {
        let resp = self
            .http
            .get(self.matches_url(remote_id))
            .header(AUTHORIZATION, &self.access_token)
            .send()
            .await
            .map_err(OrchestratorError::Transport)?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OrchestratorError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let v: Value = resp
            .json()
            .await
            .map_err(|e| OrchestratorError::InvalidResponse(e.to_string()))?;
        Ok(Some(v))
    }
}
