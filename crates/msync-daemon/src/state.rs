//! Shared runtime state for msync-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The state only holds
//! handles; the engine itself runs in the tasks spawned by `main.rs`.

use metrics_exporter_prometheus::PrometheusHandle;
use msync_schemas::EventEnvelope;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            service: "msync-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    /// Inbound side of the channel event source.
    pub events: mpsc::Sender<EventEnvelope>,
    /// `None` when no recorder is installed (tests); the metrics route then
    /// serves an empty body.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(events: mpsc::Sender<EventEnvelope>) -> Self {
        Self {
            build: BuildInfo::current(),
            events,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
