use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::MatchInfo;

/// A message as delivered by the event broker.
///
/// `data` stays untyped until the sub-type says what it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    pub sub_type: String,
    #[serde(default)]
    pub data: Value,
}

/// Decoded notification sub-type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ServerReady,
    MatchFinished,
    Unknown(String),
}

impl Notification {
    /// Accepts both the broker-prefixed form (`UNWINDIA_MATCH_SERVER_READY`)
    /// and the bare form (`SERVER_READY`).
    pub fn parse(sub_type: &str) -> Self {
        let bare = sub_type.trim();
        let bare = bare.strip_prefix("UNWINDIA_MATCH_").unwrap_or(bare);
        match bare {
            "SERVER_READY" => Notification::ServerReady,
            "FINISHED" | "MATCH_FINISHED" => Notification::MatchFinished,
            _ => Notification::Unknown(sub_type.to_string()),
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Notification::ServerReady => "server_ready",
            Notification::MatchFinished => "match_finished",
            Notification::Unknown(_) => "unknown",
        }
    }
}

impl EventEnvelope {
    pub fn new(sub_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: None,
            sub_type: sub_type.into(),
            data,
        }
    }

    pub fn notification(&self) -> Notification {
        Notification::parse(&self.sub_type)
    }

    /// Decode the payload as a `MatchInfo`.
    pub fn match_info(&self) -> Result<MatchInfo, serde_json::Error> {
        MatchInfo::deserialize(&self.data)
    }
}
