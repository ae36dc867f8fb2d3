use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One side of a match as reported by the match service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ready: bool,
}

/// Match snapshot published by the match service.
///
/// Captured once at ingestion time and stored verbatim; fields this service
/// does not model are kept in `extra` so templates can still reach them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub id: String,
    #[serde(default, rename = "msId", alias = "msID")]
    pub ms_id: String,
    #[serde(default)]
    pub team1: Team,
    #[serde(default)]
    pub team2: Team,
    #[serde(default)]
    pub player_amount: u32,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub map: String,
    #[serde(default)]
    pub server_address: String,
    #[serde(default)]
    pub server_password: String,
    #[serde(default)]
    pub server_password_mgmt: String,
    #[serde(default)]
    pub server_tv_address: String,
    #[serde(default)]
    pub server_tv_password: String,
    #[serde(default)]
    pub tournament_name: String,
    #[serde(default)]
    pub match_title: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which identifier of a `MatchInfo` keys the persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchIdSource {
    /// The broker's native match id (`id`).
    #[default]
    Native,
    /// The match-service id (`msId`).
    MatchService,
}

impl MatchIdSource {
    pub fn from_flag(use_match_service_id: bool) -> Self {
        if use_match_service_id {
            MatchIdSource::MatchService
        } else {
            MatchIdSource::Native
        }
    }
}

impl MatchInfo {
    /// Effective match id for the configured source.
    ///
    /// Returns `None` when the selected id is blank; such a payload cannot be
    /// keyed and must be dropped by the caller.
    pub fn resolve_id(&self, source: MatchIdSource) -> Option<&str> {
        let id = match source {
            MatchIdSource::Native => self.id.as_str(),
            MatchIdSource::MatchService => self.ms_id.as_str(),
        };
        let id = id.trim();
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    /// Split `server_address` into host and port (`"10.0.0.1:27015"`).
    ///
    /// The port is empty when the address carries none.
    pub fn server_host_port(&self) -> (&str, &str) {
        match self.server_address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => (host, port),
            _ => (self.server_address.as_str(), ""),
        }
    }
}

/// Fixed match used to exercise templates without a live event.
pub fn sample_match() -> MatchInfo {
    MatchInfo {
        id: "test".to_string(),
        ms_id: "abc123".to_string(),
        team1: Team {
            id: "def456".to_string(),
            name: "Team1".to_string(),
            ready: true,
        },
        team2: Team {
            id: "ghi789".to_string(),
            name: "Team2".to_string(),
            ready: true,
        },
        player_amount: 4,
        game: "cs2".to_string(),
        map: "de_dust2".to_string(),
        server_address: "127.0.0.1:27015".to_string(),
        server_password: "password".to_string(),
        server_password_mgmt: "rootpassword".to_string(),
        server_tv_address: String::new(),
        server_tv_password: String::new(),
        tournament_name: "nicematch".to_string(),
        match_title: "Team1 vs Team2".to_string(),
        ready: true,
        extra: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_payload_with_defaults() {
        let info: MatchInfo = serde_json::from_value(serde_json::json!({ "id": "m1" })).unwrap();
        assert_eq!(info.id, "m1");
        assert!(info.ms_id.is_empty());
        assert_eq!(info.team1, Team::default());
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = serde_json::json!({ "id": "m1", "msID": "ms-9", "bestOf": 3 });
        let info: MatchInfo = serde_json::from_value(raw).unwrap();
        assert_eq!(info.ms_id, "ms-9");
        assert_eq!(info.extra.get("bestOf"), Some(&serde_json::json!(3)));

        let back = serde_json::to_value(&info).unwrap();
        assert_eq!(back["bestOf"], 3);
        assert_eq!(back["msId"], "ms-9");
    }

    #[test]
    fn resolve_id_follows_source_and_rejects_blank() {
        let mut info = sample_match();
        assert_eq!(info.resolve_id(MatchIdSource::Native), Some("test"));
        assert_eq!(info.resolve_id(MatchIdSource::MatchService), Some("abc123"));

        info.ms_id = "  ".to_string();
        assert_eq!(info.resolve_id(MatchIdSource::MatchService), None);
    }

    #[test]
    fn server_host_port_split() {
        let mut info = sample_match();
        assert_eq!(info.server_host_port(), ("127.0.0.1", "27015"));

        info.server_address = "game.example.org".to_string();
        assert_eq!(info.server_host_port(), ("game.example.org", ""));
    }
}
