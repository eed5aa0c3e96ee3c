// src/models/status.rs
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

/// Live result of one successful status query. Never persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerStatus {
    pub players: u32,
    pub max_players: u32,
    pub version: String,
    pub motd: String,
    pub ping: u32,
    pub player_names: Vec<String>,
}

/// One persisted poll outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSample {
    pub timestamp: DateTime<Utc>,
    pub online: bool,
    pub players: u32,
    pub max_players: u32,
    pub ping: u32,
}

impl StatusSample {
    pub fn online(status: &ServerStatus) -> Self {
        Self {
            timestamp: now(),
            online: true,
            players: status.players,
            max_players: status.max_players,
            ping: status.ping,
        }
    }

    pub fn offline() -> Self {
        Self {
            timestamp: now(),
            online: false,
            players: 0,
            max_players: 0,
            ping: 0,
        }
    }
}

/// Sample timestamps keep microsecond precision, matching what the store writes.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatusResponse {
    #[serde(rename_all = "camelCase")]
    Online {
        online: bool,
        players: u32,
        max_players: u32,
        version: String,
        motd: String,
        ping: u32,
        players_list: Vec<String>,
    },
    Offline {
        online: bool,
        error: String,
    },
}

impl StatusResponse {
    pub fn from_status(status: ServerStatus) -> Self {
        Self::Online {
            online: true,
            players: status.players,
            max_players: status.max_players,
            version: status.version,
            motd: status.motd,
            ping: status.ping,
            players_list: status.player_names,
        }
    }

    pub fn from_error(error: impl Into<String>) -> Self {
        Self::Offline {
            online: false,
            error: error.into(),
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online { .. })
    }
}

/// Body of `GET /historical` when the store read fails.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
