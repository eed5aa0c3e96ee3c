use std::env;
use std::time::Duration;

/// A century of history; anything larger is treated as misconfiguration.
pub const MAX_HISTORY_WINDOW_HOURS: i64 = 24 * 365 * 100;

#[derive(Debug, Clone)]
pub struct Config {
    // Target server
    pub server_host: String,
    pub server_port: u16,
    pub query_timeout_secs: u64,

    // Persistence
    pub database_path: String,
    pub history_window_hours: i64,

    // HTTP
    pub bind_address: String,
    pub http_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 25565,
            query_timeout_secs: 3,
            database_path: "server_status.db".to_string(),
            history_window_hours: 24,
            bind_address: "0.0.0.0".to_string(),
            http_port: 3001,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_host: env::var("MINECRAFT_SERVER_HOST")
                .unwrap_or(defaults.server_host),

            server_port: env::var("MINECRAFT_SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),

            query_timeout_secs: env::var("QUERY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.query_timeout_secs),

            database_path: env::var("DATABASE_PATH")
                .unwrap_or(defaults.database_path),

            history_window_hours: parse_window_hours(env::var("HISTORY_WINDOW_HOURS").ok())
                .unwrap_or(defaults.history_window_hours),

            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or(defaults.bind_address),

            http_port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_port),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn history_window(&self) -> chrono::Duration {
        let hours = self.history_window_hours.clamp(1, MAX_HISTORY_WINDOW_HOURS);
        chrono::Duration::try_hours(hours).unwrap_or_else(|| chrono::Duration::hours(24))
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.http_port)
    }
}

fn parse_window_hours(value: Option<String>) -> Option<i64> {
    value
        .and_then(|v| v.parse().ok())
        .filter(|hours| (1..=MAX_HISTORY_WINDOW_HOURS).contains(hours))
}
