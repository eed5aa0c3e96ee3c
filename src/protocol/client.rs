// src/protocol/client.rs
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{lookup_host, TcpStream};
use crate::config::Config;
use crate::models::status::ServerStatus;
use super::packet::{self, Packet, STATUS_RESPONSE};
use super::ProtocolError;

/// Handshake protocol version sent with every status query.
pub const PROTOCOL_VERSION: i32 = 47;

/// Something that can ask a server for its live status.
pub trait StatusQuery {
    fn query(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<ServerStatus, ProtocolError>> + Send;
}

/// Server List Ping client for Java edition servers. One connection per query.
#[derive(Debug, Clone)]
pub struct JavaStatusClient {
    timeout: Duration,
}

impl JavaStatusClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.query_timeout())
    }

    async fn exchange(&self, host: &str, port: u16) -> Result<ServerStatus, ProtocolError> {
        let addrs: Vec<SocketAddr> = lookup_host((host, port))
            .await
            .map_err(|e| ProtocolError::Resolve(format!("{}: {}", host, e)))?
            .collect();
        if addrs.is_empty() {
            return Err(ProtocolError::Resolve(format!("{}: no addresses", host)));
        }

        let mut stream = TcpStream::connect(&addrs[..])
            .await
            .map_err(ProtocolError::Connect)?;
        debug!("Connected to {}:{}, sending handshake", host, port);

        stream.write_all(&packet::handshake(PROTOCOL_VERSION, host, port)).await?;
        let started = Instant::now();
        stream.write_all(&packet::status_request()).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(&mut stream);
        let mut response = Packet::read(&mut reader).await?.expect_id(STATUS_RESPONSE)?;
        let latency = started.elapsed();

        let body = response.read_string()?;
        debug!("Status response from {}:{} ({} bytes) in {:?}", host, port, body.len(), latency);
        parse_status(&body, latency)
    }
}

impl StatusQuery for JavaStatusClient {
    async fn query(&self, host: &str, port: u16) -> Result<ServerStatus, ProtocolError> {
        match tokio::time::timeout(self.timeout, self.exchange(host, port)).await {
            Ok(result) => result,
            Err(_) => Err(ProtocolError::Timeout(self.timeout)),
        }
    }
}

#[derive(Deserialize)]
struct StatusJson {
    version: VersionJson,
    players: PlayersJson,
    #[serde(default)]
    description: Value,
}

#[derive(Deserialize)]
struct VersionJson {
    name: String,
}

#[derive(Deserialize)]
struct PlayersJson {
    online: u32,
    max: u32,
    #[serde(default)]
    sample: Option<Vec<SamplePlayer>>,
}

#[derive(Deserialize)]
struct SamplePlayer {
    name: String,
}

fn parse_status(body: &str, latency: Duration) -> Result<ServerStatus, ProtocolError> {
    let status: StatusJson = serde_json::from_str(body)
        .map_err(|e| ProtocolError::Malformed(format!("invalid status JSON: {}", e)))?;

    Ok(ServerStatus {
        players: status.players.online,
        max_players: status.players.max,
        version: status.version.name,
        motd: flatten_description(&status.description),
        ping: latency_ms(latency),
        player_names: status
            .players
            .sample
            .unwrap_or_default()
            .into_iter()
            .map(|player| player.name)
            .collect(),
    })
}

/// Rounds half-up to whole milliseconds.
fn latency_ms(latency: Duration) -> u32 {
    ((latency.as_nanos() + 500_000) / 1_000_000).min(u32::MAX as u128) as u32
}

/// Reduces a chat component (or plain string) to its text.
fn flatten_description(description: &Value) -> String {
    let mut out = String::new();
    append_text(description, &mut out);
    out
}

fn append_text(component: &Value, out: &mut String) {
    match component {
        Value::String(text) => out.push_str(text),
        Value::Array(parts) => parts.iter().for_each(|part| append_text(part, out)),
        Value::Object(map) => {
            // `translate` carries a translation key; show it when there is no text
            if let Some(text) = map.get("text").or_else(|| map.get("translate")) {
                append_text(text, out);
            }
            if let Some(extra) = map.get("extra") {
                append_text(extra, out);
            }
        }
        Value::Null => {}
        other => out.push_str(&other.to_string()),
    }
}
