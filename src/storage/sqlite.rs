// src/storage/sqlite.rs
use chrono::{DateTime, Duration, Utc};
use log::debug;
use parking_lot::Mutex;
#[cfg(test)]
use parking_lot::{MappedMutexGuard, MutexGuard};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use crate::models::status::StatusSample;
use super::StoreError;

/// Fixed-width UTC form, so text order in SQLite matches time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS server_status (
        timestamp TEXT NOT NULL,
        online INTEGER NOT NULL,
        players INTEGER NOT NULL,
        max_players INTEGER NOT NULL,
        ping INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_server_status_timestamp ON server_status(timestamp);
"#;

struct Inner {
    conn: Connection,
    /// Timestamp of the newest row; every append lands strictly after it.
    last_written: Option<DateTime<Utc>>,
}

impl Inner {
    fn stamp(&self, mut sample: StatusSample) -> StatusSample {
        if let Some(last) = self.last_written {
            let floor = last + Duration::microseconds(1);
            if sample.timestamp < floor {
                sample.timestamp = floor;
            }
        }
        sample
    }
}

/// Append-only store of poll samples. Clones share one connection; all
/// SQLite work happens on the blocking pool, one caller at a time.
#[derive(Clone)]
pub struct SampleStore {
    inner: Arc<Mutex<Inner>>,
}

impl SampleStore {
    /// Open or create the database file and its schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        debug!("Opened {} (journal mode {})", path.as_ref().display(), mode);
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        let last_written = conn
            .query_row("SELECT MAX(timestamp) FROM server_status", [], |row| {
                row.get::<_, Option<String>>(0)
            })?
            .and_then(|value| parse_timestamp(&value).ok());

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { conn, last_written })),
        })
    }

    /// Writes one sample and returns it as stored. The timestamp is moved
    /// forward when needed so rows are strictly increasing in write order.
    pub async fn append(&self, sample: StatusSample) -> Result<StatusSample, StoreError> {
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || -> Result<StatusSample, StoreError> {
            let mut inner = inner.lock();
            let sample = inner.stamp(sample);
            insert(&inner.conn, &sample)?;
            inner.last_written = Some(sample.timestamp);
            debug!("Stored sample at {} (online: {})", sample.timestamp, sample.online);
            Ok(sample)
        })
        .await?
    }

    /// Samples strictly newer than `threshold`, oldest first.
    pub async fn query_since(&self, threshold: DateTime<Utc>) -> Result<Vec<StatusSample>, StoreError> {
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || select_since(&inner.lock().conn, threshold)).await?
    }

    #[cfg(test)]
    pub(crate) fn conn_for_tests(&self) -> MappedMutexGuard<'_, Connection> {
        MutexGuard::map(self.inner.lock(), |inner| &mut inner.conn)
    }

    /// Writes the row exactly as given, skipping timestamp ordering.
    #[cfg(test)]
    pub(crate) fn insert_verbatim(&self, sample: &StatusSample) {
        insert(&self.conn_for_tests(), sample).unwrap();
    }
}

fn insert(conn: &Connection, sample: &StatusSample) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO server_status (timestamp, online, players, max_players, ping)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            format_timestamp(&sample.timestamp),
            sample.online,
            sample.players,
            sample.max_players,
            sample.ping
        ],
    )?;
    Ok(())
}

fn select_since(conn: &Connection, threshold: DateTime<Utc>) -> Result<Vec<StatusSample>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, online, players, max_players, ping
         FROM server_status
         WHERE timestamp > ?1
         ORDER BY timestamp ASC",
    )?;

    let rows = stmt.query_map(params![format_timestamp(&threshold)], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, bool>(1)?,
            row.get::<_, u32>(2)?,
            row.get::<_, u32>(3)?,
            row.get::<_, u32>(4)?,
        ))
    })?;

    let mut samples = Vec::new();
    for row in rows {
        let (timestamp, online, players, max_players, ping) = row?;
        samples.push(StatusSample {
            timestamp: parse_timestamp(&timestamp)?,
            online,
            players,
            max_players,
            ping,
        });
    }
    Ok(samples)
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
