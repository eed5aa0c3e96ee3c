// src/service.rs
use chrono::Utc;
use log::{debug, error};
use crate::config::Config;
use crate::models::status::{StatusResponse, StatusSample};
use crate::protocol::client::{JavaStatusClient, StatusQuery};
use crate::storage::sqlite::SampleStore;
use crate::storage::StoreError;

/// Runs poll cycles against the configured server and reads back history.
pub struct StatusService<P = JavaStatusClient> {
    client: P,
    store: SampleStore,
    host: String,
    port: u16,
}

impl<P: StatusQuery> StatusService<P> {
    pub fn new(config: &Config, client: P, store: SampleStore) -> Self {
        Self {
            client,
            store,
            host: config.server_host.clone(),
            port: config.server_port,
        }
    }

    /// One poll cycle. Always records exactly one sample; a failed write is
    /// logged and does not affect the returned response.
    pub async fn get_current_status(&self) -> StatusResponse {
        let (response, sample) = match self.client.query(&self.host, self.port).await {
            Ok(status) => {
                debug!(
                    "{}:{} online with {}/{} players, {}ms",
                    self.host, self.port, status.players, status.max_players, status.ping
                );
                let sample = StatusSample::online(&status);
                (StatusResponse::from_status(status), sample)
            }
            Err(e) => {
                error!("Error connecting to {}:{} - {}", self.host, self.port, e);
                (StatusResponse::from_error(e.to_string()), StatusSample::offline())
            }
        };

        if let Err(e) = self.store.append(sample).await {
            error!("Error saving status to database - {}", e);
        }

        response
    }

    /// Samples newer than `now - window`, oldest first.
    pub async fn get_history(&self, window: chrono::Duration) -> Result<Vec<StatusSample>, StoreError> {
        let threshold = Utc::now()
            .checked_sub_signed(window)
            .ok_or(StoreError::WindowOutOfRange(window))?;
        let samples = self.store.query_since(threshold).await?;
        debug!("Fetched {} samples since {}", samples.len(), threshold);
        Ok(samples)
    }

    #[cfg(test)]
    pub fn store(&self) -> &SampleStore {
        &self.store
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::status::ServerStatus;
    use crate::protocol::ProtocolError;
    use chrono::Duration;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers every query with a fixed outcome and counts calls.
    pub(crate) struct ScriptedServer {
        outcome: Result<ServerStatus, String>,
        pub calls: AtomicUsize,
        pub targets: Mutex<Vec<(String, u16)>>,
    }

    impl ScriptedServer {
        pub(crate) fn online(players: u32, max_players: u32, ping: u32) -> Self {
            Self::with(Ok(ServerStatus {
                players,
                max_players,
                version: "1.20.4".to_string(),
                motd: "A Minecraft Server".to_string(),
                ping,
                player_names: vec!["Steve".to_string()],
            }))
        }

        pub(crate) fn unreachable() -> Self {
            Self::with(Err("Connection refused (os error 111)".to_string()))
        }

        fn with(outcome: Result<ServerStatus, String>) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
                targets: Mutex::new(Vec::new()),
            }
        }
    }

    impl StatusQuery for ScriptedServer {
        async fn query(&self, host: &str, port: u16) -> Result<ServerStatus, ProtocolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.targets.lock().push((host.to_string(), port));
            self.outcome.clone().map_err(|cause| {
                ProtocolError::Connect(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, cause))
            })
        }
    }

    pub(crate) fn service(client: ScriptedServer) -> StatusService<ScriptedServer> {
        StatusService::new(&Config::default(), client, SampleStore::open_in_memory().unwrap())
    }

    async fn all_samples<P: StatusQuery>(service: &StatusService<P>) -> Vec<StatusSample> {
        service.get_history(Duration::days(365)).await.unwrap()
    }

    #[tokio::test]
    async fn reachable_server_returns_online_and_records_sample() {
        let service = service(ScriptedServer::online(3, 20, 42));

        let response = service.get_current_status().await;
        match response {
            StatusResponse::Online { online, players, max_players, ping, .. } => {
                assert!(online);
                assert_eq!((players, max_players, ping), (3, 20, 42));
            }
            other => panic!("expected online response, got {:?}", other),
        }

        let samples = all_samples(&service).await;
        assert_eq!(samples.len(), 1);
        assert!(samples[0].online);
        assert_eq!(
            (samples[0].players, samples[0].max_players, samples[0].ping),
            (3, 20, 42)
        );
    }

    #[tokio::test]
    async fn unreachable_server_returns_error_and_records_offline_sample() {
        let service = service(ScriptedServer::unreachable());

        match service.get_current_status().await {
            StatusResponse::Offline { online, error } => {
                assert!(!online);
                assert!(error.contains("Connection refused"), "{}", error);
            }
            other => panic!("expected offline response, got {:?}", other),
        }

        let samples = all_samples(&service).await;
        assert_eq!(samples.len(), 1);
        assert!(!samples[0].online);
        assert_eq!(
            (samples[0].players, samples[0].max_players, samples[0].ping),
            (0, 0, 0)
        );
    }

    #[tokio::test]
    async fn queries_configured_target() {
        let config = Config {
            server_host: "mc.example.org".to_string(),
            server_port: 25570,
            ..Config::default()
        };
        let service = StatusService::new(
            &config,
            ScriptedServer::online(0, 10, 5),
            SampleStore::open_in_memory().unwrap(),
        );

        service.get_current_status().await;
        assert_eq!(
            *service.client.targets.lock(),
            vec![("mc.example.org".to_string(), 25570)]
        );
    }

    #[tokio::test]
    async fn every_poll_appends_one_sample() {
        let service = service(ScriptedServer::online(1, 8, 10));
        for _ in 0..5 {
            assert!(service.get_current_status().await.is_online());
        }
        assert_eq!(service.client.calls.load(Ordering::SeqCst), 5);
        assert_eq!(all_samples(&service).await.len(), 5);
    }

    #[tokio::test]
    async fn store_failure_does_not_change_response() {
        let service = service(ScriptedServer::online(3, 20, 42));
        service.store.conn_for_tests().execute_batch("DROP TABLE server_status;").unwrap();

        assert!(service.get_current_status().await.is_online());
        assert!(service.get_history(Duration::hours(24)).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_polls_each_record_one_sample() {
        let service = Arc::new(service(ScriptedServer::online(3, 20, 42)));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.get_current_status().await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_online());
        }

        let samples = all_samples(&service).await;
        assert_eq!(samples.len(), 16);
        assert!(samples.windows(2).all(|pair| pair[0].timestamp < pair[1].timestamp));
        assert!(samples
            .iter()
            .all(|s| s.online && (s.players, s.max_players, s.ping) == (3, 20, 42)));
    }

    #[tokio::test]
    async fn oversized_window_is_an_error_not_a_panic() {
        let service = service(ScriptedServer::unreachable());
        let err = service.get_history(Duration::MAX).await.unwrap_err();
        assert!(matches!(err, StoreError::WindowOutOfRange(_)), "{}", err);
    }

    #[tokio::test]
    async fn largest_configured_window_still_reads() {
        let service = service(ScriptedServer::unreachable());
        let config = Config {
            history_window_hours: i64::MAX,
            ..Config::default()
        };
        assert!(service.get_history(config.history_window()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_window_excludes_older_samples() {
        let service = service(ScriptedServer::unreachable());
        let now = Utc::now();

        for hours_ago in [30, 25, 12, 3, 1] {
            service
                .store()
                .append(StatusSample {
                    timestamp: now - Duration::hours(hours_ago),
                    online: true,
                    players: hours_ago as u32,
                    max_players: 20,
                    ping: 10,
                })
                .await
                .unwrap();
        }

        let history = service.get_history(Duration::hours(24)).await.unwrap();
        let players: Vec<u32> = history.iter().map(|s| s.players).collect();
        assert_eq!(players, vec![12, 3, 1]);
    }

    #[tokio::test]
    async fn empty_history_is_ok() {
        let service = service(ScriptedServer::unreachable());
        assert!(service.get_history(Duration::hours(24)).await.unwrap().is_empty());
    }
}
