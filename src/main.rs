// src/main.rs
mod config;
mod handlers;
mod models;
mod protocol;
mod service;
mod storage;

use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{error, info};
use crate::config::Config;
use crate::protocol::client::JavaStatusClient;
use crate::service::StatusService;
use crate::storage::sqlite::SampleStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("debug"));

    dotenv::dotenv().ok();

    // Read once; nothing below looks at the environment again.
    let config = Config::from_env();

    let store = match SampleStore::open(&config.database_path) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open database {}: {}", config.database_path, e);
            return Err(
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to open database: {}", e)
                )
            );
        }
    };
    info!("Storing samples in {}", config.database_path);

    let client = JavaStatusClient::from_config(&config);
    let service = web::Data::new(StatusService::new(&config, client, store));
    let bind = config.bind();

    info!(
        "Polling {}:{} (timeout {}s), history window {}h",
        config.server_host,
        config.server_port,
        config.query_timeout_secs,
        config.history_window_hours
    );
    let config = web::Data::new(config);

    info!("Starting server on {}", bind);
    HttpServer::new(move || {
        App::new()
            .wrap(handlers::cors_headers())
            .app_data(service.clone())
            .app_data(config.clone())
            .configure(handlers::routes::<JavaStatusClient>)
    })
        .bind(&bind)?
        .run().await
}
