// src/handlers/historical.rs
use actix_web::{web, HttpResponse};
use log::error;
use crate::config::Config;
use crate::models::status::ErrorBody;
use crate::protocol::client::StatusQuery;
use crate::service::StatusService;

pub async fn get_historical<P: StatusQuery + 'static>(
    service: web::Data<StatusService<P>>,
    config: web::Data<Config>,
) -> HttpResponse {
    match service.get_history(config.history_window()).await {
        Ok(samples) => HttpResponse::Ok().json(samples),
        Err(e) => {
            error!("Error fetching historical data - {}", e);
            HttpResponse::Ok().json(ErrorBody { error: e.to_string() })
        }
    }
}
