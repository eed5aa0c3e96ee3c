// src/handlers/status.rs
use actix_web::{web, HttpResponse};
use log::debug;
use crate::protocol::client::StatusQuery;
use crate::service::StatusService;

/// Runs a poll cycle. Answers 200 for both outcomes; `online` tells them apart.
pub async fn get_status<P: StatusQuery + 'static>(
    service: web::Data<StatusService<P>>,
) -> HttpResponse {
    let response = service.get_current_status().await;
    debug!("Serving status (online: {})", response.is_online());
    HttpResponse::Ok().json(response)
}
