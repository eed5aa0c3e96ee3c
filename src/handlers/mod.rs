// src/handlers/mod.rs
pub mod historical;
pub mod status;

use actix_web::middleware::DefaultHeaders;
use actix_web::web;
use crate::protocol::client::StatusQuery;

pub fn routes<P: StatusQuery + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/status", web::get().to(status::get_status::<P>))
        .route("/historical", web::get().to(historical::get_historical::<P>));
}

/// The frontend is served from another origin.
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new().add(("Access-Control-Allow-Origin", "*"))
}
