//! Read-only status surface for operators.

mod status;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::controller::FlightController;

pub fn routes() -> Router<Arc<FlightController>> {
    Router::new()
        .route("/health", get(status::health))
        .route("/v1/flights/active", get(status::active_flights))
        .route("/v1/zones", get(status::zones))
}
