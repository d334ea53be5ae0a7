use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use flight_core::{ActiveFlight, RestrictedZone};

use crate::controller::FlightController;

#[derive(Debug, Serialize)]
pub struct ActiveFlightsResponse {
    pub count: usize,
    pub flights: Vec<ActiveFlight>,
}

#[derive(Debug, Serialize)]
pub struct ZonesResponse {
    pub count: usize,
    pub loaded_at: Option<DateTime<Utc>>,
    pub zones: Vec<RestrictedZone>,
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn active_flights(
    State(controller): State<Arc<FlightController>>,
) -> Json<ActiveFlightsResponse> {
    let flights = controller.active_flights().await;
    Json(ActiveFlightsResponse {
        count: flights.len(),
        flights,
    })
}

pub async fn zones(State(controller): State<Arc<FlightController>>) -> Json<ZonesResponse> {
    let cache = controller.zone_cache().await;
    Json(ZonesResponse {
        count: cache.zones.len(),
        loaded_at: cache.loaded_at,
        zones: cache.zones.as_ref().clone(),
    })
}
