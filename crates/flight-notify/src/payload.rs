//! Wire payloads posted to the observer service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flight_core::{
    ActiveFlight, AlertLevel, ApplicationId, ApplicationStatus, DronePosition, FlightState,
    RestrictedZone, RoutePoint,
};

#[derive(Debug, Serialize)]
pub struct StatusUpdate<'a> {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<&'a str>,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time view of an active flight.
#[derive(Debug, Serialize)]
pub struct FlightSnapshot<'a> {
    pub application_id: ApplicationId,
    pub drone_id: i64,
    pub pilot_id: i64,
    pub route: &'a [RoutePoint],
    pub current_position: &'a DronePosition,
    pub state: FlightState,
    pub demo_mode: bool,
    pub start_time: DateTime<Utc>,
    pub estimated_end_time: DateTime<Utc>,
}

impl<'a> From<&'a ActiveFlight> for FlightSnapshot<'a> {
    fn from(flight: &'a ActiveFlight) -> Self {
        Self {
            application_id: flight.application_id,
            drone_id: flight.drone_id,
            pilot_id: flight.pilot_id,
            route: &flight.route,
            current_position: &flight.position,
            state: flight.state,
            demo_mode: flight.demo_mode,
            start_time: flight.start_time,
            estimated_end_time: flight.estimated_end_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FlightCompleted<'a> {
    pub application_id: ApplicationId,
    pub drone_id: i64,
    pub final_position: &'a DronePosition,
    pub completion_time: DateTime<Utc>,
    pub completion_status: &'a str,
}

/// Pause or resume of a flight.
#[derive(Debug, Serialize)]
pub struct FlightStateChange<'a> {
    #[serde(flatten)]
    pub flight: FlightSnapshot<'a>,
    pub reason: &'a str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ZoneProximityAlert<'a> {
    pub application_id: ApplicationId,
    pub drone_id: i64,
    pub zone_id: i64,
    pub zone_name: &'a str,
    pub zone_latitude: f64,
    pub zone_longitude: f64,
    pub zone_radius_m: f64,
    pub alert_level: AlertLevel,
    pub distance_m: f64,
    pub drone_position: &'a DronePosition,
    pub timestamp: DateTime<Utc>,
}

impl<'a> ZoneProximityAlert<'a> {
    pub fn new(
        application_id: ApplicationId,
        drone_id: i64,
        zone: &'a RestrictedZone,
        alert_level: AlertLevel,
        distance_m: f64,
        drone_position: &'a DronePosition,
    ) -> Self {
        Self {
            application_id,
            drone_id,
            zone_id: zone.id,
            zone_name: &zone.name,
            zone_latitude: zone.lat,
            zone_longitude: zone.lon,
            zone_radius_m: zone.radius_m,
            alert_level,
            distance_m,
            drone_position,
            timestamp: Utc::now(),
        }
    }
}

/// Observer acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}
