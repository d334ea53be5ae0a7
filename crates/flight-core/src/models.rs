//! Core data models for flight permission processing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ApplicationId = i64;

/// Lifecycle status of a flight application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    /// Submitted, waiting for intake
    Pending,
    /// Picked up by intake, under review
    Processing,
    /// Route validated, flight about to start
    Approved,
    /// Drone is flying
    Executing,
    /// Destination reached
    Completed,
    /// Failed validation
    Rejected,
    /// Aborted in flight (zone proximity, shutdown)
    Cancelled,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Processing => "processing",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Executing => "executing",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Completed | ApplicationStatus::Rejected | ApplicationStatus::Cancelled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `Processing -> Rejected` also covers an approval whose status write failed,
    /// and `Processing -> Pending` re-queues work interrupted by shutdown.
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Pending)
                | (Processing, Approved)
                | (Processing, Rejected)
                | (Approved, Executing)
                | (Approved, Cancelled)
                | (Executing, Completed)
                | (Executing, Cancelled)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "processing" => Ok(ApplicationStatus::Processing),
            "approved" => Ok(ApplicationStatus::Approved),
            "executing" => Ok(ApplicationStatus::Executing),
            "completed" => Ok(ApplicationStatus::Completed),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "cancelled" => Ok(ApplicationStatus::Cancelled),
            other => Err(format!("unknown application status '{}'", other)),
        }
    }
}

/// A flight permission request submitted by a pilot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightApplication {
    pub id: ApplicationId,
    /// Requested window start, as stored
    pub start_date: String,
    /// Requested window end, as stored
    pub end_date: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub pilot_id: i64,
    pub drone_id: i64,
    /// Demo flag: the flight pauses once shortly after takeoff
    #[serde(default)]
    pub tested: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl FlightApplication {
    /// Parse the requested time window.
    ///
    /// Returns a human-readable description of the problem when either bound
    /// is malformed or the window ends before it starts.
    pub fn requested_window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
        let start = parse_timestamp(&self.start_date)
            .ok_or_else(|| format!("unrecognized start date '{}'", self.start_date))?;
        let end = parse_timestamp(&self.end_date)
            .ok_or_else(|| format!("unrecognized end date '{}'", self.end_date))?;
        if end < start {
            return Err(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            ));
        }
        Ok((start, end))
    }
}

/// Parse a stored timestamp in any of the formats the intake API writes.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// One waypoint of a flight route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    /// Position in the route, 0 = takeoff
    pub point_order: i32,
    pub application_id: ApplicationId,
}

/// Circular no-fly region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictedZone {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    /// Radius in meters, never negative
    pub radius_m: f64,
}

impl RestrictedZone {
    /// Signed distance from a point to the zone border in meters.
    /// Negative when the point is inside the zone.
    pub fn distance_to_border(&self, lat: f64, lon: f64) -> f64 {
        crate::spatial::haversine_distance(lat, lon, self.lat, self.lon) - self.radius_m
    }
}

/// Simulated telemetry sample for one flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DronePosition {
    pub application_id: ApplicationId,
    pub drone_id: i64,
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    pub speed_mps: f64,
    /// Degrees clockwise from north, [0, 360)
    pub heading_deg: f64,
    pub timestamp: DateTime<Utc>,
    /// Percent of route distance covered, [0, 100]
    pub route_progress: f64,
}
