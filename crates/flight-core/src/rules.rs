//! Safety rules and thresholds for flight processing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::RoutePoint;

/// Configuration for validation and in-flight safety rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightRules {
    /// Minimum destination altitude in meters
    pub min_altitude_m: f64,
    /// Maximum destination altitude in meters
    pub max_altitude_m: f64,
    /// Distance to a zone border at which a flight is aborted
    pub proximity_stop_m: f64,
    /// Optional advisory distance to a zone border (no abort)
    pub proximity_warning_m: Option<f64>,
    /// Distance under which a waypoint counts as reached
    pub waypoint_arrival_m: f64,
    /// Demo flights pause this long after takeoff
    pub demo_pause_after: Duration,
    /// How long a demo pause lasts
    pub demo_pause_duration: Duration,
}

impl Default for FlightRules {
    fn default() -> Self {
        Self {
            min_altitude_m: 0.0,
            max_altitude_m: 500.0,
            proximity_stop_m: 100.0,
            proximity_warning_m: None,
            waypoint_arrival_m: 10.0,
            demo_pause_after: Duration::from_secs(30),
            demo_pause_duration: Duration::from_secs(10),
        }
    }
}

impl FlightRules {
    /// Returns a list of configuration problems (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.min_altitude_m.is_finite() || !self.max_altitude_m.is_finite() {
            errors.push("Altitude bounds must be finite".to_string());
        } else if self.min_altitude_m > self.max_altitude_m {
            errors.push(format!(
                "Minimum altitude ({}) must not exceed maximum altitude ({})",
                self.min_altitude_m, self.max_altitude_m
            ));
        }
        if !(self.proximity_stop_m >= 0.0) {
            errors.push("Proximity stop distance cannot be negative".to_string());
        }
        if let Some(warning) = self.proximity_warning_m {
            if !(warning >= 0.0) {
                errors.push("Proximity warning distance cannot be negative".to_string());
            }
        }
        if !(self.waypoint_arrival_m > 0.0) {
            errors.push("Waypoint arrival radius must be positive".to_string());
        }

        errors
    }

    /// Warning distance, if it is set above the stop distance.
    pub fn effective_warning_m(&self) -> Option<f64> {
        self.proximity_warning_m
            .filter(|warning| *warning > self.proximity_stop_m)
    }
}

/// Fixed takeoff point every route starts from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseLocation {
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
}

impl Default for BaseLocation {
    fn default() -> Self {
        Self {
            lat: 51.15545,
            lon: 71.41216,
            altitude_m: 0.0,
        }
    }
}

impl BaseLocation {
    /// Build the two-point route base -> destination.
    ///
    /// The base is synthesized at order 0; the destination keeps its coordinates
    /// and is renumbered to order 1.
    pub fn route_to(&self, destination: &RoutePoint) -> Vec<RoutePoint> {
        let base = RoutePoint {
            id: 0,
            lat: self.lat,
            lon: self.lon,
            altitude_m: self.altitude_m,
            point_order: 0,
            application_id: destination.application_id,
        };
        let mut destination = destination.clone();
        destination.point_order = 1;
        vec![base, destination]
    }

    #[cfg(test)]
    pub(crate) fn route_for(
        &self,
        application_id: crate::models::ApplicationId,
        lat: f64,
        lon: f64,
        altitude_m: f64,
    ) -> Vec<RoutePoint> {
        self.route_to(&RoutePoint {
            id: 0,
            lat,
            lon,
            altitude_m,
            point_order: 1,
            application_id,
        })
    }
}
