//! Fixed-groundspeed position simulation.
//!
//! Each tick moves the drone a constant distance toward its current target
//! waypoint. Distances along the path are approximated in degrees using a
//! flat 111,320 m per degree, which is adequate for the short flights in scope.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::models::{DronePosition, RoutePoint};
use crate::spatial::{haversine_distance, heading_deg, route_distance_m};

/// Approximate meters per degree used for planar movement.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone)]
pub struct PositionSimulator {
    /// Groundspeed in meters per second
    pub groundspeed_mps: f64,
    /// Wall-clock length of one simulation tick
    pub tick: Duration,
}

impl PositionSimulator {
    pub fn new(groundspeed_mps: f64, tick: Duration) -> Self {
        Self {
            groundspeed_mps,
            tick,
        }
    }

    /// Planar travel per tick, in degrees.
    pub fn degrees_per_tick(&self) -> f64 {
        self.groundspeed_mps * self.tick.as_secs_f64() / METERS_PER_DEGREE
    }

    /// Advance `current` one tick toward `target`.
    ///
    /// When the target is closer than one tick of travel the result snaps
    /// exactly onto it and keeps the previous heading. Route progress is left
    /// untouched; see [`PositionSimulator::route_progress`].
    pub fn step(
        &self,
        current: &DronePosition,
        target: &RoutePoint,
        now: DateTime<Utc>,
    ) -> DronePosition {
        let delta_lat = target.lat - current.lat;
        let delta_lon = target.lon - current.lon;
        let delta_alt = target.altitude_m - current.altitude_m;
        let remaining = (delta_lat * delta_lat + delta_lon * delta_lon).sqrt();
        let travel = self.degrees_per_tick();

        let mut next = DronePosition {
            speed_mps: self.groundspeed_mps,
            timestamp: now,
            ..current.clone()
        };

        if remaining < travel {
            next.lat = target.lat;
            next.lon = target.lon;
            next.altitude_m = target.altitude_m;
            return next;
        }

        let ratio = travel / remaining;
        next.lat = current.lat + delta_lat * ratio;
        next.lon = current.lon + delta_lon * ratio;
        next.altitude_m = current.altitude_m + delta_alt * ratio;
        next.heading_deg = heading_deg(current.lat, current.lon, target.lat, target.lon);
        next
    }

    /// Percentage of route length covered, from geometric distance to the route start.
    pub fn route_progress(route: &[RoutePoint], lat: f64, lon: f64) -> f64 {
        if route.len() < 2 {
            return 100.0;
        }
        let start = &route[0];
        let total = route_distance_m(route);
        if total <= 0.0 {
            return 100.0;
        }
        let covered = haversine_distance(start.lat, start.lon, lat, lon);
        (covered / total * 100.0).clamp(0.0, 100.0)
    }

    /// Time needed to fly the whole route at groundspeed. Saturates at [`Duration::MAX`].
    pub fn estimated_duration(&self, route: &[RoutePoint]) -> Duration {
        if self.groundspeed_mps <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(route_distance_m(route) / self.groundspeed_mps)
            .unwrap_or(Duration::MAX)
    }
}
