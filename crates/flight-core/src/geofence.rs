//! Route validation against restricted zones, and live proximity scanning.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{RestrictedZone, RoutePoint};
use crate::rules::FlightRules;
use crate::spatial::{haversine_distance, point_to_segment_distance};

/// Why an application was turned down. The display text is what pilots see.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectionReason {
    #[error("Unable to load flight route from database")]
    RouteUnavailable,

    #[error("No destination point specified in the flight plan")]
    NoDestination,

    #[error("Invalid requested time window: {0}")]
    InvalidWindow(String),

    #[error("Invalid altitude: {altitude:.1} meters. Allowed range: {min:.0}-{max:.0} meters")]
    InvalidAltitude { altitude: f64, min: f64, max: f64 },

    #[error("Flight route passes through restricted zone '{zone}'. Minimum distance required: {radius_m:.0} meters")]
    PointInZone { zone: String, radius_m: f64 },

    #[error("Flight path intersects with restricted zone '{zone}'")]
    PathIntersectsZone { zone: String },

    #[error("Internal error occurred during approval")]
    Internal,
}

/// Outcome of route validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteVerdict {
    Accepted,
    Rejected(RejectionReason),
}

impl RouteVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RouteVerdict::Accepted)
    }

    /// Operator-facing reason, empty when accepted.
    pub fn reason(&self) -> String {
        match self {
            RouteVerdict::Accepted => String::new(),
            RouteVerdict::Rejected(reason) => reason.to_string(),
        }
    }
}

impl From<RejectionReason> for RouteVerdict {
    fn from(reason: RejectionReason) -> Self {
        RouteVerdict::Rejected(reason)
    }
}

/// Validate a route against the restricted zones.
///
/// Checks run in order and stop at the first violation:
/// 1. destination altitude within the configured bounds
/// 2. every route point outside every zone
/// 3. every leg clear of every zone (catches legs that cut through a zone
///    without either endpoint landing inside it)
pub fn validate_route(
    route: &[RoutePoint],
    zones: &[RestrictedZone],
    rules: &FlightRules,
) -> RouteVerdict {
    let Some(destination) = route.last() else {
        return RejectionReason::NoDestination.into();
    };

    if destination.altitude_m < rules.min_altitude_m
        || destination.altitude_m > rules.max_altitude_m
    {
        return RejectionReason::InvalidAltitude {
            altitude: destination.altitude_m,
            min: rules.min_altitude_m,
            max: rules.max_altitude_m,
        }
        .into();
    }

    for point in route {
        for zone in zones {
            let distance = haversine_distance(point.lat, point.lon, zone.lat, zone.lon);
            if distance <= zone.radius_m {
                return RejectionReason::PointInZone {
                    zone: zone.name.clone(),
                    radius_m: zone.radius_m,
                }
                .into();
            }
        }
    }

    for leg in route.windows(2) {
        let (start, end) = (&leg[0], &leg[1]);
        for zone in zones {
            let distance =
                point_to_segment_distance(zone.lat, zone.lon, start.lat, start.lon, end.lat, end.lon);
            if distance <= zone.radius_m {
                return RejectionReason::PathIntersectsZone {
                    zone: zone.name.clone(),
                }
                .into();
            }
        }
    }

    RouteVerdict::Accepted
}

/// Severity of a proximity alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    /// Inside the advisory distance, flight continues
    Warning,
    /// Inside the stop distance, flight is aborted
    Danger,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Warning => "WARNING",
            AlertLevel::Danger => "DANGER",
        }
    }
}

/// A zone the drone is currently too close to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityAlert {
    pub zone: RestrictedZone,
    pub level: AlertLevel,
    /// Distance to the zone border in meters (negative inside the zone)
    pub distance_to_border_m: f64,
}

/// Scan a live position against the cached zones.
///
/// Danger alerts come first, in zone order; warnings follow. Warnings are
/// only produced when the rules carry a warning distance above the stop distance.
pub fn scan_proximity(
    lat: f64,
    lon: f64,
    zones: &[RestrictedZone],
    rules: &FlightRules,
) -> Vec<ProximityAlert> {
    let warning_m = rules.effective_warning_m();
    let mut danger = Vec::new();
    let mut warnings = Vec::new();

    for zone in zones {
        let distance_to_border_m = zone.distance_to_border(lat, lon);
        if distance_to_border_m <= rules.proximity_stop_m {
            danger.push(ProximityAlert {
                zone: zone.clone(),
                level: AlertLevel::Danger,
                distance_to_border_m,
            });
        } else if warning_m.is_some_and(|warning| distance_to_border_m <= warning) {
            warnings.push(ProximityAlert {
                zone: zone.clone(),
                level: AlertLevel::Warning,
                distance_to_border_m,
            });
        }
    }

    danger.extend(warnings);
    danger
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::BaseLocation;
    use crate::spatial::offset_by_bearing;
    use std::f64::consts::FRAC_PI_2;

    const BASE_LAT: f64 = 51.15545;
    const BASE_LON: f64 = 71.41216;

    fn zone(name: &str, lat: f64, lon: f64, radius_m: f64) -> RestrictedZone {
        RestrictedZone {
            id: 1,
            name: name.to_string(),
            lat,
            lon,
            altitude_m: 0.0,
            radius_m,
        }
    }

    fn route_east(distance_m: f64, altitude_m: f64) -> Vec<RoutePoint> {
        let (lat, lon) = offset_by_bearing(BASE_LAT, BASE_LON, distance_m, FRAC_PI_2);
        BaseLocation::default().route_for(1, lat, lon, altitude_m)
    }

    #[test]
    fn no_zones_is_accepted() {
        let verdict = validate_route(&route_east(3_000.0, 120.0), &[], &FlightRules::default());
        assert!(verdict.is_accepted());
        assert_eq!(verdict.reason(), "");
    }

    #[test]
    fn altitude_above_ceiling_is_rejected_regardless_of_zones() {
        let verdict = validate_route(&route_east(3_000.0, 600.0), &[], &FlightRules::default());
        assert!(!verdict.is_accepted());
        assert!(verdict.reason().starts_with("Invalid altitude: 600.0 meters"));
        assert!(verdict.reason().contains("0-500"));
    }

    #[test]
    fn negative_altitude_is_rejected() {
        let verdict = validate_route(&route_east(3_000.0, -5.0), &[], &FlightRules::default());
        assert!(matches!(
            verdict,
            RouteVerdict::Rejected(RejectionReason::InvalidAltitude { .. })
        ));
    }

    #[test]
    fn destination_inside_zone_is_rejected_by_name() {
        let route = route_east(3_000.0, 100.0);
        let dest = &route[1];
        let zones = [zone("Stadium", dest.lat, dest.lon, 200.0)];

        let verdict = validate_route(&route, &zones, &FlightRules::default());
        assert_eq!(
            verdict,
            RouteVerdict::Rejected(RejectionReason::PointInZone {
                zone: "Stadium".into(),
                radius_m: 200.0
            })
        );
        assert!(verdict.reason().contains("'Stadium'"));
    }

    #[test]
    fn leg_through_zone_is_rejected_even_with_both_endpoints_outside() {
        let route = route_east(4_000.0, 100.0);
        let mid_lat = (route[0].lat + route[1].lat) / 2.0;
        let mid_lon = (route[0].lon + route[1].lon) / 2.0;
        // radius well under half the leg: neither endpoint is inside
        let zones = [zone("Palace", mid_lat, mid_lon, 500.0)];

        let verdict = validate_route(&route, &zones, &FlightRules::default());
        assert_eq!(
            verdict,
            RouteVerdict::Rejected(RejectionReason::PathIntersectsZone {
                zone: "Palace".into()
            })
        );
    }

    #[test]
    fn zone_off_to_the_side_is_accepted() {
        let route = route_east(4_000.0, 100.0);
        let mid_lat = (route[0].lat + route[1].lat) / 2.0;
        let mid_lon = (route[0].lon + route[1].lon) / 2.0;
        let (zone_lat, zone_lon) = offset_by_bearing(mid_lat, mid_lon, 2_000.0, 0.0);
        let zones = [zone("Park", zone_lat, zone_lon, 500.0)];

        assert!(validate_route(&route, &zones, &FlightRules::default()).is_accepted());
    }

    #[test]
    fn point_check_wins_over_segment_check() {
        let route = route_east(4_000.0, 100.0);
        let mid_lat = (route[0].lat + route[1].lat) / 2.0;
        let mid_lon = (route[0].lon + route[1].lon) / 2.0;
        let zones = [
            zone("Crossing", mid_lat, mid_lon, 300.0),
            zone("AtDestination", route[1].lat, route[1].lon, 50.0),
        ];

        let verdict = validate_route(&route, &zones, &FlightRules::default());
        assert!(matches!(
            verdict,
            RouteVerdict::Rejected(RejectionReason::PointInZone { .. })
        ));
    }

    #[test]
    fn empty_route_has_no_destination() {
        let verdict = validate_route(&[], &[], &FlightRules::default());
        assert_eq!(verdict, RouteVerdict::Rejected(RejectionReason::NoDestination));
    }

    #[test]
    fn proximity_scan_flags_danger_within_stop_distance() {
        let (lat, lon) = offset_by_bearing(BASE_LAT, BASE_LON, 580.0, 0.0);
        let zones = [zone("Tower", lat, lon, 500.0)];

        let alerts = scan_proximity(BASE_LAT, BASE_LON, &zones, &FlightRules::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Danger);
        assert!((alerts[0].distance_to_border_m - 80.0).abs() < 0.5);
    }

    #[test]
    fn proximity_scan_ignores_distant_zones_without_warning_distance() {
        let (lat, lon) = offset_by_bearing(BASE_LAT, BASE_LON, 800.0, 0.0);
        let zones = [zone("Tower", lat, lon, 500.0)];

        assert!(scan_proximity(BASE_LAT, BASE_LON, &zones, &FlightRules::default()).is_empty());

        let rules = FlightRules {
            proximity_warning_m: Some(400.0),
            ..FlightRules::default()
        };
        let alerts = scan_proximity(BASE_LAT, BASE_LON, &zones, &rules);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
    }

    #[test]
    fn proximity_scan_orders_danger_first() {
        let (warn_lat, warn_lon) = offset_by_bearing(BASE_LAT, BASE_LON, 800.0, 0.0);
        let (danger_lat, danger_lon) = offset_by_bearing(BASE_LAT, BASE_LON, 550.0, FRAC_PI_2);
        let zones = [
            zone("Warn", warn_lat, warn_lon, 500.0),
            zone("Danger", danger_lat, danger_lon, 500.0),
        ];
        let rules = FlightRules {
            proximity_warning_m: Some(400.0),
            ..FlightRules::default()
        };

        let alerts = scan_proximity(BASE_LAT, BASE_LON, &zones, &rules);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].zone.name, "Danger");
        assert_eq!(alerts[1].level, AlertLevel::Warning);
    }
}
