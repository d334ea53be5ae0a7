//! Geodesy helpers: great-circle distance and point-to-segment distance.

use crate::models::RoutePoint;

/// Mean Earth radius used by every distance calculation.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Minimum distance in meters from a point to a route segment.
///
/// The projection is done directly in (lat, lon) degree space, which is a
/// locally-flat approximation adequate for the short legs flown here. The
/// projection parameter is clamped to the segment, and the final distance is
/// measured with [`haversine_distance`].
pub fn point_to_segment_distance(
    point_lat: f64,
    point_lon: f64,
    seg_start_lat: f64,
    seg_start_lon: f64,
    seg_end_lat: f64,
    seg_end_lon: f64,
) -> f64 {
    let a = point_lat - seg_start_lat;
    let b = point_lon - seg_start_lon;
    let c = seg_end_lat - seg_start_lat;
    let d = seg_end_lon - seg_start_lon;

    let len_sq = c * c + d * d;
    if len_sq == 0.0 {
        return haversine_distance(point_lat, point_lon, seg_start_lat, seg_start_lon);
    }

    let t = ((a * c + b * d) / len_sq).clamp(0.0, 1.0);
    let closest_lat = seg_start_lat + t * c;
    let closest_lon = seg_start_lon + t * d;

    haversine_distance(point_lat, point_lon, closest_lat, closest_lon)
}

/// Total length of a route in meters, summed leg by leg.
pub fn route_distance_m(route: &[RoutePoint]) -> f64 {
    route
        .windows(2)
        .map(|leg| haversine_distance(leg[0].lat, leg[0].lon, leg[1].lat, leg[1].lon))
        .sum()
}

/// Planar heading from one coordinate to another, degrees in [0, 360), 0 = north.
pub fn heading_deg(from_lat: f64, from_lon: f64, to_lat: f64, to_lon: f64) -> f64 {
    let heading = (to_lon - from_lon).atan2(to_lat - from_lat).to_degrees();
    if heading < 0.0 {
        heading + 360.0
    } else {
        heading
    }
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}
