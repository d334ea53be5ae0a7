//! Restricted zone persistence.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::warn;

use flight_core::RestrictedZone;

#[cfg(test)]
pub(crate) async fn insert_zone(
    pool: &SqlitePool,
    name: &str,
    lat: f64,
    lon: f64,
    altitude_m: f64,
    radius_m: f64,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO restricted_zones (name, latitude, longitude, altitude, radius)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(name)
    .bind(lat)
    .bind(lon)
    .bind(altitude_m)
    .bind(radius_m)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load all restricted zones. Zones with a negative radius are skipped.
pub async fn load_zones(pool: &SqlitePool) -> Result<Vec<RestrictedZone>> {
    let rows = sqlx::query_as::<_, ZoneRow>(
        "SELECT zone_id, name, latitude, longitude, altitude, radius FROM restricted_zones ORDER BY zone_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            if row.radius < 0.0 {
                warn!(zone_id = row.zone_id, radius = row.radius, "Skipping zone with negative radius");
                return None;
            }
            Some(RestrictedZone {
                id: row.zone_id,
                name: row.name,
                lat: row.latitude,
                lon: row.longitude,
                altitude_m: row.altitude,
                radius_m: row.radius,
            })
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct ZoneRow {
    zone_id: i64,
    name: String,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    radius: f64,
}
