//! Drone position persistence. One row per (application, drone), last write wins.

use anyhow::Result;
use sqlx::SqlitePool;

use flight_core::DronePosition;

pub async fn upsert_position(pool: &SqlitePool, position: &DronePosition) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO drone_positions
            (application_id, drone_id, latitude, longitude, altitude, speed, heading, route_progress, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(application_id, drone_id) DO UPDATE SET
            latitude = ?3, longitude = ?4, altitude = ?5, speed = ?6,
            heading = ?7, route_progress = ?8, timestamp = ?9
        "#,
    )
    .bind(position.application_id)
    .bind(position.drone_id)
    .bind(position.lat)
    .bind(position.lon)
    .bind(position.altitude_m)
    .bind(position.speed_mps)
    .bind(position.heading_deg)
    .bind(position.route_progress)
    .bind(position.timestamp.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn load_position(
    pool: &SqlitePool,
    application_id: flight_core::ApplicationId,
    drone_id: i64,
) -> Result<Option<DronePosition>> {
    let row = sqlx::query_as::<_, PositionRow>(
        r#"
        SELECT application_id, drone_id, latitude, longitude, altitude, speed, heading, route_progress, timestamp
        FROM drone_positions
        WHERE application_id = ?1 AND drone_id = ?2
        "#,
    )
    .bind(application_id)
    .bind(drone_id)
    .fetch_optional(pool)
    .await?;

    row.map(DronePosition::try_from).transpose()
}

#[cfg(test)]
#[derive(sqlx::FromRow)]
struct PositionRow {
    application_id: i64,
    drone_id: i64,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    speed: f64,
    heading: f64,
    route_progress: f64,
    timestamp: String,
}

#[cfg(test)]
impl TryFrom<PositionRow> for DronePosition {
    type Error = anyhow::Error;

    fn try_from(row: PositionRow) -> Result<Self> {
        use chrono::{DateTime, Utc};

        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)?.with_timezone(&Utc);
        Ok(DronePosition {
            application_id: row.application_id,
            drone_id: row.drone_id,
            lat: row.latitude,
            lon: row.longitude,
            altitude_m: row.altitude,
            speed_mps: row.speed,
            heading_deg: row.heading,
            timestamp,
            route_progress: row.route_progress,
        })
    }
}
