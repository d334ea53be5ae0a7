//! Route point persistence.

use anyhow::Result;
use sqlx::SqlitePool;

use flight_core::{ApplicationId, RoutePoint};

/// Load an application's route points in `point_order`.
pub async fn load_route(pool: &SqlitePool, application_id: ApplicationId) -> Result<Vec<RoutePoint>> {
    let rows = sqlx::query_as::<_, RouteRow>(
        r#"
        SELECT route_id, application_id, latitude, longitude, altitude, point_order
        FROM routes
        WHERE application_id = ?1
        ORDER BY point_order, route_id
        "#,
    )
    .bind(application_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RoutePoint::from).collect())
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    route_id: i64,
    application_id: i64,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    point_order: i32,
}

impl From<RouteRow> for RoutePoint {
    fn from(row: RouteRow) -> Self {
        RoutePoint {
            id: row.route_id,
            lat: row.latitude,
            lon: row.longitude,
            altitude_m: row.altitude,
            point_order: row.point_order,
            application_id: row.application_id,
        }
    }
}
