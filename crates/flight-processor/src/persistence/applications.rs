//! Flight application persistence operations.

use anyhow::{anyhow, Result};
use sqlx::SqlitePool;
use tracing::warn;

use flight_core::models::parse_timestamp;
use flight_core::{ApplicationId, ApplicationStatus, FlightApplication};

/// Application as submitted by the intake API, with its destination.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct NewApplication {
    pub start_date: String,
    pub end_date: String,
    pub pilot_id: i64,
    pub drone_id: i64,
    pub tested: bool,
    pub destination_lat: f64,
    pub destination_lon: f64,
    pub destination_altitude_m: f64,
}

const SELECT_APPLICATION: &str = "SELECT application_id, start_date, end_date, status, \
     rejection_reason, pilot_id, drone_id, tested, created_at, last_update FROM applications";

/// Insert a pending application together with its single destination point.
#[cfg(test)]
pub(crate) async fn insert_application(pool: &SqlitePool, app: &NewApplication) -> Result<ApplicationId> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO applications (start_date, end_date, status, pilot_id, drone_id, tested)
        VALUES (?1, ?2, 'pending', ?3, ?4, ?5)
        "#,
    )
    .bind(&app.start_date)
    .bind(&app.end_date)
    .bind(app.pilot_id)
    .bind(app.drone_id)
    .bind(app.tested)
    .execute(&mut *tx)
    .await?;
    let application_id = result.last_insert_rowid();

    sqlx::query(
        r#"
        INSERT INTO routes (application_id, latitude, longitude, altitude, point_order)
        VALUES (?1, ?2, ?3, ?4, 1)
        "#,
    )
    .bind(application_id)
    .bind(app.destination_lat)
    .bind(app.destination_lon)
    .bind(app.destination_altitude_m)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(application_id)
}

/// Load applications waiting for intake, oldest first.
///
/// Rows that cannot be decoded are skipped with a warning.
pub async fn load_pending_applications(pool: &SqlitePool) -> Result<Vec<FlightApplication>> {
    let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
        "{} WHERE status = 'pending' ORDER BY created_at, application_id",
        SELECT_APPLICATION
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.application_id;
            match FlightApplication::try_from(row) {
                Ok(app) => Some(app),
                Err(err) => {
                    warn!(application_id = id, error = %err, "Skipping undecodable application");
                    None
                }
            }
        })
        .collect())
}

#[cfg(test)]
pub(crate) async fn load_application(
    pool: &SqlitePool,
    application_id: ApplicationId,
) -> Result<Option<FlightApplication>> {
    let row = sqlx::query_as::<_, ApplicationRow>(&format!(
        "{} WHERE application_id = ?1",
        SELECT_APPLICATION
    ))
    .bind(application_id)
    .fetch_optional(pool)
    .await?;

    row.map(FlightApplication::try_from).transpose()
}

/// Set status and rejection reason, stamping `last_update`.
///
/// Fails when the application does not exist.
pub async fn update_application_status(
    pool: &SqlitePool,
    application_id: ApplicationId,
    status: ApplicationStatus,
    rejection_reason: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE applications
        SET status = ?1, rejection_reason = ?2, last_update = CURRENT_TIMESTAMP
        WHERE application_id = ?3
        "#,
    )
    .bind(status.as_str())
    .bind(rejection_reason)
    .bind(application_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(anyhow!("application {} not found", application_id));
    }
    Ok(())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct ApplicationRow {
    application_id: i64,
    start_date: String,
    end_date: String,
    status: String,
    rejection_reason: Option<String>,
    pilot_id: i64,
    drone_id: i64,
    tested: bool,
    created_at: Option<String>,
    last_update: Option<String>,
}

impl TryFrom<ApplicationRow> for FlightApplication {
    type Error = anyhow::Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        let status = row.status.parse::<ApplicationStatus>().map_err(|e| anyhow!(e))?;

        Ok(FlightApplication {
            id: row.application_id,
            start_date: row.start_date,
            end_date: row.end_date,
            status,
            rejection_reason: row.rejection_reason.filter(|reason| !reason.is_empty()),
            pilot_id: row.pilot_id,
            drone_id: row.drone_id,
            tested: row.tested,
            created_at: row.created_at.as_deref().and_then(parse_timestamp),
            last_update: row.last_update.as_deref().and_then(parse_timestamp),
        })
    }
}
