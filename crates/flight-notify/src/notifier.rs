//! The notifier contract.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use flight_core::{
    ActiveFlight, AlertLevel, ApplicationId, ApplicationStatus, DronePosition, RestrictedZone,
};

/// Delivery failures. Business-level outcomes are never errors here.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("observer responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("observer refused notification: {0}")]
    Refused(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotifyError::Timeout(Duration::ZERO)
        } else {
            NotifyError::Transport(err.to_string())
        }
    }
}

/// Sink for flight lifecycle and telemetry events.
///
/// Implementations must be `Send + Sync`; the processor shares one instance
/// across all of its loops as `Arc<dyn Notifier>`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_status_update(
        &self,
        application_id: ApplicationId,
        status: ApplicationStatus,
        message: &str,
        rejection_reason: Option<&str>,
    ) -> Result<(), NotifyError>;

    async fn notify_flight_started(&self, flight: &ActiveFlight) -> Result<(), NotifyError>;

    async fn update_drone_position(&self, position: &DronePosition) -> Result<(), NotifyError>;

    async fn notify_flight_completed(
        &self,
        flight: &ActiveFlight,
        completion_reason: &str,
    ) -> Result<(), NotifyError>;

    async fn notify_restricted_zone_proximity(
        &self,
        application_id: ApplicationId,
        drone_id: i64,
        zone: &RestrictedZone,
        level: AlertLevel,
        distance_m: f64,
        position: &DronePosition,
    ) -> Result<(), NotifyError>;

    async fn notify_flight_paused(
        &self,
        flight: &ActiveFlight,
        reason: &str,
    ) -> Result<(), NotifyError>;

    async fn notify_flight_resumed(
        &self,
        flight: &ActiveFlight,
        reason: &str,
    ) -> Result<(), NotifyError>;
}
