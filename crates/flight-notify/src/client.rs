//! Observer HTTP client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use flight_core::{
    ActiveFlight, AlertLevel, ApplicationId, ApplicationStatus, DronePosition, RestrictedZone,
};

use crate::notifier::{NotifyError, Notifier};
use crate::payload::{
    Ack, FlightCompleted, FlightSnapshot, FlightStateChange, StatusUpdate, ZoneProximityAlert,
};

/// Posts flight notifications as JSON to an observer service.
///
/// Every endpoint answers with `{"success": bool, "error_message": string?}`;
/// a `false` acknowledgement is reported as [`NotifyError::Refused`].
pub struct HttpNotifier {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) request_timeout: Duration,
}

impl HttpNotifier {
    /// Create a new notifier client.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), NotifyError> {
        let url = format!("{}/v1/notifications/{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| match NotifyError::from(err) {
                NotifyError::Timeout(_) => NotifyError::Timeout(self.request_timeout),
                other => other,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ack: Ack = response
            .json()
            .await
            .map_err(|err| NotifyError::Transport(format!("invalid acknowledgement: {}", err)))?;
        ack_result(ack)
    }
}

fn ack_result(ack: Ack) -> Result<(), NotifyError> {
    if ack.success {
        Ok(())
    } else {
        Err(NotifyError::Refused(
            ack.error_message
                .unwrap_or_else(|| "no reason given".to_string()),
        ))
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify_status_update(
        &self,
        application_id: ApplicationId,
        status: ApplicationStatus,
        message: &str,
        rejection_reason: Option<&str>,
    ) -> Result<(), NotifyError> {
        let body = StatusUpdate {
            application_id,
            status,
            message,
            rejection_reason,
            timestamp: Utc::now(),
        };
        self.post("status", &body).await?;
        tracing::debug!(application_id, %status, "Status update delivered");
        Ok(())
    }

    async fn notify_flight_started(&self, flight: &ActiveFlight) -> Result<(), NotifyError> {
        self.post("flight-started", &FlightSnapshot::from(flight)).await
    }

    async fn update_drone_position(&self, position: &DronePosition) -> Result<(), NotifyError> {
        self.post("position", position).await
    }

    async fn notify_flight_completed(
        &self,
        flight: &ActiveFlight,
        completion_reason: &str,
    ) -> Result<(), NotifyError> {
        let body = FlightCompleted {
            application_id: flight.application_id,
            drone_id: flight.drone_id,
            final_position: &flight.position,
            completion_time: Utc::now(),
            completion_status: completion_reason,
        };
        self.post("flight-completed", &body).await
    }

    async fn notify_restricted_zone_proximity(
        &self,
        application_id: ApplicationId,
        drone_id: i64,
        zone: &RestrictedZone,
        level: AlertLevel,
        distance_m: f64,
        position: &DronePosition,
    ) -> Result<(), NotifyError> {
        let body = ZoneProximityAlert::new(application_id, drone_id, zone, level, distance_m, position);
        self.post("zone-proximity", &body).await?;
        tracing::debug!(
            application_id,
            drone_id,
            zone = %zone.name,
            level = level.as_str(),
            distance_m,
            "Zone proximity alert delivered"
        );
        Ok(())
    }

    async fn notify_flight_paused(
        &self,
        flight: &ActiveFlight,
        reason: &str,
    ) -> Result<(), NotifyError> {
        let body = FlightStateChange {
            flight: FlightSnapshot::from(flight),
            reason,
            timestamp: Utc::now(),
        };
        self.post("flight-paused", &body).await
    }

    async fn notify_flight_resumed(
        &self,
        flight: &ActiveFlight,
        reason: &str,
    ) -> Result<(), NotifyError> {
        let body = FlightStateChange {
            flight: FlightSnapshot::from(flight),
            reason,
            timestamp: Utc::now(),
        };
        self.post("flight-resumed", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_observer(success: bool) -> String {
        let app = Router::new().route(
            "/v1/notifications/:kind",
            post(move |Path(kind): Path<String>, Json(_body): Json<Value>| async move {
                if success {
                    Json(json!({ "success": true }))
                } else {
                    Json(json!({ "success": false, "error_message": format!("{} not wanted", kind) }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn negative_ack_is_refused() {
        let err = ack_result(Ack {
            success: false,
            error_message: Some("queue full".into()),
        })
        .unwrap_err();
        assert!(matches!(err, NotifyError::Refused(msg) if msg == "queue full"));
        assert!(ack_result(Ack {
            success: true,
            error_message: None
        })
        .is_ok());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let notifier = HttpNotifier::new("http://observer:1234/", Duration::from_secs(5)).unwrap();
        assert_eq!(notifier.base_url(), "http://observer:1234");
    }

    #[tokio::test]
    async fn status_update_is_acknowledged() {
        let base = spawn_observer(true).await;
        let notifier = HttpNotifier::new(base, Duration::from_secs(5)).unwrap();
        notifier
            .notify_status_update(1, ApplicationStatus::Processing, "processing", None)
            .await
            .expect("delivered");
    }

    #[tokio::test]
    async fn refused_notification_reports_reason() {
        let base = spawn_observer(false).await;
        let notifier = HttpNotifier::new(base, Duration::from_secs(5)).unwrap();
        let err = notifier
            .notify_status_update(1, ApplicationStatus::Rejected, "rejected", Some("zone"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Refused(msg) if msg == "status not wanted"));
    }

    #[tokio::test]
    async fn unreachable_observer_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let notifier =
            HttpNotifier::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        let err = notifier
            .notify_status_update(1, ApplicationStatus::Processing, "processing", None)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
    }
}
