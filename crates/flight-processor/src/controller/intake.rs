//! Application intake: claim, validate, approve or reject, launch.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use flight_core::{
    validate_route, ActiveFlight, ApplicationId, ApplicationStatus, FlightApplication,
    RejectionReason, RouteVerdict, RoutePoint,
};

use super::{FlightController, LIFECYCLE_NOTIFY_TIMEOUT};

/// Marks an application as owned by one pipeline run. Released on drop.
pub(crate) struct IntakeClaim {
    controller: Arc<FlightController>,
    application_id: ApplicationId,
}

impl IntakeClaim {
    fn acquire(controller: &Arc<FlightController>, application_id: ApplicationId) -> Option<Self> {
        controller.in_progress.insert(application_id).then(|| Self {
            controller: Arc::clone(controller),
            application_id,
        })
    }
}

impl Drop for IntakeClaim {
    fn drop(&mut self) {
        self.controller.in_progress.remove(&self.application_id);
    }
}

impl FlightController {
    /// Fetch pending applications and hand each unclaimed one to its own pipeline task.
    pub async fn poll_pending(self: &Arc<Self>) {
        if self.is_stopping() {
            return;
        }

        let applications = match self.store.get_pending_applications().await {
            Ok(applications) => applications,
            Err(err) => {
                warn!(error = %format!("{:#}", err), "Failed to fetch pending applications");
                return;
            }
        };
        if applications.is_empty() {
            return;
        }
        debug!(count = applications.len(), "Pending applications found");

        for application in applications {
            if self.active_flights.read().await.contains_key(&application.id) {
                continue;
            }
            let Some(claim) = IntakeClaim::acquire(self, application.id) else {
                debug!(application_id = application.id, "Application already being processed");
                continue;
            };
            let controller = Arc::clone(self);
            tokio::spawn(async move {
                controller.process_application(application, claim).await;
            });
        }
    }

    async fn process_application(&self, application: FlightApplication, _claim: IntakeClaim) {
        let application_id = application.id;
        info!(
            application_id,
            drone_id = application.drone_id,
            pilot_id = application.pilot_id,
            tested = application.tested,
            "Processing flight application"
        );
        self.statuses.insert(application_id, application.status);

        if !self
            .persist_status(application_id, ApplicationStatus::Processing, None)
            .await
        {
            return;
        }
        self.send_status(
            application_id,
            ApplicationStatus::Processing,
            "Application is being processed and validated",
            None,
        )
        .await;

        if !self.wait_processing_delay().await {
            self.requeue(application_id).await;
            return;
        }

        match self.validate_application(&application).await {
            Ok(route) => self.approve(&application, route).await,
            Err(reason) => self.reject(application_id, reason).await,
        }
    }

    /// Validate an application's destination route against the cached zones.
    ///
    /// On success returns the two-point route base -> destination.
    pub async fn validate_application(
        &self,
        application: &FlightApplication,
    ) -> Result<Vec<RoutePoint>, RejectionReason> {
        application
            .requested_window()
            .map_err(RejectionReason::InvalidWindow)?;

        let points = self
            .store
            .get_route_by_application_id(application.id)
            .await
            .map_err(|err| {
                warn!(
                    application_id = application.id,
                    error = %format!("{:#}", err),
                    "Failed to load flight route"
                );
                RejectionReason::RouteUnavailable
            })?;
        let destination = points.first().ok_or(RejectionReason::NoDestination)?;

        let route = self.config.base_location.route_to(destination);
        let zones = self.zones().await;
        match validate_route(&route, &zones, &self.config.rules) {
            RouteVerdict::Accepted => Ok(route),
            RouteVerdict::Rejected(reason) => Err(reason),
        }
    }

    async fn approve(&self, application: &FlightApplication, route: Vec<RoutePoint>) {
        let application_id = application.id;

        if !self
            .persist_status(application_id, ApplicationStatus::Approved, None)
            .await
        {
            error!(application_id, "Approval could not be recorded, rejecting application");
            let reason = RejectionReason::Internal.to_string();
            self.persist_status(application_id, ApplicationStatus::Rejected, Some(&reason))
                .await;
            self.send_status(
                application_id,
                ApplicationStatus::Rejected,
                "Application rejected after validation",
                Some(&reason),
            )
            .await;
            return;
        }

        info!(application_id, "Application approved");
        self.send_status(
            application_id,
            ApplicationStatus::Approved,
            "Application approved successfully. Flight will start shortly.",
            None,
        )
        .await;

        self.start_flight(application, route).await;
    }

    async fn reject(&self, application_id: ApplicationId, reason: RejectionReason) {
        let reason = reason.to_string();
        info!(application_id, reason = %reason, "Application rejected");

        self.persist_status(application_id, ApplicationStatus::Rejected, Some(&reason))
            .await;
        self.send_status(
            application_id,
            ApplicationStatus::Rejected,
            "Application rejected after validation",
            Some(&reason),
        )
        .await;
    }

    /// Shutdown arrived during the processing delay: hand the application back to the queue.
    async fn requeue(&self, application_id: ApplicationId) {
        info!(application_id, "Processing interrupted by shutdown, returning application to queue");
        if self
            .persist_status(application_id, ApplicationStatus::Pending, None)
            .await
        {
            self.send_status(
                application_id,
                ApplicationStatus::Pending,
                "Processing interrupted by shutdown. Application returned to the queue.",
                None,
            )
            .await;
        }
    }

    async fn start_flight(&self, application: &FlightApplication, route: Vec<RoutePoint>) {
        let application_id = application.id;
        let flight = match ActiveFlight::launch(application, route, &self.simulator, self.now()) {
            Ok(flight) => flight,
            Err(err) => {
                error!(application_id, error = %err, "Flight could not be launched");
                self.cancel_launch(application_id, &format!("Failed to start flight: {}", err))
                    .await;
                return;
            }
        };

        // Recorded and announced before the simulation can see the flight.
        if !self
            .persist_status(application_id, ApplicationStatus::Executing, None)
            .await
        {
            error!(application_id, "Flight start could not be recorded, cancelling");
            self.cancel_launch(
                application_id,
                "Failed to start flight: execution could not be recorded",
            )
            .await;
            return;
        }

        let duration = flight.estimated_duration();
        info!(
            application_id,
            drone_id = flight.drone_id,
            duration_s = duration.as_secs(),
            demo_mode = flight.demo_mode,
            "Flight started"
        );

        let message = format!(
            "Flight started successfully. Estimated duration: {} seconds",
            duration.as_secs()
        );
        self.send_status(application_id, ApplicationStatus::Executing, &message, None)
            .await;
        self.deliver(
            "flight_started",
            application_id,
            LIFECYCLE_NOTIFY_TIMEOUT,
            self.notifier.notify_flight_started(&flight),
        )
        .await;

        self.clear_alerts(application_id);
        self.active_flights.write().await.insert(application_id, flight);
    }

    async fn cancel_launch(&self, application_id: ApplicationId, reason: &str) {
        self.persist_status(application_id, ApplicationStatus::Cancelled, Some(reason))
            .await;
        self.send_status(
            application_id,
            ApplicationStatus::Cancelled,
            "Flight could not be started",
            Some(reason),
        )
        .await;
    }
}
