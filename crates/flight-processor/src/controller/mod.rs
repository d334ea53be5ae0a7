//! Flight processing controller.
//!
//! Owns the active-flight set and the restricted-zone cache, and drives the
//! three background loops: application intake, zone refresh and position
//! simulation. All store and notifier access goes through the injected
//! [`FlightStore`] and [`Notifier`] handles.

mod intake;
mod simulation;
mod zones;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use flight_core::{ActiveFlight, AlertLevel, ApplicationId, ApplicationStatus, PositionSimulator};
use flight_notify::{Notifier, NotifyError};

use crate::config::Config;
use crate::error::ControllerError;
use crate::loops;
use crate::persistence::FlightStore;

pub use zones::ZoneCache;

/// Upper bound on a status update delivery.
pub const STATUS_NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);
/// Upper bound on a position update delivery.
pub const POSITION_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound on start, pause, resume, completion and alert deliveries.
pub const LIFECYCLE_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

const LOOP_STOP_TIMEOUT: Duration = Duration::from_secs(20);
const INTAKE_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
const INTAKE_DRAIN_POLL: Duration = Duration::from_millis(50);

/// Completion reason used when the processor stops with flights in the air.
pub const SYSTEM_SHUTDOWN: &str = "system_shutdown";

type AlertKey = (ApplicationId, i64, AlertLevel);

pub struct FlightController {
    store: Arc<dyn FlightStore>,
    notifier: Arc<dyn Notifier>,
    config: Config,
    simulator: PositionSimulator,
    active_flights: RwLock<HashMap<ApplicationId, ActiveFlight>>,
    zones: RwLock<ZoneCache>,
    /// Applications currently inside the intake pipeline
    in_progress: DashSet<ApplicationId>,
    /// Proximity alerts already sent for the current flight
    sent_alerts: DashMap<AlertKey, DateTime<Utc>>,
    /// Last status this controller recorded per application
    statuses: DashMap<ApplicationId, ApplicationStatus>,
    shutdown: broadcast::Sender<()>,
    started: AtomicBool,
    stopping: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    clock_origin: (Instant, DateTime<Utc>),
}

impl FlightController {
    /// Build a controller. Rejects configurations the simulation cannot run with.
    pub fn new(
        store: Arc<dyn FlightStore>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Result<Self, ControllerError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ControllerError::InvalidConfig(errors));
        }

        let (shutdown, _) = broadcast::channel(1);
        Ok(Self {
            store,
            notifier,
            simulator: config.simulator(),
            config,
            active_flights: RwLock::new(HashMap::new()),
            zones: RwLock::new(ZoneCache::default()),
            in_progress: DashSet::new(),
            sent_alerts: DashMap::new(),
            statuses: DashMap::new(),
            shutdown,
            started: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            clock_origin: (Instant::now(), Utc::now()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the zone cache and launch the background loops.
    pub async fn start(self: &Arc<Self>) -> Result<(), ControllerError> {
        if self.is_stopping() {
            return Err(ControllerError::Stopped);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ControllerError::AlreadyStarted);
        }

        info!(
            processing_delay_s = self.config.processing_delay.as_secs(),
            tick_ms = self.config.position_update_interval.as_millis() as u64,
            speed_mps = self.config.flight_speed_mps,
            stop_distance_m = self.config.rules.proximity_stop_m,
            "Starting flight processor"
        );

        self.refresh_zones().await;

        let mut tasks = self.tasks.lock().await;
        tasks.push(tokio::spawn(loops::intake_loop::run_intake_loop(
            Arc::clone(self),
            self.shutdown.subscribe(),
        )));
        tasks.push(tokio::spawn(loops::zone_refresh_loop::run_zone_refresh_loop(
            Arc::clone(self),
            self.shutdown.subscribe(),
        )));
        tasks.push(tokio::spawn(loops::simulation_loop::run_simulation_loop(
            Arc::clone(self),
            self.shutdown.subscribe(),
        )));

        Ok(())
    }

    /// Stop the loops, let in-flight intake work wind down, then end every
    /// active flight with [`SYSTEM_SHUTDOWN`]. Safe to call more than once.
    pub async fn stop(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Stopping flight processor");
        let _ = self.shutdown.send(());

        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for mut task in tasks {
            if timeout(LOOP_STOP_TIMEOUT, &mut task).await.is_err() {
                warn!("Background loop did not stop in time, aborting it");
                task.abort();
            }
        }

        self.wait_for_intake_drain().await;

        let flights: Vec<ActiveFlight> = self
            .active_flights
            .write()
            .await
            .drain()
            .map(|(_, flight)| flight)
            .collect();
        let count = flights.len();
        join_all(
            flights
                .into_iter()
                .map(|flight| self.force_complete(flight, SYSTEM_SHUTDOWN)),
        )
        .await;

        info!(flights_cancelled = count, "Flight processor stopped");
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Snapshot of the active flights, ordered by application id.
    pub async fn active_flights(&self) -> Vec<ActiveFlight> {
        let mut flights: Vec<ActiveFlight> =
            self.active_flights.read().await.values().cloned().collect();
        flights.sort_by_key(|flight| flight.application_id);
        flights
    }

    pub async fn active_flight_count(&self) -> usize {
        self.active_flights.read().await.len()
    }

    /// Wall-clock time derived from the runtime's monotonic clock.
    pub(crate) fn now(&self) -> DateTime<Utc> {
        let (origin, wall) = self.clock_origin;
        let elapsed = Instant::now().saturating_duration_since(origin);
        wall + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
    }

    /// Wait out the processing delay. Returns false if shutdown began first.
    async fn wait_processing_delay(&self) -> bool {
        let mut shutdown = self.shutdown.subscribe();
        if self.is_stopping() {
            return false;
        }
        tokio::select! {
            _ = sleep(self.config.processing_delay) => true,
            _ = shutdown.recv() => false,
        }
    }

    async fn wait_for_intake_drain(&self) {
        let deadline = Instant::now() + INTAKE_DRAIN_TIMEOUT;
        while !self.in_progress.is_empty() {
            if Instant::now() >= deadline {
                warn!(
                    remaining = self.in_progress.len(),
                    "Intake work still running at shutdown"
                );
                return;
            }
            sleep(INTAKE_DRAIN_POLL).await;
        }
    }

    /// Deliver one notification with a time bound. Failures are logged, never raised.
    async fn deliver<F>(
        &self,
        kind: &'static str,
        application_id: ApplicationId,
        limit: Duration,
        delivery: F,
    ) -> bool
    where
        F: Future<Output = Result<(), NotifyError>>,
    {
        let err = match timeout(limit, delivery).await {
            Ok(Ok(())) => return true,
            Ok(Err(err)) => err,
            Err(_) => NotifyError::Timeout(limit),
        };
        warn!(application_id, notification = kind, error = %err, "Notification delivery failed");
        false
    }

    async fn send_status(
        &self,
        application_id: ApplicationId,
        status: ApplicationStatus,
        message: &str,
        rejection_reason: Option<&str>,
    ) -> bool {
        self.deliver(
            "status",
            application_id,
            STATUS_NOTIFY_TIMEOUT,
            self.notifier
                .notify_status_update(application_id, status, message, rejection_reason),
        )
        .await
    }

    /// Persist a status change. Changes the lifecycle does not allow are refused;
    /// refusals and store failures are logged and reported as `false`.
    async fn persist_status(
        &self,
        application_id: ApplicationId,
        status: ApplicationStatus,
        rejection_reason: Option<&str>,
    ) -> bool {
        let current = self.statuses.get(&application_id).map(|entry| *entry);
        if let Some(current) = current {
            if !current.can_transition_to(status) {
                if current.is_terminal() {
                    debug!(application_id, %current, next = %status, "Application already finished, status change ignored");
                } else {
                    warn!(application_id, %current, next = %status, "Refusing status change not allowed by the lifecycle");
                }
                return false;
            }
        }

        match self
            .store
            .update_application_status(application_id, status, rejection_reason)
            .await
        {
            Ok(()) => {
                self.statuses.insert(application_id, status);
                true
            }
            Err(err) => {
                warn!(
                    application_id,
                    %status,
                    error = %format!("{:#}", err),
                    "Failed to persist application status"
                );
                false
            }
        }
    }
}
