//! In-memory store and recording notifier shared by the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flight_core::spatial::offset_by_bearing;
use flight_core::{
    ActiveFlight, AlertLevel, ApplicationId, ApplicationStatus, BaseLocation, DronePosition,
    FlightApplication, RestrictedZone, RoutePoint,
};
use flight_notify::{Notifier, NotifyError};
use flight_processor::{Config, FlightController, FlightStore};

pub const EAST: f64 = FRAC_PI_2;
pub const NORTH: f64 = 0.0;

#[derive(Default)]
struct StoreState {
    applications: HashMap<ApplicationId, FlightApplication>,
    routes: HashMap<ApplicationId, Vec<RoutePoint>>,
    zones: Vec<RestrictedZone>,
    positions: Vec<DronePosition>,
    status_log: Vec<(ApplicationId, ApplicationStatus, Option<String>)>,
    fail_status: Option<ApplicationStatus>,
    slow_status: Option<(ApplicationStatus, Duration)>,
    pending_sticks: bool,
}

/// Store double. Keeps the full history of position writes and status changes.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn add_application(&self, id: ApplicationId, destination: (f64, f64, f64), tested: bool) {
        let mut state = self.state.lock().unwrap();
        state.applications.insert(
            id,
            FlightApplication {
                id,
                start_date: "2025-06-01T09:00:00Z".into(),
                end_date: "2025-06-01T18:00:00Z".into(),
                status: ApplicationStatus::Pending,
                rejection_reason: None,
                pilot_id: 100 + id,
                drone_id: 200 + id,
                tested,
                created_at: None,
                last_update: None,
            },
        );
        state.routes.insert(
            id,
            vec![RoutePoint {
                id: 1_000 + id,
                lat: destination.0,
                lon: destination.1,
                altitude_m: destination.2,
                point_order: 1,
                application_id: id,
            }],
        );
    }

    pub fn set_window(&self, id: ApplicationId, start: &str, end: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(app) = state.applications.get_mut(&id) {
            app.start_date = start.into();
            app.end_date = end.into();
        }
    }

    pub fn clear_route(&self, id: ApplicationId) {
        self.state.lock().unwrap().routes.remove(&id);
    }

    pub fn add_zone(&self, zone: RestrictedZone) {
        self.state.lock().unwrap().zones.push(zone);
    }

    /// Make every write of `status` fail.
    pub fn fail_status_updates(&self, status: ApplicationStatus) {
        self.state.lock().unwrap().fail_status = Some(status);
    }

    pub fn restore_status_updates(&self) {
        self.state.lock().unwrap().fail_status = None;
    }

    /// Make every write of `status` take `delay` before it lands.
    pub fn delay_status_updates(&self, status: ApplicationStatus, delay: Duration) {
        self.state.lock().unwrap().slow_status = Some((status, delay));
    }

    /// Keep reporting applications as pending after they leave that status.
    pub fn keep_pending_visible(&self) {
        self.state.lock().unwrap().pending_sticks = true;
    }

    pub fn status_of(&self, id: ApplicationId) -> Option<ApplicationStatus> {
        self.state
            .lock()
            .unwrap()
            .applications
            .get(&id)
            .map(|app| app.status)
    }

    pub fn rejection_reason_of(&self, id: ApplicationId) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .applications
            .get(&id)
            .and_then(|app| app.rejection_reason.clone())
    }

    pub fn status_history(&self, id: ApplicationId) -> Vec<ApplicationStatus> {
        self.state
            .lock()
            .unwrap()
            .status_log
            .iter()
            .filter(|(app, _, _)| *app == id)
            .map(|(_, status, _)| *status)
            .collect()
    }

    pub fn positions_for(&self, id: ApplicationId) -> Vec<DronePosition> {
        self.state
            .lock()
            .unwrap()
            .positions
            .iter()
            .filter(|position| position.application_id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FlightStore for MemoryStore {
    async fn get_pending_applications(&self) -> Result<Vec<FlightApplication>> {
        let state = self.state.lock().unwrap();
        let mut pending: Vec<FlightApplication> = state
            .applications
            .values()
            .filter(|app| state.pending_sticks || app.status == ApplicationStatus::Pending)
            .cloned()
            .map(|mut app| {
                app.status = ApplicationStatus::Pending;
                app
            })
            .collect();
        pending.sort_by_key(|app| app.id);
        Ok(pending)
    }

    async fn get_route_by_application_id(&self, application_id: ApplicationId) -> Result<Vec<RoutePoint>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .routes
            .get(&application_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_restricted_zones(&self) -> Result<Vec<RestrictedZone>> {
        Ok(self.state.lock().unwrap().zones.clone())
    }

    async fn update_application_status(
        &self,
        application_id: ApplicationId,
        status: ApplicationStatus,
        rejection_reason: Option<&str>,
    ) -> Result<()> {
        let delay = {
            let state = self.state.lock().unwrap();
            state
                .slow_status
                .filter(|(slow, _)| *slow == status)
                .map(|(_, delay)| delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_status == Some(status) {
            return Err(anyhow!("disk full"));
        }
        let app = state
            .applications
            .get_mut(&application_id)
            .ok_or_else(|| anyhow!("application {} not found", application_id))?;
        app.status = status;
        app.rejection_reason = rejection_reason.map(str::to_string);
        state
            .status_log
            .push((application_id, status, rejection_reason.map(str::to_string)));
        Ok(())
    }

    async fn save_drone_position(&self, position: &DronePosition) -> Result<()> {
        self.state.lock().unwrap().positions.push(position.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Status {
        id: ApplicationId,
        status: ApplicationStatus,
        message: String,
        reason: Option<String>,
    },
    Started(ApplicationId),
    Position(DronePosition),
    Completed {
        id: ApplicationId,
        reason: String,
        progress: f64,
    },
    Proximity {
        id: ApplicationId,
        zone_id: i64,
        level: AlertLevel,
        distance_m: f64,
    },
    Paused(ApplicationId),
    Resumed(ApplicationId),
}

/// Notifier double recording every call in order.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Event>>,
    hang_positions: Mutex<bool>,
}

impl RecordingNotifier {
    /// Position updates never complete from now on.
    pub fn hang_position_updates(&self) {
        *self.hang_positions.lock().unwrap() = true;
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self, id: ApplicationId) -> Vec<ApplicationStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Status { id: app, status, .. } if app == id => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn positions(&self, id: ApplicationId) -> Vec<DronePosition> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Position(position) if position.application_id == id => Some(position),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_status_update(
        &self,
        application_id: ApplicationId,
        status: ApplicationStatus,
        message: &str,
        rejection_reason: Option<&str>,
    ) -> Result<(), NotifyError> {
        self.record(Event::Status {
            id: application_id,
            status,
            message: message.to_string(),
            reason: rejection_reason.map(str::to_string),
        });
        Ok(())
    }

    async fn notify_flight_started(&self, flight: &ActiveFlight) -> Result<(), NotifyError> {
        self.record(Event::Started(flight.application_id));
        Ok(())
    }

    async fn update_drone_position(&self, position: &DronePosition) -> Result<(), NotifyError> {
        let hang = *self.hang_positions.lock().unwrap();
        if hang {
            std::future::pending::<()>().await;
        }
        self.record(Event::Position(position.clone()));
        Ok(())
    }

    async fn notify_flight_completed(
        &self,
        flight: &ActiveFlight,
        completion_reason: &str,
    ) -> Result<(), NotifyError> {
        self.record(Event::Completed {
            id: flight.application_id,
            reason: completion_reason.to_string(),
            progress: flight.position.route_progress,
        });
        Ok(())
    }

    async fn notify_restricted_zone_proximity(
        &self,
        application_id: ApplicationId,
        _drone_id: i64,
        zone: &RestrictedZone,
        level: AlertLevel,
        distance_m: f64,
        _position: &DronePosition,
    ) -> Result<(), NotifyError> {
        self.record(Event::Proximity {
            id: application_id,
            zone_id: zone.id,
            level,
            distance_m,
        });
        Ok(())
    }

    async fn notify_flight_paused(&self, flight: &ActiveFlight, _reason: &str) -> Result<(), NotifyError> {
        self.record(Event::Paused(flight.application_id));
        Ok(())
    }

    async fn notify_flight_resumed(&self, flight: &ActiveFlight, _reason: &str) -> Result<(), NotifyError> {
        self.record(Event::Resumed(flight.application_id));
        Ok(())
    }
}

/// Point `distance_m` from the default base along `bearing_rad`.
pub fn from_base(distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    let base = BaseLocation::default();
    offset_by_bearing(base.lat, base.lon, distance_m, bearing_rad)
}

pub fn zone(id: i64, name: &str, center: (f64, f64), radius_m: f64) -> RestrictedZone {
    RestrictedZone {
        id,
        name: name.to_string(),
        lat: center.0,
        lon: center.1,
        altitude_m: 0.0,
        radius_m,
    }
}

pub fn test_config() -> Config {
    Config {
        processing_delay: Duration::from_secs(10),
        position_update_interval: Duration::from_secs(1),
        intake_interval: Duration::from_secs(5),
        zone_refresh_interval: Duration::from_secs(300),
        ..Config::default()
    }
}

pub fn controller(
    store: &Arc<MemoryStore>,
    notifier: &Arc<RecordingNotifier>,
    config: Config,
) -> Arc<FlightController> {
    Arc::new(
        FlightController::new(store.clone(), notifier.clone(), config).expect("valid config"),
    )
}
