//! Persistence layer: the store contract and its SQLite implementation.

pub mod applications;
pub mod db;
pub mod positions;
pub mod routes;
pub mod zones;

use anyhow::Result;
use async_trait::async_trait;

use flight_core::{
    ApplicationId, ApplicationStatus, DronePosition, FlightApplication, RestrictedZone, RoutePoint,
};

pub use db::{init_database, Database};

/// Storage the flight controller reads work from and writes progress to.
#[async_trait]
pub trait FlightStore: Send + Sync {
    /// Applications with status `pending`.
    async fn get_pending_applications(&self) -> Result<Vec<FlightApplication>>;

    /// Route points for an application, ordered by `point_order`.
    async fn get_route_by_application_id(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<RoutePoint>>;

    async fn get_restricted_zones(&self) -> Result<Vec<RestrictedZone>>;

    /// Errors when the application does not exist.
    async fn update_application_status(
        &self,
        application_id: ApplicationId,
        status: ApplicationStatus,
        rejection_reason: Option<&str>,
    ) -> Result<()>;

    /// Upsert keyed by (application, drone).
    async fn save_drone_position(&self, position: &DronePosition) -> Result<()>;
}

#[async_trait]
impl FlightStore for Database {
    async fn get_pending_applications(&self) -> Result<Vec<FlightApplication>> {
        applications::load_pending_applications(self.pool()).await
    }

    async fn get_route_by_application_id(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<RoutePoint>> {
        routes::load_route(self.pool(), application_id).await
    }

    async fn get_restricted_zones(&self) -> Result<Vec<RestrictedZone>> {
        zones::load_zones(self.pool()).await
    }

    async fn update_application_status(
        &self,
        application_id: ApplicationId,
        status: ApplicationStatus,
        rejection_reason: Option<&str>,
    ) -> Result<()> {
        applications::update_application_status(self.pool(), application_id, status, rejection_reason)
            .await
    }

    async fn save_drone_position(&self, position: &DronePosition) -> Result<()> {
        positions::upsert_position(self.pool(), position).await
    }
}
