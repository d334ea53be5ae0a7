pub mod flight;
pub mod geofence;
pub mod models;
pub mod rules;
pub mod simulator;
pub mod spatial;

pub use flight::{ActiveFlight, DemoTransition, FlightError, FlightState, StepOutcome};
pub use geofence::{
    scan_proximity, validate_route, AlertLevel, ProximityAlert, RejectionReason, RouteVerdict,
};
pub use models::{
    ApplicationId, ApplicationStatus, DronePosition, FlightApplication, RestrictedZone,
    RoutePoint,
};
pub use rules::{BaseLocation, FlightRules};
pub use simulator::PositionSimulator;
pub use spatial::{haversine_distance, point_to_segment_distance};
