//! Flight processor - always-on engine that vets flight applications and
//! flies approved ones in simulation.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod loops;
pub mod persistence;

pub use config::{Config, LogFormat};
pub use controller::FlightController;
pub use error::ControllerError;
pub use persistence::FlightStore;
