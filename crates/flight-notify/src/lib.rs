//! Flight notifications - lifecycle and telemetry events for observers
//!
//! Defines the notifier contract the flight processor talks to, and an
//! HTTP/JSON implementation that posts each event to an observer service.

pub mod client;
pub mod notifier;
pub mod payload;

pub use client::HttpNotifier;
pub use notifier::{NotifyError, Notifier};
pub use payload::{
    FlightCompleted, FlightSnapshot, FlightStateChange, StatusUpdate, ZoneProximityAlert,
};
