//! Processor errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("flight processor is already running")]
    AlreadyStarted,

    #[error("flight processor has been stopped")]
    Stopped,
}
