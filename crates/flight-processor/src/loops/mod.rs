//! Background loops for continuous processing.

pub mod intake_loop;
pub mod simulation_loop;
pub mod zone_refresh_loop;
