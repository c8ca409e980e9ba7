//! Driver errors

use thiserror::Error;

use crate::geometry::Axis;

/// Errors reported by device drivers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("device not connected")]
    NotConnected,
    #[error("port {0} could not be opened")]
    Port(String),
    #[error("device did not respond in time")]
    Timeout,
    #[error("device rejected command: {0}")]
    Rejected(String),
    #[error("{axis} target {target:.3} mm outside syringe travel")]
    OutOfTravel { axis: Axis, target: f64 },
    #[error("device lock poisoned")]
    Poisoned,
}
