//! Safety checks
//!
//! Accepted temperature ranges for the thermal devices.

pub mod limits;

pub use limits::{SafetyError, TemperatureRange, ThermalDevice, ThermalLimits};
