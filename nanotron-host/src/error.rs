//! Coordinator errors

use nanotron_core::geometry::CalibrationError;
use nanotron_core::labware::LabwareError;
use nanotron_core::liquid::ConversionError;
use nanotron_core::manual::BindingError;
use nanotron_core::motion::MotionError;
use nanotron_core::safety::{SafetyError, ThermalDevice};
use nanotron_core::traits::DriverError;
use thiserror::Error;

/// Errors surfaced by the coordinator runtime
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("device communication error on {device}: {source}")]
    Device {
        device: &'static str,
        #[source]
        source: DriverError,
    },
    #[error(transparent)]
    Motion(#[from] MotionError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Labware(#[from] LabwareError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Safety(#[from] SafetyError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("{device} did not reach {target_c:.1} °C (last reading {last_c:.1} °C)")]
    RampTimeout {
        device: ThermalDevice,
        target_c: f64,
        last_c: f64,
    },
    #[error("{what} out of range: {value}")]
    InvalidQuantity { what: &'static str, value: f64 },
    #[error("operation cancelled")]
    Cancelled,
    #[error("step {index} ({name}) failed: {source}")]
    Step {
        index: usize,
        name: &'static str,
        #[source]
        source: Box<CoordinatorError>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl CoordinatorError {
    pub fn device(device: &'static str, source: DriverError) -> Self {
        CoordinatorError::Device { device, source }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        CoordinatorError::Configuration(message.into())
    }
}

pub type Result<T, E = CoordinatorError> = core::result::Result<T, E>;
