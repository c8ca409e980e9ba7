//! Thermal limits
//!
//! Requested set-points outside a device's accepted range are rejected
//! before any command reaches the device.

use core::fmt;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Temperature-controlled device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalDevice {
    Block,
    Lid,
    Tempdeck,
}

impl fmt::Display for ThermalDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThermalDevice::Block => "block",
            ThermalDevice::Lid => "lid",
            ThermalDevice::Tempdeck => "tempdeck",
        };
        f.write_str(name)
    }
}

/// Safety errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SafetyError {
    #[error("{device} target {requested:.1} °C outside [{min:.1}, {max:.1}]")]
    OutOfRange {
        device: ThermalDevice,
        requested: f64,
        min: f64,
        max: f64,
    },
    #[error("{device} target is not a finite number")]
    NonFinite { device: ThermalDevice },
}

/// Inclusive temperature range (°C)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TemperatureRange {
    pub min_c: f64,
    pub max_c: f64,
}

impl TemperatureRange {
    pub const fn new(min_c: f64, max_c: f64) -> Self {
        Self { min_c, max_c }
    }

    pub fn contains(&self, celsius: f64) -> bool {
        celsius >= self.min_c && celsius <= self.max_c
    }
}

/// Accepted set-point ranges per device
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ThermalLimits {
    pub block: TemperatureRange,
    pub lid: TemperatureRange,
    pub tempdeck: TemperatureRange,
}

impl Default for ThermalLimits {
    fn default() -> Self {
        Self {
            block: TemperatureRange::new(4.0, 99.0),
            lid: TemperatureRange::new(37.0, 110.0),
            tempdeck: TemperatureRange::new(4.0, 95.0),
        }
    }
}

impl ThermalLimits {
    pub fn range(&self, device: ThermalDevice) -> TemperatureRange {
        match device {
            ThermalDevice::Block => self.block,
            ThermalDevice::Lid => self.lid,
            ThermalDevice::Tempdeck => self.tempdeck,
        }
    }

    /// Validate a set-point for `device`
    pub fn check(&self, device: ThermalDevice, requested: f64) -> Result<(), SafetyError> {
        if !requested.is_finite() {
            return Err(SafetyError::NonFinite { device });
        }
        let range = self.range(device);
        if range.contains(requested) {
            Ok(())
        } else {
            Err(SafetyError::OutOfRange {
                device,
                requested,
                min: range.min_c,
                max: range.max_c,
            })
        }
    }

    /// Check that every range is non-empty
    pub fn is_valid(&self) -> bool {
        [self.block, self.lid, self.tempdeck]
            .iter()
            .all(|r| r.min_c.is_finite() && r.max_c.is_finite() && r.min_c < r.max_c)
    }
}
