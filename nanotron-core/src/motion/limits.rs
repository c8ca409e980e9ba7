//! Travel limits
//!
//! Soft limits for the cartesian axes. Plunger limits come from the selected
//! syringe model, with a configured fallback when none is selected.

use thiserror::Error;

use crate::config::SyringeParameters;
use crate::geometry::{Axis, AxisTarget};
use crate::state::LidState;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Motion errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    #[error("{axis} target {target:.2} mm outside [{min:.2}, {max:.2}]")]
    OutOfBounds {
        axis: Axis,
        target: f64,
        min: f64,
        max: f64,
    },
    #[error("{axis} target is not a finite number")]
    NonFinite { axis: Axis },
    #[error("unknown deck slot '{0}'")]
    UnknownSlot(String),
    #[error("slot {slot} is under the lid, which is {lid}")]
    LidNotOpen { slot: String, lid: LidState },
}

/// Inclusive range for one axis (mm)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisLimits {
    pub min: f64,
    pub max: f64,
}

impl AxisLimits {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check if a position is within bounds
    pub fn is_in_bounds(&self, position_mm: f64) -> bool {
        position_mm >= self.min && position_mm <= self.max
    }

    /// Clamp a position to valid bounds
    pub fn clamp(&self, position_mm: f64) -> f64 {
        position_mm.clamp(self.min, self.max)
    }

    /// Validate a target for `axis`
    pub fn check(&self, axis: Axis, target: f64) -> Result<(), MotionError> {
        if !target.is_finite() {
            return Err(MotionError::NonFinite { axis });
        }
        if self.is_in_bounds(target) {
            Ok(())
        } else {
            Err(MotionError::OutOfBounds {
                axis,
                target,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Soft limits for all axes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TravelLimits {
    pub x: AxisLimits,
    pub y: AxisLimits,
    /// Z range with a pipette attached
    pub z: AxisLimits,
    /// Plunger range used when no syringe model is selected
    pub plunger: AxisLimits,
}

impl Default for TravelLimits {
    fn default() -> Self {
        Self {
            x: AxisLimits::new(25.0, 418.0),
            y: AxisLimits::new(5.0, 340.0),
            z: AxisLimits::new(35.0, 170.15),
            plunger: AxisLimits::new(-50.0, 0.0),
        }
    }
}

impl TravelLimits {
    /// Limits for one axis
    pub fn for_axis(&self, axis: Axis, syringe: Option<&SyringeParameters>) -> AxisLimits {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::B | Axis::C => syringe
                .map(|s| AxisLimits::new(s.lower_limit_mm, s.upper_limit_mm))
                .unwrap_or(self.plunger),
        }
    }

    /// Validate every axis set in `target`
    pub fn check(
        &self,
        target: &AxisTarget,
        syringe: Option<&SyringeParameters>,
    ) -> Result<(), MotionError> {
        target
            .axes()
            .try_for_each(|(axis, value)| self.for_axis(axis, syringe).check(axis, value))
    }
}
