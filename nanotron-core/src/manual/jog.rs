//! Jog settings
//!
//! Step sizes, speeds and the active syringe side used by manual control.
//! Shared between the dispatch loop and runtime setting updates.

use crate::geometry::Plunger;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Manual jog configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct JogSettings {
    /// Cartesian step (mm)
    pub xyz_step_mm: f64,
    /// Upper bound on cartesian jog speed (mm/s)
    pub xyz_speed_mm_s: f64,
    /// Smallest cartesian step (mm)
    pub min_step_mm: f64,
    /// Largest cartesian step (mm)
    pub max_step_mm: f64,
    /// Plunger step (mm)
    pub syringe_step_mm: f64,
    /// Plunger jog speed (mm/s)
    pub syringe_speed_mm_s: f64,
    /// Active syringe side
    pub side: Plunger,
}

impl Default for JogSettings {
    fn default() -> Self {
        Self {
            xyz_step_mm: 1.0,
            xyz_speed_mm_s: 160.0,
            min_step_mm: 0.01,
            max_step_mm: 100.0,
            syringe_step_mm: 4.0,
            syringe_speed_mm_s: 1.2,
            side: Plunger::Left,
        }
    }
}

impl JogSettings {
    /// Double the cartesian step, clamped to the maximum
    pub fn double_step_size(&mut self) -> f64 {
        self.xyz_step_mm = self.clamp_step(self.xyz_step_mm * 2.0);
        self.xyz_step_mm
    }

    /// Halve the cartesian step, clamped to the minimum
    pub fn halve_step_size(&mut self) -> f64 {
        self.xyz_step_mm = self.clamp_step(self.xyz_step_mm / 2.0);
        self.xyz_step_mm
    }

    /// Set the cartesian step, clamped to the bounds
    pub fn set_step_size(&mut self, step_mm: f64) -> f64 {
        self.xyz_step_mm = self.clamp_step(step_mm);
        self.xyz_step_mm
    }

    pub fn toggle_side(&mut self) -> Plunger {
        self.side = self.side.toggled();
        self.side
    }

    pub fn is_valid(&self) -> bool {
        self.min_step_mm > 0.0
            && self.min_step_mm <= self.max_step_mm
            && self.xyz_speed_mm_s > 0.0
            && self.syringe_speed_mm_s > 0.0
            && self.syringe_step_mm > 0.0
    }

    fn clamp_step(&self, step_mm: f64) -> f64 {
        step_mm.clamp(self.min_step_mm, self.max_step_mm)
    }
}
