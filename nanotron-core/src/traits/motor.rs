//! Motor controller trait

use crate::config::SyringeParameters;
use crate::geometry::{AxisSet, AxisTarget, Plunger, Position};

use super::DriverError;

/// Trait for the gantry motor controller
///
/// All moves are absolute and block until the controller reports completion.
pub trait MotorDriver: Send {
    /// Open the link to the controller
    fn connect(&mut self) -> Result<(), DriverError>;

    /// Close the link; a no-op when not connected
    fn disconnect(&mut self) -> Result<(), DriverError>;

    fn is_connected(&self) -> bool;

    /// Move the axes set in `target` at `speed_mm_s`
    fn move_to(&mut self, target: &AxisTarget, speed_mm_s: f64) -> Result<(), DriverError>;

    /// Home the given axes
    fn home(&mut self, axes: AxisSet) -> Result<(), DriverError>;

    /// Last position reported by the controller
    fn position(&self) -> Position;

    /// Raise a plunger by `distance_mm`, checked against the syringe travel
    fn plunger_up(
        &mut self,
        plunger: Plunger,
        distance_mm: f64,
        speed_mm_s: f64,
        syringe: &SyringeParameters,
    ) -> Result<(), DriverError> {
        self.plunger_step(plunger, distance_mm, speed_mm_s, syringe)
    }

    /// Lower a plunger by `distance_mm`, checked against the syringe travel
    fn plunger_down(
        &mut self,
        plunger: Plunger,
        distance_mm: f64,
        speed_mm_s: f64,
        syringe: &SyringeParameters,
    ) -> Result<(), DriverError> {
        self.plunger_step(plunger, -distance_mm, speed_mm_s, syringe)
    }

    #[doc(hidden)]
    fn plunger_step(
        &mut self,
        plunger: Plunger,
        delta_mm: f64,
        speed_mm_s: f64,
        syringe: &SyringeParameters,
    ) -> Result<(), DriverError> {
        let axis = plunger.axis();
        let target = self.position().get(axis) + delta_mm;
        if !syringe.contains(target) {
            return Err(DriverError::OutOfTravel { axis, target });
        }
        self.move_to(&AxisTarget::axis(axis, target), speed_mm_s)
    }
}
