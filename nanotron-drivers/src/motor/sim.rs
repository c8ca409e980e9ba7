//! Simulated gantry
//!
//! Moves complete instantly. Every accepted command is appended to a call
//! log so callers can check exact ordering.

use nanotron_core::geometry::{AxisSet, AxisTarget, Position};
use nanotron_core::traits::{DriverError, MotorDriver};

/// Command received by the simulated gantry
#[derive(Debug, Clone, PartialEq)]
pub enum MotorCall {
    Connect,
    Disconnect,
    MoveTo { target: AxisTarget, speed_mm_s: f64 },
    Home(AxisSet),
}

/// Simulated motor controller
#[derive(Debug, Clone)]
pub struct SimGantry {
    connected: bool,
    position: Position,
    home: Position,
    calls: Vec<MotorCall>,
    /// Fail the next command with this error
    pending_failure: Option<DriverError>,
}

impl Default for SimGantry {
    fn default() -> Self {
        Self::new(Position {
            x: 200.0,
            y: 150.0,
            z: 170.15,
            b: 0.0,
            c: 0.0,
        })
    }
}

impl SimGantry {
    /// Create a gantry resting at its home position
    pub fn new(home: Position) -> Self {
        Self {
            connected: false,
            position: home,
            home,
            calls: Vec::new(),
            pending_failure: None,
        }
    }

    /// Place the head somewhere other than home
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Make the next command fail
    pub fn fail_next(&mut self, error: DriverError) {
        self.pending_failure = Some(error);
    }

    pub fn calls(&self) -> &[MotorCall] {
        &self.calls
    }

    /// Drain the call log
    pub fn take_calls(&mut self) -> Vec<MotorCall> {
        core::mem::take(&mut self.calls)
    }

    /// Targets of the recorded moves, in order
    pub fn moves(&self) -> Vec<AxisTarget> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                MotorCall::MoveTo { target, .. } => Some(*target),
                _ => None,
            })
            .collect()
    }

    fn check(&mut self) -> Result<(), DriverError> {
        if let Some(error) = self.pending_failure.take() {
            return Err(error);
        }
        if !self.connected {
            return Err(DriverError::NotConnected);
        }
        Ok(())
    }
}

impl MotorDriver for SimGantry {
    fn connect(&mut self) -> Result<(), DriverError> {
        if let Some(error) = self.pending_failure.take() {
            return Err(error);
        }
        self.connected = true;
        self.calls.push(MotorCall::Connect);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        if self.connected {
            self.connected = false;
            self.calls.push(MotorCall::Disconnect);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn move_to(&mut self, target: &AxisTarget, speed_mm_s: f64) -> Result<(), DriverError> {
        self.check()?;
        tracing::trace!(%target, speed_mm_s, "sim move");
        target.apply_to(&mut self.position);
        self.calls.push(MotorCall::MoveTo {
            target: *target,
            speed_mm_s,
        });
        Ok(())
    }

    fn home(&mut self, axes: AxisSet) -> Result<(), DriverError> {
        self.check()?;
        tracing::trace!(%axes, "sim home");
        for axis in axes.iter() {
            self.position.set(axis, self.home.get(axis));
        }
        self.calls.push(MotorCall::Home(axes));
        Ok(())
    }

    fn position(&self) -> Position {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanotron_core::config::{label, SyringeParameters};
    use nanotron_core::geometry::{Axis, Plunger};

    fn syringe() -> SyringeParameters {
        SyringeParameters {
            name: label("sim").unwrap(),
            volume_ul: None,
            inner_diameter_mm: 1.0,
            upper_limit_mm: 0.0,
            lower_limit_mm: -50.0,
            sweet_spot_mm: -40.0,
        }
    }

    #[test]
    fn test_moves_require_connection() {
        let mut gantry = SimGantry::default();
        assert_eq!(
            gantry.move_to(&AxisTarget::z(100.0), 10.0),
            Err(DriverError::NotConnected)
        );
        gantry.connect().unwrap();
        gantry.move_to(&AxisTarget::z(100.0), 10.0).unwrap();
        assert_eq!(gantry.position().z, 100.0);
        assert_eq!(gantry.moves(), vec![AxisTarget::z(100.0)]);
    }

    #[test]
    fn test_home_restores_axes() {
        let mut gantry = SimGantry::default();
        gantry.connect().unwrap();
        gantry.move_to(&AxisTarget::xy(50.0, 60.0), 40.0).unwrap();
        gantry.home(AxisSet::from_axes(&[Axis::X])).unwrap();
        assert_eq!(gantry.position().x, 200.0);
        assert_eq!(gantry.position().y, 60.0);
    }

    #[test]
    fn test_plunger_travel_checked() {
        let mut gantry = SimGantry::default();
        gantry.connect().unwrap();
        gantry
            .plunger_down(Plunger::Left, 10.0, 1.0, &syringe())
            .unwrap();
        assert_eq!(gantry.position().b, -10.0);
        assert!(matches!(
            gantry.plunger_up(Plunger::Left, 20.0, 1.0, &syringe()),
            Err(DriverError::OutOfTravel { axis: Axis::B, .. })
        ));
        assert_eq!(gantry.position().b, -10.0);
    }

    #[test]
    fn test_injected_failure() {
        let mut gantry = SimGantry::default();
        gantry.connect().unwrap();
        gantry.fail_next(DriverError::Timeout);
        assert_eq!(
            gantry.home(AxisSet::XYZ),
            Err(DriverError::Timeout)
        );
        assert!(gantry.home(AxisSet::XYZ).is_ok());
    }
}
