//! Temperature approach model
//!
//! Each reading moves the simulated temperature a fixed step toward the
//! set-point. A stalled model never moves, which is how tests exercise ramp
//! timeouts.

/// Ambient temperature the model starts at and returns to when off (°C)
pub const AMBIENT_C: f64 = 22.0;

/// Simulated temperature with a fixed approach rate
#[derive(Debug, Clone)]
pub struct ThermalModel {
    current_c: f64,
    target_c: Option<f64>,
    step_c: f64,
    stalled: bool,
}

impl Default for ThermalModel {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl ThermalModel {
    /// Create a model starting at ambient that moves `step_c` per reading
    pub fn new(step_c: f64) -> Self {
        Self {
            current_c: AMBIENT_C,
            target_c: None,
            step_c,
            stalled: false,
        }
    }

    /// Freeze the temperature where it is
    pub fn stall(&mut self) {
        self.stalled = true;
    }

    pub fn set_target(&mut self, target_c: Option<f64>) {
        self.target_c = target_c;
    }

    pub fn target(&self) -> Option<f64> {
        self.target_c
    }

    /// Current temperature without advancing
    pub fn peek(&self) -> f64 {
        self.current_c
    }

    /// Advance one step and return the new temperature
    pub fn read(&mut self) -> f64 {
        if !self.stalled {
            let goal = self.target_c.unwrap_or(AMBIENT_C);
            let delta = goal - self.current_c;
            if delta.abs() <= self.step_c {
                self.current_c = goal;
            } else {
                self.current_c += self.step_c * delta.signum();
            }
        }
        self.current_c
    }
}
