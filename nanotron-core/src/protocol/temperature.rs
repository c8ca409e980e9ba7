//! Temperature ramp and hold tracking
//!
//! A set-point wait has two phases. While ramping, the block temperature is
//! sampled at a fixed interval until it is within tolerance of the target.
//! Then the hold time is counted down in fixed increments without further
//! sampling. The ramp phase is bounded; a block that never reaches its
//! target fails instead of waiting forever.
//!
//! The tracker never sleeps or reads a sensor itself. The caller feeds it
//! readings and elapsed intervals and acts on the returned [`PollAction`].

use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ramp/hold timing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RampHoldConfig {
    /// Accepted distance from target (°C)
    pub tolerance_c: f64,
    /// Sampling interval while ramping (s)
    pub ramp_poll_s: u64,
    /// Hold accounting increment (s)
    pub hold_poll_s: u64,
    /// Give up ramping after this long (s)
    pub ramp_timeout_s: u64,
}

impl Default for RampHoldConfig {
    fn default() -> Self {
        Self {
            tolerance_c: 1.0,
            ramp_poll_s: 5,
            hold_poll_s: 30,
            ramp_timeout_s: 30 * 60,
        }
    }
}

impl RampHoldConfig {
    pub fn ramp_poll(&self) -> Duration {
        Duration::from_secs(self.ramp_poll_s)
    }

    pub fn hold_poll(&self) -> Duration {
        Duration::from_secs(self.hold_poll_s)
    }

    pub fn ramp_timeout(&self) -> Duration {
        Duration::from_secs(self.ramp_timeout_s)
    }
}

/// Wait phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampHoldPhase {
    Ramping,
    Holding,
    Complete,
    TimedOut,
}

/// What the caller should do next
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollAction {
    /// Wait, then report a new reading with [`RampHold::on_reading`]
    Sample(Duration),
    /// Wait, then call [`RampHold::on_hold_elapsed`]
    Hold(Duration),
    /// Target reached and held
    Complete,
    /// Target not reached within the ramp timeout
    TimedOut { last_c: f64 },
}

/// Ramp/hold tracker for one set-point
#[derive(Debug, Clone)]
pub struct RampHold {
    target_c: f64,
    hold: Duration,
    config: RampHoldConfig,
    phase: RampHoldPhase,
    ramp_elapsed: Duration,
    held: Duration,
}

impl RampHold {
    pub fn new(target_c: f64, hold: Duration, config: RampHoldConfig) -> Self {
        Self {
            target_c,
            hold,
            config,
            phase: RampHoldPhase::Ramping,
            ramp_elapsed: Duration::ZERO,
            held: Duration::ZERO,
        }
    }

    pub fn target_c(&self) -> f64 {
        self.target_c
    }

    pub fn phase(&self) -> RampHoldPhase {
        self.phase
    }

    /// Hold time counted so far
    pub fn held(&self) -> Duration {
        self.held
    }

    pub fn in_band(&self, reading_c: f64) -> bool {
        (reading_c - self.target_c).abs() <= self.config.tolerance_c
    }

    /// Feed a temperature reading while ramping
    pub fn on_reading(&mut self, reading_c: f64) -> PollAction {
        if self.phase != RampHoldPhase::Ramping {
            return self.hold_action();
        }

        if self.in_band(reading_c) {
            self.phase = RampHoldPhase::Holding;
            return self.hold_action();
        }

        if self.ramp_elapsed >= self.config.ramp_timeout() {
            self.phase = RampHoldPhase::TimedOut;
            return PollAction::TimedOut { last_c: reading_c };
        }

        let interval = self.config.ramp_poll();
        self.ramp_elapsed += interval;
        PollAction::Sample(interval)
    }

    /// Report that the last hold interval has elapsed
    pub fn on_hold_elapsed(&mut self) -> PollAction {
        if self.phase == RampHoldPhase::Holding {
            let step = self.next_hold_step();
            self.held += step;
        }
        self.hold_action()
    }

    fn next_hold_step(&self) -> Duration {
        self.config
            .hold_poll()
            .min(self.hold.saturating_sub(self.held))
    }

    fn hold_action(&mut self) -> PollAction {
        match self.phase {
            RampHoldPhase::Ramping => PollAction::Sample(self.config.ramp_poll()),
            RampHoldPhase::TimedOut => PollAction::TimedOut {
                last_c: f64::NAN,
            },
            RampHoldPhase::Complete => PollAction::Complete,
            RampHoldPhase::Holding => {
                let step = self.next_hold_step();
                if step.is_zero() {
                    self.phase = RampHoldPhase::Complete;
                    PollAction::Complete
                } else {
                    PollAction::Hold(step)
                }
            }
        }
    }
}
