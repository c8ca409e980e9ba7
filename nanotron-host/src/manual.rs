//! Manual control loop
//!
//! A poller thread drains the input device into a shared snapshot while the
//! calling thread dispatches bound commands to the sequencer at a fixed
//! cadence. Commands run one at a time and in arrival order; a stop request
//! is honored between commands, never in the middle of one.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use nanotron_core::geometry::{Axis, Position};
use nanotron_core::manual::{JogSettings, ManualCommand, MotionBindingProfile};
use nanotron_core::traits::{InputEvent, InputSource};
use tracing::{debug, error, info, warn};

use crate::cancel::{CancelToken, Pacer};
use crate::error::{CoordinatorError, Result};
use crate::sequencer::MotionSequencer;

/// Idle delay between polls of an empty input device
const POLL_IDLE: Duration = Duration::from_millis(5);

/// Jog settings shared between the dispatch loop and runtime setting updates
#[derive(Debug, Clone, Default)]
pub struct JogHandle {
    inner: Arc<Mutex<JogSettings>>,
}

impl JogHandle {
    pub fn new(settings: JogSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(settings)),
        }
    }

    pub fn get(&self) -> JogSettings {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update<T>(&self, f: impl FnOnce(&mut JogSettings) -> T) -> T {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// The stop binding was pressed
    #[default]
    StopBinding,
    /// Cancelled through the loop's token
    Cancelled,
    /// The input device closed or failed
    InputClosed,
}

/// Outcome of one manual session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualSummary {
    /// Commands executed
    pub dispatched: usize,
    /// Events with no binding, or homing requests that were not armed
    pub ignored: usize,
    /// Moves refused by the travel limits
    pub rejected: usize,
    pub stop_reason: StopReason,
}

#[derive(Debug, Default)]
struct InputSnapshot {
    pending: Vec<InputEvent>,
    closed: bool,
}

/// Joystick/keyboard driven jogging
pub struct ManualControlLoop {
    profile: MotionBindingProfile,
    jog: JogHandle,
    interval: Duration,
    cancel: CancelToken,
    homing_armed: bool,
}

impl ManualControlLoop {
    pub fn new(profile: MotionBindingProfile, jog: JogHandle, interval: Duration) -> Self {
        Self {
            profile,
            jog,
            interval,
            cancel: CancelToken::new(),
            homing_armed: false,
        }
    }

    /// Token that stops the loop from another thread
    pub fn stop_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn jog(&self) -> &JogHandle {
        &self.jog
    }

    /// Run until stop, cancellation or input close
    ///
    /// The token is acknowledged once the poller has been joined.
    pub fn run<I>(&mut self, sequencer: &mut MotionSequencer, input: I) -> Result<ManualSummary>
    where
        I: InputSource + 'static,
    {
        // A token raised before the first run still stops it
        if self.cancel.is_acknowledged() {
            self.cancel.reset();
        }
        self.homing_armed = false;
        sequencer.set_plunger(self.jog.get().side);

        let snapshot = Arc::new(Mutex::new(InputSnapshot::default()));
        let pacer = sequencer.pacer();
        let poller = {
            let snapshot = Arc::clone(&snapshot);
            let cancel = self.cancel.clone();
            let pacer = Arc::clone(&pacer);
            thread::Builder::new()
                .name("manual-input".into())
                .spawn(move || poll_input(input, &snapshot, &cancel, pacer.as_ref()))?
        };
        info!(interval_ms = self.interval.as_millis() as u64, "manual control started");

        let result = self.dispatch_loop(sequencer, &snapshot, pacer.as_ref());

        // Release the poller whatever the outcome
        self.cancel.cancel();
        if poller.join().is_err() {
            error!("input poller panicked");
        }
        self.cancel.acknowledge();

        match &result {
            Ok(summary) => info!(
                dispatched = summary.dispatched,
                ignored = summary.ignored,
                rejected = summary.rejected,
                reason = ?summary.stop_reason,
                "manual control stopped"
            ),
            Err(e) => error!(error = %e, "manual control aborted"),
        }
        result
    }

    fn dispatch_loop(
        &mut self,
        sequencer: &mut MotionSequencer,
        snapshot: &Mutex<InputSnapshot>,
        pacer: &dyn Pacer,
    ) -> Result<ManualSummary> {
        let mut summary = ManualSummary::default();
        loop {
            if self.cancel.is_cancelled() {
                summary.stop_reason = StopReason::Cancelled;
                return Ok(summary);
            }

            let (events, closed) = {
                let mut snapshot = snapshot.lock().unwrap_or_else(PoisonError::into_inner);
                (std::mem::take(&mut snapshot.pending), snapshot.closed)
            };

            for event in events {
                if self.cancel.is_cancelled() {
                    summary.stop_reason = StopReason::Cancelled;
                    return Ok(summary);
                }
                let Some(element) = event.element() else {
                    continue;
                };
                let Some(command) = self.profile.lookup(element) else {
                    warn!(element, "input has no binding");
                    summary.ignored += 1;
                    continue;
                };
                if command == ManualCommand::Stop {
                    info!(element, "stop requested from input");
                    self.cancel.cancel();
                    summary.stop_reason = StopReason::StopBinding;
                    return Ok(summary);
                }
                match self.dispatch(command, sequencer) {
                    Ok(true) => summary.dispatched += 1,
                    Ok(false) => summary.ignored += 1,
                    Err(CoordinatorError::Motion(e)) => {
                        warn!(%command, error = %e, "requested move is not valid");
                        summary.rejected += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            if closed {
                summary.stop_reason = StopReason::InputClosed;
                return Ok(summary);
            }
            pacer.pause(self.interval, &self.cancel);
        }
    }

    /// Execute one command; `Ok(false)` when it was ignored
    fn dispatch(&mut self, command: ManualCommand, sequencer: &mut MotionSequencer) -> Result<bool> {
        use ManualCommand::*;

        let jog = self.jog.get();
        let xyz = |sequencer: &mut MotionSequencer, axis, delta| {
            sequencer.jog(axis, delta, jog.xyz_speed_mm_s)
        };
        debug!(%command, "dispatching");

        match command {
            MoveLeft => xyz(sequencer, Axis::X, -jog.xyz_step_mm)?,
            MoveRight => xyz(sequencer, Axis::X, jog.xyz_step_mm)?,
            MoveForward => xyz(sequencer, Axis::Y, jog.xyz_step_mm)?,
            MoveBack => xyz(sequencer, Axis::Y, -jog.xyz_step_mm)?,
            ZUp => xyz(sequencer, Axis::Z, jog.xyz_step_mm)?,
            ZDown => xyz(sequencer, Axis::Z, -jog.xyz_step_mm)?,
            PlungerUp => sequencer.jog(jog.side.axis(), jog.syringe_step_mm, jog.syringe_speed_mm_s)?,
            PlungerDown => {
                sequencer.jog(jog.side.axis(), -jog.syringe_step_mm, jog.syringe_speed_mm_s)?
            }
            DoubleStepSize => {
                let step = self.jog.update(JogSettings::double_step_size);
                info!(step_mm = step, "step size increased");
            }
            HalveStepSize => {
                let step = self.jog.update(JogSettings::halve_step_size);
                info!(step_mm = step, "step size decreased");
            }
            EnableHoming => {
                self.homing_armed = true;
                info!("homing enabled");
            }
            HomeXyz | HomePlunger => {
                if !self.homing_armed {
                    warn!(%command, "homing not enabled; press the enable binding first");
                    return Ok(false);
                }
                self.homing_armed = false;
                if command == HomeXyz {
                    sequencer.home_all()?;
                } else {
                    sequencer.home_plunger()?;
                }
            }
            ToggleSide => {
                let side = self.jog.update(JogSettings::toggle_side);
                sequencer.set_plunger(side);
                info!(?side, "active syringe changed");
            }
            ReportPosition => {
                let position = sequencer.refresh_position()?;
                report(&position);
            }
            Nothing => return Ok(false),
            Stop => {}
        }
        Ok(true)
    }
}

fn report(position: &Position) {
    info!(
        x = position.x,
        y = position.y,
        z = position.z,
        b = position.b,
        c = position.c,
        "current position"
    );
}

/// Drain the device into the snapshot until closed or cancelled
fn poll_input<I: InputSource>(
    mut input: I,
    snapshot: &Mutex<InputSnapshot>,
    cancel: &CancelToken,
    pacer: &dyn Pacer,
) {
    while !cancel.is_cancelled() {
        match input.poll() {
            Ok(Some(InputEvent::Closed)) => {
                info!("input device closed");
                break;
            }
            Ok(Some(event)) => snapshot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pending
                .push(event),
            Ok(None) => {
                if pacer.pause(POLL_IDLE, cancel) {
                    break;
                }
            }
            Err(e) => {
                error!(error = %e, "input device failed");
                break;
            }
        }
    }
    snapshot.lock().unwrap_or_else(PoisonError::into_inner).closed = true;
}
