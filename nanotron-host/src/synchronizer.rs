//! Device synchronizer
//!
//! Thermal set-points with a bounded ramp and a counted hold, and the syringe
//! wash scripts. Thermal waits block the calling flow but stop early when the
//! shared cancel token is raised.

use std::time::Duration;

use nanotron_core::config::{WashPositions, WashVolumes};
use nanotron_core::geometry::Point3;
use nanotron_core::protocol::{
    fill_syringe_with_water, mid_wash, start_wash, MidWashVolumes, PollAction, RampHold,
    RampHoldConfig, RampHoldPhase, WashStep,
};
use nanotron_core::safety::{ThermalDevice, ThermalLimits};
use nanotron_core::traits::TempdeckStatus;
use tracing::{debug, error, info};

use crate::config::{ThermalConfig, WashConfig};
use crate::device::{TempdeckBus, ThermalBus};
use crate::error::{CoordinatorError, Result};
use crate::sequencer::MotionSequencer;

/// Thermal protocols and wash cycles on top of the motion sequencer
pub struct DeviceSynchronizer {
    sequencer: MotionSequencer,
    tempdeck: Option<TempdeckBus>,
    limits: ThermalLimits,
    ramp: RampHoldConfig,
    wash_positions: Option<WashPositions>,
    wash_volumes: WashVolumes,
    wash_rate_nl_s: f64,
}

impl DeviceSynchronizer {
    pub fn new(sequencer: MotionSequencer, thermal: ThermalConfig, wash: WashConfig) -> Self {
        Self {
            sequencer,
            tempdeck: None,
            limits: thermal.limits,
            ramp: thermal.ramp,
            wash_positions: None,
            wash_volumes: wash.volumes,
            wash_rate_nl_s: wash.default_rate_nl_s,
        }
    }

    pub fn with_tempdeck(mut self, tempdeck: TempdeckBus) -> Self {
        self.tempdeck = Some(tempdeck);
        self
    }

    pub fn sequencer(&self) -> &MotionSequencer {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut MotionSequencer {
        &mut self.sequencer
    }

    pub fn tempdeck(&self) -> Option<&TempdeckBus> {
        self.tempdeck.as_ref()
    }

    pub fn wash_positions(&self) -> Option<&WashPositions> {
        self.wash_positions.as_ref()
    }

    pub fn wash_volumes(&self) -> &WashVolumes {
        &self.wash_volumes
    }

    fn thermocycler(&self) -> Result<ThermalBus> {
        self.sequencer
            .thermocycler()
            .cloned()
            .ok_or_else(|| CoordinatorError::configuration("no thermal cycler attached"))
    }

    fn tempdeck_bus(&self) -> Result<TempdeckBus> {
        self.tempdeck
            .clone()
            .ok_or_else(|| CoordinatorError::configuration("no tempdeck attached"))
    }

    /// Sample until in band, then count the hold down in fixed increments
    fn ramp_and_hold(
        &self,
        device: ThermalDevice,
        target_c: f64,
        hold: Duration,
        mut read: impl FnMut() -> Result<f64>,
    ) -> Result<()> {
        let pacer = self.sequencer.pacer();
        let cancel = self.sequencer.cancel_token().clone();
        let mut tracker = RampHold::new(target_c, hold, self.ramp);

        let first = read()?;
        info!(%device, current_c = first, target_c, "waiting for temperature");
        let mut action = tracker.on_reading(first);

        loop {
            match action {
                PollAction::Sample(interval) => {
                    if pacer.pause(interval, &cancel) {
                        return Err(self.sequencer.stopped());
                    }
                    let reading = read()?;
                    debug!(%device, current_c = reading, target_c, "ramping");
                    action = tracker.on_reading(reading);
                    if tracker.phase() != RampHoldPhase::Ramping {
                        info!(%device, current_c = reading, "target temperature reached");
                    }
                }
                PollAction::Hold(interval) => {
                    if pacer.pause(interval, &cancel) {
                        return Err(self.sequencer.stopped());
                    }
                    action = tracker.on_hold_elapsed();
                    debug!(%device, held_s = tracker.held().as_secs(), "holding");
                }
                PollAction::Complete => {
                    info!(%device, held_s = tracker.held().as_secs(), "hold complete");
                    return Ok(());
                }
                PollAction::TimedOut { last_c } => {
                    error!(%device, last_c, target_c, "ramp timed out");
                    return Err(CoordinatorError::RampTimeout {
                        device,
                        target_c,
                        last_c,
                    });
                }
            }
        }
    }

    /// Set the block temperature, wait until in band, then hold
    pub fn set_block_temperature(&mut self, celsius: f64, hold: Duration) -> Result<()> {
        self.limits.check(ThermalDevice::Block, celsius)?;
        let cycler = self.thermocycler()?;
        let device_hold = (!hold.is_zero()).then_some(hold);
        info!(celsius, hold_s = hold.as_secs(), "setting block temperature");
        cycler.call(|tc| tc.set_block_temperature(celsius, device_hold))?;
        self.ramp_and_hold(ThermalDevice::Block, celsius, hold, || {
            cycler.call(|tc| tc.block_temperature())
        })
    }

    pub fn set_lid_temperature(&mut self, celsius: f64) -> Result<()> {
        self.limits.check(ThermalDevice::Lid, celsius)?;
        info!(celsius, "setting lid temperature");
        self.thermocycler()?
            .call(|tc| tc.set_lid_temperature(celsius))
    }

    pub fn deactivate_lid(&mut self) -> Result<()> {
        info!("deactivating lid heater");
        self.thermocycler()?.call(|tc| tc.deactivate_lid())
    }

    pub fn deactivate_block(&mut self) -> Result<()> {
        info!("deactivating block");
        self.thermocycler()?.call(|tc| tc.deactivate_block())
    }

    pub fn deactivate_all(&mut self) -> Result<()> {
        info!("deactivating lid heater and block");
        self.thermocycler()?.call(|tc| tc.deactivate_all())
    }

    pub fn block_temperature(&self) -> Result<f64> {
        self.thermocycler()?.call(|tc| tc.block_temperature())
    }

    /// Set the tempdeck temperature, wait until in band, then hold
    pub fn set_tempdeck_temperature(&mut self, celsius: f64, hold: Duration) -> Result<()> {
        self.limits.check(ThermalDevice::Tempdeck, celsius)?;
        let tempdeck = self.tempdeck_bus()?;
        info!(celsius, hold_s = hold.as_secs(), "setting tempdeck temperature");
        tempdeck.call(|td| td.start_set_temperature(celsius))?;
        self.ramp_and_hold(ThermalDevice::Tempdeck, celsius, hold, || {
            tempdeck.call(|td| td.temperature())
        })
    }

    pub fn deactivate_tempdeck(&mut self) -> Result<()> {
        info!("deactivating tempdeck");
        self.tempdeck_bus()?.call(|td| td.deactivate())
    }

    pub fn tempdeck_temperature(&self) -> Result<f64> {
        self.tempdeck_bus()?.call(|td| td.temperature())
    }

    pub fn tempdeck_status(&self) -> Result<TempdeckStatus> {
        self.tempdeck_bus()?.call(|td| td.status())
    }

    pub fn set_washing_positions(&mut self, clean: Point3, wash: Point3, waste: Point3) {
        info!(%clean, %wash, %waste, "washing positions set");
        self.wash_positions = Some(WashPositions { clean, wash, waste });
    }

    pub fn set_amount_wanted(&mut self, volume_nl: f64) {
        self.wash_volumes.amount_wanted_nl = volume_nl;
    }

    fn positions(&self) -> Result<WashPositions> {
        self.wash_positions
            .ok_or_else(|| CoordinatorError::configuration("washing positions have not been set"))
    }

    fn run_wash(&mut self, name: &str, steps: Vec<WashStep>, rate_nl_s: f64) -> Result<()> {
        let syringe = self.sequencer.registry().syringe()?.clone();
        let speed = self
            .sequencer
            .converter()
            .flowrate_to_speed(rate_nl_s, &syringe)?;
        info!(wash = name, steps = steps.len(), rate_nl_s, "running wash");

        for step in steps {
            debug!(?step, "wash step");
            match step {
                WashStep::MoveTo(location) => {
                    self.sequencer.go_to_position(location)?;
                }
                WashStep::MovePlunger(coordinate) => self.sequencer.move_plunger(coordinate, speed)?,
                WashStep::Aspirate(volume) => self.sequencer.aspirate(volume, rate_nl_s)?,
                WashStep::Dispense(volume) => self.sequencer.dispense(volume, rate_nl_s)?,
                WashStep::AirGap(volume) => self.sequencer.air_gap(Some(volume))?,
            }
        }
        Ok(())
    }

    /// Initial wash: empty at waste, rinse at wash, prime at clean
    pub fn start_wash(&mut self, rate_nl_s: Option<f64>) -> Result<()> {
        let positions = self.positions()?;
        let syringe = self.sequencer.registry().syringe()?;
        let steps = start_wash(
            &positions,
            syringe,
            self.sequencer.motion_config().air_gap_nl,
        );
        self.run_wash("start", steps, rate_nl_s.unwrap_or(self.wash_rate_nl_s))
    }

    /// Wash between two liquids
    pub fn mid_wash(
        &mut self,
        leftover_nl: Option<f64>,
        cushion_1_nl: Option<f64>,
        cushion_2_nl: Option<f64>,
        rate_nl_s: Option<f64>,
    ) -> Result<()> {
        let positions = self.positions()?;
        let defaults = self.wash_volumes;
        let volumes = MidWashVolumes {
            leftover_nl: leftover_nl.unwrap_or(defaults.leftover_nl),
            cushion_1_nl: cushion_1_nl.unwrap_or(defaults.cushion_1_nl),
            cushion_2_nl: cushion_2_nl.unwrap_or(defaults.cushion_2_nl),
            amount_wanted_nl: defaults.amount_wanted_nl,
        };
        let syringe = self.sequencer.registry().syringe()?;
        let steps = mid_wash(
            &positions,
            syringe,
            &volumes,
            self.sequencer.motion_config().air_gap_nl,
        );
        self.run_wash("mid", steps, rate_nl_s.unwrap_or(self.wash_rate_nl_s))
    }

    /// Fill the syringe with clean water before the machine sits idle
    pub fn fill_syringe_with_water(&mut self, rate_nl_s: Option<f64>) -> Result<()> {
        let positions = self.positions()?;
        let syringe = self.sequencer.registry().syringe()?;
        let steps = fill_syringe_with_water(&positions, syringe);
        self.run_wash("fill", steps, rate_nl_s.unwrap_or(self.wash_rate_nl_s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Instant;

    use nanotron_core::config::{label, SyringeParameters};
    use nanotron_core::liquid::VolumetricConverter;
    use nanotron_core::motion::MotionConfig;
    use nanotron_drivers::{SimGantry, SimTempdeck, SimThermocycler, ThermalCall, ThermalModel};

    use crate::cancel::{InstantPacer, ThreadPacer};
    use crate::config::DeckConfig;
    use crate::device::MotorBus;

    struct Rig {
        sync: DeviceSynchronizer,
        cycler: Arc<Mutex<SimThermocycler>>,
        pacer: InstantPacer,
    }

    fn rig(config: RampHoldConfig) -> Rig {
        let motor = MotorBus::motor(SimGantry::default());
        motor.call(|m| m.connect()).unwrap();
        let cycler = Arc::new(Mutex::new(SimThermocycler::new(ThermalModel::new(10.0))));
        let cycler_bus = ThermalBus::from_shared("thermocycler", cycler.clone());
        cycler_bus.call(|tc| tc.connect()).unwrap();
        let tempdeck = TempdeckBus::tempdeck(SimTempdeck::new(ThermalModel::new(10.0)));
        tempdeck.call(|td| td.connect()).unwrap();

        let pacer = InstantPacer::new();
        let mut sequencer = MotionSequencer::new(
            motor,
            VolumetricConverter::new(4.0).unwrap(),
            DeckConfig::default().into(),
            MotionConfig::default(),
        )
        .with_thermocycler(cycler_bus)
        .with_pacer(Arc::new(pacer.clone()));
        sequencer.registry_mut().set_syringe(SyringeParameters {
            name: label("test").unwrap(),
            volume_ul: None,
            inner_diameter_mm: 1.75,
            upper_limit_mm: 0.0,
            lower_limit_mm: -50.0,
            sweet_spot_mm: -40.0,
        });

        let thermal = ThermalConfig {
            ramp: config,
            limits: ThermalLimits::default(),
        };
        let sync = DeviceSynchronizer::new(sequencer, thermal, WashConfig::default())
            .with_tempdeck(tempdeck);
        Rig {
            sync,
            cycler,
            pacer,
        }
    }

    #[test]
    fn test_block_ramp_and_hold() {
        let mut rig = rig(RampHoldConfig::default());
        rig.sync
            .set_block_temperature(62.0, Duration::from_secs(60))
            .unwrap();
        // Readings 32, 42, 52, 62: three ramp waits, then two holds
        let requested = rig.pacer.requested();
        assert_eq!(
            requested,
            vec![
                Duration::from_secs(5),
                Duration::from_secs(5),
                Duration::from_secs(5),
                Duration::from_secs(30),
                Duration::from_secs(30),
            ]
        );
        let calls = rig.cycler.lock().unwrap().take_calls();
        assert!(calls.contains(&ThermalCall::SetBlock {
            celsius: 62.0,
            hold: Some(Duration::from_secs(60)),
        }));
    }

    #[test]
    fn test_stalled_block_times_out() {
        let config = RampHoldConfig {
            ramp_timeout_s: 20,
            ..RampHoldConfig::default()
        };
        let mut rig = rig(config);
        rig.cycler.lock().unwrap().block_model_mut().stall();
        let err = rig
            .sync
            .set_block_temperature(95.0, Duration::from_secs(60))
            .unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::RampTimeout {
                device: ThermalDevice::Block,
                ..
            }
        ));
        assert_eq!(rig.pacer.total(), Duration::from_secs(20));
    }

    #[test]
    fn test_out_of_range_block_target_not_sent() {
        let mut rig = rig(RampHoldConfig::default());
        assert!(matches!(
            rig.sync.set_block_temperature(120.0, Duration::ZERO),
            Err(CoordinatorError::Safety(_))
        ));
        assert_eq!(rig.cycler.lock().unwrap().calls(), &[ThermalCall::Connect]);
    }

    #[test]
    fn test_tempdeck_ramp() {
        let mut rig = rig(RampHoldConfig::default());
        rig.sync
            .set_tempdeck_temperature(4.0, Duration::ZERO)
            .unwrap();
        assert_eq!(rig.sync.tempdeck_status().unwrap(), TempdeckStatus::Holding);
    }

    #[test]
    fn test_cancel_before_hold_is_acknowledged() {
        let mut rig = rig(RampHoldConfig::default());
        let token = rig.sync.sequencer().cancel_token().clone();
        token.cancel();
        assert!(matches!(
            rig.sync.set_block_temperature(62.0, Duration::from_secs(600)),
            Err(CoordinatorError::Cancelled)
        ));
        assert!(token.wait_acknowledged(Duration::from_millis(200)));

        rig.sync.sequencer().resume();
        rig.sync
            .sequencer_mut()
            .go_to_position(Point3::new(120.0, 80.0, 60.0))
            .unwrap();
    }

    #[test]
    fn test_cancel_from_other_thread_mid_hold() {
        let motor = MotorBus::motor(SimGantry::default());
        motor.call(|m| m.connect()).unwrap();
        // Reaches any target on the first reading, so the wait goes straight to the hold
        let cycler = Arc::new(Mutex::new(SimThermocycler::new(ThermalModel::new(100.0))));
        let cycler_bus = ThermalBus::from_shared("thermocycler", cycler.clone());
        cycler_bus.call(|tc| tc.connect()).unwrap();
        let sequencer = MotionSequencer::new(
            motor,
            VolumetricConverter::new(4.0).unwrap(),
            DeckConfig::default().into(),
            MotionConfig::default(),
        )
        .with_thermocycler(cycler_bus)
        .with_pacer(Arc::new(ThreadPacer));
        let thermal = ThermalConfig {
            ramp: RampHoldConfig::default(),
            limits: ThermalLimits::default(),
        };
        let mut sync = DeviceSynchronizer::new(sequencer, thermal, WashConfig::default());
        cycler.lock().unwrap().take_calls();

        let token = sync.sequencer().cancel_token().clone();
        let requester = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            token.cancel();
            token.wait_acknowledged(Duration::from_secs(5))
        });

        let started = Instant::now();
        let result = sync.set_block_temperature(37.0, Duration::from_secs(600));
        assert!(matches!(result, Err(CoordinatorError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(requester.join().unwrap());

        // Nothing reached the cycler after the set-point
        assert_eq!(
            cycler.lock().unwrap().take_calls(),
            vec![ThermalCall::SetBlock {
                celsius: 37.0,
                hold: Some(Duration::from_secs(600)),
            }]
        );

        sync.sequencer().resume();
        sync.sequencer_mut()
            .go_to_position(Point3::new(120.0, 80.0, 60.0))
            .unwrap();
    }

    #[test]
    fn test_wash_needs_positions() {
        let mut rig = rig(RampHoldConfig::default());
        assert!(matches!(
            rig.sync.start_wash(None),
            Err(CoordinatorError::Configuration(_))
        ));
        assert!(matches!(
            rig.sync.fill_syringe_with_water(None),
            Err(CoordinatorError::Configuration(_))
        ));
    }
}
