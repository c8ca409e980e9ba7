//! Motion sequencer
//!
//! Owns the motor controller handle, the labware registry and the lid state.
//! Every head move is a three-phase safe move issued under a single motor
//! lock, so no other flow can slip a command between lift, translate and
//! descend.
//!
//! Slots under the thermal cycler lid are only reached after the lid has
//! been confirmed open.

use std::sync::Arc;
use std::time::Duration;

use nanotron_core::config::DeckMap;
use nanotron_core::geometry::{Axis, AxisSet, AxisTarget, CalibrationError, Plunger, Point3, Position};
use nanotron_core::labware::{ComponentId, LabwareError, LabwareRegistry};
use nanotron_core::liquid::VolumetricConverter;
use nanotron_core::motion::{plan_jog, plan_safe_move, MotionConfig, MotionError, SafeMovePlan};
use nanotron_core::protocol::Target;
use nanotron_core::state::{LidEvent, LidState};
use tracing::{debug, error, info, warn};

use crate::cancel::{CancelToken, Pacer, ThreadPacer};
use crate::device::{MotorBus, ThermalBus};
use crate::error::{CoordinatorError, Result};
use crate::telemetry::PositionCell;

/// Height kept above a target while the camera frames it (mm)
pub const IMAGING_LIFT_MM: f64 = 3.0;

/// Safety-ordered motion, lid gating and liquid handling
pub struct MotionSequencer {
    motor: MotorBus,
    thermocycler: Option<ThermalBus>,
    registry: LabwareRegistry,
    converter: VolumetricConverter,
    deck: DeckMap,
    config: MotionConfig,
    lid: LidState,
    /// Plunger used by liquid handling
    plunger: Plunger,
    telemetry: PositionCell,
    pacer: Arc<dyn Pacer>,
    cancel: CancelToken,
}

impl MotionSequencer {
    pub fn new(
        motor: MotorBus,
        converter: VolumetricConverter,
        deck: DeckMap,
        config: MotionConfig,
    ) -> Self {
        Self {
            motor,
            thermocycler: None,
            registry: LabwareRegistry::new(),
            converter,
            deck,
            config,
            lid: LidState::Unknown,
            plunger: Plunger::Left,
            telemetry: PositionCell::default(),
            pacer: Arc::new(ThreadPacer),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_thermocycler(mut self, thermocycler: ThermalBus) -> Self {
        self.thermocycler = Some(thermocycler);
        self
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn motor(&self) -> &MotorBus {
        &self.motor
    }

    pub fn thermocycler(&self) -> Option<&ThermalBus> {
        self.thermocycler.as_ref()
    }

    pub fn registry(&self) -> &LabwareRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut LabwareRegistry {
        &mut self.registry
    }

    pub fn converter(&self) -> &VolumetricConverter {
        &self.converter
    }

    pub fn deck(&self) -> &DeckMap {
        &self.deck
    }

    pub fn motion_config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn lid_state(&self) -> LidState {
        self.lid
    }

    pub fn plunger(&self) -> Plunger {
        self.plunger
    }

    pub fn set_plunger(&mut self, plunger: Plunger) {
        self.plunger = plunger;
    }

    pub fn telemetry(&self) -> PositionCell {
        self.telemetry.clone()
    }

    pub fn pacer(&self) -> Arc<dyn Pacer> {
        Arc::clone(&self.pacer)
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Last published position
    pub fn current_coordinates(&self) -> Position {
        self.telemetry.snapshot()
    }

    /// Read the controller position and publish it
    pub fn refresh_position(&self) -> Result<Position> {
        let position = self.motor.with(|motor| Ok(motor.position()))?;
        self.telemetry.publish(position);
        Ok(position)
    }

    /// Forget the lid position after the cycler link was reset
    pub(crate) fn lid_link_changed(&mut self) {
        self.lid = self.lid.transition(LidEvent::LinkChanged);
    }

    fn ensure_running(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(self.stopped())
        } else {
            Ok(())
        }
    }

    /// Acknowledge a stop request once the current flow has stopped issuing
    /// commands
    pub(crate) fn stopped(&self) -> CoordinatorError {
        if !self.cancel.is_acknowledged() {
            info!("stop request acknowledged");
        }
        self.cancel.acknowledge();
        CoordinatorError::Cancelled
    }

    /// Clear a handled stop request so commands are accepted again
    pub fn resume(&self) {
        if self.cancel.is_cancelled() {
            info!("resuming after stop");
        }
        self.cancel.reset();
    }

    fn publish_position(&self) {
        if let Err(e) = self.refresh_position() {
            warn!(error = %e, "could not refresh position");
        }
    }

    /// Lift, translate, then descend to `target`
    pub fn go_to_position(&mut self, target: Point3) -> Result<SafeMovePlan> {
        self.ensure_running()?;
        let config = self.config;
        let device = self.motor.name();

        let result = self.motor.with(|motor| {
            let plan = plan_safe_move(&motor.position(), target, &config)?;
            for directive in plan.directives {
                motor
                    .move_to(&directive.target(), directive.speed(&config.speeds))
                    .map_err(|e| CoordinatorError::device(device, e))?;
            }
            Ok(plan)
        });
        self.publish_position();

        let plan = result?;
        info!(%target, lift_z = plan.lift_z(), "moved to position");
        Ok(plan)
    }

    /// Frame `target` for the camera, slightly above it
    ///
    /// With a thermal cycler attached the lid opens first so the head
    /// cannot strike it.
    pub fn go_to_imaging_position(&mut self, target: Point3) -> Result<SafeMovePlan> {
        if self.thermocycler.is_some() {
            self.open_lid()?;
        }
        let framed = target + Point3::new(0.0, 0.0, IMAGING_LIFT_MM);
        debug!(%target, z = framed.z, "moving to imaging position");
        self.go_to_position(framed)
    }

    fn slot_center(&self, slot: &str) -> Result<Point3> {
        let center = self
            .deck
            .slot(slot)
            .ok_or_else(|| MotionError::UnknownSlot(slot.into()))?;
        Ok(Point3::new(center.x, center.y, self.config.slot_height_mm))
    }

    /// Move above a deck slot, opening the lid first for gated slots
    pub fn go_to_deck_slot(&mut self, slot: &str) -> Result<SafeMovePlan> {
        let center = self.slot_center(slot)?;
        info!(slot, "moving to deck slot");

        if self.deck.is_lid_gated(slot) {
            self.open_lid()?;
            if !self.lid.permits_gated_access() {
                return Err(MotionError::LidNotOpen {
                    slot: slot.into(),
                    lid: self.lid,
                }
                .into());
            }
        }
        self.go_to_position(center)
    }

    /// Move to a calibrated well at nominal depth
    pub fn go_to_named_location(
        &mut self,
        component: ComponentId,
        nickname: &str,
    ) -> Result<SafeMovePlan> {
        let location = self.registry.location(component, nickname)?;
        self.go_to_position(location)
    }

    /// Resolve a protocol target to deck coordinates
    ///
    /// A rejected depth override falls back to the nominal depth.
    pub fn resolve_target(&self, target: &Target) -> Result<Point3> {
        match target {
            Target::Point { location } => Ok(*location),
            Target::Coded { well } => Ok(self.registry.resolve_description(well)?),
            Target::Well {
                component,
                nickname,
                depth,
            } => match self.registry.location_with_depth(*component, nickname, *depth) {
                Err(LabwareError::Calibration(CalibrationError::DepthOverrideRejected {
                    requested,
                    nominal,
                })) => {
                    warn!(
                        %component,
                        nickname = nickname.as_str(),
                        requested,
                        nominal,
                        "depth override rejected, using nominal depth"
                    );
                    Ok(self.registry.location(*component, nickname)?)
                }
                other => Ok(other?),
            },
        }
    }

    pub fn go_to_target(&mut self, target: &Target) -> Result<SafeMovePlan> {
        let location = self.resolve_target(target)?;
        self.go_to_position(location)
    }

    /// Lift by the air-gap clearance, then draw a small volume of air
    pub fn air_gap(&mut self, volume_nl: Option<f64>) -> Result<()> {
        let position = self.refresh_position()?;
        let z = (position.z + self.config.air_gap_lift_mm).min(self.config.limits.z.max);
        self.go_to_position(Point3::new(position.x, position.y, z))?;
        let volume = volume_nl.unwrap_or(self.config.air_gap_nl);
        debug!(volume_nl = volume, "air gap");
        self.aspirate(volume, self.config.default_rate_nl_s)
    }

    fn thermocycler_bus(&self) -> Result<ThermalBus> {
        self.thermocycler
            .clone()
            .ok_or_else(|| CoordinatorError::configuration("no thermal cycler attached"))
    }

    /// Park the head where lid travel cannot hit it
    fn park_for_lid(&mut self) -> Result<()> {
        let park = self.deck.lid_park.clone();
        let center = self.slot_center(&park)?;
        debug!(slot = park.as_str(), "parking for lid move");
        self.go_to_position(center).map(|_| ())
    }

    fn record_lid(&mut self, result: Result<()>, confirmed: LidEvent) -> Result<LidState> {
        match result {
            Ok(()) => {
                self.lid = self.lid.transition(confirmed);
                info!(lid = %self.lid, "lid moved");
                Ok(self.lid)
            }
            Err(e) => {
                self.lid = self.lid.transition(LidEvent::CommandFailed);
                error!(error = %e, "lid command failed");
                Err(e)
            }
        }
    }

    /// Open the thermal cycler lid
    ///
    /// The head parks first unless the lid is already open.
    pub fn open_lid(&mut self) -> Result<LidState> {
        let cycler = self.thermocycler_bus()?;
        if self.lid.needs_open() {
            self.park_for_lid()?;
        }
        let result = cycler.call(|tc| tc.open_lid());
        self.record_lid(result, LidEvent::OpenConfirmed)
    }

    /// Park, then close the thermal cycler lid
    pub fn close_lid(&mut self) -> Result<LidState> {
        let cycler = self.thermocycler_bus()?;
        self.park_for_lid()?;
        let result = cycler.call(|tc| tc.close_lid());
        self.record_lid(result, LidEvent::CloseConfirmed)
    }

    /// Park, then close an open lid or open any other
    pub fn toggle_lid(&mut self) -> Result<LidState> {
        let cycler = self.thermocycler_bus()?;
        self.park_for_lid()?;
        if self.lid == LidState::Open {
            let result = cycler.call(|tc| tc.close_lid());
            self.record_lid(result, LidEvent::CloseConfirmed)
        } else {
            let result = cycler.call(|tc| tc.open_lid());
            self.record_lid(result, LidEvent::OpenConfirmed)
        }
    }

    fn displace(&mut self, volume_nl: f64, rate_nl_s: f64, draw: bool) -> Result<()> {
        self.ensure_running()?;
        if !(volume_nl.is_finite() && volume_nl >= 0.0) {
            return Err(CoordinatorError::InvalidQuantity {
                what: "volume_nl",
                value: volume_nl,
            });
        }
        if !(rate_nl_s.is_finite() && rate_nl_s > 0.0) {
            return Err(CoordinatorError::InvalidQuantity {
                what: "rate_nl_s",
                value: rate_nl_s,
            });
        }

        let syringe = self.registry.syringe()?.clone();
        let distance = self.converter.volume_to_distance(volume_nl, &syringe)?;
        let speed = self.converter.flowrate_to_speed(rate_nl_s, &syringe)?;
        let plunger = self.plunger;

        let result = self.motor.call(|motor| {
            if draw {
                motor.plunger_up(plunger, distance, speed, &syringe)
            } else {
                motor.plunger_down(plunger, distance, speed, &syringe)
            }
        });
        self.publish_position();
        result
    }

    /// Draw `volume_nl` into the active syringe
    pub fn aspirate(&mut self, volume_nl: f64, rate_nl_s: f64) -> Result<()> {
        info!(volume_nl, rate_nl_s, "aspirating");
        self.displace(volume_nl, rate_nl_s, true)
    }

    /// Expel `volume_nl` from the active syringe
    pub fn dispense(&mut self, volume_nl: f64, rate_nl_s: f64) -> Result<()> {
        info!(volume_nl, rate_nl_s, "dispensing");
        self.displace(volume_nl, rate_nl_s, false)
    }

    fn settle(&self) {
        let settle = Duration::from_millis(self.config.settle_ms);
        self.pacer.pause(settle, &self.cancel);
    }

    /// Move to `location` and aspirate with backlash compensation
    pub fn aspirate_from(&mut self, volume_nl: f64, location: Point3, rate_nl_s: f64) -> Result<()> {
        self.go_to_position(location)?;
        let backlash = self.config.backlash_nl;
        self.displace(backlash, rate_nl_s, true)?;
        self.aspirate(volume_nl, rate_nl_s)?;
        self.displace(backlash, rate_nl_s, false)?;
        self.settle();
        Ok(())
    }

    /// Move to `location` and dispense
    pub fn dispense_to(&mut self, volume_nl: f64, location: Point3, rate_nl_s: f64) -> Result<()> {
        self.go_to_position(location)?;
        self.dispense(volume_nl, rate_nl_s)?;
        self.settle();
        Ok(())
    }

    /// Move the active plunger to an absolute coordinate
    pub fn move_plunger(&mut self, coordinate_mm: f64, speed_mm_s: f64) -> Result<()> {
        self.ensure_running()?;
        let axis = self.plunger.axis();
        let syringe = self.registry.syringe().ok();
        self.config
            .limits
            .for_axis(axis, syringe)
            .check(axis, coordinate_mm)?;

        debug!(%axis, coordinate_mm, speed_mm_s, "moving plunger");
        let result = self
            .motor
            .call(|motor| motor.move_to(&AxisTarget::axis(axis, coordinate_mm), speed_mm_s));
        self.publish_position();
        result
    }

    /// Step one axis, split into approach and final moves when long
    pub fn jog(&mut self, axis: Axis, delta_mm: f64, speed_cap: f64) -> Result<()> {
        self.ensure_running()?;
        let config = self.config;
        let syringe = self.registry.syringe().ok().cloned();
        let device = self.motor.name();

        let result = self.motor.with(|motor| {
            let moves = plan_jog(
                &motor.position(),
                axis,
                delta_mm,
                &config,
                syringe.as_ref(),
                speed_cap,
            )?;
            for step in &moves {
                motor
                    .move_to(&step.target, step.speed_mm_s)
                    .map_err(|e| CoordinatorError::device(device, e))?;
            }
            Ok(())
        });
        self.publish_position();
        result
    }

    /// Home X, Y and Z; plungers keep their position
    pub fn home_all(&mut self) -> Result<()> {
        info!("homing XYZ");
        let result = self.motor.call(|motor| motor.home(AxisSet::XYZ));
        self.publish_position();
        result
    }

    /// Home the active plunger
    pub fn home_plunger(&mut self) -> Result<()> {
        let axis = self.plunger.axis();
        info!(%axis, "homing plunger");
        let result = self.motor.call(|motor| motor.home(AxisSet::single(axis)));
        self.publish_position();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanotron_core::config::{label, DeckSlot, SyringeParameters};
    use nanotron_core::liquid::plunger_area_mm2;
    use nanotron_core::traits::MotorDriver;
    use nanotron_drivers::{MotorCall, SimGantry};
    use std::sync::Mutex;

    use crate::cancel::InstantPacer;

    fn deck() -> DeckMap {
        let slot = |id: &str, x, y| DeckSlot {
            id: label(id).unwrap(),
            x,
            y,
        };
        DeckMap {
            slots: vec![slot("3", 328.88, 42.74), slot("5", 196.38, 133.24)],
            lid_gated: vec![],
            lid_park: label("5").unwrap(),
            end_park: label("3").unwrap(),
        }
    }

    fn syringe() -> SyringeParameters {
        SyringeParameters {
            name: label("test").unwrap(),
            volume_ul: None,
            inner_diameter_mm: 1.75,
            upper_limit_mm: 0.0,
            lower_limit_mm: -50.0,
            sweet_spot_mm: -40.0,
        }
    }

    fn sequencer() -> (MotionSequencer, Arc<Mutex<SimGantry>>) {
        let gantry = Arc::new(Mutex::new(SimGantry::default().with_position(Position {
            x: 100.0,
            y: 100.0,
            z: 100.0,
            b: -30.0,
            c: 0.0,
        })));
        let bus = MotorBus::from_shared("motor", gantry.clone());
        bus.call(|m| m.connect()).unwrap();
        gantry.lock().unwrap().take_calls();

        let mut seq = MotionSequencer::new(
            bus,
            VolumetricConverter::new(4.0).unwrap(),
            deck(),
            MotionConfig::default(),
        )
        .with_pacer(Arc::new(InstantPacer::new()));
        seq.registry_mut().set_syringe(syringe());
        (seq, gantry)
    }

    #[test]
    fn test_slot_move_uses_slot_height() {
        let (mut seq, gantry) = sequencer();
        seq.go_to_deck_slot("3").unwrap();
        let moves = gantry.lock().unwrap().moves();
        assert_eq!(moves.len(), 3);
        assert_eq!(moves[1], AxisTarget::xy(328.88, 42.74));
        assert_eq!(moves[2], AxisTarget::z(150.0));
        assert_eq!(seq.current_coordinates().x, 328.88);
    }

    #[test]
    fn test_unknown_slot() {
        let (mut seq, gantry) = sequencer();
        assert!(matches!(
            seq.go_to_deck_slot("42"),
            Err(CoordinatorError::Motion(MotionError::UnknownSlot(_)))
        ));
        assert!(gantry.lock().unwrap().calls().is_empty());
    }

    #[test]
    fn test_aspirate_converts_volume() {
        let (mut seq, gantry) = sequencer();
        seq.aspirate(1000.0, 50.0).unwrap();
        let expected = 1000.0 * 1e-3 / plunger_area_mm2(1.75).unwrap() * 4.0;
        let b = gantry.lock().unwrap().position().b;
        assert!((b - (-30.0 + expected)).abs() < 1e-9);
        assert!((expected - 1.663).abs() < 1e-2);
    }

    #[test]
    fn test_aspirate_from_compensates_backlash() {
        let (mut seq, gantry) = sequencer();
        seq.aspirate_from(500.0, Point3::new(120.0, 80.0, 60.0), 50.0)
            .unwrap();
        let calls = gantry.lock().unwrap().take_calls();
        let plunger: Vec<f64> = calls
            .iter()
            .filter_map(|call| match call {
                MotorCall::MoveTo { target, .. } => target.b,
                _ => None,
            })
            .collect();
        assert_eq!(plunger.len(), 3);
        // Over-draw, draw, return
        assert!(plunger[0] > -30.0);
        assert!(plunger[1] > plunger[0]);
        assert!(plunger[2] < plunger[1]);
    }

    #[test]
    fn test_liquid_handling_needs_syringe() {
        let (mut seq, _) = sequencer();
        *seq.registry_mut() = LabwareRegistry::new();
        assert!(matches!(
            seq.dispense(100.0, 50.0),
            Err(CoordinatorError::Conversion(_))
        ));
    }

    #[test]
    fn test_air_gap_lifts_then_draws() {
        let (mut seq, gantry) = sequencer();
        seq.air_gap(None).unwrap();
        let moves = gantry.lock().unwrap().moves();
        assert_eq!(moves[2], AxisTarget::z(125.0));
        assert!(moves[3].b.is_some());
    }

    #[test]
    fn test_move_plunger_checked_against_syringe() {
        let (mut seq, gantry) = sequencer();
        assert!(matches!(
            seq.move_plunger(5.0, 1.0),
            Err(CoordinatorError::Motion(MotionError::OutOfBounds { axis: Axis::B, .. }))
        ));
        seq.move_plunger(-45.0, 1.0).unwrap();
        assert_eq!(gantry.lock().unwrap().position().b, -45.0);
    }

    #[test]
    fn test_lid_needs_thermocycler() {
        let (mut seq, _) = sequencer();
        assert!(matches!(
            seq.open_lid(),
            Err(CoordinatorError::Configuration(_))
        ));
    }

    #[test]
    fn test_cancelled_sequencer_refuses_moves() {
        let (mut seq, gantry) = sequencer();
        seq.cancel_token().cancel();
        assert!(matches!(
            seq.go_to_position(Point3::new(120.0, 80.0, 60.0)),
            Err(CoordinatorError::Cancelled)
        ));
        assert!(gantry.lock().unwrap().calls().is_empty());
    }
}
