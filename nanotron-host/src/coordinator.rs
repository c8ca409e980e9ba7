//! Coordinator context
//!
//! Owns the device handles, the labware registry (through the sequencer) and
//! the runtime settings. Everything a front end can ask of the machine goes
//! through here.

use std::sync::Arc;
use std::time::Duration;

use nanotron_core::config::{GridDescriptor, LabwareKind, SyringeParameters};
use nanotron_core::geometry::{guess_fourth_point, CalibrationPointSet, Point3, Position};
use nanotron_core::labware::{CalibratedComponent, ComponentId, LabwareSetup};
use nanotron_core::liquid::VolumetricConverter;
use nanotron_core::traits::InputSource;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cancel::{CancelToken, Pacer, ThreadPacer};
use crate::config::{binding_profile, MachineConfig};
use crate::device::{MotorBus, TempdeckBus, ThermalBus};
use crate::error::{CoordinatorError, Result};
use crate::labware_store;
use crate::manual::{JogHandle, ManualControlLoop, ManualSummary};
use crate::sequencer::MotionSequencer;
use crate::synchronizer::DeviceSynchronizer;

/// Devices attached to one machine
pub struct DeviceSet {
    pub motor: MotorBus,
    pub thermocycler: Option<ThermalBus>,
    pub tempdeck: Option<TempdeckBus>,
    pub pacer: Arc<dyn Pacer>,
}

impl DeviceSet {
    pub fn new(motor: MotorBus) -> Self {
        Self {
            motor,
            thermocycler: None,
            tempdeck: None,
            pacer: Arc::new(ThreadPacer),
        }
    }

    pub fn with_thermocycler(mut self, thermocycler: ThermalBus) -> Self {
        self.thermocycler = Some(thermocycler);
        self
    }

    pub fn with_tempdeck(mut self, tempdeck: TempdeckBus) -> Self {
        self.tempdeck = Some(tempdeck);
        self
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }
}

/// Snapshot of the runtime settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Coordinate telemetry period (s)
    pub coordinate_refresh_rate: f64,
    pub syringe_model: Option<String>,
    /// Manual plunger jog speed (mm/s)
    pub syringe_default_speed: f64,
    pub xyz_axis_step_size: f64,
    pub xyz_axis_step_speed: f64,
    /// Whether the front end captures an image after imaging moves
    pub picture_flag: bool,
    pub folder_for_pictures: String,
}

/// Names of the models a component or syringe can be created from
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoredModels {
    pub chips: Vec<String>,
    pub plates: Vec<String>,
    pub syringes: Vec<String>,
}

/// Result of a setting update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingUpdate {
    Applied,
    /// Unknown setting name; nothing changed
    Ignored,
}

/// Owned coordinator context
pub struct Coordinator {
    synchronizer: DeviceSynchronizer,
    config: MachineConfig,
    manual: ManualControlLoop,
    jog: JogHandle,
    coordinate_refresh: Duration,
    grid_models: Vec<GridDescriptor>,
    picture_flag: bool,
    folder_for_pictures: String,
}

impl Coordinator {
    /// Wire the configured machine around its devices
    pub fn new(config: MachineConfig, devices: DeviceSet) -> Result<Self> {
        let converter = VolumetricConverter::new(config.conversion.unit_conversion)?;
        let mut sequencer = MotionSequencer::new(
            devices.motor,
            converter,
            config.deck.clone().into(),
            config.motion,
        )
        .with_pacer(devices.pacer);
        if let Some(thermocycler) = devices.thermocycler {
            sequencer = sequencer.with_thermocycler(thermocycler);
        }
        if let Some(name) = &config.devices.syringe {
            let syringe = config.syringe(name).cloned().ok_or_else(|| {
                CoordinatorError::configuration(format!("syringe '{name}' is not defined"))
            })?;
            sequencer.registry_mut().set_syringe(syringe);
        }

        let mut synchronizer = DeviceSynchronizer::new(sequencer, config.thermal, config.wash);
        if let Some(tempdeck) = devices.tempdeck {
            synchronizer = synchronizer.with_tempdeck(tempdeck);
        }

        let jog = JogHandle::new(config.manual.jog);
        let manual = ManualControlLoop::new(
            binding_profile(&config)?,
            jog.clone(),
            config.manual.dispatch_interval(),
        );
        let coordinate_refresh = Duration::from_millis(config.manual.coordinate_refresh_ms);

        Ok(Self {
            synchronizer,
            config,
            manual,
            jog,
            coordinate_refresh,
            grid_models: Vec::new(),
            picture_flag: false,
            folder_for_pictures: String::from("pictures"),
        })
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn synchronizer(&self) -> &DeviceSynchronizer {
        &self.synchronizer
    }

    pub fn synchronizer_mut(&mut self) -> &mut DeviceSynchronizer {
        &mut self.synchronizer
    }

    pub fn sequencer(&self) -> &MotionSequencer {
        self.synchronizer.sequencer()
    }

    pub fn sequencer_mut(&mut self) -> &mut MotionSequencer {
        self.synchronizer.sequencer_mut()
    }

    pub fn jog(&self) -> &JogHandle {
        &self.jog
    }

    /// Token that stops operations in progress on the sequencer
    ///
    /// The interrupted operation acknowledges the request. Every later
    /// command fails with `Cancelled` until [`Coordinator::resume`].
    pub fn cancel_token(&self) -> CancelToken {
        self.sequencer().cancel_token().clone()
    }

    /// Accept commands again after a stop
    pub fn resume(&self) {
        self.sequencer().resume();
    }

    /// Disconnect everything, then connect cycler, motor and tempdeck
    ///
    /// Any failure leaves all devices disconnected.
    pub fn connect_all(&mut self) -> Result<()> {
        info!("connecting devices");
        if let Err(e) = self.disconnect_all() {
            debug!(error = %e, "disconnect before connect");
        }

        let result = self.connect_in_order();
        self.sequencer_mut().lid_link_changed();
        if let Err(e) = result {
            error!(error = %e, "connection failed, releasing all devices");
            if let Err(e) = self.disconnect_all() {
                warn!(error = %e, "disconnect after failed connect");
            }
            return Err(e);
        }

        let position = self.sequencer().refresh_position()?;
        info!(x = position.x, y = position.y, z = position.z, "devices connected");
        Ok(())
    }

    fn connect_in_order(&self) -> Result<()> {
        if let Some(cycler) = self.sequencer().thermocycler() {
            cycler.call(|tc| tc.connect())?;
        }
        self.sequencer().motor().call(|motor| motor.connect())?;
        if let Some(tempdeck) = self.synchronizer.tempdeck() {
            tempdeck.call(|td| td.connect())?;
        }
        Ok(())
    }

    /// Disconnect every device, reporting the first failure
    pub fn disconnect_all(&mut self) -> Result<()> {
        let mut results = Vec::with_capacity(3);
        if let Some(cycler) = self.sequencer().thermocycler() {
            results.push(cycler.call(|tc| tc.disconnect()));
        }
        results.push(self.sequencer().motor().call(|motor| motor.disconnect()));
        if let Some(tempdeck) = self.synchronizer.tempdeck() {
            results.push(tempdeck.call(|td| td.disconnect()));
        }
        self.sequencer_mut().lid_link_changed();
        info!("devices disconnected");
        results.into_iter().collect()
    }

    /// Park at the end slot and release the devices
    pub fn end_of_protocol(&mut self) -> Result<()> {
        let park = self.sequencer().deck().end_park.clone();
        info!(slot = park.as_str(), "end of protocol");
        self.sequencer_mut().go_to_deck_slot(&park)?;
        self.disconnect_all()
    }

    /// Last published position
    pub fn current_coordinates(&self) -> Position {
        self.sequencer().current_coordinates()
    }

    pub fn coordinate_refresh(&self) -> Duration {
        self.coordinate_refresh
    }

    pub fn settings(&self) -> Settings {
        let jog = self.jog.get();
        Settings {
            coordinate_refresh_rate: self.coordinate_refresh.as_secs_f64(),
            syringe_model: self
                .sequencer()
                .registry()
                .syringe()
                .ok()
                .map(|s| s.name.to_string()),
            syringe_default_speed: jog.syringe_speed_mm_s,
            xyz_axis_step_size: jog.xyz_step_mm,
            xyz_axis_step_speed: jog.xyz_speed_mm_s,
            picture_flag: self.picture_flag,
            folder_for_pictures: self.folder_for_pictures.clone(),
        }
    }

    /// Update one runtime setting by name
    ///
    /// Unknown names are logged and ignored.
    pub fn update_setting(&mut self, name: &str, value: &str) -> Result<SettingUpdate> {
        match name {
            "syringe_model" => self.set_syringe_model(value)?,
            "coordinate_refresh_rate" => {
                let seconds = positive("coordinate_refresh_rate", value)?;
                self.coordinate_refresh = Duration::from_secs_f64(seconds);
            }
            "syringe_default_speed" => {
                let speed = positive("syringe_default_speed", value)?;
                self.jog.update(|jog| jog.syringe_speed_mm_s = speed);
            }
            "xyz_axis_step_size" => {
                let step = positive("xyz_axis_step_size", value)?;
                self.jog.update(|jog| jog.set_step_size(step));
            }
            "xyz_axis_step_speed" => {
                let speed = positive("xyz_axis_step_speed", value)?;
                self.jog.update(|jog| jog.xyz_speed_mm_s = speed);
            }
            "picture_flag" => {
                self.picture_flag = value.trim().parse().map_err(|_| {
                    CoordinatorError::configuration(format!(
                        "setting picture_flag needs true or false, got '{value}'"
                    ))
                })?;
            }
            "folder_for_pictures" => {
                let folder = value.trim();
                if folder.is_empty() {
                    return Err(CoordinatorError::configuration(
                        "setting folder_for_pictures needs a folder name",
                    ));
                }
                self.folder_for_pictures = folder.to_string();
            }
            _ => {
                warn!(setting = name, value, "unknown setting ignored");
                return Ok(SettingUpdate::Ignored);
            }
        }
        info!(setting = name, value, "setting updated");
        Ok(SettingUpdate::Applied)
    }

    /// Select a syringe model from the configured table
    pub fn set_syringe_model(&mut self, name: &str) -> Result<()> {
        let syringe = self.config.syringe(name).cloned().ok_or_else(|| {
            CoordinatorError::configuration(format!("syringe '{name}' is not defined"))
        })?;
        info!(syringe = name, "syringe model selected");
        self.sequencer_mut().registry_mut().set_syringe(syringe);
        Ok(())
    }

    /// Add a syringe model to the selectable table
    pub fn create_syringe_model(&mut self, syringe: SyringeParameters) -> Result<()> {
        if !syringe.is_valid() {
            return Err(CoordinatorError::configuration(format!(
                "syringe '{}' needs a positive diameter and lower < sweet spot <= upper",
                syringe.name
            )));
        }
        if self.config.syringe(&syringe.name).is_some() {
            return Err(CoordinatorError::configuration(format!(
                "syringe '{}' already exists",
                syringe.name
            )));
        }
        info!(
            syringe = syringe.name.as_str(),
            diameter_mm = syringe.inner_diameter_mm,
            "syringe model created"
        );
        self.config.syringes.push(syringe);
        Ok(())
    }

    /// Add a chip or plate model that components can be calibrated from
    pub fn create_grid_model(&mut self, descriptor: GridDescriptor) -> Result<()> {
        descriptor.validate()?;
        if self.grid_model(descriptor.kind, &descriptor.model).is_some() {
            return Err(CoordinatorError::configuration(format!(
                "model '{}' already exists",
                descriptor.model
            )));
        }
        info!(
            model = descriptor.model.as_str(),
            kind = %descriptor.kind.tag(),
            rows = descriptor.rows,
            cols = descriptor.cols,
            "labware model created"
        );
        self.grid_models.push(descriptor);
        Ok(())
    }

    pub fn grid_model(&self, kind: LabwareKind, name: &str) -> Option<&GridDescriptor> {
        self.grid_models
            .iter()
            .find(|model| model.kind == kind && model.model.as_str() == name)
    }

    pub fn stored_models(&self) -> StoredModels {
        let names = |kind: LabwareKind| -> Vec<String> {
            self.grid_models
                .iter()
                .filter(|model| model.kind == kind)
                .map(|model| model.model.to_string())
                .collect()
        };
        StoredModels {
            chips: names(LabwareKind::Chip),
            plates: names(LabwareKind::Plate),
            syringes: self.config.syringes.iter().map(|s| s.name.to_string()).collect(),
        }
    }

    /// Calibrate a component from three jogged corner points
    pub fn calibrate_component(
        &mut self,
        descriptor: &GridDescriptor,
        points: CalibrationPointSet,
    ) -> Result<ComponentId> {
        let id = self
            .sequencer_mut()
            .registry_mut()
            .calibrate(descriptor, points)?;
        info!(component = %id, model = descriptor.model.as_str(), "component calibrated");
        Ok(id)
    }

    pub fn remove_component(&mut self, id: ComponentId) -> Result<CalibratedComponent> {
        let removed = self.sequencer_mut().registry_mut().remove(id)?;
        info!(component = %id, "component removed");
        Ok(removed)
    }

    /// Fourth corner completing the parallelogram of three calibration points
    pub fn guess_fourth_point(&self, p1: Point3, p2: Point3, p3: Point3) -> Point3 {
        guess_fourth_point(p1, p2, p3)
    }

    /// Check a coded well description such as `p 1E3`
    pub fn verify_container_existence(&self, description: &str) -> bool {
        self.sequencer().registry().well_exists(description)
    }

    pub fn labware_setup(&self) -> LabwareSetup {
        self.sequencer().registry().to_setup()
    }

    /// Replace the registry with a saved setup
    pub fn load_labware(&mut self, setup: LabwareSetup) -> Result<()> {
        let Self {
            synchronizer,
            config,
            ..
        } = self;
        labware_store::apply_setup(synchronizer.sequencer_mut().registry_mut(), setup, config)
    }

    /// Token that ends a manual session from another thread
    pub fn manual_stop_handle(&self) -> CancelToken {
        self.manual.stop_handle()
    }

    /// Hand the gantry to the input device until stopped
    pub fn manual_control<I>(&mut self, input: I) -> Result<ManualSummary>
    where
        I: InputSource + 'static,
    {
        self.manual
            .run(self.synchronizer.sequencer_mut(), input)
    }
}

fn positive(name: &'static str, value: &str) -> Result<f64> {
    let parsed: f64 = value.trim().parse().map_err(|_| {
        CoordinatorError::configuration(format!("setting {name} needs a number, got '{value}'"))
    })?;
    if !(parsed.is_finite() && parsed > 0.0) {
        return Err(CoordinatorError::InvalidQuantity {
            what: name,
            value: parsed,
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use nanotron_core::config::label;
    use nanotron_core::geometry::CalibrationError;
    use nanotron_drivers::SimGantry;

    use crate::cancel::InstantPacer;
    use crate::config::parse_config;

    fn coordinator() -> Coordinator {
        let config = parse_config(
            r#"
[conversion]
unit_conversion = 4.0

[deck]
lid_gated = []

[[syringe]]
name = "gastight"
inner_diameter_mm = 1.75
upper_limit_mm = 0.0
lower_limit_mm = -50.0
sweet_spot_mm = -40.0
"#,
        )
        .unwrap();
        let gantry = Arc::new(Mutex::new(SimGantry::default()));
        let devices = DeviceSet::new(MotorBus::from_shared("motor", gantry))
            .with_pacer(Arc::new(InstantPacer::new()));
        Coordinator::new(config, devices).unwrap()
    }

    #[test]
    fn test_settings_snapshot_defaults() {
        let coordinator = coordinator();
        let settings = coordinator.settings();
        assert_eq!(settings.coordinate_refresh_rate, 0.5);
        assert_eq!(settings.syringe_model, None);
        assert_eq!(settings.xyz_axis_step_size, 1.0);
    }

    #[test]
    fn test_update_known_settings() {
        let mut coordinator = coordinator();
        assert_eq!(
            coordinator.update_setting("xyz_axis_step_size", "4").unwrap(),
            SettingUpdate::Applied
        );
        coordinator
            .update_setting("syringe_model", "gastight")
            .unwrap();
        coordinator
            .update_setting("coordinate_refresh_rate", "2.5")
            .unwrap();

        let settings = coordinator.settings();
        assert_eq!(settings.xyz_axis_step_size, 4.0);
        assert_eq!(settings.syringe_model.as_deref(), Some("gastight"));
        assert_eq!(coordinator.coordinate_refresh(), Duration::from_millis(2500));
    }

    #[test]
    fn test_unknown_setting_is_noop() {
        let mut coordinator = coordinator();
        let before = coordinator.settings();
        assert_eq!(
            coordinator.update_setting("xyz_axis_gearbox", "1,2,3").unwrap(),
            SettingUpdate::Ignored
        );
        assert_eq!(coordinator.settings(), before);
    }

    #[test]
    fn test_bad_setting_values_rejected() {
        let mut coordinator = coordinator();
        assert!(matches!(
            coordinator.update_setting("xyz_axis_step_speed", "fast"),
            Err(CoordinatorError::Configuration(_))
        ));
        assert!(matches!(
            coordinator.update_setting("syringe_default_speed", "-1"),
            Err(CoordinatorError::InvalidQuantity {
                what: "syringe_default_speed",
                ..
            })
        ));
        assert!(matches!(
            coordinator.update_setting("syringe_model", "unknown"),
            Err(CoordinatorError::Configuration(_))
        ));
    }

    #[test]
    fn test_picture_settings() {
        let mut coordinator = coordinator();
        assert!(!coordinator.settings().picture_flag);
        coordinator.update_setting("picture_flag", "true").unwrap();
        coordinator
            .update_setting("folder_for_pictures", "run-42")
            .unwrap();

        let settings = coordinator.settings();
        assert!(settings.picture_flag);
        assert_eq!(settings.folder_for_pictures, "run-42");
        assert!(matches!(
            coordinator.update_setting("picture_flag", "maybe"),
            Err(CoordinatorError::Configuration(_))
        ));
        assert!(matches!(
            coordinator.update_setting("folder_for_pictures", "  "),
            Err(CoordinatorError::Configuration(_))
        ));
    }

    #[test]
    fn test_created_syringe_can_be_selected() {
        let mut coordinator = coordinator();
        let syringe = SyringeParameters {
            name: label("glass 10uL").unwrap(),
            volume_ul: Some(10.0),
            inner_diameter_mm: 0.46,
            upper_limit_mm: 0.0,
            lower_limit_mm: -60.0,
            sweet_spot_mm: -55.0,
        };
        coordinator.create_syringe_model(syringe.clone()).unwrap();
        coordinator.set_syringe_model("glass 10uL").unwrap();
        assert_eq!(
            coordinator.settings().syringe_model.as_deref(),
            Some("glass 10uL")
        );

        assert!(matches!(
            coordinator.create_syringe_model(syringe.clone()),
            Err(CoordinatorError::Configuration(_))
        ));
        let inverted = SyringeParameters {
            name: label("inverted").unwrap(),
            sweet_spot_mm: 5.0,
            ..syringe
        };
        assert!(matches!(
            coordinator.create_syringe_model(inverted),
            Err(CoordinatorError::Configuration(_))
        ));
        assert_eq!(
            coordinator.stored_models().syringes,
            vec!["gastight".to_string(), "glass 10uL".to_string()]
        );
    }

    #[test]
    fn test_created_grid_models_are_listed_by_kind() {
        let mut coordinator = coordinator();
        let chip = GridDescriptor::new(label("chip-4").unwrap(), LabwareKind::Chip, 2, 2);
        let plate = GridDescriptor::new(label("plate96").unwrap(), LabwareKind::Plate, 8, 12);
        coordinator.create_grid_model(chip.clone()).unwrap();
        coordinator.create_grid_model(plate).unwrap();

        assert!(matches!(
            coordinator.create_grid_model(chip.clone()),
            Err(CoordinatorError::Configuration(_))
        ));
        let mut short = GridDescriptor::new(label("short").unwrap(), LabwareKind::Chip, 2, 2);
        short.nicknames.truncate(3);
        assert!(matches!(
            coordinator.create_grid_model(short),
            Err(CoordinatorError::Calibration(CalibrationError::NicknameCount { .. }))
        ));

        let models = coordinator.stored_models();
        assert_eq!(models.chips, vec!["chip-4".to_string()]);
        assert_eq!(models.plates, vec!["plate96".to_string()]);
        assert_eq!(
            coordinator.grid_model(LabwareKind::Chip, "chip-4"),
            Some(&chip)
        );
        assert_eq!(coordinator.grid_model(LabwareKind::Plate, "chip-4"), None);
    }

    #[test]
    fn test_guess_fourth_point_passthrough() {
        let coordinator = coordinator();
        let p4 = coordinator.guess_fourth_point(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
        );
        assert_eq!(p4, Point3::new(0.0, 10.0, 0.0));
    }
}
