//! Simulated machine shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use nanotron_core::geometry::{AxisTarget, Position};
use nanotron_drivers::{
    MotorCall, SimGantry, SimTempdeck, SimThermocycler, TempdeckCall, ThermalCall, ThermalModel,
};
use nanotron_host::cancel::InstantPacer;
use nanotron_host::config::{parse_config, MachineConfig};
use nanotron_host::device::{MotorBus, TempdeckBus, ThermalBus};
use nanotron_host::{Coordinator, DeviceSet};

/// Stock deck with one small syringe selected
pub const MACHINE: &str = r#"
[conversion]
unit_conversion = 4.0

[motion]
settle_ms = 500

[[syringe]]
name = "test"
inner_diameter_mm = 1.75
upper_limit_mm = 0.0
lower_limit_mm = -50.0
sweet_spot_mm = -40.0

[devices]
thermocycler_port = "sim"
tempdeck_port = "sim"
syringe = "test"
"#;

pub struct Rig {
    pub coordinator: Coordinator,
    pub gantry: Arc<Mutex<SimGantry>>,
    pub cycler: Arc<Mutex<SimThermocycler>>,
    pub tempdeck: Arc<Mutex<SimTempdeck>>,
    pub pacer: InstantPacer,
}

impl Rig {
    /// Connected rig on the stock machine, head resting mid-deck
    pub fn new() -> Self {
        Self::with_config(MACHINE)
    }

    pub fn with_config(text: &str) -> Self {
        let mut rig = Self::disconnected(parse_config(text).unwrap());
        rig.coordinator.connect_all().unwrap();
        rig.clear_logs();
        rig
    }

    pub fn disconnected(config: MachineConfig) -> Self {
        let gantry = Arc::new(Mutex::new(SimGantry::default().with_position(Position {
            x: 200.0,
            y: 150.0,
            z: 100.0,
            b: -30.0,
            c: 0.0,
        })));
        let cycler = Arc::new(Mutex::new(SimThermocycler::new(ThermalModel::new(10.0))));
        let tempdeck = Arc::new(Mutex::new(SimTempdeck::new(ThermalModel::new(5.0))));
        let pacer = InstantPacer::new();

        let devices = DeviceSet::new(MotorBus::from_shared("motor", gantry.clone()))
            .with_thermocycler(ThermalBus::from_shared("thermocycler", cycler.clone()))
            .with_tempdeck(TempdeckBus::from_shared("tempdeck", tempdeck.clone()))
            .with_pacer(Arc::new(pacer.clone()));
        let coordinator = Coordinator::new(config, devices).unwrap();

        Self {
            coordinator,
            gantry,
            cycler,
            tempdeck,
            pacer,
        }
    }

    pub fn clear_logs(&self) {
        self.gantry().take_calls();
        self.cycler().take_calls();
        self.tempdeck().take_calls();
    }

    pub fn gantry(&self) -> MutexGuard<'_, SimGantry> {
        self.gantry.lock().unwrap()
    }

    pub fn cycler(&self) -> MutexGuard<'_, SimThermocycler> {
        self.cycler.lock().unwrap()
    }

    pub fn tempdeck(&self) -> MutexGuard<'_, SimTempdeck> {
        self.tempdeck.lock().unwrap()
    }

    pub fn motor_calls(&self) -> Vec<MotorCall> {
        self.gantry().calls().to_vec()
    }

    pub fn moves(&self) -> Vec<AxisTarget> {
        self.gantry().moves()
    }

    pub fn thermal_calls(&self) -> Vec<ThermalCall> {
        self.cycler().calls().to_vec()
    }

    pub fn tempdeck_calls(&self) -> Vec<TempdeckCall> {
        self.tempdeck().calls().to_vec()
    }
}

/// The three directives of one safe move ending at `(x, y, z)`
pub fn safe_move(lift_z: f64, x: f64, y: f64, z: f64) -> [AxisTarget; 3] {
    [AxisTarget::z(lift_z), AxisTarget::xy(x, y), AxisTarget::z(z)]
}
