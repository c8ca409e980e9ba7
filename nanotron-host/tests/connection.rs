//! Device connection management and runtime settings

mod common;

use common::{Rig, MACHINE};
use nanotron_core::state::LidState;
use nanotron_core::traits::DriverError;
use nanotron_drivers::{MotorCall, TempdeckCall, ThermalCall};
use nanotron_host::config::parse_config;
use nanotron_host::{CoordinatorError, SettingUpdate};

#[test]
fn test_connect_all_connects_every_device() {
    let mut rig = Rig::disconnected(parse_config(MACHINE).unwrap());
    rig.coordinator.connect_all().unwrap();

    assert_eq!(rig.thermal_calls(), vec![ThermalCall::Connect]);
    assert_eq!(rig.motor_calls(), vec![MotorCall::Connect]);
    assert_eq!(rig.tempdeck_calls(), vec![TempdeckCall::Connect]);
    assert_eq!(rig.coordinator.sequencer().lid_state(), LidState::Unknown);
}

#[test]
fn test_reconnect_disconnects_first() {
    let mut rig = Rig::new();
    rig.coordinator.connect_all().unwrap();

    assert_eq!(
        rig.thermal_calls(),
        vec![ThermalCall::Disconnect, ThermalCall::Connect]
    );
    assert_eq!(
        rig.motor_calls(),
        vec![MotorCall::Disconnect, MotorCall::Connect]
    );
}

#[test]
fn test_motor_failure_releases_everything() {
    let mut rig = Rig::disconnected(parse_config(MACHINE).unwrap());
    rig.gantry().fail_next(DriverError::Port("/dev/ttyACM0".into()));

    let result = rig.coordinator.connect_all();

    assert!(matches!(
        result,
        Err(CoordinatorError::Device { device: "motor", .. })
    ));
    // The cycler connects before the motor and is released again; the
    // tempdeck comes after the motor and is never reached
    assert_eq!(
        rig.thermal_calls(),
        vec![ThermalCall::Connect, ThermalCall::Disconnect]
    );
    assert!(rig.motor_calls().is_empty());
    assert!(rig.tempdeck_calls().is_empty());
}

#[test]
fn test_reconnect_forgets_lid_state() {
    let mut rig = Rig::new();
    rig.coordinator.sequencer_mut().open_lid().unwrap();
    assert_eq!(rig.coordinator.sequencer().lid_state(), LidState::Open);

    rig.coordinator.connect_all().unwrap();
    assert_eq!(rig.coordinator.sequencer().lid_state(), LidState::Unknown);
}

#[test]
fn test_end_of_protocol_parks_and_disconnects() {
    let mut rig = Rig::new();
    rig.coordinator.end_of_protocol().unwrap();

    let calls = rig.motor_calls();
    assert_eq!(calls.last(), Some(&MotorCall::Disconnect));
    let position = rig.coordinator.current_coordinates();
    assert_eq!((position.x, position.y, position.z), (328.88, 42.74, 150.0));
    assert_eq!(rig.thermal_calls(), vec![ThermalCall::Disconnect]);
    assert_eq!(rig.tempdeck_calls(), vec![TempdeckCall::Disconnect]);
}

#[test]
fn test_unknown_setting_is_logged_noop() {
    let mut rig = Rig::new();
    let before = rig.coordinator.settings();

    let outcome = rig
        .coordinator
        .update_setting("xyz_axis_gearbox", "1,1,1")
        .unwrap();

    assert_eq!(outcome, SettingUpdate::Ignored);
    assert_eq!(rig.coordinator.settings(), before);
    assert_eq!(before.syringe_model.as_deref(), Some("test"));
}

#[test]
fn test_step_setting_reaches_manual_jog() {
    let mut rig = Rig::new();
    rig.coordinator
        .update_setting("xyz_axis_step_size", "250")
        .unwrap();
    // Clamped to the configured maximum step
    assert_eq!(rig.coordinator.jog().get().xyz_step_mm, 100.0);
}

#[test]
fn test_stop_then_resume_allows_end_of_protocol() {
    let mut rig = Rig::new();
    let token = rig.coordinator.cancel_token();
    token.cancel();

    assert!(matches!(
        rig.coordinator.end_of_protocol(),
        Err(CoordinatorError::Cancelled)
    ));
    assert!(token.is_acknowledged());
    assert!(rig.moves().is_empty());

    rig.coordinator.resume();
    assert!(!token.is_cancelled());
    rig.coordinator.end_of_protocol().unwrap();
    assert_eq!(rig.motor_calls().last(), Some(&MotorCall::Disconnect));
}
