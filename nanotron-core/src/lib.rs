//! Device-agnostic coordination logic for the liquid-handling robot
//!
//! This crate contains all logic that does not talk to a live device:
//!
//! - Device capability traits (motor controller, thermal cycler, tempdeck, input)
//! - Calibration geometry and the labware registry
//! - Volume and flow-rate conversion for the syringe plungers
//! - Motion planning (safe three-phase moves, jogs, travel limits)
//! - Lid state machine
//! - Temperature ramp/hold tracking, wash scripts and protocol steps
//! - Manual-control binding profile and jog settings
//! - Thermal safety limits

#![deny(unsafe_code)]

pub mod config;
pub mod geometry;
pub mod labware;
pub mod liquid;
pub mod manual;
pub mod motion;
pub mod protocol;
pub mod safety;
pub mod state;
pub mod traits;
