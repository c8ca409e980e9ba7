//! Device driver implementations
//!
//! This crate provides implementations of the traits defined in
//! nanotron-core:
//!
//! - Motor controller (simulated gantry)
//! - Thermal cycler and tempdeck (simulated, with temperature approach)
//! - Manual input (scripted event source)
//!
//! The simulated devices record every command they receive. They back the
//! dry-run binary and the host integration tests.

#![deny(unsafe_code)]

pub mod input;
pub mod motor;
pub mod thermal;

pub use input::ScriptedInput;
pub use motor::{MotorCall, SimGantry};
pub use thermal::{SimTempdeck, SimThermocycler, TempdeckCall, ThermalCall, ThermalModel};
