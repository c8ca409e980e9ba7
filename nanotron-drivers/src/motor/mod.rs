//! Motor controller drivers

pub mod sim;

pub use sim::{MotorCall, SimGantry};
