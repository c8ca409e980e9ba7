//! Device abstraction traits
//!
//! These traits define the interface between the coordination logic and the
//! device drivers. Serial framing and firmware protocols live behind them.

pub mod error;
pub mod input;
pub mod motor;
pub mod thermal;

pub use error::DriverError;
pub use input::{InputEvent, InputSource};
pub use motor::MotorDriver;
pub use thermal::{TempdeckDriver, TempdeckStatus, ThermalCyclerDriver};
