//! Thermal device drivers
//!
//! Simulated thermal cycler and tempdeck sharing one temperature model.

pub mod cycler;
pub mod model;
pub mod tempdeck;

pub use cycler::{SimThermocycler, ThermalCall};
pub use model::ThermalModel;
pub use tempdeck::{SimTempdeck, TempdeckCall};
