//! Thermal cycler and tempdeck traits

use core::time::Duration;

use super::DriverError;

/// Trait for the thermal cycler
///
/// The driver does not report lid position; the coordinator tracks it.
pub trait ThermalCyclerDriver: Send {
    fn connect(&mut self) -> Result<(), DriverError>;

    fn disconnect(&mut self) -> Result<(), DriverError>;

    fn is_connected(&self) -> bool;

    fn open_lid(&mut self) -> Result<(), DriverError>;

    fn close_lid(&mut self) -> Result<(), DriverError>;

    /// Send a block set-point, with an optional device-side hold time
    fn set_block_temperature(
        &mut self,
        celsius: f64,
        hold: Option<Duration>,
    ) -> Result<(), DriverError>;

    fn set_lid_temperature(&mut self, celsius: f64) -> Result<(), DriverError>;

    fn deactivate_lid(&mut self) -> Result<(), DriverError>;

    fn deactivate_block(&mut self) -> Result<(), DriverError>;

    /// Turn off both lid and block heating
    fn deactivate_all(&mut self) -> Result<(), DriverError> {
        self.deactivate_lid()?;
        self.deactivate_block()
    }

    /// Current block temperature (°C)
    fn block_temperature(&mut self) -> Result<f64, DriverError>;

    /// Current lid temperature (°C)
    fn lid_temperature(&mut self) -> Result<f64, DriverError>;
}

/// Tempdeck activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempdeckStatus {
    Idle,
    Holding,
    Heating,
    Cooling,
}

/// Trait for the temperature-controlled deck
pub trait TempdeckDriver: Send {
    fn connect(&mut self) -> Result<(), DriverError>;

    fn disconnect(&mut self) -> Result<(), DriverError>;

    fn is_connected(&self) -> bool;

    /// Send a set-point; returns without waiting
    fn start_set_temperature(&mut self, celsius: f64) -> Result<(), DriverError>;

    /// Refresh and return the current temperature (°C)
    fn temperature(&mut self) -> Result<f64, DriverError>;

    /// Current set-point, if heating or cooling is active
    fn target(&self) -> Option<f64>;

    fn status(&mut self) -> Result<TempdeckStatus, DriverError>;

    fn deactivate(&mut self) -> Result<(), DriverError>;
}
