//! Exclusive device access
//!
//! Each physical device sits behind one mutex. Every command, and every
//! multi-command sequence that must not interleave with another flow, runs
//! inside a single [`DeviceBus::with`] call.

use std::sync::{Arc, Mutex};

use nanotron_core::traits::{DriverError, MotorDriver, TempdeckDriver, ThermalCyclerDriver};

use crate::error::CoordinatorError;

/// Shared handle to one device
pub struct DeviceBus<D: ?Sized> {
    name: &'static str,
    inner: Arc<Mutex<D>>,
}

impl<D: ?Sized> Clone for DeviceBus<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: ?Sized> core::fmt::Debug for DeviceBus<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceBus").field("name", &self.name).finish()
    }
}

impl<D: ?Sized> DeviceBus<D> {
    /// Wrap an already shared device
    pub fn from_shared(name: &'static str, inner: Arc<Mutex<D>>) -> Self {
        Self { name, inner }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run `f` with exclusive access to the device
    pub fn with<T>(
        &self,
        f: impl FnOnce(&mut D) -> Result<T, CoordinatorError>,
    ) -> Result<T, CoordinatorError> {
        let mut device = self
            .inner
            .lock()
            .map_err(|_| CoordinatorError::device(self.name, DriverError::Poisoned))?;
        f(&mut *device)
    }

    /// Run a single driver call, tagging its error with the device name
    pub fn call<T>(
        &self,
        f: impl FnOnce(&mut D) -> Result<T, DriverError>,
    ) -> Result<T, CoordinatorError> {
        let name = self.name;
        self.with(|device| f(device).map_err(|e| CoordinatorError::device(name, e)))
    }
}

pub type MotorBus = DeviceBus<dyn MotorDriver>;
pub type ThermalBus = DeviceBus<dyn ThermalCyclerDriver>;
pub type TempdeckBus = DeviceBus<dyn TempdeckDriver>;

impl MotorBus {
    pub fn motor(driver: impl MotorDriver + 'static) -> Self {
        Self::from_shared("motor", Arc::new(Mutex::new(driver)))
    }
}

impl ThermalBus {
    pub fn thermocycler(driver: impl ThermalCyclerDriver + 'static) -> Self {
        Self::from_shared("thermocycler", Arc::new(Mutex::new(driver)))
    }
}

impl TempdeckBus {
    pub fn tempdeck(driver: impl TempdeckDriver + 'static) -> Self {
        Self::from_shared("tempdeck", Arc::new(Mutex::new(driver)))
    }
}
