//! Simulated tempdeck

use nanotron_core::traits::{DriverError, TempdeckDriver, TempdeckStatus};

use super::ThermalModel;

/// Command received by the simulated tempdeck
#[derive(Debug, Clone, PartialEq)]
pub enum TempdeckCall {
    Connect,
    Disconnect,
    SetTemperature { celsius: f64 },
    Deactivate,
}

/// Simulated tempdeck
#[derive(Debug, Clone, Default)]
pub struct SimTempdeck {
    connected: bool,
    model: ThermalModel,
    calls: Vec<TempdeckCall>,
}

impl SimTempdeck {
    pub fn new(model: ThermalModel) -> Self {
        Self {
            model,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> &[TempdeckCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<TempdeckCall> {
        core::mem::take(&mut self.calls)
    }

    fn ensure_connected(&self) -> Result<(), DriverError> {
        if self.connected {
            Ok(())
        } else {
            Err(DriverError::NotConnected)
        }
    }
}

impl TempdeckDriver for SimTempdeck {
    fn connect(&mut self) -> Result<(), DriverError> {
        self.connected = true;
        self.calls.push(TempdeckCall::Connect);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        if self.connected {
            self.connected = false;
            self.calls.push(TempdeckCall::Disconnect);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn start_set_temperature(&mut self, celsius: f64) -> Result<(), DriverError> {
        self.ensure_connected()?;
        self.calls.push(TempdeckCall::SetTemperature { celsius });
        self.model.set_target(Some(celsius));
        Ok(())
    }

    fn temperature(&mut self) -> Result<f64, DriverError> {
        self.ensure_connected()?;
        Ok(self.model.read())
    }

    fn target(&self) -> Option<f64> {
        self.model.target()
    }

    fn status(&mut self) -> Result<TempdeckStatus, DriverError> {
        self.ensure_connected()?;
        let current = self.model.peek();
        let status = match self.model.target() {
            None => TempdeckStatus::Idle,
            Some(target) if (target - current).abs() < 0.5 => TempdeckStatus::Holding,
            Some(target) if target > current => TempdeckStatus::Heating,
            Some(_) => TempdeckStatus::Cooling,
        };
        Ok(status)
    }

    fn deactivate(&mut self) -> Result<(), DriverError> {
        self.ensure_connected()?;
        self.calls.push(TempdeckCall::Deactivate);
        self.model.set_target(None);
        Ok(())
    }
}
