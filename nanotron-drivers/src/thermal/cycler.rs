//! Simulated thermal cycler

use core::time::Duration;

use nanotron_core::traits::{DriverError, ThermalCyclerDriver};

use super::ThermalModel;

/// Command received by the simulated thermal cycler
#[derive(Debug, Clone, PartialEq)]
pub enum ThermalCall {
    Connect,
    Disconnect,
    OpenLid,
    CloseLid,
    SetBlock { celsius: f64, hold: Option<Duration> },
    SetLid { celsius: f64 },
    DeactivateLid,
    DeactivateBlock,
}

/// Simulated thermal cycler
#[derive(Debug, Clone, Default)]
pub struct SimThermocycler {
    connected: bool,
    block: ThermalModel,
    lid_heater: ThermalModel,
    block_reads: usize,
    calls: Vec<ThermalCall>,
    pending_failure: Option<DriverError>,
}

impl SimThermocycler {
    pub fn new(block: ThermalModel) -> Self {
        Self {
            block,
            ..Default::default()
        }
    }

    /// Make the next command fail
    pub fn fail_next(&mut self, error: DriverError) {
        self.pending_failure = Some(error);
    }

    pub fn calls(&self) -> &[ThermalCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<ThermalCall> {
        core::mem::take(&mut self.calls)
    }

    pub fn block_model_mut(&mut self) -> &mut ThermalModel {
        &mut self.block
    }

    /// Number of block temperature readings taken
    pub fn block_reads(&self) -> usize {
        self.block_reads
    }

    fn record(&mut self, call: ThermalCall) -> Result<(), DriverError> {
        if let Some(error) = self.pending_failure.take() {
            return Err(error);
        }
        if !self.connected {
            return Err(DriverError::NotConnected);
        }
        tracing::trace!(?call, "sim thermocycler");
        self.calls.push(call);
        Ok(())
    }
}

impl ThermalCyclerDriver for SimThermocycler {
    fn connect(&mut self) -> Result<(), DriverError> {
        if let Some(error) = self.pending_failure.take() {
            return Err(error);
        }
        self.connected = true;
        self.calls.push(ThermalCall::Connect);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        if self.connected {
            self.connected = false;
            self.calls.push(ThermalCall::Disconnect);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn open_lid(&mut self) -> Result<(), DriverError> {
        self.record(ThermalCall::OpenLid)
    }

    fn close_lid(&mut self) -> Result<(), DriverError> {
        self.record(ThermalCall::CloseLid)
    }

    fn set_block_temperature(
        &mut self,
        celsius: f64,
        hold: Option<Duration>,
    ) -> Result<(), DriverError> {
        self.record(ThermalCall::SetBlock { celsius, hold })?;
        self.block.set_target(Some(celsius));
        Ok(())
    }

    fn set_lid_temperature(&mut self, celsius: f64) -> Result<(), DriverError> {
        self.record(ThermalCall::SetLid { celsius })?;
        self.lid_heater.set_target(Some(celsius));
        Ok(())
    }

    fn deactivate_lid(&mut self) -> Result<(), DriverError> {
        self.record(ThermalCall::DeactivateLid)?;
        self.lid_heater.set_target(None);
        Ok(())
    }

    fn deactivate_block(&mut self) -> Result<(), DriverError> {
        self.record(ThermalCall::DeactivateBlock)?;
        self.block.set_target(None);
        Ok(())
    }

    fn block_temperature(&mut self) -> Result<f64, DriverError> {
        if !self.connected {
            return Err(DriverError::NotConnected);
        }
        self.block_reads += 1;
        Ok(self.block.read())
    }

    fn lid_temperature(&mut self) -> Result<f64, DriverError> {
        if !self.connected {
            return Err(DriverError::NotConnected);
        }
        Ok(self.lid_heater.read())
    }
}
