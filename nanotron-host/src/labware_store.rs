//! Labware setup files
//!
//! A setup is saved as pretty-printed JSON: the selected syringe name and one
//! record per calibrated component.

use std::path::Path;

use nanotron_core::labware::{LabwareRegistry, LabwareSetup};
use tracing::info;

use crate::config::MachineConfig;
use crate::error::{CoordinatorError, Result};

pub fn to_json(setup: &LabwareSetup) -> Result<String> {
    Ok(serde_json::to_string_pretty(setup)?)
}

pub fn from_json(text: &str) -> Result<LabwareSetup> {
    Ok(serde_json::from_str(text)?)
}

/// Write the registry contents to `path`
pub fn save_setup(registry: &LabwareRegistry, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let setup = registry.to_setup();
    std::fs::write(path, to_json(&setup)?)?;
    info!(
        path = %path.display(),
        components = setup.components.len(),
        "labware setup saved"
    );
    Ok(())
}

pub fn load_setup(path: impl AsRef<Path>) -> Result<LabwareSetup> {
    let path = path.as_ref();
    let setup = from_json(&std::fs::read_to_string(path)?)?;
    info!(
        path = %path.display(),
        components = setup.components.len(),
        "labware setup loaded"
    );
    Ok(setup)
}

/// Replace the registry contents with a saved setup
///
/// The syringe name is looked up in the machine's model table before
/// anything is changed.
pub fn apply_setup(
    registry: &mut LabwareRegistry,
    setup: LabwareSetup,
    config: &MachineConfig,
) -> Result<()> {
    let syringe = match &setup.syringe {
        Some(name) => Some(config.syringe(name).cloned().ok_or_else(|| {
            CoordinatorError::configuration(format!("saved syringe '{name}' is not defined"))
        })?),
        None => None,
    };
    if let Some(syringe) = syringe {
        registry.set_syringe(syringe);
    }
    registry.restore_components(setup);
    Ok(())
}
