//! Persistable labware setup
//!
//! A saved setup holds each component's model, kind, depth and mapped wells,
//! plus the selected syringe model name. Calibration points are not kept;
//! restored components cannot be recalibrated without jogging again.

use crate::config::{Label, LabwareKind};
use crate::geometry::MappedWell;

use super::{CalibratedComponent, LabwareRegistry};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One saved component
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentRecord {
    pub model: Label,
    pub kind: LabwareKind,
    pub depth_mm: f64,
    /// Row-major nickname and location pairs
    pub locations: Vec<MappedWell>,
}

impl From<&CalibratedComponent> for ComponentRecord {
    fn from(component: &CalibratedComponent) -> Self {
        Self {
            model: component.model.clone(),
            kind: component.kind,
            depth_mm: component.depth_mm,
            locations: component.wells.clone(),
        }
    }
}

impl From<ComponentRecord> for CalibratedComponent {
    fn from(record: ComponentRecord) -> Self {
        Self {
            model: record.model,
            kind: record.kind,
            depth_mm: record.depth_mm,
            calibration: None,
            wells: record.locations,
        }
    }
}

/// Saved registry contents
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabwareSetup {
    #[cfg_attr(feature = "serde", serde(default))]
    pub syringe: Option<Label>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub components: Vec<ComponentRecord>,
}

impl LabwareRegistry {
    /// Snapshot the registry for saving
    pub fn to_setup(&self) -> LabwareSetup {
        LabwareSetup {
            syringe: self.syringe().ok().map(|s| s.name.clone()),
            components: self.components().iter().map(ComponentRecord::from).collect(),
        }
    }

    /// Replace all components with the saved ones
    ///
    /// The syringe model is resolved by the caller, which owns the model
    /// table.
    pub fn restore_components(&mut self, setup: LabwareSetup) {
        self.clear();
        for record in setup.components {
            self.add(record.into());
        }
    }
}
