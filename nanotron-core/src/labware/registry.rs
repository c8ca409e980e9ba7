//! Calibrated component storage
//!
//! Components are kept in calibration order. Chips and plates are indexed
//! separately: the first calibrated plate is `p0`, the first chip `c0`,
//! regardless of how they interleave.

use core::fmt;

use thiserror::Error;

use crate::config::{GridDescriptor, LabwareKind, Label, SyringeParameters};
use crate::geometry::{
    calibrate, CalibrationError, CalibrationPointSet, DepthOverride, MappedWell, Point3,
};
use crate::liquid::ConversionError;

use super::WellDescription;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reference to a calibrated component: kind plus per-kind index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentId {
    pub kind: LabwareKind,
    pub index: usize,
}

impl ComponentId {
    pub fn chip(index: usize) -> Self {
        Self {
            kind: LabwareKind::Chip,
            index,
        }
    }

    pub fn plate(index: usize) -> Self {
        Self {
            kind: LabwareKind::Plate,
            index,
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.tag(), self.index)
    }
}

/// Labware errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabwareError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("no component {0}")]
    UnknownComponent(ComponentId),
    #[error("'{nickname}' is not a well of {component}")]
    UnknownNickname {
        component: ComponentId,
        nickname: String,
    },
    #[error("malformed well description '{0}'")]
    MalformedDescription(String),
}

/// A labware instance placed on the deck
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedComponent {
    pub model: Label,
    pub kind: LabwareKind,
    pub depth_mm: f64,
    /// Jogged points; absent for components restored from a saved setup
    pub calibration: Option<CalibrationPointSet>,
    pub wells: Vec<MappedWell>,
}

impl CalibratedComponent {
    /// Calibrate a descriptor against three jogged points
    pub fn calibrate(
        descriptor: &GridDescriptor,
        points: CalibrationPointSet,
    ) -> Result<Self, CalibrationError> {
        let wells = calibrate(descriptor, &points)?;
        Ok(Self {
            model: descriptor.model.clone(),
            kind: descriptor.kind,
            depth_mm: descriptor.depth_mm,
            calibration: Some(points),
            wells,
        })
    }

    /// Resting location of a well at nominal depth
    pub fn location(&self, nickname: &str) -> Option<Point3> {
        self.wells
            .iter()
            .find(|well| well.nickname.as_str() == nickname)
            .map(|well| well.location)
    }

    /// Location of a well at an overridden depth
    pub fn location_with_depth(
        &self,
        nickname: &str,
        depth: DepthOverride,
    ) -> Option<Result<Point3, CalibrationError>> {
        let nominal = self.location(nickname)?;
        Some(depth.resolve(self.depth_mm).map(|resolved| {
            // Stored z is already `depth_mm` below the surface
            Point3::new(nominal.x, nominal.y, nominal.z + self.depth_mm - resolved)
        }))
    }
}

/// Registry of calibrated components and the selected syringe
#[derive(Debug, Clone, Default)]
pub struct LabwareRegistry {
    components: Vec<CalibratedComponent>,
    syringe: Option<SyringeParameters>,
}

impl LabwareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component, returning its id
    pub fn add(&mut self, component: CalibratedComponent) -> ComponentId {
        let kind = component.kind;
        let index = self.of_kind(kind).count();
        self.components.push(component);
        ComponentId { kind, index }
    }

    /// Calibrate and add in one step
    pub fn calibrate(
        &mut self,
        descriptor: &GridDescriptor,
        points: CalibrationPointSet,
    ) -> Result<ComponentId, LabwareError> {
        let component = CalibratedComponent::calibrate(descriptor, points)?;
        Ok(self.add(component))
    }

    /// Remove a component; later components of the same kind shift down
    pub fn remove(&mut self, id: ComponentId) -> Result<CalibratedComponent, LabwareError> {
        let position = self
            .components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == id.kind)
            .nth(id.index)
            .map(|(i, _)| i)
            .ok_or(LabwareError::UnknownComponent(id))?;
        Ok(self.components.remove(position))
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }

    pub fn get(&self, id: ComponentId) -> Option<&CalibratedComponent> {
        self.of_kind(id.kind).nth(id.index)
    }

    /// Components of one kind, in calibration order
    pub fn of_kind(&self, kind: LabwareKind) -> impl Iterator<Item = &CalibratedComponent> + '_ {
        self.components.iter().filter(move |c| c.kind == kind)
    }

    /// All components, in calibration order
    pub fn components(&self) -> &[CalibratedComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Resting location of a well at nominal depth
    pub fn location(&self, id: ComponentId, nickname: &str) -> Result<Point3, LabwareError> {
        self.location_with_depth(id, nickname, DepthOverride::Nominal)
    }

    /// Location of a well with a depth override
    pub fn location_with_depth(
        &self,
        id: ComponentId,
        nickname: &str,
        depth: DepthOverride,
    ) -> Result<Point3, LabwareError> {
        let component = self.get(id).ok_or(LabwareError::UnknownComponent(id))?;
        match component.location_with_depth(nickname, depth) {
            Some(result) => Ok(result?),
            None => Err(LabwareError::UnknownNickname {
                component: id,
                nickname: nickname.into(),
            }),
        }
    }

    /// Resolve a coded well description such as `p 1E3`
    pub fn resolve_description(&self, description: &str) -> Result<Point3, LabwareError> {
        let parsed = WellDescription::parse(description)?;
        self.location(parsed.component, &parsed.nickname)
    }

    /// Check whether a coded well description names an existing well
    pub fn well_exists(&self, description: &str) -> bool {
        self.resolve_description(description).is_ok()
    }

    pub fn set_syringe(&mut self, syringe: SyringeParameters) {
        self.syringe = Some(syringe);
    }

    /// Selected syringe model
    pub fn syringe(&self) -> Result<&SyringeParameters, ConversionError> {
        self.syringe.as_ref().ok_or(ConversionError::NoSyringeModel)
    }

    pub fn has_syringe(&self) -> bool {
        self.syringe.is_some()
    }
}
