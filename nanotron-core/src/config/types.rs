//! Configuration type definitions
//!
//! Labware grid descriptors, syringe models and wash parameters.

use heapless::String;

use crate::geometry::{CalibrationError, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum label length (models, nicknames, slot ids, input elements)
pub const MAX_LABEL_LEN: usize = 24;

/// Short fixed-capacity label
pub type Label = String<MAX_LABEL_LEN>;

/// Build a label, returning `None` if `s` does not fit
pub fn label(s: &str) -> Option<Label> {
    Label::try_from(s).ok()
}

/// Labware family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LabwareKind {
    /// Microfluidic chip
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "c", alias = "chip"))]
    Chip,
    /// Well plate
    #[cfg_attr(feature = "serde", serde(rename = "p", alias = "plate"))]
    Plate,
}

impl LabwareKind {
    /// Single-letter tag used in coded well descriptions
    pub fn tag(self) -> char {
        match self {
            LabwareKind::Chip => 'c',
            LabwareKind::Plate => 'p',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'c' | 'C' => Some(LabwareKind::Chip),
            'p' | 'P' => Some(LabwareKind::Plate),
            _ => None,
        }
    }
}

/// Extra spacing applied along the grid edges after interpolation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GridOffset {
    /// Added per row step, along the first-column edge (mm)
    pub row_mm: f64,
    /// Added per column step, along the first-row edge (mm)
    pub col_mm: f64,
}

/// Labware model definition
///
/// Wells are addressed row-major; nickname `i` belongs to row `i / cols`,
/// column `i % cols`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridDescriptor {
    /// Model name
    pub model: Label,
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: LabwareKind,
    pub rows: u16,
    pub cols: u16,
    /// Nominal well depth below the calibrated surface (mm)
    #[cfg_attr(feature = "serde", serde(default))]
    pub depth_mm: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub offset: GridOffset,
    /// Row-major well nicknames; generated as A1, A2, ... when empty
    #[cfg_attr(feature = "serde", serde(default))]
    pub nicknames: Vec<Label>,
}

impl GridDescriptor {
    /// Descriptor with generated nicknames
    pub fn new(model: Label, kind: LabwareKind, rows: u16, cols: u16) -> Self {
        Self {
            model,
            kind,
            rows,
            cols,
            depth_mm: 0.0,
            offset: GridOffset::default(),
            nicknames: default_nicknames(rows, cols),
        }
    }

    pub fn well_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Check the grid shape, depth and nickname count
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(CalibrationError::EmptyGrid);
        }
        let offset = self.offset;
        if !(self.depth_mm.is_finite() && offset.row_mm.is_finite() && offset.col_mm.is_finite()) {
            return Err(CalibrationError::NonFinite);
        }
        if !self.nicknames.is_empty() && self.nicknames.len() != self.well_count() {
            return Err(CalibrationError::NicknameCount {
                rows: self.rows,
                cols: self.cols,
                expected: self.well_count(),
                actual: self.nicknames.len(),
            });
        }
        Ok(())
    }

    /// Nicknames, falling back to generated ones when none were given
    pub fn resolved_nicknames(&self) -> Vec<Label> {
        if self.nicknames.is_empty() {
            default_nicknames(self.rows, self.cols)
        } else {
            self.nicknames.clone()
        }
    }
}

/// Row letter(s) for a zero-based row index: A..Z, then AA, AB, ...
pub fn row_name(row: u16) -> Label {
    let mut name = Label::new();
    let mut n = row as u32 + 1;
    let mut letters = [0u8; 4];
    let mut len = 0;
    while n > 0 && len < letters.len() {
        let rem = (n - 1) % 26;
        letters[len] = b'A' + rem as u8;
        len += 1;
        n = (n - 1) / 26;
    }
    for &b in letters[..len].iter().rev() {
        let _ = name.push(b as char);
    }
    name
}

/// Generated row-major nicknames ("A1", "A2", ..., "B1", ...)
pub fn default_nicknames(rows: u16, cols: u16) -> Vec<Label> {
    use core::fmt::Write;

    let mut names = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        let prefix = row_name(row);
        for col in 0..cols {
            let mut name = prefix.clone();
            let _ = write!(name, "{}", col + 1);
            names.push(name);
        }
    }
    names
}

/// Syringe model parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyringeParameters {
    /// Model name
    pub name: Label,
    /// Nominal volume in µL, informational
    #[cfg_attr(feature = "serde", serde(default))]
    pub volume_ul: Option<f64>,
    /// Plunger bore diameter (mm)
    pub inner_diameter_mm: f64,
    /// Highest plunger coordinate (mm)
    pub upper_limit_mm: f64,
    /// Lowest plunger coordinate (mm)
    pub lower_limit_mm: f64,
    /// Plunger coordinate to rest at after a wash
    pub sweet_spot_mm: f64,
}

impl SyringeParameters {
    /// Check a plunger coordinate against the syringe travel
    pub fn contains(&self, coordinate_mm: f64) -> bool {
        coordinate_mm >= self.lower_limit_mm && coordinate_mm <= self.upper_limit_mm
    }

    pub fn is_valid(&self) -> bool {
        self.inner_diameter_mm.is_finite()
            && self.inner_diameter_mm > 0.0
            && self.lower_limit_mm < self.sweet_spot_mm
            && self.sweet_spot_mm <= self.upper_limit_mm
    }
}

/// The three stations used by wash cycles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WashPositions {
    pub clean: Point3,
    pub wash: Point3,
    pub waste: Point3,
}

/// Wash volume parameters (nanoliters)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WashVolumes {
    /// Volume left in the syringe before a mid-protocol wash
    pub leftover_nl: f64,
    /// Extra volume drawn with the wash fluid
    pub cushion_1_nl: f64,
    /// Extra volume expelled with the wash fluid
    pub cushion_2_nl: f64,
    /// Wash fluid volume per cycle
    pub amount_wanted_nl: f64,
}

impl Default for WashVolumes {
    fn default() -> Self {
        Self {
            leftover_nl: 200.0,
            cushion_1_nl: 200.0,
            cushion_2_nl: 300.0,
            amount_wanted_nl: 1000.0,
        }
    }
}
