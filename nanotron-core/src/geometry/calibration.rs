//! Grid calibration
//!
//! A labware grid is located on the deck from three jogged points:
//!
//! - `P1`: first well of the first row (A1)
//! - `P2`: last well of the first row
//! - `P3`: last well of the last row
//!
//! The fourth corner (first well of the last row) is inferred as
//! `P1 + P3 - P2`, so the four corners always form a parallelogram. Every
//! other well is placed by bilinear interpolation between the corners, then
//! shifted by the descriptor's row/column offsets and lowered by the well
//! depth.

use thiserror::Error;

use crate::config::{GridDescriptor, Label};
use crate::geometry::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest accepted |(P2 - P1) x (P3 - P2)| in mm²
pub const COLLINEAR_EPSILON_MM2: f64 = 1e-6;

/// Distance kept above the well bottom by [`DepthOverride::OffBottom`]
pub const OFF_BOTTOM_CLEARANCE_MM: f64 = 1.0;

/// Calibration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("calibration points are collinear (|cross| = {cross_norm:.3e} mm²)")]
    Degenerate { cross_norm: f64 },
    #[error("calibration point is not finite")]
    NonFinite,
    #[error("grid must have at least one row and one column")]
    EmptyGrid,
    #[error("grid {rows}x{cols} needs {expected} nicknames, got {actual}")]
    NicknameCount {
        rows: u16,
        cols: u16,
        expected: usize,
        actual: usize,
    },
    #[error("depth {requested} mm rejected for nominal depth {nominal} mm")]
    DepthOverrideRejected { requested: f64, nominal: f64 },
}

/// Validated set of three calibration points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPointSet {
    points: [Point3; 3],
}

impl CalibrationPointSet {
    /// Validate three points
    ///
    /// Rejects non-finite coordinates and point sets whose edges are
    /// (near) parallel.
    pub fn new(p1: Point3, p2: Point3, p3: Point3) -> Result<Self, CalibrationError> {
        if !(p1.is_finite() && p2.is_finite() && p3.is_finite()) {
            return Err(CalibrationError::NonFinite);
        }

        let cross_norm = (p2 - p1).cross(&(p3 - p2)).norm();
        if cross_norm < COLLINEAR_EPSILON_MM2 {
            return Err(CalibrationError::Degenerate { cross_norm });
        }

        Ok(Self {
            points: [p1, p2, p3],
        })
    }

    pub fn points(&self) -> &[Point3; 3] {
        &self.points
    }

    /// Inferred first well of the last row
    pub fn fourth(&self) -> Point3 {
        let [p1, p2, p3] = self.points;
        guess_fourth_point(p1, p2, p3)
    }

    /// Corners in A1, last-of-first-row, last, first-of-last-row order
    pub fn corners(&self) -> [Point3; 4] {
        let [p1, p2, p3] = self.points;
        [p1, p2, p3, self.fourth()]
    }
}

/// Fourth corner of the parallelogram through `p1`, `p2`, `p3`
pub fn guess_fourth_point(p1: Point3, p2: Point3, p3: Point3) -> Point3 {
    p1 + p3 - p2
}

/// Well depth selection for a move into a well
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DepthOverride {
    /// Use the descriptor's nominal depth
    #[default]
    Nominal,
    /// Stop just above the bottom
    OffBottom,
    /// Explicit depth below the surface (mm); must be shallower than nominal
    Absolute(f64),
}

impl DepthOverride {
    /// Resolve to a depth in mm for a well with `nominal_mm` depth
    pub fn resolve(self, nominal_mm: f64) -> Result<f64, CalibrationError> {
        match self {
            DepthOverride::Nominal => Ok(nominal_mm),
            DepthOverride::OffBottom => Ok((nominal_mm - OFF_BOTTOM_CLEARANCE_MM).max(0.0)),
            DepthOverride::Absolute(depth)
                if depth.is_finite() && depth >= 0.0 && depth < nominal_mm =>
            {
                Ok(depth)
            }
            DepthOverride::Absolute(depth) => Err(CalibrationError::DepthOverrideRejected {
                requested: depth,
                nominal: nominal_mm,
            }),
        }
    }
}

/// One mapped well
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MappedWell {
    pub nickname: Label,
    /// Resting location at nominal depth
    pub location: Point3,
}

/// Map every well of `descriptor` onto the deck
///
/// Returns wells in row-major order, matching the descriptor's nicknames.
pub fn calibrate(
    descriptor: &GridDescriptor,
    points: &CalibrationPointSet,
) -> Result<Vec<MappedWell>, CalibrationError> {
    descriptor.validate()?;
    let (rows, cols) = (descriptor.rows, descriptor.cols);
    let nicknames = descriptor.resolved_nicknames();

    let [p1, p2, p3, p4] = points.corners();
    // Offsets follow the grid edges, not the deck axes
    let col_dir = (p2 - p1).normalized();
    let row_dir = (p4 - p1).normalized();
    let depth = Point3::new(0.0, 0.0, descriptor.depth_mm);

    let mut wells = Vec::with_capacity(nicknames.len());
    for (index, nickname) in nicknames.into_iter().enumerate() {
        let row = (index / cols as usize) as u16;
        let col = (index % cols as usize) as u16;
        let u = fraction(row, rows);
        let v = fraction(col, cols);

        let surface = p1 * ((1.0 - u) * (1.0 - v))
            + p2 * ((1.0 - u) * v)
            + p3 * (u * v)
            + p4 * (u * (1.0 - v));
        let shifted = surface
            + row_dir * (descriptor.offset.row_mm * row as f64)
            + col_dir * (descriptor.offset.col_mm * col as f64);

        wells.push(MappedWell {
            nickname,
            location: shifted - depth,
        });
    }

    Ok(wells)
}

fn fraction(index: u16, count: u16) -> f64 {
    if count <= 1 {
        0.0
    } else {
        index as f64 / (count - 1) as f64
    }
}
