//! Deck geometry
//!
//! Axis positions, 3D points, and the calibration that maps a labware grid
//! onto the deck from three jogged corner points.

pub mod calibration;
pub mod point;

pub use calibration::{
    calibrate, guess_fourth_point, CalibrationError, CalibrationPointSet, DepthOverride,
    MappedWell, COLLINEAR_EPSILON_MM2, OFF_BOTTOM_CLEARANCE_MM,
};
pub use point::{Axis, AxisSet, AxisTarget, Plunger, Point3, Position};
