//! Liquid handling arithmetic
//!
//! Converts nanoliter volumes and flow rates into plunger travel and speed.

pub mod converter;

pub use converter::{plunger_area_mm2, ConversionError, VolumetricConverter, NANOLITERS_TO_UL};
