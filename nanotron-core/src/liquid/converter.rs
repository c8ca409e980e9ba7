//! Volume and flow-rate conversion
//!
//! Plunger travel for a volume `V` (nL) in a bore of diameter `d` (mm):
//!
//! ```text
//! distance = V * 1e-3 / (π (d/2)²) * K
//! ```
//!
//! `1e-3` converts nL to µL (= mm³). `K` is the controller's steps-per-mm
//! correction for the plunger axes. It varies between machines, so it is
//! always supplied by configuration. Flow rates (nL/s) convert to plunger
//! speeds (mm/s) with the same formula.

use core::f64::consts::PI;

use thiserror::Error;

use crate::config::SyringeParameters;

/// nL to µL
pub const NANOLITERS_TO_UL: f64 = 1e-3;

/// Conversion errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("plunger diameter must be positive, got {diameter_mm} mm")]
    NonPositiveDiameter { diameter_mm: f64 },
    #[error("unit correction factor must be positive and finite, got {value}")]
    InvalidCorrection { value: f64 },
    #[error("no syringe model selected")]
    NoSyringeModel,
    #[error("unknown syringe model '{0}'")]
    UnknownSyringe(String),
}

/// Plunger cross-section area (mm²)
pub fn plunger_area_mm2(diameter_mm: f64) -> Result<f64, ConversionError> {
    if !(diameter_mm.is_finite() && diameter_mm > 0.0) {
        return Err(ConversionError::NonPositiveDiameter { diameter_mm });
    }
    let radius = diameter_mm / 2.0;
    Ok(PI * radius * radius)
}

/// Volume/flow converter with a fixed unit correction factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumetricConverter {
    correction: f64,
}

impl VolumetricConverter {
    pub fn new(correction: f64) -> Result<Self, ConversionError> {
        if !(correction.is_finite() && correction > 0.0) {
            return Err(ConversionError::InvalidCorrection { value: correction });
        }
        Ok(Self { correction })
    }

    pub fn correction(&self) -> f64 {
        self.correction
    }

    /// Plunger travel (mm) for `volume_nl`
    pub fn volume_to_distance(
        &self,
        volume_nl: f64,
        syringe: &SyringeParameters,
    ) -> Result<f64, ConversionError> {
        self.scale(volume_nl, syringe.inner_diameter_mm)
    }

    /// Plunger speed (mm/s) for `rate_nl_s`
    pub fn flowrate_to_speed(
        &self,
        rate_nl_s: f64,
        syringe: &SyringeParameters,
    ) -> Result<f64, ConversionError> {
        self.scale(rate_nl_s, syringe.inner_diameter_mm)
    }

    fn scale(&self, quantity_nl: f64, diameter_mm: f64) -> Result<f64, ConversionError> {
        let area = plunger_area_mm2(diameter_mm)?;
        Ok(quantity_nl * NANOLITERS_TO_UL / area * self.correction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::label;
    use proptest::prelude::*;

    fn syringe(diameter: f64) -> SyringeParameters {
        SyringeParameters {
            name: label("test").unwrap(),
            volume_ul: None,
            inner_diameter_mm: diameter,
            upper_limit_mm: 0.0,
            lower_limit_mm: -50.0,
            sweet_spot_mm: -45.0,
        }
    }

    #[test]
    fn test_unit_area_conversion() {
        // d = 2/sqrt(pi) gives a 1 mm² bore
        let diameter = 2.0 / PI.sqrt();
        let converter = VolumetricConverter::new(4.0).unwrap();
        let distance = converter
            .volume_to_distance(1000.0, &syringe(diameter))
            .unwrap();
        assert!((distance - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_flowrate_uses_same_formula() {
        let converter = VolumetricConverter::new(3.89).unwrap();
        let s = syringe(0.46);
        assert_eq!(
            converter.volume_to_distance(50.0, &s),
            converter.flowrate_to_speed(50.0, &s)
        );
    }

    #[test]
    fn test_zero_diameter_rejected() {
        let converter = VolumetricConverter::new(4.0).unwrap();
        assert!(matches!(
            converter.volume_to_distance(100.0, &syringe(0.0)),
            Err(ConversionError::NonPositiveDiameter { .. })
        ));
        assert!(matches!(
            converter.flowrate_to_speed(100.0, &syringe(-1.0)),
            Err(ConversionError::NonPositiveDiameter { .. })
        ));
    }

    #[test]
    fn test_invalid_correction() {
        assert!(VolumetricConverter::new(0.0).is_err());
        assert!(VolumetricConverter::new(f64::NAN).is_err());
        assert_eq!(VolumetricConverter::new(4.16).unwrap().correction(), 4.16);
    }

    proptest! {
        #[test]
        fn prop_distance_is_linear_in_volume(
            volume in 0.0f64..10_000.0,
            diameter in 0.05f64..5.0,
            k in 0.5f64..8.0,
        ) {
            let converter = VolumetricConverter::new(k).unwrap();
            let s = syringe(diameter);
            let single = converter.volume_to_distance(volume, &s).unwrap();
            let double = converter.volume_to_distance(2.0 * volume, &s).unwrap();
            prop_assert!(single >= 0.0);
            prop_assert!((double - 2.0 * single).abs() <= 1e-9 * double.abs().max(1.0));
        }
    }
}
