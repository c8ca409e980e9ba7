//! Syringe wash scripts
//!
//! Each wash is a fixed ordered list of steps over the three wash stations.
//! The plunger's lower limit is an empty syringe and its upper limit a full
//! one.

use crate::config::{SyringeParameters, WashPositions};
use crate::geometry::Point3;

/// One wash step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WashStep {
    /// Safe move to a station
    MoveTo(Point3),
    /// Absolute plunger coordinate (mm)
    MovePlunger(f64),
    /// Draw a volume (nL)
    Aspirate(f64),
    /// Expel a volume (nL)
    Dispense(f64),
    /// Lift and draw an air gap (nL)
    AirGap(f64),
}

/// Initial wash, run once at protocol start
pub fn start_wash(
    positions: &WashPositions,
    syringe: &SyringeParameters,
    air_gap_nl: f64,
) -> Vec<WashStep> {
    vec![
        WashStep::MoveTo(positions.waste),
        WashStep::MovePlunger(syringe.lower_limit_mm),
        WashStep::MoveTo(positions.wash),
        WashStep::MovePlunger(syringe.upper_limit_mm),
        WashStep::MovePlunger(syringe.lower_limit_mm),
        WashStep::MoveTo(positions.clean),
        WashStep::MovePlunger(syringe.sweet_spot_mm),
        WashStep::AirGap(air_gap_nl),
    ]
}

/// Volumes for a wash between two liquids
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidWashVolumes {
    pub leftover_nl: f64,
    pub cushion_1_nl: f64,
    pub cushion_2_nl: f64,
    pub amount_wanted_nl: f64,
}

/// Wash between distinct liquids within a protocol
pub fn mid_wash(
    positions: &WashPositions,
    syringe: &SyringeParameters,
    volumes: &MidWashVolumes,
    air_gap_nl: f64,
) -> Vec<WashStep> {
    vec![
        WashStep::MoveTo(positions.waste),
        WashStep::Dispense(volumes.leftover_nl),
        WashStep::MoveTo(positions.wash),
        WashStep::Aspirate(volumes.amount_wanted_nl + volumes.cushion_1_nl),
        WashStep::Dispense(volumes.amount_wanted_nl + volumes.cushion_2_nl),
        WashStep::MoveTo(positions.clean),
        WashStep::MovePlunger(syringe.sweet_spot_mm),
        WashStep::AirGap(air_gap_nl),
    ]
}

/// Fill the syringe with clean water before the machine sits idle
pub fn fill_syringe_with_water(
    positions: &WashPositions,
    syringe: &SyringeParameters,
) -> Vec<WashStep> {
    vec![
        WashStep::MoveTo(positions.clean),
        WashStep::MovePlunger(syringe.upper_limit_mm),
    ]
}
