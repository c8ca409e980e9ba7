//! Protocol steps
//!
//! A protocol is an ordered list of these steps. Each step blocks until its
//! device effect completes before the next one starts.

use crate::config::Label;
use crate::geometry::{DepthOverride, Point3};
use crate::labware::ComponentId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where a liquid-handling step goes
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Target {
    /// A calibrated well
    Well {
        component: ComponentId,
        nickname: Label,
        #[cfg_attr(feature = "serde", serde(default))]
        depth: DepthOverride,
    },
    /// Coded well description such as `p 1E3`
    Coded { well: Label },
    /// Raw deck coordinates
    Point { location: Point3 },
}

impl Target {
    pub fn well(component: ComponentId, nickname: Label) -> Self {
        Target::Well {
            component,
            nickname,
            depth: DepthOverride::Nominal,
        }
    }
}

/// One protocol step
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "op", rename_all = "snake_case"))]
pub enum ProtocolStep {
    GoToSlot {
        slot: Label,
    },
    GoToWell {
        target: Target,
    },
    AspirateFrom {
        volume_nl: f64,
        target: Target,
        #[cfg_attr(feature = "serde", serde(default))]
        rate_nl_s: Option<f64>,
    },
    DispenseTo {
        volume_nl: f64,
        target: Target,
        #[cfg_attr(feature = "serde", serde(default))]
        rate_nl_s: Option<f64>,
    },
    AirGap {
        #[cfg_attr(feature = "serde", serde(default))]
        volume_nl: Option<f64>,
    },
    SetWashingPositions {
        clean: Target,
        wash: Target,
        waste: Target,
    },
    SetAmountWanted {
        volume_nl: f64,
    },
    StartWash {
        #[cfg_attr(feature = "serde", serde(default))]
        rate_nl_s: Option<f64>,
    },
    MidWash {
        #[cfg_attr(feature = "serde", serde(default))]
        leftover_nl: Option<f64>,
        #[cfg_attr(feature = "serde", serde(default))]
        cushion_1_nl: Option<f64>,
        #[cfg_attr(feature = "serde", serde(default))]
        cushion_2_nl: Option<f64>,
        #[cfg_attr(feature = "serde", serde(default))]
        rate_nl_s: Option<f64>,
    },
    FillSyringe {
        #[cfg_attr(feature = "serde", serde(default))]
        rate_nl_s: Option<f64>,
    },
    OpenLid,
    CloseLid,
    SetLidTemperature {
        celsius: f64,
    },
    SetBlockTemperature {
        celsius: f64,
        #[cfg_attr(feature = "serde", serde(default))]
        hold_minutes: f64,
    },
    DeactivateLid,
    DeactivateBlock,
    DeactivateAll,
    SetTempdeckTemperature {
        celsius: f64,
        #[cfg_attr(feature = "serde", serde(default))]
        hold_minutes: f64,
    },
    DeactivateTempdeck,
    EndOfProtocol,
}

impl ProtocolStep {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolStep::GoToSlot { .. } => "go_to_slot",
            ProtocolStep::GoToWell { .. } => "go_to_well",
            ProtocolStep::AspirateFrom { .. } => "aspirate_from",
            ProtocolStep::DispenseTo { .. } => "dispense_to",
            ProtocolStep::AirGap { .. } => "air_gap",
            ProtocolStep::SetWashingPositions { .. } => "set_washing_positions",
            ProtocolStep::SetAmountWanted { .. } => "set_amount_wanted",
            ProtocolStep::StartWash { .. } => "start_wash",
            ProtocolStep::MidWash { .. } => "mid_wash",
            ProtocolStep::FillSyringe { .. } => "fill_syringe",
            ProtocolStep::OpenLid => "open_lid",
            ProtocolStep::CloseLid => "close_lid",
            ProtocolStep::SetLidTemperature { .. } => "set_lid_temperature",
            ProtocolStep::SetBlockTemperature { .. } => "set_block_temperature",
            ProtocolStep::DeactivateLid => "deactivate_lid",
            ProtocolStep::DeactivateBlock => "deactivate_block",
            ProtocolStep::DeactivateAll => "deactivate_all",
            ProtocolStep::SetTempdeckTemperature { .. } => "set_tempdeck_temperature",
            ProtocolStep::DeactivateTempdeck => "deactivate_tempdeck",
            ProtocolStep::EndOfProtocol => "end_of_protocol",
        }
    }

    /// Check if this step drives the thermal cycler or tempdeck
    pub fn is_thermal(&self) -> bool {
        matches!(
            self,
            ProtocolStep::SetLidTemperature { .. }
                | ProtocolStep::SetBlockTemperature { .. }
                | ProtocolStep::DeactivateLid
                | ProtocolStep::DeactivateBlock
                | ProtocolStep::DeactivateAll
                | ProtocolStep::SetTempdeckTemperature { .. }
                | ProtocolStep::DeactivateTempdeck
        )
    }
}
