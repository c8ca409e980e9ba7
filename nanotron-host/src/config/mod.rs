//! Machine configuration
//!
//! Deserialized from a TOML file. Every section except `[conversion]` has
//! defaults matching the stock machine.

pub mod loader;

use std::collections::BTreeMap;
use std::time::Duration;

use nanotron_core::config::{label, DeckMap, DeckSlot, Label, SyringeParameters, WashVolumes};
use nanotron_core::manual::JogSettings;
use nanotron_core::motion::MotionConfig;
use nanotron_core::protocol::RampHoldConfig;
use nanotron_core::safety::ThermalLimits;
use serde::{Deserialize, Serialize};

pub use loader::{binding_profile, load_config, parse_config, validate};

/// Complete machine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub deck: DeckConfig,
    #[serde(default)]
    pub thermal: ThermalConfig,
    #[serde(default, rename = "syringe")]
    pub syringes: Vec<SyringeParameters>,
    #[serde(default)]
    pub wash: WashConfig,
    #[serde(default)]
    pub manual: ManualConfig,
    /// Input element id → operation name; empty means the gamepad layout
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
    #[serde(default)]
    pub devices: DevicesConfig,
}

impl MachineConfig {
    /// Look up a syringe model by name
    pub fn syringe(&self, name: &str) -> Option<&SyringeParameters> {
        self.syringes.iter().find(|s| s.name.as_str() == name)
    }
}

/// Volume to plunger travel correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Empirical correction factor K; hardware specific, no default
    pub unit_conversion: f64,
}

/// Deck slots and lid gating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub slots: Vec<DeckSlot>,
    pub lid_gated: Vec<Label>,
    pub lid_park: Label,
    pub end_park: Label,
}

impl Default for DeckConfig {
    fn default() -> Self {
        let slot = |id: &str, x: f64, y: f64| {
            label(id).map(|id| DeckSlot { id, x, y })
        };
        let slots = [
            slot("1", 63.88, 42.74),
            slot("2", 196.38, 42.74),
            slot("3", 328.88, 42.74),
            slot("4", 63.88, 133.24),
            slot("5", 196.38, 133.24),
            slot("6", 328.88, 133.24),
            slot("7", 63.88, 223.74),
            slot("8", 196.38, 223.74),
            slot("9", 328.88, 223.74),
            slot("10", 63.88, 314.24),
            slot("11", 196.38, 314.24),
        ];
        Self {
            slots: slots.into_iter().flatten().collect(),
            lid_gated: ["7", "8", "10", "11"].into_iter().filter_map(label).collect(),
            lid_park: label("5").unwrap_or_default(),
            end_park: label("3").unwrap_or_default(),
        }
    }
}

impl From<DeckConfig> for DeckMap {
    fn from(config: DeckConfig) -> Self {
        DeckMap {
            slots: config.slots,
            lid_gated: config.lid_gated,
            lid_park: config.lid_park,
            end_park: config.end_park,
        }
    }
}

/// Ramp/hold timing and accepted set-point ranges
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThermalConfig {
    #[serde(flatten)]
    pub ramp: RampHoldConfig,
    #[serde(flatten)]
    pub limits: ThermalLimits,
}

/// Wash defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WashConfig {
    #[serde(flatten)]
    pub volumes: WashVolumes,
    /// Plunger flow rate for wash steps (nL/s)
    pub default_rate_nl_s: f64,
}

impl Default for WashConfig {
    fn default() -> Self {
        Self {
            volumes: WashVolumes::default(),
            default_rate_nl_s: 50.0,
        }
    }
}

/// Manual control timing and initial jog settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualConfig {
    /// Dispatch cadence (ms)
    pub dispatch_ms: u64,
    /// Coordinate telemetry refresh interval (ms)
    pub coordinate_refresh_ms: u64,
    #[serde(flatten)]
    pub jog: JogSettings,
}

impl Default for ManualConfig {
    fn default() -> Self {
        Self {
            dispatch_ms: 100,
            coordinate_refresh_ms: 500,
            jog: JogSettings::default(),
        }
    }
}

impl ManualConfig {
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_ms)
    }
}

/// Attached devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    pub motor_port: String,
    /// Thermal cycler port; absent when no cycler is fitted
    pub thermocycler_port: Option<String>,
    /// Tempdeck port; absent when no tempdeck is fitted
    pub tempdeck_port: Option<String>,
    /// Syringe model selected at startup
    pub syringe: Option<String>,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            motor_port: "/dev/ttyACM0".into(),
            thermocycler_port: None,
            tempdeck_port: None,
            syringe: None,
        }
    }
}
