//! Configuration loading and validation

use std::path::Path;

use nanotron_core::liquid::VolumetricConverter;
use nanotron_core::manual::MotionBindingProfile;
use tracing::{debug, info};

use super::MachineConfig;
use crate::error::{CoordinatorError, Result};

/// Read, parse and validate a machine configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<MachineConfig> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading machine configuration");
    let text = std::fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    log_config_summary(&config);
    Ok(config)
}

/// Parse and validate configuration text
pub fn parse_config(text: &str) -> Result<MachineConfig> {
    let config: MachineConfig = toml::from_str(text)?;
    validate(&config)?;
    Ok(config)
}

/// Check cross-field constraints that deserialization cannot express
pub fn validate(config: &MachineConfig) -> Result<()> {
    VolumetricConverter::new(config.conversion.unit_conversion)?;

    if !config.thermal.limits.is_valid() {
        return Err(CoordinatorError::configuration(
            "thermal ranges must be finite and non-empty",
        ));
    }
    let ramp = &config.thermal.ramp;
    if ramp.tolerance_c <= 0.0
        || ramp.ramp_poll_s == 0
        || ramp.hold_poll_s == 0
        || ramp.ramp_timeout_s == 0
    {
        return Err(CoordinatorError::configuration(
            "thermal tolerance, poll intervals and ramp timeout must be positive",
        ));
    }

    let deck = &config.deck;
    for id in std::iter::once(&deck.lid_park)
        .chain(std::iter::once(&deck.end_park))
        .chain(deck.lid_gated.iter())
    {
        if !deck.slots.iter().any(|slot| slot.id == *id) {
            return Err(CoordinatorError::configuration(format!(
                "deck references unknown slot '{id}'"
            )));
        }
    }
    if deck.lid_gated.contains(&deck.lid_park) {
        return Err(CoordinatorError::configuration(format!(
            "lid park slot '{}' cannot itself be lid gated",
            deck.lid_park
        )));
    }

    let limits = &config.motion.limits;
    for (name, axis) in [
        ("x", limits.x),
        ("y", limits.y),
        ("z", limits.z),
        ("plunger", limits.plunger),
    ] {
        if !axis.min.is_finite() || !axis.max.is_finite() || axis.min >= axis.max {
            return Err(CoordinatorError::configuration(format!(
                "{name} travel range is empty"
            )));
        }
    }
    let speeds = &config.motion.speeds;
    if [speeds.slow, speeds.medium, speeds.high].iter().any(|s| *s <= 0.0) {
        return Err(CoordinatorError::configuration(
            "speed tiers must be positive",
        ));
    }

    for (i, syringe) in config.syringes.iter().enumerate() {
        if !syringe.is_valid() {
            return Err(CoordinatorError::configuration(format!(
                "syringe '{}' needs a positive diameter and lower < sweet spot <= upper",
                syringe.name
            )));
        }
        if config.syringes[..i].iter().any(|s| s.name == syringe.name) {
            return Err(CoordinatorError::configuration(format!(
                "syringe '{}' defined twice",
                syringe.name
            )));
        }
    }
    if let Some(name) = &config.devices.syringe {
        if config.syringe(name).is_none() {
            return Err(CoordinatorError::configuration(format!(
                "selected syringe '{name}' is not defined"
            )));
        }
    }

    if !config.manual.jog.is_valid() || config.manual.dispatch_ms == 0 {
        return Err(CoordinatorError::configuration(
            "manual step bounds, speeds and cadence must be positive",
        ));
    }
    binding_profile(config)?;

    Ok(())
}

/// Parse the binding table, falling back to the gamepad layout when empty
pub fn binding_profile(config: &MachineConfig) -> Result<MotionBindingProfile> {
    if config.bindings.is_empty() {
        return Ok(MotionBindingProfile::gamepad());
    }
    let pairs = config
        .bindings
        .iter()
        .map(|(element, name)| (element.as_str(), name.as_str()));
    Ok(MotionBindingProfile::from_pairs(pairs)?)
}

fn log_config_summary(config: &MachineConfig) {
    info!(
        unit_conversion = config.conversion.unit_conversion,
        slots = config.deck.slots.len(),
        syringes = config.syringes.len(),
        thermocycler = config.devices.thermocycler_port.is_some(),
        tempdeck = config.devices.tempdeck_port.is_some(),
        "configuration loaded"
    );
    for syringe in &config.syringes {
        debug!(
            name = %syringe.name,
            diameter_mm = syringe.inner_diameter_mm,
            lower_mm = syringe.lower_limit_mm,
            upper_mm = syringe.upper_limit_mm,
            "syringe model"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[conversion]
unit_conversion = 4.0
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.conversion.unit_conversion, 4.0);
        assert_eq!(config.deck.slots.len(), 11);
        assert_eq!(config.deck.lid_park.as_str(), "5");
        assert_eq!(config.deck.end_park.as_str(), "3");
        assert_eq!(config.motion.slot_height_mm, 150.0);
        assert_eq!(config.thermal.ramp.ramp_poll_s, 5);
        assert_eq!(config.wash.volumes.cushion_2_nl, 300.0);
        assert_eq!(config.manual.dispatch_ms, 100);
        assert_eq!(binding_profile(&config).unwrap().len(), 16);
    }

    #[test]
    fn test_missing_conversion_rejected() {
        assert!(matches!(
            parse_config("[motion]\nlift_clearance_mm = 30.0\n"),
            Err(CoordinatorError::Toml(_))
        ));
    }

    #[test]
    fn test_non_positive_conversion_rejected() {
        assert!(matches!(
            parse_config("[conversion]\nunit_conversion = 0.0\n"),
            Err(CoordinatorError::Conversion(_))
        ));
    }

    #[test]
    fn test_unknown_binding_rejected() {
        let text = format!("{MINIMAL}\n[bindings]\nA = \"fly_away\"\n");
        assert!(matches!(
            parse_config(&text),
            Err(CoordinatorError::Binding(_))
        ));
    }

    #[test]
    fn test_gated_slot_must_exist() {
        let text = format!("{MINIMAL}\n[deck]\nlid_gated = [\"7\", \"12\"]\n");
        assert!(matches!(
            parse_config(&text),
            Err(CoordinatorError::Configuration(_))
        ));
    }

    #[test]
    fn test_lid_park_cannot_be_gated() {
        let text = format!("{MINIMAL}\n[deck]\nlid_gated = [\"5\", \"7\"]\n");
        assert!(matches!(
            parse_config(&text),
            Err(CoordinatorError::Configuration(_))
        ));
    }

    #[test]
    fn test_syringe_order_checked() {
        let text = format!(
            "{MINIMAL}\n[[syringe]]\nname = \"bad\"\ninner_diameter_mm = 1.0\n\
             upper_limit_mm = 0.0\nlower_limit_mm = -50.0\nsweet_spot_mm = 5.0\n"
        );
        assert!(matches!(
            parse_config(&text),
            Err(CoordinatorError::Configuration(_))
        ));
    }

    #[test]
    fn test_thermal_section_flattened() {
        let text = format!(
            "{MINIMAL}\n[thermal]\nramp_timeout_s = 60\nblock = {{ min_c = 10.0, max_c = 90.0 }}\n"
        );
        let config = parse_config(&text).unwrap();
        assert_eq!(config.thermal.ramp.ramp_timeout_s, 60);
        assert_eq!(config.thermal.ramp.hold_poll_s, 30);
        assert_eq!(config.thermal.limits.block.max_c, 90.0);
        assert_eq!(config.thermal.limits.lid.max_c, 110.0);
    }

    #[test]
    fn test_zero_thermal_intervals_rejected() {
        for field in ["hold_poll_s", "ramp_timeout_s", "ramp_poll_s"] {
            let text = format!("{MINIMAL}\n[thermal]\n{field} = 0\n");
            assert!(
                matches!(parse_config(&text), Err(CoordinatorError::Configuration(_))),
                "{field} = 0 accepted"
            );
        }
    }
}
