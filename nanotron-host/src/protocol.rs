//! Protocol scripts
//!
//! A script is a TOML file with a name and an ordered `[[step]]` list:
//!
//! ```toml
//! name = "mix"
//!
//! [[step]]
//! op = "go_to_slot"
//! slot = "3"
//!
//! [[step]]
//! op = "aspirate_from"
//! volume_nl = 500.0
//! target = { well = "p 0A1" }
//! ```
//!
//! Steps run strictly in order; each one finishes its device effect before
//! the next starts. The first failure stops the run.

use std::path::Path;
use std::time::Duration;

use nanotron_core::protocol::{ProtocolStep, Target};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::coordinator::Coordinator;
use crate::error::{CoordinatorError, Result};

/// An ordered list of protocol steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolScript {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub step: Vec<ProtocolStep>,
}

impl ProtocolScript {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let script = Self::parse(&std::fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            name = %script.name,
            steps = script.step.len(),
            "protocol loaded"
        );
        Ok(script)
    }

    /// Execute every step in order against `coordinator`
    ///
    /// Errors carry the index and name of the failing step.
    pub fn run(&self, coordinator: &mut Coordinator) -> Result<usize> {
        info!(name = %self.name, steps = self.step.len(), "protocol started");
        for (index, step) in self.step.iter().enumerate() {
            info!(index, step = step.name(), "step");
            if let Err(e) = run_step(coordinator, step) {
                error!(index, step = step.name(), error = %e, "protocol stopped");
                return Err(CoordinatorError::Step {
                    index,
                    name: step.name(),
                    source: Box::new(e),
                });
            }
        }
        info!(name = %self.name, "protocol finished");
        Ok(self.step.len())
    }
}

fn minutes(what: &'static str, value: f64) -> Result<Duration> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(CoordinatorError::InvalidQuantity { what, value });
    }
    Ok(Duration::from_secs_f64(value * 60.0))
}

fn run_step(coordinator: &mut Coordinator, step: &ProtocolStep) -> Result<()> {
    let default_rate = coordinator.config().motion.default_rate_nl_s;
    let sync = coordinator.synchronizer_mut();

    match step {
        ProtocolStep::GoToSlot { slot } => {
            sync.sequencer_mut().go_to_deck_slot(slot)?;
        }
        ProtocolStep::GoToWell { target } => {
            sync.sequencer_mut().go_to_target(target)?;
        }
        ProtocolStep::AspirateFrom {
            volume_nl,
            target,
            rate_nl_s,
        } => {
            let sequencer = sync.sequencer_mut();
            let location = sequencer.resolve_target(target)?;
            sequencer.aspirate_from(*volume_nl, location, rate_nl_s.unwrap_or(default_rate))?;
        }
        ProtocolStep::DispenseTo {
            volume_nl,
            target,
            rate_nl_s,
        } => {
            let sequencer = sync.sequencer_mut();
            let location = sequencer.resolve_target(target)?;
            sequencer.dispense_to(*volume_nl, location, rate_nl_s.unwrap_or(default_rate))?;
        }
        ProtocolStep::AirGap { volume_nl } => sync.sequencer_mut().air_gap(*volume_nl)?,
        ProtocolStep::SetWashingPositions { clean, wash, waste } => {
            let resolve = |target: &Target| sync.sequencer().resolve_target(target);
            let (clean, wash, waste) = (resolve(clean)?, resolve(wash)?, resolve(waste)?);
            sync.set_washing_positions(clean, wash, waste);
        }
        ProtocolStep::SetAmountWanted { volume_nl } => {
            if !(volume_nl.is_finite() && *volume_nl >= 0.0) {
                return Err(CoordinatorError::InvalidQuantity {
                    what: "volume_nl",
                    value: *volume_nl,
                });
            }
            sync.set_amount_wanted(*volume_nl);
        }
        ProtocolStep::StartWash { rate_nl_s } => sync.start_wash(*rate_nl_s)?,
        ProtocolStep::MidWash {
            leftover_nl,
            cushion_1_nl,
            cushion_2_nl,
            rate_nl_s,
        } => sync.mid_wash(*leftover_nl, *cushion_1_nl, *cushion_2_nl, *rate_nl_s)?,
        ProtocolStep::FillSyringe { rate_nl_s } => sync.fill_syringe_with_water(*rate_nl_s)?,
        ProtocolStep::OpenLid => {
            sync.sequencer_mut().open_lid()?;
        }
        ProtocolStep::CloseLid => {
            sync.sequencer_mut().close_lid()?;
        }
        ProtocolStep::SetLidTemperature { celsius } => sync.set_lid_temperature(*celsius)?,
        ProtocolStep::SetBlockTemperature {
            celsius,
            hold_minutes,
        } => sync.set_block_temperature(*celsius, minutes("hold_minutes", *hold_minutes)?)?,
        ProtocolStep::DeactivateLid => sync.deactivate_lid()?,
        ProtocolStep::DeactivateBlock => sync.deactivate_block()?,
        ProtocolStep::DeactivateAll => sync.deactivate_all()?,
        ProtocolStep::SetTempdeckTemperature {
            celsius,
            hold_minutes,
        } => sync.set_tempdeck_temperature(*celsius, minutes("hold_minutes", *hold_minutes)?)?,
        ProtocolStep::DeactivateTempdeck => sync.deactivate_tempdeck()?,
        ProtocolStep::EndOfProtocol => coordinator.end_of_protocol()?,
    }
    Ok(())
}

/// Check a script against the coordinator without touching devices
///
/// Reports steps whose targets do not resolve or that need a device the
/// machine does not have.
pub fn preflight(script: &ProtocolScript, coordinator: &Coordinator) -> Vec<(usize, String)> {
    let sequencer = coordinator.sequencer();
    let mut problems = Vec::new();
    for (index, step) in script.step.iter().enumerate() {
        let targets: Vec<&Target> = match step {
            ProtocolStep::GoToWell { target }
            | ProtocolStep::AspirateFrom { target, .. }
            | ProtocolStep::DispenseTo { target, .. } => vec![target],
            ProtocolStep::SetWashingPositions { clean, wash, waste } => vec![clean, wash, waste],
            _ => Vec::new(),
        };
        for target in targets {
            if let Err(e) = sequencer.resolve_target(target) {
                problems.push((index, e.to_string()));
            }
        }
        if let ProtocolStep::GoToSlot { slot } = step {
            if sequencer.deck().slot(slot).is_none() {
                problems.push((index, format!("unknown deck slot '{slot}'")));
            }
        }
        let needs_cycler = matches!(
            step,
            ProtocolStep::OpenLid
                | ProtocolStep::CloseLid
                | ProtocolStep::SetLidTemperature { .. }
                | ProtocolStep::SetBlockTemperature { .. }
                | ProtocolStep::DeactivateLid
                | ProtocolStep::DeactivateBlock
                | ProtocolStep::DeactivateAll
        );
        if needs_cycler && sequencer.thermocycler().is_none() {
            problems.push((index, "no thermal cycler attached".into()));
        }
        let needs_tempdeck = matches!(
            step,
            ProtocolStep::SetTempdeckTemperature { .. } | ProtocolStep::DeactivateTempdeck
        );
        if needs_tempdeck && coordinator.synchronizer().tempdeck().is_none() {
            problems.push((index, "no tempdeck attached".into()));
        }
    }
    for (index, problem) in &problems {
        warn!(index, problem = problem.as_str(), "preflight");
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = ProtocolScript::parse(
            r#"
name = "demo"

[[step]]
op = "go_to_slot"
slot = "3"

[[step]]
op = "aspirate_from"
volume_nl = 500.0
target = { location = [10.0, 20.0, 30.0] }

[[step]]
op = "set_block_temperature"
celsius = 95.0
hold_minutes = 2.0

[[step]]
op = "end_of_protocol"
"#,
        )
        .unwrap();

        assert_eq!(script.name, "demo");
        assert_eq!(script.step.len(), 4);
        assert_eq!(script.step[1].name(), "aspirate_from");
        assert!(matches!(
            &script.step[1],
            ProtocolStep::AspirateFrom {
                target: Target::Point { .. },
                rate_nl_s: None,
                ..
            }
        ));
        assert_eq!(script.step[3], ProtocolStep::EndOfProtocol);
    }

    #[test]
    fn test_unknown_op_rejected() {
        let result = ProtocolScript::parse("[[step]]\nop = \"teleport\"\n");
        assert!(matches!(result, Err(CoordinatorError::Toml(_))));
    }

    #[test]
    fn test_negative_hold_rejected() {
        assert!(minutes("hold_minutes", -1.0).is_err());
        assert_eq!(minutes("hold_minutes", 0.5).unwrap(), Duration::from_secs(30));
    }
}
