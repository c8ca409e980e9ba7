//! Input binding profile
//!
//! Maps input element ids (button, stick direction, hat direction names) to
//! manual commands. Operation names are parsed into [`ManualCommand`] when
//! the profile is built, so an unknown name is caught at load time rather
//! than when the button is pressed.

use core::fmt;
use core::str::FromStr;

use heapless::Vec;
use thiserror::Error;

use crate::config::Label;

/// Maximum bindings per profile
pub const MAX_BINDINGS: usize = 32;

/// Binding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("unknown manual command '{0}'")]
    UnknownCommand(String),
    #[error("input element '{0}' is bound twice")]
    DuplicateElement(String),
    #[error("label '{0}' is too long")]
    LabelTooLong(String),
    #[error("too many bindings (max {MAX_BINDINGS})")]
    TooMany,
}

/// Which step size a command consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Cartesian jog step
    Xyz,
    /// Plunger jog step
    Syringe,
    /// Not a step move
    None,
}

/// Operation bound to an input element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManualCommand {
    MoveLeft,
    MoveRight,
    MoveForward,
    MoveBack,
    ZUp,
    ZDown,
    PlungerUp,
    PlungerDown,
    DoubleStepSize,
    HalveStepSize,
    /// Arm the next homing command
    EnableHoming,
    HomeXyz,
    HomePlunger,
    ToggleSide,
    ReportPosition,
    Stop,
    Nothing,
}

/// Accepted names, including the long-standing aliases
const NAMES: &[(&str, ManualCommand)] = &[
    ("move_left", ManualCommand::MoveLeft),
    ("move_right", ManualCommand::MoveRight),
    ("move_forward", ManualCommand::MoveForward),
    ("move_back", ManualCommand::MoveBack),
    ("z_up", ManualCommand::ZUp),
    ("Z_axis_Up", ManualCommand::ZUp),
    ("z_down", ManualCommand::ZDown),
    ("Z_axis_Down", ManualCommand::ZDown),
    ("plunger_up", ManualCommand::PlungerUp),
    ("plunger_down", ManualCommand::PlungerDown),
    ("double_step_size", ManualCommand::DoubleStepSize),
    ("step_size_up", ManualCommand::DoubleStepSize),
    ("halve_step_size", ManualCommand::HalveStepSize),
    ("step_size_down", ManualCommand::HalveStepSize),
    ("enable_homing", ManualCommand::EnableHoming),
    ("home_xyz", ManualCommand::HomeXyz),
    ("home_all", ManualCommand::HomeXyz),
    ("home_plunger", ManualCommand::HomePlunger),
    ("toggle_side", ManualCommand::ToggleSide),
    ("change_vertical_axis", ManualCommand::ToggleSide),
    ("report_position", ManualCommand::ReportPosition),
    ("report_current_position", ManualCommand::ReportPosition),
    ("stop", ManualCommand::Stop),
    ("nothing", ManualCommand::Nothing),
];

impl ManualCommand {
    /// Canonical name
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, cmd)| *cmd == self)
            .map(|(name, _)| *name)
            .unwrap_or("nothing")
    }

    pub fn step_kind(self) -> StepKind {
        use ManualCommand::*;
        match self {
            MoveLeft | MoveRight | MoveForward | MoveBack | ZUp | ZDown => StepKind::Xyz,
            PlungerUp | PlungerDown => StepKind::Syringe,
            _ => StepKind::None,
        }
    }

    /// Check if this command moves a motor
    pub fn moves(self) -> bool {
        use ManualCommand::*;
        self.step_kind() != StepKind::None || matches!(self, HomeXyz | HomePlunger)
    }
}

impl FromStr for ManualCommand {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, cmd)| *cmd)
            .ok_or_else(|| BindingError::UnknownCommand(s.into()))
    }
}

impl fmt::Display for ManualCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One element binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub element: Label,
    pub command: ManualCommand,
}

/// Read-only element → command table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionBindingProfile {
    bindings: Vec<Binding, MAX_BINDINGS>,
}

impl MotionBindingProfile {
    /// Build a profile from (element, operation name) pairs
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, BindingError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut bindings: Vec<Binding, MAX_BINDINGS> = Vec::new();
        for (element, name) in pairs {
            let command: ManualCommand = name.parse()?;
            if bindings.iter().any(|b| b.element.as_str() == element) {
                return Err(BindingError::DuplicateElement(element.into()));
            }
            let element =
                Label::try_from(element).map_err(|_| BindingError::LabelTooLong(element.into()))?;
            bindings
                .push(Binding { element, command })
                .map_err(|_| BindingError::TooMany)?;
        }
        Ok(Self { bindings })
    }

    /// Gamepad layout used when the configuration has no bindings
    pub fn gamepad() -> Self {
        let pairs = [
            ("L_STICK_LEFT", "move_left"),
            ("L_STICK_RIGHT", "move_right"),
            ("L_STICK_UP", "move_forward"),
            ("L_STICK_DOWN", "move_back"),
            ("Y", "z_up"),
            ("A", "z_down"),
            ("R_STICK_UP", "plunger_up"),
            ("R_STICK_DOWN", "plunger_down"),
            ("RB", "double_step_size"),
            ("LB", "halve_step_size"),
            ("X", "toggle_side"),
            ("B", "report_position"),
            ("HAT_UP", "enable_homing"),
            ("HAT_DOWN", "home_xyz"),
            ("HAT_LEFT", "home_plunger"),
            ("BACK", "stop"),
        ];
        // Static table; every name above is in NAMES
        Self::from_pairs(pairs).unwrap_or_default()
    }

    pub fn lookup(&self, element: &str) -> Option<ManualCommand> {
        self.bindings
            .iter()
            .find(|b| b.element.as_str() == element)
            .map(|b| b.command)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
