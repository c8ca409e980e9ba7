//! Manual input device trait

use crate::config::Label;

use super::DriverError;

/// One event from a manual input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Button(Label),
    /// Stick direction past its dead zone, e.g. `L_STICK_LEFT`
    Axis(Label),
    Hat(Label),
    /// Device closed or unplugged; no further events
    Closed,
}

impl InputEvent {
    /// Element id used for binding lookup
    pub fn element(&self) -> Option<&str> {
        match self {
            InputEvent::Button(id) | InputEvent::Axis(id) | InputEvent::Hat(id) => {
                Some(id.as_str())
            }
            InputEvent::Closed => None,
        }
    }
}

/// Trait for joystick/keyboard style input devices
pub trait InputSource: Send {
    /// Return the next pending event, or `None` if nothing is pending
    fn poll(&mut self) -> Result<Option<InputEvent>, DriverError>;
}
