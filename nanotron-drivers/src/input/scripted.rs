//! Scripted input device
//!
//! Replays a fixed list of events, then reports the device as closed.

use std::collections::VecDeque;

use nanotron_core::config::Label;
use nanotron_core::traits::{DriverError, InputEvent, InputSource};

/// Input source backed by a queue of events
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: VecDeque<InputEvent>,
    close_when_empty: bool,
    closed: bool,
}

impl ScriptedInput {
    /// Replay `events`, then close
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            close_when_empty: true,
            closed: false,
        }
    }

    /// Replay `events`, then stay open and idle
    pub fn open_ended(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            close_when_empty: false,
            ..Self::new(events)
        }
    }

    /// Button presses by element id; ids that do not fit a label are skipped
    pub fn buttons<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(
            ids.into_iter()
                .filter_map(|id| Label::try_from(id).ok())
                .map(InputEvent::Button),
        )
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Result<Option<InputEvent>, DriverError> {
        if self.closed {
            return Ok(None);
        }
        match self.events.pop_front() {
            Some(InputEvent::Closed) => {
                self.closed = true;
                Ok(Some(InputEvent::Closed))
            }
            Some(event) => Ok(Some(event)),
            None if self.close_when_empty => {
                self.closed = true;
                Ok(Some(InputEvent::Closed))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_then_closes() {
        let mut input = ScriptedInput::buttons(["A", "B"]);
        assert_eq!(input.poll().unwrap().as_ref().and_then(|e| e.element()), Some("A"));
        assert_eq!(input.poll().unwrap().as_ref().and_then(|e| e.element()), Some("B"));
        assert_eq!(input.poll().unwrap(), Some(InputEvent::Closed));
        assert_eq!(input.poll().unwrap(), None);
    }

    #[test]
    fn test_open_ended_stays_idle() {
        let mut input = ScriptedInput::open_ended([]);
        assert_eq!(input.poll().unwrap(), None);
        assert_eq!(input.poll().unwrap(), None);
    }
}
