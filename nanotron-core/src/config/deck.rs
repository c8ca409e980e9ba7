//! Deck layout
//!
//! Slot centers, the slots that sit under the thermal cycler lid, and the
//! park slots used by lid operations and protocol shutdown.

use crate::config::types::Label;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One deck slot
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeckSlot {
    pub id: Label,
    /// Slot center in deck coordinates (mm)
    pub x: f64,
    pub y: f64,
}

/// Deck slot map
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeckMap {
    pub slots: Vec<DeckSlot>,
    /// Slots under the thermal cycler lid
    #[cfg_attr(feature = "serde", serde(default))]
    pub lid_gated: Vec<Label>,
    /// Where the head parks while the lid moves
    pub lid_park: Label,
    /// Where the head parks at the end of a protocol
    pub end_park: Label,
}

impl DeckMap {
    pub fn slot(&self, id: &str) -> Option<&DeckSlot> {
        self.slots.iter().find(|slot| slot.id.as_str() == id)
    }

    /// Check if reaching `id` requires an open lid
    pub fn is_lid_gated(&self, id: &str) -> bool {
        self.lid_gated.iter().any(|gated| gated.as_str() == id)
    }

    /// Check that every referenced slot exists; returns the first missing id
    pub fn missing_slot(&self) -> Option<&Label> {
        core::iter::once(&self.lid_park)
            .chain(core::iter::once(&self.end_park))
            .chain(self.lid_gated.iter())
            .find(|id| self.slot(id).is_none())
    }
}
