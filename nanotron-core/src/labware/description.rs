//! Coded well descriptions
//!
//! Protocols refer to wells with a compact code: the kind tag, a space, the
//! per-kind component index, then the well nickname. `p 1E3` is well `E3` of
//! the second plate; `c 0A1` is well `A1` of the first chip.

use core::fmt;
use core::str::FromStr;

use crate::config::{Label, LabwareKind};

use super::{ComponentId, LabwareError};

/// Parsed well description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellDescription {
    pub component: ComponentId,
    pub nickname: Label,
}

impl WellDescription {
    pub fn parse(s: &str) -> Result<Self, LabwareError> {
        let malformed = || LabwareError::MalformedDescription(s.into());

        let s_trim = s.trim();
        let mut chars = s_trim.chars();
        let kind = chars
            .next()
            .and_then(LabwareKind::from_tag)
            .ok_or_else(malformed)?;

        let rest = chars.as_str().trim_start();
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 || digits == rest.len() {
            return Err(malformed());
        }
        let (index, nickname) = rest.split_at(digits);
        let index: usize = index.parse().map_err(|_| malformed())?;
        let nickname = Label::try_from(nickname).map_err(|_| malformed())?;

        Ok(Self {
            component: ComponentId { kind, index },
            nickname,
        })
    }
}

impl FromStr for WellDescription {
    type Err = LabwareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WellDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}",
            self.component.kind.tag(),
            self.component.index,
            self.nickname
        )
    }
}
