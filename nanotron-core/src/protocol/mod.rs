//! Protocol building blocks
//!
//! Temperature ramp/hold tracking, wash scripts and the step model that
//! protocol scripts are made of.

pub mod step;
pub mod temperature;
pub mod wash;

pub use step::{ProtocolStep, Target};
pub use temperature::{PollAction, RampHold, RampHoldConfig, RampHoldPhase};
pub use wash::{fill_syringe_with_water, mid_wash, start_wash, MidWashVolumes, WashStep};
