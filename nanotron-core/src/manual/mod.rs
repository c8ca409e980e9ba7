//! Manual control
//!
//! Input binding profile and the jog settings it mutates.

pub mod binding;
pub mod jog;

pub use binding::{Binding, BindingError, ManualCommand, MotionBindingProfile, StepKind};
pub use jog::JogSettings;
