//! State machines
//!
//! The thermal cycler lid state, tracked by the coordinator rather than the
//! device.

pub mod lid;

pub use lid::{LidEvent, LidState};
