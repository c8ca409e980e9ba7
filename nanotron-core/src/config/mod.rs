//! Configuration types
//!
//! Device-agnostic configuration structures. The host loads these from TOML.

pub mod deck;
pub mod types;

pub use deck::*;
pub use types::*;
