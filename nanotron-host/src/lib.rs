//! Host runtime for the liquid-handling robot coordinator
//!
//! Builds on `nanotron-core` with everything that needs std:
//!
//! - Per-device exclusive access and cancellation tokens
//! - Motion sequencer (safe moves, lid gating, liquid handling)
//! - Device synchronizer (temperature ramp/hold, wash cycles)
//! - Manual control loop (input thread + paced dispatch)
//! - Protocol scripts, labware setup files and TOML machine configuration
//! - The owned coordinator context tying these together

#![deny(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod labware_store;
pub mod manual;
pub mod protocol;
pub mod sequencer;
pub mod synchronizer;
pub mod telemetry;

pub use coordinator::{Coordinator, DeviceSet, SettingUpdate, Settings, StoredModels};
pub use error::{CoordinatorError, Result};
