//! Manual input drivers

pub mod scripted;

pub use scripted::ScriptedInput;
