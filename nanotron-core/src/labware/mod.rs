//! Labware registry
//!
//! Calibrated chips and plates, the selected syringe model, and the coded
//! well descriptions used by protocols.

pub mod description;
pub mod record;
pub mod registry;

pub use description::WellDescription;
pub use record::{ComponentRecord, LabwareSetup};
pub use registry::{CalibratedComponent, ComponentId, LabwareError, LabwareRegistry};
