//! Flag instrumentation
//!
//! Emits, per function, the read/compute/store/reset sequence around each
//! guarded unsafe call site and the unconditional store before each entry
//! call site.

pub mod application;
pub mod domain;

pub use application::FlagInstrumenter;
pub use domain::{FlagOp, FunctionPlan, InstrumentationPlan, ResetPoint, ScratchSlot, SlotId};
