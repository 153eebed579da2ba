//! Unsafe-provenance classification
//!
//! Turns the external dataflow engine's results into UNSAFE allocation sites
//! (with their calling contexts), stack objects that must be relocated, and
//! pointer values that cross the safety boundary.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::ProvenanceClassifier;
pub use domain::{
    AllocationSite, Classification, ReachableAllocation, RelocationReason, SiteClass, StackClass,
};
pub use infrastructure::{AnalysisFacts, MarkBoundaryOracle};
pub use ports::{BoundaryOracle, PointsToOracle};
