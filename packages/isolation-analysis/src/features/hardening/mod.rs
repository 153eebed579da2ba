//! Auxiliary pointer hardening
//!
//! Masks boundary-crossing store pointers and smart-pointer shadow
//! addresses, and drops marker loads the front end left behind.

pub mod application;
pub mod domain;

pub use application::HardeningPlanner;
pub use domain::{HardeningPlan, RewriteOp};
