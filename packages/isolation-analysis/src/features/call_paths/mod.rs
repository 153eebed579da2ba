//! Call-path graph builder
//!
//! Links every UNSAFE allocation site to each call site on its calling
//! context, assigns per-function flag bits, and splits the call sites into
//! entry, exempt and guarded sets.

pub mod application;
pub mod domain;

pub use application::CallPathBuilder;
pub use domain::{CallPathGraph, CallPathNode, CallSiteRole, FunctionDomainRecord};
