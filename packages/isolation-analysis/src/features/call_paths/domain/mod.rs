//! Call-path graph and per-function bit records

mod graph;
mod record;

pub use graph::{CallPathGraph, CallPathNode, CallSiteRole};
pub use record::FunctionDomainRecord;
