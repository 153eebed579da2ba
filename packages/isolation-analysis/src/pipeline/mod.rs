//! Pass orchestration
//!
//! Stages run in a fixed order over one shared [`AnalysisContext`]:
//! classify → build call paths → plan instrumentation → plan hardening.

pub mod orchestrator;
pub mod result;

pub use orchestrator::IsolationPass;
pub use result::{PassInput, PassReport, PassStats};

use crate::config::PassConfig;
use crate::shared::models::Program;

/// Read-only state shared by every stage
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub program: &'a Program,
    pub config: &'a PassConfig,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(program: &'a Program, config: &'a PassConfig) -> Self {
        Self { program, config }
    }
}
