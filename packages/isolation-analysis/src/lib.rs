/*
 * Isolation Analysis - Domain-Isolation Pass
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Program model (functions, instructions, pointer values)
 * - features/    : Vertical slices (provenance → call_paths → instrumentation, hardening)
 * - pipeline/    : Orchestration
 * - config/      : Presets, YAML loading, validation
 *
 * The pass decides which allocation sites must be served from the UNSAFE heap
 * domain and plans the flag protocol that tells the runtime selector so.
 */

#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]

//! Domain-isolation analysis pass
//!
//! ```
//! use isolation_analysis::prelude::*;
//!
//! let program = Program::new(ProgramData {
//!     functions: vec![Function { id: FunctionId(0), name: "main".into(), entry_block: BlockId(0) }],
//!     instructions: vec![Instruction {
//!         id: InstId(1),
//!         function: FunctionId(0),
//!         block: BlockId(0),
//!         kind: InstKind::Call { target: CallTarget::Indirect, flavor: CallFlavor::Plain },
//!         marks: vec![],
//!     }],
//!     pointer_values: vec![],
//! })?;
//! let facts = AnalysisFacts::new().with_allocation(InstId(1), vec![]);
//!
//! let report = IsolationPass::new(PassConfig::default())?.run(&program, &facts, MarkBoundaryOracle)?;
//! assert!(report.entries.contains(&InstId(1)));
//! # Ok::<(), isolation_analysis::errors::AnalysisError>(())
//! ```

pub mod benchmark;
pub mod config;
pub mod errors;
pub mod features;
pub mod pipeline;
pub mod shared;

pub use config::{PassConfig, Preset};
pub use errors::{AnalysisError, InvariantViolation, Result};
pub use pipeline::{IsolationPass, PassInput, PassReport};

pub mod prelude {
    pub use crate::config::{ExemptionStrategy, HardeningConfig, PassConfig, Preset};
    pub use crate::errors::{AnalysisError, InvariantViolation};
    pub use crate::features::provenance::{
        AnalysisFacts, BoundaryOracle, MarkBoundaryOracle, PointsToOracle,
    };
    pub use crate::pipeline::{AnalysisContext, IsolationPass, PassInput, PassReport};
    pub use crate::shared::models::*;
}
