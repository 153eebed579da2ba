//! Error types for isolation-analysis
//!
//! Every stage returns [`Result`]. An [`InvariantViolation`] means the input
//! program or the external analysis facts are inconsistent; the pass stops
//! at the first one and nothing is emitted.

use crate::config::ConfigError;
use crate::shared::models::{FunctionId, InstId};
use thiserror::Error;

/// Inconsistency between the program model, the analysis facts and the
/// call-path graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// An allocation location or context entry is not a call instruction
    #[error("instruction {0} is not a call site")]
    NotACallSite(InstId),

    #[error("unknown instruction {0}")]
    UnknownInstruction(InstId),

    #[error("unknown function {0}")]
    UnknownFunction(FunctionId),

    /// Graph query on a call site that has no call-path node
    #[error("call site {0} has no call-path node")]
    UnknownCallSite(InstId),

    /// A function has more unsafe call sites than the flag register has bits
    #[error("function {function} needs more than {max} flag bits")]
    FlagBitsExhausted { function: FunctionId, max: u32 },

    /// Two program entities share an identifier
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u32 },
}

/// Main error type for isolation-analysis operations
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Invariant violations abort the pass; they are never retried
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::Invariant(_))
    }
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
