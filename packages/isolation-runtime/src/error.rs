//! Error types for isolation-runtime
//!
//! Allocation entry points never surface these: a failed request is a null pointer,
//! exactly as the heap primitive reports it. `RuntimeError` exists for the layers
//! underneath (heap creation, bootstrap buffer claims) so they can be logged and
//! tested before being flattened to null.

use std::fmt;
use thiserror::Error;

/// Runtime error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The heap primitive refused to create a heap instance
    HeapCreation,
    /// A request could not be served from the bootstrap buffer
    Bootstrap,
    /// Invalid pool or allocator configuration
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::HeapCreation => "heap_creation",
            ErrorKind::Bootstrap => "bootstrap",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn heap_creation(domain: impl fmt::Display, index: usize) -> Self {
        Self::new(
            ErrorKind::HeapCreation,
            format!("heap primitive returned no heap for {}[{}]", domain, index),
        )
    }

    pub fn bootstrap_overflow(requested: usize, capacity: usize) -> Self {
        Self::new(
            ErrorKind::Bootstrap,
            format!(
                "request of {} bytes exceeds bootstrap buffer of {} bytes",
                requested, capacity
            ),
        )
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RuntimeError>;
