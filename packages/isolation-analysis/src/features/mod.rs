//! Pass features
//!
//! Each feature follows the same layout: `domain` (pure types),
//! `application` (the stage itself), plus `ports`/`infrastructure` where the
//! stage depends on something outside the pass.

pub mod call_paths;
pub mod hardening;
pub mod instrumentation;
pub mod provenance;
