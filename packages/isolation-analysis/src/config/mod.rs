//! Pass configuration
//!
//! Two levels:
//! - Preset: `PassConfig::preset(Preset::Standard)`
//! - YAML: `PassConfig::from_yaml("isolation.yaml")` (schema `version: 1`,
//!   a base preset plus field overrides)
//!
//! Every loaded configuration is validated before use.

pub mod error;
pub mod io;
pub mod pass_config;
pub mod preset;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigExportV1, HardeningOverrides, PassOverrides};
pub use pass_config::{
    ExemptionStrategy, HardeningConfig, PassConfig, DEFAULT_FLAG_SYMBOL, DEFAULT_TYPE_TAG_SYMBOL,
    FLAG_REGISTER_BITS,
};
pub use preset::Preset;
pub use validation::Validatable;
