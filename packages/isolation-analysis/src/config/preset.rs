//! Preset configurations
//!
//! Presets provide complete default configurations for common use cases.

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Default pass
    ///
    /// - Exempt call sites below an entry call site
    /// - Skip the entry read when nothing consults it
    /// - Mask smart-pointer shadows, remove marker loads
    #[default]
    Standard,

    /// Guarded propagation everywhere
    ///
    /// - No exemption: every non-entry call site reads, stores and resets
    /// - Always emit the entry read
    Precise,

    /// Standard plus pointer masking on boundary-crossing stores
    Hardened,
}

impl Preset {
    /// Parse preset from string
    pub fn parse(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "precise" => Ok(Self::Precise),
            "hardened" => Ok(Self::Hardened),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Precise => "precise",
            Self::Hardened => "hardened",
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
