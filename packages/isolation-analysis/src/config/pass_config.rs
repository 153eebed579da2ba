//! Isolation pass configuration
//!
//! ```rust,ignore
//! use isolation_analysis::config::{PassConfig, Preset};
//!
//! // Preset
//! let config = PassConfig::preset(Preset::Standard);
//!
//! // Preset with overrides
//! let config = PassConfig::preset(Preset::Hardened)
//!     .max_flag_bits(32)
//!     .hardening(|h| h.pointer_mask(0x0000_7fff_ffff_ffff));
//!
//! // YAML (version: 1)
//! let config = PassConfig::from_yaml("isolation.yaml")?;
//! ```

use super::error::{ConfigError, ConfigResult};
use super::io::{ConfigExportV1, PassOverrides, SUPPORTED_VERSIONS};
use super::preset::Preset;
use super::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Width of the thread-local flag register
pub const FLAG_REGISTER_BITS: u32 = 64;

/// Symbol of the thread-local unsafe flag in instrumented code
pub const DEFAULT_FLAG_SYMBOL: &str = "domain_unsafe_flag";

/// Symbol of the thread-local type tag in instrumented code
pub const DEFAULT_TYPE_TAG_SYMBOL: &str = "domain_type_tag";

/// Which call sites are exempt from flag management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemptionStrategy {
    /// Call sites reachable from an entry call site along the call path
    /// toward the allocation are exempt
    #[default]
    Descendants,
    /// Nothing is exempt; every non-entry call site gets guarded propagation
    Disabled,
}

/// Auxiliary pointer hardening rewrites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardeningConfig {
    /// Mask the pointer operand of boundary-crossing stores
    pub mask_unsafe_stores: bool,

    /// Mask smart-pointer shadow address computations
    pub mask_smart_pointer_shadows: bool,

    /// Remove front-end marker loads
    pub remove_marker_loads: bool,

    /// Mask applied by the pointer rewrites
    pub pointer_mask: u64,
}

impl Default for HardeningConfig {
    fn default() -> Self {
        Self {
            mask_unsafe_stores: false,
            mask_smart_pointer_shadows: true,
            remove_marker_loads: true,
            pointer_mask: u64::MAX,
        }
    }
}

impl HardeningConfig {
    pub fn mask_unsafe_stores(mut self, enabled: bool) -> Self {
        self.mask_unsafe_stores = enabled;
        self
    }

    pub fn mask_smart_pointer_shadows(mut self, enabled: bool) -> Self {
        self.mask_smart_pointer_shadows = enabled;
        self
    }

    pub fn remove_marker_loads(mut self, enabled: bool) -> Self {
        self.remove_marker_loads = enabled;
        self
    }

    pub fn pointer_mask(mut self, mask: u64) -> Self {
        self.pointer_mask = mask;
        self
    }
}

impl Validatable for HardeningConfig {
    fn validate(&self) -> ConfigResult<()> {
        let masking = self.mask_unsafe_stores || self.mask_smart_pointer_shadows;
        if masking && self.pointer_mask == 0 {
            return Err(ConfigError::range_with_hint(
                "hardening.pointer_mask",
                0,
                1,
                u64::MAX,
                "A zero mask turns every masked pointer into null",
            ));
        }
        Ok(())
    }
}

/// Complete pass configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    /// Maximum unsafe call sites per function (1..=64)
    pub max_flag_bits: u32,

    pub exemption: ExemptionStrategy,

    /// Omit the entry read in functions with no guarded call site
    pub skip_unused_entry_read: bool,

    pub hardening: HardeningConfig,

    pub flag_symbol: String,

    pub type_tag_symbol: String,

    #[serde(skip)]
    preset: Preset,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self::preset(Preset::Standard)
    }
}

impl PassConfig {
    pub fn preset(preset: Preset) -> Self {
        let base = Self {
            max_flag_bits: FLAG_REGISTER_BITS,
            exemption: ExemptionStrategy::Descendants,
            skip_unused_entry_read: true,
            hardening: HardeningConfig::default(),
            flag_symbol: DEFAULT_FLAG_SYMBOL.to_string(),
            type_tag_symbol: DEFAULT_TYPE_TAG_SYMBOL.to_string(),
            preset,
        };

        match preset {
            Preset::Standard => base,
            Preset::Precise => Self {
                exemption: ExemptionStrategy::Disabled,
                skip_unused_entry_read: false,
                ..base
            },
            Preset::Hardened => Self {
                hardening: base.hardening.clone().mask_unsafe_stores(true),
                ..base
            },
        }
    }

    pub fn get_preset(&self) -> Preset {
        self.preset
    }

    pub fn max_flag_bits(mut self, bits: u32) -> Self {
        self.max_flag_bits = bits;
        self
    }

    pub fn exemption(mut self, strategy: ExemptionStrategy) -> Self {
        self.exemption = strategy;
        self
    }

    pub fn skip_unused_entry_read(mut self, skip: bool) -> Self {
        self.skip_unused_entry_read = skip;
        self
    }

    pub fn hardening<F>(mut self, f: F) -> Self
    where
        F: FnOnce(HardeningConfig) -> HardeningConfig,
    {
        self.hardening = f(self.hardening);
        self
    }

    pub fn flag_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.flag_symbol = symbol.into();
        self
    }

    pub fn type_tag_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.type_tag_symbol = symbol.into();
        self
    }

    fn apply(mut self, overrides: PassOverrides) -> Self {
        if let Some(bits) = overrides.max_flag_bits {
            self.max_flag_bits = bits;
        }
        if let Some(exemption) = overrides.exemption {
            self.exemption = exemption;
        }
        if let Some(skip) = overrides.skip_unused_entry_read {
            self.skip_unused_entry_read = skip;
        }
        if let Some(hardening) = overrides.hardening {
            self.hardening = hardening.apply_to(self.hardening);
        }
        if let Some(symbol) = overrides.flag_symbol {
            self.flag_symbol = symbol;
        }
        if let Some(symbol) = overrides.type_tag_symbol {
            self.type_tag_symbol = symbol;
        }
        self
    }

    /// Parse a versioned YAML document and validate the result
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        let version = export.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = match export.preset.as_deref() {
            Some(name) => Preset::parse(name)?,
            None => Preset::default(),
        };

        let mut config = Self::preset(preset);
        if let Some(overrides) = export.overrides {
            config = config.apply(overrides);
        }
        config.validate()?;

        tracing::debug!(preset = %preset, "loaded pass configuration");
        Ok(config)
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: Some(1),
            preset: Some(self.preset.to_string()),
            overrides: Some(PassOverrides::from(self)),
        };
        serde_yaml::to_string(&export).map_err(ConfigError::Yaml)
    }

    pub fn save_yaml(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

impl Validatable for PassConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_flag_bits == 0 || self.max_flag_bits > FLAG_REGISTER_BITS {
            return Err(ConfigError::range_with_hint(
                "max_flag_bits",
                self.max_flag_bits,
                1,
                FLAG_REGISTER_BITS,
                "Each unsafe call site in a function needs its own bit of the 64-bit flag register",
            ));
        }

        for (field, symbol) in [
            ("flag_symbol", &self.flag_symbol),
            ("type_tag_symbol", &self.type_tag_symbol),
        ] {
            if symbol.trim().is_empty() {
                return Err(ConfigError::Symbol {
                    field: field.to_string(),
                    reason: "symbol name is empty".to_string(),
                });
            }
        }
        if self.flag_symbol == self.type_tag_symbol {
            return Err(ConfigError::Symbol {
                field: "type_tag_symbol".to_string(),
                reason: format!("'{}' is already the flag symbol", self.type_tag_symbol),
            });
        }

        self.hardening.validate()
    }
}
