//! Configuration I/O (YAML schema)
//!
//! Defines the YAML schema types. Loading and saving live on
//! [`PassConfig`](super::PassConfig).

use super::pass_config::{ExemptionStrategy, HardeningConfig, PassConfig};
use serde::{Deserialize, Serialize};

/// Schema versions this build can read
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: Option<u32>,

    /// Base preset (defaults to `standard`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    /// Field overrides applied on top of the preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<PassOverrides>,
}

/// Per-field overrides; absent fields keep the preset value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_flag_bits: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exemption: Option<ExemptionStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_unused_entry_read: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardening: Option<HardeningOverrides>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_symbol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_tag_symbol: Option<String>,
}

/// Per-field hardening overrides, merged onto the preset's hardening
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HardeningOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_unsafe_stores: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_smart_pointer_shadows: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_marker_loads: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_mask: Option<u64>,
}

impl HardeningOverrides {
    pub fn apply_to(self, mut base: HardeningConfig) -> HardeningConfig {
        if let Some(enabled) = self.mask_unsafe_stores {
            base.mask_unsafe_stores = enabled;
        }
        if let Some(enabled) = self.mask_smart_pointer_shadows {
            base.mask_smart_pointer_shadows = enabled;
        }
        if let Some(enabled) = self.remove_marker_loads {
            base.remove_marker_loads = enabled;
        }
        if let Some(mask) = self.pointer_mask {
            base.pointer_mask = mask;
        }
        base
    }
}

impl From<&HardeningConfig> for HardeningOverrides {
    fn from(hardening: &HardeningConfig) -> Self {
        Self {
            mask_unsafe_stores: Some(hardening.mask_unsafe_stores),
            mask_smart_pointer_shadows: Some(hardening.mask_smart_pointer_shadows),
            remove_marker_loads: Some(hardening.remove_marker_loads),
            pointer_mask: Some(hardening.pointer_mask),
        }
    }
}

impl From<&PassConfig> for PassOverrides {
    fn from(config: &PassConfig) -> Self {
        Self {
            max_flag_bits: Some(config.max_flag_bits),
            exemption: Some(config.exemption),
            skip_unused_entry_read: Some(config.skip_unused_entry_read),
            hardening: Some(HardeningOverrides::from(&config.hardening)),
            flag_symbol: Some(config.flag_symbol.clone()),
            type_tag_symbol: Some(config.type_tag_symbol.clone()),
        }
    }
}
