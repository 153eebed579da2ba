//! Pointer hardening rewrites

use crate::shared::models::{InstId, ValueId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rewrite")]
pub enum RewriteOp {
    /// AND the pointer operand of a boundary-crossing store with `mask`
    MaskStorePointer {
        store: InstId,
        pointer: ValueId,
        mask: u64,
    },
    /// AND a shadow-field address with `mask`; every other use of the GEP
    /// is redirected to the masked value
    MaskGepResult { gep: InstId, mask: u64 },
    /// Delete a marker load
    RemoveMarkerLoad { load: InstId },
}

impl RewriteOp {
    pub fn target(&self) -> InstId {
        match *self {
            RewriteOp::MaskStorePointer { store, .. } => store,
            RewriteOp::MaskGepResult { gep, .. } => gep,
            RewriteOp::RemoveMarkerLoad { load } => load,
        }
    }
}

/// Rewrites in application order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardeningPlan {
    pub rewrites: Vec<RewriteOp>,
}

impl HardeningPlan {
    pub fn len(&self) -> usize {
        self.rewrites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewrites.is_empty()
    }

    pub fn masked_stores(&self) -> usize {
        self.count(|op| matches!(op, RewriteOp::MaskStorePointer { .. }))
    }

    pub fn masked_geps(&self) -> usize {
        self.count(|op| matches!(op, RewriteOp::MaskGepResult { .. }))
    }

    pub fn removed_loads(&self) -> usize {
        self.count(|op| matches!(op, RewriteOp::RemoveMarkerLoad { .. }))
    }

    fn count(&self, pred: impl Fn(&RewriteOp) -> bool) -> usize {
        self.rewrites.iter().filter(|op| pred(op)).count()
    }
}
