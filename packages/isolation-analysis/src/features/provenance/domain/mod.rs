//! Provenance classification results
//!
//! Classification is monotonic: once an allocation site is UNSAFE or a stack
//! object requires relocation, nothing downgrades it.

use crate::shared::models::{FunctionId, InstId, ValueId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One allocation location reported reachable by the dataflow engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReachableAllocation {
    pub location: InstId,
    /// Calling context, innermost call site first
    #[serde(default)]
    pub context: Vec<InstId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteClass {
    Safe,
    Unsafe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackClass {
    Safe,
    RequiresRelocation,
}

/// Why a stack object was marked for relocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelocationReason {
    /// Reported directly by the dataflow engine
    TaintedStackObject,
    /// Pointed to by a boundary-crossing pointer
    BoundaryPointsTo,
}

/// An UNSAFE allocation site with one of its calling contexts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllocationSite {
    pub call_site: InstId,
    pub function: FunctionId,
    pub callee: Option<FunctionId>,
    /// Innermost call site first; empty when the allocation is its own entry
    pub context: Vec<InstId>,
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// One entry per distinct (location, context) report, in report order
    allocations: Vec<AllocationSite>,
    seen: FxHashSet<AllocationSite>,
    unsafe_sites: BTreeSet<InstId>,
    relocations: BTreeMap<InstId, BTreeSet<RelocationReason>>,
    unsafe_pointers: BTreeSet<ValueId>,
}

impl Classification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an UNSAFE allocation; returns false for a duplicate report
    pub fn mark_unsafe_allocation(&mut self, site: AllocationSite) -> bool {
        self.unsafe_sites.insert(site.call_site);
        if !self.seen.insert(site.clone()) {
            return false;
        }
        self.allocations.push(site);
        true
    }

    /// Mark a stack object for relocation; returns true if it was SAFE before
    pub fn mark_relocation(&mut self, alloca: InstId, reason: RelocationReason) -> bool {
        let reasons = self.relocations.entry(alloca).or_default();
        let newly = reasons.is_empty();
        reasons.insert(reason);
        newly
    }

    pub fn mark_unsafe_pointer(&mut self, value: ValueId) -> bool {
        self.unsafe_pointers.insert(value)
    }

    pub fn allocations(&self) -> &[AllocationSite] {
        &self.allocations
    }

    pub fn site_class(&self, call_site: InstId) -> SiteClass {
        if self.unsafe_sites.contains(&call_site) {
            SiteClass::Unsafe
        } else {
            SiteClass::Safe
        }
    }

    pub fn stack_class(&self, alloca: InstId) -> StackClass {
        if self.relocations.contains_key(&alloca) {
            StackClass::RequiresRelocation
        } else {
            StackClass::Safe
        }
    }

    pub fn relocation_reasons(&self, alloca: InstId) -> Option<&BTreeSet<RelocationReason>> {
        self.relocations.get(&alloca)
    }

    /// Stack objects that require relocation, in id order
    pub fn relocations(&self) -> impl Iterator<Item = InstId> + '_ {
        self.relocations.keys().copied()
    }

    pub fn relocation_count(&self) -> usize {
        self.relocations.len()
    }

    pub fn unsafe_pointers(&self) -> &BTreeSet<ValueId> {
        &self.unsafe_pointers
    }
}
