//! Pass input and output

use crate::features::hardening::RewriteOp;
use crate::features::instrumentation::InstrumentationPlan;
use crate::features::provenance::{AnalysisFacts, RelocationReason};
use crate::shared::models::{FunctionId, InstId, Program, ValueId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Everything the pass consumes: the program and the dataflow engine's facts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassInput {
    pub program: Program,
    #[serde(default)]
    pub facts: AnalysisFacts,
}

/// Pass execution statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    pub functions_instrumented: usize,
    pub slots: usize,
    pub entry_reads: usize,
    pub entry_stores: usize,
    pub resets: usize,
    pub relocations: usize,
    pub unsafe_pointers: usize,
    pub rewrites: usize,

    /// Per-stage durations
    #[serde(skip)]
    pub stage_durations: BTreeMap<&'static str, Duration>,
}

impl PassStats {
    pub fn record_stage(&mut self, stage: &'static str, duration: Duration) {
        self.stage_durations.insert(stage, duration);
    }

    pub fn total_duration(&self) -> Duration {
        self.stage_durations.values().sum()
    }
}

/// Output of one pass run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassReport {
    pub plan: InstrumentationPlan,

    /// Stack allocations to move onto the UNSAFE heap, with the reasons
    pub relocations: BTreeMap<InstId, BTreeSet<RelocationReason>>,

    pub unsafe_pointers: BTreeSet<ValueId>,

    /// Allocation sites plus context call sites
    pub unsafe_call_sites: BTreeSet<InstId>,
    pub entries: BTreeSet<InstId>,
    pub exempt: BTreeSet<InstId>,
    pub heap_moves: BTreeSet<InstId>,

    /// Resolved callee per unsafe call site
    pub callees: BTreeMap<InstId, FunctionId>,
    /// Functions reached through each unresolved context call site
    pub indirect_targets: BTreeMap<InstId, BTreeSet<FunctionId>>,
    pub indirectly_reached: BTreeSet<FunctionId>,

    pub rewrites: Vec<RewriteOp>,
    pub stats: PassStats,
}

impl PassReport {
    pub fn is_relocated(&self, alloca: InstId) -> bool {
        self.relocations.contains_key(&alloca)
    }
}
