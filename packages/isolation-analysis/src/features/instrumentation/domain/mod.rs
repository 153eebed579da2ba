//! Flag instrumentation plan
//!
//! The plan is a list of abstract operations per function. A code generator
//! lowers each op onto the IR; the test simulator executes them directly.
//!
//! ```text
//! entry:      e = load flag                         (ReadEntryFlag)
//!             s_k = (e & 1<<b_k) ? OR(args_k) : 0    (ComputeSlot)
//! before c_k: flag = s_k                            (StoreSlot)
//! after c_k:  flag = 0                              (Reset)
//! before c_e: flag = OR(args_e)                     (StoreConstant, entry call site)
//! ```

use crate::shared::models::{BlockId, FunctionId, InstId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of a per-call-site scratch slot within its function
pub type SlotId = u32;

/// Where a reset store is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "at")]
pub enum ResetPoint {
    /// Immediately after a plain call
    AfterCall { call_site: InstId },
    /// First insertion point of an invoke's normal destination
    BlockStart { block: BlockId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum FlagOp {
    /// Load the flag once at the function's entry block
    ReadEntryFlag { block: BlockId },
    /// `slot = (entry & (1 << bit)) != 0 ? arg_mask : 0`
    ComputeSlot {
        slot: SlotId,
        call_site: InstId,
        bit: u32,
        arg_mask: u64,
    },
    /// Write a slot's value into the flag right before the call
    StoreSlot { call_site: InstId, slot: SlotId },
    /// Write zero into the flag once the call has returned normally
    Reset { call_site: InstId, at: ResetPoint },
    /// Write a constant into the flag right before an entry call site
    StoreConstant { call_site: InstId, value: u64 },
}

/// Scratch slot of one guarded call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchSlot {
    pub id: SlotId,
    pub call_site: InstId,
    pub bit: u32,
    pub arg_mask: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPlan {
    pub function: FunctionId,
    pub entry_block: BlockId,
    pub reads_entry_flag: bool,
    pub slots: Vec<ScratchSlot>,
    pub ops: Vec<FlagOp>,
}

impl FunctionPlan {
    pub fn slot_for(&self, call_site: InstId) -> Option<&ScratchSlot> {
        self.slots.iter().find(|s| s.call_site == call_site)
    }

    /// Constant written before `call_site` if it is an entry call site
    pub fn entry_constant(&self, call_site: InstId) -> Option<u64> {
        self.ops.iter().find_map(|op| match *op {
            FlagOp::StoreConstant { call_site: cs, value } if cs == call_site => Some(value),
            _ => None,
        })
    }

    pub fn resets_for(&self, call_site: InstId) -> impl Iterator<Item = ResetPoint> + '_ {
        self.ops.iter().filter_map(move |op| match *op {
            FlagOp::Reset { call_site: cs, at } if cs == call_site => Some(at),
            _ => None,
        })
    }

    /// Whether any op touches `call_site`
    pub fn touches(&self, call_site: InstId) -> bool {
        self.ops.iter().any(|op| match *op {
            FlagOp::ReadEntryFlag { .. } => false,
            FlagOp::ComputeSlot { call_site: cs, .. }
            | FlagOp::StoreSlot { call_site: cs, .. }
            | FlagOp::Reset { call_site: cs, .. }
            | FlagOp::StoreConstant { call_site: cs, .. } => cs == call_site,
        })
    }

    pub fn count(&self, pred: impl Fn(&FlagOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }
}

/// Whole-program instrumentation plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationPlan {
    pub flag_symbol: String,
    /// Thread-local the allocation sites write their object domain into
    pub type_tag_symbol: String,
    pub functions: BTreeMap<FunctionId, FunctionPlan>,
}

impl InstrumentationPlan {
    pub fn function(&self, function: FunctionId) -> Option<&FunctionPlan> {
        self.functions.get(&function)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn slot_count(&self) -> usize {
        self.functions.values().map(|f| f.slots.len()).sum()
    }

    pub fn entry_store_count(&self) -> usize {
        self.count_ops(|op| matches!(op, FlagOp::StoreConstant { .. }))
    }

    pub fn reset_count(&self) -> usize {
        self.count_ops(|op| matches!(op, FlagOp::Reset { .. }))
    }

    pub fn entry_read_count(&self) -> usize {
        self.functions.values().filter(|f| f.reads_entry_flag).count()
    }

    fn count_ops(&self, pred: impl Fn(&FlagOp) -> bool + Copy) -> usize {
        self.functions.values().map(|f| f.count(pred)).sum()
    }
}
