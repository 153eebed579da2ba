//! Shared test fixtures
//!
//! - [`ProgramBuilder`]: terse program construction
//! - [`simulate`]: executes an [`InstrumentationPlan`] along one dynamic
//!   call chain and reports the flag values the runtime would observe

#![allow(dead_code)]

use isolation_analysis::features::instrumentation::{FlagOp, InstrumentationPlan};
use isolation_analysis::shared::models::*;
use std::collections::HashMap;

/// Entry block of function `f`
pub fn entry_block(f: u32) -> BlockId {
    BlockId(f * 100)
}

#[derive(Default)]
pub struct ProgramBuilder {
    data: ProgramData,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Functions `0..count`, named `f0`, `f1`, ...
    pub fn functions(mut self, count: u32) -> Self {
        for f in 0..count {
            self.data.functions.push(Function {
                id: FunctionId(f),
                name: format!("f{f}"),
                entry_block: entry_block(f),
            });
        }
        self
    }

    pub fn inst(mut self, id: u32, function: u32, kind: InstKind, marks: Vec<Mark>) -> Self {
        self.data.instructions.push(Instruction {
            id: InstId(id),
            function: FunctionId(function),
            block: entry_block(function),
            kind,
            marks,
        });
        self
    }

    /// Plain direct call from `function` to `callee`
    pub fn call(self, id: u32, function: u32, callee: u32) -> Self {
        self.inst(
            id,
            function,
            InstKind::Call {
                target: CallTarget::Direct(FunctionId(callee)),
                flavor: CallFlavor::Plain,
            },
            vec![],
        )
    }

    pub fn indirect_call(self, id: u32, function: u32) -> Self {
        self.inst(
            id,
            function,
            InstKind::Call {
                target: CallTarget::Indirect,
                flavor: CallFlavor::Plain,
            },
            vec![],
        )
    }

    pub fn invoke(self, id: u32, function: u32, callee: u32, normal_dest: u32) -> Self {
        self.inst(
            id,
            function,
            InstKind::Call {
                target: CallTarget::Direct(FunctionId(callee)),
                flavor: CallFlavor::Invoke {
                    normal_dest: BlockId(normal_dest),
                },
            },
            vec![],
        )
    }

    pub fn alloca(self, id: u32, function: u32, marks: Vec<Mark>) -> Self {
        self.inst(id, function, InstKind::Alloca, marks)
    }

    pub fn pointer(mut self, id: u32, defined_by: Option<u32>, users: &[u32]) -> Self {
        self.data.pointer_values.push(PointerValue {
            id: ValueId(id),
            defined_by: defined_by.map(InstId),
            users: users.iter().copied().map(InstId).collect(),
            top_level: true,
        });
        self
    }

    pub fn data(self) -> ProgramData {
        self.data
    }

    pub fn build(self) -> Program {
        Program::new(self.data).expect("well-formed test program")
    }
}

/// Flag values observed along one call chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagTrace {
    /// Flag right before the innermost (allocation) call
    pub at_allocation: u64,
    /// Flag after the outermost call has returned
    pub after_return: u64,
    /// Value written before each call site, if any
    pub stores: Vec<(InstId, u64)>,
}

/// Execute `plan` along `chain` (outermost call site first, allocation last)
/// starting from `initial_flag`.
///
/// Each call site runs in its own frame: the frame's function reads the
/// entry flag, computes its slots, then performs the pre-call stores for
/// that call site. Resets run while unwinding.
pub fn simulate(
    program: &Program,
    plan: &InstrumentationPlan,
    chain: &[InstId],
    initial_flag: u64,
) -> FlagTrace {
    let mut flag = initial_flag;
    let mut stores = Vec::new();

    for &cs in chain {
        let function = program.call_site(cs).expect("chain of call sites").function;
        let Some(fp) = plan.function(function) else {
            continue;
        };

        let entry = if fp.reads_entry_flag { flag } else { 0 };
        let mut slots = HashMap::new();
        for op in &fp.ops {
            if let FlagOp::ComputeSlot {
                slot, bit, arg_mask, ..
            } = *op
            {
                let value = if entry & (1u64 << bit) != 0 { arg_mask } else { 0 };
                slots.insert(slot, value);
            }
        }

        for op in &fp.ops {
            match *op {
                FlagOp::StoreConstant { call_site, value } if call_site == cs => {
                    flag = value;
                    stores.push((cs, value));
                }
                FlagOp::StoreSlot { call_site, slot } if call_site == cs => {
                    flag = slots[&slot];
                    stores.push((cs, flag));
                }
                _ => {}
            }
        }
    }

    let at_allocation = flag;

    for &cs in chain.iter().rev() {
        let function = program.call_site(cs).expect("chain of call sites").function;
        let Some(fp) = plan.function(function) else {
            continue;
        };
        if fp.resets_for(cs).next().is_some() {
            flag = 0;
        }
    }

    FlagTrace {
        at_allocation,
        after_return: flag,
        stores,
    }
}

/// `context` innermost first, as reported by the dataflow engine; returns the
/// dynamic chain outermost first ending at `allocation`
pub fn chain_of(allocation: u32, context: &[u32]) -> Vec<InstId> {
    context
        .iter()
        .rev()
        .chain(std::iter::once(&allocation))
        .copied()
        .map(InstId)
        .collect()
}
