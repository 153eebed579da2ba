//! Flag instrumentation emitter
//!
//! For every function with at least one unsafe call site:
//!
//! 1. read the flag once at entry (omitted when nothing consults it and
//!    `skip_unused_entry_read` is set);
//! 2. compute a scratch slot per guarded call site from the entry read;
//! 3. store the slot into the flag before the call;
//! 4. reset the flag to zero after every normal return;
//! 5. before an entry call site, store its argument mask unconditionally.
//!
//! Exempt call sites get nothing. A function's plan is built completely
//! before it is added, so a failure leaves no partial plan behind.

use crate::errors::Result;
use crate::features::call_paths::{CallPathGraph, CallSiteRole, FunctionDomainRecord};
use crate::features::instrumentation::domain::{
    FlagOp, FunctionPlan, InstrumentationPlan, ResetPoint, ScratchSlot,
};
use crate::pipeline::AnalysisContext;
use crate::shared::models::CallFlavor;

#[derive(Debug, Default)]
pub struct FlagInstrumenter;

impl FlagInstrumenter {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(
        &self,
        ctx: &AnalysisContext<'_>,
        graph: &CallPathGraph,
    ) -> Result<InstrumentationPlan> {
        let mut plan = InstrumentationPlan {
            flag_symbol: ctx.config.flag_symbol.clone(),
            type_tag_symbol: ctx.config.type_tag_symbol.clone(),
            ..Default::default()
        };

        for record in graph.records() {
            let function_plan = self.plan_function(ctx, graph, record)?;
            tracing::debug!(
                function = %record.function,
                slots = function_plan.slots.len(),
                ops = function_plan.ops.len(),
                "function instrumented"
            );
            plan.functions.insert(record.function, function_plan);
        }

        tracing::info!(
            functions = plan.function_count(),
            slots = plan.slot_count(),
            entry_stores = plan.entry_store_count(),
            resets = plan.reset_count(),
            "flag instrumentation planned"
        );
        Ok(plan)
    }

    fn plan_function(
        &self,
        ctx: &AnalysisContext<'_>,
        graph: &CallPathGraph,
        record: &FunctionDomainRecord,
    ) -> Result<FunctionPlan> {
        let function = ctx.program.function(record.function)?;

        let mut sites = Vec::with_capacity(record.len());
        for (call_site, bit) in record.call_sites() {
            let site = ctx.program.call_site(call_site)?;
            sites.push((site, bit, graph.role(call_site)?));
        }

        let mut slots = Vec::new();
        for &(site, bit, role) in &sites {
            if role == CallSiteRole::Guarded {
                slots.push(ScratchSlot {
                    id: slots.len() as u32,
                    call_site: site.id,
                    bit,
                    arg_mask: record.arg_mask(site.id),
                });
            }
        }

        let reads_entry_flag = !slots.is_empty() || !ctx.config.skip_unused_entry_read;
        let mut ops = Vec::new();
        if reads_entry_flag {
            ops.push(FlagOp::ReadEntryFlag {
                block: function.entry_block,
            });
        }
        ops.extend(slots.iter().map(|slot| FlagOp::ComputeSlot {
            slot: slot.id,
            call_site: slot.call_site,
            bit: slot.bit,
            arg_mask: slot.arg_mask,
        }));

        let mut next_slot = slots.iter();
        for &(site, _, role) in &sites {
            match role {
                CallSiteRole::Exempt => {}
                CallSiteRole::Entry => ops.push(FlagOp::StoreConstant {
                    call_site: site.id,
                    value: record.arg_mask(site.id),
                }),
                CallSiteRole::Guarded => {
                    let Some(slot) = next_slot.next() else {
                        continue;
                    };
                    ops.push(FlagOp::StoreSlot {
                        call_site: site.id,
                        slot: slot.id,
                    });
                    let at = match site.flavor {
                        CallFlavor::Plain => ResetPoint::AfterCall { call_site: site.id },
                        CallFlavor::Invoke { normal_dest } => {
                            ResetPoint::BlockStart { block: normal_dest }
                        }
                    };
                    ops.push(FlagOp::Reset {
                        call_site: site.id,
                        at,
                    });
                }
            }
        }

        Ok(FunctionPlan {
            function: record.function,
            entry_block: function.entry_block,
            reads_entry_flag,
            slots,
            ops,
        })
    }
}
