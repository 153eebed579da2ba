//! Hardening planner
//!
//! Scans the program once per enabled rewrite kind: smart-pointer shadow
//! GEPs first, then marker loads, then boundary-crossing stores.

use crate::config::HardeningConfig;
use crate::features::hardening::domain::{HardeningPlan, RewriteOp};
use crate::features::provenance::BoundaryOracle;
use crate::pipeline::AnalysisContext;
use crate::shared::models::{InstKind, Mark};

pub struct HardeningPlanner<B> {
    boundary: B,
}

impl<B: BoundaryOracle> HardeningPlanner<B> {
    pub fn new(boundary: B) -> Self {
        Self { boundary }
    }

    pub fn plan(&self, ctx: &AnalysisContext<'_>) -> HardeningPlan {
        let config: &HardeningConfig = &ctx.config.hardening;
        let mask = config.pointer_mask;
        let mut plan = HardeningPlan::default();

        if config.mask_smart_pointer_shadows {
            plan.rewrites.extend(
                ctx.program
                    .instructions_with_mark(Mark::SmartPointerShadow)
                    .filter(|inst| matches!(inst.kind, InstKind::GetElementPtr))
                    .map(|inst| RewriteOp::MaskGepResult { gep: inst.id, mask }),
            );
        }

        if config.remove_marker_loads {
            plan.rewrites.extend(
                ctx.program
                    .instructions_with_mark(Mark::MarkerLoad)
                    .filter(|inst| matches!(inst.kind, InstKind::Load))
                    .map(|inst| RewriteOp::RemoveMarkerLoad { load: inst.id }),
            );
        }

        if config.mask_unsafe_stores {
            for inst in ctx.program.instructions() {
                let InstKind::Store {
                    pointer,
                    pointer_is_global,
                } = inst.kind
                else {
                    continue;
                };
                if pointer_is_global || !self.boundary.crosses_boundary(inst) {
                    continue;
                }
                tracing::debug!(store = %inst.id, pointer = %pointer, "masking store pointer");
                plan.rewrites.push(RewriteOp::MaskStorePointer {
                    store: inst.id,
                    pointer,
                    mask,
                });
            }
        }

        tracing::info!(
            masked_geps = plan.masked_geps(),
            removed_loads = plan.removed_loads(),
            masked_stores = plan.masked_stores(),
            "hardening planned"
        );
        plan
    }
}
