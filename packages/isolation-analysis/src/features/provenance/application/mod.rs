//! Provenance classifier
//!
//! Three discovery paths feed one monotonic [`Classification`]:
//!
//! 1. every reported allocation location becomes an UNSAFE allocation site
//!    with its calling context;
//! 2. every reported stack object not owned by the smart-pointer API
//!    requires relocation;
//! 3. every analyzable pointer that crosses the boundary (itself or through a
//!    direct user) is unsafe, and so is every stack object it may point to.

use crate::errors::Result;
use crate::features::provenance::domain::{AllocationSite, Classification, RelocationReason};
use crate::features::provenance::ports::{BoundaryOracle, PointsToOracle};
use crate::pipeline::AnalysisContext;
use crate::shared::models::{InstId, InstKind, Mark, PointerValue, Program};

pub struct ProvenanceClassifier<P, B> {
    points_to: P,
    boundary: B,
}

impl<P: PointsToOracle, B: BoundaryOracle> ProvenanceClassifier<P, B> {
    pub fn new(points_to: P, boundary: B) -> Self {
        Self {
            points_to,
            boundary,
        }
    }

    pub fn classify(&self, ctx: &AnalysisContext<'_>) -> Result<Classification> {
        let program = ctx.program;
        let mut classification = Classification::new();

        self.classify_allocations(program, &mut classification)?;
        self.classify_tainted_stack(program, &mut classification)?;
        self.scan_boundary_pointers(program, &mut classification);

        tracing::info!(
            allocations = classification.allocations().len(),
            relocations = classification.relocation_count(),
            unsafe_pointers = classification.unsafe_pointers().len(),
            "provenance classification done"
        );
        Ok(classification)
    }

    fn classify_allocations(
        &self,
        program: &Program,
        classification: &mut Classification,
    ) -> Result<()> {
        for reported in self.points_to.reachable_allocations() {
            let call_site = program.call_site(reported.location)?;
            let site = AllocationSite {
                call_site: call_site.id,
                function: call_site.function,
                callee: call_site.callee(),
                context: reported.context.clone(),
            };
            if classification.mark_unsafe_allocation(site) {
                tracing::debug!(
                    location = %reported.location,
                    depth = reported.context.len(),
                    "unsafe allocation site"
                );
            }
        }
        Ok(())
    }

    fn classify_tainted_stack(
        &self,
        program: &Program,
        classification: &mut Classification,
    ) -> Result<()> {
        for &alloca in self.points_to.tainted_stack_objects() {
            let inst = program.instruction(alloca)?;
            if !matches!(inst.kind, InstKind::Alloca) {
                tracing::warn!(inst = %alloca, "tainted stack object is not an alloca; ignored");
                continue;
            }
            if inst.has_mark(Mark::SmartPointer) {
                tracing::debug!(inst = %alloca, "smart-pointer stack slot kept in place");
                continue;
            }
            classification.mark_relocation(alloca, RelocationReason::TaintedStackObject);
        }
        Ok(())
    }

    fn scan_boundary_pointers(&self, program: &Program, classification: &mut Classification) {
        for value in program.pointer_values().iter().filter(|v| v.top_level) {
            if !self.is_boundary_pointer(program, value) {
                continue;
            }
            classification.mark_unsafe_pointer(value.id);

            for object in self.points_to.points_to(value.id) {
                let Some(alloca) = object.stack_alloca() else {
                    continue;
                };
                if is_smart_pointer_slot(program, alloca) {
                    continue;
                }
                if classification.mark_relocation(alloca, RelocationReason::BoundaryPointsTo) {
                    tracing::debug!(value = %value.id, inst = %alloca, "stack object reached by boundary pointer");
                }
            }
        }
    }

    fn is_boundary_pointer(&self, program: &Program, value: &PointerValue) -> bool {
        value
            .defined_by
            .iter()
            .chain(value.users.iter())
            .filter_map(|&id| program.find_instruction(id))
            .any(|inst| self.boundary.crosses_boundary(inst))
    }
}

fn is_smart_pointer_slot(program: &Program, alloca: InstId) -> bool {
    program
        .find_instruction(alloca)
        .is_some_and(|inst| inst.has_mark(Mark::SmartPointer))
}
