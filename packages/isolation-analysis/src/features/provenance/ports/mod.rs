//! Ports for the provenance classifier
//!
//! The interprocedural dataflow engine and the front end are external; the
//! classifier only sees them through these two traits.

use crate::features::provenance::domain::ReachableAllocation;
use crate::shared::models::{InstId, Instruction, MemoryObject, ValueId};

/// Results of the external points-to / context-sensitive dataflow engine
pub trait PointsToOracle {
    /// Allocation locations reachable from the unsafe query, each with its
    /// calling context (innermost call site first)
    fn reachable_allocations(&self) -> &[ReachableAllocation];

    /// Stack allocations whose address can flow into tainted values
    fn tainted_stack_objects(&self) -> &[InstId];

    /// Points-to set of a pointer value; empty when unknown
    fn points_to(&self, value: ValueId) -> &[MemoryObject];
}

/// Front-end knowledge of which instructions cross the safety boundary
pub trait BoundaryOracle {
    fn crosses_boundary(&self, inst: &Instruction) -> bool;
}

impl<T: PointsToOracle + ?Sized> PointsToOracle for &T {
    fn reachable_allocations(&self) -> &[ReachableAllocation] {
        (**self).reachable_allocations()
    }

    fn tainted_stack_objects(&self) -> &[InstId] {
        (**self).tainted_stack_objects()
    }

    fn points_to(&self, value: ValueId) -> &[MemoryObject] {
        (**self).points_to(value)
    }
}

impl<T: BoundaryOracle + ?Sized> BoundaryOracle for &T {
    fn crosses_boundary(&self, inst: &Instruction) -> bool {
        (**self).crosses_boundary(inst)
    }
}
