//! Oracle adapters
//!
//! - [`AnalysisFacts`]: serialized dataflow results (JSON produced by the
//!   external engine)
//! - [`MarkBoundaryOracle`]: reads `Mark::BoundaryCrossing` left by the front end

use crate::features::provenance::domain::ReachableAllocation;
use crate::features::provenance::ports::{BoundaryOracle, PointsToOracle};
use crate::shared::models::{InstId, Instruction, Mark, MemoryObject, ValueId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFacts {
    #[serde(default)]
    pub reachable_allocations: Vec<ReachableAllocation>,

    #[serde(default)]
    pub tainted_stack_objects: Vec<InstId>,

    #[serde(default)]
    pub points_to: BTreeMap<ValueId, Vec<MemoryObject>>,
}

impl AnalysisFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allocation(mut self, location: InstId, context: Vec<InstId>) -> Self {
        self.reachable_allocations
            .push(ReachableAllocation { location, context });
        self
    }

    pub fn with_tainted_stack_object(mut self, alloca: InstId) -> Self {
        self.tainted_stack_objects.push(alloca);
        self
    }

    pub fn with_points_to(mut self, value: ValueId, objects: Vec<MemoryObject>) -> Self {
        self.points_to.entry(value).or_default().extend(objects);
        self
    }
}

impl PointsToOracle for AnalysisFacts {
    fn reachable_allocations(&self) -> &[ReachableAllocation] {
        &self.reachable_allocations
    }

    fn tainted_stack_objects(&self) -> &[InstId] {
        &self.tainted_stack_objects
    }

    fn points_to(&self, value: ValueId) -> &[MemoryObject] {
        self.points_to.get(&value).map_or(&[], Vec::as_slice)
    }
}

/// Boundary oracle backed by front-end marks
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkBoundaryOracle;

impl BoundaryOracle for MarkBoundaryOracle {
    fn crosses_boundary(&self, inst: &Instruction) -> bool {
        inst.has_mark(Mark::BoundaryCrossing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{BlockId, FunctionId, InstKind, MemoryObjectKind, ObjectId};

    #[test]
    fn test_points_to_unknown_value_is_empty() {
        let facts = AnalysisFacts::new();
        assert!(facts.points_to(ValueId(3)).is_empty());
    }

    #[test]
    fn test_facts_json() {
        let json = r#"{
            "reachable_allocations": [{"location": 4, "context": [7, 9]}],
            "tainted_stack_objects": [2],
            "points_to": {"5": [{"id": 1, "kind": "stack", "alloca": 2}, {"id": 2, "kind": "heap"}]}
        }"#;
        let facts: AnalysisFacts = serde_json::from_str(json).unwrap();
        assert_eq!(facts.reachable_allocations[0].context, vec![InstId(7), InstId(9)]);
        let pts = facts.points_to(ValueId(5));
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].kind, MemoryObjectKind::Stack { alloca: InstId(2) });
        assert_eq!(pts[1].id, ObjectId(2));
    }

    #[test]
    fn test_mark_boundary_oracle() {
        let mut inst = Instruction {
            id: InstId(1),
            function: FunctionId(0),
            block: BlockId(0),
            kind: InstKind::Other,
            marks: vec![],
        };
        assert!(!MarkBoundaryOracle.crosses_boundary(&inst));
        inst.marks.push(Mark::BoundaryCrossing);
        assert!(MarkBoundaryOracle.crosses_boundary(&inst));
    }
}
