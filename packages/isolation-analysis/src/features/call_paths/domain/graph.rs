//! Call-path ("road") graph
//!
//! An arena of call-site nodes addressed by `NodeIndex`. Each edge points
//! from an inner call site to the call site one context level further out,
//! so every UNSAFE allocation roots a path that ends at an entry call site.

use super::record::FunctionDomainRecord;
use crate::errors::{InvariantViolation, Result};
use crate::shared::models::{FunctionId, InstId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};
use petgraph::Direction;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPathNode {
    pub call_site: InstId,
    pub function: FunctionId,
}

/// Flag-management role of an unsafe call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSiteRole {
    /// Outermost on some unsafe path; asserts the flag unconditionally
    Entry,
    /// Below an entry; an ancestor already asserted the flag
    Exempt,
    /// Reads, propagates and resets the flag itself
    Guarded,
}

#[derive(Debug, Clone, Default)]
pub struct CallPathGraph {
    graph: DiGraph<CallPathNode, ()>,
    index: FxHashMap<InstId, NodeIndex>,
    records: BTreeMap<FunctionId, FunctionDomainRecord>,
    entries: BTreeSet<InstId>,
    exempt: BTreeSet<InstId>,
    callees: BTreeMap<InstId, FunctionId>,
    indirect_targets: BTreeMap<InstId, BTreeSet<FunctionId>>,
    heap_moves: BTreeSet<InstId>,
}

impl CallPathGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Node for `call_site`, created if absent
    pub fn ensure_node(&mut self, call_site: InstId, function: FunctionId) -> NodeIndex {
        if let Some(&idx) = self.index.get(&call_site) {
            return idx;
        }
        let idx = self.graph.add_node(CallPathNode {
            call_site,
            function,
        });
        self.index.insert(call_site, idx);
        idx
    }

    /// Edge from `inner` to the next call site outward; idempotent
    pub fn link(&mut self, inner: InstId, outer: InstId) -> Result<()> {
        let from = self.node(inner)?;
        let to = self.node(outer)?;
        self.graph.update_edge(from, to, ());
        Ok(())
    }

    pub fn record_mut(&mut self, function: FunctionId) -> &mut FunctionDomainRecord {
        self.records
            .entry(function)
            .or_insert_with(|| FunctionDomainRecord::new(function))
    }

    pub fn mark_entry(&mut self, call_site: InstId) {
        self.entries.insert(call_site);
    }

    pub fn set_exempt(&mut self, exempt: BTreeSet<InstId>) {
        self.exempt = exempt;
    }

    pub fn record_callee(&mut self, call_site: InstId, callee: FunctionId) {
        self.callees.insert(call_site, callee);
    }

    pub fn record_indirect_target(&mut self, call_site: InstId, target: FunctionId) {
        self.indirect_targets
            .entry(call_site)
            .or_default()
            .insert(target);
    }

    pub fn mark_heap_move(&mut self, call_site: InstId) {
        self.heap_moves.insert(call_site);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn node(&self, call_site: InstId) -> Result<NodeIndex> {
        self.index
            .get(&call_site)
            .copied()
            .ok_or_else(|| InvariantViolation::UnknownCallSite(call_site).into())
    }

    pub fn contains(&self, call_site: InstId) -> bool {
        self.index.contains_key(&call_site)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Call sites one context level further out than `call_site`
    pub fn outer_neighbors(&self, call_site: InstId) -> Result<BTreeSet<InstId>> {
        let idx = self.node(call_site)?;
        Ok(self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].call_site)
            .collect())
    }

    /// Call sites one context level further in than `call_site`
    pub fn inner_neighbors(&self, call_site: InstId) -> Result<BTreeSet<InstId>> {
        let idx = self.node(call_site)?;
        Ok(self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].call_site)
            .collect())
    }

    /// Every node reachable from an entry walking toward the allocations,
    /// entries themselves excluded
    pub fn descendants_of_entries(&self) -> BTreeSet<InstId> {
        let reversed = Reversed(&self.graph);
        let mut reached = BTreeSet::new();

        for entry in &self.entries {
            let Some(&start) = self.index.get(entry) else {
                continue;
            };
            let mut bfs = Bfs::new(reversed, start);
            while let Some(n) = bfs.next(reversed) {
                let call_site = self.graph[n].call_site;
                if !self.entries.contains(&call_site) {
                    reached.insert(call_site);
                }
            }
        }
        reached
    }

    pub fn role(&self, call_site: InstId) -> Result<CallSiteRole> {
        self.node(call_site)?;
        Ok(if self.entries.contains(&call_site) {
            CallSiteRole::Entry
        } else if self.exempt.contains(&call_site) {
            CallSiteRole::Exempt
        } else {
            CallSiteRole::Guarded
        })
    }

    pub fn entries(&self) -> &BTreeSet<InstId> {
        &self.entries
    }

    pub fn exempt(&self) -> &BTreeSet<InstId> {
        &self.exempt
    }

    pub fn record(&self, function: FunctionId) -> Option<&FunctionDomainRecord> {
        self.records.get(&function)
    }

    /// Records of every function with at least one unsafe call site
    pub fn records(&self) -> impl Iterator<Item = &FunctionDomainRecord> {
        self.records.values()
    }

    pub fn callee(&self, call_site: InstId) -> Option<FunctionId> {
        self.callees.get(&call_site).copied()
    }

    pub fn indirect_targets(&self) -> &BTreeMap<InstId, BTreeSet<FunctionId>> {
        &self.indirect_targets
    }

    /// Functions entered through an unresolved call on some unsafe path
    pub fn indirectly_reached(&self) -> BTreeSet<FunctionId> {
        self.indirect_targets.values().flatten().copied().collect()
    }

    /// Context call sites on some unsafe path
    pub fn heap_moves(&self) -> &BTreeSet<InstId> {
        &self.heap_moves
    }

    /// Every call site with a node: allocation sites and context call sites
    pub fn unsafe_call_sites(&self) -> BTreeSet<InstId> {
        self.index.keys().copied().collect()
    }
}
