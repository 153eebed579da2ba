//! Call-path graph builder

use crate::config::ExemptionStrategy;
use crate::errors::Result;
use crate::features::call_paths::domain::CallPathGraph;
use crate::features::provenance::{AllocationSite, Classification};
use crate::pipeline::AnalysisContext;
use crate::shared::models::{CallSite, CallTarget};

#[derive(Debug, Default)]
pub struct CallPathBuilder;

impl CallPathBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        ctx: &AnalysisContext<'_>,
        classification: &Classification,
    ) -> Result<CallPathGraph> {
        let mut graph = CallPathGraph::new();

        for site in classification.allocations() {
            self.add_path(ctx, &mut graph, site)?;
        }

        let exempt = match ctx.config.exemption {
            ExemptionStrategy::Descendants => graph.descendants_of_entries(),
            ExemptionStrategy::Disabled => Default::default(),
        };
        graph.set_exempt(exempt);

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            entries = graph.entries().len(),
            exempt = graph.exempt().len(),
            "call-path graph built"
        );
        Ok(graph)
    }

    /// Walk one allocation's context innermost to outermost
    fn add_path(
        &self,
        ctx: &AnalysisContext<'_>,
        graph: &mut CallPathGraph,
        site: &AllocationSite,
    ) -> Result<()> {
        let max_bits = ctx.config.max_flag_bits;
        let alloc = ctx.program.call_site(site.call_site)?;

        graph.ensure_node(alloc.id, alloc.function);
        if let Some(callee) = alloc.callee() {
            graph.record_callee(alloc.id, callee);
        }
        let record = graph.record_mut(alloc.function);
        record.assign(alloc.id, max_bits)?;
        record.add_arg_bit(alloc.id, 0);

        if site.context.is_empty() {
            tracing::debug!(call_site = %alloc.id, "allocation is its own entry");
            graph.mark_entry(alloc.id);
            return Ok(());
        }

        let mut inner: CallSite = alloc;
        for (depth, &level) in site.context.iter().enumerate() {
            let outer = ctx.program.call_site(level)?;
            graph.ensure_node(outer.id, outer.function);
            graph.link(inner.id, outer.id)?;
            graph.mark_heap_move(outer.id);

            match outer.target {
                CallTarget::Direct(callee) => graph.record_callee(outer.id, callee),
                CallTarget::Indirect => graph.record_indirect_target(outer.id, inner.function),
            }

            let inner_bit = graph
                .record(inner.function)
                .and_then(|r| r.bit(inner.id))
                .unwrap_or(0);
            let record = graph.record_mut(outer.function);
            let bit = record.assign(outer.id, max_bits)?;
            record.add_arg_bit(outer.id, inner_bit);

            tracing::debug!(
                call_site = %outer.id,
                function = %outer.function,
                bit,
                arg_bit = inner_bit,
                depth,
                "context call site"
            );

            if depth + 1 == site.context.len() {
                graph.mark_entry(outer.id);
            }
            inner = outer;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PassConfig, Preset};
    use crate::errors::{AnalysisError, InvariantViolation};
    use crate::features::call_paths::domain::CallSiteRole;
    use crate::shared::models::*;
    use std::collections::BTreeSet;

    /// fn0 { i1: call alloc }  fn1 { i2: call fn0 }  fn2 { i3: call fn1 (indirect) }
    fn chain_program() -> Program {
        let functions = (0..3)
            .map(|f| Function {
                id: FunctionId(f),
                name: format!("f{f}"),
                entry_block: BlockId(f * 10),
            })
            .collect();
        let call = |id: u32, function: u32, target: CallTarget| Instruction {
            id: InstId(id),
            function: FunctionId(function),
            block: BlockId(function * 10),
            kind: InstKind::Call {
                target,
                flavor: CallFlavor::Plain,
            },
            marks: vec![],
        };
        Program::new(ProgramData {
            functions,
            instructions: vec![
                call(1, 0, CallTarget::Direct(FunctionId(99))),
                call(2, 1, CallTarget::Direct(FunctionId(0))),
                call(3, 2, CallTarget::Indirect),
            ],
            pointer_values: vec![],
        })
        .unwrap()
    }

    fn classification(sites: &[(u32, u32, &[u32])]) -> Classification {
        let mut c = Classification::new();
        for &(call_site, function, context) in sites {
            c.mark_unsafe_allocation(AllocationSite {
                call_site: InstId(call_site),
                function: FunctionId(function),
                callee: None,
                context: context.iter().copied().map(InstId).collect(),
            });
        }
        c
    }

    fn build(program: &Program, config: &PassConfig, c: &Classification) -> Result<CallPathGraph> {
        let ctx = AnalysisContext::new(program, config);
        CallPathBuilder::new().build(&ctx, c)
    }

    #[test]
    fn test_empty_context_is_entry() {
        let program = chain_program();
        let graph = build(&program, &PassConfig::default(), &classification(&[(1, 0, &[])])).unwrap();
        assert_eq!(graph.entries(), &BTreeSet::from([InstId(1)]));
        assert!(graph.exempt().is_empty());
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.record(FunctionId(0)).unwrap().arg_mask(InstId(1)), 1);
    }

    #[test]
    fn test_chain_links_and_bits() {
        let program = chain_program();
        let graph = build(
            &program,
            &PassConfig::default(),
            &classification(&[(1, 0, &[2, 3])]),
        )
        .unwrap();

        assert_eq!(graph.outer_neighbors(InstId(1)).unwrap(), BTreeSet::from([InstId(2)]));
        assert_eq!(graph.outer_neighbors(InstId(2)).unwrap(), BTreeSet::from([InstId(3)]));
        assert_eq!(graph.role(InstId(3)).unwrap(), CallSiteRole::Entry);
        assert_eq!(graph.role(InstId(2)).unwrap(), CallSiteRole::Exempt);
        assert_eq!(graph.role(InstId(1)).unwrap(), CallSiteRole::Exempt);

        assert_eq!(graph.callee(InstId(1)), Some(FunctionId(99)));
        assert_eq!(graph.callee(InstId(2)), Some(FunctionId(0)));
        assert_eq!(graph.callee(InstId(3)), None);
        assert_eq!(graph.indirectly_reached(), BTreeSet::from([FunctionId(1)]));
        assert_eq!(graph.heap_moves(), &BTreeSet::from([InstId(2), InstId(3)]));
        assert_eq!(graph.unsafe_call_sites().len(), 3);
    }

    #[test]
    fn test_disabled_exemption_guards_inner_sites() {
        let program = chain_program();
        let config = PassConfig::preset(Preset::Precise);
        let graph = build(&program, &config, &classification(&[(1, 0, &[2, 3])])).unwrap();
        assert!(graph.exempt().is_empty());
        assert_eq!(graph.role(InstId(1)).unwrap(), CallSiteRole::Guarded);
        assert_eq!(graph.role(InstId(2)).unwrap(), CallSiteRole::Guarded);
        assert_eq!(graph.role(InstId(3)).unwrap(), CallSiteRole::Entry);
    }

    #[test]
    fn test_context_entry_must_be_call() {
        let mut data: ProgramData = chain_program().into();
        data.instructions.push(Instruction {
            id: InstId(4),
            function: FunctionId(1),
            block: BlockId(10),
            kind: InstKind::Load,
            marks: vec![],
        });
        let program = Program::new(data).unwrap();
        let err = build(
            &program,
            &PassConfig::default(),
            &classification(&[(1, 0, &[4])]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Invariant(InvariantViolation::NotACallSite(InstId(4)))
        ));
    }

    #[test]
    fn test_bit_exhaustion_aborts() {
        let program = chain_program();
        let config = PassConfig::default().max_flag_bits(1);
        // One unsafe call site per function fits in a single bit.
        let ok = build(&program, &config, &classification(&[(1, 0, &[2])]));
        assert!(ok.is_ok());

        let mut data: ProgramData = chain_program().into();
        data.instructions.push(Instruction {
            id: InstId(5),
            function: FunctionId(0),
            block: BlockId(0),
            kind: InstKind::Call {
                target: CallTarget::Direct(FunctionId(99)),
                flavor: CallFlavor::Plain,
            },
            marks: vec![],
        });
        let program = Program::new(data).unwrap();
        let err = build(
            &program,
            &config,
            &classification(&[(1, 0, &[]), (5, 0, &[])]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Invariant(InvariantViolation::FlagBitsExhausted { max: 1, .. })
        ));
    }
}
