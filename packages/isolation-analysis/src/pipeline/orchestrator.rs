//! Pass orchestrator
//!
//! Runs every stage to completion before producing a report; the first
//! invariant violation aborts the run and nothing is emitted.

use super::result::{PassReport, PassStats};
use super::AnalysisContext;
use crate::config::{PassConfig, Validatable};
use crate::errors::Result;
use crate::features::call_paths::CallPathBuilder;
use crate::features::hardening::HardeningPlanner;
use crate::features::instrumentation::FlagInstrumenter;
use crate::features::provenance::{BoundaryOracle, PointsToOracle, ProvenanceClassifier};
use crate::shared::models::Program;
use std::time::Instant;

pub struct IsolationPass {
    config: PassConfig,
}

impl IsolationPass {
    /// Create a pass; the configuration is validated here
    pub fn new(config: PassConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    pub fn run<P, B>(&self, program: &Program, points_to: P, boundary: B) -> Result<PassReport>
    where
        P: PointsToOracle,
        B: BoundaryOracle,
    {
        let ctx = AnalysisContext::new(program, &self.config);
        let mut stats = PassStats::default();

        tracing::info!(
            preset = %self.config.get_preset(),
            functions = program.functions().len(),
            instructions = program.instructions().len(),
            "isolation pass started"
        );

        // Classify
        let started = Instant::now();
        let classification = ProvenanceClassifier::new(points_to, &boundary).classify(&ctx)?;
        stats.record_stage("classify", started.elapsed());

        // Call paths
        let started = Instant::now();
        let graph = CallPathBuilder::new().build(&ctx, &classification)?;
        stats.record_stage("call_paths", started.elapsed());

        // Instrumentation
        let started = Instant::now();
        let plan = FlagInstrumenter::new().plan(&ctx, &graph)?;
        stats.record_stage("instrumentation", started.elapsed());

        // Hardening
        let started = Instant::now();
        let hardening = HardeningPlanner::new(&boundary).plan(&ctx);
        stats.record_stage("hardening", started.elapsed());

        stats.functions_instrumented = plan.function_count();
        stats.slots = plan.slot_count();
        stats.entry_reads = plan.entry_read_count();
        stats.entry_stores = plan.entry_store_count();
        stats.resets = plan.reset_count();
        stats.relocations = classification.relocation_count();
        stats.unsafe_pointers = classification.unsafe_pointers().len();
        stats.rewrites = hardening.len();

        tracing::info!(
            functions_instrumented = stats.functions_instrumented,
            slots = stats.slots,
            entry_stores = stats.entry_stores,
            resets = stats.resets,
            relocations = stats.relocations,
            rewrites = stats.rewrites,
            elapsed_ms = stats.total_duration().as_millis() as u64,
            "isolation pass finished"
        );

        let relocations = classification
            .relocations()
            .filter_map(|alloca| {
                classification
                    .relocation_reasons(alloca)
                    .map(|reasons| (alloca, reasons.clone()))
            })
            .collect();
        let callees = graph
            .unsafe_call_sites()
            .into_iter()
            .filter_map(|cs| graph.callee(cs).map(|callee| (cs, callee)))
            .collect();

        Ok(PassReport {
            plan,
            relocations,
            unsafe_pointers: classification.unsafe_pointers().clone(),
            unsafe_call_sites: graph.unsafe_call_sites(),
            entries: graph.entries().clone(),
            exempt: graph.exempt().clone(),
            heap_moves: graph.heap_moves().clone(),
            callees,
            indirect_targets: graph.indirect_targets().clone(),
            indirectly_reached: graph.indirectly_reached(),
            rewrites: hardening.rewrites,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, Preset};
    use crate::errors::{AnalysisError, InvariantViolation};
    use crate::features::provenance::{AnalysisFacts, MarkBoundaryOracle};
    use crate::shared::models::*;

    fn program() -> Program {
        let call = |id: u32, function: u32, target: u32| Instruction {
            id: InstId(id),
            function: FunctionId(function),
            block: BlockId(0),
            kind: InstKind::Call {
                target: CallTarget::Direct(FunctionId(target)),
                flavor: CallFlavor::Plain,
            },
            marks: vec![],
        };
        Program::new(ProgramData {
            functions: (0..2)
                .map(|f| Function {
                    id: FunctionId(f),
                    name: format!("f{f}"),
                    entry_block: BlockId(0),
                })
                .collect(),
            instructions: vec![
                call(1, 0, 7),
                call(2, 1, 0),
                Instruction {
                    id: InstId(3),
                    function: FunctionId(1),
                    block: BlockId(0),
                    kind: InstKind::Alloca,
                    marks: vec![],
                },
            ],
            pointer_values: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = IsolationPass::new(PassConfig::default().max_flag_bits(0))
            .err()
            .unwrap();
        assert!(matches!(err, AnalysisError::Config(ConfigError::Range { .. })));
    }

    #[test]
    fn test_full_run() {
        let facts = AnalysisFacts::new()
            .with_allocation(InstId(1), vec![InstId(2)])
            .with_tainted_stack_object(InstId(3));
        let pass = IsolationPass::new(PassConfig::default()).unwrap();
        let report = pass.run(&program(), &facts, MarkBoundaryOracle).unwrap();

        assert_eq!(report.entries.iter().copied().collect::<Vec<_>>(), vec![InstId(2)]);
        assert_eq!(report.exempt.iter().copied().collect::<Vec<_>>(), vec![InstId(1)]);
        assert!(report.is_relocated(InstId(3)));
        assert_eq!(report.callees.get(&InstId(1)), Some(&FunctionId(7)));
        assert_eq!(report.stats.entry_stores, 1);
        assert_eq!(report.stats.slots, 0);
        assert_eq!(report.stats.relocations, 1);
        assert_eq!(report.stats.stage_durations.len(), 4);
    }

    #[test]
    fn test_violation_emits_nothing() {
        let facts = AnalysisFacts::new().with_allocation(InstId(3), vec![]);
        let pass = IsolationPass::new(PassConfig::preset(Preset::Hardened)).unwrap();
        let err = pass.run(&program(), &facts, MarkBoundaryOracle).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Invariant(InvariantViolation::NotACallSite(InstId(3)))
        ));
    }

    #[test]
    fn test_report_json_has_stats() {
        let facts = AnalysisFacts::new().with_allocation(InstId(1), vec![]);
        let pass = IsolationPass::new(PassConfig::default()).unwrap();
        let report = pass.run(&program(), &facts, MarkBoundaryOracle).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["entry_stores"], 1);
        assert!(json["stats"].get("stage_durations").is_none());
    }
}
