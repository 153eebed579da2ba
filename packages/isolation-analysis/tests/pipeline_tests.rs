//! Serialized inputs, YAML configuration and the benchmark summary

mod common;

use common::ProgramBuilder;
use isolation_analysis::benchmark;
use isolation_analysis::config::{ConfigError, ExemptionStrategy};
use isolation_analysis::features::hardening::RewriteOp;
use isolation_analysis::prelude::*;
use pretty_assertions::assert_eq;
use std::fs::File;
use std::io::{BufReader, Write};
use tempfile::NamedTempFile;

const INPUT: &str = r#"{
  "program": {
    "functions": [
      {"id": 0, "name": "parse", "entry_block": 0},
      {"id": 1, "name": "main", "entry_block": 10}
    ],
    "instructions": [
      {"id": 1, "function": 0, "block": 0,
       "kind": {"op": "call", "target": "indirect"}},
      {"id": 2, "function": 1, "block": 10,
       "kind": {"op": "call", "target": {"direct": 0}, "flavor": {"invoke": {"normal_dest": 11}}}},
      {"id": 3, "function": 1, "block": 11,
       "kind": {"op": "get_element_ptr"}, "marks": ["smart_pointer_shadow"]},
      {"id": 4, "function": 1, "block": 11,
       "kind": {"op": "load"}, "marks": ["marker_load"]}
    ]
  },
  "facts": {
    "reachable_allocations": [{"location": 1, "context": [2]}]
  }
}"#;

#[test]
fn test_json_input_end_to_end() {
    let input: PassInput = serde_json::from_str(INPUT).unwrap();
    let report = IsolationPass::new(PassConfig::preset(Preset::Precise))
        .unwrap()
        .run(&input.program, &input.facts, MarkBoundaryOracle)
        .unwrap();

    assert_eq!(report.entries.iter().copied().collect::<Vec<_>>(), vec![InstId(2)]);
    assert_eq!(report.stats.functions_instrumented, 2);
    assert_eq!(report.stats.slots, 1);
    assert_eq!(report.stats.resets, 1);
    assert_eq!(report.stats.entry_reads, 2);
    assert_eq!(
        report.rewrites,
        vec![
            RewriteOp::MaskGepResult {
                gep: InstId(3),
                mask: u64::MAX
            },
            RewriteOp::RemoveMarkerLoad { load: InstId(4) },
        ]
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["plan"]["flag_symbol"], "domain_unsafe_flag");
    assert_eq!(json["plan"]["type_tag_symbol"], "domain_type_tag");
    assert_eq!(json["rewrites"][1]["rewrite"], "remove_marker_load");
}

#[test]
fn test_malformed_input_is_rejected() {
    let mut json: serde_json::Value = serde_json::from_str(INPUT).unwrap();
    json["program"]["instructions"][3]["function"] = serde_json::json!(7);
    let err = serde_json::from_value::<PassInput>(json).unwrap_err();
    assert!(err.to_string().contains("unknown function fn7"));
}

#[test]
fn test_program_data_roundtrip() {
    let data = ProgramBuilder::new()
        .functions(2)
        .call(1, 0, 1)
        .alloca(2, 1, vec![Mark::SmartPointer])
        .pointer(5, Some(2), &[1])
        .data();
    let program = Program::new(data).unwrap();
    let json = serde_json::to_string(&program).unwrap();
    let back: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(back.pointer_values(), program.pointer_values());
    assert_eq!(back.instructions(), program.instructions());
}

#[test]
fn test_yaml_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "version: 1\npreset: hardened\noverrides:\n  max_flag_bits: 8\n  exemption: disabled\n"
    )
    .unwrap();

    let config = PassConfig::from_yaml(file.path()).unwrap();
    assert_eq!(config.get_preset(), Preset::Hardened);
    assert_eq!(config.max_flag_bits, 8);
    assert_eq!(config.exemption, ExemptionStrategy::Disabled);
    assert!(config.hardening.mask_unsafe_stores);

    let pass = IsolationPass::new(config).unwrap();
    assert_eq!(pass.config().max_flag_bits, 8);
}

#[test]
fn test_yaml_config_out_of_range() {
    let err = PassConfig::from_yaml_str("version: 1\noverrides:\n  max_flag_bits: 65\n").unwrap_err();
    assert!(matches!(err, ConfigError::Range { .. }));
}

#[test]
fn test_saved_config_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("isolation.yaml");
    let config = PassConfig::preset(Preset::Precise).flag_symbol("__isolation_flag");
    config.save_yaml(&path).unwrap();
    assert_eq!(PassConfig::from_yaml(&path).unwrap(), config);
}

#[test]
fn test_bench_summary_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "test a ... bench:      300 ns/iter (+/- 2)").unwrap();
    writeln!(file, "test b ... bench:    1,500 ns/iter (+/- 9)").unwrap();
    writeln!(file, "test result: ok").unwrap();

    let summary = benchmark::summarize(BufReader::new(File::open(file.path()).unwrap())).unwrap();
    assert_eq!(summary.to_string(), "Count: 2, Total: 1800, Average: 900");
}
