//! Isolation pass CLI
//!
//! # Usage
//!
//! ```bash
//! # Run the pass over a program and its dataflow facts
//! isolation-pass run --input program.json --preset hardened --output report.json
//!
//! # Use a YAML configuration instead of a preset
//! isolation-pass run --input program.json --config isolation.yaml
//!
//! # Print a preset as YAML (starting point for a config file)
//! isolation-pass print-config --preset precise
//!
//! # Summarize `cargo bench` output
//! isolation-pass bench-summary results.txt
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use isolation_analysis::benchmark;
use isolation_analysis::features::provenance::MarkBoundaryOracle;
use isolation_analysis::{IsolationPass, PassConfig, PassInput, Preset};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "isolation-pass")]
#[command(about = "Domain-isolation pass: classify unsafe allocations and plan flag instrumentation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pass and write the report as JSON
    Run {
        /// Program and analysis facts (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// YAML configuration; takes precedence over --preset
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Configuration preset
        #[arg(short, long, default_value = "standard")]
        preset: Preset,

        /// Report file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a preset configuration as YAML
    PrintConfig {
        #[arg(short, long, default_value = "standard")]
        preset: Preset,
    },

    /// Summarize `bench: N ns/iter` lines of a benchmark log
    BenchSummary {
        /// Benchmark log
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            config,
            preset,
            output,
        } => run_pass(input, config, preset, output),
        Commands::PrintConfig { preset } => {
            print!("{}", PassConfig::preset(preset).to_yaml()?);
            Ok(())
        }
        Commands::BenchSummary { file } => bench_summary(file),
    }
}

fn run_pass(
    input: PathBuf,
    config: Option<PathBuf>,
    preset: Preset,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = match config {
        Some(path) => PassConfig::from_yaml(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PassConfig::preset(preset),
    };

    let file = File::open(&input).with_context(|| format!("failed to open {}", input.display()))?;
    let PassInput { program, facts } = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", input.display()))?;

    let report = IsolationPass::new(config)?
        .run(&program, &facts, MarkBoundaryOracle)
        .context("isolation pass aborted")?;

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(file, &report)?;
            eprintln!(
                "{} functions instrumented, {} relocations, {} rewrites -> {}",
                report.stats.functions_instrumented,
                report.stats.relocations,
                report.stats.rewrites,
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn bench_summary(file: PathBuf) -> Result<()> {
    let log = File::open(&file).with_context(|| format!("failed to open {}", file.display()))?;
    let summary = benchmark::summarize(BufReader::new(log))?;
    println!("{summary}");
    Ok(())
}
