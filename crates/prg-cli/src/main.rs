use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use prg_core::RunId;
use prg_evidence::FailureEmitter;
use prg_pdl::{validate_overlay, OverlayStructuralValidator};
use prg_runner::{GateOutcome, Orchestrator, RunConfig, RunInputs, TracingReporter};

const EXIT_PASS: i32 = 0;
const EXIT_GATE_FAILURE: i32 = 1;
const EXIT_INFRA_FAILURE: i32 = 2;

#[derive(Parser)]
#[command(name = "prg", version, about = "Promotion readiness gates")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the readiness gate sequence for one run
    Run {
        /// Run identifier (defaults to a fresh UUID)
        #[arg(long)]
        run_id: Option<String>,
        /// Configuration file (defaults to ./prg.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        pdl_path: Option<PathBuf>,
        #[arg(long)]
        observed_io: Option<PathBuf>,
        #[arg(long)]
        phase_outputs: Option<PathBuf>,
        #[arg(long)]
        measurement_ids: Option<PathBuf>,
        #[arg(long)]
        anchor_registry: Option<PathBuf>,
        #[arg(long)]
        overlays_dir: Option<PathBuf>,
        #[arg(long)]
        evidence_dir: Option<PathBuf>,
        /// Phases that must replay deterministically (repeatable)
        #[arg(long = "required-phase")]
        required_phases: Vec<String>,
    },

    /// Validate a single overlay descriptor
    ValidateOverlay {
        overlay_path: PathBuf,
        #[arg(long, default_value = "local-run")]
        run_id: String,
        #[arg(long, default_value = "artifacts/evidence_pack")]
        evidence_dir: PathBuf,
    },

    /// Write a default prg.toml for the current directory
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("prg: {err:#}");
            std::process::exit(EXIT_INFRA_FAILURE);
        }
    }
}

fn dispatch(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir()?;
    match cli.cmd {
        Command::Run {
            run_id,
            config,
            pdl_path,
            observed_io,
            phase_outputs,
            measurement_ids,
            anchor_registry,
            overlays_dir,
            evidence_dir,
            required_phases,
        } => {
            let cfg = match config {
                Some(path) => RunConfig::load_from(&path)?,
                None => {
                    let default_path = RunConfig::config_path(&cwd);
                    if default_path.exists() {
                        RunConfig::load_from(&default_path)?
                    } else {
                        RunConfig::default_for_dir()
                    }
                }
            };

            let run_id = run_id.map(RunId::from_str).unwrap_or_else(RunId::new);
            let mut inputs = RunInputs::from_config(&cfg, &cwd, run_id);
            if let Some(path) = pdl_path {
                inputs.pdl_path = path;
            }
            if let Some(path) = observed_io {
                inputs.observed_io = path;
            }
            if let Some(path) = phase_outputs {
                inputs.phase_outputs = path;
            }
            if let Some(path) = measurement_ids {
                inputs.measurement_ids = path;
            }
            if let Some(path) = anchor_registry {
                inputs.anchor_registry = path;
            }
            if let Some(path) = overlays_dir {
                inputs.overlays_dir = path;
            }
            if !required_phases.is_empty() {
                inputs.required_phases = required_phases;
            }
            let evidence_root = evidence_dir.unwrap_or_else(|| cwd.join(cfg.evidence_root()));

            let orchestrator =
                Orchestrator::new(evidence_root).with_reporter(Box::new(TracingReporter));
            match orchestrator.run(&inputs)? {
                GateOutcome::Passed { evidence_dir } => {
                    println!(
                        "Promotion readiness gates passed. Evidence at {}",
                        evidence_dir.display()
                    );
                    Ok(EXIT_PASS)
                }
                GateOutcome::Failed { label, record, .. } => {
                    println!(
                        "Promotion readiness gate failed: {:?} {} (phase {})",
                        label.kind, label.message, label.phase_id
                    );
                    println!("{}", serde_json::to_string_pretty(&label)?);
                    println!("Failure record at {}", record.display());
                    Ok(EXIT_GATE_FAILURE)
                }
            }
        }

        Command::ValidateOverlay {
            overlay_path,
            run_id,
            evidence_dir,
        } => {
            let s = std::fs::read_to_string(&overlay_path)?;
            let document: serde_json::Value = serde_json::from_str(&s)?;
            match validate_overlay(&document, &OverlayStructuralValidator) {
                None => {
                    println!("Overlay validation passed: {}", overlay_path.display());
                    Ok(EXIT_PASS)
                }
                Some(label) => {
                    let run_id = RunId::from_str(run_id);
                    let emitter =
                        FailureEmitter::new(evidence_dir.join(run_id.as_str()).join("failures"));
                    let record = emitter.emit(&label, &run_id, None)?;
                    println!(
                        "Overlay validation failed: {}",
                        serde_json::to_string_pretty(&label)?
                    );
                    println!("Failure record at {}", record.display());
                    Ok(EXIT_GATE_FAILURE)
                }
            }
        }

        Command::Init => {
            let path = RunConfig::config_path(&cwd);
            RunConfig::default_for_dir().save_to(&path)?;
            println!("Wrote {}", path.display());
            Ok(EXIT_PASS)
        }
    }
}
