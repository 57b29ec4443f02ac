use std::path::{Path, PathBuf};

use anyhow::Result;
use prg_checks::{bijectivity_check, replay_check, PhaseOutputs, BIJECTIVITY_PHASE};
use prg_core::{
    content_hash, AnchorId, AnchorMetadata, AnchorStatus, FailureKind, FailureLabel, RunId,
};
use prg_evidence::{EvidenceSink, FailureEmitter, FsEvidencePack, ReportKind};
use prg_pdl::{
    build_manifest, detect_collapse, load_pdl_document, parse_pdl, validate_overlay, ObservedIo,
    OverlayStructuralValidator, Pdl, PdlStructuralValidator, StructuralValidator,
    ValidationReport,
};
use prg_registry::{enforce_anchor, AnchorEntry, AnchorRegistry, ANCHOR_PHASE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::RunConfig;
use crate::reporter::{GateReporter, NullReporter};
use crate::state::GateState;
use crate::util::read_json_fixture;

/// Phase id used by validation-stage failures.
pub const VALIDATE_PHASE: &str = "validate";
/// Phase id used by phase-IO fixture failures.
pub const PHASE_IO_PHASE: &str = "phase_io";
/// Phase id used by determinism fixture failures.
pub const DETERMINISM_PHASE: &str = "determinism";

/// Everything one gate run needs, resolved to concrete paths.
#[derive(Clone, Debug)]
pub struct RunInputs {
    pub run_id: RunId,
    pub pdl_path: PathBuf,
    pub observed_io: PathBuf,
    pub phase_outputs: PathBuf,
    pub measurement_ids: PathBuf,
    pub anchor_registry: PathBuf,
    pub overlays_dir: PathBuf,
    pub required_phases: Vec<String>,
}

impl RunInputs {
    pub fn from_config(cfg: &RunConfig, base: &Path, run_id: RunId) -> Self {
        Self {
            run_id,
            pdl_path: base.join(&cfg.fixtures.pdl_path),
            observed_io: base.join(&cfg.fixtures.observed_io),
            phase_outputs: base.join(&cfg.fixtures.phase_outputs),
            measurement_ids: base.join(&cfg.fixtures.measurement_ids),
            anchor_registry: base.join(&cfg.fixtures.anchor_registry),
            overlays_dir: base.join(&cfg.fixtures.overlays_dir),
            required_phases: cfg.gates.required_phases.clone(),
        }
    }
}

/// Self-describing manifest closing out a passing run. Carries its own
/// anchor block so downstream consumers can hold this artifact to the same
/// contract it checks for others.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlayChainManifest {
    pub anchor: AnchorMetadata,
    pub run_id: String,
    pub registry_snapshot: Vec<AnchorEntry>,
    pub overlays: Vec<Value>,
    pub inputs_hash: String,
}

impl OverlayChainManifest {
    pub fn assemble(
        run_id: &RunId,
        registry_snapshot: Vec<AnchorEntry>,
        overlays: Vec<Value>,
    ) -> Self {
        let anchor = AnchorMetadata {
            anchor_id: AnchorId::from_str("overlay_chain_manifest"),
            anchor_version: "1.0.0".to_string(),
            scope: "run".to_string(),
            owner: Some("prg.orchestrator".to_string()),
            status: Some(AnchorStatus::Draft),
        };
        // The hash covers the payload without the hash field itself.
        let payload = json!({
            "anchor": &anchor,
            "run_id": run_id.as_str(),
            "registry_snapshot": &registry_snapshot,
            "overlays": &overlays,
        });
        let inputs_hash = content_hash(&payload);
        Self {
            anchor,
            run_id: run_id.as_str().to_string(),
            registry_snapshot,
            overlays,
            inputs_hash,
        }
    }
}

#[derive(Debug)]
pub enum GateOutcome {
    Passed {
        evidence_dir: PathBuf,
    },
    Failed {
        label: FailureLabel,
        record: PathBuf,
        evidence_dir: PathBuf,
        /// Stage the run was in when it moved to `Failed`.
        failed_at: GateState,
    },
}

/// Stage result: either the stage's product or the classified failure that
/// stops the run. Infrastructure errors (evidence pack unwritable) travel
/// separately as `anyhow::Error`.
type Step<T> = std::result::Result<T, FailureLabel>;

/// Runs the readiness gate sequence for one run and leaves the evidence
/// pack behind.
pub struct Orchestrator {
    pack: FsEvidencePack,
    validator: Box<dyn StructuralValidator>,
    reporter: Box<dyn GateReporter>,
}

impl Orchestrator {
    pub fn new(evidence_root: PathBuf) -> Self {
        Self {
            pack: FsEvidencePack::new(evidence_root),
            validator: Box::new(PdlStructuralValidator),
            reporter: Box::new(NullReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn GateReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn StructuralValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn run(&self, inputs: &RunInputs) -> Result<GateOutcome> {
        let run_dir = self.pack.create_run_dir(&inputs.run_id)?;
        let emitter = FailureEmitter::new(run_dir.join("failures"));

        let mut state = GateState::Validating;
        self.reporter.stage_started(state);
        let (pdl, report_path) = match self.validate_pdl(inputs, &run_dir)? {
            Ok(validated) => validated,
            Err(label) => return self.fail(state, label, &emitter, inputs, &run_dir),
        };
        self.reporter.stage_passed(state);

        state = state.next();
        self.reporter.stage_started(state);
        if let Some(label) = self.check_anchor(inputs, &pdl, &report_path) {
            return self.fail(state, label, &emitter, inputs, &run_dir);
        }
        self.reporter.stage_passed(state);

        state = state.next();
        self.reporter.stage_started(state);
        if let Err(label) = self.build_phase_io(inputs, &pdl, &run_dir)? {
            return self.fail(state, label, &emitter, inputs, &run_dir);
        }
        self.reporter.stage_passed(state);

        state = state.next();
        self.reporter.stage_started(state);
        if let Err(label) = self.check_determinism(inputs, &run_dir)? {
            return self.fail(state, label, &emitter, inputs, &run_dir);
        }
        self.reporter.stage_passed(state);

        state = state.next();
        self.reporter.stage_started(state);
        if let Err(label) = self.check_bijectivity(inputs, &run_dir)? {
            return self.fail(state, label, &emitter, inputs, &run_dir);
        }
        self.reporter.stage_passed(state);

        state = state.next();
        self.reporter.stage_started(state);
        if let Err(label) = self.assemble_overlay(inputs, &run_dir)? {
            return self.fail(state, label, &emitter, inputs, &run_dir);
        }
        self.reporter.stage_passed(state);

        state = state.next();
        debug_assert_eq!(state, GateState::Done);
        self.reporter.run_passed(&run_dir);
        Ok(GateOutcome::Passed {
            evidence_dir: run_dir,
        })
    }

    fn fail(
        &self,
        state: GateState,
        label: FailureLabel,
        emitter: &FailureEmitter,
        inputs: &RunInputs,
        run_dir: &Path,
    ) -> Result<GateOutcome> {
        let record = emitter.emit(&label, &inputs.run_id, None)?;
        self.reporter.gate_failed(state, &label);
        Ok(GateOutcome::Failed {
            label,
            record,
            evidence_dir: run_dir.to_path_buf(),
            failed_at: state,
        })
    }

    fn validate_pdl(&self, inputs: &RunInputs, run_dir: &Path) -> Result<Step<(Pdl, PathBuf)>> {
        let document = match load_pdl_document(&inputs.pdl_path) {
            Ok(document) => document,
            Err(err) => return Ok(Err(err.to_label(VALIDATE_PHASE))),
        };

        let outcome = self.validator.validate(&document);
        let anchor: Option<AnchorMetadata> = document
            .get("anchor")
            .and_then(|a| serde_json::from_value(a.clone()).ok());
        let report = ValidationReport {
            run_id: inputs.run_id.as_str().to_string(),
            artifact: inputs.pdl_path.display().to_string(),
            passed: outcome.passed(),
            issues: outcome.issues().to_vec(),
            document_hash: content_hash(&document),
            anchor,
        };
        let report_path =
            self.pack
                .write_json(run_dir, ReportKind::Validation, &inputs.run_id, &report)?;

        if !outcome.passed() {
            return Ok(Err(FailureLabel::with_evidence(
                FailureKind::SchemaFailure,
                format!(
                    "pipeline description failed structural validation: {}",
                    inputs.pdl_path.display()
                ),
                VALIDATE_PHASE,
                json!({"issues": outcome.issues()}),
            )));
        }

        match parse_pdl(&document) {
            Ok(pdl) => Ok(Ok((pdl, report_path))),
            Err(err) => Ok(Err(FailureLabel::new(
                FailureKind::SchemaFailure,
                format!("pipeline description does not match the expected shape: {err}"),
                VALIDATE_PHASE,
            ))),
        }
    }

    fn check_anchor(&self, inputs: &RunInputs, pdl: &Pdl, report_path: &Path) -> Option<FailureLabel> {
        let registry = match AnchorRegistry::new(&inputs.anchor_registry).load() {
            Ok(snapshot) => snapshot,
            Err(err) => return Some(err.to_label(ANCHOR_PHASE)),
        };
        let Some(metadata) = pdl.anchor.as_ref() else {
            return Some(FailureLabel::new(
                FailureKind::ToolMismatch,
                "artifact declares no anchor",
                ANCHOR_PHASE,
            ));
        };
        enforce_anchor(report_path, metadata, &registry)
    }

    fn build_phase_io(&self, inputs: &RunInputs, pdl: &Pdl, run_dir: &Path) -> Result<Step<()>> {
        let value = match read_json_fixture(&inputs.observed_io, PHASE_IO_PHASE) {
            Ok(value) => value,
            Err(label) => return Ok(Err(label)),
        };
        let observed: ObservedIo = match serde_json::from_value(value) {
            Ok(observed) => observed,
            Err(err) => {
                return Ok(Err(FailureLabel::new(
                    FailureKind::SchemaFailure,
                    format!("observed IO fixture does not match the expected shape: {err}"),
                    PHASE_IO_PHASE,
                )))
            }
        };

        let manifest = build_manifest(pdl, &observed);
        if let Some(label) = detect_collapse(&manifest) {
            return Ok(Err(label));
        }
        self.pack
            .write_json(run_dir, ReportKind::PhaseIo, &inputs.run_id, &manifest)?;
        Ok(Ok(()))
    }

    fn check_determinism(&self, inputs: &RunInputs, run_dir: &Path) -> Result<Step<()>> {
        let value = match read_json_fixture(&inputs.phase_outputs, DETERMINISM_PHASE) {
            Ok(value) => value,
            Err(label) => return Ok(Err(label)),
        };
        let outputs: PhaseOutputs = match serde_json::from_value(value) {
            Ok(outputs) => outputs,
            Err(err) => {
                return Ok(Err(FailureLabel::new(
                    FailureKind::SchemaFailure,
                    format!("phase outputs fixture does not match the expected shape: {err}"),
                    DETERMINISM_PHASE,
                )))
            }
        };

        let (failure, report) = replay_check(&inputs.run_id, &outputs, &inputs.required_phases);
        // Best-effort report: written before the gate verdict is applied.
        self.pack
            .write_json(run_dir, ReportKind::Determinism, &inputs.run_id, &report)?;
        match failure {
            Some(label) => Ok(Err(label)),
            None => Ok(Ok(())),
        }
    }

    fn check_bijectivity(&self, inputs: &RunInputs, run_dir: &Path) -> Result<Step<()>> {
        #[derive(Deserialize)]
        struct MeasurementIds {
            #[serde(default)]
            ids: Vec<i64>,
        }

        let value = match read_json_fixture(&inputs.measurement_ids, BIJECTIVITY_PHASE) {
            Ok(value) => value,
            Err(label) => return Ok(Err(label)),
        };
        let fixture: MeasurementIds = match serde_json::from_value(value) {
            Ok(fixture) => fixture,
            Err(err) => {
                return Ok(Err(FailureLabel::new(
                    FailureKind::SchemaFailure,
                    format!("measurement ids fixture does not match the expected shape: {err}"),
                    BIJECTIVITY_PHASE,
                )))
            }
        };

        let (failure, report) = bijectivity_check(&fixture.ids);
        self.pack
            .write_json(run_dir, ReportKind::Bijectivity, &inputs.run_id, &report)?;
        match failure {
            Some(label) => Ok(Err(label)),
            None => Ok(Ok(())),
        }
    }

    fn assemble_overlay(&self, inputs: &RunInputs, run_dir: &Path) -> Result<Step<()>> {
        let registry = match AnchorRegistry::new(&inputs.anchor_registry).load() {
            Ok(snapshot) => snapshot,
            Err(err) => return Ok(Err(err.to_label(VALIDATE_PHASE))),
        };

        let mut overlays: Vec<Value> = Vec::new();
        if inputs.overlays_dir.exists() {
            let mut paths: Vec<PathBuf> = Vec::new();
            let entries = match std::fs::read_dir(&inputs.overlays_dir) {
                Ok(entries) => entries,
                Err(err) => {
                    return Ok(Err(FailureLabel::new(
                        FailureKind::IoFailure,
                        format!(
                            "cannot list overlays dir {}: {err}",
                            inputs.overlays_dir.display()
                        ),
                        VALIDATE_PHASE,
                    )))
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    paths.push(path);
                }
            }
            paths.sort();

            for path in paths {
                let document = match read_json_fixture(&path, VALIDATE_PHASE) {
                    Ok(document) => document,
                    Err(label) => return Ok(Err(label)),
                };
                if let Some(label) = validate_overlay(&document, &OverlayStructuralValidator) {
                    return Ok(Err(label));
                }
                overlays.push(document);
            }
        }

        let manifest = OverlayChainManifest::assemble(&inputs.run_id, registry.entries, overlays);
        self.pack
            .write_json(run_dir, ReportKind::OverlayChain, &inputs.run_id, &manifest)?;
        Ok(Ok(()))
    }
}
