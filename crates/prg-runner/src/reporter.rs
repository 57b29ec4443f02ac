use std::path::Path;

use prg_core::FailureLabel;

use crate::state::GateState;

/// Progress sink for the orchestrator. Injected so runs stay deterministic
/// under test; the CLI wires a tracing-backed implementation.
pub trait GateReporter: Send + Sync {
    fn stage_started(&self, state: GateState);
    fn stage_passed(&self, state: GateState);
    fn gate_failed(&self, state: GateState, label: &FailureLabel);
    fn run_passed(&self, evidence_dir: &Path);
}

pub struct TracingReporter;

impl GateReporter for TracingReporter {
    fn stage_started(&self, state: GateState) {
        tracing::debug!(?state, "gate stage started");
    }

    fn stage_passed(&self, state: GateState) {
        tracing::info!(?state, "gate stage passed");
    }

    fn gate_failed(&self, state: GateState, label: &FailureLabel) {
        tracing::error!(
            ?state,
            kind = ?label.kind,
            phase_id = %label.phase_id,
            message = %label.message,
            "gate failed"
        );
    }

    fn run_passed(&self, evidence_dir: &Path) {
        tracing::info!(evidence_dir = %evidence_dir.display(), "promotion readiness gates passed");
    }
}

pub struct NullReporter;

impl GateReporter for NullReporter {
    fn stage_started(&self, _state: GateState) {}
    fn stage_passed(&self, _state: GateState) {}
    fn gate_failed(&self, _state: GateState, _label: &FailureLabel) {}
    fn run_passed(&self, _evidence_dir: &Path) {}
}
