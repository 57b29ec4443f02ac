use std::collections::BTreeSet;

use prg_core::{FailureKind, FailureLabel};
use serde_json::json;

use crate::manifest::{PhaseIoEntry, PhaseIoManifest};

/// Find the first phase, in declaration order, that failed to produce a
/// distinguishable effect: it declared outputs but observed none, or its
/// observed outputs are identical to its observed inputs despite declaring
/// distinct outputs.
///
/// Only the first collapse is reported; the gate is fail-fast and the
/// evidence stays minimal.
pub fn detect_collapse(manifest: &PhaseIoManifest) -> Option<FailureLabel> {
    manifest.phases.iter().find_map(collapsed)
}

fn collapsed(entry: &PhaseIoEntry) -> Option<FailureLabel> {
    if entry.declared_outputs.is_empty() {
        return None;
    }

    let produced_nothing = entry.observed_outputs.is_empty();
    let declares_distinct_outputs = as_set(&entry.declared_outputs) != as_set(&entry.declared_inputs);
    let outputs_mirror_inputs = !produced_nothing
        && declares_distinct_outputs
        && as_set(&entry.observed_outputs) == as_set(&entry.observed_inputs);

    if !produced_nothing && !outputs_mirror_inputs {
        return None;
    }

    Some(FailureLabel::with_evidence(
        FailureKind::ReproducibilityFailure,
        format!("phase {} produced no distinguishable outputs", entry.phase_id),
        entry.phase_id.clone(),
        json!({
            "phase_id": entry.phase_id,
            "declared_outputs": entry.declared_outputs,
            "observed_outputs": entry.observed_outputs,
        }),
    ))
}

fn as_set(names: &[String]) -> BTreeSet<&str> {
    names.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        id: &str,
        declared_in: &[&str],
        declared_out: &[&str],
        observed_in: &[&str],
        observed_out: &[&str],
    ) -> PhaseIoEntry {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        PhaseIoEntry {
            phase_id: id.into(),
            declared_inputs: owned(declared_in),
            declared_outputs: owned(declared_out),
            observed_inputs: owned(observed_in),
            observed_outputs: owned(observed_out),
        }
    }

    #[test]
    fn healthy_phase_passes() {
        let manifest = PhaseIoManifest {
            phases: vec![entry("normalize", &["raw"], &["normalized"], &["raw"], &["normalized"])],
        };
        assert!(detect_collapse(&manifest).is_none());
    }

    #[test]
    fn declared_outputs_but_observed_none_collapses() {
        let manifest = PhaseIoManifest {
            phases: vec![entry("analyze", &["normalized"], &["analysis"], &["normalized"], &[])],
        };
        let label = detect_collapse(&manifest).unwrap();
        assert_eq!(label.kind, FailureKind::ReproducibilityFailure);
        assert_eq!(label.phase_id, "analyze");
        let evidence = label.evidence.unwrap();
        assert_eq!(evidence["declared_outputs"][0], "analysis");
    }

    #[test]
    fn outputs_identical_to_inputs_collapses() {
        let manifest = PhaseIoManifest {
            phases: vec![entry("analyze", &["normalized"], &["analysis"], &["data"], &["data"])],
        };
        assert!(detect_collapse(&manifest).is_some());
    }

    #[test]
    fn passthrough_phase_declared_as_such_is_fine() {
        // Declared outputs equal declared inputs: the phase never promised a
        // distinct transformation.
        let manifest = PhaseIoManifest {
            phases: vec![entry("relay", &["data"], &["data"], &["data"], &["data"])],
        };
        assert!(detect_collapse(&manifest).is_none());
    }

    #[test]
    fn phase_with_no_declared_outputs_is_skipped() {
        let manifest = PhaseIoManifest {
            phases: vec![entry("sink", &["data"], &[], &["data"], &[])],
        };
        assert!(detect_collapse(&manifest).is_none());
    }

    #[test]
    fn first_collapse_in_declaration_order_wins() {
        let manifest = PhaseIoManifest {
            phases: vec![
                entry("normalize", &["raw"], &["normalized"], &["raw"], &["normalized"]),
                entry("analyze", &["normalized"], &["analysis"], &["normalized"], &[]),
                entry("validate", &["analysis"], &["verdict"], &["analysis"], &[]),
            ],
        };
        assert_eq!(detect_collapse(&manifest).unwrap().phase_id, "analyze");
    }
}
