use std::collections::BTreeMap;

use prg_core::{content_hash, FailureKind, FailureLabel, RunId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Recorded output samples per phase, from repeated executions of one run.
pub type PhaseOutputs = BTreeMap<String, Vec<Value>>;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseReplayStatus {
    Pass,
    Divergent,
    InsufficientSamples,
    Missing,
    NotEvaluated,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhaseReplay {
    pub phase_id: String,
    pub status: PhaseReplayStatus,
    pub samples: usize,
    pub distinct_hashes: Vec<String>,
}

/// Per-phase replay comparison for one run. Written to the evidence pack
/// whether or not the gate failed; the report and the gate outcome are
/// deliberately decoupled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterminismReport {
    pub run_id: String,
    pub required_phases: Vec<String>,
    pub phases: Vec<PhaseReplay>,
    pub pass: bool,
}

/// Replay recorded outputs for each required phase and require hash
/// equality across samples.
///
/// A required phase absent from the recordings is a deterministic failure;
/// a phase with fewer than two samples cannot be assessed and is an IO
/// failure. The first violation stops the walk; later phases are listed in
/// the report as not evaluated.
pub fn replay_check(
    run_id: &RunId,
    phase_outputs: &PhaseOutputs,
    required_phases: &[String],
) -> (Option<FailureLabel>, DeterminismReport) {
    let mut failure: Option<FailureLabel> = None;
    let mut phases = Vec::with_capacity(required_phases.len());

    for phase_id in required_phases {
        if failure.is_some() {
            phases.push(PhaseReplay {
                phase_id: phase_id.clone(),
                status: PhaseReplayStatus::NotEvaluated,
                samples: 0,
                distinct_hashes: Vec::new(),
            });
            continue;
        }

        let (replay, label) = replay_phase(phase_id, phase_outputs.get(phase_id));
        phases.push(replay);
        failure = label;
    }

    let pass = failure.is_none();
    let report = DeterminismReport {
        run_id: run_id.as_str().to_string(),
        required_phases: required_phases.to_vec(),
        phases,
        pass,
    };
    (failure, report)
}

fn replay_phase(phase_id: &str, samples: Option<&Vec<Value>>) -> (PhaseReplay, Option<FailureLabel>) {
    let Some(samples) = samples else {
        let replay = PhaseReplay {
            phase_id: phase_id.to_string(),
            status: PhaseReplayStatus::Missing,
            samples: 0,
            distinct_hashes: Vec::new(),
        };
        let label = FailureLabel::with_evidence(
            FailureKind::DeterministicFailure,
            format!("required phase {phase_id} has no recorded outputs"),
            phase_id,
            json!({"phase_id": phase_id, "divergent_hashes": []}),
        );
        return (replay, Some(label));
    };

    if samples.len() < 2 {
        let replay = PhaseReplay {
            phase_id: phase_id.to_string(),
            status: PhaseReplayStatus::InsufficientSamples,
            samples: samples.len(),
            distinct_hashes: samples.iter().map(content_hash).collect(),
        };
        let label = FailureLabel::with_evidence(
            FailureKind::IoFailure,
            format!(
                "phase {phase_id} has {} recorded sample(s); at least two are needed to assess determinism",
                samples.len()
            ),
            phase_id,
            json!({"phase_id": phase_id, "samples": samples.len()}),
        );
        return (replay, Some(label));
    }

    let mut distinct: Vec<String> = Vec::new();
    for sample in samples {
        let hash = content_hash(sample);
        if !distinct.contains(&hash) {
            distinct.push(hash);
        }
    }

    if distinct.len() > 1 {
        let replay = PhaseReplay {
            phase_id: phase_id.to_string(),
            status: PhaseReplayStatus::Divergent,
            samples: samples.len(),
            distinct_hashes: distinct.clone(),
        };
        let label = FailureLabel::with_evidence(
            FailureKind::DeterministicFailure,
            format!("phase {phase_id} outputs diverge across replays"),
            phase_id,
            json!({"phase_id": phase_id, "divergent_hashes": distinct}),
        );
        return (replay, Some(label));
    }

    let replay = PhaseReplay {
        phase_id: phase_id.to_string(),
        status: PhaseReplayStatus::Pass,
        samples: samples.len(),
        distinct_hashes: distinct,
    };
    (replay, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> Vec<String> {
        ["normalize", "analyze", "validate", "compare"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn identical_outputs() -> PhaseOutputs {
        let mut outputs = PhaseOutputs::new();
        for phase in ["normalize", "analyze", "validate", "compare"] {
            outputs.insert(
                phase.to_string(),
                vec![json!({"phase": phase, "rows": 3}), json!({"phase": phase, "rows": 3})],
            );
        }
        outputs
    }

    #[test]
    fn identical_samples_pass_every_phase() {
        let (failure, report) =
            replay_check(&RunId::from_str("r1"), &identical_outputs(), &required());
        assert!(failure.is_none());
        assert!(report.pass);
        assert_eq!(report.phases.len(), 4);
        assert!(report
            .phases
            .iter()
            .all(|p| p.status == PhaseReplayStatus::Pass && p.distinct_hashes.len() == 1));
    }

    #[test]
    fn mutated_sample_names_the_phase() {
        let mut outputs = identical_outputs();
        outputs.get_mut("compare").unwrap()[1] = json!({"phase": "compare", "rows": 4});
        let (failure, report) = replay_check(&RunId::from_str("r1"), &outputs, &required());
        let label = failure.unwrap();
        assert_eq!(label.kind, FailureKind::DeterministicFailure);
        assert_eq!(label.phase_id, "compare");
        assert_eq!(label.evidence.unwrap()["divergent_hashes"].as_array().unwrap().len(), 2);
        assert!(!report.pass);
    }

    #[test]
    fn report_is_full_even_on_failure() {
        let mut outputs = identical_outputs();
        outputs.get_mut("analyze").unwrap()[0] = json!("mutated");
        let (_, report) = replay_check(&RunId::from_str("r1"), &outputs, &required());
        assert_eq!(report.phases.len(), 4);
        assert_eq!(report.phases[1].status, PhaseReplayStatus::Divergent);
        assert_eq!(report.phases[2].status, PhaseReplayStatus::NotEvaluated);
        assert_eq!(report.phases[3].status, PhaseReplayStatus::NotEvaluated);
    }

    #[test]
    fn absent_phase_is_deterministic_failure() {
        let mut outputs = identical_outputs();
        outputs.remove("validate");
        let (failure, report) = replay_check(&RunId::from_str("r1"), &outputs, &required());
        let label = failure.unwrap();
        assert_eq!(label.kind, FailureKind::DeterministicFailure);
        assert_eq!(label.phase_id, "validate");
        assert_eq!(report.phases[2].status, PhaseReplayStatus::Missing);
    }

    #[test]
    fn single_sample_is_io_failure() {
        let mut outputs = identical_outputs();
        outputs.get_mut("normalize").unwrap().truncate(1);
        let (failure, _) = replay_check(&RunId::from_str("r1"), &outputs, &required());
        let label = failure.unwrap();
        assert_eq!(label.kind, FailureKind::IoFailure);
        assert_eq!(label.phase_id, "normalize");
    }

    #[test]
    fn key_order_differences_do_not_diverge() {
        let mut outputs = PhaseOutputs::new();
        outputs.insert(
            "normalize".to_string(),
            vec![
                serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap(),
                serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap(),
            ],
        );
        let (failure, _) = replay_check(
            &RunId::from_str("r1"),
            &outputs,
            &["normalize".to_string()],
        );
        assert!(failure.is_none());
    }
}
