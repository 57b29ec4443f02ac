use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Pdl;

/// Observed IO fixture: phase id -> what the run actually consumed and
/// produced.
pub type ObservedIo = BTreeMap<String, ObservedPhaseIo>;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObservedPhaseIo {
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

/// Declared-vs-observed IO for every phase, in declaration order. Built
/// fresh per run and persisted as the manifest artifact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhaseIoManifest {
    pub phases: Vec<PhaseIoEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhaseIoEntry {
    pub phase_id: String,
    pub declared_inputs: Vec<String>,
    pub declared_outputs: Vec<String>,
    pub observed_inputs: Vec<String>,
    pub observed_outputs: Vec<String>,
}

/// Pair every declared phase with its recorded observations. A phase with
/// no observation gets empty observed sets; whether that matters is the
/// collapse detector's call, not an error here.
pub fn build_manifest(pdl: &Pdl, observed: &ObservedIo) -> PhaseIoManifest {
    let phases = pdl
        .phases
        .iter()
        .map(|decl| {
            let obs = observed.get(&decl.id).cloned().unwrap_or_default();
            PhaseIoEntry {
                phase_id: decl.id.clone(),
                declared_inputs: decl.inputs.clone(),
                declared_outputs: decl.outputs.clone(),
                observed_inputs: obs.inputs,
                observed_outputs: obs.outputs,
            }
        })
        .collect();
    PhaseIoManifest { phases }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PhaseDecl;

    fn pdl() -> Pdl {
        Pdl {
            pipeline: Some("example".into()),
            anchor: None,
            phases: vec![
                PhaseDecl {
                    id: "normalize".into(),
                    inputs: vec!["raw".into()],
                    outputs: vec!["normalized".into()],
                },
                PhaseDecl {
                    id: "analyze".into(),
                    inputs: vec!["normalized".into()],
                    outputs: vec!["analysis".into()],
                },
            ],
        }
    }

    #[test]
    fn pairs_declared_with_observed() {
        let mut observed = ObservedIo::new();
        observed.insert(
            "normalize".into(),
            ObservedPhaseIo {
                inputs: vec!["raw".into()],
                outputs: vec!["normalized".into()],
            },
        );
        let manifest = build_manifest(&pdl(), &observed);
        assert_eq!(manifest.phases.len(), 2);
        assert_eq!(manifest.phases[0].observed_outputs, vec!["normalized"]);
    }

    #[test]
    fn unobserved_phase_gets_empty_sets() {
        let manifest = build_manifest(&pdl(), &ObservedIo::new());
        assert!(manifest.phases[1].observed_inputs.is_empty());
        assert!(manifest.phases[1].observed_outputs.is_empty());
    }

    #[test]
    fn preserves_declaration_order() {
        let manifest = build_manifest(&pdl(), &ObservedIo::new());
        let ids: Vec<_> = manifest.phases.iter().map(|p| p.phase_id.as_str()).collect();
        assert_eq!(ids, vec!["normalize", "analyze"]);
    }
}
