use std::collections::BTreeMap;

use prg_core::{FailureKind, FailureLabel};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Phase id reported by bijectivity failures.
pub const BIJECTIVITY_PHASE: &str = "bijectivity";

/// Duplicate/missing analysis of a measurement id list. Persisted for
/// auditability regardless of the pass/fail outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BijectivityReport {
    pub ids: Vec<i64>,
    pub duplicates: Vec<i64>,
    pub missing_indices: Vec<i64>,
    pub pass: bool,
}

/// Verify that `ids` enumerates the contiguous index domain `[0, len)`
/// without repeats.
///
/// Duplicates break measurement identity and fail the gate as a
/// deterministic failure. Missing indices are recorded in the report but do
/// not fail on their own.
pub fn bijectivity_check(ids: &[i64]) -> (Option<FailureLabel>, BijectivityReport) {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for id in ids {
        *counts.entry(*id).or_insert(0) += 1;
    }

    let duplicates: Vec<i64> = counts
        .iter()
        .filter(|(_, n)| **n > 1)
        .map(|(id, _)| *id)
        .collect();
    let missing_indices: Vec<i64> = (0..ids.len() as i64)
        .filter(|idx| !counts.contains_key(idx))
        .collect();

    let failure = if duplicates.is_empty() {
        None
    } else {
        Some(FailureLabel::with_evidence(
            FailureKind::DeterministicFailure,
            format!("measurement ids contain duplicates: {duplicates:?}"),
            BIJECTIVITY_PHASE,
            json!({"duplicates": duplicates, "missing_indices": missing_indices}),
        ))
    };

    let report = BijectivityReport {
        ids: ids.to_vec(),
        duplicates,
        missing_indices,
        pass: failure.is_none(),
    };
    (failure, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_cover_passes() {
        let (failure, report) = bijectivity_check(&[0, 1, 2, 3]);
        assert!(failure.is_none());
        assert!(report.pass);
        assert!(report.duplicates.is_empty());
        assert!(report.missing_indices.is_empty());
    }

    #[test]
    fn order_does_not_matter() {
        let (failure, _) = bijectivity_check(&[3, 0, 2, 1]);
        assert!(failure.is_none());
    }

    #[test]
    fn any_duplicate_fails_the_gate() {
        let (failure, report) = bijectivity_check(&[0, 1, 1, 3]);
        let label = failure.unwrap();
        assert_eq!(label.kind, FailureKind::DeterministicFailure);
        assert_eq!(report.duplicates, vec![1]);
        assert_eq!(report.missing_indices, vec![2]);
        assert!(!report.pass);
    }

    #[test]
    fn missing_alone_is_recorded_but_passes() {
        // Ids outside the domain leave gaps without repeating anything.
        let (failure, report) = bijectivity_check(&[0, 1, 7]);
        assert!(failure.is_none());
        assert_eq!(report.missing_indices, vec![2]);
        assert!(report.pass);
    }

    #[test]
    fn empty_ids_pass_vacuously() {
        let (failure, report) = bijectivity_check(&[]);
        assert!(failure.is_none());
        assert!(report.pass);
    }

    #[test]
    fn report_sets_are_sorted() {
        let (_, report) = bijectivity_check(&[5, 5, 3, 3, 0]);
        assert_eq!(report.duplicates, vec![3, 5]);
        assert_eq!(report.missing_indices, vec![1, 2, 4]);
    }
}
