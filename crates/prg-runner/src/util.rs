use std::path::Path;

use prg_core::{FailureKind, FailureLabel};
use serde_json::Value;

/// Read and parse a JSON fixture, classifying problems at the stage
/// boundary: a missing or unreadable file is an IO failure, unparseable
/// content a schema failure.
pub fn read_json_fixture(path: &Path, phase_id: &str) -> Result<Value, FailureLabel> {
    let s = std::fs::read_to_string(path).map_err(|err| {
        FailureLabel::new(
            FailureKind::IoFailure,
            format!("cannot read fixture {}: {err}", path.display()),
            phase_id,
        )
    })?;
    serde_json::from_str(&s).map_err(|err| {
        FailureLabel::new(
            FailureKind::SchemaFailure,
            format!("fixture {} is not valid JSON: {err}", path.display()),
            phase_id,
        )
    })
}
