use std::path::Path;

use prg_core::{AnchorId, AnchorMetadata, AnchorStatus, FailureKind, FailureLabel};
use serde_json::json;

use crate::registry::RegistrySnapshot;

/// Phase id reported by anchor enforcement failures.
pub const ANCHOR_PHASE: &str = "anchor_check";

/// Check an artifact's declared anchor block against the registry.
///
/// Check order: existence, status, scope, version, stopping at the first
/// violation. Missing, revoked, and mismatched anchors are distinguished by
/// message and evidence but share kind `tool_mismatch`.
pub fn enforce_anchor(
    artifact_path: &Path,
    metadata: &AnchorMetadata,
    registry: &RegistrySnapshot,
) -> Option<FailureLabel> {
    let artifact = artifact_path.display().to_string();

    let Some(entry) = registry.get(&metadata.anchor_id) else {
        return Some(FailureLabel::with_evidence(
            FailureKind::ToolMismatch,
            format!("anchor {} is not registered", metadata.anchor_id.as_str()),
            ANCHOR_PHASE,
            json!({"artifact": artifact, "anchor_id": metadata.anchor_id}),
        ));
    };

    if entry.status == AnchorStatus::Revoked {
        return Some(FailureLabel::with_evidence(
            FailureKind::ToolMismatch,
            format!("anchor {} is revoked", metadata.anchor_id.as_str()),
            ANCHOR_PHASE,
            json!({"artifact": artifact, "anchor_id": metadata.anchor_id, "status": "revoked"}),
        ));
    }

    if entry.scope != metadata.scope {
        return Some(FailureLabel::with_evidence(
            FailureKind::ToolMismatch,
            format!(
                "anchor {} scope mismatch: declared {}, registered {}",
                metadata.anchor_id.as_str(), metadata.scope, entry.scope
            ),
            ANCHOR_PHASE,
            json!({
                "artifact": artifact,
                "anchor_id": metadata.anchor_id,
                "declared_scope": metadata.scope,
                "registered_scope": entry.scope,
            }),
        ));
    }

    if entry.anchor_version != metadata.anchor_version {
        return Some(FailureLabel::with_evidence(
            FailureKind::ToolMismatch,
            format!(
                "anchor {} version {} is not a registered version",
                metadata.anchor_id.as_str(), metadata.anchor_version
            ),
            ANCHOR_PHASE,
            json!({
                "artifact": artifact,
                "anchor_id": metadata.anchor_id,
                "declared_version": metadata.anchor_version,
                "registered_version": entry.anchor_version,
            }),
        ));
    }

    None
}
