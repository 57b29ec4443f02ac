use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::redact::sanitize_value;

/// Closed failure taxonomy shared by every gate stage.
///
/// Serialization is snake_case; deserializing any string outside the set
/// fails, so an unrecognized kind can never round-trip into an emitted
/// record.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DeterministicFailure,
    SchemaFailure,
    IoFailure,
    ToolMismatch,
    ReproducibilityFailure,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("failure label message must be non-empty")]
    EmptyMessage,
    #[error("failure label phase_id must be non-empty")]
    EmptyPhaseId,
}

/// One classified gate failure. Immutable once constructed; persistence
/// always goes through [`FailureLabel::sanitized`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FailureLabel {
    pub kind: FailureKind,
    pub message: String,
    pub phase_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Value>,
}

impl FailureLabel {
    pub fn new(kind: FailureKind, message: impl Into<String>, phase_id: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            phase_id: phase_id.into(),
            evidence: None,
        }
    }

    pub fn with_evidence(
        kind: FailureKind,
        message: impl Into<String>,
        phase_id: impl Into<String>,
        evidence: Value,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            phase_id: phase_id.into(),
            evidence: Some(evidence),
        }
    }

    pub fn validate(&self) -> Result<(), LabelError> {
        if self.message.is_empty() {
            return Err(LabelError::EmptyMessage);
        }
        if self.phase_id.is_empty() {
            return Err(LabelError::EmptyPhaseId);
        }
        Ok(())
    }

    /// Copy with the evidence payload redacted. Raw evidence must never be
    /// hashed or persisted.
    pub fn sanitized(&self) -> FailureLabel {
        FailureLabel {
            kind: self.kind,
            message: self.message.clone(),
            phase_id: self.phase_id.clone(),
            evidence: self.evidence.as_ref().map(sanitize_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redact::REDACTED;
    use serde_json::json;

    #[test]
    fn kind_serializes_snake_case() {
        let s = serde_json::to_string(&FailureKind::DeterministicFailure).unwrap();
        assert_eq!(s, "\"deterministic_failure\"");
        let s = serde_json::to_string(&FailureKind::ToolMismatch).unwrap();
        assert_eq!(s, "\"tool_mismatch\"");
    }

    #[test]
    fn unknown_kind_fails_to_deserialize() {
        let res: Result<FailureKind, _> = serde_json::from_str("\"surprise_failure\"");
        assert!(res.is_err());
    }

    #[test]
    fn validate_rejects_empty_fields() {
        let label = FailureLabel::new(FailureKind::SchemaFailure, "", "validate");
        assert_eq!(label.validate(), Err(LabelError::EmptyMessage));
        let label = FailureLabel::new(FailureKind::SchemaFailure, "bad shape", "");
        assert_eq!(label.validate(), Err(LabelError::EmptyPhaseId));
        let label = FailureLabel::new(FailureKind::SchemaFailure, "bad shape", "validate");
        assert!(label.validate().is_ok());
    }

    #[test]
    fn sanitized_redacts_evidence_only() {
        let label = FailureLabel::with_evidence(
            FailureKind::ToolMismatch,
            "registry drift",
            "anchor_check",
            json!({"api_key": "k", "detail": "ok"}),
        );
        let clean = label.sanitized();
        let evidence = clean.evidence.unwrap();
        assert_eq!(evidence["api_key"], REDACTED);
        assert_eq!(evidence["detail"], "ok");
        assert_eq!(clean.message, "registry drift");
    }
}
