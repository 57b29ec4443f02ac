use prg_core::{AnchorMetadata, FailureKind, FailureLabel};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::validate::{StructuralValidator, ValidationIssue, ValidationOutcome};

/// Scoped modification applied on top of a base artifact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlayDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AnchorMetadata>,
    #[serde(default)]
    pub operations: Vec<OverlayOperation>,
    #[serde(default)]
    pub precedence: OverlayPrecedence,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlayOperation {
    pub op: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OverlayPrecedence {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub notes: String,
}

/// Built-in structural checks for overlay descriptors.
pub struct OverlayStructuralValidator;

impl StructuralValidator for OverlayStructuralValidator {
    fn validate(&self, document: &Value) -> ValidationOutcome {
        let mut issues = Vec::new();

        let Some(root) = document.as_object() else {
            return ValidationOutcome::Fail(vec![ValidationIssue {
                message: "overlay must be a mapping".into(),
                path: String::new(),
            }]);
        };

        match root.get("operations").and_then(Value::as_array) {
            None => issues.push(ValidationIssue {
                message: "operations must be a sequence".into(),
                path: "operations".into(),
            }),
            Some(ops) => {
                for (idx, op) in ops.iter().enumerate() {
                    let object = op.as_object();
                    let has_op = object
                        .and_then(|o| o.get("op"))
                        .and_then(Value::as_str)
                        .map(|s| !s.is_empty())
                        .unwrap_or(false);
                    let has_path = object
                        .and_then(|o| o.get("path"))
                        .and_then(Value::as_str)
                        .map(|s| !s.is_empty())
                        .unwrap_or(false);
                    if !has_op || !has_path {
                        issues.push(ValidationIssue {
                            message: "operation needs non-empty op and path".into(),
                            path: format!("operations[{idx}]"),
                        });
                    }
                }
            }
        }

        if issues.is_empty() {
            ValidationOutcome::Pass
        } else {
            ValidationOutcome::Fail(issues)
        }
    }
}

/// Validate one overlay descriptor: schema first, then the two structural
/// rules this layer owns: no two operations may target the same path, and
/// a global-scope overlay must carry explicit precedence notes.
pub fn validate_overlay(
    document: &Value,
    validator: &dyn StructuralValidator,
) -> Option<FailureLabel> {
    let mut issues: Vec<ValidationIssue> = match validator.validate(document) {
        ValidationOutcome::Pass => Vec::new(),
        ValidationOutcome::Fail(issues) => issues,
    };

    if issues.is_empty() {
        // Structural rules run on the typed descriptor; a document that
        // passed the schema but does not parse is itself a violation.
        match serde_json::from_value::<OverlayDescriptor>(document.clone()) {
            Ok(overlay) => {
                let mut seen_paths: Vec<&str> = Vec::new();
                for op in &overlay.operations {
                    if seen_paths.contains(&op.path.as_str()) {
                        issues.push(ValidationIssue {
                            message: format!(
                                "overlay contains duplicate operation path {}, ambiguous interpretation",
                                op.path
                            ),
                            path: "operations".into(),
                        });
                        break;
                    }
                    seen_paths.push(&op.path);
                }

                if overlay.precedence.scope == "global"
                    && !overlay.precedence.notes.to_lowercase().contains("explicit")
                {
                    issues.push(ValidationIssue {
                        message: "global overlay scope requires explicit precedence notes".into(),
                        path: "precedence.notes".into(),
                    });
                }
            }
            Err(err) => issues.push(ValidationIssue {
                message: format!("overlay does not match the expected shape: {err}"),
                path: String::new(),
            }),
        }
    }

    if issues.is_empty() {
        return None;
    }
    Some(FailureLabel::with_evidence(
        FailureKind::SchemaFailure,
        "overlay descriptor validation failed",
        "validate",
        json!({ "errors": issues }),
    ))
}
