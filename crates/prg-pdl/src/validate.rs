use prg_core::AnchorMetadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub message: String,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    Pass,
    Fail(Vec<ValidationIssue>),
}

impl ValidationOutcome {
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ValidationOutcome::Pass => &[],
            ValidationOutcome::Fail(issues) => issues,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, ValidationOutcome::Pass)
    }
}

/// Seam for the structural document validator. The full JSON-Schema engine
/// is an external collaborator; anything implementing this trait can stand
/// in for it.
pub trait StructuralValidator: Send + Sync {
    fn validate(&self, document: &Value) -> ValidationOutcome;
}

/// Report persisted under `validation/` for each validated PDL.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: String,
    pub artifact: String,
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
    pub document_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AnchorMetadata>,
}

/// Built-in structural checks for pipeline descriptions: a mapping with a
/// non-empty `phases` sequence of uniquely-identified phases whose inputs
/// and outputs are string lists.
pub struct PdlStructuralValidator;

impl StructuralValidator for PdlStructuralValidator {
    fn validate(&self, document: &Value) -> ValidationOutcome {
        let mut issues = Vec::new();

        let Some(root) = document.as_object() else {
            return ValidationOutcome::Fail(vec![ValidationIssue {
                message: "document must be a mapping".into(),
                path: String::new(),
            }]);
        };

        match root.get("phases").and_then(Value::as_array) {
            None => issues.push(ValidationIssue {
                message: "phases must be a sequence".into(),
                path: "phases".into(),
            }),
            Some(phases) if phases.is_empty() => issues.push(ValidationIssue {
                message: "phases must not be empty".into(),
                path: "phases".into(),
            }),
            Some(phases) => {
                let mut seen_ids: Vec<&str> = Vec::new();
                for (idx, phase) in phases.iter().enumerate() {
                    let at = |field: &str| format!("phases[{idx}].{field}");
                    let Some(phase) = phase.as_object() else {
                        issues.push(ValidationIssue {
                            message: "phase must be a mapping".into(),
                            path: format!("phases[{idx}]"),
                        });
                        continue;
                    };
                    match phase.get("id").and_then(Value::as_str) {
                        None | Some("") => issues.push(ValidationIssue {
                            message: "phase id must be a non-empty string".into(),
                            path: at("id"),
                        }),
                        Some(id) => {
                            if seen_ids.contains(&id) {
                                issues.push(ValidationIssue {
                                    message: format!("duplicate phase id {id}"),
                                    path: at("id"),
                                });
                            }
                            seen_ids.push(id);
                        }
                    }
                    for field in ["inputs", "outputs"] {
                        if let Some(value) = phase.get(field) {
                            let all_strings = value
                                .as_array()
                                .map(|items| items.iter().all(Value::is_string))
                                .unwrap_or(false);
                            if !all_strings {
                                issues.push(ValidationIssue {
                                    message: format!("{field} must be a sequence of strings"),
                                    path: at(field),
                                });
                            }
                        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(document: Value) -> ValidationOutcome {
        PdlStructuralValidator.validate(&document)
    }

    #[test]
    fn accepts_well_formed_pdl() {
        let doc = json!({
            "pipeline": "example",
            "phases": [
                {"id": "normalize", "inputs": ["raw"], "outputs": ["normalized"]},
                {"id": "analyze", "inputs": ["normalized"], "outputs": ["analysis"]},
            ]
        });
        assert!(validate(doc).passed());
    }

    #[test]
    fn rejects_non_mapping_document() {
        let outcome = validate(json!(["not", "a", "mapping"]));
        assert!(!outcome.passed());
        assert_eq!(outcome.issues()[0].message, "document must be a mapping");
    }

    #[test]
    fn rejects_empty_or_missing_phases() {
        assert!(!validate(json!({"pipeline": "x"})).passed());
        assert!(!validate(json!({"phases": []})).passed());
    }

    #[test]
    fn rejects_duplicate_phase_ids() {
        let outcome = validate(json!({
            "phases": [{"id": "a"}, {"id": "a"}]
        }));
        let issues = outcome.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "phases[1].id");
    }

    #[test]
    fn rejects_non_string_io_declarations() {
        let outcome = validate(json!({
            "phases": [{"id": "a", "inputs": [1, 2]}]
        }));
        assert!(outcome
            .issues()
            .iter()
            .any(|i| i.path == "phases[0].inputs"));
    }

    #[test]
    fn collects_all_issues_not_just_first() {
        let outcome = validate(json!({
            "phases": [{"id": ""}, {"outputs": "nope"}]
        }));
        assert!(outcome.issues().len() >= 2);
    }
}
