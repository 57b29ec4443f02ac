use std::path::{Path, PathBuf};

use prg_core::{AnchorMetadata, FailureKind, FailureLabel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline description: the declared phase contracts the gates are run
/// against. Consumed read-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pdl {
    #[serde(default)]
    pub pipeline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AnchorMetadata>,
    pub phases: Vec<PhaseDecl>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhaseDecl {
    pub id: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PdlError {
    #[error("pipeline description unreadable at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pipeline description malformed at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl PdlError {
    pub fn to_label(&self, phase_id: &str) -> FailureLabel {
        let kind = match self {
            PdlError::Unreadable { .. } => FailureKind::IoFailure,
            PdlError::Malformed { .. } => FailureKind::SchemaFailure,
        };
        FailureLabel::new(kind, self.to_string(), phase_id)
    }
}

/// Read the PDL document as an untyped value, for structural validation.
pub fn load_pdl_document(path: &Path) -> Result<serde_json::Value, PdlError> {
    let s = std::fs::read_to_string(path).map_err(|source| PdlError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&s).map_err(|source| PdlError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a structurally valid document into the typed model.
pub fn parse_pdl(document: &serde_json::Value) -> Result<Pdl, serde_json::Error> {
    serde_json::from_value(document.clone())
}
