use std::path::{Path, PathBuf};

use prg_core::{AnchorId, AnchorStatus, FailureKind, FailureLabel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One registered anchor record. Maintained by a separate process; the gate
/// pipeline only ever reads these.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnchorEntry {
    pub anchor_id: AnchorId,
    pub anchor_version: String,
    pub scope: String,
    pub owner: String,
    pub status: AnchorStatus,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("anchor registry unreadable at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("anchor registry malformed at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RegistryError {
    /// Load failures are reported, not fatal: an unreadable store points at
    /// environment drift, a malformed one at a contract violation.
    pub fn to_label(&self, phase_id: &str) -> FailureLabel {
        let kind = match self {
            RegistryError::Unreadable { .. } => FailureKind::ToolMismatch,
            RegistryError::Malformed { .. } => FailureKind::SchemaFailure,
        };
        FailureLabel::new(kind, self.to_string(), phase_id)
    }
}

/// In-memory registry state loaded once per run.
#[derive(Clone, Debug, Default)]
pub struct RegistrySnapshot {
    pub entries: Vec<AnchorEntry>,
}

impl RegistrySnapshot {
    pub fn get(&self, anchor_id: &AnchorId) -> Option<&AnchorEntry> {
        self.entries.iter().find(|e| e.anchor_id == *anchor_id)
    }
}

pub struct AnchorRegistry {
    path: PathBuf,
}

impl AnchorRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<RegistrySnapshot, RegistryError> {
        let s = std::fs::read_to_string(&self.path).map_err(|source| RegistryError::Unreadable {
            path: self.path.clone(),
            source,
        })?;
        let entries: Vec<AnchorEntry> =
            serde_json::from_str(&s).map_err(|source| RegistryError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(RegistrySnapshot { entries })
    }
}
