use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use prg_core::{content_hash, sanitize_value, FailureLabel, RunId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Durable record of one gate failure. Written once, named by the content
/// hash of its sanitized label.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub run_id: String,
    pub timestamp: String,
    pub label: FailureLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub inputs_hash: String,
}

fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Writes hash-named failure records into a run's `failures/` directory.
///
/// The filename depends only on the sanitized label, so emitting the same
/// failure twice overwrites the same file instead of accumulating
/// duplicates.
pub struct FailureEmitter {
    output_dir: PathBuf,
    timestamp: fn() -> String,
}

impl FailureEmitter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            timestamp: utc_timestamp,
        }
    }

    /// Emitter with a caller-supplied timestamp source. The wall clock is
    /// the one nondeterministic input here; pinning it makes emitted files
    /// byte-reproducible.
    pub fn with_timestamp_fn(output_dir: PathBuf, timestamp: fn() -> String) -> Self {
        Self {
            output_dir,
            timestamp,
        }
    }

    pub fn emit(
        &self,
        label: &FailureLabel,
        run_id: &RunId,
        context: Option<&Value>,
    ) -> Result<PathBuf> {
        label.validate()?;
        let sanitized = label.sanitized();
        let inputs_hash = content_hash(&serde_json::to_value(&sanitized)?);
        let record = EvidenceRecord {
            run_id: run_id.as_str().to_string(),
            timestamp: (self.timestamp)(),
            label: sanitized,
            context: context.map(sanitize_value),
            inputs_hash: inputs_hash.clone(),
        };
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("create failures dir {}", self.output_dir.display()))?;
        let path = self.output_dir.join(format!("failure_{inputs_hash}.json"));
        let bytes = serde_json::to_vec_pretty(&record)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("write failure record {}", path.display()))?;
        Ok(path)
    }
}
