use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use prg_core::RunId;
use serde::Serialize;

/// Reports the gate pipeline leaves behind, one file each per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    Validation,
    PhaseIo,
    Determinism,
    Bijectivity,
    OverlayChain,
}

/// Destination for the per-run evidence pack.
pub trait EvidenceSink: Send + Sync {
    fn create_run_dir(&self, run_id: &RunId) -> Result<PathBuf>;
    fn write_report(
        &self,
        run_dir: &Path,
        kind: ReportKind,
        run_id: &RunId,
        bytes: &[u8],
    ) -> Result<PathBuf>;
}

/// Filesystem evidence pack: `<root>/<run_id>/` with `validation/` and
/// `failures/` subdirectories.
#[derive(Clone)]
pub struct FsEvidencePack {
    pub root: PathBuf,
}

impl FsEvidencePack {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn report_path(run_dir: &Path, kind: ReportKind, run_id: &RunId) -> PathBuf {
        match kind {
            ReportKind::Validation => run_dir
                .join("validation")
                .join(format!("pdl_validation_{}.json", run_id.as_str())),
            ReportKind::PhaseIo => run_dir.join("phase_io_manifest.json"),
            ReportKind::Determinism => run_dir.join("determinism_report.json"),
            ReportKind::Bijectivity => run_dir.join("bijectivity_report.json"),
            ReportKind::OverlayChain => run_dir.join("overlay_chain_manifest.json"),
        }
    }

    pub fn write_json<T: Serialize>(
        &self,
        run_dir: &Path,
        kind: ReportKind,
        run_id: &RunId,
        report: &T,
    ) -> Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(report)?;
        self.write_report(run_dir, kind, run_id, &bytes)
    }
}

impl EvidenceSink for FsEvidencePack {
    fn create_run_dir(&self, run_id: &RunId) -> Result<PathBuf> {
        let dir = self.root.join(run_id.as_str());
        std::fs::create_dir_all(&dir).with_context(|| format!("create run dir {}", dir.display()))?;
        Ok(dir)
    }

    fn write_report(
        &self,
        run_dir: &Path,
        kind: ReportKind,
        run_id: &RunId,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let path = Self::report_path(run_dir, kind, run_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create report dir {}", parent.display()))?;
        }
        std::fs::write(&path, bytes).with_context(|| format!("write report {}", path.display()))?;
        Ok(path)
    }
}
