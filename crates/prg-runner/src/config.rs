use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Run configuration, loaded from `prg.toml`. CLI flags override anything
/// set here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    pub evidence: EvidenceConfig,
    pub fixtures: FixtureConfig,
    pub gates: GatesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceConfig {
    pub root: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixtureConfig {
    pub pdl_path: String,
    pub observed_io: String,
    pub phase_outputs: String,
    pub measurement_ids: String,
    pub anchor_registry: String,
    pub overlays_dir: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatesConfig {
    pub required_phases: Vec<String>,
}

impl RunConfig {
    pub fn default_for_dir() -> Self {
        Self {
            evidence: EvidenceConfig {
                root: "artifacts/evidence_pack".to_string(),
            },
            fixtures: FixtureConfig {
                pdl_path: "pdl/pipeline.yaml".to_string(),
                observed_io: "fixtures/observed_io.json".to_string(),
                phase_outputs: "fixtures/phase_outputs.json".to_string(),
                measurement_ids: "fixtures/measurement_ids.json".to_string(),
                anchor_registry: "config/anchor_registry.json".to_string(),
                overlays_dir: "overlays".to_string(),
            },
            gates: GatesConfig {
                required_phases: ["normalize", "analyze", "validate", "compare"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: RunConfig = toml::from_str(&s).with_context(|| "parse prg.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn config_path(dir: &Path) -> PathBuf {
        dir.join("prg.toml")
    }

    /// Evidence root with `~` expanded.
    pub fn evidence_root(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.evidence.root).to_string())
    }
}
