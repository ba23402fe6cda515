use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::graph::lru::DEFAULT_LRU_MAX_LENGTH;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub lru_max_length: usize,
    pub move_ratio: f32,
    pub refresh_interval_ms: u64,
    pub auto_focus: bool,
    pub expand_max_count: Option<usize>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            lru_max_length: DEFAULT_LRU_MAX_LENGTH,
            move_ratio: 0.05,
            refresh_interval_ms: 30,
            auto_focus: true,
            expand_max_count: None,
        }
    }
}

impl SceneConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "codeatlas")?;
    Some(proj.config_dir().join("scene.toml"))
}

pub fn load_or_default() -> SceneConfig {
    let Some(path) = config_file_path() else {
        return SceneConfig::default();
    };
    load_or_default_from_path(&path)
}

pub fn load_or_default_from_path(path: &Path) -> SceneConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return SceneConfig::default();
    };
    match toml::from_str(&contents) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring malformed scene config");
            SceneConfig::default()
        }
    }
}

pub fn save(cfg: &SceneConfig) -> anyhow::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)
}

pub fn save_to_path(cfg: &SceneConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize scene config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write scene config {}", path.display()))?;
    Ok(())
}
