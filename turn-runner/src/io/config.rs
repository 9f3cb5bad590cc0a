//! Orchestrator configuration stored under `.turns/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default location of the config file, relative to the project directory.
pub const DEFAULT_CONFIG_PATH: &str = ".turns/config.toml";

/// Orchestrator configuration (TOML).
///
/// Relative paths are resolved against the project directory. Missing fields
/// default to values matching the stock simulation scripts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Program used to launch the simulation scripts.
    pub interpreter: String,

    /// Preferred entry point, used whenever it exists on disk.
    pub enhanced_script: PathBuf,

    /// Fallback entry point.
    pub baseline_script: PathBuf,

    /// Working directory for the simulation process (defaults to the project directory).
    pub workdir: Option<PathBuf>,

    /// Wall-clock limit for one simulation process, in seconds.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Directory of the JSON document store holding agent and world records.
    pub store_dir: PathBuf,

    /// Key of the world record fetched during reconciliation.
    pub world_id: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            enhanced_script: PathBuf::from("execute-simulation-turn-with-mcp.py"),
            baseline_script: PathBuf::from("execute-simulation-turn.py"),
            workdir: None,
            timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
            store_dir: PathBuf::from(".turns/store"),
            world_id: "main".to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.trim().is_empty() {
            return Err(anyhow!("interpreter must be non-empty"));
        }
        if self.enhanced_script.as_os_str().is_empty() || self.baseline_script.as_os_str().is_empty()
        {
            return Err(anyhow!("enhanced_script and baseline_script must be non-empty"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.world_id.trim().is_empty() {
            return Err(anyhow!("world_id must be non-empty"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Return a copy with every relative path resolved against `base`.
    pub fn resolve_paths(&self, base: &Path) -> Self {
        let resolve = |path: &Path| -> PathBuf {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        };
        Self {
            enhanced_script: resolve(&self.enhanced_script),
            baseline_script: resolve(&self.baseline_script),
            workdir: Some(
                self.workdir
                    .as_deref()
                    .map(resolve)
                    .unwrap_or_else(|| base.to_path_buf()),
            ),
            store_dir: resolve(&self.store_dir),
            ..self.clone()
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `OrchestratorConfig::default()`.
pub fn load_config(path: &Path) -> Result<OrchestratorConfig> {
    if !path.exists() {
        let cfg = OrchestratorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: OrchestratorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &OrchestratorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, OrchestratorConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".turns").join("config.toml");
        let cfg = OrchestratorConfig {
            interpreter: "sh".to_string(),
            workdir: Some(PathBuf::from("sim")),
            timeout_secs: 5,
            ..OrchestratorConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "timeout_secs = 60\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.timeout_secs, 60);
        assert_eq!(cfg.interpreter, "python3");
        assert_eq!(cfg.world_id, "main");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = OrchestratorConfig {
            timeout_secs: 0,
            ..OrchestratorConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn resolve_paths_keeps_absolute_and_joins_relative() {
        let base = Path::new("/srv/sim");
        let cfg = OrchestratorConfig {
            baseline_script: PathBuf::from("/opt/baseline.py"),
            ..OrchestratorConfig::default()
        }
        .resolve_paths(base);
        assert_eq!(cfg.baseline_script, PathBuf::from("/opt/baseline.py"));
        assert_eq!(
            cfg.enhanced_script,
            PathBuf::from("/srv/sim/execute-simulation-turn-with-mcp.py")
        );
        assert_eq!(cfg.store_dir, PathBuf::from("/srv/sim/.turns/store"));
        assert_eq!(cfg.workdir, Some(PathBuf::from("/srv/sim")));
    }
}
