//! Launching the external simulation process.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{debug, info};

use crate::io::config::OrchestratorConfig;
use crate::io::process::run_command_streaming;

/// Which entry point a run used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    Enhanced,
    Baseline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPaths {
    pub enhanced: PathBuf,
    pub baseline: PathBuf,
}

impl ScriptPaths {
    /// Pick the enhanced entry point if it exists right now, else the baseline.
    ///
    /// Checked on every call; the scripts may appear or disappear between runs.
    pub fn select(&self) -> Result<(ScriptKind, &Path)> {
        if self.enhanced.is_file() {
            return Ok((ScriptKind::Enhanced, &self.enhanced));
        }
        if self.baseline.is_file() {
            debug!(enhanced = %self.enhanced.display(), "enhanced script missing, using baseline");
            return Ok((ScriptKind::Baseline, &self.baseline));
        }
        bail!(
            "no simulation script found (tried {} and {})",
            self.enhanced.display(),
            self.baseline.display()
        )
    }
}

/// Arguments for one simulation process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    pub turns: u32,
    pub use_bedrock: bool,
    pub reset: bool,
}

impl Invocation {
    pub fn turns(turns: u32, use_bedrock: bool) -> Self {
        Self {
            turns,
            use_bedrock,
            reset: false,
        }
    }

    pub fn reset() -> Self {
        Self {
            turns: 0,
            use_bedrock: false,
            reset: true,
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.reset {
            args.push("--reset".to_string());
        }
        args.push("--turns".to_string());
        args.push(self.turns.to_string());
        if self.use_bedrock {
            args.push("--use-bedrock".to_string());
        }
        args
    }
}

/// How a finished simulation process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stderr: String,
    /// Set when the process was killed for exceeding the timeout.
    pub timed_out_after: Option<Duration>,
}

/// Runs one simulation process, streaming stdout chunks to `on_chunk`.
///
/// An `Err` means the process could not be launched at all.
pub trait SimulationRunner: Send + Sync {
    fn run(&self, invocation: &Invocation, on_chunk: &mut dyn FnMut(&[u8])) -> Result<RunOutcome>;
}

impl<T: SimulationRunner + ?Sized> SimulationRunner for Box<T> {
    fn run(&self, invocation: &Invocation, on_chunk: &mut dyn FnMut(&[u8])) -> Result<RunOutcome> {
        (**self).run(invocation, on_chunk)
    }
}

/// Runs `<interpreter> <script> <args...>` as a child process.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    interpreter: String,
    scripts: ScriptPaths,
    workdir: Option<PathBuf>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl ScriptRunner {
    /// Build from a config whose paths were already resolved.
    pub fn from_config(cfg: &OrchestratorConfig) -> Self {
        Self {
            interpreter: cfg.interpreter.clone(),
            scripts: ScriptPaths {
                enhanced: cfg.enhanced_script.clone(),
                baseline: cfg.baseline_script.clone(),
            },
            workdir: cfg.workdir.clone(),
            timeout: cfg.timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }

    pub fn scripts(&self) -> &ScriptPaths {
        &self.scripts
    }
}

impl SimulationRunner for ScriptRunner {
    fn run(&self, invocation: &Invocation, on_chunk: &mut dyn FnMut(&[u8])) -> Result<RunOutcome> {
        let (kind, script) = self.scripts.select()?;
        let args = invocation.args();
        info!(?kind, script = %script.display(), ?args, "launching simulation");

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script).args(&args).env("PYTHONUNBUFFERED", "1");
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let output = run_command_streaming(cmd, self.timeout, self.output_limit_bytes, on_chunk)?;
        Ok(RunOutcome {
            exit_code: output.exit_code(),
            success: output.success(),
            stderr: output.stderr_text(),
            timed_out_after: output.timed_out.then_some(self.timeout),
        })
    }
}
