//! Test doubles and fixtures shared by unit and integration tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::types::{AgentRecord, WorldRecord};
use crate::io::config::OrchestratorConfig;
use crate::io::simulation::{Invocation, RunOutcome, ScriptRunner, SimulationRunner};
use crate::io::store::WorldStore;

/// Deterministic timestamp for log entries.
pub fn fixed_clock() -> String {
    "2025-01-01T00:00:00.000Z".to_string()
}

pub fn agent(id: &str, background: &str) -> AgentRecord {
    AgentRecord {
        agent_id: id.to_string(),
        background: background.to_string(),
        ..AgentRecord::default()
    }
}

pub fn world(id: &str, turn_number: u32) -> WorldRecord {
    WorldRecord {
        world_id: id.to_string(),
        turn_number,
        ..WorldRecord::default()
    }
}

enum Exit {
    Code(i32, String),
    TimedOut(Duration, String),
    Unlaunchable(String),
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// In-process stand-in for the simulation: replays fixed stdout chunks.
pub struct ScriptedRunner {
    chunks: Vec<Vec<u8>>,
    exit: Exit,
    hook: Option<Hook>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    fn with_exit(chunks: Vec<Vec<u8>>, exit: Exit) -> Self {
        Self {
            chunks,
            exit,
            hook: None,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(chunks: Vec<Vec<u8>>) -> Self {
        Self::with_exit(chunks, Exit::Code(0, String::new()))
    }

    pub fn failing(code: i32, stderr: &str) -> Self {
        Self::with_exit(Vec::new(), Exit::Code(code, stderr.to_string()))
    }

    pub fn timing_out(after: Duration, stderr: &str) -> Self {
        Self::with_exit(Vec::new(), Exit::TimedOut(after, stderr.to_string()))
    }

    pub fn unlaunchable(reason: &str) -> Self {
        Self::with_exit(Vec::new(), Exit::Unlaunchable(reason.to_string()))
    }

    /// Run `hook` after the chunks are delivered, before the run reports its exit.
    pub fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().expect("invocations lock").clone()
    }
}

impl SimulationRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation, on_chunk: &mut dyn FnMut(&[u8])) -> Result<RunOutcome> {
        self.invocations
            .lock()
            .expect("invocations lock")
            .push(*invocation);
        if let Exit::Unlaunchable(reason) = &self.exit {
            return Err(anyhow!("{reason}"));
        }
        for chunk in &self.chunks {
            on_chunk(chunk);
        }
        if let Some(hook) = &self.hook {
            hook();
        }
        Ok(match &self.exit {
            Exit::Code(code, stderr) => RunOutcome {
                exit_code: Some(*code),
                success: *code == 0,
                stderr: stderr.clone(),
                timed_out_after: None,
            },
            Exit::TimedOut(after, stderr) => RunOutcome {
                exit_code: None,
                success: false,
                stderr: stderr.clone(),
                timed_out_after: Some(*after),
            },
            Exit::Unlaunchable(_) => unreachable!("handled above"),
        })
    }
}

/// Store backed by in-memory maps.
#[derive(Default)]
pub struct MemoryStore {
    agents: Mutex<BTreeMap<String, AgentRecord>>,
    worlds: Mutex<BTreeMap<String, WorldRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorldStore for MemoryStore {
    fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        Ok(self.agents.lock().expect("agents lock").get(agent_id).cloned())
    }

    fn scan_agents(&self) -> Result<Vec<AgentRecord>> {
        Ok(self.agents.lock().expect("agents lock").values().cloned().collect())
    }

    fn put_agent(&self, record: &AgentRecord) -> Result<()> {
        self.agents
            .lock()
            .expect("agents lock")
            .insert(record.agent_id.clone(), record.clone());
        Ok(())
    }

    fn get_world(&self, world_id: &str) -> Result<Option<WorldRecord>> {
        Ok(self.worlds.lock().expect("worlds lock").get(world_id).cloned())
    }

    fn put_world(&self, record: &WorldRecord) -> Result<()> {
        self.worlds
            .lock()
            .expect("worlds lock")
            .insert(record.world_id.clone(), record.clone());
        Ok(())
    }
}

/// Store whose every operation fails, for reconciliation error paths.
pub struct FailingStore;

impl WorldStore for FailingStore {
    fn get_agent(&self, _agent_id: &str) -> Result<Option<AgentRecord>> {
        Err(anyhow!("store unavailable"))
    }

    fn scan_agents(&self) -> Result<Vec<AgentRecord>> {
        Err(anyhow!("store unavailable"))
    }

    fn put_agent(&self, _record: &AgentRecord) -> Result<()> {
        Err(anyhow!("store unavailable"))
    }

    fn get_world(&self, _world_id: &str) -> Result<Option<WorldRecord>> {
        Err(anyhow!("store unavailable"))
    }

    fn put_world(&self, _record: &WorldRecord) -> Result<()> {
        Err(anyhow!("store unavailable"))
    }
}

/// Write a shell script to `dir/name` and return its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write script");
    path
}

/// Config that runs `sh` scripts from `dir` with the given timeout.
pub fn sh_config(dir: &Path, timeout_secs: u64) -> OrchestratorConfig {
    OrchestratorConfig {
        interpreter: "sh".to_string(),
        enhanced_script: PathBuf::from("enhanced.sh"),
        baseline_script: PathBuf::from("baseline.sh"),
        timeout_secs,
        store_dir: PathBuf::from("store"),
        ..OrchestratorConfig::default()
    }
    .resolve_paths(dir)
}

pub fn sh_runner(dir: &Path, timeout_secs: u64) -> ScriptRunner {
    ScriptRunner::from_config(&sh_config(dir, timeout_secs))
}
