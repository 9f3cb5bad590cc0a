//! Document store holding agent and world records.
//!
//! The simulation process writes these records; the orchestrator only reads
//! them back during reconciliation. Writes exist for seeding and tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::core::types::{AgentRecord, WorldRecord};

/// Key/value access to agent and world records.
///
/// Implementations must be shareable across threads; the API holds one store
/// for the lifetime of the server.
pub trait WorldStore: Send + Sync {
    fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>>;
    /// Every agent record, ordered by id.
    fn scan_agents(&self) -> Result<Vec<AgentRecord>>;
    fn put_agent(&self, record: &AgentRecord) -> Result<()>;
    fn get_world(&self, world_id: &str) -> Result<Option<WorldRecord>>;
    fn put_world(&self, record: &WorldRecord) -> Result<()>;
}

impl<T: WorldStore + ?Sized> WorldStore for Box<T> {
    fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        (**self).get_agent(agent_id)
    }

    fn scan_agents(&self) -> Result<Vec<AgentRecord>> {
        (**self).scan_agents()
    }

    fn put_agent(&self, record: &AgentRecord) -> Result<()> {
        (**self).put_agent(record)
    }

    fn get_world(&self, world_id: &str) -> Result<Option<WorldRecord>> {
        (**self).get_world(world_id)
    }

    fn put_world(&self, record: &WorldRecord) -> Result<()> {
        (**self).put_world(record)
    }
}

/// JSON documents under `<root>/agents/<id>.json` and `<root>/worlds/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn agents_dir(&self) -> PathBuf {
        self.root.join("agents")
    }

    fn worlds_dir(&self) -> PathBuf {
        self.root.join("worlds")
    }
}

impl WorldStore for FileStore {
    fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        let path = document_path(&self.agents_dir(), agent_id)?;
        read_document(&path)
    }

    fn scan_agents(&self) -> Result<Vec<AgentRecord>> {
        let dir = self.agents_dir();
        if !dir.exists() {
            debug!(dir = %dir.display(), "agent directory missing, empty scan");
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("read dir {}", dir.display()))? {
            let entry = entry.with_context(|| format!("read dir entry {}", dir.display()))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(record) = read_document::<AgentRecord>(&path)? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        debug!(count = records.len(), "scanned agents");
        Ok(records)
    }

    fn put_agent(&self, record: &AgentRecord) -> Result<()> {
        let path = document_path(&self.agents_dir(), &record.agent_id)?;
        write_document(&path, record)
    }

    fn get_world(&self, world_id: &str) -> Result<Option<WorldRecord>> {
        let path = document_path(&self.worlds_dir(), world_id)?;
        read_document(&path)
    }

    fn put_world(&self, record: &WorldRecord) -> Result<()> {
        let path = document_path(&self.worlds_dir(), &record.world_id)?;
        write_document(&path, record)
    }
}

/// Records loaded by `turn-runner seed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub world: Option<WorldRecord>,
    pub agents: Vec<AgentRecord>,
}

/// Write every record of `seed` into `store`. Returns the number of agents written.
pub fn seed_store(store: &dyn WorldStore, seed: &SeedFile) -> Result<usize> {
    if let Some(world) = &seed.world {
        store
            .put_world(world)
            .with_context(|| format!("seed world {}", world.world_id))?;
    }
    for agent in &seed.agents {
        store
            .put_agent(agent)
            .with_context(|| format!("seed agent {}", agent.agent_id))?;
    }
    info!(agents = seed.agents.len(), world = seed.world.is_some(), "store seeded");
    Ok(seed.agents.len())
}

fn document_path(dir: &Path, id: &str) -> Result<PathBuf> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        bail!("invalid record id {id:?}");
    }
    Ok(dir.join(format!("{id}.json")))
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(value))
}

fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("record path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut buf = serde_json::to_string_pretty(value).context("serialize record")?;
    buf.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write temp {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
