//! Turn orchestration: admission, streaming parse and reconciliation.
//!
//! [`Orchestrator::execute`] is the single entry point every caller goes through:
//!
//! 1. the [`RunGate`] admits the request or rejects it with [`TurnError::AlreadyRunning`];
//! 2. the [`SimulationRunner`] streams stdout chunks, which feed a [`TurnStream`]
//!    on the calling thread and surface as [`RunEvent::Update`]s;
//! 3. the gate is released as soon as the process has exited, whatever the outcome;
//! 4. on success the store is read back into a [`WorldSnapshot`].

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::core::parser::{Clock, wall_clock};
use crate::core::reconcile::{CharacterState, WorldSnapshot, character_state, merge_characters};
use crate::core::stream::TurnStream;
use crate::core::types::{InteractionRecord, TurnLogEntry, TurnUpdate};
use crate::error::TurnError;
use crate::io::run_state::{RunGate, RunState};
use crate::io::simulation::{Invocation, SimulationRunner};
use crate::io::store::WorldStore;

/// A caller's request to advance the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TurnRequest {
    pub turns: u32,
    /// Ask the simulation for its higher-fidelity decision backend.
    pub use_bedrock: bool,
}

impl Default for TurnRequest {
    fn default() -> Self {
        Self {
            turns: 1,
            use_bedrock: false,
        }
    }
}

impl TurnRequest {
    pub fn invocation(&self) -> Invocation {
        Invocation::turns(self.turns, self.use_bedrock)
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub success: bool,
    pub raw_output: String,
    pub log: Vec<TurnLogEntry>,
    pub interactions: Vec<InteractionRecord>,
    pub world_snapshot: WorldSnapshot,
}

/// Progress reported while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// The gate admitted the run; the process is about to start.
    Admitted { invocation: Invocation },
    Update(TurnUpdate),
    /// The process is gone and the gate is idle again.
    Exited { success: bool },
}

pub struct Orchestrator<R, S> {
    gate: RunGate,
    runner: R,
    store: S,
    world_id: String,
    output_limit_bytes: usize,
    clock: Clock,
}

impl<R: SimulationRunner, S: WorldStore> Orchestrator<R, S> {
    pub fn new(runner: R, store: S, world_id: impl Into<String>, output_limit_bytes: usize) -> Self {
        Self {
            gate: RunGate::new(),
            runner,
            store,
            world_id: world_id.into(),
            output_limit_bytes,
            clock: wall_clock,
        }
    }

    /// Replace the timestamp source for log entries.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn run_turns(
        &self,
        request: &TurnRequest,
        on_event: &mut dyn FnMut(RunEvent),
    ) -> Result<TurnResult, TurnError> {
        self.execute(request.invocation(), on_event)
    }

    pub fn reset(&self, on_event: &mut dyn FnMut(RunEvent)) -> Result<TurnResult, TurnError> {
        self.execute(Invocation::reset(), on_event)
    }

    /// Run one simulation process end to end.
    #[instrument(skip(self, on_event), fields(turns = invocation.turns, reset = invocation.reset))]
    pub fn execute(
        &self,
        invocation: Invocation,
        on_event: &mut dyn FnMut(RunEvent),
    ) -> Result<TurnResult, TurnError> {
        let permit = self.gate.try_acquire().ok_or(TurnError::AlreadyRunning)?;
        on_event(RunEvent::Admitted { invocation });

        let mut stream = TurnStream::with_clock(self.output_limit_bytes, self.clock);
        let outcome = {
            let mut on_chunk =
                |chunk: &[u8]| stream.feed(chunk, &mut |update| on_event(RunEvent::Update(update)));
            self.runner.run(&invocation, &mut on_chunk)
        };
        let output = stream.finish(&mut |update| on_event(RunEvent::Update(update)));

        drop(permit);
        let success = outcome.as_ref().is_ok_and(|outcome| outcome.success);
        on_event(RunEvent::Exited { success });

        let outcome = outcome.map_err(TurnError::Launch)?;
        if let Some(limit) = outcome.timed_out_after {
            warn!(timeout_secs = limit.as_secs(), "simulation killed after timeout");
            return Err(TurnError::TimedOut {
                timeout_secs: limit.as_secs(),
                stderr: outcome.stderr,
            });
        }
        if !outcome.success {
            warn!(exit_code = ?outcome.exit_code, "simulation failed");
            return Err(TurnError::Execution {
                exit_code: outcome.exit_code,
                stderr: outcome.stderr,
            });
        }

        info!(
            lines = output.lines,
            entries = output.parsed.log.len(),
            interactions = output.parsed.interactions.len(),
            "simulation finished"
        );
        let world_snapshot = self.snapshot()?;
        Ok(TurnResult {
            success: true,
            raw_output: output.raw_output,
            log: output.parsed.log,
            interactions: output.parsed.interactions,
            world_snapshot,
        })
    }

    /// Read current world and character state without running anything.
    pub fn snapshot(&self) -> Result<WorldSnapshot, TurnError> {
        reconcile(&self.store, &self.world_id).map_err(TurnError::Reconciliation)
    }

    pub fn character(&self, agent_id: &str) -> Result<Option<CharacterState>, TurnError> {
        let record = self
            .store
            .get_agent(agent_id)
            .with_context(|| format!("get agent {agent_id}"))
            .map_err(TurnError::Reconciliation)?;
        Ok(record.as_ref().map(character_state))
    }

    pub fn gate(&self) -> &RunGate {
        &self.gate
    }

    pub fn run_state(&self) -> RunState {
        self.gate.state()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

/// Fetch fresh agent and world records and merge them into a snapshot.
#[instrument(skip(store))]
pub fn reconcile(store: &dyn WorldStore, world_id: &str) -> anyhow::Result<WorldSnapshot> {
    let agents = store.scan_agents().context("scan agents")?;
    let world = store
        .get_world(world_id)
        .with_context(|| format!("get world {world_id}"))?;
    let characters = merge_characters(&agents);
    info!(characters = characters.len(), world = world.is_some(), "world state reconciled");
    Ok(WorldSnapshot { world, characters })
}
