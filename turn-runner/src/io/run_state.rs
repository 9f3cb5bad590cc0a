//! Process-wide single-flight gate for simulation runs.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;

/// Whether a simulation process is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
}

/// Admits at most one run at a time. Rejected callers are not queued.
#[derive(Debug)]
pub struct RunGate {
    state: AtomicU8,
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RunGate {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// Move `Idle -> Running` atomically. Returns `None` if a run is already in flight.
    pub fn try_acquire(&self) -> Option<RunPermit<'_>> {
        match self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                debug!("run gate acquired");
                Some(RunPermit { gate: self })
            }
            Err(_) => {
                debug!("run gate busy");
                None
            }
        }
    }

    /// Force the gate back to `Idle`. Safe to call when already idle.
    pub fn release(&self) {
        if self.state.swap(IDLE, Ordering::AcqRel) == RUNNING {
            debug!("run gate released");
        }
    }

    pub fn state(&self) -> RunState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => RunState::Running,
            _ => RunState::Idle,
        }
    }
}

/// Proof of admission. Dropping it releases the gate.
#[must_use = "dropping the permit releases the run gate immediately"]
#[derive(Debug)]
pub struct RunPermit<'a> {
    gate: &'a RunGate,
}

impl RunPermit<'_> {
    /// Release explicitly; equivalent to dropping the permit.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
