//! Caller-facing failure taxonomy for turn requests.

use thiserror::Error;

use crate::exit_codes;

/// Why a turn request did not produce a [`crate::turn::TurnResult`].
#[derive(Debug, Error)]
pub enum TurnError {
    /// Another run holds the gate. Nothing was started; retry later.
    #[error("a simulation run is already in progress")]
    AlreadyRunning,

    /// The simulation process exited non-zero.
    #[error("simulation exited with {}: {stderr}", describe_exit(.exit_code))]
    Execution {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The simulation process exceeded the wall-clock limit and was killed.
    /// `stderr` holds whatever it wrote before the kill.
    #[error("simulation timed out after {timeout_secs}s: {stderr}")]
    TimedOut { timeout_secs: u64, stderr: String },

    /// No process could be started (missing scripts, bad interpreter).
    #[error("failed to launch simulation: {0:#}")]
    Launch(anyhow::Error),

    /// The run succeeded but fresh state could not be read back.
    #[error("failed to reconcile world state: {0:#}")]
    Reconciliation(anyhow::Error),
}

impl TurnError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "already_running",
            Self::Execution { .. } => "execution_failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Launch(_) => "launch_failed",
            Self::Reconciliation(_) => "reconciliation_failed",
        }
    }

    /// `true` when retrying the same request later may succeed without changes.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::Reconciliation(_))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AlreadyRunning => exit_codes::ALREADY_RUNNING,
            Self::Execution { .. } | Self::TimedOut { .. } | Self::Launch(_) => {
                exit_codes::SIMULATION_FAILED
            }
            Self::Reconciliation(_) => exit_codes::RECONCILIATION_FAILED,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
