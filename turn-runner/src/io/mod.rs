//! I/O for the orchestrator: config, process execution, run gate and record store.

pub mod config;
pub mod process;
pub mod run_state;
pub mod simulation;
pub mod store;
