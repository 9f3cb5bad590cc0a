//! Stable exit codes for turn-runner CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid config, arguments, input files or other local errors.
pub const INVALID: i32 = 1;
/// The simulation could not be launched, exited non-zero or timed out.
pub const SIMULATION_FAILED: i32 = 2;
/// The simulation succeeded but world state could not be read back.
pub const RECONCILIATION_FAILED: i32 = 3;
/// Another run held the gate.
pub const ALREADY_RUNNING: i32 = 4;
