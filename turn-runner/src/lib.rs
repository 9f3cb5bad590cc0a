//! Turn-execution orchestrator for an external world simulation.
//!
//! A caller asks for one or more turns; the orchestrator launches the
//! simulation as a child process, parses its marker-line output into a turn
//! log and interaction records while it streams, and reads the resulting world
//! state back from the record store. At most one simulation runs at a time.
//!
//! - **[`core`]**: pure logic (line reassembly, marker table, parser, currency
//!   heuristic, reconciliation merge). No I/O.
//! - **[`io`]**: config, process execution, the run gate and the record store.
//!
//! [`turn::Orchestrator`] ties the two together and is what the CLI and the
//! HTTP API call.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod turn;
