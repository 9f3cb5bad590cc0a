//! Deterministic, pure logic shared by the orchestrator.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data (byte chunks, lines, records) and return deterministic outputs suitable
//! for tests. The one impurity, entry timestamps, is injected as a [`parser::Clock`].

pub mod append_log;
pub mod currency;
pub mod interactions;
pub mod line_buffer;
pub mod markers;
pub mod parser;
pub mod reconcile;
pub mod stream;
pub mod types;
