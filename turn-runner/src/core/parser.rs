//! Stateful, line-at-a-time parser for simulation output.
//!
//! The parser keeps O(1) state beyond its output lists: the current turn number
//! and the cursors of the turn log and interaction list. It never looks ahead or
//! back across lines.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::trace;

use crate::core::append_log::AppendLog;
use crate::core::interactions::InteractionAggregator;
use crate::core::markers::{Effect, TurnEffect, classify};
use crate::core::types::{InteractionRecord, TurnLogEntry, TurnUpdate};

/// Source of entry timestamps.
pub type Clock = fn() -> String;

/// Current UTC time as RFC 3339 with millisecond precision.
pub fn wall_clock() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Structured output of a parsed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedTurn {
    pub log: Vec<TurnLogEntry>,
    pub interactions: Vec<InteractionRecord>,
}

pub struct EventParser {
    clock: Clock,
    turn_number: Option<u32>,
    log: AppendLog<TurnLogEntry>,
    interactions: InteractionAggregator,
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EventParser {
    pub fn new() -> Self {
        Self::with_clock(wall_clock)
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            turn_number: None,
            log: AppendLog::new(),
            interactions: InteractionAggregator::new(),
        }
    }

    /// Apply one complete line. Returns the record it created or amended, if any.
    pub fn parse_line(&mut self, line: &str) -> Option<TurnUpdate> {
        let (id, effect) = classify(line)?;
        trace!(marker = ?id, "marker matched");
        match effect {
            Effect::Turn(TurnEffect::Header(number)) => {
                self.turn_number = Some(number);
                None
            }
            Effect::Turn(TurnEffect::Start { actor }) => {
                let entry = TurnLogEntry::new(actor, (self.clock)(), self.turn_number);
                Some(TurnUpdate::TurnStarted(self.log.push(entry).clone()))
            }
            Effect::Turn(TurnEffect::Amend { field, value }) => self
                .log
                .amend_last(|entry| entry.set(field, value))
                .map(|entry| TurnUpdate::TurnAmended(entry.clone())),
            Effect::Interaction(effect) => self.interactions.apply(effect),
        }
    }

    pub fn log(&self) -> &[TurnLogEntry] {
        self.log.as_slice()
    }

    pub fn interactions(&self) -> &[InteractionRecord] {
        self.interactions.records()
    }

    pub fn finish(self) -> ParsedTurn {
        ParsedTurn {
            log: self.log.into_vec(),
            interactions: self.interactions.into_records(),
        }
    }
}
