//! Folds meeting, classification, exchange and outcome lines into interaction records.

use crate::core::append_log::AppendLog;
use crate::core::markers::InteractionEffect;
use crate::core::types::{InteractionRecord, TurnUpdate};

/// Owns the interaction list for one run.
///
/// A meeting opens a new record; every other interaction effect amends the record
/// opened most recently and is dropped when no meeting has been seen yet.
#[derive(Debug, Default)]
pub struct InteractionAggregator {
    records: AppendLog<InteractionRecord>,
}

impl InteractionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, effect: InteractionEffect) -> Option<TurnUpdate> {
        match effect {
            InteractionEffect::Start {
                participants,
                location,
            } => {
                let record = self.records.push(InteractionRecord::new(participants, location));
                Some(TurnUpdate::InteractionStarted(record.clone()))
            }
            InteractionEffect::Kind(kind) => self.amend(|record| record.kind = kind),
            InteractionEffect::Exchange(description) => {
                self.amend(|record| record.resource_exchange = Some(description))
            }
            InteractionEffect::Outcome(text) => {
                self.amend(|record| record.outcome = Some(text.to_string()))
            }
        }
    }

    fn amend<F: FnOnce(&mut InteractionRecord)>(&mut self, amend: F) -> Option<TurnUpdate> {
        self.records
            .amend_last(amend)
            .map(|record| TurnUpdate::InteractionAmended(record.clone()))
    }

    pub fn records(&self) -> &[InteractionRecord] {
        self.records.as_slice()
    }

    pub fn into_records(self) -> Vec<InteractionRecord> {
        self.records.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(first: &str, second: &str, location: &str) -> InteractionEffect {
        InteractionEffect::Start {
            participants: [first.to_string(), second.to_string()],
            location: location.to_string(),
        }
    }

    #[test]
    fn amendments_without_meeting_are_dropped() {
        let mut aggregator = InteractionAggregator::new();
        assert_eq!(aggregator.apply(InteractionEffect::Kind("friendly".to_string())), None);
        assert_eq!(aggregator.apply(InteractionEffect::Outcome("x")), None);
        assert!(aggregator.records().is_empty());
    }

    #[test]
    fn new_meeting_stops_amending_previous_record() {
        let mut aggregator = InteractionAggregator::new();
        aggregator.apply(start("a", "b", "library"));
        aggregator.apply(InteractionEffect::Kind("friendly".to_string()));
        aggregator.apply(start("c", "d", "hospital"));
        aggregator.apply(InteractionEffect::Kind("tense".to_string()));

        let records = aggregator.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, "friendly");
        assert_eq!(records[1].kind, "tense");
        assert_eq!(records[1].participants, ["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn fresh_record_has_unknown_kind() {
        let mut aggregator = InteractionAggregator::new();
        let update = aggregator.apply(start("a", "b", "food_bank"));
        match update {
            Some(TurnUpdate::InteractionStarted(record)) => {
                assert_eq!(record.kind, "unknown");
                assert_eq!(record.outcome, None);
            }
            other => panic!("unexpected update {other:?}"),
        }
    }
}
