//! Pure merge of persisted agent records into the character map returned to callers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::currency::{default_needs, derive_profile};
use crate::core::types::{AgentRecord, Needs, WorldRecord};

/// Character state as reported after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterState {
    pub id: String,
    pub personality: String,
    pub background: String,
    pub current_state: String,
    pub location: String,
    pub money: f64,
    pub needs: Needs,
    pub has_streaming_access: bool,
    pub stream_followers: u64,
    pub social_media_followers: u64,
}

/// Reconciled world and character state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub world: Option<WorldRecord>,
    pub characters: BTreeMap<String, CharacterState>,
}

/// Build the reported state for one agent.
///
/// Money and streaming access always come from the background heuristic. Stored
/// location and needs win over the derived defaults when present.
pub fn character_state(record: &AgentRecord) -> CharacterState {
    let profile = derive_profile(&record.background);
    CharacterState {
        id: record.agent_id.clone(),
        personality: record.personality.clone(),
        background: record.background.clone(),
        current_state: record
            .current_state
            .clone()
            .unwrap_or_else(|| "normal".to_string()),
        location: record
            .location
            .clone()
            .unwrap_or_else(|| profile.location.to_string()),
        money: profile.money,
        needs: record.needs.unwrap_or_else(|| default_needs(profile.money)),
        has_streaming_access: profile.has_streaming_access,
        stream_followers: record.stream_followers,
        social_media_followers: record.social_media_followers,
    }
}

/// Merge agent records into a map keyed by agent id.
///
/// Records without an id are skipped; a later duplicate replaces an earlier one.
pub fn merge_characters(records: &[AgentRecord]) -> BTreeMap<String, CharacterState> {
    records
        .iter()
        .filter(|record| !record.agent_id.trim().is_empty())
        .map(|record| (record.agent_id.clone(), character_state(record)))
        .collect()
}
