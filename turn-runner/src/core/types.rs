//! Shared record types for turn parsing and reconciliation.
//!
//! These types define stable contracts between the parser, the orchestrator and
//! callers of the API. They carry no I/O and serialize with camelCase keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Interaction kind used until an interaction-type line says otherwise.
pub const UNKNOWN_INTERACTION_KIND: &str = "unknown";

/// Category of a turn log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    CharacterTurn,
}

/// Field of a [`TurnLogEntry`] that a later marker line may fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnField {
    Action,
    Result,
    Location,
    Reasoning,
    Emotion,
    Tool,
}

/// One actor's turn, reconstructed from the actor marker and the lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnLogEntry {
    pub actor: String,
    /// Wall-clock time at which the actor marker was parsed (RFC 3339).
    pub timestamp: String,
    pub kind: EntryKind,
    /// Turn number from the most recent `TURN <n>` header, if one was seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_number: Option<u32>,
    pub action: Option<String>,
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl TurnLogEntry {
    pub fn new(actor: impl Into<String>, timestamp: impl Into<String>, turn_number: Option<u32>) -> Self {
        Self {
            actor: actor.into(),
            timestamp: timestamp.into(),
            kind: EntryKind::CharacterTurn,
            turn_number,
            action: None,
            result: None,
            location: None,
            reasoning: None,
            emotion: None,
            tool: None,
        }
    }

    pub fn set(&mut self, field: TurnField, value: String) {
        let slot = match field {
            TurnField::Action => &mut self.action,
            TurnField::Result => &mut self.result,
            TurnField::Location => &mut self.location,
            TurnField::Reasoning => &mut self.reasoning,
            TurnField::Emotion => &mut self.emotion,
            TurnField::Tool => &mut self.tool,
        };
        *slot = Some(value);
    }
}

/// A meeting between two characters and whatever followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub participants: [String; 2],
    pub location: String,
    pub kind: String,
    pub resource_exchange: Option<String>,
    pub outcome: Option<String>,
}

impl InteractionRecord {
    pub fn new(participants: [String; 2], location: impl Into<String>) -> Self {
        Self {
            participants,
            location: location.into(),
            kind: UNKNOWN_INTERACTION_KIND.to_string(),
            resource_exchange: None,
            outcome: None,
        }
    }
}

/// Incremental change produced by the parser for a single line.
///
/// Amended variants carry the full record after the amendment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum TurnUpdate {
    TurnStarted(TurnLogEntry),
    TurnAmended(TurnLogEntry),
    InteractionStarted(InteractionRecord),
    InteractionAmended(InteractionRecord),
}

/// Need levels on a 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Needs {
    pub hunger: u32,
    pub exhaustion: u32,
    pub stress: u32,
}

/// Agent record as persisted by the storage collaborator.
///
/// Unknown attributes are ignored; missing ones fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentRecord {
    #[serde(rename = "agentId")]
    pub agent_id: String,
    pub personality: String,
    pub background: String,
    pub current_situation: String,
    pub goals: Vec<String>,
    pub current_state: Option<String>,
    pub location: Option<String>,
    pub needs: Option<Needs>,
    pub inventory: Vec<String>,
    pub stream_followers: u64,
    pub social_media_followers: u64,
}

/// World record as persisted by the storage collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldRecord {
    #[serde(rename = "worldId")]
    pub world_id: String,
    pub turn_number: u32,
    pub world_time: Option<String>,
    pub weather: Option<String>,
    /// Remaining attributes (locations, events, ...) passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
