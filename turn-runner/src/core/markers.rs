//! Ordered marker table for simulation output lines.
//!
//! Each rule pairs a [`MarkerId`] with a regex describing the expected line shape
//! and an extraction function producing an [`Effect`]. Every pattern is anchored
//! at the start of the line (leading whitespace allowed), so a marker glyph inside
//! free text never matches. Rules are tried top to bottom and the first one that
//! extracts an effect wins. A line that carries a marker token but not the
//! expected shape (e.g. `💰 Money: $53.09`) matches no rule and is ignored.
//!
//! New markers are added by appending to [`MARKER_RULES`]; the parser never
//! inspects line text itself.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::core::types::TurnField;

/// Outcome recorded for a dialogue line.
pub const DIALOGUE_OUTCOME: &str = "Shared survival tips and emotional support";
/// Outcome recorded for a tense-encounter line.
pub const TENSE_OUTCOME: &str = "Tense encounter highlighting class differences";
/// Outcome recorded for a brief-acknowledgment line.
pub const BRIEF_OUTCOME: &str = "Brief acknowledgment, no meaningful interaction";
/// Outcome recorded for a casual-greeting line.
pub const GREETING_OUTCOME: &str = "Casual greeting";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerId {
    TurnHeader,
    ActorTurn,
    Location,
    Decision,
    Tool,
    Reasoning,
    Emotion,
    Result,
    Meeting,
    InteractionType,
    ResourceShare,
    ResourceGift,
    Dialogue,
    TenseEncounter,
    BriefAcknowledgment,
    CasualGreeting,
}

/// What a matched line does to the parser state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Turn(TurnEffect),
    Interaction(InteractionEffect),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEffect {
    /// Remember the current turn number for entries created afterwards.
    Header(u32),
    /// Append a new turn log entry.
    Start { actor: String },
    /// Fill in a field of the most recent turn log entry.
    Amend { field: TurnField, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionEffect {
    /// Append a new interaction record.
    Start {
        participants: [String; 2],
        location: String,
    },
    Kind(String),
    Exchange(String),
    Outcome(&'static str),
}

/// One row of the marker table.
pub struct MarkerRule {
    pub id: MarkerId,
    pub pattern: &'static str,
    pub extract: fn(&Captures<'_>) -> Option<Effect>,
}

/// Marker rules in priority order.
pub static MARKER_RULES: &[MarkerRule] = &[
    MarkerRule {
        id: MarkerId::TurnHeader,
        pattern: r"^\s*TURN\s+(?P<number>\d+)\s+-\s+\S",
        extract: turn_header,
    },
    MarkerRule {
        id: MarkerId::ActorTurn,
        pattern: r"^\s*🎭\s*(?P<value>\S.*?)\s*$",
        extract: actor_turn,
    },
    MarkerRule {
        id: MarkerId::Location,
        pattern: r"^\s*📍\s*Location:\s*(?P<value>\S.*?)\s*$",
        extract: amend_location,
    },
    MarkerRule {
        id: MarkerId::Decision,
        pattern: r"^\s*🤔\s*Decision:\s*(?P<value>\S.*?)\s*$",
        extract: amend_action,
    },
    MarkerRule {
        id: MarkerId::Tool,
        pattern: r"^\s*🔧\s*Using MCP:\s*(?P<value>\S.*?)\s*$",
        extract: amend_tool,
    },
    MarkerRule {
        id: MarkerId::Reasoning,
        pattern: r"^\s*💭\s*Reasoning:\s*(?P<value>\S.*?)\s*$",
        extract: amend_reasoning,
    },
    MarkerRule {
        id: MarkerId::Emotion,
        pattern: r"^\s*😔\s*Emotion:\s*(?P<value>\S.*?)\s*$",
        extract: amend_emotion,
    },
    MarkerRule {
        id: MarkerId::Result,
        pattern: r"^\s*✅\s*Result:\s*(?P<value>\S.*?)\s*$",
        extract: amend_result,
    },
    MarkerRule {
        id: MarkerId::Meeting,
        pattern: r"^\s*🤝\s*(?P<first>\S+)\s+meets\s+(?P<second>\S+)\s+at\s+(?P<location>\S.*?)\s*$",
        extract: meeting,
    },
    MarkerRule {
        id: MarkerId::InteractionType,
        pattern: r"^\s*Interaction type:\s*(?P<value>\S.*?)\s*$",
        extract: interaction_kind,
    },
    MarkerRule {
        id: MarkerId::ResourceShare,
        pattern: r"^\s*💰\s*(?P<from>\S+)\s+shares\s+\$(?P<amount>\d[\d,]*(?:\.\d+)?)\s+with\s+(?P<to>\S+)",
        extract: resource_share,
    },
    MarkerRule {
        id: MarkerId::ResourceGift,
        pattern: r"^\s*💝\s*(?P<from>\S+)\s+gives\s+\$(?P<amount>\d[\d,]*(?:\.\d+)?)\s+to\s+(?P<to>\S+)",
        extract: resource_gift,
    },
    MarkerRule {
        id: MarkerId::Dialogue,
        pattern: r"^\s*💬",
        extract: dialogue,
    },
    MarkerRule {
        id: MarkerId::TenseEncounter,
        pattern: r"^\s*😣",
        extract: tense_encounter,
    },
    MarkerRule {
        id: MarkerId::BriefAcknowledgment,
        pattern: r"^\s*🚶",
        extract: brief_acknowledgment,
    },
    MarkerRule {
        id: MarkerId::CasualGreeting,
        pattern: r"^\s*👋",
        extract: casual_greeting,
    },
];

static COMPILED_RULES: LazyLock<Vec<(&'static MarkerRule, Regex)>> = LazyLock::new(|| {
    MARKER_RULES
        .iter()
        .map(|rule| (rule, Regex::new(rule.pattern).expect("marker pattern compiles")))
        .collect()
});

/// Classify a single line against the marker table.
///
/// Returns the first rule that both matches and extracts an effect.
pub fn classify(line: &str) -> Option<(MarkerId, Effect)> {
    COMPILED_RULES.iter().find_map(|(rule, regex)| {
        let caps = regex.captures(line)?;
        (rule.extract)(&caps).map(|effect| (rule.id, effect))
    })
}

fn capture(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

fn amend(caps: &Captures<'_>, field: TurnField) -> Option<Effect> {
    let value = capture(caps, "value")?;
    Some(Effect::Turn(TurnEffect::Amend { field, value }))
}

fn outcome(text: &'static str) -> Effect {
    Effect::Interaction(InteractionEffect::Outcome(text))
}

fn dialogue(_: &Captures<'_>) -> Option<Effect> {
    Some(outcome(DIALOGUE_OUTCOME))
}

fn tense_encounter(_: &Captures<'_>) -> Option<Effect> {
    Some(outcome(TENSE_OUTCOME))
}

fn brief_acknowledgment(_: &Captures<'_>) -> Option<Effect> {
    Some(outcome(BRIEF_OUTCOME))
}

fn casual_greeting(_: &Captures<'_>) -> Option<Effect> {
    Some(outcome(GREETING_OUTCOME))
}

fn turn_header(caps: &Captures<'_>) -> Option<Effect> {
    let number = caps.name("number")?.as_str().parse().ok()?;
    Some(Effect::Turn(TurnEffect::Header(number)))
}

fn actor_turn(caps: &Captures<'_>) -> Option<Effect> {
    let actor = capture(caps, "value")?;
    Some(Effect::Turn(TurnEffect::Start { actor }))
}

fn amend_location(caps: &Captures<'_>) -> Option<Effect> {
    amend(caps, TurnField::Location)
}

fn amend_action(caps: &Captures<'_>) -> Option<Effect> {
    amend(caps, TurnField::Action)
}

fn amend_tool(caps: &Captures<'_>) -> Option<Effect> {
    amend(caps, TurnField::Tool)
}

fn amend_reasoning(caps: &Captures<'_>) -> Option<Effect> {
    amend(caps, TurnField::Reasoning)
}

fn amend_emotion(caps: &Captures<'_>) -> Option<Effect> {
    amend(caps, TurnField::Emotion)
}

fn amend_result(caps: &Captures<'_>) -> Option<Effect> {
    amend(caps, TurnField::Result)
}

fn meeting(caps: &Captures<'_>) -> Option<Effect> {
    let first = capture(caps, "first")?;
    let second = capture(caps, "second")?;
    let location = capture(caps, "location")?;
    Some(Effect::Interaction(InteractionEffect::Start {
        participants: [first, second],
        location,
    }))
}

fn interaction_kind(caps: &Captures<'_>) -> Option<Effect> {
    let kind = capture(caps, "value")?;
    Some(Effect::Interaction(InteractionEffect::Kind(kind)))
}

fn resource_share(caps: &Captures<'_>) -> Option<Effect> {
    let (from, amount, to) = transfer(caps)?;
    Some(Effect::Interaction(InteractionEffect::Exchange(format!(
        "{from} shared ${amount} with {to}"
    ))))
}

fn resource_gift(caps: &Captures<'_>) -> Option<Effect> {
    let (from, amount, to) = transfer(caps)?;
    Some(Effect::Interaction(InteractionEffect::Exchange(format!(
        "{from} gave ${amount} to {to}"
    ))))
}

fn transfer(caps: &Captures<'_>) -> Option<(String, String, String)> {
    Some((
        capture(caps, "from")?,
        capture(caps, "amount")?,
        capture(caps, "to")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rule_pattern_compiles() {
        assert_eq!(COMPILED_RULES.len(), MARKER_RULES.len());
    }

    #[test]
    fn actor_line_starts_turn() {
        let (id, effect) = classify("🎭 alex_chen").expect("match");
        assert_eq!(id, MarkerId::ActorTurn);
        assert_eq!(
            effect,
            Effect::Turn(TurnEffect::Start {
                actor: "alex_chen".to_string()
            })
        );
    }

    #[test]
    fn indented_meeting_line_extracts_participants_and_location() {
        let (id, effect) = classify("   🤝 alex_chen meets jamie_rodriguez at coffee_shop ").expect("match");
        assert_eq!(id, MarkerId::Meeting);
        assert_eq!(
            effect,
            Effect::Interaction(InteractionEffect::Start {
                participants: ["alex_chen".to_string(), "jamie_rodriguez".to_string()],
                location: "coffee_shop".to_string(),
            })
        );
    }

    #[test]
    fn money_status_line_is_not_a_resource_share() {
        assert_eq!(classify("💰 Money: $53.09"), None);
    }

    #[test]
    fn gift_line_formats_transfer() {
        let (_, effect) = classify("   💝 tyler_chen gives $20 to alex_chen").expect("match");
        assert_eq!(
            effect,
            Effect::Interaction(InteractionEffect::Exchange(
                "tyler_chen gave $20 to alex_chen".to_string()
            ))
        );
    }

    #[test]
    fn decision_without_text_is_dropped() {
        assert_eq!(classify("🤔 Decision:   "), None);
    }

    #[test]
    fn plain_lines_do_not_match() {
        assert_eq!(classify("CHARACTER INTERACTIONS"), None);
        assert_eq!(classify("Wealth ratio: 500000:1"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn marker_glyph_inside_text_does_not_match() {
        let (id, _) = classify("💭 Reasoning: a one-woman show 🎭 tonight").expect("match");
        assert_eq!(id, MarkerId::Reasoning);
        let (id, _) = classify("✅ Result: shared a 💬 with the barista").expect("match");
        assert_eq!(id, MarkerId::Result);
        assert_eq!(classify("the crowd 💬 murmured"), None);
        assert_eq!(classify("nobody 👋 waved back"), None);
        assert_eq!(classify("note: 🎭 alex_chen"), None);
    }

    #[test]
    fn brief_and_greeting_lines_map_to_outcomes() {
        assert_eq!(
            classify("   🚶 Brief acknowledgment, no meaningful interaction"),
            Some((MarkerId::BriefAcknowledgment, outcome(BRIEF_OUTCOME)))
        );
        assert_eq!(
            classify("   👋 Casual greeting"),
            Some((MarkerId::CasualGreeting, outcome(GREETING_OUTCOME)))
        );
    }

    #[test]
    fn turn_header_carries_number() {
        let (id, effect) = classify("TURN 12 - 08:30 AM").expect("match");
        assert_eq!(id, MarkerId::TurnHeader);
        assert_eq!(effect, Effect::Turn(TurnEffect::Header(12)));
    }
}
