//! Economic profile heuristics derived from an agent's free-text background.
//!
//! The simulation never persists a trustworthy money figure for characters, so
//! reconciliation re-derives one from background cues every time. The rules are
//! a placeholder heuristic: an ordered cue table, first match wins, with a fixed
//! fallback. `derive_profile` is total and deterministic for every input string.

use serde::Serialize;

use crate::core::types::Needs;

/// Money above which a character gets the comfortable need profile.
pub const WEALTH_THRESHOLD: f64 = 10_000.0;

/// How a cue is compared against the background text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueMatch {
    /// Case-insensitive substring match.
    IgnoreCase,
    /// Case-sensitive substring match (dollar figures).
    Exact,
}

#[derive(Debug, Clone, Copy)]
pub struct Cue {
    pub text: &'static str,
    pub matching: CueMatch,
}

const fn any_case(text: &'static str) -> Cue {
    Cue {
        text,
        matching: CueMatch::IgnoreCase,
    }
}

const fn exact(text: &'static str) -> Cue {
    Cue {
        text,
        matching: CueMatch::Exact,
    }
}

/// One row of the background cue table.
#[derive(Debug, Clone, Copy)]
pub struct EconomicRule {
    pub cues: &'static [Cue],
    pub profile: EconomicProfile,
}

/// Derived economic attributes of a character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicProfile {
    pub money: f64,
    pub location: &'static str,
    pub has_streaming_access: bool,
}

/// Cue rules in priority order.
pub const ECONOMIC_RULES: &[EconomicRule] = &[
    EconomicRule {
        cues: &[any_case("trust fund")],
        profile: EconomicProfile {
            money: 25_000_000.0,
            location: "luxury_apartment",
            has_streaming_access: true,
        },
    },
    EconomicRule {
        cues: &[exact("$500K"), exact("$25M")],
        profile: EconomicProfile {
            money: 500_000.0,
            location: "luxury_apartment",
            has_streaming_access: true,
        },
    },
    EconomicRule {
        cues: &[any_case("tech")],
        profile: EconomicProfile {
            money: 47_000.0,
            location: "tech_office",
            has_streaming_access: true,
        },
    },
    EconomicRule {
        cues: &[any_case("writer"), any_case("couch")],
        profile: EconomicProfile {
            money: 53.09,
            location: "public_library",
            has_streaming_access: true,
        },
    },
    EconomicRule {
        cues: &[any_case("barista"), any_case("film")],
        profile: EconomicProfile {
            money: 43.0,
            location: "coffee_shop",
            has_streaming_access: true,
        },
    },
    EconomicRule {
        cues: &[any_case("nurse")],
        profile: EconomicProfile {
            money: 340.0,
            location: "hospital",
            has_streaming_access: false,
        },
    },
];

/// Profile used when no cue matches (including empty backgrounds).
pub const DEFAULT_PROFILE: EconomicProfile = EconomicProfile {
    money: 100.0,
    location: "public_library",
    has_streaming_access: false,
};

/// Derive the economic profile for a background string.
pub fn derive_profile(background: &str) -> EconomicProfile {
    let lowered = background.to_lowercase();
    ECONOMIC_RULES
        .iter()
        .find(|rule| {
            rule.cues.iter().any(|cue| match cue.matching {
                CueMatch::IgnoreCase => lowered.contains(&cue.text.to_lowercase()),
                CueMatch::Exact => background.contains(cue.text),
            })
        })
        .map(|rule| rule.profile)
        .unwrap_or(DEFAULT_PROFILE)
}

/// Default need levels for a character holding `money`.
pub fn default_needs(money: f64) -> Needs {
    if money > WEALTH_THRESHOLD {
        Needs {
            hunger: 10,
            exhaustion: 0,
            stress: 5,
        }
    } else {
        Needs {
            hunger: 75,
            exhaustion: 85,
            stress: 90,
        }
    }
}
