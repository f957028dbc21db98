//! Badge catalog, award rules, and perks.
//!
//! Badges are data: `data/badges.json` lists each badge with the rule that
//! awards it and an optional perk the player may spend once per run.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use crate::events::{Event, EventTag};
use crate::ledger::Resource;
use crate::state::{BuffWindows, PlayerState, Timestamp};

/// Stable badge identifier such as `FIRST_WIN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeId(String);

impl BadgeId {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BadgeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Condition that awards a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BadgeRule {
    ResourceAtLeast { resource: Resource, amount: u32 },
    FragmentsAtLeast { count: u8 },
    EventOccurred { event: EventTag },
}

impl BadgeRule {
    #[must_use]
    pub fn satisfied(&self, state: &PlayerState, events: &[Event]) -> bool {
        match self {
            Self::ResourceAtLeast { resource, amount } => state.balance(*resource) >= *amount,
            Self::FragmentsAtLeast { count } => state.count_fragments >= *count,
            Self::EventOccurred { event } => events.iter().any(|e| e.tag() == *event),
        }
    }
}

/// Spendable reward attached to a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Perk {
    /// Boon outcomes weigh more until the window closes.
    Lucky { duration_ms: i64 },
    /// Hazard outcomes weigh less until the window closes.
    Void { duration_ms: i64 },
    /// The next few flights cost less range.
    Jetstream { uses: u32 },
}

impl Perk {
    /// Open or extend the matching buff window.
    pub fn apply(self, buffs: &mut BuffWindows, now: Timestamp) {
        let extend = |until: Option<Timestamp>, duration: i64| {
            Some(until.unwrap_or(now).max(now).saturating_add(duration))
        };
        match self {
            Self::Lucky { duration_ms } => buffs.lucky_until = extend(buffs.lucky_until, duration_ms),
            Self::Void { duration_ms } => buffs.void_until = extend(buffs.void_until, duration_ms),
            Self::Jetstream { uses } => {
                buffs.jetstream_remaining = buffs.jetstream_remaining.saturating_add(uses);
            }
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lucky { .. } => "lucky",
            Self::Void { .. } => "void",
            Self::Jetstream { .. } => "jetstream",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rule: BadgeRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perk: Option<Perk>,
}

/// Presentation view of an earned badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeView {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perk: Option<Perk>,
    pub perk_used: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCatalog {
    pub badges: Vec<Badge>,
}

impl BadgeCatalog {
    #[must_use]
    pub const fn new(badges: Vec<Badge>) -> Self {
        Self { badges }
    }

    /// Parse a catalog document.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `json` is not a valid catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The catalog bundled with the crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded badge data is malformed.
    #[must_use]
    pub fn load_default() -> Self {
        static CATALOG: OnceLock<BadgeCatalog> = OnceLock::new();
        CATALOG
            .get_or_init(|| {
                Self::from_json(include_str!("../data/badges.json"))
                    .expect("embedded badges.json must parse")
            })
            .clone()
    }

    #[must_use]
    pub fn find(&self, id: &BadgeId) -> Option<&Badge> {
        self.badges.iter().find(|badge| &badge.id == id)
    }

    /// Views for `ids`; unknown ids still show up, named after themselves.
    #[must_use]
    pub fn describe<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a BadgeId>,
        perks_used: &BTreeSet<BadgeId>,
    ) -> Vec<BadgeView> {
        ids.into_iter()
            .map(|id| match self.find(id) {
                Some(badge) => BadgeView {
                    id: id.clone(),
                    name: badge.name.clone(),
                    description: badge.description.clone(),
                    perk: badge.perk,
                    perk_used: perks_used.contains(id),
                },
                None => BadgeView {
                    id: id.clone(),
                    name: id.to_string(),
                    description: String::new(),
                    perk: None,
                    perk_used: false,
                },
            })
            .collect()
    }
}

/// Compares the state before and after a step against the catalog.
#[derive(Debug, Clone, Copy)]
pub struct BadgeEvaluator<'a> {
    catalog: &'a BadgeCatalog,
}

impl<'a> BadgeEvaluator<'a> {
    #[must_use]
    pub const fn new(catalog: &'a BadgeCatalog) -> Self {
        Self { catalog }
    }

    /// Badges newly satisfied by `after` or `events` that neither state holds yet.
    #[must_use]
    pub fn evaluate(&self, before: &PlayerState, after: &PlayerState, events: &[Event]) -> Vec<BadgeId> {
        self.catalog
            .badges
            .iter()
            .filter(|badge| {
                !before.badges_earned.contains(&badge.id) && !after.badges_earned.contains(&badge.id)
            })
            .filter(|badge| badge.rule.satisfied(after, events))
            .map(|badge| badge.id.clone())
            .collect()
    }
}
