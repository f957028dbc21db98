//! Tagged outcome events returned by every travel call.
//!
//! The event list fully explains the difference between the state before and
//! after a request; presentation layers interpret it however they like.
use crate::ledger::Resource;
use crate::state::FragmentId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Most travel calls emit one to three events; keep them inline.
pub type EventLog = SmallVec<[Event; 4]>;

/// Why a run was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossCause {
    /// Stayed in a paradox trap past the timeout.
    TrapTimeout,
    /// Ran out of both range and credits to buy more.
    Stranded,
}

/// Outcome of a travel step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Nothing,
    FragmentFound {
        id: FragmentId,
    },
    FluxfireFound {
        amount: u32,
    },
    BanditStruck {
        resource: Resource,
        amount: u32,
    },
    CreditsGained {
        amount: u32,
    },
    RangeGained {
        amount: u32,
    },
    InsufficientRange {
        message: String,
    },
    TrapTriggered,
    TrapCoinCollected {
        coins: u8,
    },
    TrapEscaped,
    EfhkRequirementsNotMet {
        required_flux: u32,
    },
    Win {
        fuel_type: String,
        required_flux: u32,
    },
    Lose {
        cause: LossCause,
    },
}

/// Payload-free discriminant of [`Event`], used by configuration data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTag {
    Nothing,
    FragmentFound,
    FluxfireFound,
    BanditStruck,
    CreditsGained,
    RangeGained,
    InsufficientRange,
    TrapTriggered,
    TrapCoinCollected,
    TrapEscaped,
    EfhkRequirementsNotMet,
    Win,
    Lose,
}

impl Event {
    #[must_use]
    pub const fn tag(&self) -> EventTag {
        match self {
            Self::Nothing => EventTag::Nothing,
            Self::FragmentFound { .. } => EventTag::FragmentFound,
            Self::FluxfireFound { .. } => EventTag::FluxfireFound,
            Self::BanditStruck { .. } => EventTag::BanditStruck,
            Self::CreditsGained { .. } => EventTag::CreditsGained,
            Self::RangeGained { .. } => EventTag::RangeGained,
            Self::InsufficientRange { .. } => EventTag::InsufficientRange,
            Self::TrapTriggered => EventTag::TrapTriggered,
            Self::TrapCoinCollected { .. } => EventTag::TrapCoinCollected,
            Self::TrapEscaped => EventTag::TrapEscaped,
            Self::EfhkRequirementsNotMet { .. } => EventTag::EfhkRequirementsNotMet,
            Self::Win { .. } => EventTag::Win,
            Self::Lose { .. } => EventTag::Lose,
        }
    }

    /// Whether this event ends the run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Win { .. } | Self::Lose { .. })
    }
}
