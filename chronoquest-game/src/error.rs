//! Error type surfaced by every engine operation.
use thiserror::Error;

use crate::airport::AirportCode;
use crate::badges::BadgeId;
use crate::ledger::{LedgerError, Resource};
use crate::state::RunStatus;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("no valid session")]
    Unauthorized,
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("not enough {resource}: need {needed}, have {available}")]
    InsufficientResource {
        resource: Resource,
        needed: u32,
        available: u32,
    },
    #[error("run already {status}")]
    RunFinished { status: RunStatus },
    #[error("unknown airport {0}")]
    UnknownAirport(AirportCode),
    #[error("badge {0} has not been earned")]
    BadgeNotEarned(BadgeId),
    #[error("badge {badge} perk unavailable: {reason}")]
    PerkUnavailable { badge: BadgeId, reason: &'static str },
    #[error("storage failure: {0}")]
    Storage(String),
}

impl GameError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Short machine-readable code, handy for HTTP or CLI adapters.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidInput { .. } => "invalid_input",
            Self::InsufficientResource { .. } => "insufficient_resource",
            Self::RunFinished { .. } => "run_finished",
            Self::UnknownAirport(_) => "unknown_airport",
            Self::BadgeNotEarned(_) => "badge_not_earned",
            Self::PerkUnavailable { .. } => "perk_unavailable",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<LedgerError> for GameError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Insufficient {
                resource,
                needed,
                available,
            } => Self::InsufficientResource {
                resource,
                needed,
                available,
            },
            LedgerError::UnknownFragment(id) => {
                Self::invalid("fragment", format!("{id} is not a fragment id"))
            }
        }
    }
}
