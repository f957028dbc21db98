//! JSON request and response shapes for HTTP-style adapters.
//!
//! Field names follow the wire format older clients already speak, so
//! `ICAO` is accepted next to `icao` and range purchases take either
//! `credits` or `amount`.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::airport::AirportCode;
use crate::badges::BadgeId;
use crate::error::GameError;
use crate::events::{Event, EventLog, LossCause};
use crate::state::PlayerState;
use crate::travel::TravelOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelRequest {
    #[serde(alias = "ICAO")]
    pub icao: AirportCode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuyRangeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Value>,
}

impl BuyRangeRequest {
    /// Credits to spend; `credits` wins over `amount` when both are present.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] for a missing, non-numeric, or
    /// non-positive amount.
    pub fn credits(&self) -> Result<u32, GameError> {
        parse_amount("credits", self.credits.as_ref().or(self.amount.as_ref()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuyCreditsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluxfire: Option<Value>,
}

impl BuyCreditsRequest {
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] for a missing, non-numeric, or
    /// non-positive amount.
    pub fn fluxfire(&self) -> Result<u32, GameError> {
        parse_amount("fluxfire", self.fluxfire.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatePerkRequest {
    pub badge: BadgeId,
}

/// Validate a client-supplied amount as a positive whole number.
///
/// # Errors
///
/// Returns [`GameError::InvalidInput`] naming `field` when the value is
/// absent, not a JSON number, fractional, zero or negative, or too large.
pub fn parse_amount(field: &'static str, value: Option<&Value>) -> Result<u32, GameError> {
    let Some(value) = value else {
        return Err(GameError::invalid(field, "is required"));
    };
    let Value::Number(number) = value else {
        return Err(GameError::invalid(field, "must be a number"));
    };
    if let Some(whole) = number.as_u64() {
        if whole == 0 {
            return Err(GameError::invalid(field, "must be positive"));
        }
        return u32::try_from(whole).map_err(|_| GameError::invalid(field, "is too large"));
    }
    if number.as_i64().is_some() {
        return Err(GameError::invalid(field, "must be positive"));
    }
    match number.as_f64() {
        Some(float) if float <= 0.0 => Err(GameError::invalid(field, "must be positive")),
        _ => Err(GameError::invalid(field, "must be a whole number")),
    }
}

/// Reply to the economy endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EconomyResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<PlayerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<PlayerState, GameError>> for EconomyResponse {
    fn from(result: Result<PlayerState, GameError>) -> Self {
        match result {
            Ok(state) => Self {
                ok: true,
                state: Some(state),
                error: None,
            },
            Err(err) => Self {
                ok: false,
                state: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Reply to a travel request, with win and loss lifted out of the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TravelResponse {
    pub state: PlayerState,
    pub events: EventLog,
    pub badges: Vec<BadgeId>,
    pub win: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lose: Option<LossCause>,
}

impl From<TravelOutcome> for TravelResponse {
    fn from(outcome: TravelOutcome) -> Self {
        let win = outcome.won();
        let lose = outcome.events.iter().find_map(|event| match event {
            Event::Lose { cause } => Some(*cause),
            _ => None,
        });
        Self {
            state: outcome.state,
            events: outcome.events,
            badges: outcome.new_badges,
            win,
            lose,
        }
    }
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub error: String,
}

impl From<&GameError> for ErrorResponse {
    fn from(err: &GameError) -> Self {
        Self {
            code: err.code(),
            error: err.to_string(),
        }
    }
}
