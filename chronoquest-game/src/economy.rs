//! Credit, range, and fluxfire exchange.
use log::debug;

use crate::config::EconomyCfg;
use crate::error::GameError;
use crate::ledger::Resource;
use crate::state::PlayerState;

/// Resource conversions at the configured rates.
///
/// Every call works on a copy and returns the new state; a rejected call
/// leaves the caller's state untouched.
#[derive(Debug, Clone, Copy)]
pub struct Economy<'a> {
    cfg: &'a EconomyCfg,
}

impl<'a> Economy<'a> {
    #[must_use]
    pub const fn new(cfg: &'a EconomyCfg) -> Self {
        Self { cfg }
    }

    /// Spend `credits` for range.
    ///
    /// # Errors
    ///
    /// Rejects finished runs, a zero amount, and purchases the player cannot afford.
    pub fn buy_range(&self, state: &PlayerState, credits: u32) -> Result<PlayerState, GameError> {
        Self::convert(
            state,
            ("credits", Resource::Credits, credits),
            (Resource::Range, self.cfg.range_per_credit),
        )
    }

    /// Spend `fluxfire` for credits.
    ///
    /// # Errors
    ///
    /// Rejects finished runs, a zero amount, and purchases the player cannot afford.
    pub fn buy_credits(&self, state: &PlayerState, fluxfire: u32) -> Result<PlayerState, GameError> {
        Self::convert(
            state,
            ("fluxfire", Resource::Fluxfire, fluxfire),
            (Resource::Credits, self.cfg.credits_per_fluxfire),
        )
    }

    fn convert(
        state: &PlayerState,
        (field, pay, amount): (&'static str, Resource, u32),
        (receive, rate): (Resource, u32),
    ) -> Result<PlayerState, GameError> {
        if state.is_terminal() {
            return Err(GameError::RunFinished {
                status: state.status,
            });
        }
        if amount == 0 {
            return Err(GameError::invalid(field, "must be a positive whole number"));
        }
        let gain = amount
            .checked_mul(rate)
            .ok_or_else(|| GameError::invalid(field, "amount is too large"))?;

        let mut next = state.clone();
        next.exchange(pay, amount, receive, gain)?;
        debug!(
            "{} exchanged {amount} {pay} for {gain} {receive}",
            state.player_name
        );
        Ok(next)
    }
}
