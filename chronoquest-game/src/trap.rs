//! Paradox trap state machine.
//!
//! `Free -> Trapped` when the outcome draw lands on a trap. While trapped,
//! every travel attempt is spent collecting coins instead of flying; the
//! attempt that collects the last coin clears the trap in the same step.
//! A trap left unresolved past the timeout loses the run, checked lazily on
//! the next interaction.
use rand::Rng;

use crate::config::TrapCfg;
use crate::events::{Event, EventLog};
use crate::state::{PlayerState, Timestamp, TrapState};

/// Coarse trap phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapPhase {
    Free,
    Trapped,
}

impl TrapPhase {
    #[must_use]
    pub const fn of(state: &PlayerState) -> Self {
        if state.trap.active {
            Self::Trapped
        } else {
            Self::Free
        }
    }
}

/// Spring a trap at `now`.
pub fn trigger(trap: &mut TrapState, now: Timestamp) -> Event {
    trap.active = true;
    trap.coins_collected = 0;
    trap.started_at = Some(now);
    Event::TrapTriggered
}

/// Result of a travel attempt made while trapped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrapAttempt {
    pub events: EventLog,
    pub escaped: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TrapMachine<'a> {
    cfg: &'a TrapCfg,
}

impl<'a> TrapMachine<'a> {
    #[must_use]
    pub const fn new(cfg: &'a TrapCfg) -> Self {
        Self { cfg }
    }

    /// Whether the trap has been held at least as long as the timeout.
    #[must_use]
    pub fn timed_out(&self, trap: &TrapState, now: Timestamp) -> bool {
        trap.elapsed_ms(now)
            .is_some_and(|elapsed| elapsed >= self.cfg.timeout_ms)
    }

    /// Spend a travel attempt on the trap. A free player gets an empty attempt.
    pub fn attempt<R: Rng>(&self, trap: &mut TrapState, rng: &mut R) -> TrapAttempt {
        let mut attempt = TrapAttempt::default();
        if !trap.active {
            return attempt;
        }

        let found_coin = self.cfg.coin_chance >= 1.0 || rng.gen_bool(self.cfg.coin_chance);
        if !found_coin {
            attempt.events.push(Event::Nothing);
            return attempt;
        }

        let coins = trap.coins_collected.saturating_add(1);
        attempt.events.push(Event::TrapCoinCollected { coins });
        if coins >= self.cfg.coins_to_escape {
            trap.clear();
            attempt.events.push(Event::TrapEscaped);
            attempt.escaped = true;
        } else {
            trap.coins_collected = coins;
        }
        attempt
    }
}
