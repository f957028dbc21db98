//! Resource ledger: validated mutations over a player's balances.
//!
//! Every operation either applies completely or leaves the state untouched.
use crate::constants::FRAGMENT_COUNT;
use crate::state::{FragmentId, PlayerState};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Countable balance held by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Credits,
    Range,
    Fluxfire,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credits => write!(f, "credits"),
            Self::Range => write!(f, "range"),
            Self::Fluxfire => write!(f, "fluxfire"),
        }
    }
}

/// Rejected ledger mutation.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("not enough {resource}: need {needed}, have {available}")]
    Insufficient {
        resource: Resource,
        needed: u32,
        available: u32,
    },
    #[error("fragment {0} does not exist")]
    UnknownFragment(FragmentId),
}

impl PlayerState {
    #[must_use]
    pub const fn balance(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Credits => self.credits,
            Resource::Range => self.range,
            Resource::Fluxfire => self.fluxfire,
        }
    }

    const fn balance_mut(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Credits => &mut self.credits,
            Resource::Range => &mut self.range,
            Resource::Fluxfire => &mut self.fluxfire,
        }
    }

    /// Remove `amount` of a resource, failing without change if the balance is short.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Insufficient`] when the balance is below `amount`.
    pub fn spend(&mut self, resource: Resource, amount: u32) -> Result<u32, LedgerError> {
        let balance = self.balance_mut(resource);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(LedgerError::Insufficient {
                resource,
                needed: amount,
                available: *balance,
            })?;
        *balance = remaining;
        Ok(remaining)
    }

    /// Add to a resource, saturating at the numeric ceiling.
    pub const fn add(&mut self, resource: Resource, amount: u32) -> u32 {
        let balance = self.balance_mut(resource);
        *balance = balance.saturating_add(amount);
        *balance
    }

    /// Remove up to `amount`, clamped to what the player holds. Returns the amount taken.
    pub fn take_up_to(&mut self, resource: Resource, amount: u32) -> u32 {
        let balance = self.balance_mut(resource);
        let taken = amount.min(*balance);
        *balance -= taken;
        taken
    }

    /// Pay `cost` of one resource and receive `gain` of another as one step.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Insufficient`] when the paying balance is short;
    /// neither balance changes in that case.
    pub fn exchange(
        &mut self,
        pay: Resource,
        cost: u32,
        receive: Resource,
        gain: u32,
    ) -> Result<(), LedgerError> {
        self.spend(pay, cost)?;
        self.add(receive, gain);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Insufficient`] when range is below `amount`.
    pub fn spend_range(&mut self, amount: u32) -> Result<u32, LedgerError> {
        self.spend(Resource::Range, amount)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Insufficient`] when credits are below `amount`.
    pub fn spend_credits(&mut self, amount: u32) -> Result<u32, LedgerError> {
        self.spend(Resource::Credits, amount)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Insufficient`] when fluxfire is below `amount`.
    pub fn spend_fluxfire(&mut self, amount: u32) -> Result<u32, LedgerError> {
        self.spend(Resource::Fluxfire, amount)
    }

    pub const fn add_range(&mut self, amount: u32) -> u32 {
        self.add(Resource::Range, amount)
    }

    pub const fn add_credits(&mut self, amount: u32) -> u32 {
        self.add(Resource::Credits, amount)
    }

    pub const fn add_fluxfire(&mut self, amount: u32) -> u32 {
        self.add(Resource::Fluxfire, amount)
    }

    /// Record a fragment. Adding one already held is a no-op that returns `false`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownFragment`] for ids outside `1..=5`.
    pub fn add_fragment(&mut self, id: FragmentId) -> Result<bool, LedgerError> {
        if !(1..=FRAGMENT_COUNT).contains(&id) {
            return Err(LedgerError::UnknownFragment(id));
        }
        let inserted = self.fragments.insert(id);
        self.count_fragments = u8::try_from(self.fragments.len()).unwrap_or(FRAGMENT_COUNT);
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_rejects_without_partial_change() {
        let mut state = PlayerState::new("ada");
        state.range = 10;
        let before = state.clone();
        let err = state.spend_range(11).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Insufficient {
                resource: Resource::Range,
                needed: 11,
                available: 10
            }
        );
        assert_eq!(state, before);
        assert_eq!(state.spend_range(10).unwrap(), 0);
    }

    #[test]
    fn add_fragment_is_idempotent() {
        let mut state = PlayerState::new("ada");
        assert!(state.add_fragment(3).unwrap());
        let once = state.clone();
        assert!(!state.add_fragment(3).unwrap());
        assert_eq!(state, once);
        assert_eq!(state.count_fragments, 1);
        assert_eq!(state.add_fragment(0), Err(LedgerError::UnknownFragment(0)));
        assert_eq!(state.add_fragment(6), Err(LedgerError::UnknownFragment(6)));
    }

    #[test]
    fn take_up_to_clamps_to_balance() {
        let mut state = PlayerState::new("ada");
        state.credits = 15;
        assert_eq!(state.take_up_to(Resource::Credits, 40), 15);
        assert_eq!(state.credits, 0);
        assert_eq!(state.take_up_to(Resource::Credits, 40), 0);
    }

    #[test]
    fn exchange_moves_both_balances_or_neither() {
        let mut state = PlayerState::new("ada");
        state
            .exchange(Resource::Credits, 100, Resource::Range, 100)
            .unwrap();
        assert_eq!(state.credits, 900);
        assert_eq!(state.range, 1_100);

        let before = state.clone();
        assert!(
            state
                .exchange(Resource::Fluxfire, 1, Resource::Credits, 10)
                .is_err()
        );
        assert_eq!(state, before);
    }

    #[test]
    fn add_saturates() {
        let mut state = PlayerState::new("ada");
        state.fluxfire = u32::MAX - 1;
        assert_eq!(state.add_fluxfire(5), u32::MAX);
        assert_eq!(state.add_credits(1), 1_001);
        assert_eq!(state.add_range(0), 1_000);
        assert_eq!(state.spend_credits(1).unwrap(), 1_000);
        assert!(state.spend_fluxfire(u32::MAX).is_ok());
    }
}
