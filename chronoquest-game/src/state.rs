//! Player state for a single ChronoQuest run.
use crate::airport::AirportCode;
use crate::badges::BadgeId;
use crate::constants::{FRAGMENT_COUNT, START_CREDITS, START_FLUXFIRE, START_RANGE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fragment identifier, always in `1..=FRAGMENT_COUNT`.
pub type FragmentId = u8;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Whether the run can still be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Active,
    Won,
    Lost,
}

impl RunStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Won => write!(f, "won"),
            Self::Lost => write!(f, "lost"),
        }
    }
}

/// Paradox trap bookkeeping.
///
/// `coins_collected` never rests at the escape target: the transition that
/// collects the last coin also clears the trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrapState {
    pub active: bool,
    pub coins_collected: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
}

impl TrapState {
    /// Milliseconds spent trapped, if a trap is active.
    #[must_use]
    pub fn elapsed_ms(&self, now: Timestamp) -> Option<i64> {
        if !self.active {
            return None;
        }
        self.started_at.map(|started| now.saturating_sub(started))
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Fuel the player must brew at home: the win threshold for fluxfire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelRequirement {
    pub fuel_type: String,
    pub required_flux: u32,
}

/// Transient buffs granted by badge perks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuffWindows {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lucky_until: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub void_until: Option<Timestamp>,
    #[serde(default)]
    pub jetstream_remaining: u32,
}

impl BuffWindows {
    #[must_use]
    pub fn lucky_active(&self, now: Timestamp) -> bool {
        self.lucky_until.is_some_and(|until| now < until)
    }

    #[must_use]
    pub fn void_active(&self, now: Timestamp) -> bool {
        self.void_until.is_some_and(|until| now < until)
    }
}

/// Authoritative state of one player's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_name: String,
    pub credits: u32,
    #[serde(alias = "energy")]
    pub range: u32,
    pub fluxfire: u32,
    #[serde(default)]
    pub fragments: BTreeSet<FragmentId>,
    #[serde(default)]
    pub count_fragments: u8,
    pub current_location: AirportCode,
    #[serde(default)]
    pub trap: TrapState,
    #[serde(default)]
    pub badges_earned: BTreeSet<BadgeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_requirement: Option<FuelRequirement>,
    #[serde(default)]
    pub buffs: BuffWindows,
    /// Badge perks already spent during this run.
    #[serde(default)]
    pub perks_used: BTreeSet<BadgeId>,
    #[serde(default)]
    pub status: RunStatus,
    /// Flights actually taken this run.
    #[serde(default)]
    pub flights: u32,
}

impl PlayerState {
    /// Fresh run at home with the starting ledger.
    #[must_use]
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            credits: START_CREDITS,
            range: START_RANGE,
            fluxfire: START_FLUXFIRE,
            fragments: BTreeSet::new(),
            count_fragments: 0,
            current_location: AirportCode::home(),
            trap: TrapState::default(),
            badges_earned: BTreeSet::new(),
            fuel_requirement: None,
            buffs: BuffWindows::default(),
            perks_used: BTreeSet::new(),
            status: RunStatus::Active,
            flights: 0,
        }
    }

    #[must_use]
    pub fn with_fuel_requirement(mut self, requirement: FuelRequirement) -> Self {
        self.fuel_requirement = Some(requirement);
        self
    }

    #[must_use]
    pub fn with_badges(mut self, badges: impl IntoIterator<Item = BadgeId>) -> Self {
        self.badges_earned.extend(badges);
        self
    }

    /// Start over with defaults, keeping the player's name and earned badges.
    pub fn reset(&mut self, requirement: FuelRequirement) {
        let badges = std::mem::take(&mut self.badges_earned);
        let name = std::mem::take(&mut self.player_name);
        *self = Self::new(name)
            .with_badges(badges)
            .with_fuel_requirement(requirement);
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    #[must_use]
    pub const fn is_trapped(&self) -> bool {
        self.trap.active
    }

    #[must_use]
    pub fn has_all_fragments(&self) -> bool {
        self.count_fragments >= FRAGMENT_COUNT
    }

    /// Lowest fragment id not yet collected.
    #[must_use]
    pub fn next_missing_fragment(&self) -> Option<FragmentId> {
        (1..=FRAGMENT_COUNT).find(|id| !self.fragments.contains(id))
    }

    /// Required fluxfire for the current run, if the fuel has been drawn.
    #[must_use]
    pub fn required_flux(&self) -> Option<u32> {
        self.fuel_requirement.as_ref().map(|req| req.required_flux)
    }

    /// Names of any structural invariants this state breaks.
    #[must_use]
    pub fn invariant_violations(&self, coins_to_escape: u8) -> Vec<&'static str> {
        let mut violations = Vec::new();
        if usize::from(self.count_fragments) != self.fragments.len() {
            violations.push("fragment count out of sync with fragment set");
        }
        if self.count_fragments > FRAGMENT_COUNT {
            violations.push("more fragments than exist");
        }
        if self
            .fragments
            .iter()
            .any(|id| !(1..=FRAGMENT_COUNT).contains(id))
        {
            violations.push("fragment id outside the known set");
        }
        if self.trap.coins_collected >= coins_to_escape {
            violations.push("trap coins at or above the escape target");
        }
        if !self.trap.active && (self.trap.coins_collected > 0 || self.trap.started_at.is_some()) {
            violations.push("inactive trap carries progress");
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_requirement() -> FuelRequirement {
        FuelRequirement {
            fuel_type: "Voltash".to_string(),
            required_flux: 6,
        }
    }

    #[test]
    fn new_state_uses_starting_ledger() {
        let state = PlayerState::new("ada");
        assert_eq!(state.credits, 1_000);
        assert_eq!(state.range, 1_000);
        assert_eq!(state.fluxfire, 0);
        assert!(state.fragments.is_empty());
        assert!(state.current_location.is_home());
        assert!(!state.is_trapped());
        assert_eq!(state.status, RunStatus::Active);
        assert_eq!(state.next_missing_fragment(), Some(1));
        assert!(state.invariant_violations(3).is_empty());
    }

    #[test]
    fn reset_preserves_badges_and_name() {
        let mut state = PlayerState::new("ada")
            .with_badges([BadgeId::new("FIRST_WIN")])
            .with_fuel_requirement(sample_requirement());
        state.credits = 3;
        state.fragments.insert(2);
        state.count_fragments = 1;
        state.status = RunStatus::Lost;
        state.perks_used.insert(BadgeId::new("FIRST_WIN"));

        let requirement = FuelRequirement {
            fuel_type: "Inferno".to_string(),
            required_flux: 2,
        };
        state.reset(requirement.clone());

        assert_eq!(state.player_name, "ada");
        assert_eq!(state.credits, 1_000);
        assert!(state.fragments.is_empty());
        assert_eq!(state.status, RunStatus::Active);
        assert!(state.badges_earned.contains(&BadgeId::new("FIRST_WIN")));
        assert!(state.perks_used.is_empty());
        assert_eq!(state.fuel_requirement, Some(requirement));
    }

    #[test]
    fn buff_windows_expire() {
        let buffs = BuffWindows {
            lucky_until: Some(1_000),
            void_until: None,
            jetstream_remaining: 0,
        };
        assert!(buffs.lucky_active(999));
        assert!(!buffs.lucky_active(1_000));
        assert!(!buffs.void_active(0));
    }

    #[test]
    fn invariant_checks_flag_drift() {
        let mut state = PlayerState::new("ada");
        state.fragments.insert(1);
        assert!(!state.invariant_violations(3).is_empty());
        state.count_fragments = 1;
        assert!(state.invariant_violations(3).is_empty());
        state.trap.coins_collected = 3;
        state.trap.active = true;
        assert!(!state.invariant_violations(3).is_empty());
    }

    #[test]
    fn trap_elapsed_only_when_active() {
        let mut trap = TrapState {
            active: true,
            coins_collected: 1,
            started_at: Some(500),
        };
        assert_eq!(trap.elapsed_ms(2_500), Some(2_000));
        trap.clear();
        assert_eq!(trap.elapsed_ms(2_500), None);
        assert_eq!(trap, TrapState::default());
    }
}
