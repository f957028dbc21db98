use std::fmt;

use anyhow::{Result, bail};
use chronoquest_game::{AirportCode, BadgeCatalog, BadgeId, PlayerState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Step an autopilot wants to take next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Travel(AirportCode),
    BuyRange(u32),
    BuyCredits(u32),
    ActivatePerk(BadgeId),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Travel(code) => write!(f, "travel {code}"),
            Self::BuyRange(credits) => write!(f, "buy {credits} range"),
            Self::BuyCredits(flux) => write!(f, "sell {flux} fluxfire"),
            Self::ActivatePerk(badge) => write!(f, "activate {badge}"),
        }
    }
}

/// What a policy can see besides the player state.
pub struct PolicyView<'a> {
    /// Every airport except home, in catalog order.
    pub destinations: &'a [AirportCode],
    pub badges: &'a BadgeCatalog,
}

impl PolicyView<'_> {
    fn first_away_from(&self, state: &PlayerState) -> AirportCode {
        self.destinations
            .iter()
            .find(|code| **code != state.current_location)
            .cloned()
            .unwrap_or_else(AirportCode::home)
    }

    /// An earned badge whose perk has not been spent this run.
    fn unused_perk(&self, state: &PlayerState) -> Option<BadgeId> {
        state
            .badges_earned
            .iter()
            .filter(|id| !state.perks_used.contains(*id))
            .find(|id| self.badges.find(id).is_some_and(|badge| badge.perk.is_some()))
            .cloned()
    }
}

/// Autopilot interface for simulated players.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    fn next_action(&mut self, state: &PlayerState, view: &PolicyView<'_>) -> Action;
}

/// Built-in autopilot strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    Cautious,
    Greedy,
    Random,
}

impl Strategy {
    pub const ALL: [Self; 3] = [Self::Cautious, Self::Greedy, Self::Random];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cautious => "cautious",
            Self::Greedy => "greedy",
            Self::Random => "random",
        }
    }

    /// Parse a comma-separated strategy list; `all` expands to every strategy.
    pub fn parse_list(tokens: &[String]) -> Result<Vec<Self>> {
        let mut strategies = Vec::new();
        for token in tokens {
            let parsed: &[Self] = match token.to_ascii_lowercase().as_str() {
                "all" => &Self::ALL,
                "cautious" => &[Self::Cautious],
                "greedy" => &[Self::Greedy],
                "random" => &[Self::Random],
                other => bail!("unknown strategy '{other}' (expected cautious, greedy, random, or all)"),
            };
            for strategy in parsed {
                if !strategies.contains(strategy) {
                    strategies.push(*strategy);
                }
            }
        }
        Ok(strategies)
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Cautious => Box::new(CautiousPolicy::default()),
            Self::Greedy => Box::new(GreedyPolicy::default()),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn ready_to_win(state: &PlayerState) -> bool {
    state.has_all_fragments()
        && state
            .required_flux()
            .is_some_and(|required| state.fluxfire >= required)
}

/// Keeps a range cushion, spends perks early, and only heads home with a full kit.
#[derive(Debug, Default)]
struct CautiousPolicy {
    cursor: usize,
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "cautious"
    }

    fn next_action(&mut self, state: &PlayerState, view: &PolicyView<'_>) -> Action {
        if state.is_trapped() {
            return Action::Travel(view.first_away_from(state));
        }
        if let Some(badge) = view.unused_perk(state) {
            return Action::ActivatePerk(badge);
        }
        if state.range < 250 && state.credits > 0 {
            return Action::BuyRange(state.credits.min(300));
        }
        if ready_to_win(state) {
            return Action::Travel(AirportCode::home());
        }
        let required = state.required_flux().unwrap_or(0);
        if state.credits < 100 && state.fluxfire > required {
            return Action::BuyCredits(state.fluxfire - required);
        }
        self.cursor = (self.cursor + 1) % view.destinations.len().max(1);
        let next = view
            .destinations
            .get(self.cursor)
            .cloned()
            .unwrap_or_else(AirportCode::home);
        if next == state.current_location {
            Action::Travel(view.first_away_from(state))
        } else {
            Action::Travel(next)
        }
    }
}

/// Flies until nearly empty, then converts everything, and rushes home on the last fragment.
#[derive(Debug, Default)]
struct GreedyPolicy {
    cursor: usize,
}

impl PlayerPolicy for GreedyPolicy {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn next_action(&mut self, state: &PlayerState, view: &PolicyView<'_>) -> Action {
        if state.is_trapped() {
            return Action::Travel(view.first_away_from(state));
        }
        if state.range < 200 {
            if state.credits > 0 {
                return Action::BuyRange(state.credits);
            }
            if state.fluxfire > 0 {
                return Action::BuyCredits(state.fluxfire);
            }
        }
        if state.has_all_fragments() && !state.current_location.is_home() {
            return Action::Travel(AirportCode::home());
        }
        let stride = 7;
        self.cursor = (self.cursor + stride) % view.destinations.len().max(1);
        let next = view
            .destinations
            .get(self.cursor)
            .cloned()
            .unwrap_or_else(AirportCode::home);
        if next == state.current_location {
            Action::Travel(view.first_away_from(state))
        } else {
            Action::Travel(next)
        }
    }
}

/// Uniformly random choices from a seeded stream.
struct RandomPolicy {
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn next_action(&mut self, state: &PlayerState, view: &PolicyView<'_>) -> Action {
        if ready_to_win(state) && self.rng.gen_bool(0.5) {
            return Action::Travel(AirportCode::home());
        }
        let roll = self.rng.gen_range(0..100);
        if roll < 10 && state.credits > 0 {
            return Action::BuyRange(self.rng.gen_range(1..=state.credits));
        }
        if roll < 13 && state.fluxfire > 0 {
            return Action::BuyCredits(self.rng.gen_range(1..=state.fluxfire));
        }
        if roll < 15
            && let Some(badge) = view.unused_perk(state)
        {
            return Action::ActivatePerk(badge);
        }
        if view.destinations.is_empty() {
            return Action::Travel(AirportCode::home());
        }
        let idx = self.rng.gen_range(0..view.destinations.len());
        Action::Travel(view.destinations[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronoquest_game::FuelRequirement;

    fn destinations() -> Vec<AirportCode> {
        ["EGLL", "ESSA", "EETN"].into_iter().map(AirportCode::new).collect()
    }

    fn winner() -> PlayerState {
        let mut state = PlayerState::new("bot").with_fuel_requirement(FuelRequirement {
            fuel_type: "Inferno".to_string(),
            required_flux: 2,
        });
        for id in 1..=5 {
            state.add_fragment(id).unwrap();
        }
        state.fluxfire = 2;
        state.current_location = AirportCode::new("EGLL");
        state
    }

    #[test]
    fn strategy_lists_parse_and_dedupe() {
        let tokens = vec!["greedy".to_string(), "all".to_string()];
        let parsed = Strategy::parse_list(&tokens).unwrap();
        assert_eq!(parsed, vec![Strategy::Greedy, Strategy::Cautious, Strategy::Random]);
        assert!(Strategy::parse_list(&["reckless".to_string()]).is_err());
    }

    #[test]
    fn cautious_goes_home_when_ready() {
        let destinations = destinations();
        let badges = BadgeCatalog::default();
        let view = PolicyView {
            destinations: &destinations,
            badges: &badges,
        };
        let mut policy = Strategy::Cautious.create_policy(1);
        assert_eq!(
            policy.next_action(&winner(), &view),
            Action::Travel(AirportCode::home())
        );
    }

    #[test]
    fn cautious_tops_up_range() {
        let destinations = destinations();
        let badges = BadgeCatalog::default();
        let view = PolicyView {
            destinations: &destinations,
            badges: &badges,
        };
        let mut state = PlayerState::new("bot");
        state.range = 100;
        state.credits = 500;
        let mut policy = Strategy::Cautious.create_policy(1);
        assert_eq!(policy.next_action(&state, &view), Action::BuyRange(300));
    }

    #[test]
    fn trapped_players_keep_trying_to_leave() {
        let destinations = destinations();
        let badges = BadgeCatalog::default();
        let view = PolicyView {
            destinations: &destinations,
            badges: &badges,
        };
        let mut state = winner();
        state.trap.active = true;
        for strategy in [Strategy::Cautious, Strategy::Greedy] {
            let action = strategy.create_policy(3).next_action(&state, &view);
            assert_eq!(action, Action::Travel(AirportCode::new("ESSA")));
        }
    }

    #[test]
    fn random_policy_is_seeded() {
        let destinations = destinations();
        let badges = BadgeCatalog::default();
        let view = PolicyView {
            destinations: &destinations,
            badges: &badges,
        };
        let state = PlayerState::new("bot");
        let mut a = Strategy::Random.create_policy(42);
        let mut b = Strategy::Random.create_policy(42);
        for _ in 0..20 {
            assert_eq!(a.next_action(&state, &view), b.next_action(&state, &view));
        }
    }

    #[test]
    fn unused_perks_are_spent_first() {
        let destinations = destinations();
        let badges = BadgeCatalog::load_default();
        let view = PolicyView {
            destinations: &destinations,
            badges: &badges,
        };
        let state = PlayerState::new("bot").with_badges([BadgeId::new("FIRST_LOSS")]);
        let mut policy = Strategy::Cautious.create_policy(0);
        assert_eq!(
            policy.next_action(&state, &view),
            Action::ActivatePerk(BadgeId::new("FIRST_LOSS"))
        );
    }
}
