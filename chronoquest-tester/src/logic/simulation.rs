use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use chronoquest_game::{
    AirportCatalog, AirportCode, BadgeId, EngineConfig, Event, GameEngine, GameError, LossCause,
    ManualClock, MemoryStorage, PlayerState, RunStatus, SessionId, StaticAirports, TravelOutcome,
};
use log::{debug, info};
use serde::Serialize;

use super::policy::{Action, PolicyView, Strategy};
use super::seeds::iteration_seed;

/// Simulated wall-clock time between two player actions.
const TURN_MS: i64 = 5_000;
const START_MS: i64 = 1_700_000_000_000;

/// How a simulated run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEnding {
    Won,
    TrapTimeout,
    Stranded,
    /// No resources left to afford any flight.
    Stalled,
    TurnLimit,
}

impl RunEnding {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Won => "won",
            Self::TrapTimeout => "trap timeout",
            Self::Stranded => "stranded",
            Self::Stalled => "stalled",
            Self::TurnLimit => "turn limit",
        }
    }

    #[must_use]
    pub const fn is_loss(self) -> bool {
        matches!(self, Self::TrapTimeout | Self::Stranded)
    }
}

/// Result of one autopilot run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub strategy: String,
    pub seed: u64,
    pub ending: RunEnding,
    pub turns: u32,
    pub flights: u32,
    pub fragments: u8,
    pub fluxfire: u32,
    pub credits: u32,
    pub range: u32,
    pub rejected_actions: u32,
    pub badges: Vec<BadgeId>,
    pub violations: Vec<String>,
}

impl RunRecord {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Aggregate over every run of one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategySummary {
    pub strategy: String,
    pub runs: usize,
    pub wins: usize,
    pub losses_by_cause: BTreeMap<String, usize>,
    pub stalled: usize,
    pub turn_limited: usize,
    pub win_rate: f64,
    pub mean_turns: f64,
    pub mean_flights: f64,
    pub badges_seen: BTreeSet<BadgeId>,
    pub violations: usize,
}

enum Applied {
    Travel(Box<TravelOutcome>),
    State(PlayerState),
}

/// Drives autopilot sessions against an in-memory engine.
pub struct Simulator {
    engine: GameEngine<StaticAirports, MemoryStorage>,
    clock: Arc<ManualClock>,
    destinations: Vec<AirportCode>,
    max_turns: u32,
}

impl Simulator {
    pub fn new(config: EngineConfig, max_turns: u32) -> Result<Self> {
        let clock = Arc::new(ManualClock::new(START_MS));
        let engine = GameEngine::new(StaticAirports::load_default(), MemoryStorage::new())
            .with_config(config)
            .context("invalid engine configuration")?
            .with_clock(clock.clone());
        let destinations = engine
            .catalog()
            .airports()
            .iter()
            .map(|airport| airport.icao.clone())
            .filter(|code| !code.is_home())
            .collect();
        Ok(Self {
            engine,
            clock,
            destinations,
            max_turns,
        })
    }

    /// Every strategy against every seed, `iterations` times each.
    pub fn run_batch(
        &self,
        strategies: &[Strategy],
        seeds: &[u64],
        iterations: usize,
    ) -> Result<Vec<RunRecord>> {
        let mut records = Vec::new();
        for strategy in strategies {
            info!("simulating {strategy} over {} seeds", seeds.len());
            for base in seeds {
                for iteration in 0..iterations.max(1) {
                    records.push(self.run(*strategy, iteration_seed(*base, iteration))?);
                }
            }
        }
        Ok(records)
    }

    /// Play one run to its end or the turn limit.
    pub fn run(&self, strategy: Strategy, seed: u64) -> Result<RunRecord> {
        let account = format!("{strategy}-{seed:016x}");
        let session = self.engine.open_session(&account, Some(seed))?;
        let mut policy = strategy.create_policy(seed);
        let view = PolicyView {
            destinations: &self.destinations,
            badges: self.engine.badge_catalog(),
        };

        let mut state = self.engine.get_state(&session)?;
        let mut turns = 0_u32;
        let mut rejected_actions = 0_u32;
        let mut violations = Vec::new();
        let mut loss_cause = None;
        let mut ending = RunEnding::TurnLimit;

        while turns < self.max_turns {
            if self.stalled(&state) {
                ending = RunEnding::Stalled;
                break;
            }
            let action = policy.next_action(&state, &view);
            turns += 1;
            self.clock.advance(TURN_MS);
            debug!("[{} {seed}] turn {turns}: {action}", policy.name());

            let before = state.clone();
            match self.apply(&session, &action) {
                Ok(Applied::Travel(outcome)) => {
                    self.check_travel(&before, &outcome, turns, &mut violations);
                    loss_cause = outcome.events.iter().find_map(|event| match event {
                        Event::Lose { cause } => Some(*cause),
                        _ => None,
                    });
                    state = outcome.state;
                }
                Ok(Applied::State(next)) => state = next,
                // A pending trap timeout is applied by whichever request comes next.
                Err(GameError::RunFinished { status }) => {
                    debug!("[{} {seed}] {action} rejected, run already {status}", policy.name());
                    state = self.engine.get_state(&session)?;
                    if !state.is_terminal() {
                        violations.push(format!("turn {turns}: {action} refused on an active run"));
                    }
                }
                Err(
                    err @ (GameError::InsufficientResource { .. }
                    | GameError::InvalidInput { .. }
                    | GameError::PerkUnavailable { .. }
                    | GameError::BadgeNotEarned(_)),
                ) => {
                    debug!("[{} {seed}] {action} rejected: {err}", policy.name());
                    rejected_actions += 1;
                    state = self.engine.get_state(&session)?;
                }
                Err(err) => return Err(err).with_context(|| format!("{action} failed")),
            }

            for violation in state.invariant_violations(self.engine.config().trap.coins_to_escape) {
                violations.push(format!("turn {turns}: {violation}"));
            }
            if !before.badges_earned.is_subset(&state.badges_earned) {
                violations.push(format!("turn {turns}: badges were revoked"));
            }

            if state.is_terminal() {
                ending = match (state.status, loss_cause) {
                    (RunStatus::Won, _) => RunEnding::Won,
                    (_, Some(LossCause::Stranded)) => RunEnding::Stranded,
                    _ => RunEnding::TrapTimeout,
                };
                break;
            }
        }

        self.engine.close_session(&session)?;
        Ok(RunRecord {
            strategy: strategy.label().to_string(),
            seed,
            ending,
            turns,
            flights: state.flights,
            fragments: state.count_fragments,
            fluxfire: state.fluxfire,
            credits: state.credits,
            range: state.range,
            rejected_actions,
            badges: state.badges_earned.into_iter().collect(),
            violations,
        })
    }

    fn apply(&self, session: &SessionId, action: &Action) -> Result<Applied, GameError> {
        match action {
            Action::Travel(code) => self
                .engine
                .travel(session, code)
                .map(|outcome| Applied::Travel(Box::new(outcome))),
            Action::BuyRange(credits) => self.engine.buy_range(session, *credits).map(Applied::State),
            Action::BuyCredits(flux) => self.engine.buy_credits(session, *flux).map(Applied::State),
            Action::ActivatePerk(badge) => self.engine.activate_perk(session, badge).map(Applied::State),
        }
    }

    /// Out of range with nothing left to convert.
    fn stalled(&self, state: &PlayerState) -> bool {
        let cfg = self.engine.config();
        let convertible = u64::from(state.credits) * u64::from(cfg.economy.range_per_credit)
            + u64::from(state.fluxfire)
                * u64::from(cfg.economy.credits_per_fluxfire)
                * u64::from(cfg.economy.range_per_credit);
        !state.is_trapped() && u64::from(state.range) + convertible < u64::from(cfg.travel.cost.min)
    }

    fn check_travel(
        &self,
        before: &PlayerState,
        outcome: &TravelOutcome,
        turn: u32,
        violations: &mut Vec<String>,
    ) {
        let cfg = self.engine.config();
        if let Some(cost) = outcome.cost
            && !cfg.travel.cost.contains(cost)
        {
            violations.push(format!("turn {turn}: flight cost {cost} outside the price window"));
        }
        for event in &outcome.events {
            match event {
                Event::FragmentFound { id } if before.fragments.contains(id) => {
                    violations.push(format!("turn {turn}: fragment {id} found twice"));
                }
                Event::TrapCoinCollected { coins } if *coins > cfg.trap.coins_to_escape => {
                    violations.push(format!("turn {turn}: {coins} trap coins exceed the escape target"));
                }
                Event::InsufficientRange { .. } if outcome.state != *before => {
                    violations.push(format!("turn {turn}: rejected flight still changed the run"));
                }
                _ => {}
            }
        }
    }
}

/// Per-strategy aggregates, in first-seen order.
#[must_use]
pub fn summarize(records: &[RunRecord]) -> Vec<StrategySummary> {
    let mut order: Vec<&str> = Vec::new();
    for record in records {
        if !order.contains(&record.strategy.as_str()) {
            order.push(&record.strategy);
        }
    }

    order
        .into_iter()
        .map(|strategy| {
            let runs: Vec<&RunRecord> = records.iter().filter(|r| r.strategy == strategy).collect();
            let count = runs.len();
            let wins = runs.iter().filter(|r| r.ending == RunEnding::Won).count();
            let mut losses_by_cause = BTreeMap::new();
            for run in runs.iter().filter(|r| r.ending.is_loss()) {
                *losses_by_cause.entry(run.ending.label().to_string()).or_insert(0) += 1;
            }
            #[allow(clippy::cast_precision_loss)]
            let mean = |total: u64| if count == 0 { 0.0 } else { total as f64 / count as f64 };
            StrategySummary {
                strategy: strategy.to_string(),
                runs: count,
                wins,
                losses_by_cause,
                stalled: runs.iter().filter(|r| r.ending == RunEnding::Stalled).count(),
                turn_limited: runs.iter().filter(|r| r.ending == RunEnding::TurnLimit).count(),
                win_rate: mean(wins as u64),
                mean_turns: mean(runs.iter().map(|r| u64::from(r.turns)).sum()),
                mean_flights: mean(runs.iter().map(|r| u64::from(r.flights)).sum()),
                badges_seen: runs.iter().flat_map(|r| r.badges.iter().cloned()).collect(),
                violations: runs.iter().map(|r| r.violations.len()).sum(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronoquest_game::{OutcomeCfg, OutcomeKind};

    #[test]
    fn every_strategy_finishes_cleanly() {
        let simulator = Simulator::new(EngineConfig::default(), 150).unwrap();
        let records = simulator
            .run_batch(&Strategy::ALL, &[1, 2, 3], 2)
            .unwrap();
        assert_eq!(records.len(), 18);
        for record in &records {
            assert!(record.passed(), "{record:?}");
            assert!(record.turns <= 150);
        }
    }

    #[test]
    fn runs_replay_for_the_same_seed() {
        let a = Simulator::new(EngineConfig::default(), 80).unwrap();
        let b = Simulator::new(EngineConfig::default(), 80).unwrap();
        for strategy in Strategy::ALL {
            let left = a.run(strategy, 99).unwrap();
            let right = b.run(strategy, 99).unwrap();
            assert_eq!(left.ending, right.ending);
            assert_eq!(left.turns, right.turns);
            assert_eq!(left.credits, right.credits);
            assert_eq!(left.badges, right.badges);
        }
    }

    #[test]
    fn generous_tuning_lets_cautious_win() {
        let mut config = EngineConfig::default();
        config.outcomes.weights = OutcomeCfg::only(OutcomeKind::FragmentFound);
        config.outcomes.weights.insert(OutcomeKind::FluxfireFound, 1.0);
        config.outcomes.draws = chronoquest_game::AmountRange::new(2, 2);
        config.outcomes.gains.fluxfire = chronoquest_game::AmountRange::new(20, 20);
        let simulator = Simulator::new(config, 50).unwrap();
        let record = simulator.run(Strategy::Cautious, 5).unwrap();
        assert_eq!(record.ending, RunEnding::Won);
        assert!(record.badges.contains(&BadgeId::new("FIRST_WIN")));
    }

    #[test]
    fn summaries_count_endings() {
        let record = |strategy: &str, ending| RunRecord {
            strategy: strategy.to_string(),
            seed: 1,
            ending,
            turns: 10,
            flights: 8,
            fragments: 5,
            fluxfire: 0,
            credits: 0,
            range: 0,
            rejected_actions: 0,
            badges: vec![BadgeId::new("FIRST_SHARD")],
            violations: Vec::new(),
        };
        let records = [
            record("greedy", RunEnding::Won),
            record("greedy", RunEnding::TrapTimeout),
            record("greedy", RunEnding::Stalled),
            record("random", RunEnding::TurnLimit),
        ];
        let summaries = summarize(&records);
        assert_eq!(summaries.len(), 2);
        let greedy = &summaries[0];
        assert_eq!(greedy.strategy, "greedy");
        assert_eq!(greedy.wins, 1);
        assert_eq!(greedy.losses_by_cause.get("trap timeout"), Some(&1));
        assert_eq!(greedy.stalled, 1);
        assert!((greedy.win_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(summaries[1].turn_limited, 1);
    }
}
