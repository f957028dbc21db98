//! One travel step, start to finish.
//!
//! The orchestrator never mutates the caller's state. It works on a copy and
//! hands back the finished [`TravelOutcome`]; the session layer commits it
//! only once persistence succeeds.
use log::{debug, info};

use crate::airport::AirportCode;
use crate::arrival::evaluate_home_arrival;
use crate::badges::{BadgeCatalog, BadgeEvaluator, BadgeId};
use crate::config::EngineConfig;
use crate::constants::INSUFFICIENT_RANGE_MESSAGE;
use crate::error::GameError;
use crate::events::{Event, EventLog, LossCause};
use crate::fuel::draw_requirement;
use crate::numbers::scale_u32;
use crate::rng::RngBundle;
use crate::roller::{EventRoller, OutcomeTrace};
use crate::state::{PlayerState, RunStatus, Timestamp};
use crate::trap::TrapMachine;

/// Result of a travel request.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelOutcome {
    pub state: PlayerState,
    pub events: EventLog,
    /// Badges first earned by this step.
    pub new_badges: Vec<BadgeId>,
    /// Range actually paid for the flight, if one was taken.
    pub cost: Option<u32>,
    pub traces: Vec<OutcomeTrace>,
}

impl TravelOutcome {
    #[must_use]
    pub fn won(&self) -> bool {
        self.events.iter().any(|e| matches!(e, Event::Win { .. }))
    }

    #[must_use]
    pub fn lost(&self) -> bool {
        self.events.iter().any(|e| matches!(e, Event::Lose { .. }))
    }

    #[must_use]
    pub fn flew(&self) -> bool {
        self.cost.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TravelOrchestrator<'a> {
    cfg: &'a EngineConfig,
    badges: &'a BadgeCatalog,
}

impl<'a> TravelOrchestrator<'a> {
    #[must_use]
    pub const fn new(cfg: &'a EngineConfig, badges: &'a BadgeCatalog) -> Self {
        Self { cfg, badges }
    }

    /// Lose the run if the player has sat in a trap past the timeout.
    ///
    /// Returns `None` when nothing changes.
    #[must_use]
    pub fn expire_trap(&self, before: &PlayerState, now: Timestamp) -> Option<TravelOutcome> {
        if before.is_terminal() || !TrapMachine::new(&self.cfg.trap).timed_out(&before.trap, now) {
            return None;
        }
        let mut state = before.clone();
        state.trap.clear();
        state.status = RunStatus::Lost;
        let mut events = EventLog::new();
        events.push(Event::Lose {
            cause: LossCause::TrapTimeout,
        });
        info!("{} lost the run to a paradox trap timeout", state.player_name);
        Some(self.finish(before, state, events, None, Vec::new()))
    }

    /// Attempt to fly to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RunFinished`] if the run is already won or lost.
    /// Every other rejection, such as too little range, is reported as an
    /// event with the state left as it was.
    pub fn travel(
        &self,
        before: &PlayerState,
        destination: &AirportCode,
        now: Timestamp,
        rng: &mut RngBundle,
    ) -> Result<TravelOutcome, GameError> {
        if before.is_terminal() {
            return Err(GameError::RunFinished {
                status: before.status,
            });
        }
        if let Some(outcome) = self.expire_trap(before, now) {
            return Ok(outcome);
        }

        let mut state = before.clone();
        let mut events = EventLog::new();

        if state.is_trapped() {
            let attempt = TrapMachine::new(&self.cfg.trap).attempt(&mut state.trap, rng.trap());
            events.extend(attempt.events);
            if !attempt.escaped {
                return Ok(self.finish(before, state, events, None, Vec::new()));
            }
            debug!("{} escaped the paradox trap", state.player_name);
        }

        if state.current_location == *destination {
            return Ok(self.finish(before, state, events, None, Vec::new()));
        }

        let window = &self.cfg.travel.cost;
        let base_cost = window.sample(rng.travel());
        let jetstream = state.buffs.jetstream_remaining > 0;
        // The discount never takes a fare outside the configured window.
        let cost = if jetstream {
            scale_u32(base_cost, self.cfg.buffs.jetstream_cost_factor).clamp(window.min, window.max)
        } else {
            base_cost
        };
        if state.spend_range(cost).is_err() {
            debug!(
                "{} cannot afford {cost} range to {destination} (has {})",
                state.player_name, state.range
            );
            events.push(Event::InsufficientRange {
                message: INSUFFICIENT_RANGE_MESSAGE.to_string(),
            });
            return Ok(self.finish(before, state, events, None, Vec::new()));
        }
        if jetstream {
            state.buffs.jetstream_remaining -= 1;
        }
        if state.fuel_requirement.is_none() {
            state.fuel_requirement = draw_requirement(&self.cfg.fuels, rng.setup());
        }
        state.current_location = destination.clone();
        state.flights = state.flights.saturating_add(1);
        debug!(
            "{} flew to {destination} for {cost} range",
            state.player_name
        );

        let roll = EventRoller::new(self.cfg).roll(&mut state, now, rng.outcome());
        events.extend(roll.events);

        if destination.is_home()
            && !state.is_trapped()
            && let Some(requirement) = state.fuel_requirement.clone()
        {
            let verdict = evaluate_home_arrival(&state, &requirement);
            if verdict.is_win() {
                state.status = RunStatus::Won;
                info!(
                    "{} won with {} after {} flights",
                    state.player_name, requirement.fuel_type, state.flights
                );
            }
            events.push(verdict.into_event());
        }

        if !state.is_terminal()
            && self
                .cfg
                .loss
                .stranded
                .as_ref()
                .is_some_and(|rule| rule.applies(&state))
        {
            state.status = RunStatus::Lost;
            events.push(Event::Lose {
                cause: LossCause::Stranded,
            });
            info!("{} is stranded and lost the run", state.player_name);
        }

        Ok(self.finish(before, state, events, Some(cost), roll.traces))
    }

    fn finish(
        &self,
        before: &PlayerState,
        mut state: PlayerState,
        events: EventLog,
        cost: Option<u32>,
        traces: Vec<OutcomeTrace>,
    ) -> TravelOutcome {
        let new_badges = BadgeEvaluator::new(self.badges).evaluate(before, &state, &events);
        for badge in &new_badges {
            info!("{} earned badge {badge}", state.player_name);
        }
        state.badges_earned.extend(new_badges.iter().cloned());
        TravelOutcome {
            state,
            events,
            new_badges,
            cost,
            traces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AmountRange, OutcomeCfg, OutcomeKind, StrandedRule};
    use crate::state::FuelRequirement;

    fn forced(kind: OutcomeKind) -> EngineConfig {
        let mut cfg = EngineConfig::default();
        cfg.outcomes.weights = OutcomeCfg::only(kind);
        cfg
    }

    fn state() -> PlayerState {
        PlayerState::new("ada").with_fuel_requirement(FuelRequirement {
            fuel_type: "Voltash".to_string(),
            required_flux: 5,
        })
    }

    #[test]
    fn flight_deducts_range_and_moves() {
        let cfg = forced(OutcomeKind::Nothing);
        let badges = BadgeCatalog::default();
        let mut rng = RngBundle::from_user_seed(1);
        let before = state();
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::new("EGLL"), 0, &mut rng)
            .unwrap();
        let cost = outcome.cost.unwrap();
        assert!((20..=200).contains(&cost));
        assert_eq!(outcome.state.range, 1_000 - cost);
        assert_eq!(outcome.state.current_location.as_str(), "EGLL");
        assert_eq!(outcome.state.flights, 1);
        assert_eq!(outcome.events.as_slice(), &[Event::Nothing]);
        assert_eq!(before.range, 1_000);
    }

    #[test]
    fn short_range_reports_and_stays() {
        let cfg = forced(OutcomeKind::Nothing);
        let badges = BadgeCatalog::default();
        let mut rng = RngBundle::from_user_seed(2);
        let mut before = state();
        before.range = 10;
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::new("EGLL"), 0, &mut rng)
            .unwrap();
        assert_eq!(outcome.state, before);
        assert_eq!(
            outcome.events.as_slice(),
            &[Event::InsufficientRange {
                message: INSUFFICIENT_RANGE_MESSAGE.to_string()
            }]
        );
        assert!(!outcome.flew());
    }

    #[test]
    fn same_airport_is_a_no_op() {
        let cfg = EngineConfig::default();
        let badges = BadgeCatalog::default();
        let mut rng = RngBundle::from_user_seed(3);
        let before = state();
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::home(), 0, &mut rng)
            .unwrap();
        assert_eq!(outcome.state, before);
        assert!(outcome.events.is_empty());
        assert_eq!(rng.total_draws(), 0);
    }

    #[test]
    fn jetstream_discounts_within_the_fare_window() {
        let cfg = forced(OutcomeKind::Nothing);
        let badges = BadgeCatalog::default();
        let window = cfg.travel.cost;
        let mut discounted = 0;
        for seed in 0..200 {
            let mut rng = RngBundle::from_user_seed(seed);
            let base = window.sample(rng.clone().travel());
            let mut before = state();
            before.buffs.jetstream_remaining = 2;
            let outcome = TravelOrchestrator::new(&cfg, &badges)
                .travel(&before, &AirportCode::new("ESSA"), 0, &mut rng)
                .unwrap();
            let cost = outcome.cost.unwrap();
            assert!(window.contains(cost), "seed {seed} paid {cost}");
            assert_eq!(cost, scale_u32(base, 0.5).clamp(window.min, window.max));
            assert_eq!(outcome.state.range, 1_000 - cost);
            assert_eq!(outcome.state.buffs.jetstream_remaining, 1);
            if cost < base {
                discounted += 1;
            }
        }
        assert!(discounted > 0);
    }

    #[test]
    fn terminal_runs_are_rejected() {
        let cfg = EngineConfig::default();
        let badges = BadgeCatalog::default();
        let mut rng = RngBundle::from_user_seed(5);
        let mut before = state();
        before.status = RunStatus::Lost;
        let err = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::new("EGLL"), 0, &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            GameError::RunFinished {
                status: RunStatus::Lost
            }
        );
    }

    #[test]
    fn timed_out_trap_loses_before_anything_else() {
        let cfg = EngineConfig::default();
        let badges = BadgeCatalog::load_default();
        let mut rng = RngBundle::from_user_seed(6);
        let mut before = state();
        before.trap.active = true;
        before.trap.coins_collected = 1;
        before.trap.started_at = Some(0);
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::new("EGLL"), 121_000, &mut rng)
            .unwrap();
        assert_eq!(
            outcome.events.as_slice(),
            &[Event::Lose {
                cause: LossCause::TrapTimeout
            }]
        );
        assert_eq!(outcome.state.status, RunStatus::Lost);
        assert!(!outcome.state.trap.active);
        assert_eq!(outcome.new_badges, vec![BadgeId::new("FIRST_LOSS")]);
        assert!(outcome.lost());
    }

    #[test]
    fn trapped_travel_collects_coins_without_moving() {
        let cfg = forced(OutcomeKind::Nothing);
        let badges = BadgeCatalog::default();
        let mut rng = RngBundle::from_user_seed(7);
        let mut before = state();
        before.trap.active = true;
        before.trap.started_at = Some(0);
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::new("EGLL"), 1_000, &mut rng)
            .unwrap();
        assert_eq!(
            outcome.events.as_slice(),
            &[Event::TrapCoinCollected { coins: 1 }]
        );
        assert_eq!(outcome.state.range, 1_000);
        assert!(outcome.state.current_location.is_home());
    }

    #[test]
    fn escaping_continues_the_flight() {
        let cfg = forced(OutcomeKind::Nothing);
        let badges = BadgeCatalog::default();
        let mut rng = RngBundle::from_user_seed(8);
        let mut before = state();
        before.trap.active = true;
        before.trap.coins_collected = 2;
        before.trap.started_at = Some(0);
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::new("EGLL"), 1_000, &mut rng)
            .unwrap();
        assert_eq!(
            outcome.events.as_slice(),
            &[
                Event::TrapCoinCollected { coins: 3 },
                Event::TrapEscaped,
                Event::Nothing
            ]
        );
        assert_eq!(outcome.state.current_location.as_str(), "EGLL");
        assert!(!outcome.state.trap.active);
    }

    #[test]
    fn home_with_everything_wins() {
        let cfg = forced(OutcomeKind::Nothing);
        let badges = BadgeCatalog::load_default();
        let mut rng = RngBundle::from_user_seed(9);
        let mut before = state().with_badges([BadgeId::new("FULL_SHARDS"), BadgeId::new("FIRST_SHARD")]);
        for id in 1..=5 {
            before.add_fragment(id).unwrap();
        }
        before.fluxfire = 5;
        before.current_location = AirportCode::new("EETN");
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::home(), 0, &mut rng)
            .unwrap();
        assert_eq!(
            outcome.events.last(),
            Some(&Event::Win {
                fuel_type: "Voltash".to_string(),
                required_flux: 5
            })
        );
        assert_eq!(outcome.state.status, RunStatus::Won);
        assert_eq!(outcome.new_badges, vec![BadgeId::new("FIRST_WIN")]);
    }

    #[test]
    fn home_without_fragments_is_not_enough() {
        let cfg = forced(OutcomeKind::Nothing);
        let badges = BadgeCatalog::default();
        let mut rng = RngBundle::from_user_seed(10);
        let mut before = state();
        for id in 1..=3 {
            before.add_fragment(id).unwrap();
        }
        before.fluxfire = 50;
        before.current_location = AirportCode::new("EETN");
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::home(), 0, &mut rng)
            .unwrap();
        assert_eq!(
            outcome.events.last(),
            Some(&Event::EfhkRequirementsNotMet { required_flux: 5 })
        );
        assert_eq!(outcome.state.status, RunStatus::Active);
    }

    #[test]
    fn stranded_rule_is_opt_in() {
        let mut cfg = forced(OutcomeKind::Nothing);
        cfg.travel.cost = AmountRange::new(20, 20);
        let badges = BadgeCatalog::default();
        let mut before = state();
        before.range = 20;
        before.credits = 5;

        let mut rng = RngBundle::from_user_seed(11);
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::new("EGLL"), 0, &mut rng)
            .unwrap();
        assert_eq!(outcome.state.status, RunStatus::Active);

        cfg.loss.stranded = Some(StrandedRule::default());
        let mut rng = RngBundle::from_user_seed(11);
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::new("EGLL"), 0, &mut rng)
            .unwrap();
        assert_eq!(outcome.state.status, RunStatus::Lost);
        assert_eq!(
            outcome.events.last(),
            Some(&Event::Lose {
                cause: LossCause::Stranded
            })
        );
    }

    #[test]
    fn unaffordable_flight_leaves_missing_fuel_alone() {
        let cfg = forced(OutcomeKind::Nothing);
        let badges = BadgeCatalog::default();
        let mut rng = RngBundle::from_user_seed(13);
        let mut before = PlayerState::new("ada");
        before.range = 10;
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::new("EGLL"), 0, &mut rng)
            .unwrap();
        assert_eq!(outcome.state, before);
        assert!(outcome.state.fuel_requirement.is_none());
        assert!(matches!(
            outcome.events.as_slice(),
            [Event::InsufficientRange { .. }]
        ));
    }

    #[test]
    fn missing_fuel_is_drawn_on_first_flight() {
        let cfg = forced(OutcomeKind::Nothing);
        let badges = BadgeCatalog::default();
        let mut rng = RngBundle::from_user_seed(12);
        let before = PlayerState::new("ada");
        let outcome = TravelOrchestrator::new(&cfg, &badges)
            .travel(&before, &AirportCode::new("EGLL"), 0, &mut rng)
            .unwrap();
        assert!(outcome.state.fuel_requirement.is_some());
    }
}
