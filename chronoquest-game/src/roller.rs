//! Arrival outcome draw.
//!
//! Each arrival draws one or more outcome categories by weight, without
//! replacement. Categories that cannot apply to the current state are left
//! out of the table before the draw, so the remaining weights renormalize on
//! their own: a complete fragment set never rolls another fragment and an
//! active trap never rolls another trap.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, OutcomeKind};
use crate::events::{Event, EventLog};
use crate::ledger::Resource;
use crate::state::{PlayerState, Timestamp};
use crate::trap;

/// A multiplier applied on top of a category's base weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightFactor {
    pub label: String,
    pub value: f64,
}

/// One row of the weighted table as it looked when the draw was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCandidate {
    pub kind: OutcomeKind,
    pub base_weight: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multipliers: Vec<WeightFactor>,
    pub final_weight: f64,
}

/// Record of a single draw, kept for debugging and the tester reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeTrace {
    pub candidates: Vec<WeightedCandidate>,
    pub roll: f64,
    pub chosen: OutcomeKind,
}

/// Everything one arrival produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollResult {
    pub events: EventLog,
    pub traces: Vec<OutcomeTrace>,
}

/// Pick an index from `candidates` proportionally to `final_weight`.
///
/// Returns `None` when the table is empty or carries no positive weight.
pub fn choose_weighted<R: Rng>(
    candidates: &[WeightedCandidate],
    rng: &mut R,
) -> Option<(usize, f64)> {
    let total: f64 = candidates.iter().map(|c| c.final_weight).sum();
    if candidates.is_empty() || total.is_nan() || total <= 0.0 {
        return None;
    }
    let roll = rng.r#gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (idx, candidate) in candidates.iter().enumerate() {
        cumulative += candidate.final_weight;
        if roll < cumulative {
            return Some((idx, roll));
        }
    }
    // Floating point drift can leave the roll just past the last bucket.
    candidates
        .iter()
        .rposition(|c| c.final_weight > 0.0)
        .map(|idx| (idx, roll))
}

#[derive(Debug, Clone, Copy)]
pub struct EventRoller<'a> {
    cfg: &'a EngineConfig,
}

impl<'a> EventRoller<'a> {
    #[must_use]
    pub const fn new(cfg: &'a EngineConfig) -> Self {
        Self { cfg }
    }

    /// The weighted table for `state` at `now`, with inapplicable and
    /// zero-weight categories removed.
    #[must_use]
    pub fn candidates(&self, state: &PlayerState, now: Timestamp) -> Vec<WeightedCandidate> {
        let lucky = state.buffs.lucky_active(now);
        let void = state.buffs.void_active(now);
        OutcomeKind::ALL
            .iter()
            .copied()
            .filter(|kind| Self::applicable(*kind, state))
            .filter_map(|kind| {
                let base_weight = self.cfg.outcomes.weight(kind);
                let mut multipliers = Vec::new();
                if lucky && kind.is_boon() {
                    multipliers.push(WeightFactor {
                        label: "lucky".to_string(),
                        value: self.cfg.buffs.lucky_multiplier,
                    });
                }
                if void && kind.is_hazard() {
                    multipliers.push(WeightFactor {
                        label: "void".to_string(),
                        value: self.cfg.buffs.void_multiplier,
                    });
                }
                let final_weight = multipliers
                    .iter()
                    .fold(base_weight, |weight, factor| weight * factor.value);
                (final_weight > 0.0).then_some(WeightedCandidate {
                    kind,
                    base_weight,
                    multipliers,
                    final_weight,
                })
            })
            .collect()
    }

    const fn applicable(kind: OutcomeKind, state: &PlayerState) -> bool {
        match kind {
            OutcomeKind::FragmentFound => {
                state.count_fragments < crate::constants::FRAGMENT_COUNT
            }
            OutcomeKind::TrapTriggered => !state.trap.active,
            _ => true,
        }
    }

    /// Draw and apply the arrival outcomes to `state`.
    ///
    /// Always yields at least one event; `Nothing` when no category could
    /// be drawn.
    pub fn roll<R: Rng>(&self, state: &mut PlayerState, now: Timestamp, rng: &mut R) -> RollResult {
        let draws = self.cfg.outcomes.draws.sample(rng);
        let mut drawn: Vec<OutcomeKind> = Vec::new();
        let mut result = RollResult::default();

        for _ in 0..draws {
            let candidates: Vec<WeightedCandidate> = self
                .candidates(state, now)
                .into_iter()
                .filter(|candidate| !drawn.contains(&candidate.kind))
                .collect();
            let Some((idx, roll)) = choose_weighted(&candidates, rng) else {
                break;
            };
            let chosen = candidates[idx].kind;
            drawn.push(chosen);
            result.events.push(self.apply(chosen, state, now, rng));
            result.traces.push(OutcomeTrace {
                candidates,
                roll,
                chosen,
            });
        }

        if result.events.is_empty() {
            result.events.push(Event::Nothing);
        }
        result
    }

    fn apply<R: Rng>(
        &self,
        kind: OutcomeKind,
        state: &mut PlayerState,
        now: Timestamp,
        rng: &mut R,
    ) -> Event {
        let outcomes = &self.cfg.outcomes;
        match kind {
            OutcomeKind::Nothing => Event::Nothing,
            OutcomeKind::FragmentFound => match state.next_missing_fragment() {
                Some(id) if state.add_fragment(id).is_ok() => Event::FragmentFound { id },
                _ => Event::Nothing,
            },
            OutcomeKind::FluxfireFound => {
                let amount = outcomes.gains.fluxfire.sample(rng);
                state.add_fluxfire(amount);
                Event::FluxfireFound { amount }
            }
            OutcomeKind::BanditStruck => {
                let (resource, magnitude) = if rng.gen_bool(0.5) {
                    (Resource::Credits, outcomes.bandit.credits.sample(rng))
                } else {
                    (Resource::Range, outcomes.bandit.range.sample(rng))
                };
                let amount = state.take_up_to(resource, magnitude);
                Event::BanditStruck { resource, amount }
            }
            OutcomeKind::CreditsGained => {
                let amount = outcomes.gains.credits.sample(rng);
                state.add_credits(amount);
                Event::CreditsGained { amount }
            }
            OutcomeKind::RangeGained => {
                let amount = outcomes.gains.range.sample(rng);
                state.add_range(amount);
                Event::RangeGained { amount }
            }
            OutcomeKind::TrapTriggered => trap::trigger(&mut state.trap, now),
        }
    }
}
