//! Engine tuning configuration.
//!
//! Outcome weights, magnitudes, buff strength, and trap timing are data, not
//! code: the embedded `data/engine.json` mirrors [`EngineConfig::default`] and
//! alternative documents can be loaded with [`EngineConfig::from_json`].
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::fuel::FuelSpec;
use crate::state::PlayerState;

/// Category in the arrival outcome draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Nothing,
    FragmentFound,
    FluxfireFound,
    BanditStruck,
    CreditsGained,
    RangeGained,
    TrapTriggered,
}

impl OutcomeKind {
    pub const ALL: &'static [Self] = &[
        Self::Nothing,
        Self::FragmentFound,
        Self::FluxfireFound,
        Self::BanditStruck,
        Self::CreditsGained,
        Self::RangeGained,
        Self::TrapTriggered,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Nothing => "nothing",
            Self::FragmentFound => "fragment_found",
            Self::FluxfireFound => "fluxfire_found",
            Self::BanditStruck => "bandit_struck",
            Self::CreditsGained => "credits_gained",
            Self::RangeGained => "range_gained",
            Self::TrapTriggered => "trap_triggered",
        }
    }

    /// Outcomes a lucky window makes more likely.
    #[must_use]
    pub const fn is_boon(self) -> bool {
        matches!(
            self,
            Self::FragmentFound | Self::FluxfireFound | Self::CreditsGained | Self::RangeGained
        )
    }

    /// Outcomes a void window damps.
    #[must_use]
    pub const fn is_hazard(self) -> bool {
        matches!(self, Self::BanditStruck | Self::TrapTriggered)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Inclusive integer range used for every random magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: u32,
    pub max: u32,
}

impl AmountRange {
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn contains(&self, value: u32) -> bool {
        self.min <= value && value <= self.max
    }

    /// Uniform draw inside the range. Callers validate `min <= max` first.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> u32 {
        if self.min >= self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }

    fn validate(&self, field: &'static str) -> Result<(), EngineConfigError> {
        if self.min > self.max {
            return Err(EngineConfigError::InvertedRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Flight pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelCfg {
    #[serde(default = "TravelCfg::default_cost")]
    pub cost: AmountRange,
}

impl TravelCfg {
    const fn default_cost() -> AmountRange {
        AmountRange::new(20, 200)
    }
}

impl Default for TravelCfg {
    fn default() -> Self {
        Self {
            cost: Self::default_cost(),
        }
    }
}

/// Bandit theft magnitudes, before clamping to the victim's balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BanditCfg {
    pub credits: AmountRange,
    pub range: AmountRange,
}

impl Default for BanditCfg {
    fn default() -> Self {
        Self {
            credits: AmountRange::new(20, 100),
            range: AmountRange::new(10, 100),
        }
    }
}

/// Windfall magnitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainCfg {
    pub credits: AmountRange,
    pub range: AmountRange,
    pub fluxfire: AmountRange,
}

impl Default for GainCfg {
    fn default() -> Self {
        Self {
            credits: AmountRange::new(10, 100),
            range: AmountRange::new(10, 100),
            fluxfire: AmountRange::new(1, 1),
        }
    }
}

/// Weighted arrival draw. Categories missing from `weights` never fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeCfg {
    #[serde(default = "OutcomeCfg::default_weights")]
    pub weights: BTreeMap<OutcomeKind, f64>,
    /// Distinct categories drawn per arrival, sampled without replacement.
    #[serde(default = "OutcomeCfg::default_draws")]
    pub draws: AmountRange,
    #[serde(default)]
    pub bandit: BanditCfg,
    #[serde(default)]
    pub gains: GainCfg,
}

impl OutcomeCfg {
    fn default_weights() -> BTreeMap<OutcomeKind, f64> {
        OutcomeKind::ALL.iter().map(|kind| (*kind, 1.0)).collect()
    }

    const fn default_draws() -> AmountRange {
        AmountRange::new(1, 1)
    }

    #[must_use]
    pub fn weight(&self, kind: OutcomeKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    /// Replace the whole table with a single category; handy for forcing outcomes.
    #[must_use]
    pub fn only(kind: OutcomeKind) -> BTreeMap<OutcomeKind, f64> {
        BTreeMap::from([(kind, 1.0)])
    }

    fn validate(&self) -> Result<(), EngineConfigError> {
        for (kind, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(EngineConfigError::InvalidWeight {
                    kind: *kind,
                    value: *weight,
                });
            }
        }
        if self.weights.values().all(|weight| *weight <= 0.0) {
            return Err(EngineConfigError::NoOutcomes);
        }
        self.draws.validate("outcomes.draws")?;
        let kinds = u32::try_from(OutcomeKind::ALL.len()).unwrap_or(u32::MAX);
        if self.draws.min == 0 || self.draws.max > kinds {
            return Err(EngineConfigError::DrawCount {
                min: self.draws.min,
                max: self.draws.max,
                kinds,
            });
        }
        self.bandit.credits.validate("outcomes.bandit.credits")?;
        self.bandit.range.validate("outcomes.bandit.range")?;
        self.gains.credits.validate("outcomes.gains.credits")?;
        self.gains.range.validate("outcomes.gains.range")?;
        self.gains.fluxfire.validate("outcomes.gains.fluxfire")?;
        Ok(())
    }
}

impl Default for OutcomeCfg {
    fn default() -> Self {
        Self {
            weights: Self::default_weights(),
            draws: Self::default_draws(),
            bandit: BanditCfg::default(),
            gains: GainCfg::default(),
        }
    }
}

/// Strength of the perk buffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffCfg {
    /// Multiplier on boon weights while a lucky window is open.
    pub lucky_multiplier: f64,
    /// Multiplier on hazard weights while a void window is open.
    pub void_multiplier: f64,
    /// Multiplier on the flight cost while jetstream uses remain.
    pub jetstream_cost_factor: f64,
}

impl BuffCfg {
    fn validate(&self) -> Result<(), EngineConfigError> {
        for (field, value) in [
            ("buffs.lucky_multiplier", self.lucky_multiplier),
            ("buffs.void_multiplier", self.void_multiplier),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: f64::MAX,
                    value,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.jetstream_cost_factor) {
            return Err(EngineConfigError::RangeViolation {
                field: "buffs.jetstream_cost_factor",
                min: 0.0,
                max: 1.0,
                value: self.jetstream_cost_factor,
            });
        }
        Ok(())
    }
}

impl Default for BuffCfg {
    fn default() -> Self {
        Self {
            lucky_multiplier: 2.0,
            void_multiplier: 0.0,
            jetstream_cost_factor: 0.5,
        }
    }
}

/// Paradox trap timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapCfg {
    pub coins_to_escape: u8,
    pub timeout_ms: i64,
    /// Chance that a trapped travel attempt yields a coin.
    pub coin_chance: f64,
}

impl TrapCfg {
    fn validate(&self) -> Result<(), EngineConfigError> {
        if self.coins_to_escape == 0 {
            return Err(EngineConfigError::MinViolation {
                field: "trap.coins_to_escape",
                min: 1,
                value: 0,
            });
        }
        if self.timeout_ms <= 0 {
            return Err(EngineConfigError::MinViolation {
                field: "trap.timeout_ms",
                min: 1,
                value: self.timeout_ms,
            });
        }
        if !(self.coin_chance > 0.0 && self.coin_chance <= 1.0) {
            return Err(EngineConfigError::RangeViolation {
                field: "trap.coin_chance",
                min: 0.0,
                max: 1.0,
                value: self.coin_chance,
            });
        }
        Ok(())
    }
}

impl Default for TrapCfg {
    fn default() -> Self {
        Self {
            coins_to_escape: 3,
            timeout_ms: 120_000,
            coin_chance: 1.0,
        }
    }
}

/// Exchange rates for the economy endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyCfg {
    pub credits_per_fluxfire: u32,
    pub range_per_credit: u32,
}

impl EconomyCfg {
    fn validate(&self) -> Result<(), EngineConfigError> {
        for (field, value) in [
            ("economy.credits_per_fluxfire", self.credits_per_fluxfire),
            ("economy.range_per_credit", self.range_per_credit),
        ] {
            if value == 0 {
                return Err(EngineConfigError::MinViolation {
                    field,
                    min: 1,
                    value: 0,
                });
            }
        }
        Ok(())
    }
}

impl Default for EconomyCfg {
    fn default() -> Self {
        Self {
            credits_per_fluxfire: 10,
            range_per_credit: 1,
        }
    }
}

/// Optional loss rule for a player who can no longer afford to fly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrandedRule {
    /// With zero range, at most this many credits counts as stranded.
    pub credits_ceiling: u32,
    /// With zero credits, range inside this window counts as stranded.
    pub range_window: AmountRange,
}

impl StrandedRule {
    #[must_use]
    pub const fn applies(&self, state: &PlayerState) -> bool {
        (state.credits <= self.credits_ceiling && state.range == 0)
            || (state.credits == 0 && self.range_window.contains(state.range))
    }
}

impl Default for StrandedRule {
    fn default() -> Self {
        Self {
            credits_ceiling: 20,
            range_window: AmountRange::new(10, 20),
        }
    }
}

/// Loss conditions beyond the trap timeout. Empty by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stranded: Option<StrandedRule>,
}

/// Complete tuning surface of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub travel: TravelCfg,
    #[serde(default)]
    pub outcomes: OutcomeCfg,
    #[serde(default)]
    pub buffs: BuffCfg,
    #[serde(default)]
    pub trap: TrapCfg,
    #[serde(default = "FuelSpec::default_catalog")]
    pub fuels: Vec<FuelSpec>,
    #[serde(default)]
    pub economy: EconomyCfg,
    #[serde(default)]
    pub loss: LossRules,
}

impl EngineConfig {
    /// The configuration bundled with the engine.
    ///
    /// # Panics
    ///
    /// Panics if the embedded document is malformed, which is a build defect.
    #[must_use]
    pub fn embedded() -> &'static Self {
        static CONFIG: OnceLock<EngineConfig> = OnceLock::new();
        CONFIG.get_or_init(|| {
            Self::from_json(include_str!("../data/engine.json"))
                .expect("valid embedded engine config")
        })
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError`] when the JSON is malformed or violates an invariant.
    pub fn from_json(json: &str) -> Result<Self, ConfigLoadError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `EngineConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        self.travel.cost.validate("travel.cost")?;
        self.outcomes.validate()?;
        self.buffs.validate()?;
        self.trap.validate()?;
        self.economy.validate()?;
        if self.fuels.is_empty() {
            return Err(EngineConfigError::NoFuels);
        }
        for fuel in &self.fuels {
            fuel.flux.validate("fuels.flux")?;
        }
        if let Some(stranded) = &self.loss.stranded {
            stranded.range_window.validate("loss.stranded.range_window")?;
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            travel: TravelCfg::default(),
            outcomes: OutcomeCfg::default(),
            buffs: BuffCfg::default(),
            trap: TrapCfg::default(),
            fuels: FuelSpec::default_catalog(),
            economy: EconomyCfg::default(),
            loss: LossRules::default(),
        }
    }
}

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum EngineConfigError {
    #[error("{field} minimum {min} exceeds maximum {max}")]
    InvertedRange {
        field: &'static str,
        min: u32,
        max: u32,
    },
    #[error("weight for {kind} must be finite and non-negative (got {value})")]
    InvalidWeight { kind: OutcomeKind, value: f64 },
    #[error("at least one outcome must carry a positive weight")]
    NoOutcomes,
    #[error("outcome draws {min}..={max} must lie within 1..={kinds}")]
    DrawCount { min: u32, max: u32, kinds: u32 },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: i64,
        value: i64,
    },
    #[error("fuel catalog must not be empty")]
    NoFuels,
}

/// Failure to load a configuration document.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("engine config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("engine config rejected: {0}")]
    Invalid(#[from] EngineConfigError),
}
