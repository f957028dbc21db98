//! Fuel catalog: each run draws the fuel the player must brew to win.
use crate::config::AmountRange;
use crate::state::FuelRequirement;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One brewable fuel and the fluxfire window its requirement is drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelSpec {
    pub fuel_type: String,
    pub flux: AmountRange,
}

impl FuelSpec {
    #[must_use]
    pub fn new(fuel_type: &str, min: u32, max: u32) -> Self {
        Self {
            fuel_type: fuel_type.to_string(),
            flux: AmountRange::new(min, max),
        }
    }

    #[must_use]
    pub fn default_catalog() -> Vec<Self> {
        vec![
            Self::new("Aetherite", 8, 12),
            Self::new("Lumorin", 14, 18),
            Self::new("Voltash", 5, 8),
            Self::new("Noxalite", 11, 15),
            Self::new("Inferno", 1, 5),
        ]
    }
}

/// Pick a fuel uniformly, then its required fluxfire uniformly inside its window.
///
/// Returns `None` only for an empty catalog, which validated configs never have.
pub fn draw_requirement<R: Rng>(fuels: &[FuelSpec], rng: &mut R) -> Option<FuelRequirement> {
    if fuels.is_empty() {
        return None;
    }
    let spec = &fuels[rng.gen_range(0..fuels.len())];
    Some(FuelRequirement {
        fuel_type: spec.fuel_type.clone(),
        required_flux: spec.flux.sample(rng),
    })
}
