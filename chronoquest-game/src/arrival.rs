//! Home arrival evaluation.
use crate::events::Event;
use crate::state::{FuelRequirement, PlayerState};

/// What landing at home means for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrivalVerdict {
    Won {
        fuel_type: String,
        required_flux: u32,
    },
    RequirementsNotMet {
        required_flux: u32,
    },
}

impl ArrivalVerdict {
    #[must_use]
    pub const fn is_win(&self) -> bool {
        matches!(self, Self::Won { .. })
    }

    #[must_use]
    pub fn into_event(self) -> Event {
        match self {
            Self::Won {
                fuel_type,
                required_flux,
            } => Event::Win {
                fuel_type,
                required_flux,
            },
            Self::RequirementsNotMet { required_flux } => {
                Event::EfhkRequirementsNotMet { required_flux }
            }
        }
    }
}

/// Judge a home arrival: every fragment plus enough fluxfire for the fuel wins.
#[must_use]
pub fn evaluate_home_arrival(state: &PlayerState, requirement: &FuelRequirement) -> ArrivalVerdict {
    if state.has_all_fragments() && state.fluxfire >= requirement.required_flux {
        ArrivalVerdict::Won {
            fuel_type: requirement.fuel_type.clone(),
            required_flux: requirement.required_flux,
        }
    } else {
        ArrivalVerdict::RequirementsNotMet {
            required_flux: requirement.required_flux,
        }
    }
}
