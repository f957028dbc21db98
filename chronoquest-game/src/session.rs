//! Authenticated session handles.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rng::RngBundle;
use crate::state::PlayerState;

/// Opaque token naming one open session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub(crate) fn generate() -> Self {
        Self(format!("{:016x}", rand::random::<u64>()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A player's live run plus the RNG streams driving it.
///
/// Guarded by its own mutex inside the engine so requests for one session
/// apply one at a time.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub(crate) account: String,
    pub(crate) state: PlayerState,
    pub(crate) rng: RngBundle,
}

impl GameSession {
    pub(crate) const fn new(account: String, state: PlayerState, rng: RngBundle) -> Self {
        Self {
            account,
            state,
            rng,
        }
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    #[must_use]
    pub const fn state(&self) -> &PlayerState {
        &self.state
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_hex_tokens() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, SessionId::generate());
    }

    #[test]
    fn session_exposes_its_run() {
        let session = GameSession::new(
            "ada".to_string(),
            PlayerState::new("ada"),
            RngBundle::from_user_seed(9),
        );
        assert_eq!(session.account(), "ada");
        assert_eq!(session.seed(), 9);
        assert_eq!(session.state().credits, 1_000);
    }
}
