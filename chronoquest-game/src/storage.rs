//! Account profiles and the in-memory store.
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::ProfileStorage;
use crate::badges::BadgeId;
use crate::state::{PlayerState, RunStatus};

/// Per-account record that outlives individual runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub account: String,
    #[serde(default)]
    pub badges: BTreeSet<BadgeId>,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub times_played: u32,
}

impl AccountProfile {
    #[must_use]
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            badges: BTreeSet::new(),
            wins: 0,
            losses: 0,
            times_played: 0,
        }
    }

    /// Count a finished run.
    pub const fn record(&mut self, status: RunStatus) {
        match status {
            RunStatus::Won => self.wins = self.wins.saturating_add(1),
            RunStatus::Lost => self.losses = self.losses.saturating_add(1),
            RunStatus::Active => return,
        }
        self.times_played = self.times_played.saturating_add(1);
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MemoryStorageError {
    #[error("storage is read-only")]
    ReadOnly,
}

/// Process-local storage; also the fixture for engine tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    profiles: Mutex<HashMap<String, AccountProfile>>,
    runs: Mutex<HashMap<String, PlayerState>>,
    read_only: AtomicBool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail until switched back.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), MemoryStorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            Err(MemoryStorageError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl ProfileStorage for MemoryStorage {
    type Error = MemoryStorageError;

    fn load_profile(&self, account: &str) -> Result<Option<AccountProfile>, Self::Error> {
        Ok(self.profiles.lock().get(account).cloned())
    }

    fn save_profile(&self, profile: &AccountProfile) -> Result<(), Self::Error> {
        self.check_writable()?;
        self.profiles
            .lock()
            .insert(profile.account.clone(), profile.clone());
        Ok(())
    }

    fn load_run(&self, account: &str) -> Result<Option<PlayerState>, Self::Error> {
        Ok(self.runs.lock().get(account).cloned())
    }

    fn save_run(&self, account: &str, state: &PlayerState) -> Result<(), Self::Error> {
        self.check_writable()?;
        self.runs.lock().insert(account.to_string(), state.clone());
        Ok(())
    }

    fn delete_run(&self, account: &str) -> Result<(), Self::Error> {
        self.check_writable()?;
        self.runs.lock().remove(account);
        Ok(())
    }
}
