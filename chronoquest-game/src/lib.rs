//! ChronoQuest Game Engine
//!
//! Platform-agnostic core of the ChronoQuest airport-hopping game: ledger,
//! weighted arrival outcomes, paradox traps, home-arrival win checks, and
//! badges. No HTTP, UI, or database code lives here; adapters plug in
//! through [`AirportCatalog`] and [`ProfileStorage`].

pub mod airport;
pub mod api;
pub mod arrival;
pub mod badges;
pub mod clock;
pub mod config;
pub mod constants;
pub mod economy;
pub mod error;
pub mod events;
pub mod fuel;
pub mod ledger;
pub mod numbers;
pub mod rng;
pub mod roller;
pub mod session;
pub mod state;
pub mod storage;
pub mod trap;
pub mod travel;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

// Re-export commonly used types
pub use airport::{Airport, AirportCatalog, AirportCode, AirportListing, StaticAirports};
pub use arrival::{ArrivalVerdict, evaluate_home_arrival};
pub use badges::{Badge, BadgeCatalog, BadgeEvaluator, BadgeId, BadgeRule, BadgeView, Perk};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AmountRange, ConfigLoadError, EngineConfig, EngineConfigError, OutcomeCfg, OutcomeKind,
    StrandedRule,
};
pub use constants::{FRAGMENT_COUNT, HOME_AIRPORT};
pub use economy::Economy;
pub use error::GameError;
pub use events::{Event, EventLog, EventTag, LossCause};
pub use fuel::{FuelSpec, draw_requirement};
pub use ledger::{LedgerError, Resource};
pub use rng::RngBundle;
pub use roller::{EventRoller, OutcomeTrace, WeightedCandidate};
pub use session::{GameSession, SessionId};
pub use state::{BuffWindows, FragmentId, FuelRequirement, PlayerState, RunStatus, TrapState};
pub use storage::{AccountProfile, MemoryStorage, MemoryStorageError};
pub use trap::{TrapMachine, TrapPhase};
pub use travel::{TravelOrchestrator, TravelOutcome};

/// Trait for abstracting profile and run persistence
/// Platform-specific implementations should provide this
pub trait ProfileStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load an account profile
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be read.
    fn load_profile(&self, account: &str) -> Result<Option<AccountProfile>, Self::Error>;

    /// Save an account profile
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be written.
    fn save_profile(&self, profile: &AccountProfile) -> Result<(), Self::Error>;

    /// Load the run an account left unfinished
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be read.
    fn load_run(&self, account: &str) -> Result<Option<PlayerState>, Self::Error>;

    /// Save the current run for an account
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be written.
    fn save_run(&self, account: &str, state: &PlayerState) -> Result<(), Self::Error>;

    /// Delete the saved run for an account
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be removed.
    fn delete_run(&self, account: &str) -> Result<(), Self::Error>;
}

fn storage_error<E: std::error::Error>(err: E) -> GameError {
    GameError::Storage(err.to_string())
}

/// Main game engine: owns the catalogs and every open session.
///
/// Requests for different sessions run in parallel; requests for one session
/// are serialized by that session's mutex.
pub struct GameEngine<C, S>
where
    C: AirportCatalog,
    S: ProfileStorage,
{
    catalog: C,
    storage: S,
    config: EngineConfig,
    badges: BadgeCatalog,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<GameSession>>>>,
}

impl<C, S> GameEngine<C, S>
where
    C: AirportCatalog,
    S: ProfileStorage,
{
    /// Create an engine with the embedded tuning, badge catalog, and the system clock
    pub fn new(catalog: C, storage: S) -> Self {
        Self {
            catalog,
            storage,
            config: EngineConfig::embedded().clone(),
            badges: BadgeCatalog::load_default(),
            clock: Arc::new(SystemClock),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Swap in alternative tuning.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `config` is inconsistent.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self, EngineConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    #[must_use]
    pub fn with_badges(mut self, badges: BadgeCatalog) -> Self {
        self.badges = badges;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn badge_catalog(&self) -> &BadgeCatalog {
        &self.badges
    }

    pub const fn catalog(&self) -> &C {
        &self.catalog
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Every airport with its distance from home.
    pub fn airports(&self) -> Vec<AirportListing> {
        self.catalog.listings()
    }

    /// Number of sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.sessions.read().len()
    }

    /// Log in and start a fresh run, discarding any saved one.
    ///
    /// Earned badges carry over from the account profile. `seed` pins the
    /// run's RNG streams; `None` picks one at random.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] for a blank account name and
    /// [`GameError::Storage`] if persistence fails.
    pub fn open_session(&self, account: &str, seed: Option<u64>) -> Result<SessionId, GameError> {
        let account = validate_account(account)?;
        let profile = self.load_profile(account)?;
        let mut rng = RngBundle::from_user_seed(seed.unwrap_or_else(rand::random));
        let requirement = self.draw_fuel(&mut rng)?;
        let state = PlayerState::new(account)
            .with_badges(profile.badges)
            .with_fuel_requirement(requirement);
        self.storage.save_run(account, &state).map_err(storage_error)?;
        Ok(self.register(account, state, rng))
    }

    /// Log in and continue the saved run, or start one if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] for a blank account name and
    /// [`GameError::Storage`] if persistence fails.
    pub fn resume_session(&self, account: &str, seed: Option<u64>) -> Result<SessionId, GameError> {
        let account = validate_account(account)?;
        let Some(mut state) = self.storage.load_run(account).map_err(storage_error)? else {
            return self.open_session(account, seed);
        };
        let profile = self.load_profile(account)?;
        state.badges_earned.extend(profile.badges);
        let mut rng = RngBundle::from_user_seed(seed.unwrap_or_else(rand::random));
        if state.fuel_requirement.is_none() {
            state.fuel_requirement = Some(self.draw_fuel(&mut rng)?);
        }
        Ok(self.register(account, state, rng))
    }

    /// Log out without saving.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`] for an unknown session.
    pub fn close_session(&self, id: &SessionId) -> Result<(), GameError> {
        let removed = self.sessions.write().remove(id);
        match removed {
            Some(_) => {
                info!("closed session {id}");
                Ok(())
            }
            None => Err(unauthorized(id)),
        }
    }

    /// Save the current run and log out.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`] for an unknown session and
    /// [`GameError::Storage`] if the snapshot cannot be written; the session
    /// stays open in that case.
    pub fn quit_session(&self, id: &SessionId) -> Result<(), GameError> {
        let handle = self.session(id)?;
        {
            let session = handle.lock();
            self.save_snapshot(&session.account, &session.state)?;
        }
        self.close_session(id)
    }

    /// Current state, after applying any pending trap timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`] for an unknown session and
    /// [`GameError::Storage`] if a pending loss cannot be saved.
    pub fn get_state(&self, id: &SessionId) -> Result<PlayerState, GameError> {
        let handle = self.session(id)?;
        let mut session = handle.lock();
        let now = self.clock.now_ms();
        self.poll_trap(&mut session, now)?;
        Ok(session.state.clone())
    }

    /// Fly to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`], [`GameError::InvalidInput`] for a
    /// blank code, [`GameError::UnknownAirport`], [`GameError::RunFinished`],
    /// or [`GameError::Storage`]. On any error the run is unchanged.
    pub fn travel(&self, id: &SessionId, destination: &AirportCode) -> Result<TravelOutcome, GameError> {
        let handle = self.session(id)?;
        let mut guard = handle.lock();
        let session = &mut *guard;
        let now = self.clock.now_ms();

        // An expired trap ends the run whatever the destination.
        if let Some(outcome) = self.orchestrator().expire_trap(&session.state, now) {
            self.persist(&session.account, &session.state, &outcome.state, &outcome.new_badges)?;
            session.state = outcome.state.clone();
            return Ok(outcome);
        }
        if destination.is_empty() {
            return Err(GameError::invalid("icao", "is required"));
        }
        if !self.catalog.contains(destination) {
            warn!("rejected travel to unknown airport {destination}");
            return Err(GameError::UnknownAirport(destination.clone()));
        }

        let mut rng = session.rng.clone();
        let outcome = self
            .orchestrator()
            .travel(&session.state, destination, now, &mut rng)
            .inspect_err(|err| warn!("{} travel rejected: {err}", session.account))?;

        if outcome.state != session.state {
            self.persist(&session.account, &session.state, &outcome.state, &outcome.new_badges)?;
        }
        session.state = outcome.state.clone();
        session.rng = rng;
        Ok(outcome)
    }

    /// Spend credits for range.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`], [`GameError::InvalidInput`] for a
    /// zero amount, [`GameError::InsufficientResource`],
    /// [`GameError::RunFinished`], or [`GameError::Storage`].
    pub fn buy_range(&self, id: &SessionId, credits: u32) -> Result<PlayerState, GameError> {
        self.transact(id, |economy, state| economy.buy_range(state, credits))
    }

    /// Spend fluxfire for credits.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`], [`GameError::InvalidInput`] for a
    /// zero amount, [`GameError::InsufficientResource`],
    /// [`GameError::RunFinished`], or [`GameError::Storage`].
    pub fn buy_credits(&self, id: &SessionId, fluxfire: u32) -> Result<PlayerState, GameError> {
        self.transact(id, |economy, state| economy.buy_credits(state, fluxfire))
    }

    /// Ids of every badge the player holds.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`] for an unknown session.
    pub fn list_badges(&self, id: &SessionId) -> Result<Vec<BadgeId>, GameError> {
        let state = self.get_state(id)?;
        Ok(state.badges_earned.into_iter().collect())
    }

    /// Catalog entries for every badge the player holds.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`] for an unknown session.
    pub fn describe_badges(&self, id: &SessionId) -> Result<Vec<BadgeView>, GameError> {
        let state = self.get_state(id)?;
        Ok(self
            .badges
            .describe(state.badges_earned.iter(), &state.perks_used))
    }

    /// Spend the perk attached to an earned badge. Each perk works once per run.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::BadgeNotEarned`], [`GameError::PerkUnavailable`],
    /// [`GameError::RunFinished`], [`GameError::Unauthorized`], or
    /// [`GameError::Storage`].
    pub fn activate_perk(&self, id: &SessionId, badge: &BadgeId) -> Result<PlayerState, GameError> {
        let handle = self.session(id)?;
        let mut guard = handle.lock();
        let session = &mut *guard;
        let now = self.clock.now_ms();
        self.poll_trap(session, now)?;

        let state = &session.state;
        if state.is_terminal() {
            return Err(GameError::RunFinished {
                status: state.status,
            });
        }
        if !state.badges_earned.contains(badge) {
            return Err(GameError::BadgeNotEarned(badge.clone()));
        }
        let perk = self
            .badges
            .find(badge)
            .and_then(|entry| entry.perk)
            .ok_or_else(|| GameError::PerkUnavailable {
                badge: badge.clone(),
                reason: "badge has no perk",
            })?;
        if state.perks_used.contains(badge) {
            return Err(GameError::PerkUnavailable {
                badge: badge.clone(),
                reason: "already used this run",
            });
        }

        let mut next = state.clone();
        perk.apply(&mut next.buffs, now);
        next.perks_used.insert(badge.clone());
        self.save_snapshot(&session.account, &next)?;
        info!("{} activated the {} perk of {badge}", session.account, perk.label());
        session.state = next.clone();
        Ok(next)
    }

    /// Start the run over: starting ledger, new fuel, badges kept.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`] or [`GameError::Storage`].
    pub fn reset(&self, id: &SessionId) -> Result<PlayerState, GameError> {
        let handle = self.session(id)?;
        let mut guard = handle.lock();
        let session = &mut *guard;
        let mut rng = session.rng.clone();
        let requirement = self.draw_fuel(&mut rng)?;
        let mut next = session.state.clone();
        next.reset(requirement);
        self.save_snapshot(&session.account, &next)?;
        info!("{} reset their run", session.account);
        session.state = next.clone();
        session.rng = rng;
        Ok(next)
    }

    /// The account profile behind a session.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`] or [`GameError::Storage`].
    pub fn profile(&self, id: &SessionId) -> Result<AccountProfile, GameError> {
        let handle = self.session(id)?;
        let account = handle.lock().account.clone();
        self.load_profile(&account)
    }

    /// Read the saved run for an account directly from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn saved_run(&self, account: &str) -> Result<Option<PlayerState>, anyhow::Error> {
        Ok(self.storage.load_run(account)?)
    }

    const fn orchestrator(&self) -> TravelOrchestrator<'_> {
        TravelOrchestrator::new(&self.config, &self.badges)
    }

    fn register(&self, account: &str, state: PlayerState, rng: RngBundle) -> SessionId {
        let seed = rng.seed();
        let mut sessions = self.sessions.write();
        let id = loop {
            let candidate = SessionId::generate();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        sessions.insert(
            id.clone(),
            Arc::new(Mutex::new(GameSession::new(account.to_string(), state, rng))),
        );
        info!("opened session {id} for {account} (seed {seed})");
        id
    }

    fn session(&self, id: &SessionId) -> Result<Arc<Mutex<GameSession>>, GameError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| unauthorized(id))
    }

    fn draw_fuel(&self, rng: &mut RngBundle) -> Result<FuelRequirement, GameError> {
        draw_requirement(&self.config.fuels, rng.setup())
            .ok_or_else(|| GameError::invalid("fuels", "fuel catalog is empty"))
    }

    fn load_profile(&self, account: &str) -> Result<AccountProfile, GameError> {
        Ok(self
            .storage
            .load_profile(account)
            .map_err(storage_error)?
            .unwrap_or_else(|| AccountProfile::new(account)))
    }

    fn save_snapshot(&self, account: &str, state: &PlayerState) -> Result<(), GameError> {
        if state.is_terminal() {
            self.storage.delete_run(account)
        } else {
            self.storage.save_run(account, state)
        }
        .map_err(storage_error)
    }

    /// Write the run, then the profile when badges or a result changed.
    ///
    /// A failed profile write puts the previous run snapshot back, so a
    /// rejected request leaves storage as it found it.
    fn persist(
        &self,
        account: &str,
        before: &PlayerState,
        after: &PlayerState,
        new_badges: &[BadgeId],
    ) -> Result<(), GameError> {
        self.save_snapshot(account, after)?;
        let finished = !before.is_terminal() && after.is_terminal();
        if !finished && new_badges.is_empty() {
            return Ok(());
        }
        let saved = self.load_profile(account).and_then(|mut profile| {
            profile.badges.extend(new_badges.iter().cloned());
            if finished {
                profile.record(after.status);
            }
            self.storage.save_profile(&profile).map_err(storage_error)?;
            Ok(profile)
        });
        match saved {
            Ok(profile) => {
                debug!(
                    "{account} profile now {} wins, {} losses, {} badges",
                    profile.wins,
                    profile.losses,
                    profile.badges.len()
                );
                Ok(())
            }
            Err(err) => {
                if let Err(undo) = self.save_snapshot(account, before) {
                    warn!("{account} run snapshot could not be restored: {undo}");
                }
                Err(err)
            }
        }
    }

    fn poll_trap(&self, session: &mut GameSession, now: i64) -> Result<(), GameError> {
        if let Some(outcome) = self.orchestrator().expire_trap(&session.state, now) {
            self.persist(&session.account, &session.state, &outcome.state, &outcome.new_badges)?;
            session.state = outcome.state;
        }
        Ok(())
    }

    fn transact<F>(&self, id: &SessionId, op: F) -> Result<PlayerState, GameError>
    where
        F: FnOnce(&Economy<'_>, &PlayerState) -> Result<PlayerState, GameError>,
    {
        let handle = self.session(id)?;
        let mut guard = handle.lock();
        let session = &mut *guard;
        let now = self.clock.now_ms();
        self.poll_trap(session, now)?;

        let mut next = op(&Economy::new(&self.config.economy), &session.state)
            .inspect_err(|err| warn!("{} purchase rejected: {err}", session.account))?;
        let new_badges = BadgeEvaluator::new(&self.badges).evaluate(&session.state, &next, &[]);
        next.badges_earned.extend(new_badges.iter().cloned());
        self.persist(&session.account, &session.state, &next, &new_badges)?;
        session.state = next.clone();
        Ok(next)
    }
}

fn validate_account(account: &str) -> Result<&str, GameError> {
    let trimmed = account.trim();
    if trimmed.is_empty() {
        return Err(GameError::invalid("username", "is required"));
    }
    Ok(trimmed)
}

fn unauthorized(id: &SessionId) -> GameError {
    warn!("rejected request for unknown session {id}");
    GameError::Unauthorized
}
