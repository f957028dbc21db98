//! Fixed rules of a ChronoQuest run.
//!
//! These values define the game itself rather than its balance. Weights,
//! magnitudes, and buff strength are tuning data and live in
//! [`crate::config::EngineConfig`] instead.

/// ICAO code of the airport every run starts from and must return to.
pub const HOME_AIRPORT: &str = "EFHK";

/// Number of unique fragments (`ChronoShards`) a player must hold to win.
pub const FRAGMENT_COUNT: u8 = 5;

// Starting ledger ----------------------------------------------------------
pub const START_CREDITS: u32 = 1_000;
pub const START_RANGE: u32 = 1_000;
pub const START_FLUXFIRE: u32 = 0;

// Presentation hints -------------------------------------------------------
pub(crate) const INSUFFICIENT_RANGE_MESSAGE: &str =
    "Not enough range for this flight. Buy range with credits first.";

// RNG stream domains -------------------------------------------------------
pub(crate) const STREAM_SETUP: &[u8] = b"setup";
pub(crate) const STREAM_TRAVEL: &[u8] = b"travel";
pub(crate) const STREAM_OUTCOME: &[u8] = b"outcome";
pub(crate) const STREAM_TRAP: &[u8] = b"trap";

// Geography ----------------------------------------------------------------
pub(crate) const EARTH_RADIUS_KM: f64 = 6_371.0;
