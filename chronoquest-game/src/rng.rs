//! Deterministic RNG streams segregated by engine domain.
//!
//! Each session seed fans out into independent streams so that, for example,
//! an extra outcome draw never shifts the next flight's price.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;

use crate::constants::{STREAM_OUTCOME, STREAM_SETUP, STREAM_TRAP, STREAM_TRAVEL};

/// Bundle of per-domain RNG streams derived from one user-visible seed.
#[derive(Debug, Clone)]
pub struct RngBundle {
    seed: u64,
    setup: CountingRng<SmallRng>,
    travel: CountingRng<SmallRng>,
    outcome: CountingRng<SmallRng>,
    trap: CountingRng<SmallRng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            setup: CountingRng::new(derive_stream_seed(seed, STREAM_SETUP)),
            travel: CountingRng::new(derive_stream_seed(seed, STREAM_TRAVEL)),
            outcome: CountingRng::new(derive_stream_seed(seed, STREAM_OUTCOME)),
            trap: CountingRng::new(derive_stream_seed(seed, STREAM_TRAP)),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Stream for run setup (fuel draws).
    pub const fn setup(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.setup
    }

    /// Stream for flight prices.
    pub const fn travel(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.travel
    }

    /// Stream for arrival outcomes and their magnitudes.
    pub const fn outcome(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.outcome
    }

    /// Stream for trap coin rolls.
    pub const fn trap(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.trap
    }

    /// Total draws across every stream.
    #[must_use]
    pub const fn total_draws(&self) -> u64 {
        self.setup
            .draws()
            .saturating_add(self.travel.draws())
            .saturating_add(self.outcome.draws())
            .saturating_add(self.trap.draws())
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
