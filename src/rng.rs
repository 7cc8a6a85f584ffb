//! Random sources for the walks.
//!
//! Every walk normally owns its own generator forked from a master stream,
//! which keeps runs reproducible for a fixed seed regardless of thread
//! scheduling. [`SharedRandom`] is the alternative of a single centralized
//! stream handed to all walks.

use parking_lot::Mutex;
use pcg_rand::Pcg64;
use rand::{Error, Rng, RngCore, SeedableRng};
use std::sync::Arc;

pub fn rng_from_seed(seed: Option<u64>) -> Pcg64 {
    if let Some(seed_value) = seed {
        Pcg64::seed_from_u64(seed_value)
    } else {
        Pcg64::from_entropy()
    }
}

/// Derives an independent child generator seeded from the master's stream.
pub fn fork_rng<R: SeedableRng>(master: &mut impl Rng) -> R {
    R::seed_from_u64(master.gen())
}

/// Cloneable handle to one generator guarded by a mutex.
#[derive(Debug)]
pub struct SharedRandom<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for SharedRandom<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: RngCore> SharedRandom<R> {
    pub fn new(rng: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rng)),
        }
    }
}

impl<R: RngCore> RngCore for SharedRandom<R> {
    fn next_u32(&mut self) -> u32 {
        self.inner.lock().next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.lock().next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.lock().fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.inner.lock().try_fill_bytes(dest)
    }
}
