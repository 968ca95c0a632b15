//! Relay Selection
//!
//! Draws relays from a catalog uniformly at random, without
//! replacement, until the sweep is exhausted.
//!
//! The pool is an arena: a slot vector plus a live count. Picking
//! swaps the chosen slot with the last live slot and clears it, so
//! removal is O(1) and pool order does not follow catalog order.

use crate::relay::{Catalog, Relay};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Selection errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Selection pool is empty")]
    EmptyPool,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Relays not yet chosen in the current sweep
#[derive(Debug, Clone)]
pub struct SelectionPool {
    slots: Vec<Option<Relay>>,
    live: usize,
}

impl SelectionPool {
    /// Copy every relay of the catalog
    pub fn full(catalog: &Catalog) -> Self {
        Self::from_relays(catalog.relays().iter().cloned())
    }

    /// Copy the relays of one country
    pub fn filtered(catalog: &Catalog, country_short: &str) -> Result<Self, SelectionError> {
        if country_short.is_empty() {
            return Err(SelectionError::InvalidArgument(
                "country code must not be empty".into(),
            ));
        }
        Ok(Self::from_relays(catalog.in_country(country_short).cloned()))
    }

    fn from_relays(relays: impl Iterator<Item = Relay>) -> Self {
        let slots: Vec<Option<Relay>> = relays.map(Some).collect();
        let live = slots.len();
        Self { slots, live }
    }

    /// Relays left in this sweep
    pub fn len(&self) -> usize {
        self.live
    }

    /// Is the sweep exhausted?
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Take one relay chosen uniformly at random
    pub fn take_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Relay, SelectionError> {
        if self.live == 0 {
            return Err(SelectionError::EmptyPool);
        }

        let pick = rng.gen_range(0..self.live);
        let last = self.live - 1;
        self.slots.swap(pick, last);
        self.live = last;

        self.slots[last].take().ok_or(SelectionError::EmptyPool)
    }
}

/// Selection iterator
///
/// Holds the current pool and its own random source.
pub struct RelaySelector {
    pool: Option<SelectionPool>,
    rng: StdRng,
}

impl RelaySelector {
    /// Create a selector seeded from the operating system
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a deterministic selector
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self { pool: None, rng }
    }

    /// Is a pool in place (possibly exhausted)?
    pub fn has_pool(&self) -> bool {
        self.pool.is_some()
    }

    /// Relays left in the current pool
    pub fn remaining(&self) -> Option<usize> {
        self.pool.as_ref().map(SelectionPool::len)
    }

    /// Build the pool if none exists
    ///
    /// An existing pool, even an exhausted one, is kept as-is
    /// until [`reset`](Self::reset).
    pub fn populate(&mut self, catalog: &Catalog, country_short: Option<&str>) -> Result<(), SelectionError> {
        if self.pool.is_some() {
            return Ok(());
        }

        let pool = match country_short {
            Some(code) => SelectionPool::filtered(catalog, code)?,
            None => SelectionPool::full(catalog),
        };

        debug!(
            "Selection pool created: {} relays (filter: {:?})",
            pool.len(),
            country_short
        );
        self.pool = Some(pool);
        Ok(())
    }

    /// Replace the pool with an unfiltered copy of the catalog
    pub fn reset(&mut self, catalog: &Catalog) {
        debug!("Selection pool reset: {} relays", catalog.len());
        self.pool = Some(SelectionPool::full(catalog));
    }

    /// Draw the next relay of the sweep
    pub fn next_relay(&mut self) -> Result<Relay, SelectionError> {
        match self.pool.as_mut() {
            Some(pool) => pool.take_random(&mut self.rng),
            None => Err(SelectionError::EmptyPool),
        }
    }
}

impl Default for RelaySelector {
    fn default() -> Self {
        Self::new()
    }
}
