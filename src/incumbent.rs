//! Best solution found so far, shared by every search branch of a process.
//!
//! The weight is mirrored in an atomic so pruning checks never lock; the
//! solution itself lives behind a mutex and is the source of truth.

use crate::Solution;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
pub struct BestCell {
    /// `f64` bits of the best weight, `+inf` while empty.
    bound: AtomicU64,
    best: Mutex<Option<Solution>>,
}

impl Default for BestCell {
    fn default() -> Self {
        Self::new()
    }
}

impl BestCell {
    pub fn new() -> Self {
        Self {
            bound: AtomicU64::new(f64::INFINITY.to_bits()),
            best: Mutex::new(None),
        }
    }

    /// Current best weight, `f64::INFINITY` if nothing was installed yet.
    pub fn weight(&self) -> f64 {
        f64::from_bits(self.bound.load(Ordering::Acquire))
    }

    /// Installs `candidate` if it is strictly lighter than the current best.
    pub fn try_improve(&self, candidate: Solution) -> bool {
        if candidate.weight >= self.weight() {
            return false;
        }

        let mut guard = self.best.lock().unwrap_or_else(PoisonError::into_inner);
        // Another branch may have installed something better while we waited.
        if let Some(current) = guard.as_ref() {
            if candidate.weight >= current.weight {
                return false;
            }
        }

        log::trace!("new best weight {}", candidate.weight);
        self.bound.store(candidate.weight.to_bits(), Ordering::Release);
        *guard = Some(candidate);
        true
    }

    pub fn snapshot(&self) -> Option<Solution> {
        self.best
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn into_inner(self) -> Option<Solution> {
        self.best.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
