//! Memoized learned policies.
//!
//! A learned policy depends only on the terminal cell and the penalized
//! obstacle cell of its grid, so the pair is the cache key. Entries are never
//! evicted; the number of distinct keys is bounded by the grid size squared.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::grid::GridState;
use crate::policy::Policy;

/// Cache key of one grid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    pub end: GridState,
    pub obstacle: GridState,
}

impl Signature {
    /// Key for a grid ending at `end` with a penalty on `obstacle`.
    ///
    /// If the obstacle sits on the requested end cell the end moves to a
    /// neighbour, preferring the cell to its left, so the grid always keeps a
    /// reachable terminal state that is not penalized.
    pub fn new(end: GridState, obstacle: GridState, rows: u8, cols: u8) -> Signature {
        if end != obstacle {
            return Signature { end, obstacle };
        }
        let moved = if end.col > 0 {
            GridState::new(end.row, end.col - 1)
        } else if end.col + 1 < cols {
            GridState::new(end.row, end.col + 1)
        } else if end.row > 0 {
            GridState::new(end.row - 1, end.col)
        } else if end.row + 1 < rows {
            GridState::new(end.row + 1, end.col)
        } else {
            end
        };
        Signature { end: moved, obstacle }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}|{}", self.end, self.obstacle)
    }
}

#[derive(Debug, Default)]
pub struct PolicyCache {
    policies: HashMap<Signature, Rc<Policy>>,
    learning_runs: usize,
}

impl PolicyCache {
    pub fn new() -> PolicyCache {
        PolicyCache::default()
    }

    /// Return the policy stored for `signature`, running `compute` to learn
    /// it the first time the signature is seen.
    ///
    /// A failed computation stores nothing, so the next call retries.
    pub fn get_or_compute<F>(&mut self, signature: Signature, compute: F) -> Result<Rc<Policy>>
    where
        F: FnOnce(&Signature) -> Result<Policy>,
    {
        if let Some(policy) = self.policies.get(&signature) {
            log::trace!("Policy cache hit for {}", signature);
            return Ok(Rc::clone(policy));
        }
        log::info!("Policy cache miss for {}, learning", signature);
        let policy = Rc::new(compute(&signature)?);
        self.learning_runs += 1;
        self.policies.insert(signature, Rc::clone(&policy));
        Ok(policy)
    }

    pub fn get(&self, signature: &Signature) -> Option<Rc<Policy>> {
        self.policies.get(signature).cloned()
    }

    /// Number of times a policy had to be learned.
    pub fn learning_runs(&self) -> usize {
        self.learning_runs
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Signatures currently cached, in sorted order.
    pub fn signatures(&self) -> Vec<Signature> {
        let mut keys: Vec<Signature> = self.policies.keys().copied().collect();
        keys.sort();
        keys
    }
}
