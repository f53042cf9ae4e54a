//! Per-tournament write serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::models::TournamentId;

/// One async mutex per tournament.
///
/// Mutating engine operations hold the tournament's guard for their whole
/// read-compute-commit cycle. Different tournaments never contend.
#[derive(Default)]
pub struct TournamentLocks {
    locks: Mutex<HashMap<TournamentId, Arc<AsyncMutex<()>>>>,
}

impl TournamentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a tournament
    pub async fn acquire(&self, tournament_id: TournamentId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(tournament_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Forget a tournament's mutex unless someone holds or waits for it.
    ///
    /// A later `acquire` creates a fresh mutex. Returns whether the entry was
    /// removed.
    pub fn release(&self, tournament_id: TournamentId) -> bool {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        match locks.get(&tournament_id) {
            Some(lock) if Arc::strong_count(lock) == 1 => {
                locks.remove(&tournament_id);
                true
            }
            _ => false,
        }
    }

    /// Number of tournaments currently tracked
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
