//! The [`StateStore`] trait and the records it persists.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tier::{PrizeTier, TierTable};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another thread panicked while holding the connection.
    #[error("store connection lock poisoned")]
    LockPoisoned,

    /// Persisted rows violate a structural invariant.
    #[error("corrupt draw state: {0}")]
    CorruptState(String),

    /// The participant already has a winner record.
    #[error("participant {participant_id} already has a winner record")]
    DuplicateWinner { participant_id: u32 },

    /// The tier has no remaining capacity.
    #[error("tier {tier} has no remaining capacity")]
    TierExhausted { tier: PrizeTier },

    /// An earlier tier still has capacity.
    #[error("tier {requested} is not active while {pending} has capacity")]
    TierOutOfOrder {
        requested: PrizeTier,
        pending: PrizeTier,
    },

    /// The participant already has an absence record.
    #[error("participant {participant_id} already has an absence record")]
    AlreadyAbsent { participant_id: u32 },
}

/// A committed win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub participant_id: u32,
    pub tier: PrizeTier,
    /// Nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
}

/// A participant marked as not present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceRecord {
    pub participant_id: u32,
    /// Nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
}

/// Everything a proposal needs, read in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub tiers: TierTable,
    pub draw_count: u64,
    pub winners: BTreeSet<u32>,
    pub absent: BTreeSet<u32>,
}

/// Durable, transactionally consistent draw state.
///
/// Implementations must be safe to call from many threads at once without
/// external coordination. Snapshot reads never mutate state.
pub trait StateStore: Send + Sync {
    /// Capacity of every tier.
    fn read_tier_status(&self) -> Result<TierTable, StoreError>;

    /// Number of committed draws since the last reset.
    fn read_draw_counter(&self) -> Result<u64, StoreError>;

    fn read_winner_ids(&self) -> Result<BTreeSet<u32>, StoreError>;

    fn read_absent_ids(&self) -> Result<BTreeSet<u32>, StoreError>;

    /// Full winner records, oldest first.
    fn read_winners(&self) -> Result<Vec<WinnerRecord>, StoreError>;

    /// Full absence records, oldest first.
    fn read_absences(&self) -> Result<Vec<AbsenceRecord>, StoreError>;

    /// Tiers, counter, winners and absences from one consistent read.
    fn snapshot(&self) -> Result<StoreSnapshot, StoreError>;

    /// Records a win and decrements the tier, atomically.
    ///
    /// Fails with [`StoreError::DuplicateWinner`] if the participant already
    /// won, [`StoreError::TierExhausted`] if the tier is empty, or
    /// [`StoreError::TierOutOfOrder`] if an earlier tier still has capacity.
    /// On failure nothing is written.
    fn commit_win(&self, participant_id: u32, tier: PrizeTier) -> Result<(), StoreError>;

    /// [`StateStore::commit_win`] and [`StateStore::increment_draw_counter`]
    /// as one transaction. Returns the new draw count.
    ///
    /// If the win is rejected the counter does not advance.
    fn commit_draw(&self, participant_id: u32, tier: PrizeTier) -> Result<u64, StoreError>;

    /// Fails with [`StoreError::AlreadyAbsent`] if a record already exists.
    fn mark_absent(&self, participant_id: u32) -> Result<(), StoreError>;

    /// Atomically increments the draw counter and returns the new value.
    fn increment_draw_counter(&self) -> Result<u64, StoreError>;

    /// Restores every tier to full capacity, clears winners and absences and
    /// zeroes the draw counter, atomically and exclusively.
    fn reset(&self) -> Result<(), StoreError>;
}
