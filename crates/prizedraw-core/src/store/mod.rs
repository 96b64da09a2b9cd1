//! Durable, transactional storage for draw state.
//!
//! The store owns every mutable piece of the draw cycle: tier capacities,
//! winner records, absence records and the draw counter. All of it lives
//! behind the [`StateStore`] trait; [`SqliteStateStore`] is the concrete
//! backend.
//!
//! # Guarantees
//!
//! - **Check-then-act in one transaction**: `commit_win` and `commit_draw`
//!   re-check the winner uniqueness and the tier's remaining capacity inside
//!   the same write transaction that inserts and decrements, so concurrent
//!   commits can never drive a tier below zero or award a participant twice.
//! - **Durable writes**: WAL mode with `synchronous = FULL`; a mutation is
//!   on disk before it returns.
//! - **Exclusive reset**: reset runs in an exclusive transaction.
//!
//! # Example
//!
//! ```rust,no_run
//! use prizedraw_core::store::{SqliteStateStore, StateStore};
//! use prizedraw_core::tier::{PrizeTier, TierTable};
//!
//! # fn example() -> Result<(), prizedraw_core::store::StoreError> {
//! let store = SqliteStateStore::open("/path/to/lottery.db", &TierTable::default())?;
//!
//! store.commit_win(12, PrizeTier::Small)?;
//! let count = store.increment_draw_counter()?;
//! assert_eq!(count, 1);
//! # Ok(())
//! # }
//! ```

mod backend;
mod sqlite;


pub use backend::{AbsenceRecord, StateStore, StoreError, StoreSnapshot, WinnerRecord};
pub use sqlite::SqliteStateStore;
