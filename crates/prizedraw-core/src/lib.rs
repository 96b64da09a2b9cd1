//! # prizedraw-core
//!
//! Draw allocation engine for a tiered prize pool.
//!
//! Winners are drawn one at a time from a fixed participant roster. The
//! engine enforces:
//!
//! - **Exclusivity**: nobody wins twice, and participants marked absent are
//!   never drawn.
//! - **Strict tier order**: `SMALL` prizes are exhausted before `MEDIUM`
//!   becomes active, and `MEDIUM` before `BIG`.
//! - **Override rule**: one configured draw index always goes to one
//!   configured participant, who is excluded from every other draw.
//! - **Transactional commits**: concurrent or repeated commits cannot
//!   double-award a prize or drive a tier below zero.
//!
//! ## Modules
//!
//! - [`store`]: durable `SQLite` state behind the [`StateStore`] trait
//! - [`allocator`]: active tier selection
//! - [`eligibility`]: the pool of drawable participants
//! - [`engine`]: the two-phase propose/commit protocol
//! - [`roster`]: participant roster loading
//! - [`config`]: TOML configuration
//!
//! ## Example
//!
//! ```rust
//! use prizedraw_core::engine::{DrawEngine, OverrideRule};
//! use prizedraw_core::roster::{Participant, Roster};
//! use prizedraw_core::store::SqliteStateStore;
//! use prizedraw_core::tier::TierTable;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let roster = Roster::new(vec![
//!     Participant::new(1, "Ada", "ada.jpg"),
//!     Participant::new(2, "Grace", "grace.jpg"),
//! ])?;
//! let store = SqliteStateStore::in_memory(&TierTable::default())?;
//! let engine = DrawEngine::new(store, roster, Some(OverrideRule::default()));
//!
//! let proposal = engine.propose()?;
//! let draw_count = engine.commit(proposal.winner.id, proposal.tier)?;
//! assert_eq!(draw_count, 1);
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod config;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod roster;
pub mod store;
pub mod tier;

pub use allocator::PrizeStatus;
pub use config::AppConfig;
pub use engine::{DrawEngine, OverrideRule, Proposal};
pub use error::DrawError;
pub use roster::{JsonRosterProvider, Participant, Roster, RosterProvider};
pub use store::{SqliteStateStore, StateStore};
pub use tier::{PrizeTier, TierStatus, TierTable};
