//! Prize tiers and their capacity snapshots.
//!
//! Tiers form a fixed, ordered sequence: `Small` must be exhausted before
//! `Medium` becomes active, and `Medium` before `Big`. The ordering is part of
//! the type ([`PrizeTier::ORDER`]) so every consumer iterates tiers the same
//! way.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the ordered prize tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrizeTier {
    /// Exhausted first.
    Small,
    /// Active once `Small` is exhausted.
    Medium,
    /// Active once `Medium` is exhausted.
    Big,
}

impl PrizeTier {
    /// Activation order. Tiers are never revisited once skipped.
    pub const ORDER: [Self; 3] = [Self::Small, Self::Medium, Self::Big];

    /// Stable name used as the storage key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "SMALL",
            Self::Medium => "MEDIUM",
            Self::Big => "BIG",
        }
    }

    /// Human-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Small => "Small Prize",
            Self::Medium => "Medium Prize",
            Self::Big => "Big Prize",
        }
    }

    /// Position of this tier in [`PrizeTier::ORDER`].
    #[must_use]
    pub const fn rank(self) -> usize {
        match self {
            Self::Small => 0,
            Self::Medium => 1,
            Self::Big => 2,
        }
    }

    /// Tiers that must be exhausted before this one may be awarded.
    #[must_use]
    pub fn predecessors(self) -> &'static [Self] {
        &Self::ORDER[..self.rank()]
    }
}

impl fmt::Display for PrizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown prize tier: {0}")]
pub struct ParseTierError(pub String);

impl FromStr for PrizeTier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SMALL" => Ok(Self::Small),
            "MEDIUM" => Ok(Self::Medium),
            "BIG" => Ok(Self::Big),
            _ => Err(ParseTierError(s.to_string())),
        }
    }
}

/// Capacity of a single tier.
///
/// Invariant: `remaining <= total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStatus {
    /// Fixed capacity, set once at initialization.
    pub total: u32,
    /// Prizes still available in this tier.
    pub remaining: u32,
}

impl TierStatus {
    /// A tier with nothing awarded yet.
    #[must_use]
    pub const fn full(total: u32) -> Self {
        Self {
            total,
            remaining: total,
        }
    }

    /// Number of prizes already awarded from this tier.
    #[must_use]
    pub const fn awarded(&self) -> u32 {
        self.total.saturating_sub(self.remaining)
    }
}

/// Snapshot of all tiers, indexed by [`PrizeTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable {
    pub small: TierStatus,
    pub medium: TierStatus,
    pub big: TierStatus,
}

impl TierTable {
    /// Builds a table where every tier is at full capacity.
    #[must_use]
    pub const fn full(small: u32, medium: u32, big: u32) -> Self {
        Self {
            small: TierStatus::full(small),
            medium: TierStatus::full(medium),
            big: TierStatus::full(big),
        }
    }

    #[must_use]
    pub const fn get(&self, tier: PrizeTier) -> TierStatus {
        match tier {
            PrizeTier::Small => self.small,
            PrizeTier::Medium => self.medium,
            PrizeTier::Big => self.big,
        }
    }

    pub fn get_mut(&mut self, tier: PrizeTier) -> &mut TierStatus {
        match tier {
            PrizeTier::Small => &mut self.small,
            PrizeTier::Medium => &mut self.medium,
            PrizeTier::Big => &mut self.big,
        }
    }

    /// Iterates `(tier, status)` in activation order.
    pub fn iter(&self) -> impl Iterator<Item = (PrizeTier, TierStatus)> + '_ {
        PrizeTier::ORDER.into_iter().map(|tier| (tier, self.get(tier)))
    }

    /// Total prizes still available across every tier.
    #[must_use]
    pub fn total_remaining(&self) -> u64 {
        self.iter().map(|(_, s)| u64::from(s.remaining)).sum()
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::full(20, 10, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_small_medium_big() {
        assert_eq!(
            PrizeTier::ORDER,
            [PrizeTier::Small, PrizeTier::Medium, PrizeTier::Big]
        );
        assert!(PrizeTier::Small < PrizeTier::Medium);
        assert!(PrizeTier::Medium < PrizeTier::Big);
    }

    #[test]
    fn predecessors_follow_order() {
        assert!(PrizeTier::Small.predecessors().is_empty());
        assert_eq!(PrizeTier::Medium.predecessors(), &[PrizeTier::Small]);
        assert_eq!(
            PrizeTier::Big.predecessors(),
            &[PrizeTier::Small, PrizeTier::Medium]
        );
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("small".parse::<PrizeTier>(), Ok(PrizeTier::Small));
        assert_eq!(" Medium ".parse::<PrizeTier>(), Ok(PrizeTier::Medium));
        assert_eq!("BIG".parse::<PrizeTier>(), Ok(PrizeTier::Big));
        assert!("huge".parse::<PrizeTier>().is_err());
    }

    #[test]
    fn serde_uses_storage_names() {
        let json = serde_json::to_string(&PrizeTier::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
        let back: PrizeTier = serde_json::from_str("\"BIG\"").unwrap();
        assert_eq!(back, PrizeTier::Big);
    }

    #[test]
    fn default_table_matches_stock_pool() {
        let table = TierTable::default();
        assert_eq!(table.small, TierStatus::full(20));
        assert_eq!(table.medium, TierStatus::full(10));
        assert_eq!(table.big, TierStatus::full(5));
        assert_eq!(table.total_remaining(), 35);
    }
}
