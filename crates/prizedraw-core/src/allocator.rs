//! Active prize tier selection.
//!
//! The active tier is the first tier in [`PrizeTier::ORDER`] with remaining
//! capacity. A tier that has been skipped is never revisited.

use serde::{Deserialize, Serialize};

use crate::error::DrawError;
use crate::tier::{PrizeTier, TierTable};

/// Returns the tier the next draw awards.
///
/// # Errors
///
/// Returns [`DrawError::PoolExhausted`] when no tier has capacity left.
pub fn active_tier(tiers: &TierTable) -> Result<PrizeTier, DrawError> {
    current_tier(tiers).ok_or(DrawError::PoolExhausted)
}

/// Like [`active_tier`], but `None` instead of an error once exhausted.
#[must_use]
pub fn current_tier(tiers: &TierTable) -> Option<PrizeTier> {
    tiers
        .iter()
        .find(|(_, status)| status.remaining > 0)
        .map(|(tier, _)| tier)
}

/// Per-tier counts keyed the way the delivery layer reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub small: u32,
    pub medium: u32,
    pub big: u32,
}

/// Current tier plus remaining and total capacity for every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeStatus {
    /// `None` once every tier is exhausted.
    #[serde(rename = "currentType")]
    pub current_tier: Option<PrizeTier>,
    pub remaining: TierCounts,
    pub total: TierCounts,
}

impl PrizeStatus {
    #[must_use]
    pub fn from_tiers(tiers: &TierTable) -> Self {
        Self {
            current_tier: current_tier(tiers),
            remaining: TierCounts {
                small: tiers.small.remaining,
                medium: tiers.medium.remaining,
                big: tiers.big.remaining,
            },
            total: TierCounts {
                small: tiers.small.total,
                medium: tiers.medium.total,
                big: tiers.big.total,
            },
        }
    }
}
