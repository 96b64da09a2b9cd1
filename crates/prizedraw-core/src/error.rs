//! Error taxonomy for draw operations.
//!
//! Every failure is surfaced to the caller as a distinct, inspectable kind.
//! Nothing here is retried inside the engine; the delivery layer decides
//! whether to re-propose.

use thiserror::Error;

use crate::store::StoreError;
use crate::tier::PrizeTier;

/// Errors returned by the draw engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DrawError {
    /// No tier has remaining capacity. Terminal until reset.
    #[error("no prizes remaining")]
    PoolExhausted,

    /// Nobody is eligible for this draw.
    #[error("no eligible participants remaining for draw {draw_index}")]
    NoEligibleParticipants {
        /// The draw that could not be filled.
        draw_index: u64,
    },

    /// The override participant is not eligible on its trigger draw.
    #[error("participant {participant_id} is not available for draw {draw_index}")]
    OverrideParticipantUnavailable {
        participant_id: u32,
        draw_index: u64,
    },

    /// The participant already holds a prize.
    #[error("participant {participant_id} has already won")]
    DuplicateWinner { participant_id: u32 },

    /// The participant is already marked absent.
    #[error("participant {participant_id} is already marked absent")]
    AlreadyAbsent { participant_id: u32 },

    /// The tier ran out between propose and commit.
    #[error("{tier} prizes are exhausted")]
    TierExhausted { tier: PrizeTier },

    /// An earlier tier still has prizes, so `requested` cannot be awarded yet.
    #[error("cannot award {requested} while {pending} prizes remain")]
    TierOutOfOrder {
        requested: PrizeTier,
        pending: PrizeTier,
    },

    /// The id is not part of the roster.
    #[error("participant {participant_id} is not in the roster")]
    UnknownParticipant { participant_id: u32 },

    /// Storage failure. Possibly transient; the whole operation may be retried.
    #[error("storage error: {0}")]
    Storage(#[source] StoreError),
}

impl DrawError {
    /// Short machine-readable identifier for this error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PoolExhausted => "pool_exhausted",
            Self::NoEligibleParticipants { .. } => "no_eligible_participants",
            Self::OverrideParticipantUnavailable { .. } => "override_participant_unavailable",
            Self::DuplicateWinner { .. } => "duplicate_winner",
            Self::AlreadyAbsent { .. } => "already_absent",
            Self::TierExhausted { .. } => "tier_exhausted",
            Self::TierOutOfOrder { .. } => "tier_out_of_order",
            Self::UnknownParticipant { .. } => "unknown_participant",
            Self::Storage(_) => "storage",
        }
    }

    /// Whether retrying the same operation could succeed without any other
    /// state changing.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<StoreError> for DrawError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateWinner { participant_id } => {
                Self::DuplicateWinner { participant_id }
            },
            StoreError::AlreadyAbsent { participant_id } => Self::AlreadyAbsent { participant_id },
            StoreError::TierExhausted { tier } => Self::TierExhausted { tier },
            StoreError::TierOutOfOrder { requested, pending } => {
                Self::TierOutOfOrder { requested, pending }
            },
            other => Self::Storage(other),
        }
    }
}
