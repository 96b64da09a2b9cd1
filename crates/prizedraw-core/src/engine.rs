//! Two-phase draw engine: propose, then commit.
//!
//! [`DrawEngine::propose`] is a pure read. It picks a winner from one
//! consistent [`StoreSnapshot`](crate::store::StoreSnapshot) and returns a
//! [`Proposal`] without writing anything, so a proposal that is never
//! committed leaves no trace and may be repeated freely.
//!
//! [`DrawEngine::commit`] persists a proposal. The winner insert, tier
//! decrement and draw counter increment happen in a single store
//! transaction; if any part is rejected the counter does not advance.
//!
//! # Override rule
//!
//! An [`OverrideRule`] ties one draw index to one participant. On the
//! trigger draw that participant is the winner (and must be eligible); on
//! every other draw that participant is excluded from selection.

use std::sync::{Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::allocator::{self, PrizeStatus};
use crate::eligibility::EligibilitySet;
use crate::error::DrawError;
use crate::roster::{Participant, Roster};
use crate::store::{StateStore, WinnerRecord};
use crate::tier::PrizeTier;

/// Forces a specific participant on a specific draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    /// One-based index of the draw the rule fires on.
    pub trigger_draw_index: u64,
    /// The participant awarded on the trigger draw and excluded otherwise.
    pub participant_id: u32,
}

impl OverrideRule {
    #[must_use]
    pub const fn new(trigger_draw_index: u64, participant_id: u32) -> Self {
        Self {
            trigger_draw_index,
            participant_id,
        }
    }

    #[must_use]
    pub const fn fires_on(&self, draw_index: u64) -> bool {
        self.trigger_draw_index == draw_index
    }
}

impl Default for OverrideRule {
    fn default() -> Self {
        Self::new(34, 57)
    }
}

/// A selected but uncommitted winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub winner: Participant,
    pub tier: PrizeTier,
    /// The draw this proposal would become once committed.
    pub draw_index: u64,
}

/// Selects and commits winners against a [`StateStore`].
pub struct DrawEngine<S> {
    store: S,
    roster: Roster,
    override_rule: Option<OverrideRule>,
    rng: Mutex<StdRng>,
}

impl<S: StateStore> DrawEngine<S> {
    /// Creates an engine with an entropy-seeded RNG.
    pub fn new(store: S, roster: Roster, override_rule: Option<OverrideRule>) -> Self {
        Self::with_rng(store, roster, override_rule, StdRng::from_entropy())
    }

    /// Creates an engine whose random selections are reproducible.
    pub fn with_seed(
        store: S,
        roster: Roster,
        override_rule: Option<OverrideRule>,
        seed: u64,
    ) -> Self {
        Self::with_rng(store, roster, override_rule, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: S, roster: Roster, override_rule: Option<OverrideRule>, rng: StdRng) -> Self {
        if let Some(rule) = override_rule {
            if !roster.contains(rule.participant_id) {
                warn!(
                    participant_id = rule.participant_id,
                    trigger_draw_index = rule.trigger_draw_index,
                    "Override participant is not in the roster; the trigger draw will fail"
                );
            }
        }

        Self {
            store,
            roster,
            override_rule,
            rng: Mutex::new(rng),
        }
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn override_rule(&self) -> Option<OverrideRule> {
        self.override_rule
    }

    /// Picks the next winner without persisting anything.
    ///
    /// # Errors
    ///
    /// - [`DrawError::NoEligibleParticipants`] if the pool is empty, or
    ///   becomes empty once the override participant is excluded.
    /// - [`DrawError::PoolExhausted`] if no tier has capacity.
    /// - [`DrawError::OverrideParticipantUnavailable`] if the trigger draw's
    ///   participant is not eligible.
    pub fn propose(&self) -> Result<Proposal, DrawError> {
        let snapshot = self.store.snapshot()?;
        let draw_index = snapshot.draw_count + 1;

        let pool = EligibilitySet::compute(&self.roster, &snapshot.winners, &snapshot.absent);
        if pool.is_empty() {
            return Err(DrawError::NoEligibleParticipants { draw_index });
        }

        let tier = allocator::active_tier(&snapshot.tiers)?;

        let winner = match self.override_rule {
            Some(rule) if rule.fires_on(draw_index) => {
                pool.get(rule.participant_id)
                    .ok_or(DrawError::OverrideParticipantUnavailable {
                        participant_id: rule.participant_id,
                        draw_index,
                    })?
            },
            Some(rule) => self.choose(&pool.without(rule.participant_id), draw_index)?,
            None => self.choose(&pool, draw_index)?,
        };

        debug!(
            participant_id = winner.id,
            tier = %tier,
            draw_index,
            eligible = pool.len(),
            "Proposed winner"
        );
        Ok(Proposal {
            winner: winner.clone(),
            tier,
            draw_index,
        })
    }

    fn choose<'a>(
        &self,
        pool: &EligibilitySet<'a>,
        draw_index: u64,
    ) -> Result<&'a Participant, DrawError> {
        // A panic mid-selection cannot leave the generator in a bad state.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        pool.as_slice()
            .choose(&mut *rng)
            .copied()
            .ok_or(DrawError::NoEligibleParticipants { draw_index })
    }

    /// Persists a win for `participant_id` in `tier` and returns the new
    /// draw count.
    ///
    /// Re-committing an already applied win fails with
    /// [`DrawError::DuplicateWinner`].
    ///
    /// # Errors
    ///
    /// [`DrawError::UnknownParticipant`], [`DrawError::DuplicateWinner`],
    /// [`DrawError::TierExhausted`], [`DrawError::TierOutOfOrder`] or a
    /// storage error.
    pub fn commit(&self, participant_id: u32, tier: PrizeTier) -> Result<u64, DrawError> {
        self.ensure_known(participant_id)?;

        let draw_count = self.store.commit_draw(participant_id, tier)?;
        info!(participant_id, tier = %tier, draw_count, "Winner accepted");
        Ok(draw_count)
    }

    /// Commits `participant_id` against whichever tier is active right now.
    ///
    /// # Errors
    ///
    /// As [`DrawEngine::commit`], plus [`DrawError::PoolExhausted`].
    pub fn commit_current(&self, participant_id: u32) -> Result<(PrizeTier, u64), DrawError> {
        self.ensure_known(participant_id)?;

        let tier = allocator::active_tier(&self.store.read_tier_status()?)?;
        let draw_count = self.commit(participant_id, tier)?;
        Ok((tier, draw_count))
    }

    /// Excludes `participant_id` from every future draw.
    ///
    /// # Errors
    ///
    /// [`DrawError::UnknownParticipant`], [`DrawError::AlreadyAbsent`] or a
    /// storage error.
    pub fn mark_absent(&self, participant_id: u32) -> Result<(), DrawError> {
        self.ensure_known(participant_id)?;

        self.store.mark_absent(participant_id)?;
        info!(participant_id, "Participant marked absent");
        Ok(())
    }

    /// Restores the initial draw state.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the reset transaction fails.
    pub fn reset(&self) -> Result<(), DrawError> {
        self.store.reset()?;
        info!("Draw state reset");
        Ok(())
    }

    /// Active tier and per-tier capacity.
    pub fn status(&self) -> Result<PrizeStatus, DrawError> {
        Ok(PrizeStatus::from_tiers(&self.store.read_tier_status()?))
    }

    pub fn winners(&self) -> Result<Vec<u32>, DrawError> {
        Ok(self.store.read_winner_ids()?.into_iter().collect())
    }

    pub fn winner_records(&self) -> Result<Vec<WinnerRecord>, DrawError> {
        Ok(self.store.read_winners()?)
    }

    pub fn absent(&self) -> Result<Vec<u32>, DrawError> {
        Ok(self.store.read_absent_ids()?.into_iter().collect())
    }

    pub fn draw_count(&self) -> Result<u64, DrawError> {
        Ok(self.store.read_draw_counter()?)
    }

    fn ensure_known(&self, participant_id: u32) -> Result<(), DrawError> {
        if self.roster.contains(participant_id) {
            Ok(())
        } else {
            Err(DrawError::UnknownParticipant { participant_id })
        }
    }
}
