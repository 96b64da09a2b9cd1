//! The pool of participants eligible for the next draw.

use std::collections::BTreeSet;

use crate::roster::{Participant, Roster};

/// Roster minus prior winners and absent participants, in roster order.
///
/// A participant present in either set is excluded, even if they appear in
/// both.
#[derive(Debug, Clone)]
pub struct EligibilitySet<'a> {
    pool: Vec<&'a Participant>,
}

impl<'a> EligibilitySet<'a> {
    #[must_use]
    pub fn compute(roster: &'a Roster, winners: &BTreeSet<u32>, absent: &BTreeSet<u32>) -> Self {
        let pool = roster
            .iter()
            .filter(|p| !winners.contains(&p.id) && !absent.contains(&p.id))
            .collect();
        Self { pool }
    }

    /// The same pool with `id` removed.
    #[must_use]
    pub fn without(&self, id: u32) -> Self {
        Self {
            pool: self.pool.iter().copied().filter(|p| p.id != id).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&'a Participant> {
        self.pool.iter().copied().find(|p| p.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[&'a Participant] {
        &self.pool
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
