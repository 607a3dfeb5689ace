//! Gathering rosters.
//!
//! The admission engine is the only writer: each successful admission adds
//! the caller to the gathering's attendee set, and the duplicate check reads
//! the same set.

use crate::bounded::{BoundedVec, OverflowPolicy};
use crate::error::{LedgerError, Result};
use crate::gathering::GatheringId;
use crate::identity::Principal;
use std::collections::BTreeMap;

/// Most attendees one roster holds (matches the largest capacity).
pub const MAX_ATTENDEES: usize = 1000;

/// Attendee set in admission order.
pub type Attendees = BoundedVec<Principal, MAX_ATTENDEES>;

/// Who has been admitted to a gathering.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Roster {
    pub gathering_id: GatheringId,
    pub attendees: Attendees,
}

/// Gathering id → roster map.
#[derive(Debug, Clone, Default)]
pub struct RosterBook {
    rosters: BTreeMap<GatheringId, Roster>,
}

impl RosterBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a gathering's roster.
    pub fn get(&self, gathering_id: GatheringId) -> Option<&Roster> {
        self.rosters.get(&gathering_id)
    }

    /// Whether `who` has been admitted to `gathering_id`.
    pub fn is_attending(&self, gathering_id: GatheringId, who: &Principal) -> bool {
        self.get(gathering_id)
            .is_some_and(|roster| roster.attendees.contains(who))
    }

    /// Copy of the roster with `who` added, without storing it.
    pub fn staged_insert(
        &self,
        gathering_id: GatheringId,
        who: &Principal,
        policy: OverflowPolicy,
    ) -> Result<Roster> {
        let mut roster = self.get(gathering_id).cloned().unwrap_or_else(|| Roster {
            gathering_id,
            attendees: Attendees::new(),
        });
        roster
            .attendees
            .push_capped_unique(who.clone(), policy)
            .map_err(|_| LedgerError::CollectionFull("roster"))?;
        Ok(roster)
    }

    /// Store a roster.
    pub(crate) fn put(&mut self, roster: Roster) {
        self.rosters.insert(roster.gathering_id, roster);
    }

    /// Iterate in gathering order.
    pub fn iter(&self) -> impl Iterator<Item = &Roster> {
        self.rosters.values()
    }

    /// Number of rosters.
    pub fn len(&self) -> usize {
        self.rosters.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.rosters.is_empty()
    }
}

impl FromIterator<Roster> for RosterBook {
    fn from_iter<I: IntoIterator<Item = Roster>>(iter: I) -> Self {
        Self {
            rosters: iter.into_iter().map(|r| (r.gathering_id, r)).collect(),
        }
    }
}
