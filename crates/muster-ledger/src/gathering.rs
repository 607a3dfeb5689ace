//! Gathering registry.
//!
//! A gathering is created once by the administrator, never deleted, and only
//! its `admitted_count` changes afterwards. Ids are assigned sequentially from
//! 1 by the registry's counter, which advances only on a successful create.

use crate::bounded::{BoundedVec, OverflowPolicy};
use crate::error::{LedgerError, Result};
use crate::partner::is_valid_tag;
use std::collections::BTreeMap;

/// Gathering identifier.
pub type GatheringId = u64;

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 50;

/// Most network tags one gathering may carry.
pub const MAX_NETWORK_TAGS: usize = 10;

/// Largest accepted capacity.
pub const MAX_CAPACITY: u32 = 1000;

/// Largest accepted base reward.
pub const MAX_BASE_POINTS: u64 = 10_000;

/// A gathering's partner tags, in the order first supplied.
pub type NetworkTags = BoundedVec<String, MAX_NETWORK_TAGS>;

/// Creation request for a gathering.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GatheringParams {
    pub title: String,
    pub scheduled_at: u64,
    pub capacity: u32,
    pub base_points: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub network_tags: Vec<String>,
}

impl GatheringParams {
    /// Validate against the current clock value.
    ///
    /// Checks run in a fixed order (title, tag count, schedule, capacity,
    /// base points, tag lengths) and the first failure is returned. On
    /// success the tags are returned as an ordered set.
    pub fn validate(&self, now: u64) -> Result<NetworkTags> {
        let title_len = self.title.chars().count();
        if !(1..=MAX_TITLE_LEN).contains(&title_len) {
            return Err(invalid(format!(
                "title length {title_len} outside 1..={MAX_TITLE_LEN}"
            )));
        }
        if self.network_tags.len() > MAX_NETWORK_TAGS {
            return Err(invalid(format!(
                "{} network tags exceed {MAX_NETWORK_TAGS}",
                self.network_tags.len()
            )));
        }
        if self.scheduled_at <= now {
            return Err(invalid(format!(
                "scheduled_at {} is not after {now}",
                self.scheduled_at
            )));
        }
        if !(1..=MAX_CAPACITY).contains(&self.capacity) {
            return Err(invalid(format!(
                "capacity {} outside 1..={MAX_CAPACITY}",
                self.capacity
            )));
        }
        if !(1..=MAX_BASE_POINTS).contains(&self.base_points) {
            return Err(invalid(format!(
                "base_points {} outside 1..={MAX_BASE_POINTS}",
                self.base_points
            )));
        }

        let mut tags = NetworkTags::new();
        for tag in &self.network_tags {
            if !is_valid_tag(tag) {
                return Err(invalid(format!("network tag {tag:?}")));
            }
            // Count was checked above, so this never drops.
            tags.push_capped_unique(tag.clone(), OverflowPolicy::Drop)
                .map_err(|e| invalid(e.to_string()))?;
        }
        Ok(tags)
    }
}

fn invalid(reason: String) -> LedgerError {
    LedgerError::InvalidGatheringParams(reason)
}

/// A registered gathering.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gathering {
    pub id: GatheringId,
    pub title: String,
    pub scheduled_at: u64,
    pub capacity: u32,
    pub admitted_count: u32,
    pub base_points: u64,
    pub network_tags: NetworkTags,
}

impl Gathering {
    /// Whether another participant can be admitted.
    pub fn has_room(&self) -> bool {
        self.admitted_count < self.capacity
    }

    /// Seats left.
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.admitted_count)
    }
}

/// Id → gathering map plus the id counter.
#[derive(Debug, Clone, Default)]
pub struct GatheringRegistry {
    gatherings: BTreeMap<GatheringId, Gathering>,
    counter: u64,
}

impl GatheringRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from stored records and counter.
    pub fn restore(gatherings: impl IntoIterator<Item = Gathering>, counter: u64) -> Self {
        Self {
            gatherings: gatherings.into_iter().map(|g| (g.id, g)).collect(),
            counter,
        }
    }

    /// Validate `params` and register a new gathering.
    ///
    /// Nothing is written unless every check passes.
    pub fn create(&mut self, params: GatheringParams, now: u64) -> Result<&Gathering> {
        let network_tags = params.validate(now)?;
        let id = self
            .counter
            .checked_add(1)
            .ok_or_else(|| invalid("gathering counter exhausted".into()))?;

        let gathering = Gathering {
            id,
            title: params.title,
            scheduled_at: params.scheduled_at,
            capacity: params.capacity,
            admitted_count: 0,
            base_points: params.base_points,
            network_tags,
        };
        self.counter = id;
        let stored = self.gatherings.entry(id).or_insert(gathering);
        Ok(&*stored)
    }

    /// Get a gathering by id.
    pub fn get(&self, id: GatheringId) -> Option<&Gathering> {
        self.gatherings.get(&id)
    }

    /// Replace a stored gathering with an updated copy of itself.
    pub(crate) fn replace(&mut self, gathering: Gathering) {
        self.gatherings.insert(gathering.id, gathering);
    }

    /// Last assigned id (0 before the first create).
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Iterate in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Gathering> {
        self.gatherings.values()
    }

    /// Number of gatherings.
    pub fn len(&self) -> usize {
        self.gatherings.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.gatherings.is_empty()
    }
}
