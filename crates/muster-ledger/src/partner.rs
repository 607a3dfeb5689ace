//! Partner network registry.
//!
//! Maps a network tag to the bonus multiplier it contributes to any
//! gathering carrying that tag. Unregistered tags contribute nothing.

use crate::error::{LedgerError, Result};
use std::collections::BTreeMap;

/// Longest accepted network tag, in characters.
pub const MAX_TAG_LEN: usize = 20;

/// Smallest accepted multiplier.
pub const MIN_MULTIPLIER: u32 = 1;

/// Largest accepted multiplier.
pub const MAX_MULTIPLIER: u32 = 5;

/// A registered partner network.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartnerNetwork {
    /// Unique tag (1-20 chars)
    pub tag: String,
    /// Bonus multiplier (1-5)
    pub multiplier: u32,
}

/// Check that a tag is 1..=MAX_TAG_LEN characters.
pub fn is_valid_tag(tag: &str) -> bool {
    let len = tag.chars().count();
    (1..=MAX_TAG_LEN).contains(&len)
}

impl PartnerNetwork {
    /// Validate and build a partner entry.
    ///
    /// Tag problems are reported before multiplier problems.
    pub fn new(tag: impl Into<String>, multiplier: u32) -> Result<Self> {
        let tag = tag.into();
        if !is_valid_tag(&tag) {
            return Err(LedgerError::InvalidNetworkTag(tag));
        }
        if !(MIN_MULTIPLIER..=MAX_MULTIPLIER).contains(&multiplier) {
            return Err(LedgerError::InvalidGatheringParams(format!(
                "multiplier {multiplier} outside {MIN_MULTIPLIER}..={MAX_MULTIPLIER}"
            )));
        }
        Ok(Self { tag, multiplier })
    }
}

/// Tag → multiplier table.
#[derive(Debug, Clone, Default)]
pub struct PartnerRegistry {
    networks: BTreeMap<String, PartnerNetwork>,
}

impl PartnerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. Returns the previous multiplier, if any.
    pub fn upsert(&mut self, network: PartnerNetwork) -> Option<u32> {
        self.networks
            .insert(network.tag.clone(), network)
            .map(|prev| prev.multiplier)
    }

    /// Get a partner by tag.
    pub fn get(&self, tag: &str) -> Option<&PartnerNetwork> {
        self.networks.get(tag)
    }

    /// Multiplier for `tag`, or 0 when unregistered.
    pub fn multiplier(&self, tag: &str) -> u32 {
        self.get(tag).map_or(0, |n| n.multiplier)
    }

    /// Cross-network bonus: the sum of multipliers over `tags`.
    pub fn bonus<'a>(&self, tags: impl IntoIterator<Item = &'a String>) -> u64 {
        tags.into_iter()
            .map(|tag| u64::from(self.multiplier(tag)))
            .sum()
    }

    /// Iterate partners in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &PartnerNetwork> {
        self.networks.values()
    }

    /// Number of partners.
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl FromIterator<PartnerNetwork> for PartnerRegistry {
    fn from_iter<I: IntoIterator<Item = PartnerNetwork>>(iter: I) -> Self {
        Self {
            networks: iter.into_iter().map(|n| (n.tag.clone(), n)).collect(),
        }
    }
}
