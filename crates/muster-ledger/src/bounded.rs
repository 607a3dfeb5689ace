//! Bounded lists with an explicit overflow policy.
//!
//! Every collection-valued field in the ledger (network tags, proof ids,
//! bonus history, roster attendees) is a [`BoundedVec`] with a compile-time
//! capacity. Insertion goes through exactly two primitives:
//!
//! - [`BoundedVec::push_capped`] - append unless full
//! - [`BoundedVec::push_capped_unique`] - append unless present or full
//!
//! What "full" means is decided by the caller's [`OverflowPolicy`]: the
//! default drops the value silently, `Reject` surfaces [`Overflow`].

use std::fmt;
use thiserror::Error;

/// What to do when a value is pushed into a full list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OverflowPolicy {
    /// Leave the list unchanged and report success.
    #[default]
    Drop,
    /// Leave the list unchanged and report [`Overflow`].
    Reject,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown overflow policy: {other}")),
        }
    }
}

/// A push hit a full list under [`OverflowPolicy::Reject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("list is full ({cap} entries)")]
pub struct Overflow {
    pub cap: usize,
}

/// Loading more items than the capacity allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{len} items exceed capacity {cap}")]
pub struct CapacityExceeded {
    pub cap: usize,
    pub len: usize,
}

/// Result of a push that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pushed {
    /// The value was appended.
    Appended,
    /// The value was already present (unique pushes only).
    Present,
    /// The list was full and the value was dropped.
    Dropped,
}

impl Pushed {
    /// Whether the list changed.
    pub fn changed(self) -> bool {
        matches!(self, Pushed::Appended)
    }
}

/// An insertion-ordered list holding at most `CAP` items.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BoundedVec<T, const CAP: usize> {
    items: Vec<T>,
}

impl<T, const CAP: usize> BoundedVec<T, CAP> {
    /// Maximum number of items.
    pub const CAPACITY: usize = CAP;

    /// Create an empty list.
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if no further item can be appended.
    pub fn is_full(&self) -> bool {
        self.items.len() >= CAP
    }

    /// Items in insertion order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Append `value` unless the list is full.
    pub fn push_capped(&mut self, value: T, policy: OverflowPolicy) -> Result<Pushed, Overflow> {
        if self.is_full() {
            return match policy {
                OverflowPolicy::Drop => Ok(Pushed::Dropped),
                OverflowPolicy::Reject => Err(Overflow { cap: CAP }),
            };
        }
        self.items.push(value);
        Ok(Pushed::Appended)
    }

    /// Consume into the inner vector.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: PartialEq, const CAP: usize> BoundedVec<T, CAP> {
    /// Check membership.
    pub fn contains(&self, value: &T) -> bool {
        self.items.contains(value)
    }

    /// Append `value` unless it is already present or the list is full.
    ///
    /// Presence wins over fullness: pushing an existing value into a full
    /// list is `Present`, never an overflow.
    pub fn push_capped_unique(
        &mut self,
        value: T,
        policy: OverflowPolicy,
    ) -> Result<Pushed, Overflow> {
        if self.contains(&value) {
            return Ok(Pushed::Present);
        }
        self.push_capped(value, policy)
    }
}

impl<T, const CAP: usize> Default for BoundedVec<T, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, const CAP: usize> fmt::Debug for BoundedVec<T, CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T, const CAP: usize> TryFrom<Vec<T>> for BoundedVec<T, CAP> {
    type Error = CapacityExceeded;

    fn try_from(items: Vec<T>) -> Result<Self, Self::Error> {
        if items.len() > CAP {
            return Err(CapacityExceeded {
                cap: CAP,
                len: items.len(),
            });
        }
        Ok(Self { items })
    }
}

impl<'a, T, const CAP: usize> IntoIterator for &'a BoundedVec<T, CAP> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize, const CAP: usize> serde::Serialize for BoundedVec<T, CAP> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, T: serde::Deserialize<'de>, const CAP: usize> serde::Deserialize<'de>
    for BoundedVec<T, CAP>
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Self::try_from(items).map_err(serde::de::Error::custom)
    }
}
