//! Proof registry: which proof tokens each participant holds.

use crate::bounded::{BoundedVec, OverflowPolicy};
use crate::error::{LedgerError, Result};
use crate::identity::Principal;
use std::collections::BTreeMap;

/// Proof token identifier.
pub type ProofId = u64;

/// Most proof ids recorded per participant.
pub const MAX_PROOFS_PER_OWNER: usize = 100;

/// A participant's proof ids in admission order.
pub type ProofIds = BoundedVec<ProofId, MAX_PROOFS_PER_OWNER>;

/// Proofs held by one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProofRecord {
    pub owner: Principal,
    pub proof_ids: ProofIds,
}

/// Owner → proof record map plus the proof id counter.
#[derive(Debug, Clone, Default)]
pub struct ProofRegistry {
    records: BTreeMap<Principal, ProofRecord>,
    counter: u64,
}

impl ProofRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from stored records and counter.
    pub fn restore(records: impl IntoIterator<Item = ProofRecord>, counter: u64) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.owner.clone(), r)).collect(),
            counter,
        }
    }

    /// Get a participant's record.
    pub fn get(&self, owner: &Principal) -> Option<&ProofRecord> {
        self.records.get(owner)
    }

    /// The id the next admission will receive. Does not advance the counter.
    pub fn next_id(&self) -> Result<ProofId> {
        self.counter
            .checked_add(1)
            .ok_or_else(|| LedgerError::MeritAwardFailed("proof counter exhausted".into()))
    }

    /// Copy of `owner`'s record with `id` appended, without storing it.
    pub fn staged_append(
        &self,
        owner: &Principal,
        id: ProofId,
        policy: OverflowPolicy,
    ) -> Result<ProofRecord> {
        let mut record = self.get(owner).cloned().unwrap_or_else(|| ProofRecord {
            owner: owner.clone(),
            proof_ids: ProofIds::new(),
        });
        record
            .proof_ids
            .push_capped(id, policy)
            .map_err(|_| LedgerError::CollectionFull("proof record"))?;
        Ok(record)
    }

    /// Store `record` and advance the counter to `issued`.
    pub(crate) fn commit(&mut self, record: ProofRecord, issued: ProofId) {
        self.records.insert(record.owner.clone(), record);
        self.counter = issued;
    }

    /// Last issued proof id (0 before the first admission).
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Iterate in owner order.
    pub fn iter(&self) -> impl Iterator<Item = &ProofRecord> {
        self.records.values()
    }

    /// Number of participants holding proofs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_is_peek_only() {
        let registry = ProofRegistry::new();
        assert_eq!(registry.next_id(), Ok(1));
        assert_eq!(registry.next_id(), Ok(1));
        assert_eq!(registry.counter(), 0);
    }

    #[test]
    fn commit_advances_counter() {
        let mut registry = ProofRegistry::new();
        let bob = Principal::new("bob");
        let record = registry.staged_append(&bob, 1, OverflowPolicy::Drop).unwrap();
        registry.commit(record, 1);
        assert_eq!(registry.counter(), 1);
        assert_eq!(registry.next_id(), Ok(2));
        assert_eq!(registry.get(&bob).unwrap().proof_ids.as_slice(), &[1]);
    }

    #[test]
    fn full_record_drops_new_ids() {
        let bob = Principal::new("bob");
        let full = ProofIds::try_from((1..=100).collect::<Vec<_>>()).unwrap();
        let registry = ProofRegistry::restore(
            [ProofRecord { owner: bob.clone(), proof_ids: full }],
            100,
        );

        let dropped = registry.staged_append(&bob, 101, OverflowPolicy::Drop).unwrap();
        assert_eq!(dropped.proof_ids.len(), 100);
        assert!(!dropped.proof_ids.contains(&101));

        assert_eq!(
            registry.staged_append(&bob, 101, OverflowPolicy::Reject),
            Err(LedgerError::CollectionFull("proof record"))
        );
    }
}
