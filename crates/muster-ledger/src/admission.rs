//! Admission engine: one participant joins one gathering.
//!
//! # Order of checks
//!
//! 1. Gathering exists (`NotFound`)
//! 2. `admitted_count < capacity` (`CapacityReached`)
//! 3. Caller not on the roster (`DuplicateRegistration`)
//!
//! # Reward
//!
//! ```text
//! bonus    = Σ multiplier(tag)  for tag in gathering.network_tags
//! credited = base_points × (1 + bonus)
//! ```
//!
//! # Atomicity
//!
//! Every record the admission touches (merit account, proof record, roster,
//! gathering) is first built as a staged copy. The token is minted last, and
//! only after the mint succeeds are the staged copies and the proof counter
//! committed. A failed mint therefore leaves no trace.

use crate::clock::BlockClock;
use crate::error::{LedgerError, Result};
use crate::gathering::GatheringId;
use crate::identity::Principal;
use crate::ledger::{Ledger, Receipt, StateWrite};
use crate::proof::ProofId;
use crate::token::TokenRegistry;

/// What a successful admission produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Admission {
    pub gathering_id: GatheringId,
    pub proof_id: ProofId,
    pub bonus: u64,
    pub credited_points: u64,
}

/// `base_points × (1 + bonus)`, or `None` on overflow.
pub fn credited_points(base_points: u64, bonus: u64) -> Option<u64> {
    bonus.checked_add(1)?.checked_mul(base_points)
}

impl<T: TokenRegistry, C: BlockClock> Ledger<T, C> {
    /// Admit `caller` to gathering `id`, mint a proof token and credit merits.
    pub fn join_gathering(
        &mut self,
        caller: &Principal,
        id: GatheringId,
    ) -> Result<Receipt<Admission>> {
        let policy = self.config.overflow;
        let gathering = self
            .gatherings
            .get(id)
            .ok_or_else(|| LedgerError::gathering_not_found(id))?;

        if !gathering.has_room() {
            return Err(LedgerError::CapacityReached(id));
        }
        if self.rosters.is_attending(id, caller) {
            return Err(LedgerError::DuplicateRegistration(id));
        }

        let bonus = self.partners.bonus(&gathering.network_tags);
        let credited = credited_points(gathering.base_points, bonus)
            .ok_or_else(|| LedgerError::MeritAwardFailed("credited points overflow".into()))?;

        let mut admitted = gathering.clone();
        admitted.admitted_count += 1;

        let account = self.merits.staged_credit(caller, credited, bonus, policy)?;
        let proof_id = self.proofs.next_id()?;
        let record = self.proofs.staged_append(caller, proof_id, policy)?;
        let roster = self.rosters.staged_insert(id, caller, policy)?;

        self.tokens
            .mint(proof_id, caller)
            .map_err(|e| LedgerError::proof_not_minted(proof_id, e))?;

        self.merits.put(account.clone());
        self.proofs.commit(record.clone(), proof_id);
        self.rosters.put(roster.clone());
        self.gatherings.replace(admitted.clone());

        tracing::info!(
            "Admitted {} to gathering {} (proof {}, bonus {}, +{} merits, {}/{})",
            caller,
            id,
            proof_id,
            bonus,
            credited,
            admitted.admitted_count,
            admitted.capacity
        );

        Ok(Receipt {
            value: Admission {
                gathering_id: id,
                proof_id,
                bonus,
                credited_points: credited,
            },
            writes: vec![
                StateWrite::Merit(account),
                StateWrite::ProofCounter { value: proof_id },
                StateWrite::Proofs(record),
                StateWrite::Roster(roster),
                StateWrite::Gathering(admitted),
            ],
        })
    }
}
