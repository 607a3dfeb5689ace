//! The ledger: registries, counters and the operations that mutate them.
//!
//! Every mutating operation validates fully before it writes, so a failed
//! call leaves the ledger exactly as it found it. Successful calls return a
//! [`Receipt`] listing each record they changed; an outer layer can persist
//! those writes as one batch.

use crate::bounded::OverflowPolicy;
use crate::clock::BlockClock;
use crate::error::{LedgerError, Result};
use crate::gathering::{Gathering, GatheringId, GatheringParams, GatheringRegistry};
use crate::identity::Principal;
use crate::merit::{MeritAccount, MeritLedger};
use crate::partner::{PartnerNetwork, PartnerRegistry};
use crate::proof::{ProofId, ProofRecord, ProofRegistry};
use crate::roster::{Roster, RosterBook};
use crate::token::TokenRegistry;

/// Ledger-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedgerConfig {
    /// Behavior when a bounded list is full.
    pub overflow: OverflowPolicy,
}

/// A record changed by a successful operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum StateWrite {
    Gathering(Gathering),
    Partner(PartnerNetwork),
    Merit(MeritAccount),
    Proofs(ProofRecord),
    Roster(Roster),
    GatheringCounter { value: u64 },
    ProofCounter { value: u64 },
}

/// Outcome of a successful mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt<V> {
    /// What the operation returns to its caller.
    pub value: V,
    /// Every record the operation changed.
    pub writes: Vec<StateWrite>,
}

/// Full ledger contents: the five maps and two counters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedgerState {
    pub gatherings: Vec<Gathering>,
    pub partners: Vec<PartnerNetwork>,
    pub merits: Vec<MeritAccount>,
    pub proofs: Vec<ProofRecord>,
    pub rosters: Vec<Roster>,
    pub gathering_counter: u64,
    pub proof_counter: u64,
}

impl LedgerState {
    /// Apply a write to the snapshot.
    pub fn apply(&mut self, write: StateWrite) {
        fn upsert<R>(records: &mut Vec<R>, record: R, same: impl Fn(&R) -> bool) {
            match records.iter_mut().find(|r| same(r)) {
                Some(slot) => *slot = record,
                None => records.push(record),
            }
        }

        match write {
            StateWrite::Gathering(g) => {
                let id = g.id;
                upsert(&mut self.gatherings, g, |r| r.id == id);
            }
            StateWrite::Partner(p) => {
                let tag = p.tag.clone();
                upsert(&mut self.partners, p, |r| r.tag == tag);
            }
            StateWrite::Merit(m) => {
                let owner = m.owner.clone();
                upsert(&mut self.merits, m, |r| r.owner == owner);
            }
            StateWrite::Proofs(p) => {
                let owner = p.owner.clone();
                upsert(&mut self.proofs, p, |r| r.owner == owner);
            }
            StateWrite::Roster(r) => {
                let id = r.gathering_id;
                upsert(&mut self.rosters, r, |x| x.gathering_id == id);
            }
            StateWrite::GatheringCounter { value } => self.gathering_counter = value,
            StateWrite::ProofCounter { value } => self.proof_counter = value,
        }
    }
}

/// Counters and record counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedgerStats {
    pub gathering_counter: u64,
    pub proof_counter: u64,
    pub gatherings: usize,
    pub partners: usize,
    pub merit_accounts: usize,
    pub proof_holders: usize,
}

/// The attendance and merit ledger.
///
/// `T` mints proof tokens, `C` supplies the monotonic counter used to reject
/// gatherings scheduled in the past.
pub struct Ledger<T, C> {
    pub(crate) administrator: Principal,
    pub(crate) config: LedgerConfig,
    pub(crate) partners: PartnerRegistry,
    pub(crate) gatherings: GatheringRegistry,
    pub(crate) merits: MeritLedger,
    pub(crate) proofs: ProofRegistry,
    pub(crate) rosters: RosterBook,
    pub(crate) tokens: T,
    pub(crate) clock: C,
}

impl<T: TokenRegistry, C: BlockClock> Ledger<T, C> {
    /// Create an empty ledger administered by `administrator`.
    pub fn new(administrator: Principal, config: LedgerConfig, tokens: T, clock: C) -> Self {
        Self::restore(administrator, config, LedgerState::default(), tokens, clock)
    }

    /// Rebuild a ledger from a snapshot.
    pub fn restore(
        administrator: Principal,
        config: LedgerConfig,
        state: LedgerState,
        tokens: T,
        clock: C,
    ) -> Self {
        Self {
            administrator,
            config,
            partners: state.partners.into_iter().collect(),
            gatherings: GatheringRegistry::restore(state.gatherings, state.gathering_counter),
            merits: state.merits.into_iter().collect(),
            proofs: ProofRegistry::restore(state.proofs, state.proof_counter),
            rosters: state.rosters.into_iter().collect(),
            tokens,
            clock,
        }
    }

    /// Copy out the full contents.
    pub fn snapshot(&self) -> LedgerState {
        LedgerState {
            gatherings: self.gatherings.iter().cloned().collect(),
            partners: self.partners.iter().cloned().collect(),
            merits: self.merits.iter().cloned().collect(),
            proofs: self.proofs.iter().cloned().collect(),
            rosters: self.rosters.iter().cloned().collect(),
            gathering_counter: self.gatherings.counter(),
            proof_counter: self.proofs.counter(),
        }
    }

    // --- Authorization ---

    /// The stored administrator identity.
    pub fn administrator(&self) -> &Principal {
        &self.administrator
    }

    /// Whether `caller` is the stored administrator.
    pub fn is_administrator(&self, caller: &Principal) -> bool {
        *caller == self.administrator
    }

    fn require_administrator(&self, caller: &Principal) -> Result<()> {
        if self.is_administrator(caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized)
        }
    }

    /// Active settings.
    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    // --- Administrative operations ---

    /// Register or re-register a partner network. Returns the tag.
    pub fn register_partner(
        &mut self,
        caller: &Principal,
        tag: &str,
        multiplier: u32,
    ) -> Result<Receipt<String>> {
        self.require_administrator(caller)?;
        let network = PartnerNetwork::new(tag, multiplier)?;

        let previous = self.partners.upsert(network.clone());
        match previous {
            Some(old) => tracing::info!(
                "Partner {} multiplier {} -> {}",
                network.tag,
                old,
                network.multiplier
            ),
            None => tracing::info!(
                "Registered partner {} (x{})",
                network.tag,
                network.multiplier
            ),
        }

        Ok(Receipt {
            value: network.tag.clone(),
            writes: vec![StateWrite::Partner(network)],
        })
    }

    /// Create a gathering. Returns its id.
    pub fn create_gathering(
        &mut self,
        caller: &Principal,
        params: GatheringParams,
    ) -> Result<Receipt<GatheringId>> {
        self.require_administrator(caller)?;
        let now = self.clock.now();
        let gathering = self.gatherings.create(params, now)?.clone();

        tracing::info!(
            "Created gathering {} \"{}\" (capacity {}, {} points, {} tags)",
            gathering.id,
            gathering.title,
            gathering.capacity,
            gathering.base_points,
            gathering.network_tags.len()
        );

        Ok(Receipt {
            value: gathering.id,
            writes: vec![
                StateWrite::GatheringCounter {
                    value: self.gatherings.counter(),
                },
                StateWrite::Gathering(gathering),
            ],
        })
    }

    // --- Participant operations ---

    /// Claim `points` from the caller's unclaimed balance.
    pub fn claim_merits(&mut self, caller: &Principal, points: u64) -> Result<Receipt<u64>> {
        let account = self.merits.claim(caller, points)?.clone();
        tracing::info!(
            "{} claimed {} merits ({} of {} claimed)",
            caller,
            points,
            account.claimed_points,
            account.earned_points
        );
        Ok(Receipt {
            value: points,
            writes: vec![StateWrite::Merit(account)],
        })
    }

    // --- Reads ---

    /// Get a gathering.
    pub fn gathering(&self, id: GatheringId) -> Option<&Gathering> {
        self.gatherings.get(id)
    }

    /// All gatherings in id order.
    pub fn gatherings(&self) -> impl Iterator<Item = &Gathering> {
        self.gatherings.iter()
    }

    /// Get a partner network.
    pub fn partner(&self, tag: &str) -> Option<&PartnerNetwork> {
        self.partners.get(tag)
    }

    /// Multiplier for `tag`, 0 when unregistered.
    pub fn multiplier(&self, tag: &str) -> u32 {
        self.partners.multiplier(tag)
    }

    /// Get a participant's proof ids.
    pub fn proofs(&self, owner: &Principal) -> Option<&ProofRecord> {
        self.proofs.get(owner)
    }

    /// Get a participant's merit account.
    pub fn merits(&self, owner: &Principal) -> Option<&MeritAccount> {
        self.merits.get(owner)
    }

    /// Unclaimed points, 0 without an account.
    pub fn available_merits(&self, owner: &Principal) -> u64 {
        self.merits.get(owner).map_or(0, MeritAccount::available)
    }

    /// Get a gathering's roster.
    pub fn roster(&self, id: GatheringId) -> Option<&Roster> {
        self.rosters.get(id)
    }

    /// Owner of a proof token.
    pub fn token_owner(&self, id: ProofId) -> Option<&Principal> {
        self.tokens.owner_of(id)
    }

    /// Counters and record counts.
    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            gathering_counter: self.gatherings.counter(),
            proof_counter: self.proofs.counter(),
            gatherings: self.gatherings.len(),
            partners: self.partners.len(),
            merit_accounts: self.merits.len(),
            proof_holders: self.proofs.len(),
        }
    }

    /// The token registry.
    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    /// The token registry, mutably (for draining staged mints).
    pub fn tokens_mut(&mut self) -> &mut T {
        &mut self.tokens
    }

    /// The clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::token::MemoryTokens;

    fn admin() -> Principal {
        Principal::new("admin")
    }

    fn ledger() -> Ledger<MemoryTokens, ManualClock> {
        Ledger::new(admin(), LedgerConfig::default(), MemoryTokens::new(), ManualClock::at(1_000))
    }

    fn params(title: &str) -> GatheringParams {
        GatheringParams {
            title: title.into(),
            scheduled_at: 2_000,
            capacity: 5,
            base_points: 100,
            network_tags: vec![],
        }
    }

    #[test]
    fn only_administrator_may_register_partners() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.register_partner(&Principal::new("mallory"), "net", 2),
            Err(LedgerError::Unauthorized)
        );
        assert!(ledger.partner("net").is_none());

        let receipt = ledger.register_partner(&admin(), "net", 2).unwrap();
        assert_eq!(receipt.value, "net");
        assert_eq!(ledger.multiplier("net"), 2);
    }

    #[test]
    fn unauthorized_is_checked_before_validation() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.register_partner(&Principal::new("mallory"), "", 0),
            Err(LedgerError::Unauthorized)
        );
        assert_eq!(
            ledger.create_gathering(&Principal::new("mallory"), params("")),
            Err(LedgerError::Unauthorized)
        );
    }

    #[test]
    fn create_uses_clock() {
        let mut ledger = ledger();
        ledger.clock().set(2_000);
        assert!(matches!(
            ledger.create_gathering(&admin(), params("late")),
            Err(LedgerError::InvalidGatheringParams(_))
        ));
        assert_eq!(ledger.stats().gathering_counter, 0);
    }

    #[test]
    fn create_receipt_lists_record_and_counter() {
        let mut ledger = ledger();
        let receipt = ledger.create_gathering(&admin(), params("first")).unwrap();
        assert_eq!(receipt.value, 1);
        assert!(receipt
            .writes
            .contains(&StateWrite::GatheringCounter { value: 1 }));
        assert!(matches!(&receipt.writes[1], StateWrite::Gathering(g) if g.id == 1));
    }

    #[test]
    fn snapshot_restore_preserves_contents() {
        let mut ledger = ledger();
        ledger.register_partner(&admin(), "net", 3).unwrap();
        ledger.create_gathering(&admin(), params("a")).unwrap();
        let snapshot = ledger.snapshot();

        let restored = Ledger::restore(
            admin(),
            LedgerConfig::default(),
            snapshot.clone(),
            MemoryTokens::new(),
            ManualClock::at(1_000),
        );
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.stats().gathering_counter, 1);
    }

    #[test]
    fn replaying_writes_rebuilds_snapshot() {
        let mut ledger = ledger();
        let mut replica = LedgerState::default();

        let receipts = [
            ledger.register_partner(&admin(), "net", 3).unwrap().writes,
            ledger.register_partner(&admin(), "net", 4).unwrap().writes,
            ledger.create_gathering(&admin(), params("a")).unwrap().writes,
        ];
        for write in receipts.into_iter().flatten() {
            replica.apply(write);
        }
        assert_eq!(replica, ledger.snapshot());
    }
}
