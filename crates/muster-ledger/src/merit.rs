//! Merit ledger: earned and claimed points per participant.
//!
//! Accounts are created implicitly on the first credit. Both counters only
//! ever grow and `claimed_points <= earned_points` holds after every call.

use crate::bounded::{BoundedVec, OverflowPolicy};
use crate::error::{LedgerError, Result};
use crate::identity::Principal;
use std::collections::BTreeMap;

/// Most distinct bonus values remembered per account.
pub const MAX_BONUS_HISTORY: usize = 10;

/// Distinct bonus values an account has been granted.
pub type BonusHistory = BoundedVec<u64, MAX_BONUS_HISTORY>;

/// A participant's merit balance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeritAccount {
    pub owner: Principal,
    pub earned_points: u64,
    pub claimed_points: u64,
    pub bonus_history: BonusHistory,
}

impl MeritAccount {
    /// Empty account for `owner`.
    pub fn open(owner: Principal) -> Self {
        Self {
            owner,
            earned_points: 0,
            claimed_points: 0,
            bonus_history: BonusHistory::new(),
        }
    }

    /// Points earned but not yet claimed. Zero for a record claiming more
    /// than it earned.
    pub fn available(&self) -> u64 {
        self.earned_points.saturating_sub(self.claimed_points)
    }

    /// Add `points` earned under `bonus`.
    pub fn credit(&mut self, points: u64, bonus: u64, policy: OverflowPolicy) -> Result<()> {
        let earned = self
            .earned_points
            .checked_add(points)
            .ok_or_else(|| LedgerError::MeritAwardFailed("earned points overflow".into()))?;
        self.bonus_history
            .push_capped_unique(bonus, policy)
            .map_err(|_| LedgerError::CollectionFull("bonus history"))?;
        self.earned_points = earned;
        Ok(())
    }

    /// Move `points` from available to claimed.
    pub fn claim(&mut self, points: u64) -> Result<u64> {
        let available = self.available();
        if available < points {
            return Err(LedgerError::InsufficientMerits {
                available,
                requested: points,
            });
        }
        self.claimed_points += points;
        Ok(points)
    }
}

/// Owner → account map.
#[derive(Debug, Clone, Default)]
pub struct MeritLedger {
    accounts: BTreeMap<Principal, MeritAccount>,
}

impl MeritLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an account.
    pub fn get(&self, owner: &Principal) -> Option<&MeritAccount> {
        self.accounts.get(owner)
    }

    /// Copy of `owner`'s account with a credit applied, without storing it.
    pub fn staged_credit(
        &self,
        owner: &Principal,
        points: u64,
        bonus: u64,
        policy: OverflowPolicy,
    ) -> Result<MeritAccount> {
        let mut account = self
            .get(owner)
            .cloned()
            .unwrap_or_else(|| MeritAccount::open(owner.clone()));
        account.credit(points, bonus, policy)?;
        Ok(account)
    }

    /// Claim `points` from `owner`'s account.
    pub fn claim(&mut self, owner: &Principal, points: u64) -> Result<&MeritAccount> {
        let account = self
            .accounts
            .get_mut(owner)
            .ok_or_else(|| LedgerError::NotFound(format!("merit account {owner}")))?;
        account.claim(points)?;
        Ok(&*account)
    }

    /// Store an account, replacing any previous one for the same owner.
    pub(crate) fn put(&mut self, account: MeritAccount) {
        self.accounts.insert(account.owner.clone(), account);
    }

    /// Iterate in owner order.
    pub fn iter(&self) -> impl Iterator<Item = &MeritAccount> {
        self.accounts.values()
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl FromIterator<MeritAccount> for MeritLedger {
    fn from_iter<I: IntoIterator<Item = MeritAccount>>(iter: I) -> Self {
        Self {
            accounts: iter.into_iter().map(|a| (a.owner.clone(), a)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Principal {
        Principal::new("alice")
    }

    #[test]
    fn claim_walkthrough() {
        let mut account = MeritAccount::open(alice());
        account.credit(100, 0, OverflowPolicy::Drop).unwrap();

        assert_eq!(account.claim(60), Ok(60));
        assert_eq!(account.claimed_points, 60);
        assert_eq!(
            account.claim(50),
            Err(LedgerError::InsufficientMerits { available: 40, requested: 50 })
        );
        assert_eq!(account.claim(40), Ok(40));
        assert_eq!(account.available(), 0);
        assert_eq!(account.earned_points, 100);
    }

    #[test]
    fn overclaimed_record_has_nothing_available() {
        let mut account = MeritAccount::open(alice());
        account.earned_points = 5;
        account.claimed_points = 8;

        assert_eq!(account.available(), 0);
        assert_eq!(
            account.claim(1),
            Err(LedgerError::InsufficientMerits { available: 0, requested: 1 })
        );
        assert_eq!(account.claimed_points, 8);
    }

    #[test]
    fn bonus_history_is_a_set() {
        let mut account = MeritAccount::open(alice());
        account.credit(10, 3, OverflowPolicy::Drop).unwrap();
        account.credit(10, 3, OverflowPolicy::Drop).unwrap();
        account.credit(10, 0, OverflowPolicy::Drop).unwrap();
        assert_eq!(account.bonus_history.as_slice(), &[3, 0]);
        assert_eq!(account.earned_points, 30);
    }

    #[test]
    fn full_bonus_history_drops_or_rejects() {
        let mut account = MeritAccount::open(alice());
        for bonus in 0..10 {
            account.credit(1, bonus, OverflowPolicy::Drop).unwrap();
        }
        account.credit(1, 42, OverflowPolicy::Drop).unwrap();
        assert_eq!(account.bonus_history.len(), 10);
        assert_eq!(account.earned_points, 11);

        let before = account.clone();
        assert_eq!(
            account.credit(1, 43, OverflowPolicy::Reject),
            Err(LedgerError::CollectionFull("bonus history"))
        );
        assert_eq!(account, before);
    }

    #[test]
    fn staged_credit_does_not_store() {
        let ledger = MeritLedger::new();
        let staged = ledger.staged_credit(&alice(), 50, 0, OverflowPolicy::Drop).unwrap();
        assert_eq!(staged.earned_points, 50);
        assert!(ledger.get(&alice()).is_none());
    }

    #[test]
    fn claim_without_account_is_not_found() {
        let mut ledger = MeritLedger::new();
        assert!(matches!(
            ledger.claim(&alice(), 1),
            Err(LedgerError::NotFound(_))
        ));
    }
}
