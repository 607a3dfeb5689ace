//! Proof token registry backed by node storage.
//!
//! Mints land in memory immediately (so the ledger sees them) and are queued
//! until the service writes them in the same batch as the ledger records.

use muster_ledger::{MemoryTokens, MintError, Principal, ProofId, TokenRegistry};

/// Token registry whose new mints are drained into a storage batch.
#[derive(Debug, Default)]
pub struct StoredTokens {
    minted: MemoryTokens,
    pending: Vec<(ProofId, Principal)>,
}

impl StoredTokens {
    /// Restore from tokens already in storage.
    pub fn restore(minted: Vec<(ProofId, Principal)>) -> Self {
        Self {
            minted: MemoryTokens::from_minted(minted),
            pending: Vec::new(),
        }
    }

    /// Mints not yet written to storage.
    pub fn take_pending(&mut self) -> Vec<(ProofId, Principal)> {
        std::mem::take(&mut self.pending)
    }

    /// Number of minted tokens, written or not.
    pub fn len(&self) -> usize {
        self.minted.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.minted.is_empty()
    }
}

impl TokenRegistry for StoredTokens {
    fn mint(&mut self, id: ProofId, owner: &Principal) -> Result<(), MintError> {
        self.minted.mint(id, owner)?;
        self.pending.push((id, owner.clone()));
        Ok(())
    }

    fn owner_of(&self, id: ProofId) -> Option<&Principal> {
        self.minted.owner_of(id)
    }
}
