//! Proof token registry seam.
//!
//! Proof tokens are non-transferable and minted exactly once per admission.
//! The ledger only needs `mint(id, owner)` to succeed or fail; where tokens
//! actually live is up to the implementation.

use crate::identity::Principal;
use crate::proof::ProofId;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a mint did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MintError {
    /// A token with this id already exists.
    #[error("token {0} already minted")]
    AlreadyMinted(ProofId),

    /// The registry refused for another reason.
    #[error("mint rejected: {0}")]
    Rejected(String),
}

/// A registry of uniquely-identified, non-transferable tokens.
pub trait TokenRegistry {
    /// Mint token `id` to `owner`. Fails if `id` is already used.
    fn mint(&mut self, id: ProofId, owner: &Principal) -> Result<(), MintError>;

    /// Owner of token `id`, if minted.
    fn owner_of(&self, id: ProofId) -> Option<&Principal>;
}

/// Tokens held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokens {
    owners: BTreeMap<ProofId, Principal>,
}

impl MemoryTokens {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from previously minted tokens.
    pub fn from_minted(minted: impl IntoIterator<Item = (ProofId, Principal)>) -> Self {
        Self {
            owners: minted.into_iter().collect(),
        }
    }

    /// Number of minted tokens.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Iterate minted tokens in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ProofId, &Principal)> {
        self.owners.iter().map(|(id, owner)| (*id, owner))
    }
}

impl TokenRegistry for MemoryTokens {
    fn mint(&mut self, id: ProofId, owner: &Principal) -> Result<(), MintError> {
        if self.owners.contains_key(&id) {
            return Err(MintError::AlreadyMinted(id));
        }
        self.owners.insert(id, owner.clone());
        Ok(())
    }

    fn owner_of(&self, id: ProofId) -> Option<&Principal> {
        self.owners.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_then_lookup() {
        let mut tokens = MemoryTokens::new();
        let alice = Principal::new("alice");
        tokens.mint(1, &alice).unwrap();
        assert_eq!(tokens.owner_of(1), Some(&alice));
        assert_eq!(tokens.owner_of(2), None);
    }

    #[test]
    fn reused_id_fails() {
        let mut tokens = MemoryTokens::from_minted([(1, Principal::new("alice"))]);
        let err = tokens.mint(1, &Principal::new("bob")).unwrap_err();
        assert_eq!(err, MintError::AlreadyMinted(1));
        assert_eq!(tokens.owner_of(1), Some(&Principal::new("alice")));
        assert_eq!(tokens.len(), 1);
    }
}
