//! Ledger service - one ledger, one lock, one storage.
//!
//! Mutating calls hold the write lock across validate, mint, commit and
//! persist, so operations never interleave. Each successful call's writes
//! and newly minted tokens go to storage as one batch. If that batch fails
//! the in-memory ledger is rebuilt from storage, so memory never runs ahead
//! of disk. If the rebuild fails too, the service is marked stale and
//! refuses mutations until a later rebuild succeeds.
//!
//! Signed callers carry a nonce. It must exceed the last one accepted for
//! that principal, and is stored in the same batch as the operation, or on
//! its own when the ledger rejects the operation, so a captured request
//! cannot be played again.

use crate::auth::Caller;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::tokens::StoredTokens;
use muster_ledger::{
    Admission, Gathering, GatheringId, GatheringParams, Ledger, LedgerConfig, LedgerStats,
    MeritAccount, PartnerNetwork, Principal, ProofId, ProofRecord, Receipt, Roster, SystemClock,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// The ledger as the node runs it.
pub type NodeLedger = Ledger<StoredTokens, SystemClock>;

/// Everything the lock guards.
struct Book {
    ledger: NodeLedger,
    /// Highest request nonce accepted per principal.
    nonces: HashMap<Principal, u64>,
    /// Memory may hold writes storage never got.
    stale: bool,
}

/// Shared ledger plus its storage.
pub struct LedgerService {
    book: RwLock<Book>,
    storage: Arc<Storage>,
    administrator: Principal,
    config: LedgerConfig,
}

impl LedgerService {
    /// Load the ledger from storage.
    pub fn load(storage: Arc<Storage>, administrator: Principal, config: LedgerConfig) -> Result<Self> {
        let book = build_book(&storage, &administrator, config)?;
        let stats = book.ledger.stats();
        tracing::info!(
            "Loaded ledger: {} gatherings, {} partners, {} accounts, {} proofs issued",
            stats.gatherings,
            stats.partners,
            stats.merit_accounts,
            stats.proof_counter
        );
        Ok(Self {
            book: RwLock::new(book),
            storage,
            administrator,
            config,
        })
    }

    /// The administrator principal.
    pub fn administrator(&self) -> &Principal {
        &self.administrator
    }

    // --- Mutations ---

    /// Register or update a partner network.
    pub async fn register_partner(
        &self,
        caller: &Caller,
        tag: &str,
        multiplier: u32,
    ) -> Result<String> {
        let mut book = self.writable(caller).await?;
        let outcome = book.ledger.register_partner(&caller.principal, tag, multiplier);
        self.settle(&mut book, caller, "register_partner", outcome)
    }

    /// Create a gathering.
    pub async fn create_gathering(
        &self,
        caller: &Caller,
        params: GatheringParams,
    ) -> Result<GatheringId> {
        let mut book = self.writable(caller).await?;
        let outcome = book.ledger.create_gathering(&caller.principal, params);
        self.settle(&mut book, caller, "create_gathering", outcome)
    }

    /// Admit the caller to a gathering.
    pub async fn join_gathering(&self, caller: &Caller, id: GatheringId) -> Result<Admission> {
        let mut book = self.writable(caller).await?;
        let outcome = book.ledger.join_gathering(&caller.principal, id);
        self.settle(&mut book, caller, "join_gathering", outcome)
    }

    /// Claim merits for the caller.
    pub async fn claim_merits(&self, caller: &Caller, points: u64) -> Result<u64> {
        let mut book = self.writable(caller).await?;
        let outcome = book.ledger.claim_merits(&caller.principal, points);
        self.settle(&mut book, caller, "claim_merits", outcome)
    }

    /// Take the write lock for `caller`: the ledger must match storage and
    /// the caller's nonce must be fresh.
    async fn writable(&self, caller: &Caller) -> Result<RwLockWriteGuard<'_, Book>> {
        let mut book = self.book.write().await;

        if book.stale {
            self.reload(&mut book);
            if book.stale {
                return Err(Error::Storage(
                    "ledger is out of sync with storage; refusing writes".into(),
                ));
            }
            tracing::info!("Ledger reloaded; accepting writes again");
        }

        if let Some(nonce) = caller.nonce {
            if let Some(&last) = book.nonces.get(&caller.principal) {
                if nonce <= last {
                    return Err(Error::Auth(format!(
                        "nonce {} already used (last accepted {})",
                        nonce, last
                    )));
                }
            }
        }

        Ok(book)
    }

    fn settle<V>(
        &self,
        book: &mut Book,
        caller: &Caller,
        op: &str,
        outcome: muster_ledger::Result<Receipt<V>>,
    ) -> Result<V> {
        let nonce = caller.nonce.map(|n| (&caller.principal, n));

        let (receipt, minted) = match outcome {
            Ok(receipt) => {
                let minted = book.ledger.tokens_mut().take_pending();
                (receipt, minted)
            }
            Err(e) => {
                tracing::debug!("{} rejected: {}", op, e);
                // A rejected request still spends its nonce.
                if let Some((principal, n)) = nonce {
                    match self.storage.commit(&[], &[], nonce) {
                        Ok(()) => {
                            book.nonces.insert(principal.clone(), n);
                        }
                        Err(store) => tracing::warn!("{}: storing nonce failed: {}", op, store),
                    }
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.storage.commit(&receipt.writes, &minted, nonce) {
            tracing::error!("{}: persisting failed, reloading ledger: {}", op, e);
            self.reload(book);
            return Err(e);
        }

        if let Some((principal, n)) = nonce {
            book.nonces.insert(principal.clone(), n);
        }
        Ok(receipt.value)
    }

    /// Rebuild memory from storage, or mark the book stale.
    fn reload(&self, book: &mut Book) {
        match build_book(&self.storage, &self.administrator, self.config) {
            Ok(fresh) => *book = fresh,
            Err(e) => {
                tracing::error!("Ledger reload failed, refusing writes: {}", e);
                book.stale = true;
            }
        }
    }

    // --- Reads ---

    /// Get a gathering.
    pub async fn gathering(&self, id: GatheringId) -> Option<Gathering> {
        self.book.read().await.ledger.gathering(id).cloned()
    }

    /// All gatherings in id order.
    pub async fn gatherings(&self) -> Vec<Gathering> {
        self.book.read().await.ledger.gatherings().cloned().collect()
    }

    /// Get a partner network.
    pub async fn partner(&self, tag: &str) -> Option<PartnerNetwork> {
        self.book.read().await.ledger.partner(tag).cloned()
    }

    /// Get a proof record.
    pub async fn proofs(&self, owner: &Principal) -> Option<ProofRecord> {
        self.book.read().await.ledger.proofs(owner).cloned()
    }

    /// Get a merit account.
    pub async fn merits(&self, owner: &Principal) -> Option<MeritAccount> {
        self.book.read().await.ledger.merits(owner).cloned()
    }

    /// Get a roster.
    pub async fn roster(&self, id: GatheringId) -> Option<Roster> {
        self.book.read().await.ledger.roster(id).cloned()
    }

    /// Owner of a proof token.
    pub async fn token_owner(&self, id: ProofId) -> Option<Principal> {
        self.book.read().await.ledger.token_owner(id).cloned()
    }

    /// Counters and record counts.
    pub async fn stats(&self) -> LedgerStats {
        self.book.read().await.ledger.stats()
    }
}

fn build_book(storage: &Storage, administrator: &Principal, config: LedgerConfig) -> Result<Book> {
    let state = storage.load_state()?;
    let tokens = StoredTokens::restore(storage.load_tokens()?);
    if tokens.len() as u64 != state.proof_counter {
        return Err(Error::Storage(format!(
            "{} tokens stored but proof counter is {}",
            tokens.len(),
            state.proof_counter
        )));
    }
    let ledger = Ledger::restore(
        administrator.clone(),
        config,
        state,
        tokens,
        SystemClock::new(),
    );
    Ok(Book {
        ledger,
        nonces: storage.load_nonces()?.into_iter().collect(),
        stale: false,
    })
}
