//! Persistent storage using RocksDB.
//!
//! Keys are string-prefixed, values are JSON:
//!
//! | key                      | value            |
//! |--------------------------|------------------|
//! | `gathering:{id:020}`     | `Gathering`      |
//! | `partner:{tag}`          | `PartnerNetwork` |
//! | `merit:{principal}`      | `MeritAccount`   |
//! | `proofs:{principal}`     | `ProofRecord`    |
//! | `roster:{id:020}`        | `Roster`         |
//! | `token:{id:020}`         | `Principal`      |
//! | `counter:gathering`      | `u64`            |
//! | `counter:proof`          | `u64`            |
//! | `nonce:{principal}`      | `u64`            |
//! | `node:signing_key`       | raw 32 bytes     |
//!
//! Ids are zero-padded so prefix scans come back in id order.

use crate::error::{Error, Result};
use ed25519_dalek::SigningKey;
use muster_ledger::{GatheringId, LedgerState, PartnerNetwork, Principal, ProofId, StateWrite};
use rocksdb::{Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const GATHERING_COUNTER: &str = "counter:gathering";
const PROOF_COUNTER: &str = "counter:proof";

fn gathering_key(id: GatheringId) -> String {
    format!("gathering:{:020}", id)
}

fn partner_key(tag: &str) -> String {
    format!("partner:{}", tag)
}

fn merit_key(owner: &Principal) -> String {
    format!("merit:{}", owner)
}

fn proofs_key(owner: &Principal) -> String {
    format!("proofs:{}", owner)
}

fn roster_key(id: GatheringId) -> String {
    format!("roster:{:020}", id)
}

fn token_key(id: ProofId) -> String {
    format!("token:{:020}", id)
}

fn nonce_key(owner: &Principal) -> String {
    format!("nonce:{}", owner)
}

/// Storage backend for ledger data.
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let prefix = prefix.as_bytes();
        let mut records = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            records.push(serde_json::from_slice(&value)?);
        }

        Ok(records)
    }

    // --- Ledger records ---

    /// Get a partner network by tag.
    pub fn get_partner(&self, tag: &str) -> Result<Option<PartnerNetwork>> {
        self.get_json(&partner_key(tag))
    }

    /// Load the full ledger contents.
    pub fn load_state(&self) -> Result<LedgerState> {
        Ok(LedgerState {
            gatherings: self.scan("gathering:")?,
            partners: self.scan("partner:")?,
            merits: self.scan("merit:")?,
            proofs: self.scan("proofs:")?,
            rosters: self.scan("roster:")?,
            gathering_counter: self.get_json(GATHERING_COUNTER)?.unwrap_or(0),
            proof_counter: self.get_json(PROOF_COUNTER)?.unwrap_or(0),
        })
    }

    // --- Tokens ---

    /// Owner of a minted proof token.
    pub fn token_owner(&self, id: ProofId) -> Result<Option<Principal>> {
        self.get_json(&token_key(id))
    }

    /// All minted tokens in id order.
    pub fn load_tokens(&self) -> Result<Vec<(ProofId, Principal)>> {
        let prefix = b"token:";
        let mut tokens = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let id = String::from_utf8_lossy(&key[prefix.len()..])
                .parse::<ProofId>()
                .map_err(|e| Error::Storage(format!("bad token key: {}", e)))?;
            tokens.push((id, serde_json::from_slice(&value)?));
        }

        Ok(tokens)
    }

    // --- Request nonces ---

    /// Last accepted request nonce per principal.
    pub fn load_nonces(&self) -> Result<Vec<(Principal, u64)>> {
        let prefix = b"nonce:";
        let mut nonces = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let owner = String::from_utf8(key[prefix.len()..].to_vec())
                .map_err(|e| Error::Storage(format!("bad nonce key: {}", e)))?;
            nonces.push((Principal::new(owner), serde_json::from_slice(&value)?));
        }

        Ok(nonces)
    }

    // --- Commit ---

    /// Write an operation's records, minted tokens and the caller's request
    /// nonce as one atomic batch.
    pub fn commit(
        &self,
        writes: &[StateWrite],
        minted: &[(ProofId, Principal)],
        nonce: Option<(&Principal, u64)>,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        for write in writes {
            let (key, value) = match write {
                StateWrite::Gathering(g) => (gathering_key(g.id), to_json(g)?),
                StateWrite::Partner(p) => (partner_key(&p.tag), to_json(p)?),
                StateWrite::Merit(m) => (merit_key(&m.owner), to_json(m)?),
                StateWrite::Proofs(p) => (proofs_key(&p.owner), to_json(p)?),
                StateWrite::Roster(r) => (roster_key(r.gathering_id), to_json(r)?),
                StateWrite::GatheringCounter { value } => {
                    (GATHERING_COUNTER.to_string(), to_json(value)?)
                }
                StateWrite::ProofCounter { value } => (PROOF_COUNTER.to_string(), to_json(value)?),
            };
            batch.put(key.as_bytes(), value);
        }

        for (id, owner) in minted {
            batch.put(token_key(*id).as_bytes(), to_json(owner)?);
        }

        if let Some((owner, nonce)) = nonce {
            batch.put(nonce_key(owner).as_bytes(), to_json(&nonce)?);
        }

        self.db.write(batch)?;
        Ok(())
    }

    // --- Node Identity ---

    /// Get or create the node's signing key (persistent identity).
    pub fn get_or_create_node_key(&self) -> Result<SigningKey> {
        let key = b"node:signing_key";

        if let Some(data) = self.db.get(key)? {
            let bytes: [u8; 32] = data
                .as_slice()
                .try_into()
                .map_err(|_| Error::Storage("Invalid stored key".into()))?;
            Ok(SigningKey::from_bytes(&bytes))
        } else {
            let mut rng = rand::thread_rng();
            let signing_key = SigningKey::generate(&mut rng);
            self.db.put(key, signing_key.as_bytes())?;
            Ok(signing_key)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}
