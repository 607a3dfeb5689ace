//! Muster Ledger - attendance proofs and merit accounting
//!
//! Registers gatherings, admits participants with one non-transferable proof
//! token per admission, and keeps a points balance per participant that can
//! later be partially claimed.
//!
//! # Components
//!
//! - **Bounded lists**: every collection field has a fixed cap and an
//!   explicit [`OverflowPolicy`]
//! - **Partner registry**: network tag → bonus multiplier
//! - **Gathering registry**: validated gathering definitions and live counts
//! - **Merit ledger**: earned / claimed points and distinct bonuses seen
//! - **Proof registry**: proof token ids per participant
//! - **Rosters**: who has been admitted where (backs the duplicate check)
//! - **Admission engine**: the all-or-nothing join transaction
//!
//! # Reward
//!
//! ```text
//! credited = base_points × (1 + Σ multiplier(tag))
//! ```
//!
//! Unregistered tags contribute 0.
//!
//! # Example
//!
//! ```
//! use muster_ledger::{GatheringParams, Ledger, LedgerConfig, ManualClock, MemoryTokens, Principal};
//!
//! let admin = Principal::new("admin");
//! let mut ledger = Ledger::new(admin.clone(), LedgerConfig::default(), MemoryTokens::new(), ManualClock::at(0));
//!
//! ledger.register_partner(&admin, "gitcoin", 2).unwrap();
//! let id = ledger
//!     .create_gathering(&admin, GatheringParams {
//!         title: "Rust meetup".into(),
//!         scheduled_at: 100,
//!         capacity: 50,
//!         base_points: 10,
//!         network_tags: vec!["gitcoin".into()],
//!     })
//!     .unwrap()
//!     .value;
//!
//! let alice = Principal::new("alice");
//! let admission = ledger.join_gathering(&alice, id).unwrap().value;
//! assert_eq!(admission.credited_points, 30);
//! assert_eq!(ledger.claim_merits(&alice, 30).unwrap().value, 30);
//! ```

mod admission;
mod bounded;
mod clock;
mod error;
mod gathering;
mod identity;
mod ledger;
mod merit;
mod partner;
mod proof;
mod roster;
mod token;

pub use admission::{credited_points, Admission};
pub use bounded::{BoundedVec, CapacityExceeded, Overflow, OverflowPolicy, Pushed};
pub use clock::{BlockClock, ManualClock, SystemClock};
pub use error::{LedgerError, Result};
pub use gathering::{
    Gathering, GatheringId, GatheringParams, GatheringRegistry, NetworkTags, MAX_BASE_POINTS,
    MAX_CAPACITY, MAX_NETWORK_TAGS, MAX_TITLE_LEN,
};
pub use identity::Principal;
pub use ledger::{Ledger, LedgerConfig, LedgerState, LedgerStats, Receipt, StateWrite};
pub use merit::{BonusHistory, MeritAccount, MeritLedger, MAX_BONUS_HISTORY};
pub use partner::{
    is_valid_tag, PartnerNetwork, PartnerRegistry, MAX_MULTIPLIER, MAX_TAG_LEN, MIN_MULTIPLIER,
};
pub use proof::{ProofId, ProofIds, ProofRecord, ProofRegistry, MAX_PROOFS_PER_OWNER};
pub use roster::{Attendees, Roster, RosterBook, MAX_ATTENDEES};
pub use token::{MemoryTokens, MintError, TokenRegistry};
