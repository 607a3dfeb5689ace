//! End-to-end behavior of the ledger's public operations.

use muster_ledger::{
    GatheringParams, Ledger, LedgerConfig, LedgerError, ManualClock, MemoryTokens,
    OverflowPolicy, Principal,
};

type TestLedger = Ledger<MemoryTokens, ManualClock>;

const NOW: u64 = 500;

fn admin() -> Principal {
    Principal::new("admin")
}

fn who(name: &str) -> Principal {
    Principal::new(name)
}

fn ledger() -> TestLedger {
    ledger_with(OverflowPolicy::Drop)
}

fn ledger_with(overflow: OverflowPolicy) -> TestLedger {
    Ledger::new(
        admin(),
        LedgerConfig { overflow },
        MemoryTokens::new(),
        ManualClock::at(NOW),
    )
}

fn params(capacity: u32, base_points: u64, tags: &[&str]) -> GatheringParams {
    GatheringParams {
        title: "Community call".into(),
        scheduled_at: NOW + 100,
        capacity,
        base_points,
        network_tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn create(ledger: &mut TestLedger, p: GatheringParams) -> u64 {
    ledger.create_gathering(&admin(), p).unwrap().value
}

#[test]
fn gathering_ids_follow_counter() {
    let mut ledger = ledger();
    for expected in 1..=5 {
        let before = ledger.stats().gathering_counter;
        let id = create(&mut ledger, params(10, 10, &[]));
        assert_eq!(id, before + 1);
        assert_eq!(id, expected);
    }
}

#[test]
fn create_rejections_leave_registry_unchanged() {
    let mut ledger = ledger();
    create(&mut ledger, params(10, 10, &[]));
    let before = ledger.snapshot();

    let eleven: Vec<String> = (0..11).map(|i| format!("t{i}")).collect();
    let bad = [
        GatheringParams { title: String::new(), ..params(10, 10, &[]) },
        GatheringParams { title: "x".repeat(51), ..params(10, 10, &[]) },
        params(0, 10, &[]),
        params(1001, 10, &[]),
        params(10, 0, &[]),
        params(10, 10_001, &[]),
        GatheringParams { network_tags: eleven, ..params(10, 10, &[]) },
        GatheringParams { scheduled_at: NOW, ..params(10, 10, &[]) },
        GatheringParams { scheduled_at: NOW - 1, ..params(10, 10, &[]) },
    ];

    for p in bad {
        let err = ledger.create_gathering(&admin(), p.clone()).unwrap_err();
        assert!(
            matches!(err, LedgerError::InvalidGatheringParams(_)),
            "{p:?} gave {err:?}"
        );
        assert_eq!(ledger.snapshot(), before);
    }
}

#[test]
fn register_partner_rejections() {
    let mut ledger = ledger();
    assert!(matches!(
        ledger.register_partner(&admin(), "net", 0),
        Err(LedgerError::InvalidGatheringParams(_))
    ));
    assert!(matches!(
        ledger.register_partner(&admin(), "net", 6),
        Err(LedgerError::InvalidGatheringParams(_))
    ));
    assert!(matches!(
        ledger.register_partner(&admin(), "", 3),
        Err(LedgerError::InvalidNetworkTag(_))
    ));
    assert!(matches!(
        ledger.register_partner(&admin(), &"n".repeat(21), 3),
        Err(LedgerError::InvalidNetworkTag(_))
    ));
    assert_eq!(ledger.stats().partners, 0);
}

#[test]
fn single_seat_gathering() {
    let mut ledger = ledger();
    let id = create(&mut ledger, params(1, 100, &[]));

    let first = ledger.join_gathering(&who("alice"), id).unwrap().value;
    assert_eq!(first.credited_points, 100);
    assert_eq!(first.proof_id, 1);
    assert_eq!(ledger.gathering(id).unwrap().admitted_count, 1);
    assert_eq!(ledger.merits(&who("alice")).unwrap().earned_points, 100);

    assert_eq!(
        ledger.join_gathering(&who("bob"), id),
        Err(LedgerError::CapacityReached(id))
    );
    assert!(ledger.merits(&who("bob")).is_none());
}

#[test]
fn cross_network_bonus() {
    let mut ledger = ledger();
    ledger.register_partner(&admin(), "alpha", 2).unwrap();
    ledger.register_partner(&admin(), "beta", 3).unwrap();
    let id = create(&mut ledger, params(10, 100, &["alpha", "beta"]));

    let admission = ledger.join_gathering(&who("alice"), id).unwrap().value;
    assert_eq!(admission.bonus, 5);
    assert_eq!(admission.credited_points, 600);
}

#[test]
fn unregistered_tag_adds_no_bonus() {
    let mut ledger = ledger();
    let id = create(&mut ledger, params(10, 50, &["nobody"]));
    let admission = ledger.join_gathering(&who("alice"), id).unwrap().value;
    assert_eq!(admission.bonus, 0);
    assert_eq!(admission.credited_points, 50);
}

#[test]
fn partner_re_registration_changes_future_rewards() {
    let mut ledger = ledger();
    ledger.register_partner(&admin(), "alpha", 1).unwrap();
    let id = create(&mut ledger, params(10, 10, &["alpha"]));
    assert_eq!(ledger.join_gathering(&who("a"), id).unwrap().value.credited_points, 20);

    ledger.register_partner(&admin(), "alpha", 4).unwrap();
    assert_eq!(ledger.join_gathering(&who("b"), id).unwrap().value.credited_points, 50);
}

#[test]
fn claim_sequence() {
    let mut ledger = ledger();
    let id = create(&mut ledger, params(10, 100, &[]));
    let alice = who("alice");
    ledger.join_gathering(&alice, id).unwrap();

    assert_eq!(ledger.claim_merits(&alice, 60).unwrap().value, 60);
    assert_eq!(ledger.merits(&alice).unwrap().claimed_points, 60);
    assert_eq!(
        ledger.claim_merits(&alice, 50),
        Err(LedgerError::InsufficientMerits { available: 40, requested: 50 })
    );
    assert_eq!(ledger.claim_merits(&alice, 40).unwrap().value, 40);
    assert_eq!(ledger.available_merits(&alice), 0);
    assert_eq!(ledger.merits(&alice).unwrap().earned_points, 100);
}

#[test]
fn claim_without_admission_is_not_found() {
    let mut ledger = ledger();
    assert!(matches!(
        ledger.claim_merits(&who("stranger"), 1),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn identical_bonus_recorded_once() {
    let mut ledger = ledger();
    ledger.register_partner(&admin(), "alpha", 2).unwrap();
    let a = create(&mut ledger, params(10, 10, &["alpha"]));
    let b = create(&mut ledger, params(10, 10, &["alpha"]));

    let alice = who("alice");
    ledger.join_gathering(&alice, a).unwrap();
    ledger.join_gathering(&alice, b).unwrap();

    let account = ledger.merits(&alice).unwrap();
    assert_eq!(account.bonus_history.as_slice(), &[2]);
    assert_eq!(account.earned_points, 60);
}

#[test]
fn second_join_by_same_caller_is_duplicate() {
    let mut ledger = ledger();
    let id = create(&mut ledger, params(10, 10, &[]));
    let alice = who("alice");

    ledger.join_gathering(&alice, id).unwrap();
    assert_eq!(
        ledger.join_gathering(&alice, id),
        Err(LedgerError::DuplicateRegistration(id))
    );
    assert_eq!(ledger.gathering(id).unwrap().admitted_count, 1);
    assert_eq!(
        ledger.roster(id).unwrap().attendees.as_slice(),
        &[alice.clone()]
    );
    assert_eq!(ledger.proofs(&alice).unwrap().proof_ids.as_slice(), &[1]);
}

#[test]
fn capacity_is_checked_before_duplicates() {
    let mut ledger = ledger();
    let id = create(&mut ledger, params(1, 10, &[]));
    let alice = who("alice");
    ledger.join_gathering(&alice, id).unwrap();
    assert_eq!(
        ledger.join_gathering(&alice, id),
        Err(LedgerError::CapacityReached(id))
    );
}

#[test]
fn joining_unknown_gathering_is_not_found() {
    let mut ledger = ledger();
    assert!(matches!(
        ledger.join_gathering(&who("alice"), 42),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn proof_ids_are_global_and_recorded_in_order() {
    let mut ledger = ledger();
    let a = create(&mut ledger, params(10, 10, &[]));
    let b = create(&mut ledger, params(10, 10, &[]));

    let alice = who("alice");
    let bob = who("bob");
    assert_eq!(ledger.join_gathering(&alice, a).unwrap().value.proof_id, 1);
    assert_eq!(ledger.join_gathering(&bob, a).unwrap().value.proof_id, 2);
    assert_eq!(ledger.join_gathering(&alice, b).unwrap().value.proof_id, 3);

    assert_eq!(ledger.proofs(&alice).unwrap().proof_ids.as_slice(), &[1, 3]);
    assert_eq!(ledger.token_owner(2), Some(&bob));
    assert_eq!(ledger.stats().proof_counter, 3);
}

#[test]
fn full_proof_record_drops_ids_but_still_mints() {
    let mut ledger = ledger();
    let alice = who("alice");
    for _ in 0..101 {
        let id = create(&mut ledger, params(1, 1, &[]));
        ledger.join_gathering(&alice, id).unwrap();
    }

    let record = ledger.proofs(&alice).unwrap();
    assert_eq!(record.proof_ids.len(), 100);
    assert!(!record.proof_ids.contains(&101));
    assert_eq!(ledger.token_owner(101), Some(&alice));
    assert_eq!(ledger.merits(&alice).unwrap().earned_points, 101);
}

#[test]
fn reject_policy_fails_admission_when_proof_record_full() {
    let mut ledger = ledger_with(OverflowPolicy::Reject);
    let alice = who("alice");
    for _ in 0..100 {
        let id = create(&mut ledger, params(1, 1, &[]));
        ledger.join_gathering(&alice, id).unwrap();
    }
    let id = create(&mut ledger, params(1, 1, &[]));
    let before = ledger.snapshot();

    assert_eq!(
        ledger.join_gathering(&alice, id),
        Err(LedgerError::CollectionFull("proof record"))
    );
    assert_eq!(ledger.snapshot(), before);
    assert_eq!(ledger.token_owner(101), None);
}

#[test]
fn reads_are_idempotent() {
    let mut ledger = ledger();
    ledger.register_partner(&admin(), "alpha", 2).unwrap();
    let id = create(&mut ledger, params(10, 10, &["alpha"]));
    let alice = who("alice");
    ledger.join_gathering(&alice, id).unwrap();

    let before = ledger.snapshot();
    for _ in 0..3 {
        assert_eq!(ledger.gathering(id).unwrap().admitted_count, 1);
        assert_eq!(ledger.partner("alpha").unwrap().multiplier, 2);
        assert_eq!(ledger.merits(&alice).unwrap().earned_points, 30);
        assert_eq!(ledger.proofs(&alice).unwrap().proof_ids.len(), 1);
        assert_eq!(ledger.roster(id).unwrap().attendees.len(), 1);
        assert!(ledger.partner("ghost").is_none());
        assert!(ledger.merits(&who("ghost")).is_none());
    }
    assert_eq!(ledger.snapshot(), before);
}

#[test]
fn non_administrator_is_rejected() {
    let mut ledger = ledger();
    let mallory = who("mallory");
    assert!(!ledger.is_administrator(&mallory));
    assert_eq!(
        ledger.create_gathering(&mallory, params(1, 1, &[])),
        Err(LedgerError::Unauthorized)
    );
    assert_eq!(
        ledger.register_partner(&mallory, "net", 1),
        Err(LedgerError::Unauthorized)
    );
    assert_eq!(ledger.stats().gathering_counter, 0);
}
