//! Property tests over random operation sequences.

use muster_ledger::{
    GatheringParams, Ledger, LedgerConfig, LedgerState, ManualClock, MemoryTokens, Principal,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Partner { tag: u8, multiplier: u32 },
    Create { capacity: u32, base_points: u64, tags: Vec<u8> },
    Join { who: u8, gathering: u64 },
    Claim { who: u8, points: u64 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4, 0u32..7).prop_map(|(tag, multiplier)| Op::Partner { tag, multiplier }),
        (0u32..5, 0u64..200, prop::collection::vec(0u8..5, 0..4)).prop_map(
            |(capacity, base_points, tags)| Op::Create { capacity, base_points, tags }
        ),
        (0u8..5, 0u64..8).prop_map(|(who, gathering)| Op::Join { who, gathering }),
        (0u8..5, 0u64..500).prop_map(|(who, points)| Op::Claim { who, points }),
    ]
}

fn sorted(mut state: LedgerState) -> LedgerState {
    state.gatherings.sort_by_key(|g| g.id);
    state.partners.sort_by(|a, b| a.tag.cmp(&b.tag));
    state.merits.sort_by(|a, b| a.owner.cmp(&b.owner));
    state.proofs.sort_by(|a, b| a.owner.cmp(&b.owner));
    state.rosters.sort_by_key(|r| r.gathering_id);
    state
}

fn principal(n: u8) -> Principal {
    Principal::new(format!("p{n}"))
}

proptest! {
    #[test]
    fn invariants_hold_after_any_sequence(ops in prop::collection::vec(op(), 1..60)) {
        let admin = Principal::new("admin");
        let mut ledger = Ledger::new(
            admin.clone(),
            LedgerConfig::default(),
            MemoryTokens::new(),
            ManualClock::at(10),
        );
        let mut replica = LedgerState::default();
        let mut last_gathering = 0;
        let mut last_proof = 0;

        for op in ops {
            let before = ledger.snapshot();
            let writes = match op {
                Op::Partner { tag, multiplier } => ledger
                    .register_partner(&admin, &format!("net{tag}"), multiplier)
                    .map(|r| r.writes),
                Op::Create { capacity, base_points, tags } => ledger
                    .create_gathering(&admin, GatheringParams {
                        title: "g".into(),
                        scheduled_at: 20,
                        capacity,
                        base_points,
                        network_tags: tags.iter().map(|t| format!("net{t}")).collect(),
                    })
                    .map(|r| r.writes),
                Op::Join { who, gathering } => ledger
                    .join_gathering(&principal(who), gathering)
                    .map(|r| r.writes),
                Op::Claim { who, points } => ledger
                    .claim_merits(&principal(who), points)
                    .map(|r| r.writes),
            };

            match writes {
                Ok(writes) => writes.into_iter().for_each(|w| replica.apply(w)),
                // Failed calls change nothing.
                Err(_) => {
                    prop_assert_eq!(&ledger.snapshot(), &before);
                }
            }

            let stats = ledger.stats();
            prop_assert!(stats.gathering_counter >= last_gathering);
            prop_assert!(stats.proof_counter >= last_proof);
            last_gathering = stats.gathering_counter;
            last_proof = stats.proof_counter;

            let state = ledger.snapshot();
            for account in &state.merits {
                prop_assert!(account.claimed_points <= account.earned_points);
                prop_assert!(account.bonus_history.len() <= 10);
            }
            for gathering in &state.gatherings {
                prop_assert!(gathering.admitted_count <= gathering.capacity);
                let seated = state
                    .rosters
                    .iter()
                    .find(|r| r.gathering_id == gathering.id)
                    .map_or(0, |r| r.attendees.len());
                prop_assert_eq!(seated, gathering.admitted_count as usize);
            }
            prop_assert_eq!(ledger.tokens().len() as u64, stats.proof_counter);
        }

        // The receipts alone rebuild the same ledger.
        prop_assert_eq!(sorted(replica), sorted(ledger.snapshot()));
    }
}
