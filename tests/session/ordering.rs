//! Relative order of staged output.

use crate::common::*;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

type Seen = Arc<Mutex<BTreeMap<String, Vec<String>>>>;

/// Session whose finalizer records the uuids it sees per relationship
fn recording_session(harness: &Harness) -> (ProcessSession, Seen) {
    let seen: Seen = Arc::new(Mutex::new(BTreeMap::new()));
    let sink = Arc::clone(&seen);
    let session = harness.session().on_commit(move |batch: &mut CommitBatch| {
        let mut seen = sink.lock();
        for (relationship, records) in &batch.outputs {
            seen.entry(relationship.name().to_string())
                .or_default()
                .extend(records.iter().map(|r| r.uuid().to_string()));
        }
        Ok(())
    });
    (session, seen)
}

#[test]
fn test_transfer_order_is_commit_order() {
    let harness = Harness::with_input(&[record(&[("n", "1")], ""), record(&[("n", "2")], "")]);
    let (mut session, seen) = recording_session(&harness);
    let first = session.get().unwrap().unwrap();
    let second = session.get().unwrap().unwrap();

    // transfer in the reverse of dequeue order
    session.transfer(&second, &success()).unwrap();
    session.transfer(&first, &success()).unwrap();
    session.commit().unwrap();

    let seen = seen.lock();
    assert_eq!(
        seen["success"],
        vec![second.uuid().to_string(), first.uuid().to_string()]
    );
}

#[test]
fn test_queue_index_follows_transfer_order() {
    let records: Vec<_> = (0..5).map(|i| record(&[("i", i.to_string().as_str())], "")).collect();
    let harness = Harness::with_input(&records);
    let mut session = harness.session();
    let batch = session.get_batch(5).unwrap();
    for ff in batch.iter().rev() {
        session.transfer(ff, &success()).unwrap();
    }

    let indexes: Vec<u64> = session
        .transferred(&success())
        .iter()
        .map(|r| r.queue_index().unwrap())
        .collect();
    assert!(indexes.windows(2).all(|w| w[0] < w[1]));
    assert!(session
        .transferred(&success())
        .iter()
        .all(|r| r.last_queued().is_some()));
    session.commit().unwrap();
}

#[test]
fn test_filtered_get_preserves_input_order() {
    let records: Vec<_> = (0..6).map(|i| record(&[("i", i.to_string().as_str())], "")).collect();
    let harness = Harness::with_input(&records);
    let mut session = harness.session();

    let even = session
        .get_matching(|r| {
            let i: u32 = r.attribute("i").unwrap().parse().unwrap();
            if i % 2 == 0 {
                FilterResult::AcceptAndContinue
            } else {
                FilterResult::RejectAndContinue
            }
        })
        .unwrap();
    assert_eq!(even.len(), 3);

    let left: Vec<_> = harness
        .input
        .snapshot()
        .iter()
        .map(|r| r.attribute("i").unwrap().to_string())
        .collect();
    assert_eq!(left, vec!["1", "3", "5"]);

    let first_two = session
        .get_matching(|r| match r.attribute("i") {
            Some("3") => FilterResult::AcceptAndTerminate,
            _ => FilterResult::AcceptAndContinue,
        })
        .unwrap();
    assert_eq!(first_two.len(), 2);
    assert_eq!(harness.input.len(), 1);

    session.rollback(false);
    assert_eq!(harness.input.snapshot().len(), 6);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_per_relationship_order_is_transfer_order(
        routes in proptest::collection::vec(any::<bool>(), 1..24),
        seed in any::<u64>(),
    ) {
        let records: Vec<_> = (0..routes.len())
            .map(|i| record(&[("i", i.to_string().as_str())], ""))
            .collect();
        let harness = Harness::with_input(&records);
        let (mut session, seen) = recording_session(&harness);
        let mut batch = session.get_batch(routes.len()).unwrap();

        // deterministic shuffle so transfer order differs from dequeue order
        let len = batch.len();
        let mut state = seed;
        for i in (1..len).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            batch.swap(i, (state >> 33) as usize % (i + 1));
        }

        let mut expected: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (ff, to_success) in batch.iter().zip(&routes) {
            let rel = if *to_success { success() } else { failure() };
            session.transfer(ff, &rel).unwrap();
            expected.entry(rel.name().to_string()).or_default().push(ff.uuid().to_string());
        }
        session.commit().unwrap();

        prop_assert_eq!(&*seen.lock(), &expected);
    }
}
