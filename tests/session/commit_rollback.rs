//! Commit completeness and rollback restoration.

use crate::common::*;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_commit_with_unresolved_record_publishes_nothing() {
    let harness = Harness::with_input(&[record(&[], "a"), record(&[], "b")]);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let mut session = harness.session().on_commit(move |_batch: &mut CommitBatch| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let a = session.get().unwrap().unwrap();
    let b = session.get().unwrap().unwrap();
    session.transfer(&a, &success()).unwrap();

    let err = session.commit().unwrap_err();
    match err {
        Error::IncompleteWork { pending } => assert_eq!(pending, vec![b.id()]),
        other => panic!("expected IncompleteWork, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(session.is_active());

    session.remove(&b).unwrap();
    session.commit().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_created_record_must_be_resolved() {
    let harness = Harness::new();
    let mut session = harness.session();
    session.create().unwrap();
    assert!(session.commit().unwrap_err().is_incomplete_work());
}

#[test]
fn test_rollback_restores_pre_session_versions() {
    let original = record(&[("a", "1")], "hello");
    let harness = Harness::with_input(&[original.clone()]);
    let mut session = harness.session();

    let ff = session.get().unwrap().unwrap();
    let ff = session.write_bytes(&ff, "changed").unwrap();
    let ff = session.put_attribute(&ff, "a", "2").unwrap();
    let ff = session.put_attribute(&ff, "extra", "x").unwrap();
    session.transfer(&ff, &success()).unwrap();

    session.rollback(false);

    let restored = harness.input.snapshot();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0], original);
    assert_eq!(harness.content_of(&restored[0]), b"hello");
    assert_eq!(user_attributes(&restored[0]), pairs(&[("a", "1")]));
}

#[test]
fn test_rollback_restores_removed_and_requeued_records() {
    let records = [record(&[("n", "1")], ""), record(&[("n", "2")], "")];
    let harness = Harness::with_input(&records);
    let mut session = harness.session();
    let batch = session.get_batch(2).unwrap();
    session.remove(&batch[0]).unwrap();
    session.transfer_back(&batch[1]).unwrap();

    session.rollback(false);
    assert_eq!(harness.input.snapshot(), records.to_vec());
}

#[test]
fn test_rollback_discards_created_records_and_counters() {
    let harness = Harness::new();
    let mut session = harness.session();
    let ff = session.create().unwrap();
    session.transfer(&ff, &success()).unwrap();
    session.adjust_counter("made", 1).unwrap();

    session.rollback(false);

    assert!(harness.input.is_empty());
    assert!(session.transferred(&success()).is_empty());
    assert!(session.counters().is_empty());
    assert!(session.provenance().is_empty());
    assert_eq!(session.status(), SessionStatus::RolledBack);
}

#[test]
fn test_rollback_after_commit_is_noop() {
    let harness = Harness::with_input(&[record(&[], "x")]);
    let mut session = harness.session();
    let ff = session.get().unwrap().unwrap();
    session.transfer(&ff, &success()).unwrap();
    session.commit().unwrap();

    session.rollback(true);
    assert_eq!(session.status(), SessionStatus::Committed);
    assert!(harness.input.is_empty());
    assert!(matches!(
        session.commit(),
        Err(Error::SessionNotActive { .. })
    ));
}

#[test]
fn test_penalized_rollback_hides_records_from_get() {
    let harness = Harness::with_input(&[record(&[], "x")]);
    let mut first = harness.session();
    first.get().unwrap().unwrap();
    first.rollback(true);

    let mut second = harness.session();
    assert!(second.get().unwrap().is_none());
    assert_eq!(harness.input.len(), 1);
    second.commit().unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_incomplete_commit_never_publishes(total in 1usize..12, resolved_seed in 0usize..12) {
        let resolved = resolved_seed % total;
        let records: Vec<_> = (0..total).map(|i| record(&[("i", i.to_string().as_str())], "")).collect();
        let harness = Harness::with_input(&records);
        let published = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&published);
        let mut session = harness.session().on_commit(move |batch: &mut CommitBatch| {
            seen.fetch_add(batch.record_count(), Ordering::SeqCst);
            Ok(())
        });

        let fetched = session.get_batch(total).unwrap();
        for (i, ff) in fetched.iter().take(resolved).enumerate() {
            if i % 2 == 0 {
                session.transfer(ff, &success()).unwrap();
            } else {
                session.remove(ff).unwrap();
            }
        }

        let err = session.commit().unwrap_err();
        prop_assert!(err.is_incomplete_work());
        prop_assert_eq!(published.load(Ordering::SeqCst), 0);
        prop_assert_eq!(session.being_processed_count(), total - resolved);

        session.rollback(false);
        prop_assert_eq!(harness.input.snapshot(), records);
    }
}
