//! Handing in-flight records from one open session to another.

use crate::common::*;
use std::sync::Arc;

#[test]
fn test_migrated_records_leave_the_source_entirely() {
    let harness = Harness::with_input(&[record(&[("n", "1")], "one"), record(&[("n", "2")], "two")]);
    let mut source = harness.session();
    let mut target = harness.session();
    let batch = source.get_batch(2).unwrap();
    let moved = source.put_attribute(&batch[0], "seen", "yes").unwrap();

    source.migrate(&mut target, &[moved.clone()]).unwrap();

    assert!(source.put_attribute(&moved, "x", "y").unwrap_err().is_unknown_record());
    assert!(source.transfer(&moved, &success()).unwrap_err().is_unknown_record());
    assert!(source.remove(&moved).unwrap_err().is_unknown_record());
    assert_eq!(source.state_of(&moved), None);
    assert_eq!(source.being_processed_count(), 1);

    assert_eq!(target.state_of(&moved), Some(RecordState::BeingProcessed));
    assert_eq!(target.read_bytes(&moved).unwrap(), b"one");
    target.transfer(&moved, &success()).unwrap();

    source.remove(&batch[1]).unwrap();
    source.commit().unwrap();
    target.commit().unwrap();
}

#[test]
fn test_migration_carries_originals_for_rollback() {
    let original = record(&[("a", "1")], "body");
    let harness = Harness::with_input(&[original.clone()]);
    let mut source = harness.session();
    let mut target = harness.session();

    let ff = source.get().unwrap().unwrap();
    let ff = source.write_bytes(&ff, "rewritten").unwrap();
    source.migrate(&mut target, &[ff]).unwrap();

    source.commit().unwrap();
    assert!(harness.input.is_empty());

    target.rollback(false);
    assert_eq!(harness.input.snapshot(), vec![original]);
}

#[test]
fn test_migration_carries_staged_records_and_provenance() {
    let harness = Harness::with_input(&[record(&[], "x")]);
    let mut source = harness.session();
    let mut target = harness.session();

    let ff = source.get().unwrap().unwrap();
    let ff = source.write_bytes(&ff, "y").unwrap();
    source.transfer(&ff, &failure()).unwrap();
    let staged = source.transferred(&failure())[0].clone();
    let events_before = source.provenance().len();
    assert!(events_before > 0);

    source.migrate(&mut target, &[staged.clone()]).unwrap();

    assert!(source.transferred(&failure()).is_empty());
    assert!(source.provenance().is_empty());
    assert_eq!(target.transferred(&failure()).len(), 1);
    assert_eq!(target.provenance().events_for(staged.uuid()).count(), events_before);
    assert!(target.commit().is_ok());
}

#[test]
fn test_invalid_migrations_change_nothing() {
    let harness = Harness::with_input(&[record(&[], "a"), record(&[], "b")]);
    let mut source = harness.session();
    let mut target = harness.session();
    let batch = source.get_batch(2).unwrap();

    assert!(matches!(source.migrate(&mut target, &[]), Err(Error::EmptyMigration)));

    let stranger = record(&[], "stranger");
    let err = source
        .migrate(&mut target, &[batch[0].clone(), stranger])
        .unwrap_err();
    assert!(err.is_unknown_record());
    assert_eq!(source.being_processed_count(), 2);
    assert_eq!(target.being_processed_count(), 0);

    target.commit().unwrap();
    assert!(matches!(
        source.migrate(&mut target, &batch),
        Err(Error::SessionNotActive { .. })
    ));
    assert_eq!(source.being_processed_count(), 2);
    source.rollback(false);
}

#[test]
fn test_self_migration_is_rejected() {
    let harness = Harness::with_input(&[record(&[], "a")]);
    let mut session = harness.session();
    let ff = session.get().unwrap().unwrap();
    let mut twin = ProcessSession::new(
        session.id(),
        std::sync::Arc::clone(&harness.input),
        std::sync::Arc::new(harness.content.clone()),
        harness.relationships.clone(),
        std::sync::Arc::clone(&harness.sequence),
    );
    assert!(matches!(
        session.migrate(&mut twin, &[ff]),
        Err(Error::SelfMigration(id)) if id == session.id()
    ));
    assert_eq!(session.being_processed_count(), 1);
    session.rollback(false);
}

#[test]
fn test_migration_between_sessions_of_different_factories() {
    let relationships = Arc::new(StaticRelationships::new([success(), failure()]));
    let upstream_input = Arc::new(FlowFileQueue::new("upstream"));
    upstream_input.offer(record(&[("n", "1")], "carried"));
    let upstream = SessionFactory::new(
        SessionConfig::default(),
        Arc::clone(&upstream_input),
        relationships.clone(),
    )
    .unwrap();
    let downstream = SessionFactory::new(
        SessionConfig::default(),
        Arc::new(FlowFileQueue::new("downstream")),
        relationships,
    )
    .unwrap()
    .with_content_repository(Arc::clone(upstream.content()));
    let out = Arc::new(FlowFileQueue::new("out"));
    downstream.connections().connect(success(), Arc::clone(&out));

    let mut source = upstream.create_session();
    let mut target = downstream.create_session();
    assert_ne!(source.id(), target.id());

    let ff = source.get().unwrap().unwrap();
    source.migrate(&mut target, &[ff.clone()]).unwrap();
    assert_eq!(source.being_processed_count(), 0);
    assert_eq!(target.read_bytes(&ff).unwrap(), b"carried");

    target.transfer(&ff, &success()).unwrap();
    source.commit().unwrap();
    target.commit().unwrap();

    assert!(upstream_input.is_empty());
    let published = out.snapshot();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].attribute("n"), Some("1"));
}
