//! Creating, deriving and cloning records inside a session.

use crate::common::*;

fn event_types(session: &ProcessSession, uuid: &str) -> Vec<ProvenanceEventType> {
    session
        .provenance()
        .events_for(uuid)
        .map(|e| e.event_type)
        .collect()
}

#[test]
fn test_join_inherits_only_shared_attributes() {
    let a = record(&[("x", "1"), ("y", "2")], "");
    let b = record(&[("x", "1"), ("y", "3")], "");
    let harness = Harness::with_input(&[a.clone(), b.clone()]);
    let mut session = harness.session();
    let parents = session.get_batch(2).unwrap();

    let joined = session.create_from(&parents).unwrap();
    assert_eq!(user_attributes(&joined), pairs(&[("x", "1")]));
    assert_ne!(joined.uuid(), a.uuid());
    assert_ne!(joined.uuid(), b.uuid());

    let join = session
        .provenance()
        .events_for(joined.uuid())
        .find(|e| e.event_type == ProvenanceEventType::Join)
        .cloned()
        .expect("join event");
    assert_eq!(join.parent_uuids, vec![a.uuid().to_string(), b.uuid().to_string()]);

    session.transfer(&joined, &success()).unwrap();
    session.remove_all(&parents).unwrap();
    session.commit().unwrap();
}

#[test]
fn test_child_inherits_everything_but_uuid() {
    let harness = Harness::with_input(&[record(&[("k", "v"), ("filename", "data.csv")], "body")]);
    let mut session = harness.session();
    let parent = session.get().unwrap().unwrap();

    let child = session.create_child(&parent).unwrap();
    assert_eq!(child.attribute("k"), Some("v"));
    assert_eq!(child.attribute("filename"), Some("data.csv"));
    assert_ne!(child.uuid(), parent.uuid());
    assert_eq!(child.size(), 0);
    assert!(child.lineage_start() <= parent.lineage_start());
    assert_eq!(event_types(&session, child.uuid()), vec![ProvenanceEventType::Fork]);

    session.transfer(&child, &success()).unwrap();
    session.transfer(&parent, &failure()).unwrap();
    session.commit().unwrap();
}

#[test]
fn test_created_record_cannot_loop_back() {
    let harness = Harness::new();
    let mut session = harness.session();
    let ff = session.create().unwrap();

    assert!(matches!(
        session.transfer(&ff, &Relationship::self_relationship()),
        Err(Error::SelfLoop { id }) if id == ff.id()
    ));
    assert!(matches!(session.transfer_back(&ff), Err(Error::SelfLoop { .. })));
    assert_eq!(session.state_of(&ff), Some(RecordState::BeingProcessed));

    session.remove(&ff).unwrap();
    session.commit().unwrap();
    assert!(harness.input.is_empty());
}

#[test]
fn test_dequeued_record_may_loop_back() {
    let harness = Harness::with_input(&[record(&[], "again")]);
    let mut session = harness.session();
    let ff = session.get().unwrap().unwrap();
    session.transfer(&ff, &Relationship::self_relationship()).unwrap();
    assert!(harness.input.is_empty());

    session.commit().unwrap();
    let requeued = harness.input.snapshot();
    assert_eq!(requeued.len(), 1);
    assert_eq!(requeued[0].uuid(), ff.uuid());
    assert!(requeued[0].queue_index().is_some());
}

#[test]
fn test_transfer_to_undeclared_relationship_fails() {
    let harness = Harness::with_input(&[record(&[], "")]);
    let mut session = harness.session();
    let ff = session.get().unwrap().unwrap();
    let err = session
        .transfer(&ff, &Relationship::new("retry", ""))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownRelationship { ref name } if name == "retry"));
    assert_eq!(session.state_of(&ff), Some(RecordState::BeingProcessed));
    session.rollback(false);
}

#[test]
fn test_clone_shares_content_with_fresh_identity() {
    let harness = Harness::with_input(&[record(&[("a", "1")], "shared body")]);
    let mut session = harness.session();
    let ff = session.get().unwrap().unwrap();

    let copy = session.clone_record(&ff).unwrap();
    assert_ne!(copy.id(), ff.id());
    assert_ne!(copy.uuid(), ff.uuid());
    assert_eq!(copy.attribute("a"), Some("1"));
    assert_eq!(session.read_bytes(&copy).unwrap(), b"shared body");
    assert_eq!(event_types(&session, copy.uuid()), vec![ProvenanceEventType::Clone]);

    let copy = session.write_bytes(&copy, "diverged").unwrap();
    assert_eq!(session.read_bytes(&ff).unwrap(), b"shared body");
    assert_eq!(session.read_bytes(&copy).unwrap(), b"diverged");

    session.transfer_all(&[ff, copy], &success()).unwrap();
    session.commit().unwrap();
}

#[test]
fn test_clone_range_bounds() {
    let harness = Harness::with_input(&[record(&[], "0123456789")]);
    let mut session = harness.session();
    let ff = session.get().unwrap().unwrap();

    let middle = session.clone_range(&ff, 3, 4).unwrap();
    assert_eq!(session.read_bytes(&middle).unwrap(), b"3456");
    assert_eq!(middle.size(), 4);

    let empty = session.clone_range(&ff, 10, 0).unwrap();
    assert_eq!(empty.size(), 0);

    assert!(matches!(
        session.clone_range(&ff, 8, 3),
        Err(Error::Bounds { offset: 8, length: 3, size: 10 })
    ));
    assert!(matches!(
        session.clone_range(&ff, u64::MAX, 2),
        Err(Error::Bounds { .. })
    ));

    session.remove_all(&[ff, middle, empty]).unwrap();
    session.commit().unwrap();
}

#[test]
fn test_create_records_create_event() {
    let harness = Harness::new();
    let mut session = harness.session();
    let ff = session.create().unwrap();
    assert_eq!(event_types(&session, ff.uuid()), vec![ProvenanceEventType::Create]);
    session.rollback(false);
    assert!(session.provenance().is_empty());
}
