//! Sessions handed out by a factory and published through shared queues.

use crate::common::*;
use flowfile::CONFIG_FILE_NAME;
use std::sync::Arc;
use tempfile::TempDir;

fn factory_with(config: SessionConfig, records: &[FlowFile]) -> SessionFactory {
    init_tracing();
    let input = Arc::new(FlowFileQueue::new("input"));
    input.offer_all(records.iter().cloned());
    SessionFactory::new(
        config,
        input,
        Arc::new(StaticRelationships::new([success(), failure()])),
    )
    .unwrap()
}

#[test]
fn test_publisher_routes_to_connected_queues() {
    let factory = factory_with(SessionConfig::default(), &[record(&[], "a"), record(&[], "b")]);
    let ok = Arc::new(FlowFileQueue::new("ok"));
    factory.connections().connect(success(), Arc::clone(&ok));

    let mut session = factory.create_session();
    let batch = session.get_batch(2).unwrap();
    session.transfer(&batch[0], &success()).unwrap();
    session.transfer(&batch[1], &failure()).unwrap();
    session.adjust_counter("routed", 2).unwrap();
    session.commit().unwrap();

    let published = ok.snapshot();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].uuid(), batch[0].uuid());
    assert!(factory.input().is_empty());
    assert_eq!(factory.counters().get("routed"), 2);

    // failure has no destination: auto-terminated with a DROP event
    let lineage = factory.provenance().lineage(batch[1].uuid());
    let drop = lineage
        .iter()
        .find(|e| e.event_type == ProvenanceEventType::Drop)
        .expect("drop event");
    assert_eq!(drop.relationship.as_deref(), Some("failure"));
    assert!(drop.event_id.is_some());
    assert!(session.provenance().is_empty());
}

#[test]
fn test_sessions_get_distinct_ids() {
    let factory = factory_with(SessionConfig::default(), &[]);
    let a = factory.create_session();
    let b = factory.create_session();
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_batch_size_is_capped_by_config() {
    let records: Vec<_> = (0..10).map(|_| record(&[], "")).collect();
    let config = SessionConfig {
        max_batch_size: 4,
        ..SessionConfig::default()
    };
    let factory = factory_with(config, &records);
    let mut session = factory.create_session();
    assert_eq!(session.get_batch(100).unwrap().len(), 4);
    session.rollback(false);
    assert_eq!(factory.input().len(), 10);
}

#[test]
fn test_penalty_duration_comes_from_config() {
    let config = SessionConfig {
        penalty_duration_ms: 0,
        ..SessionConfig::default()
    };
    let factory = factory_with(config, &[record(&[], "x")]);

    let mut first = factory.create_session();
    first.get().unwrap().unwrap();
    first.rollback(true);

    // a zero penalty has already expired
    let mut second = factory.create_session();
    let ff = second.get().unwrap().expect("penalty expired");
    assert!(ff.is_penalized());
    let ff = second.unpenalize(&ff).unwrap();
    assert!(!ff.is_penalized());
    second.remove(&ff).unwrap();
    second.commit().unwrap();
}

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    SessionConfig::write_default_if_missing(&path).unwrap();
    assert_eq!(SessionConfig::from_file(&path).unwrap(), SessionConfig::default());

    let custom = SessionConfig {
        penalty_duration_ms: 500,
        content_directory: Some(dir.path().join("content")),
        max_batch_size: 32,
    };
    custom.write_to_file(&path).unwrap();
    SessionConfig::write_default_if_missing(&path).unwrap();
    let loaded = SessionConfig::from_file(&path).unwrap();
    assert_eq!(loaded, custom);

    let factory = factory_with(loaded, &[]);
    assert!(dir.path().join("content").is_dir());
    assert_eq!(factory.config().max_batch_size, 32);
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(matches!(
        SessionConfig::from_toml_str("max_batch_size = 0"),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        SessionConfig::from_toml_str("penalty_duration_ms = \"soon\""),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_factories_can_share_downstream_queues() {
    let upstream = factory_with(SessionConfig::default(), &[record(&[("stage", "1")], "payload")]);
    let downstream = factory_with(SessionConfig::default(), &[])
        .with_content_repository(Arc::clone(upstream.content()))
        .with_provenance_repository(Arc::clone(upstream.provenance()));
    upstream
        .connections()
        .connect(success(), Arc::clone(downstream.input()));

    let mut first = upstream.create_session();
    let ff = first.get().unwrap().unwrap();
    let ff = first.write_bytes(&ff, "transformed").unwrap();
    first.transfer(&ff, &success()).unwrap();
    first.commit().unwrap();

    let mut second = downstream.create_session();
    let ff = second.get().unwrap().unwrap();
    assert_eq!(second.read_bytes(&ff).unwrap(), b"transformed");
    assert_eq!(ff.attribute("stage"), Some("1"));
    second.remove(&ff).unwrap();
    second.commit().unwrap();

    let kinds: Vec<_> = upstream
        .provenance()
        .lineage(ff.uuid())
        .iter()
        .map(|e| e.event_type)
        .collect();
    assert!(kinds.contains(&ProvenanceEventType::ContentModified));
    assert!(kinds.contains(&ProvenanceEventType::Drop));
}

#[test]
fn test_factories_stamp_from_one_sequence_by_default() {
    let records: Vec<_> = (0..4).map(|i| record(&[("i", i.to_string().as_str())], "")).collect();
    let first = factory_with(SessionConfig::default(), &records);
    let second = factory_with(SessionConfig::default(), &records);
    let shared = Arc::new(FlowFileQueue::new("shared"));
    first.connections().connect(success(), Arc::clone(&shared));
    second.connections().connect(success(), Arc::clone(&shared));

    // interleave commits from both factories into one downstream queue
    for _ in 0..2 {
        for factory in [&first, &second] {
            let mut session = factory.create_session();
            let batch = session.get_batch(2).unwrap();
            session.transfer_all(&batch, &success()).unwrap();
            session.commit().unwrap();
        }
    }

    let indexes: Vec<u64> = shared
        .snapshot()
        .iter()
        .map(|r| r.queue_index().expect("stamped"))
        .collect();
    assert_eq!(indexes.len(), 8);
    assert!(indexes.windows(2).all(|w| w[0] < w[1]), "{:?}", indexes);
}
