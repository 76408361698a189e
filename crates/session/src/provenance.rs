//! Session-local provenance buffer
//!
//! Events are buffered in emission order and handed to the finalizer on
//! commit. Rollback discards them; migration moves the events about the
//! migrated records to the target session's collector.

use flowfile_core::{FlowFile, ProvenanceEvent, ProvenanceEventType, Relationship, TransitDetails};
use rustc_hash::FxHashSet;

/// Ordered buffer of provenance events produced by one session
#[derive(Debug, Default)]
pub struct ProvenanceCollector {
    events: Vec<ProvenanceEvent>,
}

impl ProvenanceCollector {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer an event about `record`
    ///
    /// `related` holds uuids of the other records involved: parents for
    /// FORK, JOIN and CLONE events, children otherwise.
    pub fn record(
        &mut self,
        event_type: ProvenanceEventType,
        record: &FlowFile,
        related: &[&str],
        transit: Option<TransitDetails>,
    ) -> &ProvenanceEvent {
        let mut event = ProvenanceEvent::new(event_type, record);
        let related = related.iter().map(|uuid| uuid.to_string());
        match event_type {
            ProvenanceEventType::Fork | ProvenanceEventType::Join | ProvenanceEventType::Clone => {
                event.parent_uuids.extend(related)
            }
            _ => event.child_uuids.extend(related),
        }
        if let Some(transit) = transit {
            event.transit = transit;
        }
        self.push(event)
    }

    /// Record was created from nothing
    pub fn create(&mut self, record: &FlowFile) {
        self.record(ProvenanceEventType::Create, record, &[], None);
    }

    /// Content was received from `transit_uri`
    pub fn receive(&mut self, record: &FlowFile, transit_uri: &str) {
        self.record(
            ProvenanceEventType::Receive,
            record,
            &[],
            Some(TransitDetails::uri(transit_uri)),
        );
    }

    /// Content was sent to `transit_uri`
    pub fn send(&mut self, record: &FlowFile, transit_uri: &str) {
        self.record(
            ProvenanceEventType::Send,
            record,
            &[],
            Some(TransitDetails::uri(transit_uri)),
        );
    }

    /// Content was fetched from `transit_uri`, replacing what was there
    pub fn fetch(&mut self, record: &FlowFile, transit_uri: &str) {
        self.record(
            ProvenanceEventType::Fetch,
            record,
            &[],
            Some(TransitDetails::uri(transit_uri)),
        );
    }

    /// Record left the flow
    pub fn drop_record(&mut self, record: &FlowFile, reason: &str) {
        self.record(
            ProvenanceEventType::Drop,
            record,
            &[],
            Some(TransitDetails::details(reason)),
        );
    }

    /// Content changed
    pub fn modify_content(&mut self, record: &FlowFile, details: Option<&str>) {
        self.record(
            ProvenanceEventType::ContentModified,
            record,
            &[],
            details.map(TransitDetails::details),
        );
    }

    /// Attributes changed
    pub fn modify_attributes(&mut self, record: &FlowFile) {
        self.record(ProvenanceEventType::AttributesModified, record, &[], None);
    }

    /// Record was routed to `relationship` for `reason`
    pub fn route(&mut self, record: &FlowFile, relationship: &Relationship, reason: &str) {
        let mut event = ProvenanceEvent::new(ProvenanceEventType::Route, record);
        event.relationship = Some(relationship.name().to_string());
        event.transit = TransitDetails::details(reason);
        self.push(event);
    }

    /// Buffered events, in emission order
    pub fn events(&self) -> &[ProvenanceEvent] {
        &self.events
    }

    /// Events whose subject is the record with `uuid`
    pub fn events_for<'a>(&'a self, uuid: &'a str) -> impl Iterator<Item = &'a ProvenanceEvent> {
        self.events.iter().filter(move |e| e.record_uuid() == uuid)
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take every buffered event, leaving the collector empty
    pub fn take_events(&mut self) -> Vec<ProvenanceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop every buffered event
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Move events about the records in `uuids` to `target`
    ///
    /// Relative order is kept on both sides. Returns how many events moved.
    pub fn migrate(&mut self, target: &mut ProvenanceCollector, uuids: &FxHashSet<String>) -> usize {
        let (moving, staying): (Vec<_>, Vec<_>) = self
            .events
            .drain(..)
            .partition(|event| uuids.contains(event.record_uuid()));
        self.events = staying;
        let moved = moving.len();
        target.events.extend(moving);
        moved
    }

    pub(crate) fn restore(&mut self, mut events: Vec<ProvenanceEvent>) {
        events.append(&mut self.events);
        self.events = events;
    }

    fn push(&mut self, event: ProvenanceEvent) -> &ProvenanceEvent {
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }
}
