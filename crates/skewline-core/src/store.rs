//! Event store seam
//!
//! The resolver only ever reads events through [`EventSource`] and only
//! rewrites them through [`EventStore::rename`]. Ingestion and persistence
//! live behind these traits.

use std::collections::BTreeSet;

use crate::{Event, NodeName, SkewResult, StateCode};

/// Filter over events; `None` fields match anything
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub origin: Option<NodeName>,
    pub subject: Option<NodeName>,
    pub state: Option<StateCode>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: impl Into<NodeName>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<NodeName>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn state(mut self, state: StateCode) -> Self {
        self.state = Some(state);
        self
    }

    /// Observations made by `observer` about `subject`
    pub fn observations(observer: &NodeName, subject: &NodeName) -> Self {
        EventFilter {
            origin: Some(observer.clone()),
            subject: Some(subject.clone()),
            state: None,
        }
    }

    /// Events from the `unknown` observer never match.
    pub fn matches(&self, event: &Event) -> bool {
        if event.origin.is_unknown() {
            return false;
        }
        self.origin.as_ref().map_or(true, |o| *o == event.origin)
            && self.subject.as_ref().map_or(true, |s| *s == event.subject)
            && self.state.map_or(true, |s| s == event.state)
    }
}

/// Sequential, forward-only view over a query result
#[derive(Debug)]
pub struct EventCursor {
    inner: std::vec::IntoIter<Event>,
}

impl EventCursor {
    pub fn new(events: Vec<Event>) -> Self {
        EventCursor {
            inner: events.into_iter(),
        }
    }

    pub fn has_next(&self) -> bool {
        !self.inner.as_slice().is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.inner.len()
    }
}

impl Iterator for EventCursor {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Read side of the event store
pub trait EventSource {
    /// Matching events, ascending by timestamp. Ties keep insertion order.
    fn query(&self, filter: &EventFilter) -> SkewResult<Vec<Event>>;

    /// Distinct subject names across all events
    fn distinct_subjects(&self) -> SkewResult<BTreeSet<NodeName>>;

    /// Cursor over [`EventSource::query`]
    fn scan(&self, filter: &EventFilter) -> SkewResult<EventCursor> {
        Ok(EventCursor::new(self.query(filter)?))
    }
}

/// Write side of the event store
pub trait EventStore: EventSource {
    /// Rewrite every `origin` and `subject` reference from `from` to `to`.
    /// Returns the number of events touched.
    fn rename(&mut self, from: &NodeName, to: &NodeName) -> SkewResult<usize>;
}

/// In-memory event store
#[derive(Clone, Debug, Default)]
pub struct MemoryEventStore {
    events: Vec<Event>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Extend<Event> for MemoryEventStore {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

impl FromIterator<Event> for MemoryEventStore {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        MemoryEventStore {
            events: iter.into_iter().collect(),
        }
    }
}

impl EventSource for MemoryEventStore {
    fn query(&self, filter: &EventFilter) -> SkewResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    fn distinct_subjects(&self) -> SkewResult<BTreeSet<NodeName>> {
        Ok(self.events.iter().map(|e| e.subject.clone()).collect())
    }
}

impl EventStore for MemoryEventStore {
    fn rename(&mut self, from: &NodeName, to: &NodeName) -> SkewResult<usize> {
        let mut touched = 0;
        for event in self.events.iter_mut() {
            let mut hit = false;
            if event.origin == *from {
                event.origin = to.clone();
                hit = true;
            }
            if event.subject == *from {
                event.subject = to.clone();
                hit = true;
            }
            if hit {
                touched += 1;
            }
        }
        Ok(touched)
    }
}

/// Read-only overlay presenting `from` under the name `to`
///
/// Trial renames go through this view so the underlying store is never
/// touched by a candidate that loses.
pub struct RenamedView<'a, S: EventSource + ?Sized> {
    inner: &'a S,
    from: NodeName,
    to: NodeName,
}

impl<'a, S: EventSource + ?Sized> RenamedView<'a, S> {
    pub fn new(inner: &'a S, from: NodeName, to: NodeName) -> Self {
        RenamedView { inner, from, to }
    }

    pub fn from_name(&self) -> &NodeName {
        &self.from
    }

    pub fn to_name(&self) -> &NodeName {
        &self.to
    }

    /// Names in the underlying store that appear as `name` in the view
    fn preimages(&self, name: Option<&NodeName>) -> Vec<Option<NodeName>> {
        match name {
            None => vec![None],
            Some(n) if *n == self.to => vec![Some(self.from.clone()), Some(self.to.clone())],
            // `from` is hidden behind `to`
            Some(n) if *n == self.from => Vec::new(),
            Some(n) => vec![Some(n.clone())],
        }
    }

    fn map_name(&self, name: NodeName) -> NodeName {
        if name == self.from {
            self.to.clone()
        } else {
            name
        }
    }

    fn map_event(&self, mut event: Event) -> Event {
        event.origin = self.map_name(event.origin);
        event.subject = self.map_name(event.subject);
        event
    }
}

impl<S: EventSource + ?Sized> EventSource for RenamedView<'_, S> {
    fn query(&self, filter: &EventFilter) -> SkewResult<Vec<Event>> {
        let mut events = Vec::new();
        for origin in self.preimages(filter.origin.as_ref()) {
            for subject in self.preimages(filter.subject.as_ref()) {
                let inner_filter = EventFilter {
                    origin: origin.clone(),
                    subject,
                    state: filter.state,
                };
                for event in self.inner.query(&inner_filter)? {
                    let event = self.map_event(event);
                    if filter.matches(&event) {
                        events.push(event);
                    }
                }
            }
        }
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    fn distinct_subjects(&self) -> SkewResult<BTreeSet<NodeName>> {
        Ok(self
            .inner
            .distinct_subjects()?
            .into_iter()
            .map(|s| self.map_name(s))
            .collect())
    }
}
