//! Observation events
//!
//! An event records that one node (the origin) saw another node (the
//! subject) in some state at a time read from the origin's own clock.

use std::fmt;

use crate::{NodeName, Timestamp};

/// Subject state observed by an origin
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StateCode(pub u8);

impl StateCode {
    pub const STARTUP: StateCode = StateCode(0);
    pub const PRIMARY: StateCode = StateCode(1);
    pub const SECONDARY: StateCode = StateCode(2);
    pub const RECOVERING: StateCode = StateCode(3);
    pub const FATAL: StateCode = StateCode(4);
    pub const STARTUP2: StateCode = StateCode(5);
    pub const UNKNOWN: StateCode = StateCode(6);
    pub const ARBITER: StateCode = StateCode(7);
    pub const DOWN: StateCode = StateCode(8);
    pub const ROLLBACK: StateCode = StateCode(9);
    pub const REMOVED: StateCode = StateCode(10);

    const LABELS: [&'static str; 11] = [
        "STARTUP",
        "PRIMARY",
        "SECONDARY",
        "RECOVERING",
        "FATAL",
        "STARTUP2",
        "UNKNOWN",
        "ARBITER",
        "DOWN",
        "ROLLBACK",
        "REMOVED",
    ];

    #[inline]
    pub fn new(code: u8) -> Self {
        StateCode(code)
    }

    /// Parse a state label, ignoring case, or a bare numeric code.
    ///
    /// Ingestion feeds every stream through here so that both sides of a
    /// comparison carry the same representation.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Ok(code) = label.parse::<u8>() {
            return Some(StateCode(code));
        }
        Self::LABELS
            .iter()
            .position(|known| known.eq_ignore_ascii_case(label))
            .map(|code| StateCode(code as u8))
    }

    pub fn label(self) -> Option<&'static str> {
        Self::LABELS.get(self.0 as usize).copied()
    }
}

impl fmt::Debug for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "State({})", label),
            None => write!(f, "State({})", self.0),
        }
    }
}

/// A single observation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Observing node
    pub origin: NodeName,
    /// Node being observed
    pub subject: NodeName,
    /// Observed state of the subject
    pub state: StateCode,
    /// Origin-local time of the observation
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event. A `self` subject is rewritten to the origin.
    pub fn new(
        origin: impl Into<NodeName>,
        subject: impl Into<NodeName>,
        state: StateCode,
        timestamp: Timestamp,
    ) -> Self {
        let origin = origin.into();
        let mut subject = subject.into();
        if subject.is_self_ref() {
            subject = origin.clone();
        }
        Event {
            origin,
            subject,
            state,
            timestamp,
        }
    }

    /// True if the origin reports on itself
    #[inline]
    pub fn is_self_report(&self) -> bool {
        self.origin == self.subject
    }
}
