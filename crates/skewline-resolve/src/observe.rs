//! Pass observation
//!
//! Components report progress through an injected [`PassObserver`]
//! rather than a process-wide logger. [`TracingObserver`] forwards to
//! `tracing`; [`NullObserver`] discards everything.

use skewline_core::NodeName;
use tracing::{debug, info, trace, warn};

use crate::{CandidateScore, Detection, DetectionReport, PassState};

/// Why an anonymous node was left unbound
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The candidate pool ran dry
    NoCandidates,
    /// No named node exists to check a candidate against
    NoNamedReference,
}

/// Receives progress notifications from a resolution pass
pub trait PassObserver: Send + Sync {
    fn on_state(&self, _from: PassState, _to: PassState) {}

    fn on_pair(&self, _a: &NodeName, _b: &NodeName, _report: &DetectionReport) {}

    fn on_candidate(&self, _placeholder: &NodeName, _score: &CandidateScore) {}

    fn on_bound(&self, _placeholder: &NodeName, _name: &NodeName, _events: usize) {}

    fn on_unresolved(&self, _placeholder: &NodeName, _reason: UnresolvedReason) {}
}

/// Discards all notifications
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl PassObserver for NullObserver {}

/// Emits `tracing` events
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl PassObserver for TracingObserver {
    fn on_state(&self, from: PassState, to: PassState) {
        debug!(?from, ?to, "resolution pass state change");
    }

    fn on_pair(&self, a: &NodeName, b: &NodeName, report: &DetectionReport) {
        match report.outcome {
            Detection::Confirmed(skew) => {
                info!(%a, %b, %skew, windows = report.windows, "clock skew found")
            }
            outcome => trace!(
                %a,
                %b,
                ?outcome,
                windows = report.windows,
                resyncs = report.resyncs,
                "no clock skew confirmed"
            ),
        }
    }

    fn on_candidate(&self, placeholder: &NodeName, score: &CandidateScore) {
        debug!(
            %placeholder,
            candidate = %score.candidate,
            evidence = score.evidence,
            confirmed = score.confirmed,
            undetermined = score.undetermined,
            contradicted = score.contradicted,
            magnitude = %score.magnitude,
            "candidate scored"
        );
    }

    fn on_bound(&self, placeholder: &NodeName, name: &NodeName, events: usize) {
        info!(%placeholder, %name, events, "anonymous node resolved");
    }

    fn on_unresolved(&self, placeholder: &NodeName, reason: UnresolvedReason) {
        warn!(%placeholder, ?reason, "unable to resolve anonymous node");
    }
}

/// Counters for one resolution pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    pub pairs_measured: u64,
    pub pairs_skipped: u64,
    pub skews_confirmed: u64,
    pub candidates_scored: u64,
    pub nodes_bound: u64,
    pub nodes_unresolved: u64,
    pub events_renamed: u64,
}

impl PassStats {
    pub fn merge(&mut self, other: &PassStats) {
        self.pairs_measured += other.pairs_measured;
        self.pairs_skipped += other.pairs_skipped;
        self.skews_confirmed += other.skews_confirmed;
        self.candidates_scored += other.candidates_scored;
        self.nodes_bound += other.nodes_bound;
        self.nodes_unresolved += other.nodes_unresolved;
        self.events_renamed += other.events_renamed;
    }
}
