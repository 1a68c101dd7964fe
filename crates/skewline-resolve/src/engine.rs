//! Resolution engine - drives a full resolution pass
//!
//! START → SKEW_SWEEP → (anonymous nodes left) IDENTITY_RESOLUTION →
//! SKEW_SWEEP → DONE | FAILED

use std::collections::BTreeMap;
use std::sync::Arc;

use skewline_core::{EventStore, NodeDirectory, NodeName, NodeRecord, SkewEstimate, SkewResult};
use tracing::info_span;

use crate::{
    Binding, CancelToken, IdentityResolver, PassControl, PassObserver, PassStats, ResolutionStatus,
    ResolveConfig, SkewDetector, SkewSweep, SkewTable, TracingObserver,
};

/// Stage of a resolution pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassState {
    Start,
    SkewSweep,
    IdentityResolution,
    Done,
    Failed,
}

impl PassState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PassState::Done | PassState::Failed)
    }
}

/// Everything a pass produced, for the reporting layer
#[derive(Clone, Debug)]
pub struct ResolutionReport {
    pub state: PassState,
    pub bindings: Vec<Binding>,
    pub unresolved: usize,
    pub stats: PassStats,
    pub table: SkewTable,
}

/// A directory record with the skews measured against its partners
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSkews<'r> {
    pub record: &'r NodeRecord,
    pub partners: BTreeMap<NodeName, SkewEstimate>,
}

impl ResolutionReport {
    pub fn is_success(&self) -> bool {
        self.state == PassState::Done
    }

    /// Join every record in `directory` with its row of the skew table.
    /// Nodes the table never measured get an empty partner map.
    pub fn node_skews<'r>(&self, directory: &'r NodeDirectory) -> Vec<NodeSkews<'r>> {
        directory
            .find_all()
            .map(|record| NodeSkews {
                record,
                partners: self.table.partners(&record.id).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

/// Resolution engine
pub struct ResolutionEngine {
    config: ResolveConfig,
    detector: SkewDetector,
    observer: Arc<dyn PassObserver>,
    cancel: CancelToken,
}

impl ResolutionEngine {
    /// Engine reporting through `tracing`
    pub fn new(config: ResolveConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    pub fn with_observer(config: ResolveConfig, observer: Arc<dyn PassObserver>) -> Self {
        ResolutionEngine {
            detector: SkewDetector::new(config.tolerance),
            config,
            observer,
            cancel: CancelToken::new(),
        }
    }

    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    pub fn detector(&self) -> &SkewDetector {
        &self.detector
    }

    /// Token that cancels any pass run by this engine
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run a pass starting from an empty skew table
    pub fn run<S>(&self, store: &mut S, directory: &mut NodeDirectory) -> SkewResult<ResolutionReport>
    where
        S: EventStore + Sync + ?Sized,
    {
        self.run_with_table(store, directory, SkewTable::new())
    }

    /// Run a pass reusing the determined entries of an earlier table.
    ///
    /// The store is borrowed mutably for the whole pass, so nothing else
    /// can write to it until the report is returned.
    pub fn run_with_table<S>(
        &self,
        store: &mut S,
        directory: &mut NodeDirectory,
        mut table: SkewTable,
    ) -> SkewResult<ResolutionReport>
    where
        S: EventStore + Sync + ?Sized,
    {
        let span = info_span!("resolution_pass", nodes = directory.len());
        let _guard = span.enter();

        let control = PassControl::new(self.config.deadline, self.cancel.clone());
        let observer: &dyn PassObserver = self.observer.as_ref();
        let sweep = SkewSweep::new(&self.detector, observer, &control, self.config.workers);
        let mut stats = PassStats::default();
        let mut state = PassState::Start;

        self.transition(&mut state, PassState::SkewSweep);
        sweep.run(&*store, &directory.named(), &mut table, &mut stats)?;

        if directory.anonymous().is_empty() {
            self.transition(&mut state, PassState::Done);
            return Ok(ResolutionReport {
                state,
                bindings: Vec::new(),
                unresolved: 0,
                stats,
                table,
            });
        }

        self.transition(&mut state, PassState::IdentityResolution);
        let resolver =
            IdentityResolver::new(&self.detector, observer, &control, self.config.workers);
        let outcome = resolver.resolve(store, directory, &mut table, &mut stats)?;

        // Renames can make pairs measurable that were not before
        self.transition(&mut state, PassState::SkewSweep);
        sweep.run(&*store, &directory.named(), &mut table, &mut stats)?;

        let unresolved = outcome.status.unresolved();
        let end = match outcome.status {
            ResolutionStatus::Resolved { .. } => PassState::Done,
            ResolutionStatus::Failed { .. } => PassState::Failed,
        };
        self.transition(&mut state, end);

        Ok(ResolutionReport {
            state,
            bindings: outcome.bindings,
            unresolved,
            stats,
            table,
        })
    }

    fn transition(&self, state: &mut PassState, next: PassState) {
        debug_assert!(!state.is_terminal());
        self.observer.on_state(*state, next);
        *state = next;
    }
}

impl Default for ResolutionEngine {
    fn default() -> Self {
        Self::new(ResolveConfig::default())
    }
}
