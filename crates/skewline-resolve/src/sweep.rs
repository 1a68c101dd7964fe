//! Pairwise skew sweep
//!
//! Measures every unordered pair of nodes the table does not yet know.
//! With more than one worker the pending pairs are split across scoped
//! threads that write into a [`SharedSkewTable`].

use skewline_core::{EventSource, NodeName, SkewResult};

use crate::{PassControl, PassObserver, PassStats, SharedSkewTable, SkewDetector, SkewTable};

/// One sweep over a set of nodes
pub struct SkewSweep<'a> {
    detector: &'a SkewDetector,
    observer: &'a dyn PassObserver,
    control: &'a PassControl,
    workers: usize,
}

impl<'a> SkewSweep<'a> {
    pub fn new(
        detector: &'a SkewDetector,
        observer: &'a dyn PassObserver,
        control: &'a PassControl,
        workers: usize,
    ) -> Self {
        SkewSweep {
            detector,
            observer,
            control,
            workers: workers.max(1),
        }
    }

    /// Unordered pairs (a < b) among `nodes` that still lack a determined
    /// estimate, plus how many were skipped as already known.
    pub fn pending_pairs(nodes: &[NodeName], table: &SkewTable) -> (Vec<(NodeName, NodeName)>, u64) {
        let mut nodes: Vec<&NodeName> = nodes.iter().filter(|n| !n.is_reserved()).collect();
        nodes.sort();
        nodes.dedup();

        let mut pending = Vec::new();
        let mut skipped = 0;
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                if table.is_known(a, b) {
                    skipped += 1;
                } else {
                    pending.push(((*a).clone(), (*b).clone()));
                }
            }
        }
        (pending, skipped)
    }

    /// Full O(n²) sweep over `nodes`
    pub fn run<S>(
        &self,
        source: &S,
        nodes: &[NodeName],
        table: &mut SkewTable,
        stats: &mut PassStats,
    ) -> SkewResult<()>
    where
        S: EventSource + Sync + ?Sized,
    {
        let (pending, skipped) = Self::pending_pairs(nodes, table);
        stats.pairs_skipped += skipped;
        self.measure(source, pending, table, stats)
    }

    /// Sweep only the pairs between `node` and each of `others`
    pub fn run_for<S>(
        &self,
        source: &S,
        node: &NodeName,
        others: &[NodeName],
        table: &mut SkewTable,
        stats: &mut PassStats,
    ) -> SkewResult<()>
    where
        S: EventSource + Sync + ?Sized,
    {
        let mut pending = Vec::new();
        for other in others.iter().filter(|o| *o != node && !o.is_reserved()) {
            if table.is_known(node, other) {
                stats.pairs_skipped += 1;
            } else {
                pending.push((node.clone(), other.clone()));
            }
        }
        self.measure(source, pending, table, stats)
    }

    fn measure<S>(
        &self,
        source: &S,
        pending: Vec<(NodeName, NodeName)>,
        table: &mut SkewTable,
        stats: &mut PassStats,
    ) -> SkewResult<()>
    where
        S: EventSource + Sync + ?Sized,
    {
        if self.workers == 1 || pending.len() < 2 {
            for (a, b) in &pending {
                self.control.check()?;
                let report = self.detector.detect_pair(source, a, b)?;
                self.observer.on_pair(a, b, &report);
                stats.pairs_measured += 1;
                let estimate = report.outcome.estimate();
                if table.record(a, b, estimate) && estimate.is_determined() {
                    stats.skews_confirmed += 1;
                }
            }
            return Ok(());
        }

        let shared = SharedSkewTable::new(std::mem::take(table));
        let chunk_size = pending.len().div_ceil(self.workers);
        let results: Vec<SkewResult<PassStats>> = std::thread::scope(|scope| {
            let handles: Vec<_> = pending
                .chunks(chunk_size)
                .map(|chunk| {
                    let shared = &shared;
                    scope.spawn(move || -> SkewResult<PassStats> {
                        let mut local = PassStats::default();
                        for (a, b) in chunk {
                            self.control.check()?;
                            let report = self.detector.detect_pair(source, a, b)?;
                            self.observer.on_pair(a, b, &report);
                            local.pairs_measured += 1;
                            let estimate = report.outcome.estimate();
                            if shared.record(a, b, estimate) && estimate.is_determined() {
                                local.skews_confirmed += 1;
                            }
                        }
                        Ok(local)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        *table = shared.into_inner();
        for result in results {
            stats.merge(&result?);
        }
        Ok(())
    }
}
