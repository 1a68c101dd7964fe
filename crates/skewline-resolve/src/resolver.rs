//! Identity resolver
//!
//! Binds anonymous nodes to unbound candidate names. Each candidate is
//! tried through a [`RenamedView`] and scored by how well every named
//! node's observations of the candidate line up with the renamed node's
//! reports about itself. The best candidate is committed to the store
//! and directory.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use skewline_core::{
    EventSource, EventStore, NodeDirectory, NodeName, RenamedView, Skew, SkewResult,
};

use crate::{
    Detection, PassControl, PassObserver, PassStats, SkewDetector, SkewSweep, SkewTable,
    UnresolvedReason,
};

/// How well a candidate name fits an anonymous node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateScore {
    pub candidate: NodeName,
    /// Named nodes whose streams aligned (confirmed or negligible skew)
    pub evidence: usize,
    /// Named nodes with a confirmed skew
    pub confirmed: usize,
    /// Named nodes with no alignment at all
    pub undetermined: usize,
    /// Named nodes whose skew disagreed with the reverse measurement
    pub contradicted: usize,
    /// Sum of |skew| over confirmed pairs
    pub magnitude: Skew,
}

impl CandidateScore {
    fn new(candidate: NodeName) -> Self {
        CandidateScore {
            candidate,
            evidence: 0,
            confirmed: 0,
            undetermined: 0,
            contradicted: 0,
            magnitude: Skew::ZERO,
        }
    }

    fn tally(&mut self, outcome: Detection) {
        match outcome {
            Detection::Confirmed(skew) => {
                self.evidence += 1;
                self.confirmed += 1;
                self.magnitude = self.magnitude + skew.abs();
            }
            Detection::Negligible => self.evidence += 1,
            Detection::Undetermined => self.undetermined += 1,
        }
    }

    /// Ranking, best first: most evidence, then fewest contradictions,
    /// then most confirmed skews, then smallest total magnitude, then name.
    pub fn rank(&self, other: &CandidateScore) -> Ordering {
        other
            .evidence
            .cmp(&self.evidence)
            .then_with(|| self.contradicted.cmp(&other.contradicted))
            .then_with(|| other.confirmed.cmp(&self.confirmed))
            .then_with(|| self.magnitude.cmp(&other.magnitude))
            .then_with(|| self.candidate.cmp(&other.candidate))
    }
}

/// A committed placeholder -> name binding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub placeholder: NodeName,
    pub name: NodeName,
    pub score: CandidateScore,
    /// Events rewritten by the rename
    pub events: usize,
}

impl Binding {
    /// No named node's observations lined up with the chosen name; the
    /// binding rests on the tie-break alone.
    pub fn is_weak(&self) -> bool {
        self.score.evidence == 0
    }
}

/// Overall result of identity resolution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionStatus {
    Resolved { bound: usize },
    Failed { unresolved: usize },
}

impl ResolutionStatus {
    pub fn is_success(self) -> bool {
        matches!(self, ResolutionStatus::Resolved { .. })
    }

    pub fn unresolved(self) -> usize {
        match self {
            ResolutionStatus::Resolved { .. } => 0,
            ResolutionStatus::Failed { unresolved } => unresolved,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub status: ResolutionStatus,
    pub bindings: Vec<Binding>,
}

impl ResolutionOutcome {
    fn failed(unresolved: usize) -> Self {
        ResolutionOutcome {
            status: ResolutionStatus::Failed { unresolved },
            bindings: Vec::new(),
        }
    }
}

/// Identity resolver for one resolution pass
pub struct IdentityResolver<'a> {
    detector: &'a SkewDetector,
    observer: &'a dyn PassObserver,
    control: &'a PassControl,
    workers: usize,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(
        detector: &'a SkewDetector,
        observer: &'a dyn PassObserver,
        control: &'a PassControl,
        workers: usize,
    ) -> Self {
        IdentityResolver {
            detector,
            observer,
            control,
            workers,
        }
    }

    /// Subjects that are neither reserved nor already a directory id
    pub fn candidate_names<S>(source: &S, directory: &NodeDirectory) -> SkewResult<BTreeSet<NodeName>>
    where
        S: EventSource + ?Sized,
    {
        Ok(source
            .distinct_subjects()?
            .into_iter()
            .filter(|name| !name.is_reserved() && !directory.contains(name.as_str()))
            .collect())
    }

    /// Score `candidate` for `placeholder` against every named node.
    ///
    /// Only a named node observing the candidate says anything about the
    /// name; the renamed node observing others aligns whatever it is
    /// called, so that direction is used solely to reject contradictions.
    pub fn score_candidate<S>(
        &self,
        source: &S,
        placeholder: &NodeName,
        candidate: &NodeName,
        named: &[NodeName],
    ) -> SkewResult<CandidateScore>
    where
        S: EventSource + ?Sized,
    {
        let view = RenamedView::new(source, placeholder.clone(), candidate.clone());
        let mut score = CandidateScore::new(candidate.clone());
        for node in named {
            let forward = self.detector.detect_report(&view, node, candidate)?.outcome;
            if let Detection::Confirmed(skew) = forward {
                let backward = self.detector.detect_report(&view, candidate, node)?.outcome;
                if let Detection::Confirmed(reverse) = backward {
                    if (skew + reverse).abs() >= self.detector.tolerance() {
                        score.contradicted += 1;
                        continue;
                    }
                }
            }
            score.tally(forward);
        }
        Ok(score)
    }

    /// Try to bind every anonymous node in `directory`
    pub fn resolve<S>(
        &self,
        store: &mut S,
        directory: &mut NodeDirectory,
        table: &mut SkewTable,
        stats: &mut PassStats,
    ) -> SkewResult<ResolutionOutcome>
    where
        S: EventStore + Sync + ?Sized,
    {
        let anonymous = directory.anonymous();
        if anonymous.is_empty() {
            return Ok(ResolutionOutcome {
                status: ResolutionStatus::Resolved { bound: 0 },
                bindings: Vec::new(),
            });
        }
        if directory.named().is_empty() {
            // Nothing to validate a candidate against
            for placeholder in &anonymous {
                self.observer
                    .on_unresolved(placeholder, UnresolvedReason::NoNamedReference);
            }
            stats.nodes_unresolved += anonymous.len() as u64;
            return Ok(ResolutionOutcome::failed(anonymous.len()));
        }

        let mut pool = Self::candidate_names(&*store, directory)?;
        if pool.is_empty() {
            for placeholder in &anonymous {
                self.observer
                    .on_unresolved(placeholder, UnresolvedReason::NoCandidates);
            }
            stats.nodes_unresolved += anonymous.len() as u64;
            return Ok(ResolutionOutcome::failed(anonymous.len()));
        }

        let mut bindings = Vec::new();
        let mut unresolved = 0;
        for placeholder in anonymous {
            if pool.is_empty() {
                self.observer
                    .on_unresolved(&placeholder, UnresolvedReason::NoCandidates);
                unresolved += 1;
                continue;
            }

            let named = directory.named();
            let mut best: Option<CandidateScore> = None;
            for candidate in &pool {
                self.control.check()?;
                let score = self.score_candidate(&*store, &placeholder, candidate, &named)?;
                stats.candidates_scored += 1;
                self.observer.on_candidate(&placeholder, &score);
                best = match best {
                    Some(current) if current.rank(&score) != Ordering::Greater => Some(current),
                    _ => Some(score),
                };
            }
            let Some(winner) = best else { continue };

            let binding = self.commit(store, directory, table, stats, &placeholder, winner)?;
            pool.remove(&binding.name);
            bindings.push(binding);
        }

        stats.nodes_unresolved += unresolved as u64;
        let status = if unresolved == 0 {
            ResolutionStatus::Resolved {
                bound: bindings.len(),
            }
        } else {
            ResolutionStatus::Failed { unresolved }
        };
        Ok(ResolutionOutcome { status, bindings })
    }

    fn commit<S>(
        &self,
        store: &mut S,
        directory: &mut NodeDirectory,
        table: &mut SkewTable,
        stats: &mut PassStats,
        placeholder: &NodeName,
        winner: CandidateScore,
    ) -> SkewResult<Binding>
    where
        S: EventStore + Sync + ?Sized,
    {
        let name = winner.candidate.clone();
        let events = store.rename(placeholder, &name)?;
        directory.bind(placeholder, &name)?;
        table.invalidate(placeholder);
        table.invalidate(&name);
        stats.events_renamed += events as u64;
        stats.nodes_bound += 1;
        self.observer.on_bound(placeholder, &name, events);

        let others = directory.named();
        SkewSweep::new(self.detector, self.observer, self.control, self.workers)
            .run_for(&*store, &name, &others, table, stats)?;

        Ok(Binding {
            placeholder: placeholder.clone(),
            name,
            score: winner,
            events,
        })
    }
}
