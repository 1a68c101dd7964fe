//! Topology Simulator - synthetic observation logs for skew resolution
//!
//! Simulates:
//! - Nodes whose clocks differ from true time by a constant offset
//! - Per-observation timestamp jitter
//! - Every node observing every subject's state transitions
//! - Anonymous nodes logging under a placeholder id
//! - Decoy subjects that are talked about but never log themselves

use std::collections::BTreeMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use skewline_core::{
    Event, MemoryEventStore, NodeDirectory, NodeName, Skew, SkewResult, StateCode, Timestamp,
};

/// Clock model for a simulated node
#[derive(Clone, Copy, Debug)]
pub struct ClockModel {
    /// Local clock minus true time
    pub offset: Skew,
    /// Maximum absolute jitter per observation (milliseconds)
    pub jitter_ms: u32,
}

impl ClockModel {
    pub fn new(offset: Skew, jitter_ms: u32) -> Self {
        ClockModel { offset, jitter_ms }
    }

    /// Exact clock
    pub fn perfect() -> Self {
        Self::new(Skew::ZERO, 0)
    }

    /// Exact clock shifted by `secs`
    pub fn offset_secs(secs: i64) -> Self {
        Self::new(Skew::from_secs(secs), 0)
    }

    pub fn with_jitter(mut self, jitter_ms: u32) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    /// Read this clock at true time `true_ms`
    fn stamp(&self, true_ms: i64, rng: &mut StdRng) -> Timestamp {
        let jitter = if self.jitter_ms > 0 {
            rng.gen_range(-(self.jitter_ms as i64)..=self.jitter_ms as i64)
        } else {
            0
        };
        Timestamp::from_millis(true_ms + jitter) + self.offset
    }
}

#[derive(Clone, Debug)]
struct NodeSpec {
    name: NodeName,
    placeholder: Option<NodeName>,
    clock: ClockModel,
}

impl NodeSpec {
    /// Id the node's own log uses
    fn log_id(&self) -> &NodeName {
        self.placeholder.as_ref().unwrap_or(&self.name)
    }
}

/// Output of a simulation run
#[derive(Debug)]
pub struct SimulatedTopology {
    pub store: MemoryEventStore,
    pub directory: NodeDirectory,
    /// True clock offset of every node, keyed by real name
    pub offsets: BTreeMap<NodeName, Skew>,
    /// Placeholder -> real name for anonymous nodes
    pub identities: BTreeMap<NodeName, NodeName>,
}

impl SimulatedTopology {
    /// Expected table value for (a, b): a's clock minus b's clock
    pub fn expected_skew(&self, a: &NodeName, b: &NodeName) -> Option<Skew> {
        Some(*self.offsets.get(a)? - *self.offsets.get(b)?)
    }
}

/// Topology simulation scenario
pub struct TopologySimulator {
    nodes: Vec<NodeSpec>,
    decoys: Vec<NodeName>,
    rng: StdRng,
    transitions: usize,
    interval: Duration,
    observe_probability: f64,
    unknown_noise: usize,
}

impl TopologySimulator {
    pub fn new(seed: u64) -> Self {
        TopologySimulator {
            nodes: Vec::new(),
            decoys: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            transitions: 8,
            interval: Duration::from_secs(60),
            observe_probability: 1.0,
            unknown_noise: 0,
        }
    }

    /// Add a node that logs under its real name
    pub fn add_node(&mut self, name: impl Into<NodeName>, clock: ClockModel) -> &mut Self {
        self.nodes.push(NodeSpec {
            name: name.into(),
            placeholder: None,
            clock,
        });
        self
    }

    /// Add a node that logs under `placeholder` while peers know it as `name`
    pub fn add_anonymous(
        &mut self,
        placeholder: impl Into<NodeName>,
        name: impl Into<NodeName>,
        clock: ClockModel,
    ) -> &mut Self {
        self.nodes.push(NodeSpec {
            name: name.into(),
            placeholder: Some(placeholder.into()),
            clock,
        });
        self
    }

    /// Add a subject every node reports on that never logs itself
    pub fn add_decoy(&mut self, name: impl Into<NodeName>) -> &mut Self {
        self.decoys.push(name.into());
        self
    }

    /// State transitions per subject
    pub fn with_transitions(&mut self, transitions: usize) -> &mut Self {
        self.transitions = transitions.max(1);
        self
    }

    /// Mean gap between transitions
    pub fn with_interval(&mut self, interval: Duration) -> &mut Self {
        self.interval = interval;
        self
    }

    /// Probability that a peer logs a given transition of another subject
    pub fn with_observe_probability(&mut self, probability: f64) -> &mut Self {
        self.observe_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Extra events from the `unknown` observer
    pub fn with_unknown_noise(&mut self, events: usize) -> &mut Self {
        self.unknown_noise = events;
        self
    }

    /// Random transition timeline: irregular gaps, random phase, no
    /// repeated consecutive state
    fn timeline(&mut self) -> Vec<(i64, StateCode)> {
        let interval_ms = self.interval.as_millis().max(4) as i64;
        let mut true_ms = 1_000_000 + self.rng.gen_range(0..interval_ms);
        let mut previous: Option<StateCode> = None;
        let mut timeline = Vec::with_capacity(self.transitions);
        for _ in 0..self.transitions {
            let state = loop {
                let candidate = StateCode::new(self.rng.gen_range(0..=10));
                if Some(candidate) != previous {
                    break candidate;
                }
            };
            previous = Some(state);
            timeline.push((true_ms, state));
            true_ms += self.rng.gen_range(interval_ms / 2..=interval_ms * 3 / 2);
        }
        timeline
    }

    /// Generate the observation log and directory
    pub fn build(&mut self) -> SkewResult<SimulatedTopology> {
        let mut store = MemoryEventStore::new();
        let mut directory = NodeDirectory::new();
        let mut offsets = BTreeMap::new();
        let mut identities = BTreeMap::new();

        for node in &self.nodes {
            offsets.insert(node.name.clone(), node.clock.offset);
            match &node.placeholder {
                Some(placeholder) => {
                    directory.register_anonymous(placeholder.clone())?;
                    identities.insert(placeholder.clone(), node.name.clone());
                }
                None => directory.register_named(node.name.clone())?,
            }
        }

        let mut subjects: Vec<Option<usize>> = (0..self.nodes.len()).map(Some).collect();
        subjects.extend(self.decoys.iter().map(|_| None));
        let mut decoys = self.decoys.clone().into_iter();

        for subject in subjects {
            let timeline = self.timeline();
            let subject_name = match subject {
                Some(index) => self.nodes[index].name.clone(),
                None => match decoys.next() {
                    Some(name) => name,
                    None => break,
                },
            };
            for (index, observer) in self.nodes.iter().enumerate() {
                let reports_self = subject == Some(index);
                for &(true_ms, state) in &timeline {
                    if !reports_self && !self.rng.gen_bool(self.observe_probability) {
                        continue;
                    }
                    let target = if reports_self {
                        NodeName::new(NodeName::SELF_REF)
                    } else {
                        subject_name.clone()
                    };
                    store.push(Event::new(
                        observer.log_id().clone(),
                        target,
                        state,
                        observer.clock.stamp(true_ms, &mut self.rng),
                    ));
                }
            }
        }

        for _ in 0..self.unknown_noise {
            let Some(subject) = self.nodes.get(self.rng.gen_range(0..self.nodes.len().max(1)))
            else {
                break;
            };
            store.push(Event::new(
                NodeName::unknown(),
                subject.name.clone(),
                StateCode::new(self.rng.gen_range(0..=10)),
                Timestamp::from_millis(self.rng.gen_range(0..10_000_000)),
            ));
        }

        debug!(
            nodes = self.nodes.len(),
            decoys = self.decoys.len(),
            events = store.len(),
            "simulated topology built"
        );

        Ok(SimulatedTopology {
            store,
            directory,
            offsets,
            identities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skewline_core::{EventFilter, EventSource};

    #[test]
    fn test_every_node_reports_itself() {
        let topology = TopologySimulator::new(1)
            .add_node("a", ClockModel::perfect())
            .add_anonymous("9", "c", ClockModel::offset_secs(4))
            .with_transitions(6)
            .build()
            .unwrap();

        let a = NodeName::new("a");
        let nine = NodeName::new("9");
        assert_eq!(
            topology.store.query(&EventFilter::observations(&a, &a)).unwrap().len(),
            6
        );
        assert_eq!(
            topology.store.query(&EventFilter::observations(&nine, &nine)).unwrap().len(),
            6
        );
        // Peers refer to the anonymous node by its real name
        assert_eq!(
            topology.store.query(&EventFilter::new().origin("a").subject("c")).unwrap().len(),
            6
        );
        assert!(topology.directory.find("9").unwrap().is_anonymous());
        assert_eq!(topology.identities[&nine], NodeName::new("c"));
    }

    #[test]
    fn test_expected_skew_sign() {
        let topology = TopologySimulator::new(2)
            .add_node("a", ClockModel::perfect())
            .add_node("b", ClockModel::offset_secs(-5))
            .build()
            .unwrap();

        let a = NodeName::new("a");
        let b = NodeName::new("b");
        assert_eq!(topology.expected_skew(&a, &b), Some(Skew::from_secs(5)));
        assert_eq!(topology.expected_skew(&b, &a), Some(Skew::from_secs(-5)));
    }

    #[test]
    fn test_same_seed_same_log() {
        let build = || {
            TopologySimulator::new(42)
                .add_node("a", ClockModel::perfect().with_jitter(100))
                .add_node("b", ClockModel::offset_secs(3).with_jitter(100))
                .add_decoy("x")
                .with_unknown_noise(5)
                .build()
                .unwrap()
        };
        assert_eq!(build().store.events(), build().store.events());
    }

    #[test]
    fn test_decoys_never_report() {
        let topology = TopologySimulator::new(3)
            .add_node("a", ClockModel::perfect())
            .add_decoy("ghost")
            .build()
            .unwrap();

        assert!(topology.store.query(&EventFilter::new().origin("ghost")).unwrap().is_empty());
        assert_eq!(
            topology.store.query(&EventFilter::new().subject("ghost")).unwrap().len(),
            8
        );
    }
}
