//! Skew table
//!
//! Sign convention: `get(a, b)` is `a`'s clock minus `b`'s clock, exactly
//! what `SkewDetector::detect(a, b)` measures, and `get(b, a)` is its
//! negation. Both directions are written together.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use skewline_core::{NodeName, Skew, SkewEstimate};

/// Skews from one node to each of its partners
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkewRecord {
    pub node: NodeName,
    pub partners: BTreeMap<NodeName, SkewEstimate>,
}

impl SkewRecord {
    pub fn new(node: NodeName) -> Self {
        SkewRecord {
            node,
            partners: BTreeMap::new(),
        }
    }

    pub fn get(&self, partner: &NodeName) -> SkewEstimate {
        self.partners.get(partner).copied().unwrap_or_default()
    }
}

/// Symmetric, first-write-wins map from node pair to skew estimate
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkewTable {
    records: BTreeMap<NodeName, SkewRecord>,
}

impl SkewTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, node: &NodeName) -> &mut SkewRecord {
        self.records
            .entry(node.clone())
            .or_insert_with(|| SkewRecord::new(node.clone()))
    }

    pub fn record_for(&self, node: &NodeName) -> Option<&SkewRecord> {
        self.records.get(node)
    }

    /// Store `estimate` for (a, b) and its negation for (b, a).
    ///
    /// A pair that already holds a determined estimate is left alone.
    /// Returns true if the table changed.
    pub fn record(&mut self, a: &NodeName, b: &NodeName, estimate: SkewEstimate) -> bool {
        if a == b || a.is_reserved() || b.is_reserved() || self.is_known(a, b) {
            return false;
        }
        let forward = self.get_or_create(a).partners.insert(b.clone(), estimate);
        self.get_or_create(b)
            .partners
            .insert(a.clone(), estimate.reversed());
        forward != Some(estimate)
    }

    /// Estimate for (a, b) under the table's sign convention
    pub fn get(&self, a: &NodeName, b: &NodeName) -> SkewEstimate {
        if let Some(SkewEstimate::Determined(skew)) =
            self.records.get(a).map(|r| r.get(b))
        {
            return SkewEstimate::Determined(skew);
        }
        self.records
            .get(b)
            .map(|r| r.get(a).reversed())
            .unwrap_or_default()
    }

    /// True if either direction holds a determined estimate
    pub fn is_known(&self, a: &NodeName, b: &NodeName) -> bool {
        let holds = |x: &NodeName, y: &NodeName| {
            self.records
                .get(x)
                .map_or(false, |r| r.get(y).is_determined())
        };
        holds(a, b) || holds(b, a)
    }

    /// Drop every entry involving `node`. Returns how many determined
    /// pairs were discarded.
    pub fn invalidate(&mut self, node: &NodeName) -> usize {
        let dropped = self
            .records
            .remove(node)
            .map_or(0, |r| r.partners.values().filter(|e| e.is_determined()).count());
        for record in self.records.values_mut() {
            record.partners.remove(node);
        }
        self.records.retain(|_, r| !r.partners.is_empty());
        dropped
    }

    pub fn partners(&self, node: &NodeName) -> Option<&BTreeMap<NodeName, SkewEstimate>> {
        self.records.get(node).map(|r| &r.partners)
    }

    /// Every determined pair once, as (a, b, skew) with a < b
    pub fn confirmed_pairs(&self) -> Vec<(NodeName, NodeName, Skew)> {
        self.records
            .values()
            .flat_map(|r| {
                r.partners.iter().filter_map(move |(partner, estimate)| {
                    match (r.node < *partner, estimate.skew()) {
                        (true, Some(skew)) => Some((r.node.clone(), partner.clone(), skew)),
                        _ => None,
                    }
                })
            })
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &SkewRecord> {
        self.records.values()
    }

    /// Number of nodes holding at least one entry
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Skew table shared between sweep workers
///
/// The known-check and the write happen under one lock, so first-write-wins
/// holds across threads.
#[derive(Debug, Default)]
pub struct SharedSkewTable {
    inner: Mutex<SkewTable>,
}

impl SharedSkewTable {
    pub fn new(table: SkewTable) -> Self {
        SharedSkewTable {
            inner: Mutex::new(table),
        }
    }

    pub fn record(&self, a: &NodeName, b: &NodeName, estimate: SkewEstimate) -> bool {
        self.inner.lock().record(a, b, estimate)
    }

    pub fn is_known(&self, a: &NodeName, b: &NodeName) -> bool {
        self.inner.lock().is_known(a, b)
    }

    pub fn get(&self, a: &NodeName, b: &NodeName) -> SkewEstimate {
        self.inner.lock().get(a, b)
    }

    pub fn snapshot(&self) -> SkewTable {
        self.inner.lock().clone()
    }

    pub fn into_inner(self) -> SkewTable {
        self.inner.into_inner()
    }
}
