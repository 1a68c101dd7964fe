//! Node directory
//!
//! Keeps track of which node ids are confirmed names and which are
//! placeholders still awaiting identity resolution.

use std::collections::BTreeMap;

use crate::{NodeName, SkewError, SkewResult};

/// Whether a node's identity is confirmed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeIdentity {
    Named,
    Anonymous,
}

/// Directory entry for one node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRecord {
    /// Identifier the node's events are recorded under
    pub id: NodeName,
    pub identity: NodeIdentity,
    /// Placeholder this node was known by before being resolved
    pub resolved_from: Option<NodeName>,
}

impl NodeRecord {
    pub fn named(id: impl Into<NodeName>) -> Self {
        NodeRecord {
            id: id.into(),
            identity: NodeIdentity::Named,
            resolved_from: None,
        }
    }

    pub fn anonymous(placeholder: impl Into<NodeName>) -> Self {
        NodeRecord {
            id: placeholder.into(),
            identity: NodeIdentity::Anonymous,
            resolved_from: None,
        }
    }

    #[inline]
    pub fn is_named(&self) -> bool {
        self.identity == NodeIdentity::Named
    }

    #[inline]
    pub fn is_anonymous(&self) -> bool {
        self.identity == NodeIdentity::Anonymous
    }
}

/// Directory of known nodes, keyed by id
#[derive(Clone, Debug, Default)]
pub struct NodeDirectory {
    nodes: BTreeMap<NodeName, NodeRecord>,
}

impl NodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    /// All records in id order
    pub fn find_all(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Insert or replace the record with the same id
    pub fn upsert(&mut self, record: NodeRecord) -> SkewResult<()> {
        if record.id.is_reserved() {
            return Err(SkewError::ReservedName(record.id));
        }
        self.nodes.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<NodeRecord> {
        self.nodes.remove(id)
    }

    pub fn register_named(&mut self, id: impl Into<NodeName>) -> SkewResult<()> {
        self.upsert(NodeRecord::named(id))
    }

    pub fn register_anonymous(&mut self, placeholder: impl Into<NodeName>) -> SkewResult<()> {
        self.upsert(NodeRecord::anonymous(placeholder))
    }

    /// Ids of named nodes, sorted
    pub fn named(&self) -> Vec<NodeName> {
        self.find_all()
            .filter(|r| r.is_named())
            .map(|r| r.id.clone())
            .collect()
    }

    /// Ids of anonymous nodes, sorted
    pub fn anonymous(&self) -> Vec<NodeName> {
        self.find_all()
            .filter(|r| r.is_anonymous())
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Replace the anonymous `placeholder` by a named record for `name`
    pub fn bind(&mut self, placeholder: &NodeName, name: &NodeName) -> SkewResult<()> {
        match self.nodes.get(placeholder.as_str()) {
            None => return Err(SkewError::UnknownNode(placeholder.clone())),
            Some(record) if !record.is_anonymous() => {
                return Err(SkewError::NotAnonymous(placeholder.clone()))
            }
            Some(_) => {}
        }
        if name.is_reserved() {
            return Err(SkewError::ReservedName(name.clone()));
        }
        self.nodes.remove(placeholder.as_str());
        self.nodes.insert(
            name.clone(),
            NodeRecord {
                id: name.clone(),
                identity: NodeIdentity::Named,
                resolved_from: Some(placeholder.clone()),
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_and_anonymous_split() {
        let mut dir = NodeDirectory::new();
        dir.register_named("b").unwrap();
        dir.register_named("a").unwrap();
        dir.register_anonymous("2").unwrap();

        assert_eq!(dir.named(), vec![NodeName::new("a"), NodeName::new("b")]);
        assert_eq!(dir.anonymous(), vec![NodeName::new("2")]);
        assert_eq!(dir.len(), 3);
    }

    #[test]
    fn test_reserved_names_refused() {
        let mut dir = NodeDirectory::new();
        assert!(matches!(
            dir.register_named("unknown"),
            Err(SkewError::ReservedName(_))
        ));
        assert!(dir.is_empty());
    }

    #[test]
    fn test_upsert_replaces() {
        let mut dir = NodeDirectory::new();
        dir.register_anonymous("x").unwrap();
        dir.register_named("x").unwrap();

        assert_eq!(dir.len(), 1);
        assert!(dir.find("x").unwrap().is_named());
    }

    #[test]
    fn test_bind_remembers_placeholder() {
        let mut dir = NodeDirectory::new();
        dir.register_anonymous("7").unwrap();
        dir.bind(&"7".into(), &"db3".into()).unwrap();

        assert!(dir.find("7").is_none());
        let record = dir.find("db3").unwrap();
        assert!(record.is_named());
        assert_eq!(record.resolved_from, Some(NodeName::new("7")));
    }

    #[test]
    fn test_bind_requires_anonymous() {
        let mut dir = NodeDirectory::new();
        dir.register_named("a").unwrap();

        assert!(matches!(
            dir.bind(&"a".into(), &"b".into()),
            Err(SkewError::NotAnonymous(_))
        ));
        assert!(matches!(
            dir.bind(&"zz".into(), &"b".into()),
            Err(SkewError::UnknownNode(_))
        ));
    }
}
