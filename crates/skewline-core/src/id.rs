//! Node identity

use std::borrow::Borrow;
use std::fmt;

/// Node name - the identifier observers use for a node in their logs
///
/// Anonymous nodes carry a placeholder name until identity resolution
/// binds them to a real one.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeName(String);

impl NodeName {
    /// Sentinel for an observer whose identity is unknown
    pub const UNKNOWN: &'static str = "unknown";

    /// Literal an observer uses when reporting its own state
    pub const SELF_REF: &'static str = "self";

    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        NodeName(name.into())
    }

    /// The `unknown` sentinel
    pub fn unknown() -> Self {
        NodeName(Self::UNKNOWN.to_owned())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    #[inline]
    pub fn is_self_ref(&self) -> bool {
        self.0 == Self::SELF_REF
    }

    /// Reserved names never take part in analysis
    #[inline]
    pub fn is_reserved(&self) -> bool {
        self.is_unknown() || self.is_self_ref()
    }
}

impl fmt::Debug for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeName {
    fn from(name: &str) -> Self {
        NodeName::new(name)
    }
}

impl From<String> for NodeName {
    fn from(name: String) -> Self {
        NodeName(name)
    }
}

impl Borrow<str> for NodeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
