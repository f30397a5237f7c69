// Copyright (c) 2025 - Cowboy AI, Inc.
//! Construct paths inside a stack

use std::fmt;

use crate::domain::{ConstructId, LogicalId};
use crate::errors::SynthResult;

/// Path of a construct relative to its stack
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructPath(Vec<ConstructId>);

impl ConstructPath {
    pub fn root(id: impl Into<String>) -> SynthResult<Self> {
        Ok(Self(vec![ConstructId::new(id)?]))
    }

    pub fn child(&self, id: impl Into<String>) -> SynthResult<Self> {
        let mut components = self.0.clone();
        components.push(ConstructId::new(id)?);
        Ok(Self(components))
    }

    pub fn components(&self) -> &[ConstructId] {
        &self.0
    }

    /// Last component
    pub fn id(&self) -> &ConstructId {
        // Paths are built from `root`, so there is always one component
        &self.0[self.0.len() - 1]
    }

    pub fn logical_id(&self) -> LogicalId {
        LogicalId::from_path(&self.0)
    }
}

impl fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(ConstructId::as_str).collect();
        write!(f, "{}", joined.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display_and_id() {
        let path = ConstructPath::root("popularVoteVpc")
            .unwrap()
            .child("PublicSubnet1")
            .unwrap()
            .child("Subnet")
            .unwrap();
        assert_eq!(path.to_string(), "popularVoteVpc/PublicSubnet1/Subnet");
        assert_eq!(path.id().as_str(), "Subnet");
        assert_eq!(path.components().len(), 3);
    }

    #[test]
    fn test_invalid_child_rejected() {
        let root = ConstructPath::root("Vpc").unwrap();
        assert!(root.child("a/b").is_err());
        assert!(ConstructPath::root("").is_err());
    }
}
