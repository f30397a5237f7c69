// Copyright (c) 2025 - Cowboy AI, Inc.
//! Construct and Logical Id Value Objects
//!
//! A [`ConstructId`] names one node of the construct tree. A [`LogicalId`] is
//! the CloudFormation-safe identifier derived from the path of a resource
//! inside its stack. Derivation is deterministic: the same path always yields
//! the same logical id, so re-synthesis never replaces resources.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Construct id validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstructIdError {
    #[error("Construct id is empty")]
    Empty,

    #[error("Construct id exceeds maximum length of 255 characters: {0}")]
    TooLong(usize),

    #[error("Construct id cannot contain a path separator: {0}")]
    PathSeparator(String),

    #[error("Construct id has no alphanumeric characters: {0}")]
    NoAlphanumeric(String),
}

/// Id of a single node in the construct tree
///
/// Invariants:
/// - Non-empty, at most 255 characters
/// - No `/` (reserved as the path separator)
/// - At least one ASCII alphanumeric character, so it contributes to logical ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstructId(String);

impl ConstructId {
    pub const MAX_LENGTH: usize = 255;

    pub fn new(id: impl Into<String>) -> Result<Self, ConstructIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(ConstructIdError::Empty);
        }

        if id.len() > Self::MAX_LENGTH {
            return Err(ConstructIdError::TooLong(id.len()));
        }

        if id.contains('/') {
            return Err(ConstructIdError::PathSeparator(id));
        }

        if !id.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(ConstructIdError::NoAlphanumeric(id));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstructId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for ConstructId {
    type Error = ConstructIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// CloudFormation logical id (alphanumeric, at most 255 characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

/// Hidden from both the human-readable part and the digest
const HIDDEN_ID: &str = "Default";

/// Hidden from the human-readable part only
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

const DIGEST_LENGTH: usize = 8;

impl LogicalId {
    pub const MAX_LENGTH: usize = 255;

    /// Derive the logical id for a path of construct ids inside a stack
    ///
    /// # Rules
    /// - A single-component path yields the component with non-alphanumerics removed
    /// - Otherwise the human part joins the components, hiding `Default` and
    ///   `Resource` and collapsing consecutive duplicates, and an 8-character
    ///   digest of the full path is appended
    pub fn from_path(path: &[ConstructId]) -> Self {
        if let [single] = path {
            let human = remove_non_alphanumeric(single.as_str());
            if human.len() <= Self::MAX_LENGTH {
                return Self(human);
            }
        }

        let hashed: Vec<&str> = path
            .iter()
            .map(ConstructId::as_str)
            .filter(|c| *c != HIDDEN_ID)
            .collect();

        let mut human_components: Vec<&str> = Vec::new();
        for component in hashed
            .iter()
            .copied()
            .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
        {
            if human_components.last() != Some(&component) {
                human_components.push(component);
            }
        }

        let mut human: String = human_components
            .into_iter()
            .map(remove_non_alphanumeric)
            .collect();
        human.truncate(Self::MAX_LENGTH - DIGEST_LENGTH);

        Self(format!("{}{}", human, path_digest(&hashed)))
    }

    /// Wrap an id that is already CloudFormation-safe
    pub fn from_raw(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= Self::MAX_LENGTH
            && id.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then_some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn path_digest(components: &[&str]) -> String {
    let digest = Sha256::digest(components.join("/").as_bytes());
    digest
        .iter()
        .take(DIGEST_LENGTH / 2)
        .map(|b| format!("{:02X}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(ids: &[&str]) -> Vec<ConstructId> {
        ids.iter().map(|id| ConstructId::new(*id).unwrap()).collect()
    }

    #[test]
    fn test_construct_id_validation() {
        assert!(ConstructId::new("popularVoteVpc").is_ok());
        assert!(ConstructId::new("popular-vote-app").is_ok());
        assert_eq!(ConstructId::new(""), Err(ConstructIdError::Empty));
        assert!(matches!(
            ConstructId::new("a/b"),
            Err(ConstructIdError::PathSeparator(_))
        ));
        assert!(matches!(
            ConstructId::new("--"),
            Err(ConstructIdError::NoAlphanumeric(_))
        ));
        assert!(matches!(
            ConstructId::new("x".repeat(256)),
            Err(ConstructIdError::TooLong(256))
        ));
    }

    #[test]
    fn test_single_component_has_no_digest() {
        let id = LogicalId::from_path(&path(&["dbClusterEndpointHost"]));
        assert_eq!(id.as_str(), "dbClusterEndpointHost");

        let id = LogicalId::from_path(&path(&["popular-vote-app"]));
        assert_eq!(id.as_str(), "popularvoteapp");
    }

    #[test]
    fn test_nested_path_hides_resource_and_appends_digest() {
        let id = LogicalId::from_path(&path(&["popularVoteVpc", "Resource"]));
        assert!(id.as_str().starts_with("popularVoteVpc"));
        assert_eq!(id.as_str().len(), "popularVoteVpc".len() + DIGEST_LENGTH);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_consecutive_duplicates_collapse() {
        let id = LogicalId::from_path(&path(&["popularVoteApp", "Service", "Service"]));
        assert!(id.as_str().starts_with("popularVoteAppService"));
        assert!(!id.as_str().starts_with("popularVoteAppServiceService"));
    }

    #[test]
    fn test_derivation_is_deterministic_and_path_sensitive() {
        let a = LogicalId::from_path(&path(&["Vpc", "PublicSubnet1", "Subnet"]));
        let b = LogicalId::from_path(&path(&["Vpc", "PublicSubnet1", "Subnet"]));
        let c = LogicalId::from_path(&path(&["Vpc", "PublicSubnet2", "Subnet"]));
        assert_eq!(a, b);
        assert_ne!(a, c);

        // Same human part, different paths
        let d = LogicalId::from_path(&path(&["ab", "c"]));
        let e = LogicalId::from_path(&path(&["a", "bc"]));
        assert_ne!(d, e);
    }

    #[test]
    fn test_default_is_hidden_from_digest() {
        let with_default = LogicalId::from_path(&path(&["Db", "Subnets", "Default"]));
        let without = LogicalId::from_path(&path(&["Db", "Subnets"]));
        assert_eq!(with_default, without);
    }

    #[test]
    fn test_from_raw() {
        assert!(LogicalId::from_raw("ExportsOutputRefVpc").is_some());
        assert!(LogicalId::from_raw("not valid").is_none());
        assert!(LogicalId::from_raw("").is_none());
    }
}
