// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Logical Id Derivation
//!
//! Logical ids are the identity CloudFormation uses across deployments, so
//! derivation must be total, stable and safe for any construct path.

use popular_vote_infrastructure::domain::{ConstructId, LogicalId};
use proptest::prelude::*;

fn construct_id() -> impl Strategy<Value = ConstructId> {
    "[A-Za-z][A-Za-z0-9-]{0,20}".prop_map(|id| ConstructId::new(id).expect("generated id is valid"))
}

fn path() -> impl Strategy<Value = Vec<ConstructId>> {
    prop::collection::vec(construct_id(), 1..=6)
}

fn default_id() -> ConstructId {
    ConstructId::new("Default").expect("Default is a valid id")
}

proptest! {
    /// Every derived id is a valid CloudFormation logical id
    #[test]
    fn prop_logical_ids_are_cloudformation_safe(path in path()) {
        let id = LogicalId::from_path(&path);
        prop_assert!(!id.as_str().is_empty());
        prop_assert!(id.as_str().len() <= LogicalId::MAX_LENGTH);
        prop_assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        prop_assert_eq!(LogicalId::from_raw(id.as_str()), Some(id.clone()));
    }

    /// The same path always yields the same id
    #[test]
    fn prop_derivation_is_deterministic(path in path()) {
        prop_assert_eq!(LogicalId::from_path(&path), LogicalId::from_path(&path.clone()));
    }

    /// Nested paths end in an eight-digit uppercase hex digest
    #[test]
    fn prop_nested_paths_carry_digest(mut path in path(), extra in construct_id()) {
        path.push(extra);
        let id = LogicalId::from_path(&path);
        let digest = &id.as_str()[id.as_str().len() - 8..];
        prop_assert!(digest.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        prop_assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    /// `Default` components do not change the id of a nested path
    #[test]
    fn prop_default_is_transparent(mut path in path(), extra in construct_id()) {
        path.push(extra);
        let before = LogicalId::from_path(&path);
        path.push(default_id());
        prop_assert_eq!(LogicalId::from_path(&path), before);
    }

    /// Sibling constructs never share a logical id
    #[test]
    fn prop_siblings_differ(parent in path(), a in construct_id(), b in construct_id()) {
        prop_assume!(a != b);
        let mut left = parent.clone();
        left.push(a);
        let mut right = parent;
        right.push(b);
        prop_assert_ne!(LogicalId::from_path(&left), LogicalId::from_path(&right));
    }
}
