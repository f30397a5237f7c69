// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Environment Value Object
//!
//! A stack is either environment-agnostic (one template deployable to any
//! account and region) or pinned to a concrete account and region.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Environment validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("Invalid AWS account id (expected 12 digits): {0}")]
    InvalidAccount(String),

    #[error("Invalid AWS region: {0}")]
    InvalidRegion(String),
}

/// Target account and region of a stack
///
/// # Invariants
/// - Account, when set, is exactly 12 ASCII digits
/// - Region, when set, looks like `us-east-1` (lowercase segments ending in a number)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    region: Option<String>,
}

const UNKNOWN_ACCOUNT: &str = "unknown-account";
const UNKNOWN_REGION: &str = "unknown-region";

impl Environment {
    /// Deployable anywhere
    pub fn agnostic() -> Self {
        Self::default()
    }

    /// Pinned to one account and region
    pub fn pinned(
        account: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, EnvironmentError> {
        let account = account.into();
        let region = region.into();

        if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(EnvironmentError::InvalidAccount(account));
        }

        if !is_region(&region) {
            return Err(EnvironmentError::InvalidRegion(region));
        }

        Ok(Self {
            account: Some(account),
            region: Some(region),
        })
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn is_agnostic(&self) -> bool {
        self.account.is_none() && self.region.is_none()
    }

    /// Whether resources in the two environments may reference each other
    ///
    /// Agnostic stacks resolve their environment at deploy time, so they are
    /// compatible with anything. Pinned stacks must match exactly.
    pub fn is_compatible_with(&self, other: &Environment) -> bool {
        self.is_agnostic() || other.is_agnostic() || self == other
    }

    /// Cloud assembly environment URI
    pub fn to_uri(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or(UNKNOWN_ACCOUNT),
            self.region.as_deref().unwrap_or(UNKNOWN_REGION)
        )
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

fn is_region(region: &str) -> bool {
    let segments: Vec<&str> = region.split('-').collect();
    let Some((number, names)) = segments.split_last() else {
        return false;
    };

    names.len() >= 2
        && names
            .iter()
            .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase()))
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
}
