//! Error types for synthesis

use thiserror::Error;

use crate::domain::{ConstructIdError, EnvironmentError, NetworkError, ValidationError};

/// Errors that can occur while declaring or synthesizing stacks
#[derive(Debug, Error)]
pub enum SynthError {
    /// Two constructs share a path inside one stack
    #[error("Construct '{id}' already exists in stack {stack}")]
    DuplicateConstruct { stack: String, id: String },

    /// Two stacks share a name inside one app
    #[error("Stack {0} already exists")]
    DuplicateStack(String),

    /// Stack handle does not belong to this app
    #[error("Unknown stack: {0}")]
    UnknownStack(String),

    /// A value references a resource that was never declared
    #[error("Reference to undeclared resource {logical_id} in stack {stack}")]
    DanglingReference { stack: String, logical_id: String },

    /// Stacks depend on each other in a loop
    #[error("Stack dependency cycle: {0}")]
    DependencyCycle(String),

    /// Stacks pinned to different environments cannot share values
    #[error("Stack {consumer} ({consumer_env}) cannot reference stack {producer} ({producer_env})")]
    CrossEnvironmentReference {
        consumer: String,
        consumer_env: String,
        producer: String,
        producer_env: String,
    },

    /// Physical name used twice for one resource type
    #[error("Physical name '{name}' of {resource_type} declared in both {first} and {second}")]
    DuplicatePhysicalName {
        resource_type: String,
        name: String,
        first: String,
        second: String,
    },

    /// Invalid construct id
    #[error("Invalid construct id: {0}")]
    InvalidConstructId(#[from] ConstructIdError),

    /// Invalid network value
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Invalid environment
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// Construct failed a deployment invariant
    #[error("Validation failed for {path}: {source}")]
    Validation {
        path: String,
        #[source]
        source: ValidationError,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Assembly I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for synthesis operations
pub type SynthResult<T> = Result<T, SynthError>;

impl SynthError {
    /// Attach the construct path to a failed invariant
    pub fn validation(path: impl ToString, source: ValidationError) -> Self {
        SynthError::Validation {
            path: path.to_string(),
            source,
        }
    }
}

impl From<serde_json::Error> for SynthError {
    fn from(err: serde_json::Error) -> Self {
        SynthError::Serialization(err.to_string())
    }
}
