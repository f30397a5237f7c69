//! Declarative AWS infrastructure for the Popular Vote platform
//!
//! Stacks are declared as a tree of constructs and synthesized into a
//! CloudFormation cloud assembly:
//!
//! - [`domain`]: value objects and invariants (CIDRs, ports, ids, environments)
//! - [`template`]: declared resources, intrinsic values and rendered templates
//! - [`app`]: the construct tree of stacks and resource handles
//! - [`constructs`]: VPC, security groups, ECR, Aurora, ECS and load balancing
//! - [`stacks`]: the foundation, database and application stacks
//! - [`synth`]: cross-stack wiring, deployment order and the cloud assembly
//! - [`config`]: environment-variable configuration for the `deploy` binary

pub mod app;
pub mod config;
pub mod constructs;
pub mod domain;
pub mod errors;
pub mod stacks;
pub mod synth;
pub mod template;

// Re-export commonly used types
pub use app::{App, ConstructPath, ResourceRef, Stack, StackId};
pub use config::{DeployConfig, ProjectSettings};
pub use errors::{SynthError, SynthResult};
pub use stacks::{build_app, Deployment};
pub use synth::{synthesize, CloudAssembly, StackArtifact};
