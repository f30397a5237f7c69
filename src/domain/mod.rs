// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Domain Models
//!
//! Value objects with validation invariants that every construct builds on,
//! plus the pure invariant checks applied while stacks are declared.
//!
//! # Value Objects with Invariants
//!
//! - [`Ipv4Cidr`] - canonical IPv4 CIDR blocks
//! - [`Port`] - protocol plus inclusive port range
//! - [`ConstructId`] / [`LogicalId`] - construct tree names and their CloudFormation ids
//! - [`Environment`] - target account and region
//! - [`ResourceType`] - CloudFormation resource taxonomy
//!
//! # Pure Functions
//!
//! - [`plan_subnets`] - deterministic subnet address plan
//! - [`invariants`] - sizing, naming, teardown and access rules

pub mod construct_id;
pub mod environment;
pub mod invariants;
pub mod network;
pub mod resource_type;

pub use construct_id::{ConstructId, ConstructIdError, LogicalId};
pub use environment::{Environment, EnvironmentError};
pub use invariants::{ValidationError, ValidationResult};
pub use network::{
    plan_subnets, Exposure, Ipv4Cidr, NetworkError, PlannedSubnet, Port, Protocol, SubnetGroup,
    SubnetType,
};
pub use resource_type::{RemovalPolicy, ResourceCategory, ResourceType};
