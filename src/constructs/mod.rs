// Copyright (c) 2025 - Cowboy AI, Inc.
//! Constructs
//!
//! Declaration units that add one or more resources to a stack and hand back
//! a typed handle. Handles are shared between stacks behind `Arc`, so every
//! consumer holds the exact object the producer declared.

pub mod ecr;
pub mod ecs;
pub mod iam;
pub mod logs;
pub mod patterns;
pub mod rds;
pub mod secret;
pub mod security_group;
pub mod vpc;

use crate::template::Value;

pub use ecr::{Repository, RepositoryProps};
pub use ecs::{
    AppProtocol, AwsLogDriver, Cluster, ContainerDefinition, ContainerImage, ContainerOptions,
    ContainerSecret, FargateTaskDefinition, HealthCheck, LogDriverMode, PortMapping,
};
pub use patterns::{ApplicationLoadBalancedFargateService, LoadBalancedServiceProps, TargetHealthCheck};
pub use rds::{DatabaseCluster, DatabaseClusterProps};
pub use secret::DatabaseSecret;
pub use security_group::{Peer, SecurityGroup, SecurityGroupProps};
pub use vpc::{Vpc, VpcProps, VpcSubnet};

/// Tag list in the `[{Key, Value}]` shape, sorted by key
pub(crate) fn tags<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
    let mut pairs: Vec<(&str, Value)> = pairs.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    Value::List(
        pairs
            .into_iter()
            .map(|(key, value)| Value::map([("Key", Value::from(key)), ("Value", value)]))
            .collect(),
    )
}
