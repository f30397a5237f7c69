// Copyright (c) 2025 - Cowboy AI, Inc.
//! Aurora MySQL Serverless v2 cluster
//!
//! Declares the DB subnet group, the generated credentials secret, the
//! cluster and its serverless writer instance.
//!
//! # Invariants
//!
//! - The cluster is never placed in public subnets
//! - Serverless capacity stays within 0.5-256 ACU in 0.5 steps with min <= max
//! - Exactly one secret is generated per cluster; consumers share it

use std::sync::Arc;

use tracing::debug;

use super::secret::DatabaseSecret;
use super::security_group::SecurityGroup;
use super::vpc::Vpc;
use crate::app::{ConstructPath, ResourceRef, Stack};
use crate::domain::invariants::validate_database_placement;
use crate::domain::{Port, RemovalPolicy, ResourceType, SubnetType};
use crate::errors::{SynthError, SynthResult};
use crate::template::{Resource, Value};

const ENGINE: &str = "aurora-mysql";
const SERVERLESS_INSTANCE_CLASS: &str = "db.serverless";
const MIN_ACU: f64 = 0.5;
const MAX_ACU: f64 = 256.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseClusterProps {
    pub engine_version: String,
    pub default_database_name: String,
    pub username: String,
    /// Construct id of the writer instance
    pub writer_id: String,
    pub min_capacity: f64,
    pub max_capacity: f64,
    pub subnet_type: SubnetType,
    pub port: u16,
    pub removal_policy: RemovalPolicy,
    pub deletion_protection: bool,
}

impl DatabaseClusterProps {
    pub fn new(default_database_name: impl Into<String>) -> Self {
        Self {
            engine_version: "8.0.mysql_aurora.3.07.1".to_string(),
            default_database_name: default_database_name.into(),
            username: "admin".to_string(),
            writer_id: "writer".to_string(),
            min_capacity: MIN_ACU,
            max_capacity: 2.0,
            subnet_type: SubnetType::PrivateWithEgress,
            port: 3306,
            removal_policy: RemovalPolicy::Snapshot,
            deletion_protection: true,
        }
    }

    /// Parameter group family default, e.g. `default.aurora-mysql8.0`
    fn parameter_group_name(&self) -> String {
        let major_minor: Vec<&str> = self.engine_version.split('.').take(2).collect();
        format!("default.{}{}", ENGINE, major_minor.join("."))
    }
}

/// Finite, within bounds, and on the half-ACU step
fn is_capacity(acu: f64) -> bool {
    acu.is_finite() && (MIN_ACU..=MAX_ACU).contains(&acu) && (acu * 2.0).fract() == 0.0
}

#[derive(Debug)]
pub struct DatabaseCluster {
    path: ConstructPath,
    cluster: ResourceRef,
    writer: ResourceRef,
    secret: Arc<DatabaseSecret>,
    security_groups: Vec<Arc<SecurityGroup>>,
    port: u16,
    default_database_name: String,
    subnet_type: SubnetType,
}

impl DatabaseCluster {
    pub fn new(
        stack: &mut Stack,
        path: ConstructPath,
        vpc: &Vpc,
        security_groups: Vec<Arc<SecurityGroup>>,
        props: DatabaseClusterProps,
    ) -> SynthResult<Self> {
        validate_database_placement(props.subnet_type)
            .map_err(|e| SynthError::validation(&path, e))?;

        if !is_capacity(props.min_capacity)
            || !is_capacity(props.max_capacity)
            || props.min_capacity > props.max_capacity
        {
            return Err(SynthError::Configuration(format!(
                "{}: serverless capacity {}-{} ACU outside {}-{}",
                path, props.min_capacity, props.max_capacity, MIN_ACU, MAX_ACU
            )));
        }

        let subnet_group = stack.add_resource(
            &path.child("Subnets")?.child("Default")?,
            Resource::new(ResourceType::DbSubnetGroup)
                .property(
                    "DBSubnetGroupDescription",
                    format!("Subnets for {} database", path.id()),
                )
                .property("SubnetIds", vpc.subnet_ids(props.subnet_type)?)
                .removal_policy(props.removal_policy),
        )?;

        let description = format!("Generated by the database cluster {}/{}", stack.name(), path);
        let secret = DatabaseSecret::generate(
            stack,
            path.child("Secret")?,
            &props.username,
            &description,
            props.removal_policy,
        )?;

        let group_ids: Vec<Value> = security_groups.iter().map(|g| g.group_id()).collect();

        let cluster = stack.add_resource(
            &path.child("Resource")?,
            Resource::new(ResourceType::DbCluster)
                .property("CopyTagsToSnapshot", true)
                .property("DBClusterParameterGroupName", props.parameter_group_name())
                .property("DBSubnetGroupName", Value::Ref(subnet_group.clone()))
                .property("DatabaseName", props.default_database_name.as_str())
                .property("DeletionProtection", props.deletion_protection)
                .property("Engine", ENGINE)
                .property("EngineVersion", props.engine_version.as_str())
                .property("MasterUsername", secret.dynamic_reference("username"))
                .property("MasterUserPassword", secret.dynamic_reference("password"))
                .property("Port", props.port)
                .property(
                    "ServerlessV2ScalingConfiguration",
                    Value::map([
                        ("MaxCapacity", Value::float(props.max_capacity)),
                        ("MinCapacity", Value::float(props.min_capacity)),
                    ]),
                )
                .property("StorageEncrypted", true)
                .property("VpcSecurityGroupIds", Value::List(group_ids))
                .removal_policy(props.removal_policy),
        )?;

        let secret = Arc::new(secret.attach(stack, &cluster)?);

        let writer = stack.add_resource(
            &path.child(props.writer_id.as_str())?,
            Resource::new(ResourceType::DbInstance)
                .property("DBClusterIdentifier", Value::Ref(cluster.clone()))
                .property("DBInstanceClass", SERVERLESS_INSTANCE_CLASS)
                .property("Engine", ENGINE)
                .property("PromotionTier", 0u32)
                .property("PubliclyAccessible", false)
                .removal_policy(props.removal_policy),
        )?;

        debug!(
            cluster = %path,
            version = %props.engine_version,
            subnets = %props.subnet_type,
            "Declared database cluster"
        );

        Ok(Self {
            path,
            cluster,
            writer,
            secret,
            security_groups,
            port: props.port,
            default_database_name: props.default_database_name,
            subnet_type: props.subnet_type,
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.cluster
    }

    pub fn writer(&self) -> &ResourceRef {
        &self.writer
    }

    /// The one secret generated for this cluster
    pub fn secret(&self) -> &Arc<DatabaseSecret> {
        &self.secret
    }

    pub fn security_groups(&self) -> &[Arc<SecurityGroup>] {
        &self.security_groups
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn default_database_name(&self) -> &str {
        &self.default_database_name
    }

    pub fn subnet_type(&self) -> SubnetType {
        self.subnet_type
    }

    /// Writer endpoint hostname
    pub fn endpoint_address(&self) -> Value {
        Value::get_att(&self.cluster, "Endpoint.Address")
    }

    /// `<scheme>://<endpoint>:<port>[/<database>][?<query>]`
    pub fn connection_url(&self, scheme: &str, database: Option<&str>, query: Option<&str>) -> Value {
        let mut tail = format!(":{}", self.port);
        if let Some(database) = database {
            tail.push('/');
            tail.push_str(database);
        }
        if let Some(query) = query {
            tail.push('?');
            tail.push_str(query);
        }
        Value::concat([
            Value::from(format!("{}://", scheme)),
            self.endpoint_address(),
            Value::from(tail),
        ])
    }

    /// Open the database port to `source` on every cluster security group
    pub fn allow_default_port_from(
        &self,
        stack: &mut Stack,
        source: &SecurityGroup,
        description: Option<&str>,
    ) -> SynthResult<()> {
        for group in &self.security_groups {
            group.allow_from(stack, source, Port::tcp(self.port), description)?;
        }
        Ok(())
    }
}
