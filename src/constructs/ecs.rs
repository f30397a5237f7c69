// Copyright (c) 2025 - Cowboy AI, Inc.
//! ECS Clusters and Fargate Task Definitions
//!
//! A task definition always has a task role. The execution role is created
//! on demand, the first time a container needs the agent to pull a private
//! image, write logs or read a secret, and its default policy grants exactly
//! those resources.
//!
//! # Invariants
//!
//! - CPU and memory form a valid Fargate size
//! - Container names are unique within a task definition
//! - Container health checks stay within ECS limits

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::ecr::Repository;
use super::iam::{Policy, PolicyStatement, Role};
use super::logs::LogGroup;
use super::secret::DatabaseSecret;
use super::vpc::Vpc;
use crate::app::{ConstructPath, ResourceRef, Stack};
use crate::domain::invariants::{
    validate_container_health_check, validate_fargate_size, validate_log_retention,
};
use crate::domain::{ConstructId, LogicalId, RemovalPolicy, ResourceType};
use crate::errors::{SynthError, SynthResult};
use crate::template::{Pseudo, Resource, Value};

const ECS_TASKS_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// ECS cluster
#[derive(Debug)]
pub struct Cluster {
    path: ConstructPath,
    cluster: ResourceRef,
    name: Option<String>,
    vpc: Arc<Vpc>,
}

impl Cluster {
    pub fn new(
        stack: &mut Stack,
        path: ConstructPath,
        vpc: Arc<Vpc>,
        name: Option<&str>,
    ) -> SynthResult<Self> {
        let mut resource = Resource::new(ResourceType::EcsCluster);
        if let Some(name) = name {
            resource.set_property("ClusterName", name);
        }
        let cluster = stack.add_resource(&path.child("Resource")?, resource)?;

        Ok(Self {
            path,
            cluster,
            name: name.map(str::to_string),
            vpc,
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.cluster
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Network the cluster's services run in
    pub fn vpc(&self) -> &Arc<Vpc> {
        &self.vpc
    }

    pub fn cluster_name(&self) -> Value {
        Value::Ref(self.cluster.clone())
    }
}

/// Where a container image comes from
#[derive(Debug, Clone)]
pub enum ContainerImage {
    /// Image in a repository declared by this app
    Repository {
        repository: Arc<Repository>,
        tag: String,
    },
    /// Public image name, e.g. `amazon/amazon-ecs-sample`
    Registry(String),
}

impl ContainerImage {
    pub fn from_repository(repository: &Arc<Repository>, tag: impl Into<String>) -> Self {
        ContainerImage::Repository {
            repository: Arc::clone(repository),
            tag: tag.into(),
        }
    }

    pub fn from_registry(name: impl Into<String>) -> Self {
        ContainerImage::Registry(name.into())
    }

    pub fn repository(&self) -> Option<&Arc<Repository>> {
        match self {
            ContainerImage::Repository { repository, .. } => Some(repository),
            ContainerImage::Registry(_) => None,
        }
    }

    fn image_value(&self) -> Value {
        match self {
            ContainerImage::Repository { repository, tag } => repository.image_uri(tag),
            ContainerImage::Registry(name) => Value::from(name),
        }
    }
}

/// Environment variable read from a JSON field of a secret
#[derive(Debug, Clone)]
pub struct ContainerSecret {
    secret: Arc<DatabaseSecret>,
    field: String,
}

impl ContainerSecret {
    pub fn from_secrets_manager(secret: &Arc<DatabaseSecret>, field: impl Into<String>) -> Self {
        Self {
            secret: Arc::clone(secret),
            field: field.into(),
        }
    }

    pub fn secret(&self) -> &Arc<DatabaseSecret> {
        &self.secret
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Application protocol of a port mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppProtocol {
    Http,
    Http2,
    Grpc,
}

impl AppProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Http2 => "http2",
            Self::Grpc => "grpc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub container_port: u16,
    pub name: Option<String>,
    pub app_protocol: Option<AppProtocol>,
}

impl PortMapping {
    pub fn tcp(container_port: u16) -> Self {
        Self {
            container_port,
            name: None,
            app_protocol: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_app_protocol(mut self, protocol: AppProtocol) -> Self {
        self.app_protocol = Some(protocol);
        self
    }

    fn to_value(&self) -> Value {
        let mut entries = vec![
            ("ContainerPort", Value::from(self.container_port)),
            ("Protocol", Value::from("tcp")),
        ];
        if let Some(name) = &self.name {
            entries.push(("Name", Value::from(name)));
        }
        if let Some(protocol) = self.app_protocol {
            entries.push(("AppProtocol", Value::from(protocol.as_str())));
        }
        Value::map(entries)
    }
}

/// Container health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub command: Vec<String>,
    pub interval: Duration,
    pub timeout: Duration,
    pub retries: u32,
    pub start_period: Duration,
}

impl HealthCheck {
    /// `CMD-SHELL` check with ECS default timings
    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            command: vec!["CMD-SHELL".to_string(), command.into()],
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
            retries: 3,
            start_period: Duration::ZERO,
        }
    }

    fn to_value(&self) -> Value {
        Value::map([
            ("Command", Value::from(self.command.clone())),
            ("Interval", Value::from(self.interval.as_secs())),
            ("Retries", Value::from(self.retries)),
            ("StartPeriod", Value::from(self.start_period.as_secs())),
            ("Timeout", Value::from(self.timeout.as_secs())),
        ])
    }
}

/// awslogs delivery mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDriverMode {
    Blocking,
    NonBlocking,
}

impl LogDriverMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::NonBlocking => "non-blocking",
        }
    }
}

/// `awslogs` driver writing to a log group created for the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsLogDriver {
    pub stream_prefix: String,
    pub mode: Option<LogDriverMode>,
    pub max_buffer_size_mib: Option<u32>,
    pub retention_days: Option<u32>,
}

impl AwsLogDriver {
    pub fn new(stream_prefix: impl Into<String>) -> Self {
        Self {
            stream_prefix: stream_prefix.into(),
            mode: None,
            max_buffer_size_mib: None,
            retention_days: None,
        }
    }

    /// Non-blocking delivery through an in-memory buffer
    pub fn non_blocking(mut self, max_buffer_size_mib: u32) -> Self {
        self.mode = Some(LogDriverMode::NonBlocking);
        self.max_buffer_size_mib = Some(max_buffer_size_mib);
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = Some(days);
        self
    }
}

/// Everything a container needs, as handed to [`FargateTaskDefinition::add_container`]
#[derive(Debug, Clone)]
pub struct ContainerOptions {
    pub image: ContainerImage,
    pub environment: BTreeMap<String, Value>,
    pub secrets: BTreeMap<String, ContainerSecret>,
    pub logging: Option<AwsLogDriver>,
    pub port_mappings: Vec<PortMapping>,
    pub health_check: Option<HealthCheck>,
    pub essential: bool,
}

impl ContainerOptions {
    pub fn new(image: ContainerImage) -> Self {
        Self {
            image,
            environment: BTreeMap::new(),
            secrets: BTreeMap::new(),
            logging: None,
            port_mappings: Vec::new(),
            health_check: None,
            essential: true,
        }
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    pub fn secret(mut self, name: impl Into<String>, secret: ContainerSecret) -> Self {
        self.secrets.insert(name.into(), secret);
        self
    }

    pub fn logging(mut self, driver: AwsLogDriver) -> Self {
        self.logging = Some(driver);
        self
    }

    pub fn port_mapping(mut self, mapping: PortMapping) -> Self {
        self.port_mappings.push(mapping);
        self
    }

    pub fn health_check(mut self, check: HealthCheck) -> Self {
        self.health_check = Some(check);
        self
    }
}

/// A container added to a task definition
#[derive(Debug, Clone)]
pub struct ContainerDefinition {
    name: String,
    options: ContainerOptions,
    log_group: Option<LogGroup>,
}

impl ContainerDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &ContainerImage {
        &self.options.image
    }

    pub fn environment(&self) -> &BTreeMap<String, Value> {
        &self.options.environment
    }

    pub fn secrets(&self) -> &BTreeMap<String, ContainerSecret> {
        &self.options.secrets
    }

    pub fn port_mappings(&self) -> &[PortMapping] {
        &self.options.port_mappings
    }

    pub fn health_check(&self) -> Option<&HealthCheck> {
        self.options.health_check.as_ref()
    }

    pub fn log_group(&self) -> Option<&LogGroup> {
        self.log_group.as_ref()
    }

    fn to_value(&self) -> Value {
        let options = &self.options;
        let mut entries = vec![
            ("Essential", Value::from(options.essential)),
            ("Image", options.image.image_value()),
            ("Name", Value::from(&self.name)),
        ];

        if !options.environment.is_empty() {
            let environment = options
                .environment
                .iter()
                .map(|(name, value)| {
                    Value::map([("Name", Value::from(name)), ("Value", value.clone())])
                })
                .collect();
            entries.push(("Environment", Value::List(environment)));
        }

        if !options.secrets.is_empty() {
            let secrets = options
                .secrets
                .iter()
                .map(|(name, secret)| {
                    Value::map([
                        ("Name", Value::from(name)),
                        ("ValueFrom", secret.secret.ecs_value_from(&secret.field)),
                    ])
                })
                .collect();
            entries.push(("Secrets", Value::List(secrets)));
        }

        if !options.port_mappings.is_empty() {
            let mappings = options.port_mappings.iter().map(PortMapping::to_value).collect();
            entries.push(("PortMappings", Value::List(mappings)));
        }

        if let Some(check) = &options.health_check {
            entries.push(("HealthCheck", check.to_value()));
        }

        if let (Some(driver), Some(group)) = (&options.logging, &self.log_group) {
            let mut log_options = vec![
                ("awslogs-group", group.log_group_name()),
                ("awslogs-region", Value::Pseudo(Pseudo::Region)),
                ("awslogs-stream-prefix", Value::from(&driver.stream_prefix)),
            ];
            if let Some(mode) = driver.mode {
                log_options.push(("mode", Value::from(mode.as_str())));
            }
            if let Some(size) = driver.max_buffer_size_mib {
                log_options.push(("max-buffer-size", Value::from(format!("{}m", size))));
            }
            entries.push((
                "LogConfiguration",
                Value::map([
                    ("LogDriver", Value::from("awslogs")),
                    ("Options", Value::map(log_options)),
                ]),
            ));
        }

        Value::map(entries)
    }
}

/// Fargate task definition
#[derive(Debug)]
pub struct FargateTaskDefinition {
    path: ConstructPath,
    task_definition: ResourceRef,
    family: String,
    cpu: u32,
    memory_mib: u32,
    task_role: Role,
    execution: Option<(Role, Policy)>,
    containers: Vec<ContainerDefinition>,
}

impl FargateTaskDefinition {
    pub fn new(stack: &mut Stack, path: ConstructPath, cpu: u32, memory_mib: u32) -> SynthResult<Self> {
        validate_fargate_size(cpu, memory_mib).map_err(|e| SynthError::validation(&path, e))?;

        let task_role = Role::for_service(stack, path.child("TaskRole")?, ECS_TASKS_PRINCIPAL)?;

        let mut unique_path = vec![ConstructId::new(stack.name())?];
        unique_path.extend(path.components().iter().cloned());
        let family = LogicalId::from_path(&unique_path).to_string();

        let task_definition = stack.add_resource(
            &path.child("Resource")?,
            Resource::new(ResourceType::TaskDefinition)
                .property("ContainerDefinitions", Value::List(Vec::new()))
                .property("Cpu", cpu.to_string())
                .property("Family", family.as_str())
                .property("Memory", memory_mib.to_string())
                .property("NetworkMode", "awsvpc")
                .property("RequiresCompatibilities", vec!["FARGATE"])
                .property("TaskRoleArn", task_role.role_arn()),
        )?;

        Ok(Self {
            path,
            task_definition,
            family,
            cpu,
            memory_mib,
            task_role,
            execution: None,
            containers: Vec::new(),
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.task_definition
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn cpu(&self) -> u32 {
        self.cpu
    }

    pub fn memory_mib(&self) -> u32 {
        self.memory_mib
    }

    pub fn task_definition_arn(&self) -> Value {
        Value::Ref(self.task_definition.clone())
    }

    pub fn task_role(&self) -> &Role {
        &self.task_role
    }

    pub fn execution_role(&self) -> Option<&Role> {
        self.execution.as_ref().map(|(role, _)| role)
    }

    pub fn execution_policy(&self) -> Option<&Policy> {
        self.execution.as_ref().map(|(_, policy)| policy)
    }

    pub fn containers(&self) -> &[ContainerDefinition] {
        &self.containers
    }

    pub fn container(&self, name: &str) -> Option<&ContainerDefinition> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// First essential container, the one a load balancer targets by default
    pub fn default_container(&self) -> Option<&ContainerDefinition> {
        self.containers.iter().find(|c| c.options.essential)
    }

    /// Distinct secrets referenced by any container
    pub fn referenced_secrets(&self) -> Vec<&Arc<DatabaseSecret>> {
        let mut secrets: Vec<&Arc<DatabaseSecret>> = Vec::new();
        for secret in self.containers.iter().flat_map(|c| c.options.secrets.values()) {
            if !secrets.iter().any(|s| Arc::ptr_eq(s, &secret.secret)) {
                secrets.push(&secret.secret);
            }
        }
        secrets
    }

    fn grant(&mut self, stack: &mut Stack, statement: PolicyStatement) -> SynthResult<()> {
        if self.execution.is_none() {
            let role_path = self.path.child("ExecutionRole")?;
            let role = Role::for_service(stack, role_path.clone(), ECS_TASKS_PRINCIPAL)?;
            let policy = Policy::attached_to(stack, role_path.child("DefaultPolicy")?, &role)?;
            stack
                .resource_mut(&self.task_definition)?
                .set_property("ExecutionRoleArn", role.role_arn());
            self.execution = Some((role, policy));
        }

        match self.execution.as_mut() {
            Some((_, policy)) => policy.add_statement(stack, statement),
            None => Ok(()),
        }
    }

    /// Add a container, creating its log group and execution grants
    pub fn add_container(
        &mut self,
        stack: &mut Stack,
        name: &str,
        options: ContainerOptions,
    ) -> SynthResult<()> {
        let container_path = self.path.child(name)?;

        if self.container(name).is_some() {
            return Err(SynthError::DuplicateConstruct {
                stack: stack.name().to_string(),
                id: container_path.to_string(),
            });
        }

        if let Some(check) = &options.health_check {
            validate_container_health_check(
                &check.command,
                check.interval,
                check.timeout,
                check.retries,
                check.start_period,
            )
            .map_err(|e| SynthError::validation(&container_path, e))?;
        }

        // Fail before any grant touches the stack
        let log_group_path = container_path.child("LogGroup")?;
        if let Some(days) = options.logging.as_ref().and_then(|d| d.retention_days) {
            validate_log_retention(days).map_err(|e| SynthError::validation(&log_group_path, e))?;
        }

        if let Some(repository) = options.image.repository() {
            self.grant(
                stack,
                PolicyStatement::allow(
                    [
                        "ecr:BatchCheckLayerAvailability",
                        "ecr:BatchGetImage",
                        "ecr:GetDownloadUrlForLayer",
                    ],
                    [repository.repository_arn()],
                ),
            )?;
            self.grant(
                stack,
                PolicyStatement::allow(["ecr:GetAuthorizationToken"], [Value::from("*")]),
            )?;
        }

        let log_group = match &options.logging {
            Some(driver) => {
                let group = LogGroup::new(
                    stack,
                    log_group_path,
                    driver.retention_days,
                    RemovalPolicy::Destroy,
                )?;
                self.grant(
                    stack,
                    PolicyStatement::allow(
                        ["logs:CreateLogStream", "logs:PutLogEvents"],
                        [group.log_group_arn()],
                    ),
                )?;
                Some(group)
            }
            None => None,
        };

        for secret in options.secrets.values() {
            self.grant(
                stack,
                PolicyStatement::allow(
                    ["secretsmanager:DescribeSecret", "secretsmanager:GetSecretValue"],
                    [secret.secret.secret_arn()],
                ),
            )?;
        }

        debug!(
            task_definition = %self.path,
            container = name,
            environment = options.environment.len(),
            secrets = options.secrets.len(),
            "Added container"
        );

        self.containers.push(ContainerDefinition {
            name: name.to_string(),
            options,
            log_group,
        });

        let definitions = self.containers.iter().map(ContainerDefinition::to_value).collect();
        stack
            .resource_mut(&self.task_definition)?
            .set_property("ContainerDefinitions", Value::List(definitions));
        Ok(())
    }
}
