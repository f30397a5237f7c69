// Copyright (c) 2025 - Cowboy AI, Inc.
//! Database stack: Aurora cluster, ECS cluster and the schema migration task

use std::sync::Arc;

use tracing::info;

use crate::app::{App, ConstructPath, StackId};
use crate::config::ProjectSettings;
use crate::constructs::vpc::VpcSubnet;
use crate::constructs::{
    AwsLogDriver, Cluster, ContainerImage, ContainerOptions, ContainerSecret, DatabaseCluster,
    DatabaseClusterProps, FargateTaskDefinition, SecurityGroup, SecurityGroupProps, Vpc,
};
use crate::domain::{Environment, Port, RemovalPolicy, SubnetType};
use crate::errors::SynthResult;
use crate::stacks::FoundationStack;
use crate::template::{Output, Value};

pub const DATABASE_STACK_NAME: &str = "DeployDatabaseStack";

pub const MIGRATION_CONTAINER: &str = "popularVoteMigrationContainer";

/// Handles produced by the database stack
#[derive(Debug)]
pub struct DatabaseStack {
    id: StackId,
    vpc: Arc<Vpc>,
    migration_security_group: Arc<SecurityGroup>,
    database_security_group: Arc<SecurityGroup>,
    cluster: Arc<DatabaseCluster>,
    ecs_cluster: Arc<Cluster>,
    migration_task: FargateTaskDefinition,
}

impl DatabaseStack {
    pub fn build(
        app: &mut App,
        environment: Environment,
        settings: &ProjectSettings,
        foundation: &FoundationStack,
    ) -> SynthResult<Self> {
        let id = app.add_stack(DATABASE_STACK_NAME, environment)?;
        let stack = app.stack_mut(id)?;
        stack.set_description("Aurora MySQL cluster, ECS cluster and schema migration task");

        let vpc = Arc::clone(foundation.vpc());

        let migration_sg_name = settings.named("DbMigrationSg");
        let migration_security_group = Arc::new(SecurityGroup::new(
            stack,
            ConstructPath::root(migration_sg_name.as_str())?,
            &vpc,
            SecurityGroupProps::named(migration_sg_name.as_str()),
        )?);

        let database_sg_name = settings.named("DbSg");
        let database_security_group = Arc::new(SecurityGroup::new(
            stack,
            ConstructPath::root(database_sg_name.as_str())?,
            &vpc,
            SecurityGroupProps::named(database_sg_name.as_str()),
        )?);

        database_security_group.allow_from(
            stack,
            &migration_security_group,
            Port::tcp(settings.database_port),
            Some("Schema migration task"),
        )?;

        let cluster = Arc::new(DatabaseCluster::new(
            stack,
            ConstructPath::root(settings.named("DbCluster"))?,
            &vpc,
            vec![Arc::clone(&database_security_group)],
            DatabaseClusterProps {
                username: settings.database_username.clone(),
                writer_id: settings.named("ServerlessInstance"),
                port: settings.database_port,
                removal_policy: RemovalPolicy::Destroy,
                deletion_protection: false,
                ..DatabaseClusterProps::new(settings.database_name.as_str())
            },
        )?);

        let ecs_cluster = Arc::new(Cluster::new(
            stack,
            ConstructPath::root(settings.named("Cluster"))?,
            Arc::clone(&vpc),
            Some(settings.named("Cluster").as_str()),
        )?);

        let mut migration_task = FargateTaskDefinition::new(
            stack,
            ConstructPath::root(settings.named("DbMigrationTask"))?,
            settings.task_cpu,
            settings.task_memory_mib,
        )?;

        let secret = cluster.secret();
        migration_task.add_container(
            stack,
            MIGRATION_CONTAINER,
            ContainerOptions::new(ContainerImage::from_repository(
                foundation.migration_repository(),
                settings.image_tag.as_str(),
            ))
            .env("FLYWAY_SCHEMAS", settings.database_name.as_str())
            .env(
                "FLYWAY_URL",
                cluster.connection_url("jdbc:mysql", None, Some("allowPublicKeyRetrieval=true")),
            )
            .secret("FLYWAY_USER", ContainerSecret::from_secrets_manager(secret, "username"))
            .secret("FLYWAY_PASSWORD", ContainerSecret::from_secrets_manager(secret, "password"))
            .logging(
                AwsLogDriver::new(settings.named("MigrationLogs"))
                    .non_blocking(settings.log_buffer_mib)
                    .with_retention_days(settings.log_retention_days),
            ),
        )?;

        stack.add_output(
            &ConstructPath::root("dbClusterEndpointHost")?,
            Output::new(cluster.endpoint_address()),
        )?;
        stack.add_output(
            &ConstructPath::root("dbClusterSecretArn")?,
            Output::new(secret.secret_arn()),
        )?;
        stack.add_output(
            &ConstructPath::root("taskDefinitionArn")?,
            Output::new(migration_task.task_definition_arn())
                .with_description("Task definition to run for schema migrations"),
        )?;
        stack.add_output(
            &ConstructPath::root("migrationSecurityGroupId")?,
            Output::new(migration_security_group.group_id())
                .with_description("Security group for the migration task network configuration"),
        )?;
        let subnet_ids = vpc
            .select_subnets(SubnetType::PrivateWithEgress)?
            .into_iter()
            .map(VpcSubnet::subnet_id)
            .collect();
        stack.add_output(
            &ConstructPath::root("migrationSubnetIds")?,
            Output::new(Value::Join(",".to_string(), subnet_ids))
                .with_description("Subnets for the migration task network configuration"),
        )?;

        info!(
            stack = DATABASE_STACK_NAME,
            cluster = %cluster.path(),
            task_family = migration_task.family(),
            "Declared database stack"
        );

        Ok(Self {
            id,
            vpc,
            migration_security_group,
            database_security_group,
            cluster,
            ecs_cluster,
            migration_task,
        })
    }

    pub fn id(&self) -> StackId {
        self.id
    }

    pub fn vpc(&self) -> &Arc<Vpc> {
        &self.vpc
    }

    pub fn migration_security_group(&self) -> &Arc<SecurityGroup> {
        &self.migration_security_group
    }

    pub fn database_security_group(&self) -> &Arc<SecurityGroup> {
        &self.database_security_group
    }

    pub fn cluster(&self) -> &Arc<DatabaseCluster> {
        &self.cluster
    }

    pub fn ecs_cluster(&self) -> &Arc<Cluster> {
        &self.ecs_cluster
    }

    pub fn migration_task(&self) -> &FargateTaskDefinition {
        &self.migration_task
    }
}
