// Copyright (c) 2025 - Cowboy AI, Inc.
//! Application stack: the API task behind an internet-facing load balancer

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::app::{App, ConstructPath, StackId};
use crate::config::ProjectSettings;
use crate::constructs::{
    AppProtocol, ApplicationLoadBalancedFargateService, AwsLogDriver, ContainerImage,
    ContainerOptions, ContainerSecret, FargateTaskDefinition, HealthCheck,
    LoadBalancedServiceProps, PortMapping, SecurityGroup, SecurityGroupProps, TargetHealthCheck,
    Vpc,
};
use crate::domain::Environment;
use crate::errors::SynthResult;
use crate::stacks::{DatabaseStack, FoundationStack};
use crate::template::Output;

pub const APPLICATION_STACK_NAME: &str = "DeployApplicationStack";

pub const APP_CONTAINER: &str = "popularVoteAppContainer";

const PORT_MAPPING_NAME: &str = "app_mapping";

#[derive(Debug)]
pub struct ApplicationStack {
    id: StackId,
    vpc: Arc<Vpc>,
    security_group: Arc<SecurityGroup>,
    task_definition: FargateTaskDefinition,
    service: ApplicationLoadBalancedFargateService,
}

impl ApplicationStack {
    pub fn build(
        app: &mut App,
        environment: Environment,
        settings: &ProjectSettings,
        foundation: &FoundationStack,
        database: &DatabaseStack,
    ) -> SynthResult<Self> {
        let id = app.add_stack(APPLICATION_STACK_NAME, environment)?;
        let stack = app.stack_mut(id)?;
        stack.set_description("Popular vote API service");

        let vpc = Arc::clone(foundation.vpc());
        let ecs_cluster = database.ecs_cluster();
        let cluster = database.cluster();

        let sg_name = settings.named("AppSg");
        let security_group = Arc::new(SecurityGroup::new(
            stack,
            ConstructPath::root(sg_name.as_str())?,
            &vpc,
            SecurityGroupProps::named(sg_name.as_str()),
        )?);

        cluster.allow_default_port_from(stack, &security_group, Some("API service"))?;

        let mut task_definition = FargateTaskDefinition::new(
            stack,
            ConstructPath::root(settings.named("AppTask"))?,
            settings.task_cpu,
            settings.task_memory_mib,
        )?;

        let health_url = format!(
            "curl -f http://localhost:{}{} || exit 1",
            settings.container_port, settings.health_check_path
        );
        let secret = cluster.secret();
        task_definition.add_container(
            stack,
            APP_CONTAINER,
            ContainerOptions::new(ContainerImage::from_repository(
                foundation.app_repository(),
                settings.image_tag.as_str(),
            ))
            .port_mapping(
                PortMapping::tcp(settings.container_port)
                    .named(PORT_MAPPING_NAME)
                    .with_app_protocol(AppProtocol::Http),
            )
            .env(
                "SPRING_R2DBC_URL",
                cluster.connection_url(
                    "r2dbc:mysql",
                    Some(settings.database_name.as_str()),
                    Some("allowPublicKeyRetrieval=true"),
                ),
            )
            .secret(
                "SPRING_R2DBC_USERNAME",
                ContainerSecret::from_secrets_manager(secret, "username"),
            )
            .secret(
                "SPRING_R2DBC_PASSWORD",
                ContainerSecret::from_secrets_manager(secret, "password"),
            )
            .logging(
                AwsLogDriver::new(settings.named("AppLogs"))
                    .non_blocking(settings.log_buffer_mib)
                    .with_retention_days(settings.log_retention_days),
            )
            .health_check(HealthCheck {
                interval: Duration::from_secs(5),
                retries: 3,
                start_period: Duration::from_secs(180),
                timeout: Duration::from_secs(60),
                ..HealthCheck::shell(health_url)
            }),
        )?;

        let mut service = ApplicationLoadBalancedFargateService::new(
            stack,
            ConstructPath::root(settings.named("App"))?,
            ecs_cluster,
            &task_definition,
            LoadBalancedServiceProps {
                service_name: Some(settings.service_name.clone()),
                desired_count: settings.desired_count,
                listener_port: settings.listener_port,
                security_groups: vec![Arc::clone(&security_group)],
                ..LoadBalancedServiceProps::default()
            },
        )?;
        service.configure_health_check(
            stack,
            TargetHealthCheck {
                path: settings.health_check_path.clone(),
                healthy_http_codes: settings.healthy_http_codes.clone(),
            },
        )?;

        stack.add_output(
            &ConstructPath::root("appTaskDefinitionArn")?,
            Output::new(task_definition.task_definition_arn()),
        )?;

        info!(
            stack = APPLICATION_STACK_NAME,
            service = %settings.service_name,
            container_port = settings.container_port,
            desired_count = settings.desired_count,
            health_check = %settings.health_check_path,
            "Declared application stack"
        );

        Ok(Self {
            id,
            vpc,
            security_group,
            task_definition,
            service,
        })
    }

    pub fn id(&self) -> StackId {
        self.id
    }

    /// Network shared with the other stacks
    pub fn vpc(&self) -> &Arc<Vpc> {
        &self.vpc
    }

    pub fn security_group(&self) -> &Arc<SecurityGroup> {
        &self.security_group
    }

    pub fn task_definition(&self) -> &FargateTaskDefinition {
        &self.task_definition
    }

    pub fn service(&self) -> &ApplicationLoadBalancedFargateService {
        &self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceType;
    use crate::template::Value;

    fn build() -> (App, DatabaseStack, ApplicationStack) {
        let mut app = App::new();
        let settings = ProjectSettings::default();
        let env = Environment::agnostic();
        let foundation = FoundationStack::build(&mut app, env.clone(), &settings).unwrap();
        let database = DatabaseStack::build(&mut app, env.clone(), &settings, &foundation).unwrap();
        let application =
            ApplicationStack::build(&mut app, env, &settings, &foundation, &database).unwrap();
        (app, database, application)
    }

    #[test]
    fn test_app_container_health_check_targets_container_port() {
        let (_, _, application) = build();
        let container = application.task_definition().container(APP_CONTAINER).unwrap();
        let check = container.health_check().unwrap();
        assert_eq!(
            check.command,
            vec![
                "CMD-SHELL".to_string(),
                "curl -f http://localhost:8080/health || exit 1".to_string()
            ]
        );
        assert_eq!(check.interval, Duration::from_secs(5));
        assert_eq!(check.start_period, Duration::from_secs(180));
    }

    #[test]
    fn test_target_group_health_check() {
        let (app, _, application) = build();
        let stack = app.stack(application.id()).unwrap();
        let target_group = stack.resource(application.service().target_group()).unwrap();
        assert_eq!(
            target_group.get_property("HealthCheckPath"),
            Some(&Value::from("/health"))
        );
        assert_eq!(
            target_group.get_property("Matcher"),
            Some(&Value::map([("HttpCode", Value::from("204"))]))
        );
    }

    #[test]
    fn test_app_shares_database_secret() {
        let (_, database, application) = build();
        let secrets = application.task_definition().referenced_secrets();
        assert_eq!(secrets.len(), 1);
        assert!(Arc::ptr_eq(secrets[0], database.cluster().secret()));
    }

    #[test]
    fn test_database_ingress_declared_in_application_stack() {
        let (app, database, application) = build();
        let stack = app.stack(application.id()).unwrap();
        let to_database: Vec<_> = stack
            .resources()
            .values()
            .filter(|r| r.resource_type() == ResourceType::SecurityGroupIngress)
            .filter(|r| {
                r.get_property("GroupId") == Some(&database.database_security_group().group_id())
            })
            .collect();
        assert_eq!(to_database.len(), 1);
        assert_eq!(
            to_database[0].get_property("SourceSecurityGroupId"),
            Some(&application.security_group().group_id())
        );
    }
}
