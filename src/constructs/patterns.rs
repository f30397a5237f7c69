// Copyright (c) 2025 - Cowboy AI, Inc.
//! Application Load Balanced Fargate Service
//!
//! An internet-facing application load balancer in the public subnets
//! forwarding one HTTP listener to a Fargate service whose tasks run in
//! private subnets without public addresses.
//!
//! # Traffic Rules
//!
//! - The load balancer group accepts `0.0.0.0/0` on the listener port only
//! - Service groups accept the container port from the load balancer group only
//! - The load balancer group may only send to the service groups

use std::sync::Arc;

use tracing::debug;

use super::ecs::{Cluster, FargateTaskDefinition};
use super::security_group::{Peer, SecurityGroup, SecurityGroupProps};
use crate::app::{ConstructPath, ResourceRef, Stack};
use crate::domain::invariants::validate_target_health_check;
use crate::domain::{Exposure, Port, ResourceType, SubnetType};
use crate::errors::{SynthError, SynthResult};
use crate::template::{Output, Resource, Value};

/// Target group health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHealthCheck {
    pub path: String,
    pub healthy_http_codes: String,
}

impl Default for TargetHealthCheck {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            healthy_http_codes: "200".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadBalancedServiceProps {
    pub service_name: Option<String>,
    pub desired_count: u32,
    pub listener_port: u16,
    pub public_load_balancer: bool,
    pub assign_public_ip: bool,
    pub task_subnets: SubnetType,
    pub health_check_grace_period_secs: u32,
    pub security_groups: Vec<Arc<SecurityGroup>>,
}

impl Default for LoadBalancedServiceProps {
    fn default() -> Self {
        Self {
            service_name: None,
            desired_count: 1,
            listener_port: 80,
            public_load_balancer: true,
            assign_public_ip: false,
            task_subnets: SubnetType::PrivateWithEgress,
            health_check_grace_period_secs: 60,
            security_groups: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct ApplicationLoadBalancedFargateService {
    path: ConstructPath,
    load_balancer: ResourceRef,
    load_balancer_security_group: Arc<SecurityGroup>,
    listener: ResourceRef,
    target_group: ResourceRef,
    service: ResourceRef,
    service_security_groups: Vec<Arc<SecurityGroup>>,
    container_port: u16,
    health_check: TargetHealthCheck,
}

impl ApplicationLoadBalancedFargateService {
    pub fn new(
        stack: &mut Stack,
        path: ConstructPath,
        cluster: &Cluster,
        task_definition: &FargateTaskDefinition,
        props: LoadBalancedServiceProps,
    ) -> SynthResult<Self> {
        let vpc = cluster.vpc();

        let container = task_definition.default_container().ok_or_else(|| {
            SynthError::Configuration(format!(
                "{}: task definition {} has no essential container",
                path,
                task_definition.path()
            ))
        })?;
        let container_port = container
            .port_mappings()
            .first()
            .map(|m| m.container_port)
            .ok_or_else(|| {
                SynthError::Configuration(format!(
                    "{}: container {} maps no port",
                    path,
                    container.name()
                ))
            })?;

        let lb_path = path.child("LB")?;
        let exposure = if props.public_load_balancer {
            Exposure::InternetFacing
        } else {
            Exposure::Internal
        };
        let lb_description = format!(
            "Automatically created Security Group for ELB {}{}",
            stack.name(),
            lb_path.logical_id()
        );
        let lb_security_group = Arc::new(SecurityGroup::new(
            stack,
            lb_path.child("SecurityGroup")?,
            vpc,
            SecurityGroupProps {
                description: Some(lb_description),
                allow_all_outbound: false,
                exposure,
                ..SecurityGroupProps::default()
            },
        )?);

        if props.public_load_balancer {
            let description = format!("Allow from anyone on port {}", props.listener_port);
            lb_security_group.add_ingress_rule(
                stack,
                Peer::AnyIpv4,
                Port::tcp(props.listener_port),
                Some(description.as_str()),
            )?;
        }

        let lb_subnets = if props.public_load_balancer {
            SubnetType::Public
        } else {
            SubnetType::PrivateWithEgress
        };
        let load_balancer = stack.add_resource(
            &lb_path.child("Resource")?,
            Resource::new(ResourceType::LoadBalancer)
                .property(
                    "LoadBalancerAttributes",
                    Value::List(vec![Value::map([
                        ("Key", Value::from("deletion_protection.enabled")),
                        ("Value", Value::from("false")),
                    ])]),
                )
                .property(
                    "Scheme",
                    if props.public_load_balancer {
                        "internet-facing"
                    } else {
                        "internal"
                    },
                )
                .property("SecurityGroups", vec![lb_security_group.group_id()])
                .property("Subnets", vpc.subnet_ids(lb_subnets)?)
                .property("Type", "application"),
        )?;

        let listener_path = lb_path.child("PublicListener")?;
        let target_group = stack.add_resource(
            &listener_path.child("ECSGroup")?.child("Resource")?,
            Resource::new(ResourceType::TargetGroup)
                .property("Port", props.listener_port)
                .property("Protocol", "HTTP")
                .property(
                    "TargetGroupAttributes",
                    Value::List(vec![Value::map([
                        ("Key", Value::from("stickiness.enabled")),
                        ("Value", Value::from("false")),
                    ])]),
                )
                .property("TargetType", "ip")
                .property("VpcId", vpc.vpc_id()),
        )?;

        let listener = stack.add_resource(
            &listener_path.child("Resource")?,
            Resource::new(ResourceType::Listener)
                .property(
                    "DefaultActions",
                    Value::List(vec![Value::map([
                        ("TargetGroupArn", Value::Ref(target_group.clone())),
                        ("Type", Value::from("forward")),
                    ])]),
                )
                .property("LoadBalancerArn", Value::Ref(load_balancer.clone()))
                .property("Port", props.listener_port)
                .property("Protocol", "HTTP"),
        )?;

        let service_security_groups = if props.security_groups.is_empty() {
            vec![Arc::new(SecurityGroup::new(
                stack,
                path.child("Service")?.child("SecurityGroup")?,
                vpc,
                SecurityGroupProps::default(),
            )?)]
        } else {
            props.security_groups
        };

        for group in &service_security_groups {
            group.allow_from(
                stack,
                &lb_security_group,
                Port::tcp(container_port),
                Some("Load balancer to target"),
            )?;
        }

        let mut service = Resource::new(ResourceType::EcsService)
            .property("Cluster", cluster.cluster_name())
            .property(
                "DeploymentConfiguration",
                Value::map([
                    ("MaximumPercent", Value::from(200u32)),
                    ("MinimumHealthyPercent", Value::from(50u32)),
                ]),
            )
            .property("DesiredCount", props.desired_count)
            .property("EnableECSManagedTags", false)
            .property(
                "HealthCheckGracePeriodSeconds",
                props.health_check_grace_period_secs,
            )
            .property("LaunchType", "FARGATE")
            .property(
                "LoadBalancers",
                Value::List(vec![Value::map([
                    ("ContainerName", Value::from(container.name())),
                    ("ContainerPort", Value::from(container_port)),
                    ("TargetGroupArn", Value::Ref(target_group.clone())),
                ])]),
            )
            .property(
                "NetworkConfiguration",
                Value::map([(
                    "AwsvpcConfiguration",
                    Value::map([
                        (
                            "AssignPublicIp",
                            Value::from(if props.assign_public_ip {
                                "ENABLED"
                            } else {
                                "DISABLED"
                            }),
                        ),
                        (
                            "SecurityGroups",
                            Value::List(
                                service_security_groups
                                    .iter()
                                    .map(|g| g.group_id())
                                    .collect(),
                            ),
                        ),
                        ("Subnets", vpc.subnet_ids(props.task_subnets)?),
                    ]),
                )]),
            )
            .property("TaskDefinition", task_definition.task_definition_arn())
            .depends_on(&listener)
            .depends_on(&target_group);
        if let Some(name) = &props.service_name {
            service.set_property("ServiceName", name);
        }

        let service = stack.add_resource(&path.child("Service")?.child("Service")?, service)?;

        let this = Self {
            path,
            load_balancer,
            load_balancer_security_group: lb_security_group,
            listener,
            target_group,
            service,
            service_security_groups,
            container_port,
            health_check: TargetHealthCheck::default(),
        };

        stack.add_output(
            &this.path.child("LoadBalancerDNS")?,
            Output::new(this.load_balancer_dns()),
        )?;
        stack.add_output(
            &this.path.child("ServiceURL")?,
            Output::new(this.service_url()),
        )?;

        debug!(
            service = %this.path,
            container = container.name(),
            port = container_port,
            "Declared load balanced service"
        );

        Ok(this)
    }

    /// Replace the target group health check
    pub fn configure_health_check(
        &mut self,
        stack: &mut Stack,
        check: TargetHealthCheck,
    ) -> SynthResult<()> {
        validate_target_health_check(&check.path, &check.healthy_http_codes)
            .map_err(|e| SynthError::validation(&self.path, e))?;

        let target_group = stack.resource_mut(&self.target_group)?;
        target_group.set_property("HealthCheckPath", check.path.as_str());
        target_group.set_property(
            "Matcher",
            Value::map([("HttpCode", Value::from(check.healthy_http_codes.as_str()))]),
        );
        self.health_check = check;
        Ok(())
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn load_balancer(&self) -> &ResourceRef {
        &self.load_balancer
    }

    pub fn load_balancer_security_group(&self) -> &Arc<SecurityGroup> {
        &self.load_balancer_security_group
    }

    pub fn listener(&self) -> &ResourceRef {
        &self.listener
    }

    pub fn target_group(&self) -> &ResourceRef {
        &self.target_group
    }

    pub fn service(&self) -> &ResourceRef {
        &self.service
    }

    pub fn service_security_groups(&self) -> &[Arc<SecurityGroup>] {
        &self.service_security_groups
    }

    pub fn container_port(&self) -> u16 {
        self.container_port
    }

    pub fn health_check(&self) -> &TargetHealthCheck {
        &self.health_check
    }

    pub fn load_balancer_dns(&self) -> Value {
        Value::get_att(&self.load_balancer, "DNSName")
    }

    pub fn service_url(&self) -> Value {
        Value::concat([Value::from("http://"), self.load_balancer_dns()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, StackId};
    use crate::constructs::ecs::{ContainerImage, ContainerOptions, PortMapping};
    use crate::constructs::vpc::{Vpc, VpcProps};
    use crate::domain::{Environment, ValidationError};

    fn declare(with_port: bool) -> (App, SynthResult<ApplicationLoadBalancedFargateService>) {
        let mut app = App::new();
        app.add_stack("Application", Environment::agnostic()).unwrap();
        let stack = app.stack_mut(StackId(0)).unwrap();

        let vpc = Arc::new(
            Vpc::new(stack, ConstructPath::root("Vpc").unwrap(), VpcProps::default()).unwrap(),
        );
        let cluster = Cluster::new(stack, ConstructPath::root("Cluster").unwrap(), vpc, None).unwrap();
        let mut task =
            FargateTaskDefinition::new(stack, ConstructPath::root("Task").unwrap(), 256, 512).unwrap();
        let mut options = ContainerOptions::new(ContainerImage::from_registry("nginx"));
        if with_port {
            options = options.port_mapping(PortMapping::tcp(8080));
        }
        task.add_container(stack, "web", options).unwrap();

        let service = ApplicationLoadBalancedFargateService::new(
            stack,
            ConstructPath::root("popularVoteApp").unwrap(),
            &cluster,
            &task,
            LoadBalancedServiceProps {
                service_name: Some("popularVoteApi".to_string()),
                ..LoadBalancedServiceProps::default()
            },
        );
        (app, service)
    }

    #[test]
    fn test_service_declares_load_balancer_chain() {
        let (app, service) = declare(true);
        let service = service.unwrap();
        let stack = &app.stacks()[0];

        let ecs_service = stack.resource(service.service()).unwrap();
        assert_eq!(ecs_service.physical_name(), Some("popularVoteApi"));
        assert_eq!(ecs_service.dependencies().count(), 2);
        assert_eq!(service.container_port(), 8080);

        let lb = stack.resource(service.load_balancer()).unwrap();
        assert_eq!(lb.get_property("Scheme"), Some(&Value::from("internet-facing")));

        // LB -> service on the container port, both directions
        let ingress = stack
            .resources()
            .values()
            .filter(|r| r.resource_type() == ResourceType::SecurityGroupIngress)
            .count();
        let egress = stack
            .resources()
            .values()
            .filter(|r| r.resource_type() == ResourceType::SecurityGroupEgress)
            .count();
        assert_eq!((ingress, egress), (1, 1));
        assert_eq!(stack.outputs().len(), 2);
    }

    #[test]
    fn test_configure_health_check() {
        let (mut app, service) = declare(true);
        let mut service = service.unwrap();
        let stack = app.stack_mut(StackId(0)).unwrap();

        service
            .configure_health_check(
                stack,
                TargetHealthCheck {
                    path: "/health".to_string(),
                    healthy_http_codes: "204".to_string(),
                },
            )
            .unwrap();

        let target_group = stack.resource(service.target_group()).unwrap();
        assert_eq!(
            target_group.get_property("HealthCheckPath"),
            Some(&Value::from("/health"))
        );
        assert_eq!(
            target_group.get_property("Matcher"),
            Some(&Value::map([("HttpCode", Value::from("204"))]))
        );

        let err = service
            .configure_health_check(
                stack,
                TargetHealthCheck {
                    path: "health".to_string(),
                    healthy_http_codes: "204".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SynthError::Validation {
                source: ValidationError::InvalidHealthCheckPath(_),
                ..
            }
        ));
        assert_eq!(service.health_check().path, "/health");
    }

    #[test]
    fn test_container_without_port_rejected() {
        let (_, service) = declare(false);
        assert!(matches!(service, Err(SynthError::Configuration(_))));
    }
}
