// Copyright (c) 2025 - Cowboy AI, Inc.
//! Virtual Private Cloud
//!
//! Declares the VPC, one subnet per (group, availability zone) with its route
//! table, an internet gateway for public subnets and NAT gateways for
//! private subnets with egress.
//!
//! # Rules
//!
//! - Address plan comes from [`plan_subnets`], so it is deterministic
//! - Availability zones are `Fn::Select` indexes into `Fn::GetAZs`, keeping
//!   the template environment-agnostic
//! - NAT gateways live in the public subnets of the first public group;
//!   private subnets route through the gateway of their own zone when there
//!   is one, otherwise round-robin

use tracing::debug;

use super::tags;
use crate::app::{ConstructPath, ResourceRef, Stack};
use crate::domain::{plan_subnets, Ipv4Cidr, ResourceType, SubnetGroup, SubnetType};
use crate::errors::{SynthError, SynthResult};
use crate::template::{Resource, Value};

const ANY_IPV4: &str = "0.0.0.0/0";

/// VPC configuration
#[derive(Debug, Clone, PartialEq)]
pub struct VpcProps {
    /// `Name` tag; defaults to the construct path
    pub name: Option<String>,
    pub cidr: Ipv4Cidr,
    pub max_azs: usize,
    pub nat_gateways: usize,
    pub subnet_groups: Vec<SubnetGroup>,
}

impl Default for VpcProps {
    fn default() -> Self {
        Self {
            name: None,
            cidr: Ipv4Cidr::DEFAULT_VPC,
            max_azs: 2,
            nat_gateways: 2,
            subnet_groups: vec![
                SubnetGroup::new("Public", SubnetType::Public),
                SubnetGroup::new("Private", SubnetType::PrivateWithEgress),
            ],
        }
    }
}

/// One declared subnet
#[derive(Debug, Clone)]
pub struct VpcSubnet {
    /// `PublicSubnet1`, `PrivateSubnet2`, ...
    pub name: String,
    pub group: String,
    pub subnet_type: SubnetType,
    pub availability_zone: usize,
    pub cidr: Ipv4Cidr,
    subnet: ResourceRef,
    route_table: ResourceRef,
    default_route: Option<ResourceRef>,
}

impl VpcSubnet {
    pub fn subnet_id(&self) -> Value {
        Value::Ref(self.subnet.clone())
    }

    pub fn route_table_id(&self) -> Value {
        Value::Ref(self.route_table.clone())
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.subnet
    }

    pub fn availability_zone_value(&self) -> Value {
        Value::Select(self.availability_zone, Box::new(Value::GetAzs))
    }
}

/// Declared VPC handle
#[derive(Debug, Clone)]
pub struct Vpc {
    path: ConstructPath,
    vpc: ResourceRef,
    cidr: Ipv4Cidr,
    availability_zones: usize,
    subnets: Vec<VpcSubnet>,
    internet_gateway: Option<ResourceRef>,
    nat_gateways: Vec<ResourceRef>,
}

impl Vpc {
    pub fn new(stack: &mut Stack, path: ConstructPath, props: VpcProps) -> SynthResult<Self> {
        let planned = plan_subnets(&props.cidr, &props.subnet_groups, props.max_azs)?;

        let has_public = planned.iter().any(|s| s.subnet_type.is_public());
        let needs_egress = planned
            .iter()
            .any(|s| s.subnet_type == SubnetType::PrivateWithEgress);
        if needs_egress && (props.nat_gateways == 0 || !has_public) {
            return Err(SynthError::Configuration(format!(
                "{}: private subnets with egress need a public subnet group and at least one NAT gateway",
                path
            )));
        }

        let name_tag = props
            .name
            .clone()
            .unwrap_or_else(|| format!("{}/{}", stack.name(), path));

        let vpc = stack.add_resource(
            &path.child("Resource")?,
            Resource::new(ResourceType::Vpc)
                .property("CidrBlock", props.cidr.to_string())
                .property("EnableDnsHostnames", true)
                .property("EnableDnsSupport", true)
                .property("InstanceTenancy", "default")
                .property("Tags", tags([("Name", Value::from(&name_tag))])),
        )?;

        let mut gateway_attachment = None;
        let internet_gateway = if has_public {
            let igw = stack.add_resource(
                &path.child("IGW")?,
                Resource::new(ResourceType::InternetGateway)
                    .property("Tags", tags([("Name", Value::from(&name_tag))])),
            )?;
            gateway_attachment = Some(stack.add_resource(
                &path.child("VPCGW")?,
                Resource::new(ResourceType::VpcGatewayAttachment)
                    .property("InternetGatewayId", Value::Ref(igw.clone()))
                    .property("VpcId", Value::Ref(vpc.clone())),
            )?);
            Some(igw)
        } else {
            None
        };

        let mut subnets = Vec::with_capacity(planned.len());
        for plan in &planned {
            let name = format!("{}Subnet{}", plan.group, plan.availability_zone + 1);
            let subnet_path = path.child(name.as_str())?;
            let subnet_name_tag = format!("{}/{}", stack.name(), subnet_path);

            let subnet = stack.add_resource(
                &subnet_path.child("Subnet")?,
                Resource::new(ResourceType::Subnet)
                    .property(
                        "AvailabilityZone",
                        Value::Select(plan.availability_zone, Box::new(Value::GetAzs)),
                    )
                    .property("CidrBlock", plan.cidr.to_string())
                    .property("MapPublicIpOnLaunch", plan.subnet_type.is_public())
                    .property("VpcId", Value::Ref(vpc.clone()))
                    .property(
                        "Tags",
                        tags([
                            ("Name", Value::from(&subnet_name_tag)),
                            ("aws-cdk:subnet-name", Value::from(&plan.group)),
                            ("aws-cdk:subnet-type", Value::from(plan.subnet_type.as_str())),
                        ]),
                    ),
            )?;

            let route_table = stack.add_resource(
                &subnet_path.child("RouteTable")?,
                Resource::new(ResourceType::RouteTable)
                    .property("VpcId", Value::Ref(vpc.clone()))
                    .property("Tags", tags([("Name", Value::from(&subnet_name_tag))])),
            )?;

            stack.add_resource(
                &subnet_path.child("RouteTableAssociation")?,
                Resource::new(ResourceType::SubnetRouteTableAssociation)
                    .property("RouteTableId", Value::Ref(route_table.clone()))
                    .property("SubnetId", Value::Ref(subnet.clone())),
            )?;

            let default_route = match (&internet_gateway, &gateway_attachment) {
                (Some(igw), Some(attachment)) if plan.subnet_type.is_public() => {
                    Some(stack.add_resource(
                        &subnet_path.child("DefaultRoute")?,
                        Resource::new(ResourceType::Route)
                            .property("DestinationCidrBlock", ANY_IPV4)
                            .property("GatewayId", Value::Ref(igw.clone()))
                            .property("RouteTableId", Value::Ref(route_table.clone()))
                            .depends_on(attachment),
                    )?)
                }
                _ => None,
            };

            subnets.push(VpcSubnet {
                name,
                group: plan.group.clone(),
                subnet_type: plan.subnet_type,
                availability_zone: plan.availability_zone,
                cidr: plan.cidr,
                subnet,
                route_table,
                default_route,
            });
        }

        let nat_gateways = if needs_egress {
            declare_nat_gateways(stack, &path, &subnets, props.nat_gateways)?
        } else {
            Vec::new()
        };

        for subnet in subnets
            .iter()
            .filter(|s| s.subnet_type == SubnetType::PrivateWithEgress)
        {
            let nat = nat_gateways
                .get(subnet.availability_zone)
                .or_else(|| nat_gateways.get(subnet.availability_zone % nat_gateways.len().max(1)))
                .ok_or_else(|| {
                    SynthError::Configuration(format!("{}: no NAT gateway for {}", path, subnet.name))
                })?;
            stack.add_resource(
                &path.child(subnet.name.as_str())?.child("DefaultRoute")?,
                Resource::new(ResourceType::Route)
                    .property("DestinationCidrBlock", ANY_IPV4)
                    .property("NatGatewayId", Value::Ref(nat.clone()))
                    .property("RouteTableId", subnet.route_table_id()),
            )?;
        }

        debug!(
            vpc = %path,
            cidr = %props.cidr,
            subnets = subnets.len(),
            nat_gateways = nat_gateways.len(),
            "Declared VPC"
        );

        Ok(Self {
            path,
            vpc,
            cidr: props.cidr,
            availability_zones: props.max_azs,
            subnets,
            internet_gateway,
            nat_gateways,
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.vpc
    }

    pub fn vpc_id(&self) -> Value {
        Value::Ref(self.vpc.clone())
    }

    /// Planned CIDR block
    pub fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    pub fn availability_zones(&self) -> usize {
        self.availability_zones
    }

    pub fn subnets(&self) -> &[VpcSubnet] {
        &self.subnets
    }

    pub fn internet_gateway(&self) -> Option<&ResourceRef> {
        self.internet_gateway.as_ref()
    }

    pub fn nat_gateways(&self) -> &[ResourceRef] {
        &self.nat_gateways
    }

    /// Subnets of one type, in zone order
    pub fn select_subnets(&self, subnet_type: SubnetType) -> SynthResult<Vec<&VpcSubnet>> {
        let selected: Vec<&VpcSubnet> = self
            .subnets
            .iter()
            .filter(|s| s.subnet_type == subnet_type)
            .collect();
        if selected.is_empty() {
            return Err(SynthError::Configuration(format!(
                "{} has no {} subnets",
                self.path, subnet_type
            )));
        }
        Ok(selected)
    }

    /// `Ref`s of the subnets of one type
    pub fn subnet_ids(&self, subnet_type: SubnetType) -> SynthResult<Value> {
        Ok(Value::List(
            self.select_subnets(subnet_type)?
                .into_iter()
                .map(VpcSubnet::subnet_id)
                .collect(),
        ))
    }

    /// Default routes of public subnets, which internet-facing resources wait on
    pub fn internet_routes(&self) -> Vec<&ResourceRef> {
        self.subnets
            .iter()
            .filter(|s| s.subnet_type.is_public())
            .filter_map(|s| s.default_route.as_ref())
            .collect()
    }
}

fn declare_nat_gateways(
    stack: &mut Stack,
    path: &ConstructPath,
    subnets: &[VpcSubnet],
    count: usize,
) -> SynthResult<Vec<ResourceRef>> {
    let Some(first_public) = subnets.iter().find(|s| s.subnet_type.is_public()) else {
        return Ok(Vec::new());
    };

    let hosts: Vec<&VpcSubnet> = subnets
        .iter()
        .filter(|s| s.group == first_public.group)
        .take(count)
        .collect();

    let mut gateways = Vec::with_capacity(hosts.len());
    for host in hosts {
        let subnet_path = path.child(host.name.as_str())?;
        let name_tag = Value::from(format!("{}/{}", stack.name(), subnet_path));

        let eip = stack.add_resource(
            &subnet_path.child("EIP")?,
            Resource::new(ResourceType::ElasticIp)
                .property("Domain", "vpc")
                .property("Tags", tags([("Name", name_tag.clone())])),
        )?;

        let mut nat = Resource::new(ResourceType::NatGateway)
            .property("AllocationId", Value::get_att(&eip, "AllocationId"))
            .property("SubnetId", host.subnet_id())
            .property("Tags", tags([("Name", name_tag)]));
        if let Some(route) = &host.default_route {
            nat.add_dependency(route);
        }

        gateways.push(stack.add_resource(&subnet_path.child("NATGateway")?, nat)?);
    }

    Ok(gateways)
}
