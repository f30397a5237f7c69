// Copyright (c) 2025 - Cowboy AI, Inc.
//! CloudFormation Resource Type Taxonomy
//!
//! Every resource the constructs can declare, with the CloudFormation type
//! name, a category used for reporting, and the property that carries a
//! user-chosen physical name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CloudFormation resource types declared by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum ResourceType {
    // Network
    Vpc,
    Subnet,
    RouteTable,
    SubnetRouteTableAssociation,
    Route,
    InternetGateway,
    VpcGatewayAttachment,
    ElasticIp,
    NatGateway,

    // Security
    SecurityGroup,
    SecurityGroupIngress,
    SecurityGroupEgress,

    // Images
    EcrRepository,

    // Database
    DbCluster,
    DbInstance,
    DbSubnetGroup,
    Secret,
    SecretTargetAttachment,

    // Containers
    EcsCluster,
    TaskDefinition,
    EcsService,

    // Identity
    IamRole,
    IamPolicy,

    // Observability
    LogGroup,

    // Load balancing
    LoadBalancer,
    Listener,
    TargetGroup,
}

impl ResourceType {
    pub const ALL: [ResourceType; 27] = [
        Self::Vpc,
        Self::Subnet,
        Self::RouteTable,
        Self::SubnetRouteTableAssociation,
        Self::Route,
        Self::InternetGateway,
        Self::VpcGatewayAttachment,
        Self::ElasticIp,
        Self::NatGateway,
        Self::SecurityGroup,
        Self::SecurityGroupIngress,
        Self::SecurityGroupEgress,
        Self::EcrRepository,
        Self::DbCluster,
        Self::DbInstance,
        Self::DbSubnetGroup,
        Self::Secret,
        Self::SecretTargetAttachment,
        Self::EcsCluster,
        Self::TaskDefinition,
        Self::EcsService,
        Self::IamRole,
        Self::IamPolicy,
        Self::LogGroup,
        Self::LoadBalancer,
        Self::Listener,
        Self::TargetGroup,
    ];

    /// CloudFormation type name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "AWS::EC2::VPC",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::RouteTable => "AWS::EC2::RouteTable",
            Self::SubnetRouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            Self::Route => "AWS::EC2::Route",
            Self::InternetGateway => "AWS::EC2::InternetGateway",
            Self::VpcGatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            Self::ElasticIp => "AWS::EC2::EIP",
            Self::NatGateway => "AWS::EC2::NatGateway",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::SecurityGroupIngress => "AWS::EC2::SecurityGroupIngress",
            Self::SecurityGroupEgress => "AWS::EC2::SecurityGroupEgress",
            Self::EcrRepository => "AWS::ECR::Repository",
            Self::DbCluster => "AWS::RDS::DBCluster",
            Self::DbInstance => "AWS::RDS::DBInstance",
            Self::DbSubnetGroup => "AWS::RDS::DBSubnetGroup",
            Self::Secret => "AWS::SecretsManager::Secret",
            Self::SecretTargetAttachment => "AWS::SecretsManager::SecretTargetAttachment",
            Self::EcsCluster => "AWS::ECS::Cluster",
            Self::TaskDefinition => "AWS::ECS::TaskDefinition",
            Self::EcsService => "AWS::ECS::Service",
            Self::IamRole => "AWS::IAM::Role",
            Self::IamPolicy => "AWS::IAM::Policy",
            Self::LogGroup => "AWS::Logs::LogGroup",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
        }
    }

    /// Parse a CloudFormation type name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    /// Human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Vpc => "VPC",
            Self::Subnet => "Subnet",
            Self::RouteTable => "Route Table",
            Self::SubnetRouteTableAssociation => "Route Table Association",
            Self::Route => "Route",
            Self::InternetGateway => "Internet Gateway",
            Self::VpcGatewayAttachment => "Gateway Attachment",
            Self::ElasticIp => "Elastic IP",
            Self::NatGateway => "NAT Gateway",
            Self::SecurityGroup => "Security Group",
            Self::SecurityGroupIngress => "Ingress Rule",
            Self::SecurityGroupEgress => "Egress Rule",
            Self::EcrRepository => "Image Repository",
            Self::DbCluster => "Database Cluster",
            Self::DbInstance => "Database Instance",
            Self::DbSubnetGroup => "Database Subnet Group",
            Self::Secret => "Secret",
            Self::SecretTargetAttachment => "Secret Attachment",
            Self::EcsCluster => "Container Cluster",
            Self::TaskDefinition => "Task Definition",
            Self::EcsService => "Container Service",
            Self::IamRole => "IAM Role",
            Self::IamPolicy => "IAM Policy",
            Self::LogGroup => "Log Group",
            Self::LoadBalancer => "Load Balancer",
            Self::Listener => "Listener",
            Self::TargetGroup => "Target Group",
        }
    }

    /// Primary category for this resource type
    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Vpc
            | Self::Subnet
            | Self::RouteTable
            | Self::SubnetRouteTableAssociation
            | Self::Route
            | Self::InternetGateway
            | Self::VpcGatewayAttachment
            | Self::ElasticIp
            | Self::NatGateway => ResourceCategory::Network,

            Self::SecurityGroup | Self::SecurityGroupIngress | Self::SecurityGroupEgress => {
                ResourceCategory::Security
            }

            Self::EcrRepository => ResourceCategory::Storage,

            Self::DbCluster
            | Self::DbInstance
            | Self::DbSubnetGroup
            | Self::Secret
            | Self::SecretTargetAttachment => ResourceCategory::Database,

            Self::EcsCluster | Self::TaskDefinition | Self::EcsService => {
                ResourceCategory::Compute
            }

            Self::IamRole | Self::IamPolicy => ResourceCategory::Identity,

            Self::LogGroup => ResourceCategory::Observability,

            Self::LoadBalancer | Self::Listener | Self::TargetGroup => {
                ResourceCategory::LoadBalancing
            }
        }
    }

    /// Property holding a user-chosen physical name, when the type has one
    ///
    /// Physical names must be unique per account and region.
    pub fn physical_name_property(&self) -> Option<&'static str> {
        match self {
            Self::EcrRepository => Some("RepositoryName"),
            Self::SecurityGroup => Some("GroupName"),
            Self::EcsCluster => Some("ClusterName"),
            Self::EcsService => Some("ServiceName"),
            Self::DbCluster => Some("DBClusterIdentifier"),
            Self::LogGroup => Some("LogGroupName"),
            Self::Secret => Some("Name"),
            _ => None,
        }
    }

    /// Whether deleting the resource can lose data
    pub fn is_stateful(&self) -> bool {
        matches!(
            self,
            Self::EcrRepository | Self::DbCluster | Self::DbInstance | Self::Secret | Self::LogGroup
        )
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ResourceType> for &'static str {
    fn from(t: ResourceType) -> Self {
        t.as_str()
    }
}

impl TryFrom<String> for ResourceType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown resource type: {}", value))
    }
}

/// Resource category (high-level grouping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceCategory {
    Network,
    Security,
    Storage,
    Database,
    Compute,
    Identity,
    Observability,
    LoadBalancing,
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "Network"),
            Self::Security => write!(f, "Security"),
            Self::Storage => write!(f, "Storage"),
            Self::Database => write!(f, "Database"),
            Self::Compute => write!(f, "Compute"),
            Self::Identity => write!(f, "Identity"),
            Self::Observability => write!(f, "Observability"),
            Self::LoadBalancing => write!(f, "Load Balancing"),
        }
    }
}

/// What happens to a resource when it leaves the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Delete the physical resource immediately
    Destroy,
    /// Orphan the physical resource
    #[default]
    Retain,
    /// Keep a final snapshot, then delete
    Snapshot,
}

impl RemovalPolicy {
    /// `DeletionPolicy` / `UpdateReplacePolicy` attribute value
    pub fn as_attribute(&self) -> &'static str {
        match self {
            Self::Destroy => "Delete",
            Self::Retain => "Retain",
            Self::Snapshot => "Snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip_through_parse() {
        for t in ResourceType::ALL {
            assert_eq!(ResourceType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ResourceType::parse("AWS::S3::Bucket"), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(ResourceType::Vpc.category(), ResourceCategory::Network);
        assert_eq!(ResourceType::SecurityGroupIngress.category(), ResourceCategory::Security);
        assert_eq!(ResourceType::DbCluster.category(), ResourceCategory::Database);
        assert_eq!(ResourceType::EcsService.category(), ResourceCategory::Compute);
        assert_eq!(ResourceType::TargetGroup.category(), ResourceCategory::LoadBalancing);
    }

    #[test]
    fn test_physical_name_properties() {
        assert_eq!(
            ResourceType::EcrRepository.physical_name_property(),
            Some("RepositoryName")
        );
        assert_eq!(ResourceType::SecurityGroup.physical_name_property(), Some("GroupName"));
        assert_eq!(ResourceType::Subnet.physical_name_property(), None);
    }

    #[test]
    fn test_removal_policy_attributes() {
        assert_eq!(RemovalPolicy::Destroy.as_attribute(), "Delete");
        assert_eq!(RemovalPolicy::default(), RemovalPolicy::Retain);
        assert!(ResourceType::EcrRepository.is_stateful());
        assert!(!ResourceType::Route.is_stateful());
    }

    #[test]
    fn test_serializes_as_type_name() {
        let json = serde_json::to_string(&ResourceType::EcsService).unwrap();
        assert_eq!(json, "\"AWS::ECS::Service\"");
        let back: ResourceType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ResourceType::EcsService);
    }
}
