// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants
//!
//! CIDR blocks, subnet layouts and port ranges used by every network-facing
//! construct. Subnet planning is a pure function of the VPC block, the subnet
//! groups and the number of availability zones, so the same inputs always
//! produce the same address plan.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IPv4 address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32)")]
    InvalidPrefixLength(u8),

    #[error("CIDR block has host bits set: {0}")]
    NotNetworkAddress(String),

    #[error("Invalid subnet mask /{mask} for network {network}")]
    InvalidSubnetMask { network: String, mask: u8 },

    #[error("Address space of {0} exhausted")]
    AddressSpaceExhausted(String),

    #[error("Subnet layout needs at least one group and one availability zone")]
    EmptySubnetLayout,

    #[error("Invalid port range {from}-{to}")]
    InvalidPortRange { from: u16, to: u16 },
}

/// Smallest subnet AWS accepts inside a VPC
pub const MIN_SUBNET_PREFIX: u8 = 28;

fn prefix_mask(prefix_length: u8) -> u32 {
    if prefix_length == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_length))
    }
}

/// IPv4 CIDR block value object
///
/// Invariants:
/// - Prefix length 0-32
/// - Address is the network address (no host bits set)
///
/// # Examples
///
/// ```rust
/// use popular_vote_infrastructure::domain::Ipv4Cidr;
///
/// let vpc = Ipv4Cidr::new("10.0.0.0/16").unwrap();
/// assert_eq!(vpc.size(), 65536);
/// assert!(Ipv4Cidr::new("10.0.0.1/16").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix_length: u8,
}

impl Ipv4Cidr {
    /// Any IPv4 address
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        network: Ipv4Addr::UNSPECIFIED,
        prefix_length: 0,
    };

    /// Default block of a new VPC
    pub const DEFAULT_VPC: Ipv4Cidr = Ipv4Cidr {
        network: Ipv4Addr::new(10, 0, 0, 0),
        prefix_length: 16,
    };

    /// Parse a CIDR block such as `10.0.0.0/16`
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref();
        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let network = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;
        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Self::from_parts(network, prefix_length)
    }

    /// Build from a network address and prefix length
    pub fn from_parts(network: Ipv4Addr, prefix_length: u8) -> Result<Self, NetworkError> {
        if prefix_length > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        if u32::from(network) & !prefix_mask(prefix_length) != 0 {
            return Err(NetworkError::NotNetworkAddress(format!(
                "{}/{}",
                network, prefix_length
            )));
        }

        Ok(Self {
            network,
            prefix_length,
        })
    }

    /// Network address
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length
    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_length))
    }

    fn first(&self) -> u64 {
        u64::from(u32::from(self.network))
    }

    fn last(&self) -> u64 {
        self.first() + self.size() - 1
    }

    /// Whether `other` lies entirely inside this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_length >= self.prefix_length
            && u32::from(other.network) & prefix_mask(self.prefix_length)
                == u32::from(self.network)
    }

    /// Whether the two blocks share at least one address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// Whether this is `0.0.0.0/0`
    pub fn is_any(&self) -> bool {
        self.prefix_length == 0
    }

    /// Carve the block of `prefix_length` starting `offset` addresses into this network
    pub fn subnet_at(&self, offset: u64, prefix_length: u8) -> Result<Ipv4Cidr, NetworkError> {
        if prefix_length < self.prefix_length || prefix_length > 32 {
            return Err(NetworkError::InvalidSubnetMask {
                network: self.to_string(),
                mask: prefix_length,
            });
        }

        let block = 1u64 << (32 - u32::from(prefix_length));
        if offset % block != 0 || offset + block > self.size() {
            return Err(NetworkError::AddressSpaceExhausted(self.to_string()));
        }

        // offset < size <= 2^32 so the sum stays within u32
        let address = (self.first() + offset) as u32;
        Self::from_parts(Ipv4Addr::from(address), prefix_length)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_length)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}

/// Subnet reachability class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetType {
    /// Routed through the internet gateway
    Public,
    /// No inbound route, outbound through a NAT gateway
    PrivateWithEgress,
    /// No route outside the VPC
    PrivateIsolated,
}

impl SubnetType {
    /// Value of the `aws-cdk:subnet-type` tag understood by deployment tooling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::PrivateWithEgress => "Private",
            Self::PrivateIsolated => "Isolated",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }
}

impl fmt::Display for SubnetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One named tier of subnets, repeated in every availability zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetGroup {
    pub name: String,
    pub subnet_type: SubnetType,
    /// Explicit prefix length; groups without one share the leftover space
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cidr_mask: Option<u8>,
}

impl SubnetGroup {
    pub fn new(name: impl Into<String>, subnet_type: SubnetType) -> Self {
        Self {
            name: name.into(),
            subnet_type,
            cidr_mask: None,
        }
    }

    pub fn with_cidr_mask(mut self, mask: u8) -> Self {
        self.cidr_mask = Some(mask);
        self
    }
}

/// A subnet block assigned to one group in one availability zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSubnet {
    pub group: String,
    pub subnet_type: SubnetType,
    /// Zero-based availability zone index
    pub availability_zone: usize,
    pub cidr: Ipv4Cidr,
}

/// Allocate subnet blocks for every (group, availability zone) pair
///
/// # Rules
/// - Groups are allocated in order, and within a group zones are allocated in order
/// - Explicit masks must lie between the VPC prefix and /28
/// - Groups without a mask split the remaining space equally, rounded down
///   to a power of two
/// - Each block is aligned to its own size
pub fn plan_subnets(
    vpc: &Ipv4Cidr,
    groups: &[SubnetGroup],
    availability_zones: usize,
) -> Result<Vec<PlannedSubnet>, NetworkError> {
    if groups.is_empty() || availability_zones == 0 {
        return Err(NetworkError::EmptySubnetLayout);
    }

    let zones = availability_zones as u64;
    let mut reserved = 0u64;
    let mut implicit_count = 0u64;

    for group in groups {
        match group.cidr_mask {
            Some(mask) => {
                if mask < vpc.prefix_length() || mask > MIN_SUBNET_PREFIX {
                    return Err(NetworkError::InvalidSubnetMask {
                        network: vpc.to_string(),
                        mask,
                    });
                }
                reserved += zones * (1u64 << (32 - u32::from(mask)));
            }
            None => implicit_count += zones,
        }
    }

    let implicit_prefix = if implicit_count > 0 {
        let per_subnet = vpc.size().saturating_sub(reserved) / implicit_count;
        if per_subnet == 0 {
            return Err(NetworkError::AddressSpaceExhausted(vpc.to_string()));
        }
        let prefix = 32 - per_subnet.ilog2() as u8;
        if prefix > MIN_SUBNET_PREFIX {
            return Err(NetworkError::AddressSpaceExhausted(vpc.to_string()));
        }
        prefix
    } else {
        MIN_SUBNET_PREFIX
    };

    let mut cursor = 0u64;
    let mut planned = Vec::with_capacity(groups.len() * availability_zones);

    for group in groups {
        let prefix = group.cidr_mask.unwrap_or(implicit_prefix);
        let block = 1u64 << (32 - u32::from(prefix));

        for zone in 0..availability_zones {
            cursor = cursor.div_ceil(block) * block;
            let cidr = vpc.subnet_at(cursor, prefix)?;
            cursor += block;

            planned.push(PlannedSubnet {
                group: group.name.clone(),
                subnet_type: group.subnet_type,
                availability_zone: zone,
                cidr,
            });
        }
    }

    Ok(planned)
}

/// Transport protocol of a port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    /// Every protocol (`-1`)
    All,
}

impl Protocol {
    /// CloudFormation `IpProtocol` value
    pub fn ip_protocol(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::All => "-1",
        }
    }
}

/// Protocol plus inclusive port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Port {
    protocol: Protocol,
    from: u16,
    to: u16,
}

impl Port {
    /// Single TCP port
    pub fn tcp(port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from: port,
            to: port,
        }
    }

    /// Inclusive TCP range
    pub fn tcp_range(from: u16, to: u16) -> Result<Self, NetworkError> {
        if from > to {
            return Err(NetworkError::InvalidPortRange { from, to });
        }
        Ok(Self {
            protocol: Protocol::Tcp,
            from,
            to,
        })
    }

    /// Every TCP port
    pub fn all_tcp() -> Self {
        Self {
            protocol: Protocol::Tcp,
            from: 0,
            to: u16::MAX,
        }
    }

    /// Every port of every protocol
    pub fn all_traffic() -> Self {
        Self {
            protocol: Protocol::All,
            from: 0,
            to: u16::MAX,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn from_port(&self) -> u16 {
        self.from
    }

    pub fn to_port(&self) -> u16 {
        self.to
    }

    pub fn is_single_port(&self) -> bool {
        self.protocol != Protocol::All && self.from == self.to
    }

    /// Whether the range opens the full port space
    pub fn covers_all_ports(&self) -> bool {
        self.protocol == Protocol::All || (self.from == 0 && self.to == u16::MAX)
    }

    /// Short label used in rule descriptions and logical ids
    pub fn label(&self) -> String {
        match self.protocol {
            Protocol::All => "ALL TRAFFIC".to_string(),
            _ if self.covers_all_ports() => "ALL PORTS".to_string(),
            _ if self.is_single_port() => self.from.to_string(),
            _ => format!("{}-{}", self.from, self.to),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.protocol.ip_protocol(), self.label())
    }
}

/// Who is expected to reach resources behind a security group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exposure {
    /// Only other groups or private ranges inside the network
    #[default]
    Internal,
    /// Public entry points such as an internet-facing load balancer
    InternetFacing,
}
