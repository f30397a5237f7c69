// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Groups
//!
//! Every ingress rule is checked against the group's [`Exposure`] before it
//! is declared, so an internal group can never be opened to `0.0.0.0/0` and
//! no group can be opened on every port.
//!
//! CIDR rules declared in the group's own stack are inlined in the group
//! resource. Rules whose peer is another group, or that are declared from
//! another stack, become standalone `SecurityGroupIngress`/`Egress`
//! resources in the stack declaring them.

use tracing::debug;

use super::vpc::Vpc;
use crate::app::{ConstructPath, ResourceRef, Stack};
use crate::domain::invariants::validate_ingress_rule;
use crate::domain::{Exposure, Ipv4Cidr, Port, ResourceType};
use crate::errors::{SynthError, SynthResult};
use crate::template::{Resource, Value};

const ALLOW_ALL_OUTBOUND: &str = "Allow all outbound traffic by default";
const DISALLOW_ALL: &str = "Disallow all traffic";

/// Source or destination of a rule
#[derive(Debug, Clone, Copy)]
pub enum Peer<'a> {
    AnyIpv4,
    Ipv4(Ipv4Cidr),
    SecurityGroup(&'a SecurityGroup),
}

impl Peer<'_> {
    fn cidr(&self) -> Option<Ipv4Cidr> {
        match self {
            Peer::AnyIpv4 => Some(Ipv4Cidr::ANY),
            Peer::Ipv4(cidr) => Some(*cidr),
            Peer::SecurityGroup(_) => None,
        }
    }

    /// Id fragment used in rule construct ids
    fn unique_id(&self) -> String {
        match self {
            Peer::SecurityGroup(group) => group.reference().logical_id().to_string(),
            other => other
                .cidr()
                .map(|c| c.to_string().replace('/', "_"))
                .unwrap_or_default(),
        }
    }

    fn label(&self) -> String {
        match self {
            Peer::AnyIpv4 => "anyone".to_string(),
            Peer::Ipv4(cidr) => cidr.to_string(),
            Peer::SecurityGroup(group) => group.path().to_string(),
        }
    }
}

/// Security group configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupProps {
    /// Physical `GroupName`
    pub name: Option<String>,
    pub description: Option<String>,
    pub allow_all_outbound: bool,
    pub exposure: Exposure,
}

impl Default for SecurityGroupProps {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            allow_all_outbound: true,
            exposure: Exposure::Internal,
        }
    }
}

impl SecurityGroupProps {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Declared security group handle
#[derive(Debug, Clone)]
pub struct SecurityGroup {
    path: ConstructPath,
    group: ResourceRef,
    name: Option<String>,
    exposure: Exposure,
    allow_all_outbound: bool,
}

impl SecurityGroup {
    pub fn new(
        stack: &mut Stack,
        path: ConstructPath,
        vpc: &Vpc,
        props: SecurityGroupProps,
    ) -> SynthResult<Self> {
        let description = props
            .description
            .clone()
            .unwrap_or_else(|| format!("{}/{}", stack.name(), path));

        let egress = if props.allow_all_outbound {
            Value::map([
                ("CidrIp", Value::from(Ipv4Cidr::ANY.to_string())),
                ("Description", Value::from(ALLOW_ALL_OUTBOUND)),
                ("IpProtocol", Value::from("-1")),
            ])
        } else {
            // No rule at all would let AWS add its own allow-all rule
            Value::map([
                ("CidrIp", Value::from("255.255.255.255/32")),
                ("Description", Value::from(DISALLOW_ALL)),
                ("FromPort", Value::from(252u16)),
                ("IpProtocol", Value::from("icmp")),
                ("ToPort", Value::from(86u16)),
            ])
        };

        let mut resource = Resource::new(ResourceType::SecurityGroup)
            .property("GroupDescription", description)
            .property("SecurityGroupEgress", Value::List(vec![egress]))
            .property("VpcId", vpc.vpc_id());
        if let Some(name) = &props.name {
            resource.set_property("GroupName", name);
        }

        let group = stack.add_resource(&path.child("Resource")?, resource)?;

        Ok(Self {
            path,
            group,
            name: props.name,
            exposure: props.exposure,
            allow_all_outbound: props.allow_all_outbound,
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.group
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn exposure(&self) -> Exposure {
        self.exposure
    }

    pub fn group_id(&self) -> Value {
        Value::get_att(&self.group, "GroupId")
    }

    fn rule_path(&self, stack: &Stack, direction: &str, peer: &Peer<'_>, port: &Port) -> SynthResult<ConstructPath> {
        let id = format!("{} {}:{}", direction, peer.unique_id(), port.label());
        if stack.id() == self.group.stack() {
            self.path.child(id)
        } else {
            ConstructPath::root(format!("{}{}", self.group.logical_id(), id))
        }
    }

    fn rule_fields(port: &Port, description: &str) -> Vec<(&'static str, Value)> {
        let mut fields = vec![
            ("Description", Value::from(description)),
            ("IpProtocol", Value::from(port.protocol().ip_protocol())),
        ];
        if port.protocol() != crate::domain::Protocol::All {
            fields.push(("FromPort", Value::from(port.from_port())));
            fields.push(("ToPort", Value::from(port.to_port())));
        }
        fields
    }

    /// Allow inbound traffic from `peer` on `port`
    pub fn add_ingress_rule(
        &self,
        stack: &mut Stack,
        peer: Peer<'_>,
        port: Port,
        description: Option<&str>,
    ) -> SynthResult<()> {
        let cidr = peer.cidr();
        validate_ingress_rule(self.exposure, cidr.as_ref(), &port)
            .map_err(|e| SynthError::validation(&self.path, e))?;

        let description = description
            .map(str::to_string)
            .unwrap_or_else(|| format!("from {}:{}", peer.label(), port.label()));
        let mut fields = Self::rule_fields(&port, &description);

        debug!(group = %self.path, peer = %peer.label(), port = %port, "Allowing ingress");

        match (peer, cidr) {
            (Peer::SecurityGroup(source), _) => {
                fields.push(("GroupId", self.group_id()));
                fields.push(("SourceSecurityGroupId", source.group_id()));
            }
            (_, Some(cidr)) if stack.id() == self.group.stack() => {
                fields.push(("CidrIp", Value::from(cidr.to_string())));
                stack
                    .resource_mut(&self.group)?
                    .append_property("SecurityGroupIngress", Value::map(fields));
                return Ok(());
            }
            (_, cidr) => {
                fields.push(("GroupId", self.group_id()));
                if let Some(cidr) = cidr {
                    fields.push(("CidrIp", Value::from(cidr.to_string())));
                }
            }
        }

        let path = self.rule_path(stack, "from", &peer, &port)?;
        let mut rule = Resource::new(ResourceType::SecurityGroupIngress);
        for (name, value) in fields {
            rule.set_property(name, value);
        }
        stack.add_resource(&path, rule)?;
        Ok(())
    }

    /// Allow outbound traffic to `peer` on `port`
    ///
    /// A no-op for groups that already allow all outbound traffic.
    pub fn add_egress_rule(
        &self,
        stack: &mut Stack,
        peer: Peer<'_>,
        port: Port,
        description: Option<&str>,
    ) -> SynthResult<()> {
        if self.allow_all_outbound {
            return Ok(());
        }

        let description = description
            .map(str::to_string)
            .unwrap_or_else(|| format!("to {}:{}", peer.label(), port.label()));
        let mut fields = Self::rule_fields(&port, &description);

        match (peer, peer.cidr()) {
            (Peer::SecurityGroup(destination), _) => {
                fields.push(("DestinationSecurityGroupId", destination.group_id()));
            }
            (_, Some(cidr)) if stack.id() == self.group.stack() => {
                fields.push(("CidrIp", Value::from(cidr.to_string())));
                let group = stack.resource_mut(&self.group)?;
                let mut rules: Vec<Value> = match group.get_property("SecurityGroupEgress") {
                    Some(Value::List(rules)) => rules
                        .iter()
                        .filter(|r| !is_disallow_placeholder(r))
                        .cloned()
                        .collect(),
                    _ => Vec::new(),
                };
                rules.push(Value::map(fields));
                group.set_property("SecurityGroupEgress", Value::List(rules));
                return Ok(());
            }
            (_, cidr) => {
                if let Some(cidr) = cidr {
                    fields.push(("CidrIp", Value::from(cidr.to_string())));
                }
            }
        }

        fields.push(("GroupId", self.group_id()));
        let path = self.rule_path(stack, "to", &peer, &port)?;
        let mut rule = Resource::new(ResourceType::SecurityGroupEgress);
        for (name, value) in fields {
            rule.set_property(name, value);
        }
        stack.add_resource(&path, rule)?;
        Ok(())
    }

    /// Open `port` from `source` to this group, adding the matching egress
    /// rule on `source` when it restricts outbound traffic
    pub fn allow_from(
        &self,
        stack: &mut Stack,
        source: &SecurityGroup,
        port: Port,
        description: Option<&str>,
    ) -> SynthResult<()> {
        self.add_ingress_rule(stack, Peer::SecurityGroup(source), port, description)?;
        source.add_egress_rule(stack, Peer::SecurityGroup(self), port, description)
    }
}

fn is_disallow_placeholder(rule: &Value) -> bool {
    match rule {
        Value::Map(fields) => fields.get("Description") == Some(&Value::from(DISALLOW_ALL)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, StackId};
    use crate::constructs::vpc::VpcProps;
    use crate::domain::{Environment, ValidationError};

    struct Fixture {
        app: App,
        vpc: Vpc,
    }

    fn fixture() -> Fixture {
        let mut app = App::new();
        let id = app.add_stack("Network", Environment::agnostic()).unwrap();
        let vpc = Vpc::new(
            app.stack_mut(id).unwrap(),
            ConstructPath::root("Vpc").unwrap(),
            VpcProps::default(),
        )
        .unwrap();
        Fixture { app, vpc }
    }

    fn group(f: &mut Fixture, id: &str, props: SecurityGroupProps) -> SecurityGroup {
        let stack = f.app.stack_mut(StackId(0)).unwrap();
        SecurityGroup::new(stack, ConstructPath::root(id).unwrap(), &f.vpc, props).unwrap()
    }

    fn of_type(app: &App, resource_type: ResourceType) -> Vec<&Resource> {
        app.stacks()[0]
            .resources()
            .values()
            .filter(|r| r.resource_type() == resource_type)
            .collect()
    }

    #[test]
    fn test_group_to_group_rule_is_standalone() {
        let mut f = fixture();
        let db = group(&mut f, "popularVoteDbSg", SecurityGroupProps::named("popularVoteDbSg"));
        let migration = group(
            &mut f,
            "popularVoteDbMigrationSg",
            SecurityGroupProps::named("popularVoteDbMigrationSg"),
        );

        let stack = f.app.stack_mut(StackId(0)).unwrap();
        db.allow_from(stack, &migration, Port::tcp(3306), None).unwrap();

        let rules = of_type(&f.app, ResourceType::SecurityGroupIngress);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].get_property("FromPort"), Some(&Value::from(3306u16)));
        assert_eq!(
            rules[0].get_property("SourceSecurityGroupId"),
            Some(&migration.group_id())
        );
        // Migration group allows all outbound, so no egress rule is needed
        assert!(of_type(&f.app, ResourceType::SecurityGroupEgress).is_empty());
    }

    #[test]
    fn test_internal_group_rejects_any_ipv4() {
        let mut f = fixture();
        let app_sg = group(&mut f, "popularVoteAppSg", SecurityGroupProps::default());
        let stack = f.app.stack_mut(StackId(0)).unwrap();

        let err = app_sg
            .add_ingress_rule(stack, Peer::AnyIpv4, Port::all_tcp(), Some("allInboundTcp"))
            .unwrap_err();
        assert!(matches!(
            err,
            SynthError::Validation {
                source: ValidationError::OverlyBroadIngress(_),
                ..
            }
        ));
    }

    #[test]
    fn test_internet_facing_group_inlines_single_port() {
        let mut f = fixture();
        let lb = group(
            &mut f,
            "LbSg",
            SecurityGroupProps {
                exposure: Exposure::InternetFacing,
                allow_all_outbound: false,
                ..SecurityGroupProps::default()
            },
        );
        let stack = f.app.stack_mut(StackId(0)).unwrap();
        lb.add_ingress_rule(stack, Peer::AnyIpv4, Port::tcp(80), None)
            .unwrap();

        let resource = stack.resource(lb.reference()).unwrap();
        match resource.get_property("SecurityGroupIngress") {
            Some(Value::List(rules)) => {
                assert_eq!(rules.len(), 1);
                match &rules[0] {
                    Value::Map(rule) => {
                        assert_eq!(rule.get("CidrIp"), Some(&Value::from("0.0.0.0/0")))
                    }
                    other => panic!("unexpected rule {:?}", other),
                }
            }
            other => panic!("unexpected ingress {:?}", other),
        }
    }

    #[test]
    fn test_restricted_outbound_gets_egress_rule() {
        let mut f = fixture();
        let lb = group(
            &mut f,
            "LbSg",
            SecurityGroupProps {
                exposure: Exposure::InternetFacing,
                allow_all_outbound: false,
                ..SecurityGroupProps::default()
            },
        );
        let service = group(&mut f, "ServiceSg", SecurityGroupProps::default());
        let stack = f.app.stack_mut(StackId(0)).unwrap();

        service.allow_from(stack, &lb, Port::tcp(8080), None).unwrap();

        let egress = of_type(&f.app, ResourceType::SecurityGroupEgress);
        assert_eq!(egress.len(), 1);
        assert_eq!(
            egress[0].get_property("DestinationSecurityGroupId"),
            Some(&service.group_id())
        );
    }

    #[test]
    fn test_cidr_egress_replaces_placeholder() {
        let mut f = fixture();
        let restricted = group(
            &mut f,
            "Restricted",
            SecurityGroupProps {
                allow_all_outbound: false,
                ..SecurityGroupProps::default()
            },
        );
        let stack = f.app.stack_mut(StackId(0)).unwrap();
        let cidr = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        restricted
            .add_egress_rule(stack, Peer::Ipv4(cidr), Port::tcp(443), None)
            .unwrap();

        match stack
            .resource(restricted.reference())
            .unwrap()
            .get_property("SecurityGroupEgress")
        {
            Some(Value::List(rules)) => {
                assert_eq!(rules.len(), 1);
                assert!(!is_disallow_placeholder(&rules[0]));
            }
            other => panic!("unexpected egress {:?}", other),
        }
    }
}
