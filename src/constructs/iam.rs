// Copyright (c) 2025 - Cowboy AI, Inc.
//! IAM roles and inline policies

use crate::app::{ConstructPath, ResourceRef, Stack};
use crate::domain::ResourceType;
use crate::errors::SynthResult;
use crate::template::{Resource, Value};

const POLICY_VERSION: &str = "2012-10-17";

/// One `Allow` statement
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    actions: Vec<String>,
    resources: Vec<Value>,
}

impl PolicyStatement {
    pub fn allow<A: Into<String>>(
        actions: impl IntoIterator<Item = A>,
        resources: impl IntoIterator<Item = Value>,
    ) -> Self {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().collect(),
        }
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn resources(&self) -> &[Value] {
        &self.resources
    }

    fn to_value(&self) -> Value {
        let action = match self.actions.as_slice() {
            [single] => Value::from(single),
            many => Value::from(many.to_vec()),
        };
        let resource = match self.resources.as_slice() {
            [single] => single.clone(),
            many => Value::List(many.to_vec()),
        };
        Value::map([
            ("Action", action),
            ("Effect", Value::from("Allow")),
            ("Resource", resource),
        ])
    }
}

/// Role assumable by an AWS service
#[derive(Debug, Clone)]
pub struct Role {
    path: ConstructPath,
    role: ResourceRef,
}

impl Role {
    pub fn for_service(
        stack: &mut Stack,
        path: ConstructPath,
        service_principal: &str,
    ) -> SynthResult<Self> {
        let trust = Value::map([
            (
                "Statement",
                Value::List(vec![Value::map([
                    ("Action", Value::from("sts:AssumeRole")),
                    ("Effect", Value::from("Allow")),
                    (
                        "Principal",
                        Value::map([("Service", Value::from(service_principal))]),
                    ),
                ])]),
            ),
            ("Version", Value::from(POLICY_VERSION)),
        ]);

        let role = stack.add_resource(
            &path,
            Resource::new(ResourceType::IamRole).property("AssumeRolePolicyDocument", trust),
        )?;
        Ok(Self { path, role })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.role
    }

    pub fn role_arn(&self) -> Value {
        Value::get_att(&self.role, "Arn")
    }
}

/// Inline policy attached to one role
///
/// Statements are deduplicated: adding a statement whose actions and
/// resources are already granted is a no-op.
#[derive(Debug, Clone)]
pub struct Policy {
    policy: ResourceRef,
    statements: Vec<PolicyStatement>,
}

impl Policy {
    pub fn attached_to(stack: &mut Stack, path: ConstructPath, role: &Role) -> SynthResult<Self> {
        let name = path.logical_id().to_string();
        let policy = stack.add_resource(
            &path,
            Resource::new(ResourceType::IamPolicy)
                .property("PolicyName", name)
                .property("Roles", vec![Value::Ref(role.reference().clone())]),
        )?;

        let policy = Self {
            policy,
            statements: Vec::new(),
        };
        policy.sync(stack)?;
        Ok(policy)
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.policy
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn add_statement(&mut self, stack: &mut Stack, statement: PolicyStatement) -> SynthResult<()> {
        if self.statements.contains(&statement) {
            return Ok(());
        }
        self.statements.push(statement);
        self.sync(stack)
    }

    fn sync(&self, stack: &mut Stack) -> SynthResult<()> {
        let document = Value::map([
            (
                "Statement",
                Value::List(self.statements.iter().map(PolicyStatement::to_value).collect()),
            ),
            ("Version", Value::from(POLICY_VERSION)),
        ]);
        stack
            .resource_mut(&self.policy)?
            .set_property("PolicyDocument", document);
        Ok(())
    }
}
