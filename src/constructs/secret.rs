// Copyright (c) 2025 - Cowboy AI, Inc.
//! Generated database credentials
//!
//! The secret is generated once by Secrets Manager and attached to its
//! database cluster. Consumers only ever reference it: by dynamic reference
//! inside the template, or by `valueFrom` in container definitions.

use crate::app::{ConstructPath, ResourceRef, Stack};
use crate::domain::{RemovalPolicy, ResourceType};
use crate::errors::SynthResult;
use crate::template::{Resource, Value};

/// Characters left out of generated passwords
pub const EXCLUDED_PASSWORD_CHARACTERS: &str = " %+~`#$&*()|[]{}:;<>?!'/@\"\\";

pub const PASSWORD_LENGTH: u32 = 30;

#[derive(Debug)]
pub struct DatabaseSecret {
    path: ConstructPath,
    secret: ResourceRef,
    attachment: ResourceRef,
    username: String,
}

impl DatabaseSecret {
    /// Generate credentials for `username`, to be attached to a cluster
    pub fn generate(
        stack: &mut Stack,
        path: ConstructPath,
        username: &str,
        description: &str,
        removal_policy: RemovalPolicy,
    ) -> SynthResult<DatabaseSecretBuilder> {
        let template = serde_json::json!({ "username": username }).to_string();

        let secret = stack.add_resource(
            &path.child("Resource")?,
            Resource::new(ResourceType::Secret)
                .property("Description", description)
                .property(
                    "GenerateSecretString",
                    Value::map([
                        ("ExcludeCharacters", Value::from(EXCLUDED_PASSWORD_CHARACTERS)),
                        ("GenerateStringKey", Value::from("password")),
                        ("PasswordLength", Value::from(PASSWORD_LENGTH)),
                        ("SecretStringTemplate", Value::from(template)),
                    ]),
                )
                .removal_policy(removal_policy),
        )?;

        Ok(DatabaseSecretBuilder {
            path,
            secret,
            username: username.to_string(),
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.secret
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// ARN of the attached secret
    pub fn secret_arn(&self) -> Value {
        Value::Ref(self.attachment.clone())
    }

    /// CloudFormation dynamic reference to one JSON field
    pub fn dynamic_reference(&self, field: &str) -> Value {
        dynamic_reference(&self.secret, field)
    }

    /// ECS `valueFrom` for one JSON field
    pub fn ecs_value_from(&self, field: &str) -> Value {
        Value::concat([self.secret_arn(), Value::from(format!(":{}::", field))])
    }
}

/// A generated secret waiting for its cluster
#[derive(Debug)]
pub struct DatabaseSecretBuilder {
    path: ConstructPath,
    secret: ResourceRef,
    username: String,
}

impl DatabaseSecretBuilder {
    pub fn reference(&self) -> &ResourceRef {
        &self.secret
    }

    pub fn dynamic_reference(&self, field: &str) -> Value {
        dynamic_reference(&self.secret, field)
    }

    pub fn attach(self, stack: &mut Stack, cluster: &ResourceRef) -> SynthResult<DatabaseSecret> {
        let attachment = stack.add_resource(
            &self.path.child("Attachment")?.child("Resource")?,
            Resource::new(ResourceType::SecretTargetAttachment)
                .property("SecretId", Value::Ref(self.secret.clone()))
                .property("TargetId", Value::Ref(cluster.clone()))
                .property("TargetType", ResourceType::DbCluster.as_str()),
        )?;

        Ok(DatabaseSecret {
            path: self.path,
            secret: self.secret,
            attachment,
            username: self.username,
        })
    }
}

fn dynamic_reference(secret: &ResourceRef, field: &str) -> Value {
    Value::concat([
        Value::from("{{resolve:secretsmanager:"),
        Value::Ref(secret.clone()),
        Value::from(format!(":SecretString:{}::}}}}", field)),
    ])
}
