// Copyright (c) 2025 - Cowboy AI, Inc.
//! ECR image repositories

use crate::app::{ConstructPath, ResourceRef, Stack};
use crate::domain::invariants::{validate_repository_name, validate_repository_teardown};
use crate::domain::{RemovalPolicy, ResourceType};
use crate::errors::{SynthError, SynthResult};
use crate::template::{Resource, Value};

/// Repository configuration
///
/// # Invariants
/// - `name` follows ECR naming rules
/// - `Destroy` removal requires `empty_on_delete`, or teardown leaves a
///   non-empty repository behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryProps {
    pub name: String,
    pub removal_policy: RemovalPolicy,
    pub empty_on_delete: bool,
}

impl RepositoryProps {
    /// Repository removed together with its images
    pub fn disposable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            removal_policy: RemovalPolicy::Destroy,
            empty_on_delete: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    path: ConstructPath,
    repository: ResourceRef,
    name: String,
    removal_policy: RemovalPolicy,
    empty_on_delete: bool,
}

impl Repository {
    pub fn new(stack: &mut Stack, path: ConstructPath, props: RepositoryProps) -> SynthResult<Self> {
        validate_repository_name(&props.name).map_err(|e| SynthError::validation(&path, e))?;
        validate_repository_teardown(&props.name, props.removal_policy, props.empty_on_delete)
            .map_err(|e| SynthError::validation(&path, e))?;

        let mut resource = Resource::new(ResourceType::EcrRepository)
            .property("RepositoryName", props.name.as_str())
            .removal_policy(props.removal_policy);
        if props.empty_on_delete {
            resource.set_property("EmptyOnDelete", true);
        }

        let repository = stack.add_resource(&path.child("Resource")?, resource)?;

        Ok(Self {
            path,
            repository,
            name: props.name,
            removal_policy: props.removal_policy,
            empty_on_delete: props.empty_on_delete,
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.repository
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        self.removal_policy
    }

    pub fn empty_on_delete(&self) -> bool {
        self.empty_on_delete
    }

    pub fn repository_name(&self) -> Value {
        Value::Ref(self.repository.clone())
    }

    pub fn repository_arn(&self) -> Value {
        Value::get_att(&self.repository, "Arn")
    }

    pub fn repository_uri(&self) -> Value {
        Value::get_att(&self.repository, "RepositoryUri")
    }

    /// `<uri>:<tag>`
    pub fn image_uri(&self, tag: &str) -> Value {
        Value::concat([self.repository_uri(), Value::from(format!(":{}", tag))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, StackId};
    use crate::domain::{Environment, ValidationError};

    fn stack() -> App {
        let mut app = App::new();
        app.add_stack("Foundation", Environment::agnostic()).unwrap();
        app
    }

    #[test]
    fn test_disposable_repository() {
        let mut app = stack();
        let stack = app.stack_mut(StackId(0)).unwrap();
        let repo = Repository::new(
            stack,
            ConstructPath::root("popular-vote-app").unwrap(),
            RepositoryProps::disposable("popular-vote-app"),
        )
        .unwrap();

        let resource = stack.resource(repo.reference()).unwrap();
        assert_eq!(resource.get_property("EmptyOnDelete"), Some(&Value::Bool(true)));
        assert_eq!(resource.get_removal_policy(), Some(RemovalPolicy::Destroy));
        assert_eq!(resource.physical_name(), Some("popular-vote-app"));
    }

    #[test]
    fn test_destroyed_repository_must_be_emptied() {
        let mut app = stack();
        let stack = app.stack_mut(StackId(0)).unwrap();
        let result = Repository::new(
            stack,
            ConstructPath::root("repo").unwrap(),
            RepositoryProps {
                empty_on_delete: false,
                ..RepositoryProps::disposable("popular-vote-app")
            },
        );
        assert!(matches!(
            result,
            Err(SynthError::Validation {
                source: ValidationError::OrphanedRepository(_),
                ..
            })
        ));
    }

    #[test]
    fn test_image_uri_joins_tag() {
        let mut app = stack();
        let stack = app.stack_mut(StackId(0)).unwrap();
        let repo = Repository::new(
            stack,
            ConstructPath::root("repo").unwrap(),
            RepositoryProps::disposable("popular-vote-app"),
        )
        .unwrap();

        assert_eq!(
            repo.image_uri("latest"),
            Value::Join(
                String::new(),
                vec![repo.repository_uri(), Value::from(":latest")]
            )
        );
    }
}
