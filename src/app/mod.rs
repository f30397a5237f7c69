// Copyright (c) 2025 - Cowboy AI, Inc.
//! Construct Tree
//!
//! An [`App`] owns a set of named [`Stack`]s. Constructs add resources to a
//! stack under a [`ConstructPath`] and get back a [`ResourceRef`] handle that
//! other constructs, in the same or another stack, use to refer to them.
//!
//! # Invariants
//!
//! - Stack names are unique within an app
//! - Logical ids (resources and outputs share one namespace) are unique
//!   within a stack
//! - A [`ResourceRef`] always carries the stack that declared it, so synthesis
//!   can tell local references from cross-stack ones

mod path;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use crate::domain::{Environment, LogicalId};
use crate::errors::{SynthError, SynthResult};
use crate::template::{Output, Resource};

pub use path::ConstructPath;

/// Index of a stack inside its app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(pub usize);

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a declared resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    stack: StackId,
    logical_id: LogicalId,
}

impl ResourceRef {
    pub fn new(stack: StackId, logical_id: LogicalId) -> Self {
        Self { stack, logical_id }
    }

    pub fn stack(&self) -> StackId {
        self.stack
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }
}

/// A named, independently deployable group of resources
#[derive(Debug, Clone)]
pub struct Stack {
    id: StackId,
    name: String,
    environment: Environment,
    description: Option<String>,
    resources: BTreeMap<LogicalId, Resource>,
    paths: BTreeMap<LogicalId, ConstructPath>,
    outputs: BTreeMap<LogicalId, Output>,
    dependencies: BTreeSet<StackId>,
}

impl Stack {
    fn new(id: StackId, name: String, environment: Environment) -> Self {
        Self {
            id,
            name,
            environment,
            description: None,
            resources: BTreeMap::new(),
            paths: BTreeMap::new(),
            outputs: BTreeMap::new(),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> StackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    fn claim(&self, logical_id: &LogicalId, path: &ConstructPath) -> SynthResult<()> {
        if self.resources.contains_key(logical_id) || self.outputs.contains_key(logical_id) {
            return Err(SynthError::DuplicateConstruct {
                stack: self.name.clone(),
                id: path.to_string(),
            });
        }
        Ok(())
    }

    /// Declare a resource at `path`
    pub fn add_resource(
        &mut self,
        path: &ConstructPath,
        resource: Resource,
    ) -> SynthResult<ResourceRef> {
        let logical_id = path.logical_id();
        self.claim(&logical_id, path)?;

        debug!(
            stack = %self.name,
            path = %path,
            logical_id = %logical_id,
            resource_type = %resource.resource_type(),
            "Declared resource"
        );

        self.resources.insert(logical_id.clone(), resource);
        self.paths.insert(logical_id.clone(), path.clone());
        Ok(ResourceRef::new(self.id, logical_id))
    }

    /// Declare an output at `path`
    pub fn add_output(&mut self, path: &ConstructPath, output: Output) -> SynthResult<LogicalId> {
        let logical_id = path.logical_id();
        self.claim(&logical_id, path)?;
        self.outputs.insert(logical_id.clone(), output);
        Ok(logical_id)
    }

    /// Deploy this stack after `other`
    pub fn add_dependency(&mut self, other: StackId) {
        if other != self.id {
            self.dependencies.insert(other);
        }
    }

    fn check_owner(&self, reference: &ResourceRef) -> SynthResult<()> {
        if reference.stack != self.id {
            return Err(SynthError::UnknownStack(format!(
                "{} is declared in stack {}, not {}",
                reference.logical_id, reference.stack, self.name
            )));
        }
        Ok(())
    }

    pub fn resource(&self, reference: &ResourceRef) -> Option<&Resource> {
        if reference.stack != self.id {
            return None;
        }
        self.resources.get(&reference.logical_id)
    }

    /// Mutable access to a resource declared by this stack
    pub fn resource_mut(&mut self, reference: &ResourceRef) -> SynthResult<&mut Resource> {
        self.check_owner(reference)?;
        let name = self.name.clone();
        self.resources
            .get_mut(&reference.logical_id)
            .ok_or_else(|| SynthError::DanglingReference {
                stack: name,
                logical_id: reference.logical_id.to_string(),
            })
    }

    pub fn resources(&self) -> &BTreeMap<LogicalId, Resource> {
        &self.resources
    }

    pub fn outputs(&self) -> &BTreeMap<LogicalId, Output> {
        &self.outputs
    }

    /// Construct path of a declared resource
    pub fn path_of(&self, logical_id: &LogicalId) -> Option<&ConstructPath> {
        self.paths.get(logical_id)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = StackId> + '_ {
        self.dependencies.iter().copied()
    }
}

/// Root of the construct tree
#[derive(Debug, Clone, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stack with a unique name
    pub fn add_stack(
        &mut self,
        name: impl Into<String>,
        environment: Environment,
    ) -> SynthResult<StackId> {
        let name = name.into();
        // Stack names become artifact ids, template file names and export prefixes
        crate::domain::ConstructId::new(name.as_str())?;

        if self.stacks.iter().any(|s| s.name == name) {
            return Err(SynthError::DuplicateStack(name));
        }

        let id = StackId(self.stacks.len());
        debug!(stack = %name, environment = %environment, "Added stack");
        self.stacks.push(Stack::new(id, name, environment));
        Ok(id)
    }

    pub fn stack(&self, id: StackId) -> SynthResult<&Stack> {
        self.stacks
            .get(id.0)
            .ok_or_else(|| SynthError::UnknownStack(id.to_string()))
    }

    pub fn stack_mut(&mut self, id: StackId) -> SynthResult<&mut Stack> {
        self.stacks
            .get_mut(id.0)
            .ok_or_else(|| SynthError::UnknownStack(id.to_string()))
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Resolve a handle to its declared resource
    pub fn resource(&self, reference: &ResourceRef) -> Option<&Resource> {
        self.stacks.get(reference.stack.0)?.resource(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceType;

    fn repo(name: &str) -> Resource {
        Resource::new(ResourceType::EcrRepository).property("RepositoryName", name)
    }

    #[test]
    fn test_add_stack_rejects_duplicates() {
        let mut app = App::new();
        app.add_stack("DeployFoundationStack", Environment::agnostic())
            .unwrap();
        assert!(matches!(
            app.add_stack("DeployFoundationStack", Environment::agnostic()),
            Err(SynthError::DuplicateStack(_))
        ));
        assert!(matches!(
            app.add_stack("Bad/Name", Environment::agnostic()),
            Err(SynthError::InvalidConstructId(_))
        ));
    }

    #[test]
    fn test_add_resource_returns_handle() {
        let mut app = App::new();
        let id = app.add_stack("Foundation", Environment::agnostic()).unwrap();
        let stack = app.stack_mut(id).unwrap();

        let path = ConstructPath::root("popular-vote-app").unwrap().child("Resource").unwrap();
        let handle = stack.add_resource(&path, repo("popular-vote-app")).unwrap();

        assert_eq!(handle.stack(), id);
        assert!(stack.resource(&handle).is_some());
        assert_eq!(stack.path_of(handle.logical_id()), Some(&path));
        assert!(app.resource(&handle).is_some());
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let mut app = App::new();
        let id = app.add_stack("Foundation", Environment::agnostic()).unwrap();
        let stack = app.stack_mut(id).unwrap();
        let path = ConstructPath::root("Repo").unwrap();

        stack.add_resource(&path, repo("a")).unwrap();
        assert!(matches!(
            stack.add_resource(&path, repo("b")),
            Err(SynthError::DuplicateConstruct { .. })
        ));
        // Outputs share the namespace
        assert!(matches!(
            stack.add_output(&path, Output::new("x")),
            Err(SynthError::DuplicateConstruct { .. })
        ));
    }

    #[test]
    fn test_resource_mut_checks_owner() {
        let mut app = App::new();
        let a = app.add_stack("A", Environment::agnostic()).unwrap();
        let b = app.add_stack("B", Environment::agnostic()).unwrap();

        let handle = app
            .stack_mut(a)
            .unwrap()
            .add_resource(&ConstructPath::root("Repo").unwrap(), repo("a"))
            .unwrap();

        assert!(app.stack_mut(a).unwrap().resource_mut(&handle).is_ok());
        assert!(matches!(
            app.stack_mut(b).unwrap().resource_mut(&handle),
            Err(SynthError::UnknownStack(_))
        ));
    }

    #[test]
    fn test_self_dependency_ignored() {
        let mut app = App::new();
        let a = app.add_stack("A", Environment::agnostic()).unwrap();
        let b = app.add_stack("B", Environment::agnostic()).unwrap();
        let stack = app.stack_mut(b).unwrap();
        stack.add_dependency(b);
        stack.add_dependency(a);
        assert_eq!(stack.dependencies().collect::<Vec<_>>(), vec![a]);
    }
}
