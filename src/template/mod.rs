// Copyright (c) 2025 - Cowboy AI, Inc.
//! Template Declaration Model
//!
//! [`Resource`] and [`Output`] are what constructs declare. [`Template`] is
//! the rendered CloudFormation document written by synthesis.

pub mod value;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::app::ResourceRef;
use crate::domain::{RemovalPolicy, ResourceType};

pub use value::{Pseudo, ReferenceResolver, Value};

/// CloudFormation template format version
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A declared resource
///
/// Properties are kept sorted so rendering is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    resource_type: ResourceType,
    properties: BTreeMap<String, Value>,
    depends_on: BTreeSet<ResourceRef>,
    removal_policy: Option<RemovalPolicy>,
}

impl Resource {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            properties: BTreeMap::new(),
            depends_on: BTreeSet::new(),
            removal_policy: None,
        }
    }

    /// Builder: set a property
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_property(name, value);
        self
    }

    /// Builder: set the removal policy
    pub fn removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    /// Builder: depend on another resource
    pub fn depends_on(mut self, other: &ResourceRef) -> Self {
        self.add_dependency(other);
        self
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Append to a list property, creating it when absent
    pub fn append_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let entry = self
            .properties
            .entry(name.into())
            .or_insert_with(|| Value::List(Vec::new()));
        match entry {
            Value::List(items) => items.push(value.into()),
            other => {
                let previous = std::mem::replace(other, Value::List(Vec::new()));
                *other = Value::List(vec![previous, value.into()]);
            }
        }
    }

    pub fn add_dependency(&mut self, other: &ResourceRef) {
        self.depends_on.insert(other.clone());
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn get_property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &ResourceRef> {
        self.depends_on.iter()
    }

    pub fn get_removal_policy(&self) -> Option<RemovalPolicy> {
        self.removal_policy
    }

    /// Literal physical name, when the type has one and it is set
    pub fn physical_name(&self) -> Option<&str> {
        self.resource_type
            .physical_name_property()
            .and_then(|property| self.properties.get(property))
            .and_then(Value::as_literal)
    }

    /// Visit every reference in properties and dependencies
    pub fn visit_refs<'a>(&'a self, f: &mut impl FnMut(&'a ResourceRef, Option<&'a str>)) {
        self.properties.values().for_each(|v| v.visit_refs(f));
        self.depends_on.iter().for_each(|r| f(r, None));
    }
}

/// A declared stack output
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub value: Value,
    pub description: Option<String>,
}

impl Output {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Rendered CloudFormation template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,

    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, RenderedResource>,

    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty", default)]
    pub outputs: BTreeMap<String, RenderedOutput>,
}

impl Template {
    pub fn new(description: Option<String>) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Resources of one CloudFormation type, keyed by logical id
    pub fn resources_of_type(&self, resource_type: ResourceType) -> Vec<(&str, &RenderedResource)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type.as_str())
            .map(|(id, r)| (id.as_str(), r))
            .collect()
    }

    /// The single resource of a type, if exactly one exists
    pub fn single_of_type(&self, resource_type: ResourceType) -> Option<(&str, &RenderedResource)> {
        let mut found = self.resources_of_type(resource_type);
        if found.len() == 1 {
            found.pop()
        } else {
            None
        }
    }

    /// Export names declared by the template
    pub fn export_names(&self) -> Vec<&str> {
        self.outputs
            .values()
            .filter_map(|o| o.export.as_ref().map(|e| e.name.as_str()))
            .collect()
    }
}

/// Rendered resource entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(
        rename = "Properties",
        skip_serializing_if = "serde_json::Map::is_empty",
        default
    )]
    pub properties: serde_json::Map<String, serde_json::Value>,

    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty", default)]
    pub depends_on: Vec<String>,

    #[serde(rename = "UpdateReplacePolicy", skip_serializing_if = "Option::is_none", default)]
    pub update_replace_policy: Option<String>,

    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none", default)]
    pub deletion_policy: Option<String>,
}

impl RenderedResource {
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }
}

/// Rendered output entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedOutput {
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,

    #[serde(rename = "Value")]
    pub value: serde_json::Value,

    #[serde(rename = "Export", skip_serializing_if = "Option::is_none", default)]
    pub export: Option<ExportName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportName {
    #[serde(rename = "Name")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::StackId;
    use crate::domain::LogicalId;

    #[test]
    fn test_builder_and_physical_name() {
        let repo = Resource::new(ResourceType::EcrRepository)
            .property("RepositoryName", "popular-vote-app")
            .property("EmptyOnDelete", true)
            .removal_policy(RemovalPolicy::Destroy);

        assert_eq!(repo.physical_name(), Some("popular-vote-app"));
        assert_eq!(repo.get_removal_policy(), Some(RemovalPolicy::Destroy));
        assert_eq!(repo.get_property("EmptyOnDelete"), Some(&Value::Bool(true)));

        let subnet = Resource::new(ResourceType::Subnet).property("CidrBlock", "10.0.0.0/18");
        assert_eq!(subnet.physical_name(), None);
    }

    #[test]
    fn test_append_property() {
        let mut sg = Resource::new(ResourceType::SecurityGroup);
        sg.append_property("SecurityGroupIngress", Value::map([("FromPort", Value::from(80u16))]));
        sg.append_property("SecurityGroupIngress", Value::map([("FromPort", Value::from(443u16))]));

        match sg.get_property("SecurityGroupIngress") {
            Some(Value::List(rules)) => assert_eq!(rules.len(), 2),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_visit_refs_includes_dependencies() {
        let listener = ResourceRef::new(StackId(0), LogicalId::from_raw("Listener").unwrap());
        let service = Resource::new(ResourceType::EcsService).depends_on(&listener);

        let mut count = 0;
        service.visit_refs(&mut |_, _| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_template_serializes_cloudformation_keys() {
        let mut template = Template::new(None);
        template.resources.insert(
            "Repo".to_string(),
            RenderedResource {
                resource_type: "AWS::ECR::Repository".to_string(),
                properties: serde_json::Map::new(),
                depends_on: vec![],
                update_replace_policy: Some("Delete".to_string()),
                deletion_policy: Some("Delete".to_string()),
            },
        );

        let json = serde_json::to_value(&template).unwrap();
        assert_eq!(json["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(json["Resources"]["Repo"]["Type"], "AWS::ECR::Repository");
        assert_eq!(json["Resources"]["Repo"]["DeletionPolicy"], "Delete");
        assert!(json.get("Outputs").is_none());
        assert!(json["Resources"]["Repo"].get("Properties").is_none());

        assert_eq!(template.resources_of_type(ResourceType::EcrRepository).len(), 1);
        assert!(template.single_of_type(ResourceType::Vpc).is_none());
    }
}
