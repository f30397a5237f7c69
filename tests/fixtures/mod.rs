// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for popular-vote-infrastructure
//!
//! Deterministic configurations and lookups into synthesized templates.
//! Every fixture builds a fresh app; nothing is shared between tests.
#![allow(dead_code)]

use serde_json::Value as Json;

use popular_vote_infrastructure::domain::{Environment, ResourceType};
use popular_vote_infrastructure::synth::CloudAssembly;
use popular_vote_infrastructure::template::{RenderedResource, Template};
use popular_vote_infrastructure::{build_app, synthesize, App, DeployConfig, Deployment};

pub const TEST_ACCOUNT: &str = "123456789012";
pub const TEST_REGION: &str = "us-east-1";

pub const FOUNDATION: &str = "DeployFoundationStack";
pub const DATABASE: &str = "DeployDatabaseStack";
pub const APPLICATION: &str = "DeployApplicationStack";

/// Default settings, deployable to any account
pub fn agnostic_config() -> DeployConfig {
    DeployConfig::default()
}

/// Default settings pinned to the test account and region
pub fn pinned_config() -> DeployConfig {
    DeployConfig {
        environment: Environment::pinned(TEST_ACCOUNT, TEST_REGION)
            .expect("Invalid environment in test fixture"),
        ..DeployConfig::default()
    }
}

pub fn declared(config: &DeployConfig) -> (App, Deployment) {
    build_app(config).expect("Failed to declare stacks")
}

pub fn synthesized(config: &DeployConfig) -> (Deployment, CloudAssembly) {
    let (app, deployment) = declared(config);
    let assembly = synthesize(&app).expect("Failed to synthesize");
    (deployment, assembly)
}

pub fn template<'a>(assembly: &'a CloudAssembly, stack: &str) -> &'a Template {
    assembly
        .template(stack)
        .unwrap_or_else(|| panic!("No template for {}", stack))
}

/// The only resource of a type in a template
pub fn single<'a>(template: &'a Template, resource_type: ResourceType) -> &'a RenderedResource {
    template
        .single_of_type(resource_type)
        .map(|(_, resource)| resource)
        .unwrap_or_else(|| panic!("Expected exactly one {}", resource_type))
}

/// First container definition of the only task definition in a template
pub fn container(template: &Template) -> &Json {
    let task = single(template, ResourceType::TaskDefinition);
    &task
        .property("ContainerDefinitions")
        .expect("Task definition without containers")[0]
}

/// Named entry of a container's `Environment` or `Secrets` list
pub fn container_entry<'a>(container: &'a Json, list: &str, name: &str) -> &'a Json {
    container[list]
        .as_array()
        .and_then(|entries| entries.iter().find(|e| e["Name"] == name))
        .unwrap_or_else(|| panic!("No {} entry named {}", list, name))
}

/// Every ingress rule, inline or standalone, across all templates
pub fn all_ingress_rules(assembly: &CloudAssembly) -> Vec<Json> {
    let mut rules = Vec::new();
    for artifact in assembly.artifacts() {
        for (_, group) in artifact.template.resources_of_type(ResourceType::SecurityGroup) {
            if let Some(Json::Array(inline)) = group.property("SecurityGroupIngress") {
                rules.extend(inline.iter().cloned());
            }
        }
        for (_, rule) in artifact
            .template
            .resources_of_type(ResourceType::SecurityGroupIngress)
        {
            rules.push(Json::Object(rule.properties.clone()));
        }
    }
    rules
}
