// Copyright (c) 2025 - Cowboy AI, Inc.
//! Synthesis
//!
//! Turns a declared [`App`] into a [`CloudAssembly`]:
//!
//! 1. Physical names are checked for uniqueness within each account/region scope
//! 2. Every intrinsic value is walked; references must point at declared
//!    resources, and cross-stack references must stay inside one environment
//! 3. Each distinct cross-stack (resource, attribute) pair becomes one export
//!    of the producer and an `Fn::ImportValue` in the consumer
//! 4. Stacks are ordered producers first; a cycle is an error
//! 5. Templates are rendered, local references as `Ref` / `Fn::GetAtt`

mod assembly;
mod graph;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;
use tracing::{debug, info, warn};

use crate::app::{App, ResourceRef, Stack, StackId};
use crate::domain::invariants::validate_unique_physical_names;
use crate::domain::{Environment, LogicalId, ResourceType, ValidationError};
use crate::errors::{SynthError, SynthResult};
use crate::template::{
    ExportName, ReferenceResolver, RenderedOutput, RenderedResource, Template, Value,
};

pub use assembly::{
    ArtifactProperties, CloudAssembly, Manifest, ManifestArtifact, StackArtifact,
    CLOUD_ASSEMBLY_VERSION, MANIFEST_FILE, VERSION_FILE,
};
pub use graph::DependencyGraph;

/// A (resource, attribute) pair one stack exports to others
type Export = (LogicalId, Option<String>);

/// Logical id of the output that exports a reference
pub fn export_output_id(logical_id: &LogicalId, attribute: Option<&str>) -> String {
    match attribute {
        None => format!("ExportsOutputRef{}", logical_id),
        Some(attribute) => {
            let attribute: String = attribute.chars().filter(char::is_ascii_alphanumeric).collect();
            format!("ExportsOutputFnGetAtt{}{}", logical_id, attribute)
        }
    }
}

/// `<Stack>:<output id>`
pub fn export_name(stack_name: &str, logical_id: &LogicalId, attribute: Option<&str>) -> String {
    format!("{}:{}", stack_name, export_output_id(logical_id, attribute))
}

/// Synthesize every stack of the app
pub fn synthesize(app: &App) -> SynthResult<CloudAssembly> {
    check_physical_names(app)?;

    let mut graph = DependencyGraph::new();
    let mut exports: BTreeMap<StackId, BTreeSet<Export>> = BTreeMap::new();

    for stack in app.stacks() {
        graph.add_node(stack.id(), stack.name());

        for producer in stack.dependencies() {
            app.stack(producer)?;
            graph.add_dependency(stack.id(), producer);
        }

        for (reference, attribute) in value_refs(stack) {
            check_declared(app, reference)?;
            if reference.stack() == stack.id() {
                continue;
            }

            let producer = app.stack(reference.stack())?;
            check_environments(stack, producer)?;
            graph.add_dependency(stack.id(), producer.id());
            exports
                .entry(producer.id())
                .or_default()
                .insert((reference.logical_id().clone(), attribute.map(str::to_string)));
        }

        for resource in stack.resources().values() {
            for dependency in resource.dependencies() {
                check_declared(app, dependency)?;
                if dependency.stack() != stack.id() {
                    debug!(
                        consumer = stack.name(),
                        producer = %dependency.stack(),
                        resource = %dependency.logical_id(),
                        "Resource dependency lifted to stack dependency"
                    );
                    graph.add_dependency(stack.id(), dependency.stack());
                }
            }
        }
    }

    let order = graph.topological_order()?;

    let mut artifacts = Vec::with_capacity(order.len());
    for id in order {
        let stack = app.stack(id)?;
        let template = render_stack(app, stack, exports.get(&id))?;
        let dependencies = graph
            .dependencies_of(id)
            .map(|producer| app.stack(producer).map(|s| s.name().to_string()))
            .collect::<SynthResult<Vec<_>>>()?;

        debug!(
            stack = stack.name(),
            resources = template.resources.len(),
            outputs = template.outputs.len(),
            dependencies = ?dependencies,
            "Rendered template"
        );

        artifacts.push(StackArtifact {
            name: stack.name().to_string(),
            environment: stack.environment().clone(),
            template,
            dependencies,
        });
    }

    let assembly = CloudAssembly::new(artifacts);
    info!(
        stacks = assembly.artifacts().len(),
        order = ?assembly.deploy_order(),
        "Synthesized app"
    );
    Ok(assembly)
}

/// References inside property and output values, excluding `DependsOn`
fn value_refs<'a>(stack: &'a Stack) -> Vec<(&'a ResourceRef, Option<&'a str>)> {
    let mut refs = Vec::new();
    let mut collect = |reference, attribute| refs.push((reference, attribute));
    for resource in stack.resources().values() {
        for value in resource.properties().values() {
            value.visit_refs(&mut collect);
        }
    }
    for output in stack.outputs().values() {
        output.value.visit_refs(&mut collect);
    }
    refs
}

fn check_declared(app: &App, reference: &ResourceRef) -> SynthResult<()> {
    let producer = app.stack(reference.stack())?;
    if producer.resource(reference).is_none() {
        return Err(SynthError::DanglingReference {
            stack: producer.name().to_string(),
            logical_id: reference.logical_id().to_string(),
        });
    }
    Ok(())
}

fn check_environments(consumer: &Stack, producer: &Stack) -> SynthResult<()> {
    if consumer.environment().is_compatible_with(producer.environment()) {
        return Ok(());
    }
    Err(SynthError::CrossEnvironmentReference {
        consumer: consumer.name().to_string(),
        consumer_env: consumer.environment().to_string(),
        producer: producer.name().to_string(),
        producer_env: producer.environment().to_string(),
    })
}

struct NamedResource<'a> {
    resource_type: ResourceType,
    name: &'a str,
    environment: &'a Environment,
    location: String,
}

/// Physical names must be unique per type in every account/region a stack
/// may deploy to; environment-agnostic stacks share a scope with everyone
fn check_physical_names(app: &App) -> SynthResult<()> {
    let mut named = Vec::new();
    for stack in app.stacks() {
        for (logical_id, resource) in stack.resources() {
            if let Some(name) = resource.physical_name() {
                let location = stack
                    .path_of(logical_id)
                    .map(|path| format!("{}/{}", stack.name(), path))
                    .unwrap_or_else(|| format!("{}/{}", stack.name(), logical_id));
                named.push(NamedResource {
                    resource_type: resource.resource_type(),
                    name,
                    environment: stack.environment(),
                    location,
                });
            }
        }
    }

    let agnostic = Environment::agnostic();
    let mut scopes: Vec<&Environment> = Vec::new();
    for entry in &named {
        if !entry.environment.is_agnostic() && !scopes.contains(&entry.environment) {
            scopes.push(entry.environment);
        }
    }
    if scopes.is_empty() {
        scopes.push(&agnostic);
    }

    for scope in scopes {
        let members: Vec<&NamedResource> = named
            .iter()
            .filter(|entry| entry.environment.is_compatible_with(scope))
            .collect();

        validate_unique_physical_names(members.iter().map(|m| (m.resource_type, m.name)))
            .map_err(|error| match error {
                ValidationError::DuplicatePhysicalName {
                    resource_type,
                    name,
                } => {
                    let mut clashing = members
                        .iter()
                        .filter(|m| m.resource_type == resource_type && m.name == name)
                        .map(|m| m.location.clone());
                    SynthError::DuplicatePhysicalName {
                        resource_type: resource_type.to_string(),
                        first: clashing.next().unwrap_or_default(),
                        second: clashing.next().unwrap_or_default(),
                        name,
                    }
                }
                other => SynthError::validation(scope, other),
            })?;
    }
    Ok(())
}

/// Renders references from inside one stack
struct StackResolver<'a> {
    app: &'a App,
    stack: &'a Stack,
}

impl ReferenceResolver for StackResolver<'_> {
    fn resolve(
        &self,
        reference: &ResourceRef,
        attribute: Option<&str>,
    ) -> SynthResult<serde_json::Value> {
        let logical_id = reference.logical_id();
        if reference.stack() == self.stack.id() {
            return Ok(match attribute {
                None => json!({ "Ref": logical_id.as_str() }),
                Some(attribute) => json!({ "Fn::GetAtt": [logical_id.as_str(), attribute] }),
            });
        }

        let producer = self.app.stack(reference.stack())?;
        Ok(json!({
            "Fn::ImportValue": export_name(producer.name(), logical_id, attribute)
        }))
    }
}

fn render_stack(
    app: &App,
    stack: &Stack,
    exports: Option<&BTreeSet<Export>>,
) -> SynthResult<Template> {
    let resolver = StackResolver { app, stack };
    let mut template = Template::new(stack.description().map(str::to_string));

    for (logical_id, resource) in stack.resources() {
        let properties = resource
            .properties()
            .iter()
            .map(|(name, value)| Ok((name.clone(), value.render(&resolver)?)))
            .collect::<SynthResult<serde_json::Map<_, _>>>()?;

        let depends_on = resource
            .dependencies()
            .filter(|dependency| dependency.stack() == stack.id())
            .map(|dependency| dependency.logical_id().to_string())
            .collect();

        let policy = resource.get_removal_policy().map(|p| p.as_attribute().to_string());
        if resource.resource_type().is_stateful() && policy.is_none() {
            warn!(
                stack = stack.name(),
                logical_id = %logical_id,
                resource_type = %resource.resource_type(),
                "Stateful resource without a removal policy"
            );
        }

        template.resources.insert(
            logical_id.to_string(),
            RenderedResource {
                resource_type: resource.resource_type().as_str().to_string(),
                properties,
                depends_on,
                update_replace_policy: policy.clone(),
                deletion_policy: policy,
            },
        );
    }

    for (logical_id, output) in stack.outputs() {
        template.outputs.insert(
            logical_id.to_string(),
            RenderedOutput {
                description: output.description.clone(),
                value: output.value.render(&resolver)?,
                export: None,
            },
        );
    }

    for (logical_id, attribute) in exports.into_iter().flatten() {
        let output_id = export_output_id(logical_id, attribute.as_deref());
        if template.outputs.contains_key(&output_id) || template.resources.contains_key(&output_id) {
            return Err(SynthError::DuplicateConstruct {
                stack: stack.name().to_string(),
                id: output_id,
            });
        }

        let reference = ResourceRef::new(stack.id(), logical_id.clone());
        let value = match attribute {
            None => Value::Ref(reference),
            Some(attribute) => Value::GetAtt(reference, attribute.clone()),
        };
        template.outputs.insert(
            output_id,
            RenderedOutput {
                description: None,
                value: value.render(&resolver)?,
                export: Some(ExportName {
                    name: export_name(stack.name(), logical_id, attribute.as_deref()),
                }),
            },
        );
    }

    Ok(template)
}
