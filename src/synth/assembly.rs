// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud Assembly Output
//!
//! The directory layout the standard deployment CLI reads:
//!
//! ```text
//! cdk.out/
//! ├── cdk.out                              {"version": "36.0.0"}
//! ├── manifest.json                        artifacts, environments, dependencies
//! └── <StackName>.template.json            one per stack
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::Environment;
use crate::errors::SynthResult;
use crate::template::Template;

/// Cloud assembly schema version
pub const CLOUD_ASSEMBLY_VERSION: &str = "36.0.0";

pub const MANIFEST_FILE: &str = "manifest.json";
pub const VERSION_FILE: &str = "cdk.out";

const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// One synthesized stack
#[derive(Debug, Clone, PartialEq)]
pub struct StackArtifact {
    pub name: String,
    pub environment: Environment,
    pub template: Template,
    /// Names of the stacks deployed before this one
    pub dependencies: Vec<String>,
}

impl StackArtifact {
    pub fn template_file(&self) -> String {
        format!("{}.template.json", self.name)
    }
}

/// All stacks of an app, in deployment order
#[derive(Debug, Clone, PartialEq)]
pub struct CloudAssembly {
    artifacts: Vec<StackArtifact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub artifacts: BTreeMap<String, ManifestArtifact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestArtifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: ArtifactProperties,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub dependencies: Vec<String>,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProperties {
    pub template_file: String,
    pub stack_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionMarker {
    version: String,
}

impl CloudAssembly {
    pub fn new(artifacts: Vec<StackArtifact>) -> Self {
        Self { artifacts }
    }

    /// Artifacts in deployment order
    pub fn artifacts(&self) -> &[StackArtifact] {
        &self.artifacts
    }

    pub fn artifact(&self, name: &str) -> Option<&StackArtifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.artifact(name).map(|a| &a.template)
    }

    pub fn deploy_order(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn manifest(&self) -> Manifest {
        let artifacts = self
            .artifacts
            .iter()
            .map(|artifact| {
                (
                    artifact.name.clone(),
                    ManifestArtifact {
                        artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                        environment: artifact.environment.to_uri(),
                        properties: ArtifactProperties {
                            template_file: artifact.template_file(),
                            stack_name: artifact.name.clone(),
                        },
                        dependencies: artifact.dependencies.clone(),
                        display_name: artifact.name.clone(),
                    },
                )
            })
            .collect();

        Manifest {
            version: CLOUD_ASSEMBLY_VERSION.to_string(),
            artifacts,
        }
    }

    /// Write templates, manifest and version marker, creating `outdir`
    pub fn write_to(&self, outdir: &Path) -> SynthResult<()> {
        fs::create_dir_all(outdir)?;

        for artifact in &self.artifacts {
            let file = outdir.join(artifact.template_file());
            fs::write(&file, serde_json::to_string_pretty(&artifact.template)?)?;
            debug!(
                stack = %artifact.name,
                file = %file.display(),
                resources = artifact.template.resources.len(),
                "Wrote template"
            );
        }

        fs::write(
            outdir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&self.manifest())?,
        )?;
        fs::write(
            outdir.join(VERSION_FILE),
            serde_json::to_string(&VersionMarker {
                version: CLOUD_ASSEMBLY_VERSION.to_string(),
            })?,
        )?;

        info!(
            outdir = %outdir.display(),
            stacks = self.artifacts.len(),
            "Wrote cloud assembly"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn artifact(name: &str, dependencies: &[&str]) -> StackArtifact {
        StackArtifact {
            name: name.to_string(),
            environment: Environment::agnostic(),
            template: Template::new(None),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_manifest_entries() {
        let assembly = CloudAssembly::new(vec![
            artifact("Foundation", &[]),
            artifact("Database", &["Foundation"]),
        ]);
        let manifest = assembly.manifest();

        assert_eq!(manifest.version, "36.0.0");
        let database = &manifest.artifacts["Database"];
        assert_eq!(database.artifact_type, "aws:cloudformation:stack");
        assert_eq!(database.environment, "aws://unknown-account/unknown-region");
        assert_eq!(database.properties.template_file, "Database.template.json");
        assert_eq!(database.dependencies, vec!["Foundation".to_string()]);
        assert_eq!(assembly.deploy_order(), vec!["Foundation", "Database"]);
    }

    #[test]
    fn test_manifest_json_shape() {
        let assembly = CloudAssembly::new(vec![artifact("Foundation", &[])]);
        let json = serde_json::to_value(assembly.manifest()).unwrap();
        let entry = &json["artifacts"]["Foundation"];
        assert_eq!(entry["type"], "aws:cloudformation:stack");
        assert_eq!(entry["properties"]["templateFile"], "Foundation.template.json");
        assert_eq!(entry["displayName"], "Foundation");
        assert!(entry.get("dependencies").is_none());
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let outdir = dir.path().join("nested").join("cdk.out");
        let assembly = CloudAssembly::new(vec![artifact("Foundation", &[])]);

        assembly.write_to(&outdir).unwrap();

        assert!(outdir.join("Foundation.template.json").is_file());
        assert!(outdir.join(MANIFEST_FILE).is_file());
        let marker = fs::read_to_string(outdir.join(VERSION_FILE)).unwrap();
        assert_eq!(marker, r#"{"version":"36.0.0"}"#);
    }
}
