// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Configuration
//!
//! Read from environment variables only; the binary takes no flags.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `CDK_OUTDIR` | Cloud assembly directory (default `cdk.out`) |
//! | `DEPLOY_PIN_ENVIRONMENT` | `true`/`1` pins every stack to one account and region |
//! | `CDK_DEFAULT_ACCOUNT` / `CDK_DEFAULT_REGION` | The pinned account and region |
//! | `DEPLOY_IMAGE_TAG` | Image tag deployed from the repositories (default `latest`) |
//! | `DEPLOY_DESIRED_COUNT` | Running API tasks (default `1`); `0` until the images are pushed |

use std::path::PathBuf;

use crate::domain::Environment;
use crate::errors::{SynthError, SynthResult};

pub const OUTDIR_VAR: &str = "CDK_OUTDIR";
pub const PIN_ENVIRONMENT_VAR: &str = "DEPLOY_PIN_ENVIRONMENT";
pub const ACCOUNT_VAR: &str = "CDK_DEFAULT_ACCOUNT";
pub const REGION_VAR: &str = "CDK_DEFAULT_REGION";
pub const IMAGE_TAG_VAR: &str = "DEPLOY_IMAGE_TAG";
pub const DESIRED_COUNT_VAR: &str = "DEPLOY_DESIRED_COUNT";

pub const DEFAULT_OUTDIR: &str = "cdk.out";

/// Names, ports and sizes of the deployed system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    /// Prefix of construct ids and physical names
    pub project_name: String,
    pub app_repository: String,
    pub migration_repository: String,
    pub database_name: String,
    pub database_username: String,
    pub database_port: u16,
    pub container_port: u16,
    pub listener_port: u16,
    pub health_check_path: String,
    pub healthy_http_codes: String,
    pub image_tag: String,
    pub task_cpu: u32,
    pub task_memory_mib: u32,
    pub log_retention_days: u32,
    pub log_buffer_mib: u32,
    pub desired_count: u32,
    /// Name of the long-running service
    pub service_name: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            project_name: "popularVote".to_string(),
            app_repository: "popular-vote-app".to_string(),
            migration_repository: "popular-vote-db-migration".to_string(),
            database_name: "popularVote".to_string(),
            database_username: "admin".to_string(),
            database_port: 3306,
            container_port: 8080,
            listener_port: 80,
            health_check_path: "/health".to_string(),
            healthy_http_codes: "204".to_string(),
            image_tag: "latest".to_string(),
            task_cpu: 256,
            task_memory_mib: 512,
            log_retention_days: 1,
            log_buffer_mib: 25,
            desired_count: 1,
            service_name: "popularVoteApi".to_string(),
        }
    }
}

impl ProjectSettings {
    /// Construct id / physical name with the project prefix, e.g. `popularVoteVpc`
    pub fn named(&self, suffix: &str) -> String {
        format!("{}{}", self.project_name, suffix)
    }
}

/// Everything the binary needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub outdir: PathBuf,
    pub environment: Environment,
    pub settings: ProjectSettings,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            outdir: PathBuf::from(DEFAULT_OUTDIR),
            environment: Environment::agnostic(),
            settings: ProjectSettings::default(),
        }
    }
}

impl DeployConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> SynthResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SynthResult<Self> {
        let outdir = lookup(OUTDIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTDIR));

        let pinned = lookup(PIN_ENVIRONMENT_VAR)
            .map(|value| parse_flag(PIN_ENVIRONMENT_VAR, &value))
            .transpose()?
            .unwrap_or(false);

        let environment = if pinned {
            let account = lookup(ACCOUNT_VAR).ok_or_else(|| {
                SynthError::Configuration(format!("{} is required when {} is set", ACCOUNT_VAR, PIN_ENVIRONMENT_VAR))
            })?;
            let region = lookup(REGION_VAR).ok_or_else(|| {
                SynthError::Configuration(format!("{} is required when {} is set", REGION_VAR, PIN_ENVIRONMENT_VAR))
            })?;
            Environment::pinned(account, region)?
        } else {
            Environment::agnostic()
        };

        let mut settings = ProjectSettings::default();
        if let Some(tag) = lookup(IMAGE_TAG_VAR).filter(|tag| !tag.trim().is_empty()) {
            settings.image_tag = tag;
        }
        if let Some(count) = lookup(DESIRED_COUNT_VAR).filter(|count| !count.trim().is_empty()) {
            settings.desired_count = count.trim().parse().map_err(|_| {
                SynthError::Configuration(format!(
                    "{} must be a task count, got '{}'",
                    DESIRED_COUNT_VAR, count
                ))
            })?;
        }

        Ok(Self {
            outdir,
            environment,
            settings,
        })
    }
}

fn parse_flag(name: &str, value: &str) -> SynthResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "" | "0" | "false" | "no" => Ok(false),
        other => Err(SynthError::Configuration(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}
