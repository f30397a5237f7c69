// Copyright (c) 2025 - Cowboy AI, Inc.
//! Foundation stack: network and image repositories

use std::sync::Arc;

use tracing::info;

use crate::app::{App, ConstructPath, StackId};
use crate::config::ProjectSettings;
use crate::constructs::{Repository, RepositoryProps, Vpc, VpcProps};
use crate::domain::Environment;
use crate::errors::SynthResult;
use crate::template::Output;

pub const FOUNDATION_STACK_NAME: &str = "DeployFoundationStack";

/// Handles produced by the foundation stack
#[derive(Debug, Clone)]
pub struct FoundationStack {
    id: StackId,
    vpc: Arc<Vpc>,
    app_repository: Arc<Repository>,
    migration_repository: Arc<Repository>,
}

impl FoundationStack {
    pub fn build(
        app: &mut App,
        environment: Environment,
        settings: &ProjectSettings,
    ) -> SynthResult<Self> {
        let id = app.add_stack(FOUNDATION_STACK_NAME, environment)?;
        let stack = app.stack_mut(id)?;
        stack.set_description("Network and container image repositories");

        let vpc_name = settings.named("Vpc");
        let vpc = Arc::new(Vpc::new(
            stack,
            ConstructPath::root(vpc_name.as_str())?,
            VpcProps {
                name: Some(vpc_name.clone()),
                ..VpcProps::default()
            },
        )?);

        let app_repository = Arc::new(Repository::new(
            stack,
            ConstructPath::root(settings.app_repository.as_str())?,
            RepositoryProps::disposable(settings.app_repository.as_str()),
        )?);
        let migration_repository = Arc::new(Repository::new(
            stack,
            ConstructPath::root(settings.migration_repository.as_str())?,
            RepositoryProps::disposable(settings.migration_repository.as_str()),
        )?);

        stack.add_output(
            &ConstructPath::root("appRepoName")?,
            Output::new(app_repository.repository_name()),
        )?;
        stack.add_output(
            &ConstructPath::root("appRepoUri")?,
            Output::new(app_repository.repository_uri()),
        )?;
        stack.add_output(
            &ConstructPath::root("dbMigrationRepoName")?,
            Output::new(migration_repository.repository_name()),
        )?;
        stack.add_output(
            &ConstructPath::root("dbMigrationRepoUri")?,
            Output::new(migration_repository.repository_uri()),
        )?;

        info!(
            stack = FOUNDATION_STACK_NAME,
            vpc = %vpc_name,
            availability_zones = vpc.availability_zones(),
            "Declared foundation stack"
        );

        Ok(Self {
            id,
            vpc,
            app_repository,
            migration_repository,
        })
    }

    pub fn id(&self) -> StackId {
        self.id
    }

    /// The network every downstream stack deploys into
    pub fn vpc(&self) -> &Arc<Vpc> {
        &self.vpc
    }

    pub fn app_repository(&self) -> &Arc<Repository> {
        &self.app_repository
    }

    pub fn migration_repository(&self) -> &Arc<Repository> {
        &self.migration_repository
    }
}
