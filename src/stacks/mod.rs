// Copyright (c) 2025 - Cowboy AI, Inc.
//! The Popular Vote Deployment
//!
//! Three stacks composed in a fixed order, each consuming the handles of the
//! ones before it:
//!
//! ```text
//! DeployFoundationStack ──▶ DeployDatabaseStack ──▶ DeployApplicationStack
//!   VPC, repositories         Aurora, ECS cluster,     API service, load
//!                             migration task           balancer
//! ```
//!
//! Handles are shared through `Arc`, so every stack sees the same VPC and the
//! same database secret rather than copies.

mod application;
mod database;
mod foundation;

use tracing::info;

use crate::app::App;
use crate::config::DeployConfig;
use crate::errors::SynthResult;

pub use application::{ApplicationStack, APPLICATION_STACK_NAME, APP_CONTAINER};
pub use database::{DatabaseStack, DATABASE_STACK_NAME, MIGRATION_CONTAINER};
pub use foundation::{FoundationStack, FOUNDATION_STACK_NAME};

/// All three stacks of one deployment
#[derive(Debug)]
pub struct Deployment {
    pub foundation: FoundationStack,
    pub database: DatabaseStack,
    pub application: ApplicationStack,
}

/// Declare the whole deployment into a fresh app
pub fn build_app(config: &DeployConfig) -> SynthResult<(App, Deployment)> {
    let mut app = App::new();
    let settings = &config.settings;
    let environment = &config.environment;

    info!(
        environment = %environment,
        image_tag = %settings.image_tag,
        "Declaring stacks"
    );

    let foundation = FoundationStack::build(&mut app, environment.clone(), settings)?;
    let database = DatabaseStack::build(&mut app, environment.clone(), settings, &foundation)?;
    let application = ApplicationStack::build(
        &mut app,
        environment.clone(),
        settings,
        &foundation,
        &database,
    )?;

    Ok((
        app,
        Deployment {
            foundation,
            database,
            application,
        },
    ))
}
