// Copyright (c) 2025 - Cowboy AI, Inc.
//! Popular Vote Deployment Synthesizer
//!
//! Declares the foundation, database and application stacks and writes them
//! as a cloud assembly for the standard deployment CLI.
//!
//! Run with: cargo run --bin deploy
//!
//! The repositories start empty, so a first deployment goes in two phases:
//!
//! 1. `cdk deploy --app cdk.out DeployFoundationStack`
//! 2. Push both images to the `appRepoUri` / `dbMigrationRepoUri` outputs
//! 3. `cdk deploy --app cdk.out --all`
//!
//! Environment:
//! - `CDK_OUTDIR`: assembly directory (default `cdk.out`)
//! - `DEPLOY_PIN_ENVIRONMENT`: pin stacks to `CDK_DEFAULT_ACCOUNT` / `CDK_DEFAULT_REGION`
//! - `DEPLOY_IMAGE_TAG`: image tag to deploy (default `latest`)
//! - `DEPLOY_DESIRED_COUNT`: running API tasks (default `1`, `0` to deploy before images exist)

use anyhow::{Context, Result};
use popular_vote_infrastructure::stacks::FOUNDATION_STACK_NAME;
use popular_vote_infrastructure::{build_app, synthesize, DeployConfig};
use tracing::{info, warn};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Starting Popular Vote deployment synthesis");

    // Load configuration
    let config = DeployConfig::from_env().context("Failed to load deployment configuration")?;
    info!("📋 Configuration loaded:");
    info!("  - Output directory: {}", config.outdir.display());
    info!("  - Environment: {}", config.environment);
    info!("  - Image tag: {}", config.settings.image_tag);
    info!("  - API tasks: {}", config.settings.desired_count);
    if config.settings.desired_count == 0 {
        warn!("⚠️  API service is declared with no running tasks");
    }

    // Declare stacks
    info!("🏗️  Declaring stacks");
    let (app, deployment) = build_app(&config).context("Failed to declare stacks")?;
    info!(
        "✅ Declared {} stacks (migration task family: {})",
        app.stacks().len(),
        deployment.database.migration_task().family()
    );

    // Synthesize
    info!("🔄 Synthesizing templates");
    let assembly = synthesize(&app).context("Failed to synthesize templates")?;
    for artifact in assembly.artifacts() {
        info!(
            "  - {}: {} resources, {} outputs",
            artifact.name,
            artifact.template.resources.len(),
            artifact.template.outputs.len()
        );
    }

    // Write the cloud assembly
    assembly
        .write_to(&config.outdir)
        .with_context(|| format!("Failed to write cloud assembly to {}", config.outdir.display()))?;
    info!(
        "✅ Cloud assembly written to {} (deploy order: {})",
        config.outdir.display(),
        assembly.deploy_order().join(" → ")
    );

    let outdir = config.outdir.display();
    let tag = &config.settings.image_tag;
    info!("📦 Next steps:");
    info!("  1. cdk deploy --app {} {}", outdir, FOUNDATION_STACK_NAME);
    info!(
        "  2. Push {}:{} and {}:{} to the repository URIs in the stack outputs",
        config.settings.app_repository, tag, config.settings.migration_repository, tag
    );
    info!("  3. cdk deploy --app {} --all", outdir);

    Ok(())
}
