// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration tests for writing the cloud assembly to disk

mod fixtures;

use std::fs;

use pretty_assertions::assert_eq;

use fixtures::*;
use popular_vote_infrastructure::config::OUTDIR_VAR;
use popular_vote_infrastructure::synth::{Manifest, CLOUD_ASSEMBLY_VERSION, MANIFEST_FILE};
use popular_vote_infrastructure::template::Template;
use popular_vote_infrastructure::{build_app, synthesize, DeployConfig};

/// Test: Everything the deployment CLI reads lands in the output directory
#[test]
fn test_written_assembly_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let (_, assembly) = synthesized(&agnostic_config());

    assembly.write_to(dir.path()).unwrap();

    let manifest: Manifest =
        serde_json::from_str(&fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap())
            .unwrap();
    assert_eq!(manifest, assembly.manifest());
    assert_eq!(manifest.version, CLOUD_ASSEMBLY_VERSION);

    for artifact in assembly.artifacts() {
        let file = dir.path().join(&manifest.artifacts[&artifact.name].properties.template_file);
        let written: Template = serde_json::from_str(&fs::read_to_string(file).unwrap()).unwrap();
        assert_eq!(written, artifact.template);
    }
}

/// Test: Templates use CloudFormation's top-level keys
#[test]
fn test_template_json_layout() {
    let dir = tempfile::tempdir().unwrap();
    let (_, assembly) = synthesized(&agnostic_config());
    assembly.write_to(dir.path()).unwrap();

    let raw: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join(format!("{}.template.json", FOUNDATION))).unwrap(),
    )
    .unwrap();

    assert_eq!(raw["AWSTemplateFormatVersion"], "2010-09-09");
    assert!(raw["Resources"].as_object().is_some_and(|r| !r.is_empty()));
    assert!(raw["Outputs"]["appRepoUri"]["Value"].is_object());
    assert!(raw["Description"].is_string());
}

/// Test: Synthesis is deterministic byte for byte
#[test]
fn test_synthesis_is_deterministic() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    synthesized(&agnostic_config()).1.write_to(first.path()).unwrap();
    synthesized(&agnostic_config()).1.write_to(second.path()).unwrap();

    for stack in [FOUNDATION, DATABASE, APPLICATION] {
        let file = format!("{}.template.json", stack);
        assert_eq!(
            fs::read_to_string(first.path().join(&file)).unwrap(),
            fs::read_to_string(second.path().join(&file)).unwrap()
        );
    }
}

/// Test: The configured output directory is created and used
#[test]
fn test_configured_outdir() {
    let dir = tempfile::tempdir().unwrap();
    let outdir = dir.path().join("assembly");
    let outdir_string = outdir.to_string_lossy().to_string();

    let config = DeployConfig::from_lookup(|name| {
        (name == OUTDIR_VAR).then(|| outdir_string.clone())
    })
    .unwrap();
    assert_eq!(config.outdir, outdir);

    let (app, _) = build_app(&config).unwrap();
    synthesize(&app).unwrap().write_to(&config.outdir).unwrap();

    for stack in [FOUNDATION, DATABASE, APPLICATION] {
        assert!(outdir.join(format!("{}.template.json", stack)).is_file());
    }
    assert!(outdir.join("cdk.out").is_file());
}
