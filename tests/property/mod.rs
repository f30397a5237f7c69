// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Properties of subnet planning and logical id derivation that must hold
//! for every input, not just the shapes the stacks happen to use.

mod logical_ids;
mod subnet_planning;
