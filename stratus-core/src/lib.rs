//! Stratus Core
//!
//! Core types for the Stratus deployment orchestrator.
//!
//! This crate contains the domain types shared by the runner and the CLI:
//! pipeline stages and their outcomes, image tags, infrastructure outputs,
//! ECS service status and teardown states. Structure only; execution logic
//! lives in the runner.

pub mod domain;
