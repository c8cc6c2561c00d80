//! Domain types
//!
//! Core business entities for deployment runs.

pub mod image;
pub mod infra;
pub mod run;
pub mod service;
pub mod stage;
pub mod teardown;
