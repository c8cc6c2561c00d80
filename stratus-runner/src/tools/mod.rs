//! Tool wrappers
//!
//! Thin, typed front-ends over the external CLIs. Each wrapper borrows the
//! execution context and turns a domain operation into one or more
//! `CommandSpec`s; none of them hold state between calls.

mod aws;
mod docker;
mod git;
mod terraform;

pub use aws::Aws;
pub use docker::Docker;
pub use git::Git;
pub use terraform::Terraform;
