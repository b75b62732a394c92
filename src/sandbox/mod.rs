//! Docker execution sandbox for tool containers.
//!
//! Every tool invocation runs in its own ephemeral container:
//! - **Pull if absent**: images are inspected locally and pulled on demand
//! - **Argument vector only**: commands are never passed through a shell
//! - **Resource limits**: memory, process count, capabilities and timeouts
//! - **Guaranteed cleanup**: a [`ContainerLease`] removes the container on
//!   every exit path
//!
//! ```text
//!   Orchestrator ──▶ ContainerRuntime ──▶ Docker socket
//!                      │
//!                      ├─ image_exists / pull_image
//!                      ├─ create_container  ──▶ ContainerLease
//!                      ├─ run_to_completion ──▶ OutputBuffer
//!                      └─ remove_container  ◀── lease release / drop
//! ```

pub mod config;
pub mod container;
pub mod docker;
pub mod error;
pub mod lease;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{MAX_OUTPUT_CHARS, ResourceLimits};
pub use container::{ContainerHandle, ContainerRuntime, ContainerSpec, ImageRef, OutputBuffer};
pub use docker::{DockerRuntime, connect_docker};
pub use error::{Result, SandboxError};
pub use lease::ContainerLease;
