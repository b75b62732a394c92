//! Sandboxed tool execution gateway.
//!
//! Two HTTP processes share this crate:
//!
//! ```text
//!   client ──▶ gateway (:3000) ──relay──▶ orchestrator (:4000) ──▶ Docker
//!                 │
//!                 ├─ /api/service/{action} ──▶ <cli> <action> <service>
//!                 ├─ /api/panic            ──▶ alert + panic script
//!                 └─ /api/notify           ──▶ Telegram / signed webhook
//! ```
//!
//! The orchestrator owns tool validation and the pull, run and cleanup
//! sequence of every container. The gateway adds no validation to tool
//! requests; its own privileged operations are guarded by allow-lists.

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod orchestrator;
pub mod safety;
pub mod sandbox;
pub mod server;
pub mod tools;

pub use error::{Error, Result};
