//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod agent;
pub mod config;
pub mod error;
pub mod hetzner;
pub mod init_script;
pub mod manifest;
pub mod regions;
pub mod request;
pub mod stack;
pub mod template;

pub use config::AppConfig;
pub use error::{AssetError, Cancelled, ConfigError, RemoteError, StackError, TeardownError, is_cancelled};
pub use request::{DeprovisionRequest, ProvisionRequest};
