//! Infrastructure layer: concrete implementations of application port traits.
//!
//! Everything that spawns a process or touches the filesystem lives here:
//! the `aws` and `hcloud` CLI adapters, OpenSSH, embedded assets and the
//! YAML config store.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod assets;
pub mod aws_cli;
pub mod command_runner;
pub mod config;
pub mod hcloud_cli;
pub mod ssh;

#[cfg(test)]
pub(crate) mod test_support;
