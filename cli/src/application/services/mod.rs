//! Application services: use-case orchestration.
//!
//! Each service module implements one part of the provisioning lifecycle by
//! composing domain logic with port trait calls. Services import only from
//! `crate::domain` and `crate::application`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod asset_deployer;
pub mod aws;
pub mod backend;
pub mod hetzner;
pub mod init_script;
pub mod readiness;
pub mod remote;
pub mod retry;
pub mod stack;
pub mod teardown;

#[cfg(test)]
pub(crate) mod test_support;
