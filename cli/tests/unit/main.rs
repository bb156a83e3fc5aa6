//! Unit tests for tunnelgate
//!
//! Whole provisioning runs against in-memory fakes of the cloud ports and the
//! real embedded assets. No process is spawned and no network is touched.

mod architecture;
mod hetzner_provisioner;
mod mocks;
