//! Hetzner provisioning scenarios: ssh key, firewall and server lifecycle,
//! SSH readiness, rollback and teardown.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use tunnelgate::application::cancel::Cancellation;
use tunnelgate::application::ports::Provisioner;
use tunnelgate::application::services::backend::Backend;
use tunnelgate::application::services::hetzner::{HetznerProvisioner, HetznerSettings};
use tunnelgate::application::services::retry::RetryPolicy;
use tunnelgate::commands::deploy;
use tunnelgate::domain::error::RemoteError;
use tunnelgate::domain::request::{DeprovisionRequest, ProvisionRequest};
use tunnelgate::infra::assets::EmbeddedAssets;
use tunnelgate_common::BackendKind;

use crate::mocks::{
    CLIENT_KEY, FakeAws, FakeHetzner, FakeSsh, HETZNER_SERVER_IP, SERVER_KEY, sentinel_in,
};

type Gateway = Backend<FakeAws, FakeHetzner, FakeSsh, EmbeddedAssets>;

fn request() -> ProvisionRequest {
    ProvisionRequest {
        client_public_key: CLIENT_KEY.to_string(),
        client_addr: "172.30.0.2".parse().unwrap(),
        server_addr: "172.30.0.1".parse().unwrap(),
        port: 51820,
        backend: BackendKind::Hetzner,
        region: "fsn1".to_string(),
    }
}

fn gateway(cloud: &FakeHetzner, ssh: &FakeSsh) -> Gateway {
    Backend::Hetzner(
        HetznerProvisioner::new(
            cloud.clone(),
            ssh.clone(),
            EmbeddedAssets,
            HetznerSettings {
                image: "rocky-9".to_string(),
                server_type: "cx22".to_string(),
            },
        )
        .with_retry(RetryPolicy {
            attempts: 2,
            delay: Duration::from_millis(1),
        }),
    )
}

#[tokio::test(start_paused = true)]
async fn test_wg1_end_to_end() {
    let cloud = FakeHetzner::default().booting_for(3);
    let ssh = FakeSsh::refusing(2);
    let gw = gateway(&cloud, &ssh);
    assert_eq!(gw.kind(), BackendKind::Hetzner);

    let result = deploy::execute(&gw, "wg1", &request(), &Cancellation::never())
        .await
        .expect("provision");

    assert_eq!(result.server_ip.to_string(), HETZNER_SERVER_IP);
    assert_eq!(result.server_addr.to_string(), "172.30.0.1");
    assert_eq!(result.server_public_key, SERVER_KEY);
    assert_eq!(
        cloud.log(),
        vec!["create ssh-key wg1", "create firewall wg1", "create server wg1"]
    );

    let state = cloud.state.borrow();
    assert_eq!(state.ssh_keys["wg1"], "ssh-ed25519 AAAATEST tunnelgate");
    let rules = &state.firewalls["wg1"];
    assert!(rules.iter().any(|r| r.protocol == "udp" && r.port == "51820"));
    assert!(rules.iter().any(|r| r.protocol == "tcp" && r.port == "22"));
}

#[tokio::test(start_paused = true)]
async fn test_readiness_retries_then_init_script_runs_on_server_ip() {
    let cloud = FakeHetzner::default();
    let ssh = FakeSsh::refusing(3);
    gateway(&cloud, &ssh)
        .provision("wg1", &request(), &Cancellation::never())
        .await
        .expect("provision");

    let scripts = ssh.scripts.borrow();
    let checks = scripts.iter().filter(|(_, s)| s == "echo 1").count();
    assert_eq!(checks, 4);

    let (host, init) = scripts.last().expect("init script");
    assert_eq!(host.to_string(), HETZNER_SERVER_IP);
    assert!(sentinel_in(init).is_some());
    assert!(init.contains("BACKEND='hetzner'"));
    assert!(init.contains("REGION='fsn1'"));
}

#[tokio::test(start_paused = true)]
async fn test_redeploy_replaces_key_rules_and_server() {
    let cloud = FakeHetzner::default();
    let ssh = FakeSsh::default();
    let gw = gateway(&cloud, &ssh);
    gw.provision("wg1", &request(), &Cancellation::never())
        .await
        .expect("first");

    let mut second = request();
    second.port = 51821;
    gw.provision("wg1", &second, &Cancellation::never())
        .await
        .expect("second");

    assert_eq!(
        cloud.log()[3..],
        [
            "delete ssh-key wg1",
            "create ssh-key wg1",
            "replace-rules firewall wg1",
            "delete server wg1",
            "create server wg1",
        ]
    );
    let state = cloud.state.borrow();
    assert_eq!(state.servers.len(), 1);
    assert!(state.firewalls["wg1"].iter().any(|r| r.port == "51821"));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_server_is_deleted() {
    let cloud = FakeHetzner::default();
    let ssh = FakeSsh::refusing(u32::MAX);
    let err = gateway(&cloud, &ssh)
        .provision("wg1", &request(), &Cancellation::never())
        .await
        .unwrap_err();

    assert!(
        matches!(err.downcast_ref::<RemoteError>(), Some(RemoteError::NotReady { .. })),
        "got: {err:#}"
    );
    assert_eq!(cloud.log().last().map(String::as_str), Some("delete server wg1"));
    assert!(cloud.state.borrow().servers.is_empty());
    // Key and firewall are left for `delete`.
    assert!(cloud.state.borrow().firewalls.contains_key("wg1"));
}

#[tokio::test(start_paused = true)]
async fn test_deprovision_removes_server_firewall_and_key() {
    let cloud = FakeHetzner::default();
    let ssh = FakeSsh::default();
    let gw = gateway(&cloud, &ssh);
    gw.provision("wg1", &request(), &Cancellation::never())
        .await
        .expect("provision");

    let delete = DeprovisionRequest {
        backend: BackendKind::Hetzner,
        region: "fsn1".to_string(),
    };
    gw.deprovision("wg1", &delete, &Cancellation::never())
        .await
        .expect("deprovision");

    let state = cloud.state.borrow();
    assert!(state.servers.is_empty());
    assert!(state.firewalls.is_empty());
    assert!(state.ssh_keys.is_empty());
    let log = &state.log;
    let server = log.iter().position(|l| l == "delete server wg1").expect("server");
    let firewall = log.iter().position(|l| l == "delete firewall wg1").expect("firewall");
    assert!(server < firewall);
}

#[tokio::test(start_paused = true)]
async fn test_deprovision_of_nothing_succeeds() {
    let cloud = FakeHetzner::default();
    let delete = DeprovisionRequest {
        backend: BackendKind::Hetzner,
        region: "fsn1".to_string(),
    };
    gateway(&cloud, &FakeSsh::default())
        .deprovision("wg1", &delete, &Cancellation::never())
        .await
        .expect("nothing to delete");
    assert!(cloud.log().is_empty());
}

#[tokio::test]
async fn test_missing_region_is_rejected_before_any_call() {
    let cloud = FakeHetzner::default();
    let mut bad = request();
    bad.region = String::new();
    assert!(
        gateway(&cloud, &FakeSsh::default())
            .provision("wg1", &bad, &Cancellation::never())
            .await
            .is_err()
    );
    assert!(cloud.log().is_empty());
}

#[tokio::test]
async fn test_locations_come_from_the_api() {
    let cloud = FakeHetzner::default();
    let locations = gateway(&cloud, &FakeSsh::default())
        .locations(&Cancellation::never())
        .await
        .expect("locations");
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].key, "fsn1");
}
