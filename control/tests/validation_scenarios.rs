//! Gateway validation scenarios
//!
//! Drives both validation phases and the status projector through the
//! public API, with an in-memory listener environment.
//!
//! Run with: cargo test --test validation_scenarios

#![allow(clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use common::gateway::TLS_VERSION_1_2;
use common::{
    AddressRef, GatewaySpec, GatewayStatus, Listener, ListenerErrorReason, ListenerPort,
    TlsConfig,
};
use control::error::ControlError;
use control::status::project_status;
use control::validation::acceptance::{evaluate_listeners, ListenerEnvironment};
use control::validation::admission::{validate_gateway_spec, ViolationKind};
use control::validation::protocols::ProtocolRegistry;
use k8s_openapi::api::core::v1::TypedLocalObjectReference;
use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, Ipv4Addr};

/// Only the listed addresses can be bound; every Secret exists
struct Infrastructure {
    bindable: BTreeSet<IpAddr>,
}

impl Infrastructure {
    fn bindable(ips: &[&str]) -> Self {
        Self {
            bindable: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
        }
    }
}

#[async_trait]
impl ListenerEnvironment for Infrastructure {
    async fn can_bind(&self, ip: IpAddr) -> bool {
        self.bindable.contains(&ip)
    }

    async fn resolve_name(&self, _name: &str) -> Option<IpAddr> {
        None
    }

    async fn reference_exists(
        &self,
        _namespace: &str,
        reference: &TypedLocalObjectReference,
    ) -> Result<bool, ControlError> {
        Ok(reference.kind == "Secret")
    }

    fn default_address(&self) -> IpAddr {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }
}

fn classes() -> BTreeSet<String> {
    ["gantry".to_string()].into_iter().collect()
}

fn http_listener(ip: &str) -> Listener {
    Listener {
        address: Some(AddressRef::ip(ip)),
        ports: vec![ListenerPort {
            port: Some(80),
            protocols: vec!["HTTP".to_string()],
            ..Default::default()
        }],
    }
}

fn https_listener(minimum_version: &str) -> Listener {
    Listener {
        address: None,
        ports: vec![ListenerPort {
            port: Some(443),
            protocols: vec!["HTTPS".to_string()],
            tls: Some(TlsConfig {
                certificates: vec![TypedLocalObjectReference {
                    api_group: None,
                    kind: "Secret".to_string(),
                    name: "edge-cert".to_string(),
                }],
                minimum_version: Some(minimum_version.to_string()),
                options: BTreeMap::new(),
            }),
            extension: None,
        }],
    }
}

fn spec(listeners: Vec<Listener>) -> GatewaySpec {
    GatewaySpec {
        class: "gantry".to_string(),
        listeners,
        routes: vec![],
    }
}

async fn reconcile(spec: &GatewaySpec, env: &Infrastructure) -> GatewayStatus {
    let findings = evaluate_listeners("default", spec, env, &ProtocolRegistry::default())
        .await
        .expect("Evaluation should succeed");
    project_status(spec, findings).expect("Findings should align with spec")
}

#[test]
fn minimum_version_grammar_is_enforced_at_admission() {
    let protocols = ProtocolRegistry::default();

    let accepted = spec(vec![https_listener(TLS_VERSION_1_2)]);
    assert!(validate_gateway_spec(&accepted, &classes(), &protocols).is_ok());

    let rejected = spec(vec![https_listener("SSL3")]);
    let rejection = validate_gateway_spec(&rejected, &classes(), &protocols)
        .expect_err("SSL3 does not match the version grammar");
    assert_eq!(rejection.violations.len(), 1);
    assert!(matches!(
        rejection.violations[0].kind,
        ViolationKind::MalformedTlsVersion(_)
    ));
    assert_eq!(
        rejection.violations[0].reason(),
        ListenerErrorReason::InvalidSpec
    );
}

#[test]
fn ip_address_syntax_is_checked_at_admission() {
    let protocols = ProtocolRegistry::default();

    let valid = spec(vec![http_listener("1.2.3.4")]);
    assert!(validate_gateway_spec(&valid, &classes(), &protocols).is_ok());

    let invalid = spec(vec![http_listener("not-an-ip")]);
    let rejection = validate_gateway_spec(&invalid, &classes(), &protocols)
        .expect_err("Malformed IP must be rejected");
    assert!(rejection.contains(&ViolationKind::MalformedIpAddress(
        "not-an-ip".to_string()
    )));
}

#[tokio::test]
async fn unbindable_address_is_accepted_and_reported() {
    let gateway = spec(vec![http_listener("10.0.0.9")]);
    assert!(
        validate_gateway_spec(&gateway, &classes(), &ProtocolRegistry::default()).is_ok(),
        "Bind feasibility is not an admission concern"
    );

    let status = reconcile(&gateway, &Infrastructure::bindable(&["10.0.0.1"])).await;
    assert_eq!(status.listeners.len(), 1);
    assert_eq!(status.listeners[0].errors.len(), 1);
    assert_eq!(
        status.listeners[0].errors[0].reason,
        ListenerErrorReason::InvalidAddress
    );
    assert!(!status.listeners[0].errors[0].message.is_empty());
}

#[test]
fn empty_protocols_are_rejected_regardless_of_other_fields() {
    let protocols = ProtocolRegistry::default();

    for port in [None, Some(8080)] {
        let gateway = spec(vec![Listener {
            address: Some(AddressRef::ip("10.0.0.1")),
            ports: vec![ListenerPort {
                port,
                protocols: vec![],
                ..Default::default()
            }],
        }]);
        let rejection = validate_gateway_spec(&gateway, &classes(), &protocols)
            .expect_err("Empty protocol set must be rejected");
        assert!(rejection.contains(&ViolationKind::NoProtocols));
    }
}

#[tokio::test]
async fn only_the_failing_listener_carries_errors() {
    let gateway = spec(vec![
        http_listener("10.0.0.1"),
        http_listener("10.0.0.2"),
        http_listener("10.0.0.3"),
    ]);
    let env = Infrastructure::bindable(&["10.0.0.1", "10.0.0.3"]);

    let status = reconcile(&gateway, &env).await;

    assert_eq!(status.listeners.len(), 3);
    assert!(status.listeners[0].errors.is_empty());
    assert!(!status.listeners[1].errors.is_empty());
    assert!(status.listeners[2].errors.is_empty());
    assert_eq!(status.listeners[0].address, "10.0.0.1");
    assert_eq!(status.listeners[2].address, "10.0.0.3");
}

#[test]
fn tls_protocols_without_tls_are_rejected() {
    let mut listener = https_listener(TLS_VERSION_1_2);
    listener.ports[0].tls = None;

    let rejection =
        validate_gateway_spec(&spec(vec![listener]), &classes(), &ProtocolRegistry::default())
            .expect_err("HTTPS without tls must be rejected");
    assert!(rejection.contains(&ViolationKind::TlsRequired("HTTPS".to_string())));
}

#[tokio::test]
async fn status_survives_a_json_round_trip() {
    let gateway = spec(vec![http_listener("10.0.0.1"), http_listener("10.0.0.2")]);
    let status = reconcile(&gateway, &Infrastructure::bindable(&["10.0.0.1"])).await;

    let encoded = serde_json::to_value(&status).unwrap();
    assert_eq!(encoded["listeners"][1]["errors"][0]["reason"], "InvalidAddress");

    let decoded: GatewayStatus = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded, status);
    assert!(decoded.is_aligned_with(&gateway));
}

#[tokio::test]
async fn repeated_reconciliation_is_stable() {
    let gateway = spec(vec![
        http_listener("10.0.0.1"),
        https_listener(TLS_VERSION_1_2),
        http_listener("10.0.0.2"),
    ]);
    let env = Infrastructure::bindable(&["10.0.0.1", "0.0.0.0"]);

    let first = reconcile(&gateway, &env).await;
    let second = reconcile(&gateway, &env).await;
    assert_eq!(first, second);
    assert!(first.listeners[1].is_accepted());
}
