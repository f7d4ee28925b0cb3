//! Asynchronous (reconciliation-time) validation
//!
//! Checks that depend on infrastructure state: whether an address can be
//! bound, whether a named address resolves, whether certificate and
//! extension references point at existing objects. Failures never reject
//! the Gateway. They are reported as [`ListenerError`]s and re-evaluated on
//! every reconciliation pass, since the answer can change after acceptance.

use crate::error::ControlError;
use crate::validation::admission::{listener_violations, ViolationKind};
use crate::validation::protocols::ProtocolRegistry;
use async_trait::async_trait;
use common::gateway::certificate_ref_with_defaults;
use common::{AddressType, GatewaySpec, Listener, ListenerError, ListenerErrorReason};
use k8s_openapi::api::core::v1::TypedLocalObjectReference;
use std::net::IpAddr;
use tracing::debug;

/// Infrastructure state the asynchronous phase consults
#[async_trait]
pub trait ListenerEnvironment: Send + Sync {
    /// Whether `ip` can be bound on this gateway
    async fn can_bind(&self, ip: IpAddr) -> bool;

    /// Resolve an implementation-defined address name
    async fn resolve_name(&self, name: &str) -> Option<IpAddr>;

    /// Whether the referenced object exists in `namespace`
    ///
    /// Errors mean the answer is unknown (e.g. API server unavailable) and
    /// the pass should be retried rather than reported.
    async fn reference_exists(
        &self,
        namespace: &str,
        reference: &TypedLocalObjectReference,
    ) -> Result<bool, ControlError>;

    /// Address bound when a listener leaves it unset
    fn default_address(&self) -> IpAddr;
}

/// What the asynchronous phase found for one listener
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListenerFindings {
    pub errors: Vec<ListenerError>,
    /// Address actually bound, when one could be determined
    pub address: Option<IpAddr>,
}

impl ListenerFindings {
    fn push(&mut self, reason: ListenerErrorReason, message: impl Into<String>) {
        self.errors.push(ListenerError::new(reason, message));
    }
}

/// Evaluate every listener of a spec, in spec order
pub async fn evaluate_listeners<E>(
    namespace: &str,
    spec: &GatewaySpec,
    env: &E,
    protocols: &ProtocolRegistry,
) -> Result<Vec<ListenerFindings>, ControlError>
where
    E: ListenerEnvironment + ?Sized,
{
    let mut findings = Vec::with_capacity(spec.listeners.len());
    for (index, listener) in spec.listeners.iter().enumerate() {
        findings.push(evaluate_listener(namespace, index, listener, env, protocols).await?);
    }
    Ok(findings)
}

/// Evaluate a single listener
///
/// Persisted specs may predate the admission webhook, so structural checks
/// run again here and are reported with their most specific reason.
pub async fn evaluate_listener<E>(
    namespace: &str,
    index: usize,
    listener: &Listener,
    env: &E,
    protocols: &ProtocolRegistry,
) -> Result<ListenerFindings, ControlError>
where
    E: ListenerEnvironment + ?Sized,
{
    let mut findings = ListenerFindings::default();

    let violations = listener_violations(index, listener, protocols);
    let address_is_malformed = violations.iter().any(|v| {
        matches!(
            v.kind,
            ViolationKind::MalformedIpAddress(_)
                | ViolationKind::EmptyNamedAddress
                | ViolationKind::UnrecognizedAddressType(_)
        )
    });
    for violation in &violations {
        findings.push(violation.reason(), violation.to_string());
    }

    if !address_is_malformed {
        findings.address = resolve_address(listener, env, &mut findings).await;
    }

    for (port_index, port) in listener.ports.iter().enumerate() {
        if let Some(tls) = &port.tls {
            for certificate in &tls.certificates {
                let certificate = certificate_ref_with_defaults(certificate);
                if certificate.name.is_empty() || certificate.kind.is_empty() {
                    continue;
                }
                if !env.reference_exists(namespace, &certificate).await? {
                    findings.push(
                        ListenerErrorReason::InvalidCertificateRef,
                        format!(
                            "ports[{}]: certificate {} '{}' not found in namespace {}",
                            port_index,
                            describe_kind(&certificate),
                            certificate.name,
                            namespace
                        ),
                    );
                }
            }
        }

        if let Some(extension) = &port.extension {
            if extension.name.is_empty() || extension.kind.is_empty() {
                continue;
            }
            if !env.reference_exists(namespace, extension).await? {
                findings.push(
                    ListenerErrorReason::InvalidExtensionRef,
                    format!(
                        "ports[{}]: extension {} '{}' not found in namespace {}",
                        port_index,
                        describe_kind(extension),
                        extension.name,
                        namespace
                    ),
                );
            }
        }
    }

    debug!(
        "Listener {} evaluated: {} error(s), address {:?}",
        index,
        findings.errors.len(),
        findings.address
    );

    Ok(findings)
}

/// Determine the address to bind, recording why it cannot be used
async fn resolve_address<E>(
    listener: &Listener,
    env: &E,
    findings: &mut ListenerFindings,
) -> Option<IpAddr>
where
    E: ListenerEnvironment + ?Sized,
{
    let ip = match &listener.address {
        None => env.default_address(),
        Some(address) => match &address.type_ {
            AddressType::IpAddress => address.address.parse().ok()?,
            AddressType::NamedAddress => {
                if let Err(e) = validate_address_name(&address.address) {
                    findings.push(ListenerErrorReason::InvalidAddress, e);
                    return None;
                }
                match env.resolve_name(&address.address).await {
                    Some(ip) => ip,
                    None => {
                        findings.push(
                            ListenerErrorReason::InvalidAddress,
                            format!("named address '{}' could not be resolved", address.address),
                        );
                        return None;
                    }
                }
            }
            // Reported by the structural re-check
            AddressType::Unrecognized(_) => return None,
        },
    };

    if env.can_bind(ip).await {
        Some(ip)
    } else {
        findings.push(
            ListenerErrorReason::InvalidAddress,
            format!("address {} cannot be bound", ip),
        );
        None
    }
}

/// Validate a named address as a DNS-1123 name
///
/// Rules:
/// - Lowercase alphanumeric characters, hyphens, and dots only
/// - Labels must not start or end with a hyphen
/// - No empty labels
/// - Max length 253 characters
fn validate_address_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Named address cannot be empty".to_string());
    }

    if name.len() > 253 {
        return Err(format!("Named address '{}' exceeds 253 characters", name));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(format!("Named address '{}' has an empty label", name));
        }

        if label.len() > 63 {
            return Err(format!(
                "Named address label '{}' exceeds 63 characters",
                label
            ));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(format!(
                "Named address label '{}' cannot start or end with '-'",
                label
            ));
        }

        if let Some(c) = label
            .chars()
            .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '-')
        {
            return Err(format!(
                "Named address '{}' contains invalid character '{}' (must be lowercase alphanumeric or hyphen)",
                name, c
            ));
        }
    }

    Ok(())
}

fn describe_kind(reference: &TypedLocalObjectReference) -> String {
    match reference.api_group.as_deref() {
        Some(group) if !group.is_empty() => format!("{}/{}", group, reference.kind),
        _ => reference.kind.clone(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use common::gateway::TLS_VERSION_1_2;
    use common::{AddressRef, ListenerPort, TlsConfig};
    use std::collections::{BTreeMap, BTreeSet};
    use std::net::Ipv4Addr;

    /// In-memory environment
    #[derive(Default)]
    pub(crate) struct StaticEnvironment {
        pub bindable: BTreeSet<IpAddr>,
        pub names: BTreeMap<String, IpAddr>,
        /// (namespace, kind, name)
        pub objects: BTreeSet<(String, String, String)>,
        pub unreachable: bool,
    }

    impl StaticEnvironment {
        pub fn with_bindable(ips: &[&str]) -> Self {
            Self {
                bindable: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
                ..Default::default()
            }
        }

        pub fn with_object(mut self, namespace: &str, kind: &str, name: &str) -> Self {
            self.objects
                .insert((namespace.to_string(), kind.to_string(), name.to_string()));
            self
        }
    }

    #[async_trait]
    impl ListenerEnvironment for StaticEnvironment {
        async fn can_bind(&self, ip: IpAddr) -> bool {
            self.bindable.contains(&ip)
        }

        async fn resolve_name(&self, name: &str) -> Option<IpAddr> {
            self.names.get(name).copied()
        }

        async fn reference_exists(
            &self,
            namespace: &str,
            reference: &TypedLocalObjectReference,
        ) -> Result<bool, ControlError> {
            if self.unreachable {
                return Err(ControlError::Config("API server unreachable".to_string()));
            }
            Ok(self.objects.contains(&(
                namespace.to_string(),
                reference.kind.clone(),
                reference.name.clone(),
            )))
        }

        fn default_address(&self) -> IpAddr {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    }

    fn listener(address: Option<AddressRef>) -> Listener {
        Listener {
            address,
            ports: vec![ListenerPort {
                port: Some(80),
                protocols: vec!["HTTP".to_string()],
                ..Default::default()
            }],
        }
    }

    fn https_listener(certificate: &str) -> Listener {
        Listener {
            address: None,
            ports: vec![ListenerPort {
                port: Some(443),
                protocols: vec!["HTTPS".to_string()],
                tls: Some(TlsConfig {
                    certificates: vec![TypedLocalObjectReference {
                        api_group: None,
                        kind: String::new(),
                        name: certificate.to_string(),
                    }],
                    minimum_version: Some(TLS_VERSION_1_2.to_string()),
                    options: BTreeMap::new(),
                }),
                extension: None,
            }],
        }
    }

    async fn evaluate(listener: &Listener, env: &StaticEnvironment) -> ListenerFindings {
        evaluate_listener("default", 0, listener, env, &ProtocolRegistry::default())
            .await
            .expect("evaluation should succeed")
    }

    #[tokio::test]
    async fn test_bindable_ip_is_accepted() {
        let env = StaticEnvironment::with_bindable(&["10.0.0.1"]);
        let findings = evaluate(&listener(Some(AddressRef::ip("10.0.0.1"))), &env).await;

        assert!(findings.errors.is_empty());
        assert_eq!(findings.address, Some("10.0.0.1".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_unbindable_ip_is_invalid_address() {
        let env = StaticEnvironment::with_bindable(&["10.0.0.1"]);
        let findings = evaluate(&listener(Some(AddressRef::ip("10.0.0.99"))), &env).await;

        assert_eq!(findings.errors.len(), 1);
        assert_eq!(findings.errors[0].reason, ListenerErrorReason::InvalidAddress);
        assert_eq!(findings.address, None);
    }

    #[tokio::test]
    async fn test_missing_address_uses_default() {
        let env = StaticEnvironment::with_bindable(&["0.0.0.0"]);
        let findings = evaluate(&listener(None), &env).await;

        assert!(findings.errors.is_empty());
        assert_eq!(findings.address, Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)));
    }

    #[tokio::test]
    async fn test_named_address_resolution() {
        let mut env = StaticEnvironment::with_bindable(&["10.0.0.7"]);
        env.names
            .insert("edge-vip".to_string(), "10.0.0.7".parse().unwrap());

        let resolved = evaluate(&listener(Some(AddressRef::named("edge-vip"))), &env).await;
        assert!(resolved.errors.is_empty());
        assert_eq!(resolved.address, Some("10.0.0.7".parse().unwrap()));

        let unresolved = evaluate(&listener(Some(AddressRef::named("other-vip"))), &env).await;
        assert_eq!(unresolved.errors[0].reason, ListenerErrorReason::InvalidAddress);
        assert!(unresolved.errors[0].message.contains("could not be resolved"));

        let malformed = evaluate(&listener(Some(AddressRef::named("Edge_VIP"))), &env).await;
        assert_eq!(malformed.errors.len(), 1);
        assert_eq!(malformed.errors[0].reason, ListenerErrorReason::InvalidAddress);
    }

    #[tokio::test]
    async fn test_persisted_structural_errors_use_specific_reason() {
        let env = StaticEnvironment::with_bindable(&["0.0.0.0"]);

        // Malformed IP: address-specific reason, no bind attempt
        let bad_ip = evaluate(&listener(Some(AddressRef::ip("not-an-ip"))), &env).await;
        assert_eq!(bad_ip.errors.len(), 1);
        assert_eq!(bad_ip.errors[0].reason, ListenerErrorReason::InvalidAddress);
        assert_eq!(bad_ip.address, None);

        // Blank name: never looked up, so no second "could not be resolved"
        let blank = evaluate(&listener(Some(AddressRef::named("  "))), &env).await;
        assert_eq!(blank.errors.len(), 1);
        assert_eq!(blank.errors[0].reason, ListenerErrorReason::InvalidAddress);
        assert!(!blank.errors[0].message.contains("could not be resolved"));
        assert_eq!(blank.address, None);

        // Unknown address type: nothing more specific applies
        let unknown = evaluate(
            &listener(Some(AddressRef {
                type_: AddressType::Unrecognized("Hostname".to_string()),
                address: "edge".to_string(),
            })),
            &env,
        )
        .await;
        assert_eq!(unknown.errors.len(), 1);
        assert_eq!(unknown.errors[0].reason, ListenerErrorReason::InvalidSpec);
    }

    #[tokio::test]
    async fn test_certificate_references() {
        let env = StaticEnvironment::with_bindable(&["0.0.0.0"])
            .with_object("default", "Secret", "edge-cert");

        let found = evaluate(&https_listener("edge-cert"), &env).await;
        assert!(found.errors.is_empty());

        let missing = evaluate(&https_listener("deleted-cert"), &env).await;
        assert_eq!(missing.errors.len(), 1);
        assert_eq!(
            missing.errors[0].reason,
            ListenerErrorReason::InvalidCertificateRef
        );
        assert!(missing.errors[0].message.contains("Secret 'deleted-cert'"));
        // The address is still bound; only the certificate is missing
        assert!(missing.address.is_some());
    }

    #[tokio::test]
    async fn test_extension_references() {
        let env = StaticEnvironment::with_bindable(&["0.0.0.0"])
            .with_object("default", "TcpTuning", "low-latency");
        let mut with_extension = listener(None);
        with_extension.ports[0].extension = Some(TypedLocalObjectReference {
            api_group: Some("acme.io".to_string()),
            kind: "TcpTuning".to_string(),
            name: "low-latency".to_string(),
        });
        assert!(evaluate(&with_extension, &env).await.errors.is_empty());

        with_extension.ports[0].extension.as_mut().unwrap().name = "gone".to_string();
        let findings = evaluate(&with_extension, &env).await;
        assert_eq!(findings.errors[0].reason, ListenerErrorReason::InvalidExtensionRef);
        assert!(findings.errors[0].message.contains("acme.io/TcpTuning 'gone'"));
    }

    #[tokio::test]
    async fn test_unknown_reference_state_is_an_error_not_a_finding() {
        let mut env = StaticEnvironment::with_bindable(&["0.0.0.0"]);
        env.unreachable = true;

        let result = evaluate_listener(
            "default",
            0,
            &https_listener("edge-cert"),
            &env,
            &ProtocolRegistry::default(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_evaluation_is_idempotent() {
        let env = StaticEnvironment::with_bindable(&["10.0.0.1"])
            .with_object("default", "Secret", "edge-cert");
        let spec = GatewaySpec {
            class: "gantry".to_string(),
            listeners: vec![
                listener(Some(AddressRef::ip("10.0.0.1"))),
                listener(Some(AddressRef::ip("10.0.0.2"))),
                https_listener("missing"),
            ],
            routes: vec![],
        };

        let protocols = ProtocolRegistry::default();
        let first = evaluate_listeners("default", &spec, &env, &protocols)
            .await
            .unwrap();
        let second = evaluate_listeners("default", &spec, &env, &protocols)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_validate_address_name() {
        for valid in ["edge-vip", "my-ip-address", "lb.internal", "a1"] {
            assert!(validate_address_name(valid).is_ok(), "Should accept: {}", valid);
        }

        let too_long = "a".repeat(254);
        let long_label = "a".repeat(64);
        for invalid in [
            "",
            "Edge",
            "edge_vip",
            "-edge",
            "edge-",
            "edge..vip",
            too_long.as_str(),
            long_label.as_str(),
        ] {
            assert!(
                validate_address_name(invalid).is_err(),
                "Should reject: {}",
                invalid
            );
        }
    }
}
