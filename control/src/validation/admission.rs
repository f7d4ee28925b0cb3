//! Synchronous (admission-time) validation
//!
//! Everything decidable from the Gateway spec alone: class presence, address syntax,
//! port range, protocol/TLS consistency, TLS version grammar and reference
//! completeness. A failure rejects the write, so nothing here ever reaches
//! status. The only outside input is a local lookup of known GatewayClasses.

use crate::validation::protocols::ProtocolRegistry;
use common::gateway::certificate_ref_with_defaults;
use common::{AddressRef, AddressType, GatewaySpec, Listener, ListenerErrorReason, ListenerPort};
use common::{TlsConfig, TlsVersionError};
use k8s_openapi::api::core::v1::TypedLocalObjectReference;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

/// Local view of the GatewayClasses that exist
pub trait ClassCatalog: Send + Sync {
    fn contains(&self, class: &str) -> bool;
}

impl ClassCatalog for BTreeSet<String> {
    fn contains(&self, class: &str) -> bool {
        BTreeSet::contains(self, class)
    }
}

impl ClassCatalog for HashSet<String> {
    fn contains(&self, class: &str) -> bool {
        HashSet::contains(self, class)
    }
}

/// A single structural problem in a Gateway spec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    #[error("class must name a GatewayClass")]
    MissingClass,

    #[error("GatewayClass '{0}' does not exist")]
    UnknownClass(String),

    #[error("address type '{0}' is not one of IPAddress, NamedAddress")]
    UnrecognizedAddressType(String),

    #[error("'{0}' is not a valid IPv4 or IPv6 address")]
    MalformedIpAddress(String),

    #[error("named address must not be empty")]
    EmptyNamedAddress,

    #[error("port {0} is outside the range 1-65535")]
    PortOutOfRange(i32),

    #[error("at least one protocol is required")]
    NoProtocols,

    #[error("protocol '{0}' is not recognized")]
    UnrecognizedProtocol(String),

    #[error("protocol '{0}' is listed more than once")]
    DuplicateProtocol(String),

    #[error("protocol '{0}' requires tls to be set")]
    TlsRequired(String),

    #[error(transparent)]
    MalformedTlsVersion(#[from] TlsVersionError),

    #[error("reference must set both kind and name")]
    IncompleteReference,
}

impl ViolationKind {
    /// Most specific listener error reason for this violation
    pub fn reason(&self) -> ListenerErrorReason {
        match self {
            ViolationKind::MalformedIpAddress(_) | ViolationKind::EmptyNamedAddress => {
                ListenerErrorReason::InvalidAddress
            }
            _ => ListenerErrorReason::InvalidSpec,
        }
    }
}

/// A violation and the field it was found at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path of the offending field, e.g. `spec.listeners[0].ports[1].tls`
    pub field: String,
    pub kind: ViolationKind,
}

impl Violation {
    fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    pub fn reason(&self) -> ListenerErrorReason {
        self.kind.reason()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

/// Admission-time rejection carrying every violation found
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Gateway spec is invalid: {}", join_violations(.violations))]
pub struct Rejection {
    pub violations: Vec<Violation>,
}

impl Rejection {
    /// Whether any violation has the given kind
    pub fn contains(&self, kind: &ViolationKind) -> bool {
        self.violations.iter().any(|v| &v.kind == kind)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a Gateway spec at admission time
pub fn validate_gateway_spec<C>(
    spec: &GatewaySpec,
    classes: &C,
    protocols: &ProtocolRegistry,
) -> Result<(), Rejection>
where
    C: ClassCatalog + ?Sized,
{
    let mut violations = Vec::new();

    if spec.class.trim().is_empty() {
        violations.push(Violation::new("spec.class", ViolationKind::MissingClass));
    } else if !classes.contains(&spec.class) {
        violations.push(Violation::new(
            "spec.class",
            ViolationKind::UnknownClass(spec.class.clone()),
        ));
    }

    for (index, listener) in spec.listeners.iter().enumerate() {
        violations.extend(listener_violations(index, listener, protocols));
    }

    for (index, route) in spec.routes.iter().enumerate() {
        if !is_complete(route) {
            violations.push(Violation::new(
                format!("spec.routes[{}]", index),
                ViolationKind::IncompleteReference,
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(Rejection { violations })
    }
}

/// Structural violations of one listener, in field order
pub fn listener_violations(
    index: usize,
    listener: &Listener,
    protocols: &ProtocolRegistry,
) -> Vec<Violation> {
    let path = format!("spec.listeners[{}]", index);
    let mut violations = Vec::new();

    if let Some(address) = &listener.address {
        if let Some(violation) = address_violation(&path, address) {
            violations.push(violation);
        }
    }

    for (port_index, port) in listener.ports.iter().enumerate() {
        let port_path = format!("{}.ports[{}]", path, port_index);
        port_violations(&port_path, port, protocols, &mut violations);
    }

    violations
}

fn address_violation(path: &str, address: &AddressRef) -> Option<Violation> {
    match &address.type_ {
        AddressType::IpAddress => address.address.parse::<IpAddr>().err().map(|_| {
            Violation::new(
                format!("{}.address.address", path),
                ViolationKind::MalformedIpAddress(address.address.clone()),
            )
        }),
        AddressType::NamedAddress if address.address.trim().is_empty() => Some(Violation::new(
            format!("{}.address.address", path),
            ViolationKind::EmptyNamedAddress,
        )),
        AddressType::NamedAddress => None,
        AddressType::Unrecognized(other) => Some(Violation::new(
            format!("{}.address.type", path),
            ViolationKind::UnrecognizedAddressType(other.clone()),
        )),
    }
}

fn port_violations(
    path: &str,
    port: &ListenerPort,
    protocols: &ProtocolRegistry,
    violations: &mut Vec<Violation>,
) {
    if let Some(number) = port.port {
        if !(1..=65535).contains(&number) {
            violations.push(Violation::new(
                format!("{}.port", path),
                ViolationKind::PortOutOfRange(number),
            ));
        }
    }

    if port.protocols.is_empty() {
        violations.push(Violation::new(
            format!("{}.protocols", path),
            ViolationKind::NoProtocols,
        ));
    }

    let mut seen = HashSet::new();
    let mut needs_tls = None;
    for (index, protocol) in port.protocols.iter().enumerate() {
        let field = format!("{}.protocols[{}]", path, index);
        if !seen.insert(protocol.as_str()) {
            violations.push(Violation::new(
                field,
                ViolationKind::DuplicateProtocol(protocol.clone()),
            ));
            continue;
        }

        match protocols.requires_tls(protocol) {
            None => violations.push(Violation::new(
                field,
                ViolationKind::UnrecognizedProtocol(protocol.clone()),
            )),
            Some(true) if needs_tls.is_none() => needs_tls = Some(protocol),
            Some(_) => {}
        }
    }

    // One missing tls block per port, named after the first protocol needing it
    if let (Some(protocol), None) = (needs_tls, &port.tls) {
        violations.push(Violation::new(
            format!("{}.tls", path),
            ViolationKind::TlsRequired(protocol.clone()),
        ));
    }

    if let Some(tls) = &port.tls {
        tls_violations(&format!("{}.tls", path), tls, violations);
    }

    if let Some(extension) = &port.extension {
        if !is_complete(extension) {
            violations.push(Violation::new(
                format!("{}.extension", path),
                ViolationKind::IncompleteReference,
            ));
        }
    }
}

fn tls_violations(path: &str, tls: &TlsConfig, violations: &mut Vec<Violation>) {
    if let Err(e) = tls.parsed_minimum_version() {
        violations.push(Violation::new(
            format!("{}.minimumVersion", path),
            ViolationKind::MalformedTlsVersion(e),
        ));
    }

    for (index, certificate) in tls.certificates.iter().enumerate() {
        if !is_complete(&certificate_ref_with_defaults(certificate)) {
            violations.push(Violation::new(
                format!("{}.certificates[{}]", path, index),
                ViolationKind::IncompleteReference,
            ));
        }
    }
}

fn is_complete(reference: &TypedLocalObjectReference) -> bool {
    !reference.kind.trim().is_empty() && !reference.name.trim().is_empty()
}
