//! Gateway resource
//!
//! A Gateway spec is split into listeners describing client-facing properties and
//! routes describing application-level routing. Not every combination of
//! fields is valid: structural problems are rejected at admission time, the
//! rest is reported asynchronously through [`GatewayStatus`].

use crate::status::GatewayStatus;
use crate::tls_version::{TlsVersion, TlsVersionError};
use k8s_openapi::api::core::v1::TypedLocalObjectReference;
use kube::CustomResource;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Wire value of [`AddressType::IpAddress`]
pub const IP_ADDRESS_TYPE: &str = "IPAddress";

/// Wire value of [`AddressType::NamedAddress`]
pub const NAMED_ADDRESS_TYPE: &str = "NamedAddress";

pub const TLS_VERSION_1_0: &str = "TLS_1_0";
pub const TLS_VERSION_1_1: &str = "TLS_1_1";
pub const TLS_VERSION_1_2: &str = "TLS_1_2";
pub const TLS_VERSION_1_3: &str = "TLS_1_3";

/// Kind assumed for a certificate reference that leaves apiGroup and kind empty
pub const DEFAULT_CERTIFICATE_KIND: &str = "Secret";

/// Desired state of a Gateway
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.x-k8s.io",
    version = "v1alpha1",
    kind = "Gateway",
    plural = "gateways",
    namespaced,
    status = "GatewayStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    /// Name of the GatewayClass this Gateway is implemented by
    pub class: String,

    /// Addresses, ports and protocols bound on this Gateway.
    /// Order is significant: `status.listeners[i]` reports on `listeners[i]`.
    #[serde(default)]
    pub listeners: Vec<Listener>,

    /// Protocol-specific routes attached to this Gateway.
    /// Order is significant: `status.routes[i]` reports on `routes[i]`.
    #[serde(default)]
    pub routes: Vec<TypedLocalObjectReference>,
}

/// A bound address plus the ports traffic enters through
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    /// Address bound on the listener. When unset the implementation picks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressRef>,

    #[serde(default)]
    pub ports: Vec<ListenerPort>,
}

/// Typed address value bound by a listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressRef {
    #[serde(rename = "type")]
    pub type_: AddressType,

    /// Examples: "1.2.3.4", "128::1", "my-ip-address"
    pub address: String,
}

impl AddressRef {
    pub fn ip(address: impl Into<String>) -> Self {
        Self {
            type_: AddressType::IpAddress,
            address: address.into(),
        }
    }

    pub fn named(address: impl Into<String>) -> Self {
        Self {
            type_: AddressType::NamedAddress,
            address: address.into(),
        }
    }
}

/// Address type tag
///
/// Unknown wire values are kept as [`AddressType::Unrecognized`] so the
/// object still decodes and validation can reject it with a proper reason.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AddressType {
    IpAddress,
    NamedAddress,
    Unrecognized(String),
}

impl AddressType {
    pub fn as_str(&self) -> &str {
        match self {
            AddressType::IpAddress => IP_ADDRESS_TYPE,
            AddressType::NamedAddress => NAMED_ADDRESS_TYPE,
            AddressType::Unrecognized(other) => other,
        }
    }
}

impl From<String> for AddressType {
    fn from(value: String) -> Self {
        match value.as_str() {
            IP_ADDRESS_TYPE => AddressType::IpAddress,
            NAMED_ADDRESS_TYPE => AddressType::NamedAddress,
            _ => AddressType::Unrecognized(value),
        }
    }
}

impl From<AddressType> for String {
    fn from(value: AddressType) -> Self {
        match value {
            AddressType::Unrecognized(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Open string on the wire; the schema must not enumerate values.
impl JsonSchema for AddressType {
    fn schema_name() -> String {
        "AddressType".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// A port on a listener with its protocols and TLS settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListenerPort {
    /// Transport port. When unset the implementation selects a default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    /// Protocol names recognized by the implementation (e.g. "HTTP", "HTTPS")
    #[serde(default)]
    pub protocols: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,

    /// Vendor-specific configuration. Never interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<TypedLocalObjectReference>,
}

/// TLS configuration for a listener port
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// Certificates bound to the port. Empty apiGroup and kind mean a core Secret.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<TypedLocalObjectReference>,

    /// Minimum TLS version, of the form `<protocol>_<major>_<minor>`.
    /// Loosely typed so newer versions need no schema change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<String>,

    /// Implementation-specific options (cipher suites etc.)
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl TlsConfig {
    /// Parse `minimum_version`; `Ok(None)` defers to the implementation default
    pub fn parsed_minimum_version(&self) -> Result<Option<TlsVersion>, TlsVersionError> {
        self.minimum_version
            .as_deref()
            .map(TlsVersion::parse)
            .transpose()
    }
}

/// Fill in the default kind of a certificate reference
pub fn certificate_ref_with_defaults(
    reference: &TypedLocalObjectReference,
) -> TypedLocalObjectReference {
    let group_empty = reference.api_group.as_deref().unwrap_or_default().is_empty();
    if group_empty && reference.kind.is_empty() {
        TypedLocalObjectReference {
            api_group: None,
            kind: DEFAULT_CERTIFICATE_KIND.to_string(),
            name: reference.name.clone(),
        }
    } else {
        reference.clone()
    }
}
