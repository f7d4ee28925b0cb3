//! Gateway status
//!
//! Written only by the controller. Every array is positionally aligned with
//! the Gateway spec that produced it: `listeners[i]` describes `spec.listeners[i]`
//! and `routes[i]` describes `spec.routes[i]`. Entries are never reordered
//! and never sparse.

use crate::gateway::GatewaySpec;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observed state of a Gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    #[serde(default)]
    pub listeners: Vec<ListenerStatus>,

    #[serde(default)]
    pub routes: Vec<RouteStatus>,
}

impl GatewayStatus {
    /// True when both arrays have exactly one entry per spec entry
    pub fn is_aligned_with(&self, spec: &GatewaySpec) -> bool {
        self.listeners.len() == spec.listeners.len() && self.routes.len() == spec.routes.len()
    }

    /// True when every listener is accepted
    pub fn all_listeners_accepted(&self) -> bool {
        self.listeners.iter().all(ListenerStatus::is_accepted)
    }
}

/// Status of a single listener
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListenerStatus {
    /// Reasons the listener is not valid. Empty iff the listener is accepted.
    #[serde(default)]
    pub errors: Vec<ListenerError>,

    /// Address actually bound. Authoritative only when `errors` is empty.
    #[serde(default)]
    pub address: String,
}

impl ListenerStatus {
    pub fn accepted(address: impl Into<String>) -> Self {
        Self {
            errors: Vec::new(),
            address: address.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Error reported for a listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListenerError {
    /// Automation-facing reason code
    pub reason: ListenerErrorReason,

    /// Human-facing text. Never parse this.
    pub message: String,
}

impl ListenerError {
    pub fn new(reason: ListenerErrorReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// Stable reason codes for [`ListenerError`]
///
/// The set is open: codes written by newer controllers decode as
/// [`ListenerErrorReason::Other`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListenerErrorReason {
    /// Catch-all for configurations that match no more specific reason
    InvalidSpec,
    /// The address is malformed, unresolvable or cannot be bound
    InvalidAddress,
    /// A TLS certificate reference does not resolve to an existing object
    InvalidCertificateRef,
    /// The port's extension reference does not resolve to an existing object
    InvalidExtensionRef,
    Other(String),
}

impl ListenerErrorReason {
    pub fn as_str(&self) -> &str {
        match self {
            ListenerErrorReason::InvalidSpec => "InvalidSpec",
            ListenerErrorReason::InvalidAddress => "InvalidAddress",
            ListenerErrorReason::InvalidCertificateRef => "InvalidCertificateRef",
            ListenerErrorReason::InvalidExtensionRef => "InvalidExtensionRef",
            ListenerErrorReason::Other(code) => code,
        }
    }
}

impl From<String> for ListenerErrorReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "InvalidSpec" => ListenerErrorReason::InvalidSpec,
            "InvalidAddress" => ListenerErrorReason::InvalidAddress,
            "InvalidCertificateRef" => ListenerErrorReason::InvalidCertificateRef,
            "InvalidExtensionRef" => ListenerErrorReason::InvalidExtensionRef,
            _ => ListenerErrorReason::Other(value),
        }
    }
}

impl From<ListenerErrorReason> for String {
    fn from(value: ListenerErrorReason) -> Self {
        match value {
            ListenerErrorReason::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ListenerErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JsonSchema for ListenerErrorReason {
    fn schema_name() -> String {
        "ListenerErrorReason".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// Status of a single attached route
///
/// Reserved for future per-route reporting; carries no fields yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RouteStatus {}
