//! Gantry Common Types
//!
//! Gateway API resources for the `networking.x-k8s.io/v1alpha1` group:
//! - [`Gateway`]: listeners (address, ports, protocols, TLS) and attached routes
//! - [`GatewayClass`]: the named profile a Gateway selects its implementation with
//! - [`GatewayStatus`]: per-listener and per-route acceptance, index-aligned with the Gateway spec
//!
//! These are plain data types. Validation and status computation live in the
//! `control` crate.

pub mod gateway;
pub mod gateway_class;
pub mod scheme;
pub mod status;
pub mod tls_version;

pub use gateway::{
    AddressRef, AddressType, Gateway, GatewaySpec, Listener, ListenerPort, TlsConfig,
};
pub use gateway_class::{GatewayClass, GatewayClassSpec, GatewayClassStatus};
pub use scheme::Scheme;
pub use status::{GatewayStatus, ListenerError, ListenerErrorReason, ListenerStatus, RouteStatus};
pub use tls_version::{TlsVersion, TlsVersionError};

/// API group of every resource in this crate
pub const GROUP: &str = "networking.x-k8s.io";

/// API version of every resource in this crate
pub const VERSION: &str = "v1alpha1";
