//! Gateway API support (v1alpha1)
//!
//! - GatewayClass: class catalog for admission
//! - Gateway: listener evaluation and status
//! - ClusterEnvironment: bind checks, name resolution and reference lookups

pub mod environment;
#[allow(clippy::module_inception)]
pub mod gateway;
pub mod gateway_class;
