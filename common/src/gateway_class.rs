//! GatewayClass resource
//!
//! A cluster-scoped, named configuration profile. Gateways select their
//! implementation by naming one in `spec.class`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of a GatewayClass (no fields yet)
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.x-k8s.io",
    version = "v1alpha1",
    kind = "GatewayClass",
    plural = "gatewayclasses",
    status = "GatewayClassStatus"
)]
pub struct GatewayClassSpec {}

/// Observed state of a GatewayClass (no fields yet)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GatewayClassStatus {}
