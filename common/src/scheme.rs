//! Kind registration table
//!
//! Maps (group, version, kind) to the resource description and CRD generator
//! of every kind this crate defines. Built once at startup and passed by
//! reference to whatever needs to recognize or install the kinds.

use crate::gateway::Gateway;
use crate::gateway_class::GatewayClass;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::core::{ApiResource, TypeMeta};
use kube::{CustomResourceExt, Resource};

/// A registered kind
#[derive(Clone)]
pub struct Registration {
    pub resource: ApiResource,
    crd: fn() -> CustomResourceDefinition,
}

impl Registration {
    pub fn crd(&self) -> CustomResourceDefinition {
        (self.crd)()
    }
}

/// Explicit registration table (no process-wide state)
#[derive(Clone, Default)]
pub struct Scheme {
    registrations: Vec<Registration>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every kind in `networking.x-k8s.io/v1alpha1`
    pub fn gateway_api() -> Self {
        Self::new().register::<GatewayClass>().register::<Gateway>()
    }

    /// Register a custom resource kind. Registering twice is a no-op.
    pub fn register<K>(mut self) -> Self
    where
        K: Resource<DynamicType = ()> + CustomResourceExt,
    {
        let resource = ApiResource::erase::<K>(&());
        if self
            .lookup(&resource.group, &resource.version, &resource.kind)
            .is_none()
        {
            self.registrations.push(Registration {
                resource,
                crd: K::crd,
            });
        }
        self
    }

    pub fn lookup(&self, group: &str, version: &str, kind: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| {
            r.resource.group == group && r.resource.version == version && r.resource.kind == kind
        })
    }

    /// Whether an object's apiVersion/kind names a registered kind
    pub fn recognizes(&self, types: &TypeMeta) -> bool {
        let (group, version) = split_api_version(&types.api_version);
        self.lookup(group, version, &types.kind).is_some()
    }

    /// CRD manifests for every registered kind, in registration order
    pub fn crds(&self) -> Vec<CustomResourceDefinition> {
        self.registrations.iter().map(Registration::crd).collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Split `group/version` (core kinds carry only `version`)
fn split_api_version(api_version: &str) -> (&str, &str) {
    api_version.rsplit_once('/').unwrap_or(("", api_version))
}
