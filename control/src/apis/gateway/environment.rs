//! Cluster-backed listener environment
//!
//! Answers the asynchronous validation questions against the node the
//! controller runs on and the Kubernetes API.

use crate::error::ControlError;
use crate::validation::acceptance::ListenerEnvironment;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::TypedLocalObjectReference;
use kube::api::{Api, DynamicObject};
use kube::discovery::{self, Scope};
use kube::Client;
use std::net::IpAddr;
use tokio::net::TcpListener;
use tracing::debug;

pub struct ClusterEnvironment {
    client: Client,
    default_address: IpAddr,
}

impl ClusterEnvironment {
    pub fn new(client: Client, default_address: IpAddr) -> Self {
        Self {
            client,
            default_address,
        }
    }
}

#[async_trait]
impl ListenerEnvironment for ClusterEnvironment {
    async fn can_bind(&self, ip: IpAddr) -> bool {
        probe_bind(ip).await
    }

    async fn resolve_name(&self, name: &str) -> Option<IpAddr> {
        match tokio::net::lookup_host((name, 0)).await {
            Ok(mut addrs) => addrs.next().map(|addr| addr.ip()),
            Err(e) => {
                debug!("Cannot resolve {}: {}", name, e);
                None
            }
        }
    }

    async fn reference_exists(
        &self,
        namespace: &str,
        reference: &TypedLocalObjectReference,
    ) -> Result<bool, ControlError> {
        let group_name = reference.api_group.as_deref().unwrap_or("");

        let group = match discovery::oneshot::group(&self.client, group_name).await {
            Ok(group) => group,
            Err(e) if is_not_found(&e) => {
                debug!("API group '{}' is not served", group_name);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let Some((resource, capabilities)) = group.recommended_kind(&reference.kind) else {
            debug!(
                "Kind '{}' is not served by API group '{}'",
                reference.kind, group_name
            );
            return Ok(false);
        };

        let api: Api<DynamicObject> = match capabilities.scope {
            Scope::Namespaced => Api::namespaced_with(self.client.clone(), namespace, &resource),
            Scope::Cluster => Api::all_with(self.client.clone(), &resource),
        };

        Ok(api.get_opt(&reference.name).await?.is_some())
    }

    fn default_address(&self) -> IpAddr {
        self.default_address
    }
}

/// Bind an ephemeral port on `ip`; only the address itself is under test
async fn probe_bind(ip: IpAddr) -> bool {
    match TcpListener::bind((ip, 0)).await {
        Ok(_) => true,
        Err(e) => {
            debug!("Cannot bind {}: {}", ip, e);
            false
        }
    }
}

fn is_not_found(error: &kube::Error) -> bool {
    match error {
        kube::Error::Discovery(_) => true,
        kube::Error::Api(response) => response.code == 404,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_probe_bind() {
        assert!(probe_bind(IpAddr::V4(Ipv4Addr::LOCALHOST)).await);
        assert!(probe_bind(IpAddr::V4(Ipv4Addr::UNSPECIFIED)).await);
        // TEST-NET-3, never assigned to a local interface
        assert!(!probe_bind("203.0.113.77".parse().unwrap()).await);
    }
}
