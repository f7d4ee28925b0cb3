//! Gateway watcher
//!
//! Watches Gateway resources, evaluates every listener against the current
//! infrastructure and writes the index-aligned status back.

use crate::apis::metrics::{record_gateway_reconciliation, record_listener_errors};
use crate::error::ControlError;
use crate::status::{error_counts, project_status};
use crate::validation::acceptance::{evaluate_listeners, ListenerEnvironment};
use crate::validation::protocols::ProtocolRegistry;
use common::{Gateway, GatewayStatus};
use futures::StreamExt;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Client, ResourceExt};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Gateway reconciler
pub struct GatewayReconciler {
    client: Client,
    /// GatewayClass name to watch for
    gateway_class_name: String,
    /// Field manager for status patches
    controller_name: String,
    protocols: Arc<ProtocolRegistry>,
    environment: Arc<dyn ListenerEnvironment>,
    requeue: Duration,
    error_requeue: Duration,
}

impl GatewayReconciler {
    pub fn new(
        client: Client,
        gateway_class_name: String,
        controller_name: String,
        protocols: Arc<ProtocolRegistry>,
        environment: Arc<dyn ListenerEnvironment>,
    ) -> Self {
        Self {
            client,
            gateway_class_name,
            controller_name,
            protocols,
            environment,
            requeue: Duration::from_secs(300),
            error_requeue: Duration::from_secs(60),
        }
    }

    /// Override the periodic and error requeue intervals
    pub fn with_requeue(mut self, requeue: Duration, error_requeue: Duration) -> Self {
        self.requeue = requeue;
        self.error_requeue = error_requeue;
        self
    }

    /// Check if this Gateway references our GatewayClass
    fn should_reconcile(&self, gateway_class_name: &str) -> bool {
        gateway_class_name == self.gateway_class_name
    }

    /// Reconcile a single Gateway
    async fn reconcile(gateway: Arc<Gateway>, ctx: Arc<Self>) -> Result<Action, ControlError> {
        let start = Instant::now();
        let namespace = gateway.namespace().unwrap_or_else(|| "default".to_string());
        let name = gateway.name_any();

        if !ctx.should_reconcile(&gateway.spec.class) {
            debug!(
                "Gateway {}/{} references GatewayClass '{}', ignoring",
                namespace, name, gateway.spec.class
            );
            return Ok(Action::await_change());
        }

        info!(
            "Reconciling Gateway {}/{} ({} listener(s), {} route(s))",
            namespace,
            name,
            gateway.spec.listeners.len(),
            gateway.spec.routes.len()
        );

        let status =
            desired_status(&namespace, &gateway, ctx.environment.as_ref(), &ctx.protocols).await?;

        for (index, listener) in status.listeners.iter().enumerate() {
            for listener_error in &listener.errors {
                warn!(
                    "Gateway {}/{} listener {}: {} ({})",
                    namespace, name, index, listener_error.message, listener_error.reason
                );
            }
        }
        for (reason, count) in error_counts(&status) {
            record_listener_errors(&name, &namespace, reason.as_str(), count);
        }

        if needs_status_update(gateway.status.as_ref(), &status) {
            ctx.set_gateway_status(&namespace, &name, &status).await?;
        } else {
            debug!("Gateway {}/{} status unchanged", namespace, name);
        }

        let result = if status.all_listeners_accepted() {
            "success"
        } else {
            "listener_errors"
        };
        record_gateway_reconciliation(&name, &namespace, start.elapsed().as_secs_f64(), result);

        Ok(Action::requeue(ctx.requeue))
    }

    /// Replace the Gateway status
    async fn set_gateway_status(
        &self,
        namespace: &str,
        name: &str,
        status: &GatewayStatus,
    ) -> Result<(), ControlError> {
        let api: Api<Gateway> = Api::namespaced(self.client.clone(), namespace);
        let patch = json!({ "status": status });

        api.patch_status(
            name,
            &PatchParams::apply(&self.controller_name),
            &Patch::Merge(&patch),
        )
        .await?;

        info!(
            "Updated Gateway {}/{} status: {} of {} listener(s) accepted",
            namespace,
            name,
            status.listeners.iter().filter(|l| l.is_accepted()).count(),
            status.listeners.len()
        );
        Ok(())
    }

    /// Error handler for controller
    fn error_policy(gateway: Arc<Gateway>, error: &ControlError, ctx: Arc<Self>) -> Action {
        let namespace = gateway.namespace().unwrap_or_else(|| "default".to_string());
        let name = gateway.name_any();
        error!(
            "Gateway {}/{} reconciliation error: {:?}",
            namespace, name, error
        );
        record_gateway_reconciliation(&name, &namespace, 0.0, "error");
        Action::requeue(ctx.error_requeue)
    }

    /// Start the Gateway controller
    pub async fn run(self) -> Result<(), ControlError> {
        let api: Api<Gateway> = Api::all(self.client.clone());
        let ctx = Arc::new(self);

        info!("Starting Gateway controller");

        Controller::new(api, WatcherConfig::default())
            .run(Self::reconcile, Self::error_policy, ctx)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled Gateway: {:?}", o),
                    Err(e) => error!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

/// Compute the status a Gateway should carry right now
pub async fn desired_status<E>(
    namespace: &str,
    gateway: &Gateway,
    env: &E,
    protocols: &ProtocolRegistry,
) -> Result<GatewayStatus, ControlError>
where
    E: ListenerEnvironment + ?Sized,
{
    let findings = evaluate_listeners(namespace, &gateway.spec, env, protocols).await?;
    Ok(project_status(&gateway.spec, findings)?)
}

/// Whether the stored status differs from the computed one
pub fn needs_status_update(current: Option<&GatewayStatus>, desired: &GatewayStatus) -> bool {
    current != Some(desired)
}
