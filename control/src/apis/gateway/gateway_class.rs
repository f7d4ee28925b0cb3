//! GatewayClass watcher
//!
//! Watches GatewayClass resources. The controller's cache doubles as the
//! class catalog the admission webhook checks `spec.class` against.

use crate::apis::metrics::record_gatewayclass_reconciliation;
use crate::error::ControlError;
use crate::validation::admission::ClassCatalog;
use common::GatewayClass;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use kube::api::Api;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

impl ClassCatalog for Store<GatewayClass> {
    fn contains(&self, class: &str) -> bool {
        self.get(&ObjectRef::new(class)).is_some()
    }
}

/// GatewayClass reconciler
pub struct GatewayClassReconciler {
    client: Client,
    /// GatewayClass name this controller implements
    gateway_class_name: String,
}

impl GatewayClassReconciler {
    pub fn new(client: Client, gateway_class_name: String) -> Self {
        Self {
            client,
            gateway_class_name,
        }
    }

    /// Check if a GatewayClass is the one this controller implements
    pub fn is_served(&self, name: &str) -> bool {
        name == self.gateway_class_name
    }

    /// Reconcile a single GatewayClass
    async fn reconcile(
        gateway_class: Arc<GatewayClass>,
        ctx: Arc<Self>,
    ) -> Result<Action, ControlError> {
        let name = gateway_class.name_any();

        if ctx.is_served(&name) {
            info!("GatewayClass {} is served by this controller", name);
            record_gatewayclass_reconciliation(&name, "served");
        } else {
            debug!("GatewayClass {} is known but not served here", name);
            record_gatewayclass_reconciliation(&name, "ignored");
        }

        Ok(Action::await_change())
    }

    /// Error handler for controller
    fn error_policy(_obj: Arc<GatewayClass>, error: &ControlError, _ctx: Arc<Self>) -> Action {
        error!("GatewayClass reconciliation error: {:?}", error);
        Action::requeue(Duration::from_secs(60))
    }

    /// Build the GatewayClass controller
    ///
    /// Returns the class cache and the future driving the controller. The
    /// cache only fills while the future is polled.
    pub fn start(self) -> (Store<GatewayClass>, BoxFuture<'static, ()>) {
        let api: Api<GatewayClass> = Api::all(self.client.clone());
        let controller = Controller::new(api, WatcherConfig::default());
        let store = controller.store();
        let ctx = Arc::new(self);

        info!("Starting GatewayClass controller");

        let driver = controller
            .run(Self::reconcile, Self::error_policy, ctx)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled GatewayClass: {:?}", o),
                    Err(e) => error!("Reconciliation error: {:?}", e),
                }
            })
            .boxed();

        (store, driver)
    }
}
