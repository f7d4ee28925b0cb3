use anyhow::{Context, Result};
use common::Scheme;
use control::apis::gateway::environment::ClusterEnvironment;
use control::apis::gateway::gateway::GatewayReconciler;
use control::apis::gateway::gateway_class::GatewayClassReconciler;
use control::config::ControllerConfig;
use control::manifests::crd_manifests;
use control::server::HttpServer;
use control::webhook::tls::load_server_config;
use control::webhook::AdmissionValidator;
use std::env;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Gantry - Gateway validation and status controller
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (needed for Kubernetes TLS client)
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok(); // Ignore error if already installed

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if env::args().nth(1).as_deref() == Some("crd") {
        info!("Exporting custom resource definitions");
        print!("{}", crd_manifests(&Scheme::gateway_api())?);
        return Ok(());
    }

    let config = ControllerConfig::from_env().context("Invalid configuration")?;
    let protocols = Arc::new(config.protocol_registry()?);
    let default_address = config.default_ip()?;

    info!("🦀 Gantry Gateway controller");
    info!("   Controller: {}", config.controller_name);
    info!("   GatewayClass: {}", config.gateway_class_name);
    info!(
        "   Protocols: {}",
        protocols.names().collect::<Vec<_>>().join(", ")
    );

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let mut controller_handles = vec![];

    // GatewayClass controller (its cache backs admission class checks)
    let (classes, gc_driver) =
        GatewayClassReconciler::new(client.clone(), config.gateway_class_name.clone()).start();
    controller_handles.push(tokio::spawn(gc_driver));

    // Gateway controller
    let environment = Arc::new(ClusterEnvironment::new(client.clone(), default_address));
    let gw_reconciler = GatewayReconciler::new(
        client.clone(),
        config.gateway_class_name.clone(),
        config.controller_name.clone(),
        protocols.clone(),
        environment,
    )
    .with_requeue(config.requeue.interval(), config.requeue.error_interval());
    controller_handles.push(tokio::spawn(async move {
        if let Err(e) = gw_reconciler.run().await {
            error!("Gateway controller error: {}", e);
        }
    }));

    info!("✅ Gateway API controllers started");

    classes
        .wait_until_ready()
        .await
        .context("GatewayClass cache never became ready")?;

    let tls = load_server_config(&config.webhook.cert_path, &config.webhook.key_path)?;
    let validator = Arc::new(AdmissionValidator::new(
        Arc::new(classes),
        protocols,
        Scheme::gateway_api(),
    ));

    let webhook = HttpServer::webhook(config.webhook.bind_addr.clone(), tls, validator);
    let metrics = HttpServer::metrics(config.metrics_addr.clone());

    info!("🚀 Admission webhook on https://{}", config.webhook.bind_addr);
    info!("📊 Metrics on http://{}/metrics", config.metrics_addr);
    info!("Press Ctrl-C to exit.");

    let result = tokio::select! {
        result = webhook.serve() => result.context("Webhook server failed"),
        result = metrics.serve() => result.context("Metrics server failed"),
        _ = signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down...");
            Ok(())
        }
    };

    for handle in controller_handles {
        handle.abort();
    }

    info!("Exiting...");
    result
}
