//! Configuration for the gantry controller
//!
//! Defaults suit an in-cluster deployment; every field can be overridden
//! from the environment.

use crate::error::ControlError;
use crate::validation::protocols::ProtocolRegistry;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::IpAddr;
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Controller name (used as the status field manager)
    #[serde(default = "default_controller_name")]
    pub controller_name: String,

    /// GatewayClass this controller implements
    #[serde(default = "default_gateway_class_name")]
    pub gateway_class_name: String,

    /// Admission webhook server
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Plain HTTP address serving /metrics and /healthz
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,

    /// Extra recognized protocols: `NAME[:tls],...`
    #[serde(default)]
    pub protocols: Option<String>,

    /// Address bound by listeners that leave it unset
    #[serde(default = "default_listener_address")]
    pub default_address: String,

    /// Reconciliation intervals
    #[serde(default)]
    pub requeue: RequeueConfig,
}

/// Admission webhook configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_addr")]
    pub bind_addr: String,

    /// PEM certificate chain served to the API server
    #[serde(default = "default_webhook_cert")]
    pub cert_path: String,

    /// PEM private key for `cert_path`
    #[serde(default = "default_webhook_key")]
    pub key_path: String,
}

/// Requeue intervals for the Gateway controller
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequeueConfig {
    /// Periodic re-evaluation in seconds (default: 300s)
    #[serde(default = "default_requeue_secs")]
    pub interval_secs: u64,

    /// Retry after a failed reconciliation in seconds (default: 60s)
    #[serde(default = "default_error_requeue_secs")]
    pub error_secs: u64,
}

fn default_controller_name() -> String {
    "gantry.io/gateway-controller".to_string()
}

fn default_gateway_class_name() -> String {
    "gantry".to_string()
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_listener_address() -> String {
    "0.0.0.0".to_string()
}

fn default_webhook_addr() -> String {
    "0.0.0.0:8443".to_string()
}

fn default_webhook_cert() -> String {
    "/etc/gantry/tls/tls.crt".to_string()
}

fn default_webhook_key() -> String {
    "/etc/gantry/tls/tls.key".to_string()
}

fn default_requeue_secs() -> u64 {
    300
}

fn default_error_requeue_secs() -> u64 {
    60
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_webhook_addr(),
            cert_path: default_webhook_cert(),
            key_path: default_webhook_key(),
        }
    }
}

impl Default for RequeueConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_requeue_secs(),
            error_secs: default_error_requeue_secs(),
        }
    }
}

impl RequeueConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn error_interval(&self) -> Duration {
        Duration::from_secs(self.error_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_name: default_controller_name(),
            gateway_class_name: default_gateway_class_name(),
            webhook: WebhookConfig::default(),
            metrics_addr: default_metrics_addr(),
            protocols: None,
            default_address: default_listener_address(),
            requeue: RequeueConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ControlError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("GANTRY_CONTROLLER_NAME") {
            config.controller_name = val;
        }
        if let Some(val) = lookup("GANTRY_GATEWAY_CLASS") {
            config.gateway_class_name = val;
        }
        if let Some(val) = lookup("GANTRY_WEBHOOK_ADDR") {
            config.webhook.bind_addr = val;
        }
        if let Some(val) = lookup("GANTRY_WEBHOOK_CERT") {
            config.webhook.cert_path = val;
        }
        if let Some(val) = lookup("GANTRY_WEBHOOK_KEY") {
            config.webhook.key_path = val;
        }
        if let Some(val) = lookup("GANTRY_METRICS_ADDR") {
            config.metrics_addr = val;
        }
        if let Some(val) = lookup("GANTRY_PROTOCOLS") {
            config.protocols = Some(val);
        }
        if let Some(val) = lookup("GANTRY_DEFAULT_ADDRESS") {
            config.default_address = val;
        }
        if let Some(val) = lookup("GANTRY_REQUEUE_SECS") {
            config.requeue.interval_secs = parse_secs("GANTRY_REQUEUE_SECS", &val)?;
        }
        if let Some(val) = lookup("GANTRY_ERROR_REQUEUE_SECS") {
            config.requeue.error_secs = parse_secs("GANTRY_ERROR_REQUEUE_SECS", &val)?;
        }

        // Fail at startup, not on the first reconciliation
        config.default_ip()?;
        config.protocol_registry()?;

        Ok(config)
    }

    /// Default protocols plus the configured extras
    pub fn protocol_registry(&self) -> Result<ProtocolRegistry, ControlError> {
        let registry = ProtocolRegistry::with_defaults();
        match &self.protocols {
            Some(entries) => registry.extended_with(entries),
            None => Ok(registry),
        }
    }

    pub fn default_ip(&self) -> Result<IpAddr, ControlError> {
        self.default_address.parse().map_err(|e| {
            ControlError::Config(format!(
                "Invalid default address '{}': {}",
                self.default_address, e
            ))
        })
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ControlError> {
    match value.parse::<u64>() {
        Ok(0) | Err(_) => Err(ControlError::Config(format!(
            "{} must be a positive number of seconds, got '{}'",
            key, value
        ))),
        Ok(secs) => Ok(secs),
    }
}
