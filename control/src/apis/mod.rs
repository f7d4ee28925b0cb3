//! Kubernetes API integrations
//!
//! Controllers for the `networking.x-k8s.io/v1alpha1` kinds and the
//! metrics they record.

pub mod gateway;
pub mod metrics;
