//! Status projection
//!
//! Builds a [`GatewayStatus`] from a Gateway spec and the asynchronous findings for
//! its listeners. Correspondence is purely positional: `listeners[i]` of the
//! status describes `listeners[i]` of the Gateway spec, and the same for routes. A
//! reordered spec is simply re-projected by index; there is no per-listener
//! identity to match on.

use crate::validation::acceptance::ListenerFindings;
use common::{GatewaySpec, GatewayStatus, ListenerErrorReason, ListenerStatus, RouteStatus};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("got findings for {findings} listener(s) but the Gateway spec has {listeners}")]
    ListenerCountMismatch { listeners: usize, findings: usize },
}

/// Project listener findings onto a status aligned with `spec`
pub fn project_status(
    spec: &GatewaySpec,
    findings: Vec<ListenerFindings>,
) -> Result<GatewayStatus, ProjectionError> {
    if findings.len() != spec.listeners.len() {
        return Err(ProjectionError::ListenerCountMismatch {
            listeners: spec.listeners.len(),
            findings: findings.len(),
        });
    }

    let listeners = findings
        .into_iter()
        .map(|finding| ListenerStatus {
            address: finding
                .address
                .map(|ip| ip.to_string())
                .unwrap_or_default(),
            errors: finding.errors,
        })
        .collect();

    let routes = spec.routes.iter().map(|_| RouteStatus::default()).collect();

    Ok(GatewayStatus { listeners, routes })
}

/// Count listener errors by reason (for metrics and logging)
pub fn error_counts(status: &GatewayStatus) -> BTreeMap<ListenerErrorReason, usize> {
    let mut counts = BTreeMap::new();
    for error in status.listeners.iter().flat_map(|l| l.errors.iter()) {
        *counts.entry(error.reason.clone()).or_insert(0) += 1;
    }
    counts
}
