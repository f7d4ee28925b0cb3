//! Gateway admission webhook
//!
//! Runs the synchronous validation phase whenever an author writes a
//! Gateway spec. Rejected specs are never persisted, so they never reach
//! status. Status writes and updates that leave the spec unchanged pass
//! through, so a class deleted after admission cannot wedge the object.

pub mod tls;

use crate::apis::metrics::record_admission_review;
use crate::error::ControlError;
use crate::validation::admission::{validate_gateway_spec, ClassCatalog};
use crate::validation::protocols::ProtocolRegistry;
use common::{Gateway, Scheme};
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::DynamicObject;
use kube::Resource;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Validates Gateway admission reviews
pub struct AdmissionValidator {
    classes: Arc<dyn ClassCatalog>,
    protocols: Arc<ProtocolRegistry>,
    scheme: Scheme,
}

impl AdmissionValidator {
    pub fn new(
        classes: Arc<dyn ClassCatalog>,
        protocols: Arc<ProtocolRegistry>,
        scheme: Scheme,
    ) -> Self {
        Self {
            classes,
            protocols,
            scheme,
        }
    }

    /// Decide an admission review
    pub fn review(&self, review: AdmissionReview<DynamicObject>) -> AdmissionReview<DynamicObject> {
        let request: AdmissionRequest<DynamicObject> = match review.try_into() {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid admission review: {}", e);
                record_admission_review("UNKNOWN", "invalid");
                return AdmissionResponse::invalid(e.to_string()).into_review();
            }
        };

        let operation = operation_name(&request.operation);
        let response = AdmissionResponse::from(&request);

        match self.admit(&request) {
            Ok(()) => {
                debug!(
                    "Admitted {} of {} {}/{}",
                    operation,
                    request.kind.kind,
                    request.namespace.as_deref().unwrap_or(""),
                    request.name
                );
                record_admission_review(operation, "allowed");
                response.into_review()
            }
            Err(message) => {
                info!(
                    "Denied {} of {} {}/{}: {}",
                    operation,
                    request.kind.kind,
                    request.namespace.as_deref().unwrap_or(""),
                    request.name,
                    message
                );
                record_admission_review(operation, "denied");
                response.deny(message).into_review()
            }
        }
    }

    /// Decide a JSON-encoded admission review, returning the JSON response
    pub fn review_bytes(&self, body: &[u8]) -> Result<Vec<u8>, ControlError> {
        let review: AdmissionReview<DynamicObject> = serde_json::from_slice(body)?;
        Ok(serde_json::to_vec(&self.review(review))?)
    }

    fn admit(&self, request: &AdmissionRequest<DynamicObject>) -> Result<(), String> {
        let kind = &request.kind;
        if self
            .scheme
            .lookup(&kind.group, &kind.version, &kind.kind)
            .is_none()
        {
            return Err(format!(
                "{}/{} {} is not a recognized kind",
                kind.group, kind.version, kind.kind
            ));
        }

        // Only Gateways carry a spec worth validating
        if kind.kind != Gateway::kind(&()) {
            return Ok(());
        }

        // Status is written by the controller, never gated here
        if request.sub_resource.as_deref() == Some("status") {
            return Ok(());
        }

        let object = match (&request.operation, &request.object) {
            (Operation::Delete, _) | (_, None) => return Ok(()),
            (_, Some(object)) => object,
        };

        if let Some(types) = &object.types {
            if !self.scheme.recognizes(types) {
                return Err(format!(
                    "object {} {} is not a recognized kind",
                    types.api_version, types.kind
                ));
            }
        }

        let gateway = decode_gateway(object)?;

        // Metadata-only updates leave an already admitted spec untouched
        if let (Operation::Update, Some(old_object)) = (&request.operation, &request.old_object) {
            if let Ok(old_gateway) = decode_gateway(old_object) {
                if old_gateway.spec == gateway.spec {
                    return Ok(());
                }
            }
        }

        validate_gateway_spec(&gateway.spec, self.classes.as_ref(), &self.protocols)
            .map_err(|rejection| rejection.to_string())
    }
}

fn decode_gateway(object: &DynamicObject) -> Result<Gateway, String> {
    object
        .clone()
        .try_parse()
        .map_err(|e| format!("Gateway could not be decoded: {}", e))
}

fn operation_name(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}
