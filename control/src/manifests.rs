//! CRD manifests
//!
//! Rendered by `gantry crd` for installing the API group.

use crate::error::ControlError;
use common::Scheme;

/// Every CRD of `scheme` as one multi-document YAML stream
pub fn crd_manifests(scheme: &Scheme) -> Result<String, ControlError> {
    let mut documents = Vec::with_capacity(scheme.len());
    for crd in scheme.crds() {
        documents.push(serde_yaml::to_string(&crd)?);
    }
    Ok(documents.join("---\n"))
}
