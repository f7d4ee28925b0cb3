//! Gateway validation
//!
//! Two phases. [`admission`] runs when a Gateway is written and rejects
//! structurally invalid specs. [`acceptance`] runs on every reconciliation
//! and reports infrastructure-dependent problems as listener errors.

pub mod acceptance;
pub mod admission;
pub mod protocols;
