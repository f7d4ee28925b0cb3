//! Gantry control plane library
//!
//! Gateway validation, status projection, controllers and the admission
//! webhook. The `gantry` binary wires them together.

pub mod apis;
pub mod config;
pub mod error;
pub mod manifests;
pub mod server;
pub mod status;
pub mod validation;
pub mod webhook;
