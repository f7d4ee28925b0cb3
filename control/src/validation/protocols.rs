//! Protocol registry
//!
//! Protocol names are an open set. The registry records which names this
//! implementation recognizes and which of them need transport encryption.
//! It is built at startup (defaults plus configured entries) and never
//! compiled into the API types.

use crate::error::ControlError;
use std::collections::BTreeMap;

/// Suffix marking a configured protocol as TLS-requiring: `NAME:tls`
const TLS_MARKER: &str = "tls";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRegistry {
    /// name -> requires TLS
    protocols: BTreeMap<String, bool>,
}

impl ProtocolRegistry {
    /// Registry that recognizes nothing
    pub fn empty() -> Self {
        Self {
            protocols: BTreeMap::new(),
        }
    }

    /// HTTP, HTTPS, TCP, TLS and UDP
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("HTTP", false);
        registry.register("HTTPS", true);
        registry.register("TCP", false);
        registry.register("TLS", true);
        registry.register("UDP", false);
        registry
    }

    /// Add or override a protocol
    pub fn register(&mut self, name: impl Into<String>, requires_tls: bool) {
        self.protocols.insert(name.into(), requires_tls);
    }

    /// Apply entries of the form `NAME[:tls],NAME[:tls],...`
    pub fn extended_with(mut self, entries: &str) -> Result<Self, ControlError> {
        for (name, requires_tls) in parse_entries(entries)? {
            self.register(name, requires_tls);
        }
        Ok(self)
    }

    pub fn is_recognized(&self, name: &str) -> bool {
        self.protocols.contains_key(name)
    }

    /// `None` when the protocol is not recognized
    pub fn requires_tls(&self, name: &str) -> Option<bool> {
        self.protocols.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn parse_entries(entries: &str) -> Result<Vec<(String, bool)>, ControlError> {
    entries
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, requires_tls) = match entry.split_once(':') {
                Some((name, TLS_MARKER)) => (name.trim(), true),
                Some((_, flag)) => {
                    return Err(ControlError::Config(format!(
                        "Protocol entry '{}' has unknown flag '{}' (expected '{}')",
                        entry, flag, TLS_MARKER
                    )))
                }
                None => (entry, false),
            };

            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(ControlError::Config(format!(
                    "Protocol entry '{}' must be an alphanumeric name",
                    entry
                )));
            }

            Ok((name.to_string(), requires_tls))
        })
        .collect()
}
