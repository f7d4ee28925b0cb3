//! TLS version strings
//!
//! Grammar: `<PROTOCOL>_<MAJOR>_<MINOR>`, e.g. `TLS_1_2`. External
//! integrations rely on this format, so it is enforced even though the
//! field is a plain string.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    static ref TLS_VERSION_PATTERN: Regex =
        Regex::new(r"^([A-Za-z]+)_([0-9]+)_([0-9]+)$").expect("TLS version pattern is valid");
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TlsVersionError {
    #[error("TLS version '{0}' does not match <PROTOCOL>_<MAJOR>_<MINOR> (e.g. TLS_1_2)")]
    Malformed(String),

    #[error("TLS version '{0}' has a version component out of range")]
    OutOfRange(String),
}

/// Parsed TLS version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TlsVersion {
    pub protocol: String,
    pub major: u32,
    pub minor: u32,
}

impl TlsVersion {
    pub fn parse(value: &str) -> Result<Self, TlsVersionError> {
        let captures = TLS_VERSION_PATTERN
            .captures(value)
            .ok_or_else(|| TlsVersionError::Malformed(value.to_string()))?;

        let component = |index: usize| -> Result<u32, TlsVersionError> {
            captures[index]
                .parse()
                .map_err(|_| TlsVersionError::OutOfRange(value.to_string()))
        };

        Ok(Self {
            protocol: captures[1].to_string(),
            major: component(2)?,
            minor: component(3)?,
        })
    }
}

impl FromStr for TlsVersion {
    type Err = TlsVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.protocol, self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_known_versions() {
        for value in ["TLS_1_0", "TLS_1_1", "TLS_1_2", "TLS_1_3"] {
            let version = TlsVersion::parse(value).unwrap_or_else(|e| panic!("{}: {}", value, e));
            assert_eq!(version.protocol, "TLS");
            assert_eq!(version.to_string(), value);
        }
    }

    #[test]
    fn test_accepts_future_versions() {
        // New protocols/versions need no code change
        let version: TlsVersion = "DTLS_1_4".parse().unwrap();
        assert_eq!(version.protocol, "DTLS");
        assert_eq!((version.major, version.minor), (1, 4));

        assert!(TlsVersion::parse("tls_10_20").is_ok());
    }

    #[test]
    fn test_rejects_malformed_versions() {
        let invalid = [
            "SSL3",      // no separators
            "TLS_1",     // missing minor
            "TLS_1_2_3", // extra component
            "TLS1_2",    // digit in protocol
            "_1_2",      // empty protocol
            "TLS_a_2",   // non-numeric major
            "TLS_1_2 ",  // trailing whitespace
            "",
        ];

        for value in invalid {
            assert_eq!(
                TlsVersion::parse(value),
                Err(TlsVersionError::Malformed(value.to_string())),
                "Should reject: {:?}",
                value
            );
        }
    }

    #[test]
    fn test_rejects_overflowing_component() {
        assert!(matches!(
            TlsVersion::parse("TLS_99999999999_0"),
            Err(TlsVersionError::OutOfRange(_))
        ));
    }
}
