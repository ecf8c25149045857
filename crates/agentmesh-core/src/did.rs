//! Decentralized identifiers for the CMVK scheme
//!
//! A DID is a self-describing string naming a key pair, independent of any
//! central registry. The CMVK method encodes identifiers as
//! `did:cmvk:<32 lowercase hex chars>`, where the hex portion is derived
//! from a random seed so that two agents can never collide regardless of
//! when their identities were generated.

use crate::error::{Result, TrustError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Scheme prefix for all CMVK identifiers
pub const DID_PREFIX: &str = "did:cmvk:";

/// Length of the hex-encoded identifier body
const DID_BODY_LEN: usize = 32;

/// A CMVK decentralized identifier
///
/// Construction is deliberately lenient (`new_unchecked` accepts any
/// string) so that cards received off the wire can carry malformed
/// identifiers; the verification layer, not the parser, is the fail-closed
/// gate. `FromStr` performs strict validation for callers that want it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Derive a fresh DID for an agent label.
    ///
    /// The identifier body is the SHA-256 of a random UUID combined with
    /// the label, truncated to 32 hex chars. The random seed guarantees
    /// collision resistance independent of wall-clock time.
    pub fn derive(label: &str) -> Self {
        let seed = format!("{}:{}", uuid::Uuid::new_v4(), label);
        let digest = Sha256::digest(seed.as_bytes());
        let body: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        Did(format!("{}{}", DID_PREFIX, &body[..DID_BODY_LEN]))
    }

    /// Wrap a raw string without validating it
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Did(s.into())
    }

    /// Check that the identifier matches the CMVK scheme
    pub fn is_valid(&self) -> bool {
        match self.0.strip_prefix(DID_PREFIX) {
            Some(body) => {
                body.len() == DID_BODY_LEN
                    && body.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
            }
            None => false,
        }
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self> {
        let did = Did(s.to_string());
        if did.is_valid() {
            Ok(did)
        } else {
            Err(TrustError::InvalidDid(s.to_string()))
        }
    }
}
