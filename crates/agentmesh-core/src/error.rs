//! Error types for the agentmesh trust layer

use thiserror::Error;

/// Result type alias using TrustError
pub type Result<T> = std::result::Result<T, TrustError>;

/// Errors raised by the trust layer for invalid call patterns.
///
/// These are usage errors: signing without a private key, delegating
/// without a valid signer, feeding the layer malformed inputs. Trust
/// *decisions* (bad signature, expired card, insufficient score) are never
/// errors; they surface as `false` from verification methods or as an
/// untrusted verification result.
#[derive(Error, Debug)]
pub enum TrustError {
    /// Attempted to sign with an identity that holds no private key
    #[error("identity '{0}' holds no private key")]
    MissingPrivateKey(String),

    /// A non-root delegation was requested without a signing identity
    #[error("no signing identity supplied for delegator '{0}'")]
    MissingSigner(String),

    /// The supplied signing identity does not match the delegator DID
    #[error("signing identity '{actual}' does not match delegator '{expected}'")]
    SignerMismatch { expected: String, actual: String },

    /// A delegation named a capability its signer does not hold
    #[error("capability '{0}' is not held by the delegating identity")]
    CapabilityNotHeld(String),

    /// Malformed decentralized identifier
    #[error("invalid DID: {0}")]
    InvalidDid(String),

    /// Cryptographic error
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(String),
}

impl From<ed25519_dalek::SignatureError> for TrustError {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        TrustError::Crypto(err.to_string())
    }
}

impl From<serde_json::Error> for TrustError {
    fn from(err: serde_json::Error) -> Self {
        TrustError::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for TrustError {
    fn from(err: base64::DecodeError) -> Self {
        TrustError::Crypto(err.to_string())
    }
}
