//! Error types for the handshake crate

use thiserror::Error;

/// Result type alias using HandshakeError
pub type Result<T> = std::result::Result<T, HandshakeError>;

/// Errors surfaced to callers of the trust-gated client
///
/// Trust decisions themselves are values: `TrustHandshake::verify_peer`
/// always returns a `TrustVerificationResult`. An error here means the
/// caller attempted an operation that verification has ruled out.
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// The peer failed verification; the contained string is the
    /// human-readable reason from the verification result
    #[error("peer verification failed: {0}")]
    PeerNotTrusted(String),

    /// The peer card cannot identify a counterparty at all
    #[error("peer card carries no identity")]
    MissingPeerIdentity,
}
