//! Cryptographic identities and signatures
//!
//! This module implements Ed25519 signing under the CMVK identity scheme.
//! An `Identity` owns a key pair and is named by a [`Did`]; the private
//! half is present only in the instance held by the key's owner and is
//! never serialized into any wire form.
//!
//! Key types:
//! - `Identity`: a key pair plus agent metadata, able to sign
//! - `PublicIdentity`: public key material only, safe to embed in cards
//! - `Signature`: a detached signature over caller-supplied bytes
//!
//! Signature verification failure is a normal outcome and returns `false`;
//! only invalid call patterns (signing without a private key) are errors.

use crate::capability::CapabilitySet;
use crate::did::Did;
use crate::error::{Result, TrustError};
use crate::time;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Algorithm tag carried by every signature
pub const SIGNATURE_ALGORITHM: &str = "CMVK-Ed25519";

/// A detached signature produced by [`Identity::sign`]
///
/// Immutable value type: the algorithm tag, the base64-encoded verifying
/// key of the signer, the base64-encoded signature bytes, and the issuance
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub algorithm: String,
    pub public_key: String,
    pub signature: String,
    #[serde(with = "crate::time::serde_micros")]
    pub timestamp: DateTime<Utc>,
}

/// A cryptographic agent identity
///
/// Created once via [`Identity::generate`] and immutable thereafter; there
/// is no key rotation. Peers hold public-only instances (reconstructed via
/// [`Identity::public_from_parts`]) whose `sign` fails with
/// [`TrustError::MissingPrivateKey`].
#[derive(Clone)]
pub struct Identity {
    did: Did,
    label: String,
    verifying_key: VerifyingKey,
    signing_key: Option<SigningKey>,
    capabilities: CapabilitySet,
    created_at: DateTime<Utc>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("did", &self.did)
            .field("label", &self.label)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "[redacted]"))
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl Identity {
    /// Generate a fresh identity with a new Ed25519 key pair.
    ///
    /// The DID is derived from a random seed combined with the label, so
    /// identical labels never collide. Entropy-source failure is fatal and
    /// not retried.
    pub fn generate(label: impl Into<String>, capabilities: CapabilitySet) -> Self {
        let label = label.into();
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        Self {
            did: Did::derive(&label),
            label,
            verifying_key,
            signing_key: Some(signing_key),
            capabilities,
            created_at: time::utc_now_micros(),
        }
    }

    /// Reconstruct a peer's identity from public material.
    ///
    /// The result can verify signatures and act as a known identity in a
    /// delegation chain, but cannot sign.
    pub fn public_from_parts(
        did: Did,
        label: impl Into<String>,
        public_key: &str,
        capabilities: CapabilitySet,
    ) -> Result<Self> {
        let verifying_key = decode_verifying_key(public_key)?;
        Ok(Self {
            did,
            label: label.into(),
            verifying_key,
            signing_key: None,
            capabilities,
            created_at: time::utc_now_micros(),
        })
    }

    /// The identity's DID
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// Human-readable agent label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Capabilities this identity claims to hold
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Base64-encoded verifying key
    pub fn public_key(&self) -> String {
        STANDARD.encode(self.verifying_key.to_bytes())
    }

    /// Whether this instance holds the private half of the key pair
    pub fn has_private_key(&self) -> bool {
        self.signing_key.is_some()
    }

    /// Public-material-only reference suitable for embedding in a card
    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity {
            did: self.did.clone(),
            public_key: self.public_key(),
        }
    }

    /// Sign arbitrary bytes with this identity's private key.
    ///
    /// Fails with [`TrustError::MissingPrivateKey`] on public-only
    /// instances.
    pub fn sign(&self, data: &[u8]) -> Result<Signature> {
        let signing_key = match self.signing_key {
            Some(ref key) => key,
            None => return Err(TrustError::MissingPrivateKey(self.did.to_string())),
        };

        let signature = signing_key.sign(data);
        Ok(Signature {
            algorithm: SIGNATURE_ALGORITHM.to_string(),
            public_key: self.public_key(),
            signature: STANDARD.encode(signature.to_bytes()),
            timestamp: time::utc_now_micros(),
        })
    }

    /// Verify a signature against this identity's public key.
    ///
    /// Returns `false` on public-key mismatch, malformed encodings, or
    /// cryptographic failure; never errors.
    pub fn verify(&self, data: &[u8], signature: &Signature) -> bool {
        self.to_public().verify(data, signature)
    }
}

/// Public key material naming an identity, without the private key
///
/// This is the weak reference a [`TrustedCard`](crate::card::TrustedCard)
/// carries: enough to verify signatures, nothing that must stay secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIdentity {
    pub did: Did,
    /// Base64-encoded Ed25519 verifying key
    pub public_key: String,
}

impl PublicIdentity {
    /// Verify a [`Signature`] against this public key.
    ///
    /// The signature must name the same public key; any mismatch or
    /// decoding failure returns `false`.
    pub fn verify(&self, data: &[u8], signature: &Signature) -> bool {
        signature.public_key == self.public_key
            && self.verify_bytes(data, &signature.signature)
    }

    /// Verify a bare base64-encoded signature against this public key.
    ///
    /// Delegations and capability proofs carry detached signature strings
    /// rather than full [`Signature`] values; this is their verification
    /// path.
    pub fn verify_bytes(&self, data: &[u8], signature_b64: &str) -> bool {
        self.try_verify_bytes(data, signature_b64).is_ok()
    }

    fn try_verify_bytes(&self, data: &[u8], signature_b64: &str) -> Result<()> {
        let verifying_key = decode_verifying_key(&self.public_key)?;

        let signature_bytes: [u8; 64] = STANDARD
            .decode(signature_b64)?
            .as_slice()
            .try_into()
            .map_err(|_| TrustError::Crypto("invalid signature length".into()))?;
        let signature = ed25519_dalek::Signature::from_bytes(&signature_bytes);

        verifying_key
            .verify(data, &signature)
            .map_err(TrustError::from)
    }
}

/// Decode a base64-encoded Ed25519 verifying key
fn decode_verifying_key(public_key_b64: &str) -> Result<VerifyingKey> {
    let key_bytes: [u8; 32] = STANDARD
        .decode(public_key_b64)?
        .as_slice()
        .try_into()
        .map_err(|_| TrustError::Crypto("invalid public key length".into()))?;
    VerifyingKey::from_bytes(&key_bytes).map_err(TrustError::from)
}
