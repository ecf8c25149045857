//! Capability proofs
//!
//! A capability proof is a signed statement by an issuer that an agent
//! holds a capability. The signed payload is `<issuer_did>:<capability>`,
//! so proofs are portable across serializations.

use crate::did::Did;
use crate::error::Result;
use crate::identity::{Identity, PublicIdentity};
use crate::time;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A signed statement that an agent holds a capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityProof {
    pub capability: String,
    /// Base64-encoded Ed25519 signature over the signing payload
    pub proof: String,
    pub issuer_did: Did,
    #[serde(with = "crate::time::serde_micros")]
    pub issued_at: DateTime<Utc>,
    #[serde(
        with = "crate::time::serde_micros_opt",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CapabilityProof {
    /// Issue a proof signed by `issuer`, optionally time-bounded.
    ///
    /// Fails only if the issuer holds no private key.
    pub fn issue(
        issuer: &Identity,
        capability: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Result<Self> {
        let capability = capability.into();
        let payload = Self::signing_payload(issuer.did(), &capability);
        let signature = issuer.sign(payload.as_bytes())?;
        let now = time::utc_now_micros();

        Ok(Self {
            capability,
            proof: signature.signature,
            issuer_did: issuer.did().clone(),
            issued_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        })
    }

    /// The deterministic bytes an issuer signs
    pub fn signing_payload(issuer: &Did, capability: &str) -> String {
        format!("{}:{}", issuer, capability)
    }

    /// Verify this proof against the issuer's public key.
    ///
    /// Returns `false` on issuer mismatch or signature failure.
    pub fn verify(&self, issuer: &PublicIdentity) -> bool {
        if issuer.did != self.issuer_did {
            return false;
        }
        let payload = Self::signing_payload(&self.issuer_did, &self.capability);
        issuer.verify_bytes(payload.as_bytes(), &self.proof)
    }

    /// Whether the proof has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySet;

    #[test]
    fn test_issue_and_verify() {
        let issuer = Identity::generate("issuer", CapabilitySet::new());
        let proof = CapabilityProof::issue(&issuer, "deploy", None).unwrap();

        assert!(proof.verify(&issuer.to_public()));
        assert!(proof.expires_at.is_none());
    }

    #[test]
    fn test_verify_rejects_wrong_issuer() {
        let issuer = Identity::generate("issuer", CapabilitySet::new());
        let other = Identity::generate("other", CapabilitySet::new());

        let proof = CapabilityProof::issue(&issuer, "deploy", None).unwrap();
        assert!(!proof.verify(&other.to_public()));
    }

    #[test]
    fn test_verify_rejects_altered_capability() {
        let issuer = Identity::generate("issuer", CapabilitySet::new());
        let mut proof = CapabilityProof::issue(&issuer, "deploy", None).unwrap();
        proof.capability = "admin".to_string();

        assert!(!proof.verify(&issuer.to_public()));
    }

    #[test]
    fn test_expiry() {
        let issuer = Identity::generate("issuer", CapabilitySet::new());
        let proof = CapabilityProof::issue(&issuer, "deploy", Some(Duration::hours(1))).unwrap();

        let now = time::utc_now_micros();
        assert!(!proof.is_expired_at(now));
        assert!(proof.is_expired_at(now + Duration::hours(2)));
    }
}
