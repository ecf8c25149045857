//! Delegations and delegation chains
//!
//! A delegation is a signed statement that one identity grants a
//! capability subset to another. A chain is a strictly linear sequence of
//! delegations rooted at an originating authority: the first link's
//! delegator is the root, and every later link's delegator is the previous
//! link's delegatee.
//!
//! Chain verification fails closed: an unknown delegator, a broken link,
//! an expired delegation, or a bad signature each make the whole chain
//! invalid. An empty chain is vacuously valid.

use crate::capability::CapabilitySet;
use crate::did::Did;
use crate::error::{Result, TrustError};
use crate::identity::{Identity, PublicIdentity};
use crate::time;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A signed transfer of capabilities from delegator to delegatee
///
/// The signature covers `delegator:delegatee:sorted,capabilities`; sorting
/// makes the signed bytes reproducible whatever order the capabilities
/// were supplied in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator_did: Did,
    pub delegatee_did: Did,
    /// Delegated capabilities, stored in canonical (sorted) order
    pub capabilities: Vec<String>,
    /// Base64-encoded Ed25519 signature by the delegator
    pub signature: String,
    #[serde(with = "crate::time::serde_micros")]
    pub issued_at: DateTime<Utc>,
    #[serde(
        with = "crate::time::serde_micros_opt",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Delegation {
    /// The deterministic bytes a delegator signs
    pub fn signing_payload(delegator: &Did, delegatee: &Did, capabilities: &CapabilitySet) -> String {
        format!("{}:{}:{}", delegator, delegatee, capabilities.canonical_join())
    }

    /// Recompute the signed payload from this delegation's stored fields
    pub fn signed_payload(&self) -> String {
        let capabilities: CapabilitySet = self.capabilities.iter().cloned().collect();
        Self::signing_payload(&self.delegator_did, &self.delegatee_did, &capabilities)
    }

    /// Whether the delegation has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at <= now)
    }
}

/// A linear chain of delegations from a root identity
///
/// The chain owns a registry of known identities keyed by DID, used to
/// resolve public keys when verifying link signatures. The registry grows
/// as delegations are added locally or as identities are registered for a
/// chain received from a peer. The registry is owned exclusively by this
/// chain instance; it is not meant for concurrent mutation.
#[derive(Debug, Clone)]
pub struct DelegationChain {
    root: Identity,
    delegations: Vec<Delegation>,
    known_identities: HashMap<String, Identity>,
}

impl DelegationChain {
    /// Create a chain rooted at the given identity.
    ///
    /// The root is registered as a known identity immediately.
    pub fn new(root: Identity) -> Self {
        let mut known_identities = HashMap::new();
        known_identities.insert(root.did().to_string(), root.clone());

        Self {
            root,
            delegations: Vec::new(),
            known_identities,
        }
    }

    /// The chain's originating authority
    pub fn root(&self) -> &Identity {
        &self.root
    }

    /// The delegations in chain order
    pub fn delegations(&self) -> &[Delegation] {
        &self.delegations
    }

    /// Look up a known identity by DID
    pub fn known_identity(&self, did: &Did) -> Option<&Identity> {
        self.known_identities.get(did.as_str())
    }

    /// Register an identity for link verification.
    ///
    /// Needed when reconstructing a chain received from a peer, where the
    /// delegators' public keys arrive out of band.
    pub fn register_identity(&mut self, identity: Identity) {
        self.known_identities
            .insert(identity.did().to_string(), identity);
    }

    /// Append an externally-created delegation without signing it.
    ///
    /// Used to rebuild a chain received from a peer; `verify` decides
    /// whether the resulting chain is trustworthy.
    pub fn append_link(&mut self, delegation: Delegation) {
        self.delegations.push(delegation);
    }

    /// Create, sign, and append a delegation.
    ///
    /// The effective delegator is the root when `delegator` is omitted.
    /// For a non-root delegator a `signing_identity` matching the
    /// delegator's DID must be supplied and must hold a private key.
    /// The delegated capabilities must be a subset of what the signing
    /// identity itself holds; delegation proves containment at creation
    /// time, not just authenticity.
    ///
    /// The signing identity is registered into the known-identity registry
    /// so the link can later be verified.
    pub fn add_delegation(
        &mut self,
        delegatee: &PublicIdentity,
        capabilities: CapabilitySet,
        delegator: Option<&PublicIdentity>,
        signing_identity: Option<&Identity>,
        ttl: Option<Duration>,
    ) -> Result<Delegation> {
        let delegator_did = match delegator {
            Some(delegator) => delegator.did.clone(),
            None => self.root.did().clone(),
        };

        let signer: &Identity = if delegator_did == *self.root.did() {
            signing_identity.unwrap_or(&self.root)
        } else {
            let signer = signing_identity
                .ok_or_else(|| TrustError::MissingSigner(delegator_did.to_string()))?;
            if *signer.did() != delegator_did {
                return Err(TrustError::SignerMismatch {
                    expected: delegator_did.to_string(),
                    actual: signer.did().to_string(),
                });
            }
            signer
        };

        for capability in capabilities.iter() {
            if !signer.capabilities().contains(capability) {
                return Err(TrustError::CapabilityNotHeld(capability.clone()));
            }
        }

        let payload = Delegation::signing_payload(&delegator_did, &delegatee.did, &capabilities);
        let signature = signer.sign(payload.as_bytes())?;

        let now = time::utc_now_micros();
        let delegation = Delegation {
            delegator_did,
            delegatee_did: delegatee.did.clone(),
            capabilities: capabilities.canonical_vec(),
            signature: signature.signature,
            issued_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        };

        self.known_identities
            .insert(signer.did().to_string(), signer.clone());
        self.delegations.push(delegation.clone());

        Ok(delegation)
    }

    /// Verify the whole chain against the current time.
    pub fn verify(&self) -> bool {
        self.verify_at(time::utc_now_micros())
    }

    /// Verify the whole chain against a caller-supplied instant.
    ///
    /// Fails closed: `false` if the first delegator is not the root, any
    /// link has expired, any link's delegator is not the previous link's
    /// delegatee, the delegator of any link is unknown, or any signature
    /// does not verify. An empty chain is vacuously valid.
    pub fn verify_at(&self, now: DateTime<Utc>) -> bool {
        if self.delegations.is_empty() {
            return true;
        }

        if self.delegations[0].delegator_did != *self.root.did() {
            return false;
        }

        for (i, delegation) in self.delegations.iter().enumerate() {
            if delegation.is_expired_at(now) {
                return false;
            }

            if i > 0 && delegation.delegator_did != self.delegations[i - 1].delegatee_did {
                return false;
            }

            let signer = match self.known_identities.get(delegation.delegator_did.as_str()) {
                Some(identity) => identity,
                // Unknown delegator is never assumed trusted
                None => return false,
            };

            let payload = delegation.signed_payload();
            if !signer
                .to_public()
                .verify_bytes(payload.as_bytes(), &delegation.signature)
            {
                return false;
            }
        }

        true
    }

    /// All delegations naming `did` as delegatee
    pub fn delegations_for(&self, did: &Did) -> Vec<&Delegation> {
        self.delegations
            .iter()
            .filter(|delegation| delegation.delegatee_did == *did)
            .collect()
    }
}
