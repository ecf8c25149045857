//! Trust handshake verification engine
//!
//! `TrustHandshake` is what a caller invokes before interacting with a
//! peer agent. It evaluates the peer's card against policy (signature
//! validity, DID format, expiry, minimum trust score, required
//! capabilities) and caches the outcome per DID with a TTL.
//!
//! Every check fails closed: any ambiguity produces an untrusted result
//! with a human-readable reason, never an error. A delegation chain
//! attached to a card is advisory supporting evidence; its presence is
//! recorded as a warning rather than substituting for the card checks.
//! Full fail-closed chain verification is
//! [`DelegationChain::verify`](agentmesh_core::DelegationChain::verify),
//! available to callers holding the chain's key material.

use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

use agentmesh_core::{Identity, TrustedCard};

use crate::cache::{CachedVerification, MemoryStore, VerificationStore};
use crate::clock::{Clock, SystemClock};
use crate::result::TrustVerificationResult;

/// Default cache TTL: 15 minutes
const DEFAULT_CACHE_TTL_SECS: i64 = 900;

/// Handshake configuration
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// How long a cached verification result stays fresh
    pub cache_ttl: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::seconds(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

/// Performs trust verification handshakes with peer agents
///
/// The cache and clock are instance-owned and injectable, so separate
/// verification policies keep separate cache state and tests can control
/// time.
pub struct TrustHandshake {
    identity: Identity,
    config: HandshakeConfig,
    store: Arc<dyn VerificationStore>,
    clock: Arc<dyn Clock>,
}

impl TrustHandshake {
    /// Create a handshake for the local agent with default config,
    /// in-memory cache, and system clock
    pub fn new(identity: Identity) -> Self {
        Self::with_config(identity, HandshakeConfig::default())
    }

    /// Create a handshake with explicit configuration
    pub fn with_config(identity: Identity, config: HandshakeConfig) -> Self {
        Self {
            identity,
            config,
            store: Arc::new(MemoryStore::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the cache backend
    pub fn with_store(mut self, store: Arc<dyn VerificationStore>) -> Self {
        self.store = store;
        self
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The local agent's identity
    pub fn local_identity(&self) -> &Identity {
        &self.identity
    }

    /// Verify a peer agent before communication.
    ///
    /// Checks run in a fixed order and short-circuit on the first failure:
    /// identity presence, DID format, card signature, expiry, trust score,
    /// required capabilities. Successful results are cached per DID; a
    /// fresh cached result is reused, except that required capabilities
    /// are always re-checked against the card's current advertised list,
    /// since capabilities can legitimately change while identity trust
    /// does not.
    pub async fn verify_peer(
        &self,
        peer_card: &TrustedCard,
        required_capabilities: &[String],
        min_trust_score: f64,
    ) -> TrustVerificationResult {
        let now = self.clock.now();

        let identity = match peer_card.identity {
            Some(ref identity) => identity,
            None => {
                warn!(card = %peer_card.name, "Peer card carries no identity");
                return TrustVerificationResult::untrusted(
                    0.0,
                    "peer has no cryptographic identity",
                );
            }
        };
        let did = identity.did.clone();

        if let Some(cached) = self.store.get(did.as_str()).await {
            if now - cached.cached_at < self.config.cache_ttl {
                // Capabilities are re-checked even on a cache hit
                if let Some(missing) = first_missing(required_capabilities, &peer_card.capabilities)
                {
                    warn!(did = %did, capability = %missing, "Cached peer no longer advertises required capability");
                    return TrustVerificationResult::untrusted(
                        peer_card.trust_score,
                        format!("missing required capability: {missing}"),
                    );
                }
                info!(did = %did, "Reusing cached verification result");
                return cached.result;
            }
            // Stale entries are treated as absent
            self.store.remove(did.as_str()).await;
        }

        if !did.is_valid() {
            warn!(did = %did, "Peer DID does not match the CMVK scheme");
            return TrustVerificationResult::untrusted(0.0, "invalid DID format");
        }

        if peer_card.card_signature.is_none() || !peer_card.verify_signature() {
            warn!(did = %did, "Peer card signature missing or invalid");
            return TrustVerificationResult::untrusted(0.0, "card signature missing or invalid");
        }

        if peer_card.is_expired_at(now) {
            warn!(did = %did, "Peer card has expired");
            return TrustVerificationResult::untrusted(0.0, "agent card has expired");
        }

        if peer_card.trust_score < min_trust_score {
            warn!(
                did = %did,
                trust_score = peer_card.trust_score,
                min_trust_score,
                "Peer trust score below minimum"
            );
            return TrustVerificationResult::untrusted(
                peer_card.trust_score,
                format!(
                    "trust score {} below minimum {}",
                    peer_card.trust_score, min_trust_score
                ),
            );
        }

        let verified_capabilities = if required_capabilities.is_empty() {
            peer_card.capabilities.clone()
        } else {
            if let Some(missing) = first_missing(required_capabilities, &peer_card.capabilities) {
                warn!(did = %did, capability = %missing, "Peer is missing a required capability");
                return TrustVerificationResult::untrusted(
                    peer_card.trust_score,
                    format!("missing required capability: {missing}"),
                );
            }
            required_capabilities.to_vec()
        };

        let mut warnings = Vec::new();
        if !peer_card.delegation_chain.is_empty() {
            warnings
                .push("delegation chain present but not cryptographically verified".to_string());
            for delegation in &peer_card.delegation_chain {
                if delegation.is_expired_at(now) {
                    warnings.push(format!(
                        "delegation from {} has expired",
                        delegation.delegator_did
                    ));
                }
            }
        }

        let result =
            TrustVerificationResult::trusted(peer_card.trust_score, verified_capabilities, warnings);
        self.store
            .put(
                did.to_string(),
                CachedVerification {
                    result: result.clone(),
                    cached_at: now,
                },
            )
            .await;
        info!(did = %did, trust_score = peer_card.trust_score, "Peer verified");

        result
    }

    /// Check whether a peer has a fresh, trusted cached verification
    pub async fn is_peer_verified(&self, did: &str) -> bool {
        match self.store.get(did).await {
            Some(cached) => {
                cached.result.trusted
                    && self.clock.now() - cached.cached_at < self.config.cache_ttl
            }
            None => false,
        }
    }
}

/// First entry of `required` not present in `advertised`
fn first_missing<'a>(required: &'a [String], advertised: &[String]) -> Option<&'a str> {
    required
        .iter()
        .find(|capability| !advertised.contains(capability))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmesh_core::{CapabilitySet, Did, PublicIdentity};

    fn local_identity() -> Identity {
        Identity::generate("local agent", CapabilitySet::new())
    }

    fn signed_peer_card(capabilities: &[&str], trust_score: f64) -> (Identity, TrustedCard) {
        let peer = Identity::generate("peer agent", CapabilitySet::new());
        let mut card = TrustedCard::builder("Peer Agent", "https://agents.example/peer")
            .capabilities(capabilities.iter().map(|c| c.to_string()).collect())
            .trust_score(trust_score)
            .build()
            .unwrap();
        card.sign(&peer).unwrap();
        (peer, card)
    }

    fn required(capabilities: &[&str]) -> Vec<String> {
        capabilities.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_card_without_identity_is_untrusted() {
        let handshake = TrustHandshake::new(local_identity());
        let card = TrustedCard::builder("Anonymous", "https://agents.example/anon")
            .trust_score(1.0)
            .build()
            .unwrap();

        let result = handshake.verify_peer(&card, &[], 0.0).await;
        assert!(!result.trusted);
        assert_eq!(result.reason, "peer has no cryptographic identity");
    }

    #[tokio::test]
    async fn test_invalid_did_format_is_untrusted() {
        let handshake = TrustHandshake::new(local_identity());
        let (_, mut card) = signed_peer_card(&["x"], 0.9);
        card.identity = Some(PublicIdentity {
            did: Did::new_unchecked("did:other:feedface"),
            public_key: card.identity.as_ref().unwrap().public_key.clone(),
        });

        let result = handshake.verify_peer(&card, &[], 0.0).await;
        assert!(!result.trusted);
        assert_eq!(result.reason, "invalid DID format");
    }

    #[tokio::test]
    async fn test_unsigned_card_is_untrusted() {
        let handshake = TrustHandshake::new(local_identity());
        let peer = Identity::generate("peer", CapabilitySet::new());
        let mut card = TrustedCard::builder("Peer", "https://agents.example/peer")
            .trust_score(0.9)
            .build()
            .unwrap();
        card.identity = Some(peer.to_public());

        let result = handshake.verify_peer(&card, &[], 0.0).await;
        assert!(!result.trusted);
        assert_eq!(result.reason, "card signature missing or invalid");
    }

    #[tokio::test]
    async fn test_tampered_card_is_untrusted() {
        let handshake = TrustHandshake::new(local_identity());
        let (_, mut card) = signed_peer_card(&["x"], 0.5);
        card.trust_score = 0.99;

        let result = handshake.verify_peer(&card, &[], 0.0).await;
        assert!(!result.trusted);
        assert_eq!(result.reason, "card signature missing or invalid");
    }

    #[tokio::test]
    async fn test_expired_card_is_untrusted() {
        let clock = Arc::new(crate::clock::ManualClock::starting_now());
        let handshake = TrustHandshake::new(local_identity()).with_clock(clock.clone());

        let peer = Identity::generate("peer", CapabilitySet::new());
        let mut card = TrustedCard::builder("Peer", "https://agents.example/peer")
            .trust_score(0.9)
            .expires_at(clock.now() + Duration::hours(1))
            .build()
            .unwrap();
        card.sign(&peer).unwrap();

        clock.advance(Duration::hours(2));
        let result = handshake.verify_peer(&card, &[], 0.0).await;
        assert!(!result.trusted);
        assert_eq!(result.reason, "agent card has expired");
    }

    #[tokio::test]
    async fn test_trust_score_below_minimum() {
        let handshake = TrustHandshake::new(local_identity());
        let (_, card) = signed_peer_card(&["x"], 0.3);

        let result = handshake.verify_peer(&card, &[], 0.5).await;
        assert!(!result.trusted);
        assert_eq!(result.trust_score, 0.3);
        assert!(result.reason.contains("below minimum"));
    }

    #[tokio::test]
    async fn test_missing_capability_reports_first_missing() {
        let handshake = TrustHandshake::new(local_identity());
        let (_, card) = signed_peer_card(&["x", "y"], 0.8);

        let result = handshake
            .verify_peer(&card, &required(&["x", "z", "q"]), 0.5)
            .await;
        assert!(!result.trusted);
        assert_eq!(result.reason, "missing required capability: z");
    }

    #[tokio::test]
    async fn test_successful_verification() {
        let handshake = TrustHandshake::new(local_identity());
        let (_, card) = signed_peer_card(&["x", "y"], 0.8);

        let result = handshake.verify_peer(&card, &required(&["x"]), 0.5).await;
        assert!(result.trusted);
        assert_eq!(result.trust_score, 0.8);
        assert_eq!(result.verified_capabilities, vec!["x"]);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_no_required_capabilities_verifies_all_advertised() {
        let handshake = TrustHandshake::new(local_identity());
        let (_, card) = signed_peer_card(&["x", "y"], 0.8);

        let result = handshake.verify_peer(&card, &[], 0.0).await;
        assert!(result.trusted);
        assert_eq!(result.verified_capabilities, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_is_peer_verified() {
        let handshake = TrustHandshake::new(local_identity());
        let (peer, card) = signed_peer_card(&["x"], 0.8);

        assert!(!handshake.is_peer_verified(peer.did().as_str()).await);
        handshake.verify_peer(&card, &[], 0.0).await;
        assert!(handshake.is_peer_verified(peer.did().as_str()).await);
    }

    #[test]
    fn test_first_missing() {
        let advertised = vec!["x".to_string(), "y".to_string()];
        assert_eq!(first_missing(&required(&["x"]), &advertised), None);
        assert_eq!(first_missing(&required(&["z"]), &advertised), Some("z"));
        assert_eq!(
            first_missing(&required(&["y", "w", "z"]), &advertised),
            Some("w")
        );
    }

    #[test]
    fn test_default_config_ttl() {
        let config = HandshakeConfig::default();
        assert_eq!(config.cache_ttl, Duration::seconds(900));
    }
}
