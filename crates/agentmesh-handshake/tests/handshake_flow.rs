//! Integration Tests for the Trust Handshake
//!
//! These tests exercise the full verification flow a transport layer
//! would drive: signed cards arriving from peers, policy checks, the
//! per-DID cache with TTL, and the trust-gated client facade.

use std::sync::Arc;

use chrono::Duration;

use agentmesh_core::{CapabilitySet, DelegationChain, Identity, TrustedCard};
use agentmesh_handshake::{
    HandshakeConfig, HandshakeError, ManualClock, TaskSpec, TrustGatedClient, TrustHandshake,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn identity(label: &str, capabilities: &[&str]) -> Identity {
    Identity::generate(label, capabilities.iter().copied().collect())
}

fn local() -> Identity {
    identity("local orchestrator", &[])
}

fn signed_card(signer: &Identity, capabilities: &[&str], trust_score: f64) -> TrustedCard {
    let mut card = TrustedCard::builder(signer.label(), "https://agents.example/peer")
        .capabilities(capabilities.iter().map(|c| c.to_string()).collect())
        .trust_score(trust_score)
        .build()
        .unwrap();
    card.sign(signer).unwrap();
    card
}

fn required(capabilities: &[&str]) -> Vec<String> {
    capabilities.iter().map(|c| c.to_string()).collect()
}

// =============================================================================
// Policy scenarios
// =============================================================================

/// An identity signs a card with capabilities {x, y} and score 0.8;
/// requiring `x` at minimum score 0.5 yields a trusted result verifying
/// exactly `x`.
#[tokio::test]
async fn scenario_trusted_peer_with_required_capability() {
    let peer = identity("peer", &[]);
    let card = signed_card(&peer, &["x", "y"], 0.8);
    let handshake = TrustHandshake::new(local());

    let result = handshake.verify_peer(&card, &required(&["x"]), 0.5).await;

    assert!(result.trusted);
    assert_eq!(result.trust_score, 0.8);
    assert_eq!(result.verified_capabilities, vec!["x"]);
    assert!(peer.did().is_valid());
}

/// The same card fails when `z` is required, with the missing capability
/// named in the reason.
#[tokio::test]
async fn scenario_missing_capability_is_cited() {
    let peer = identity("peer", &[]);
    let card = signed_card(&peer, &["x", "y"], 0.8);
    let handshake = TrustHandshake::new(local());

    let result = handshake.verify_peer(&card, &required(&["z"]), 0.5).await;

    assert!(!result.trusted);
    assert!(result.reason.contains('z'));
}

/// A card without identity is untrusted regardless of its trust score.
#[tokio::test]
async fn scenario_no_identity_trumps_trust_score() {
    let card = TrustedCard::builder("Anonymous", "https://agents.example/anon")
        .trust_score(1.0)
        .build()
        .unwrap();
    let handshake = TrustHandshake::new(local());

    let result = handshake.verify_peer(&card, &[], 0.0).await;

    assert!(!result.trusted);
    assert_eq!(result.trust_score, 0.0);
}

/// A delegation chain attached to a card is advisory: it produces
/// warnings, not a verdict.
#[tokio::test]
async fn scenario_attached_chain_warns_but_does_not_gate() {
    let root = identity("root", &["deploy"]);
    let peer = identity("peer", &[]);

    let mut chain = DelegationChain::new(root);
    chain
        .add_delegation(
            &peer.to_public(),
            ["deploy"].into_iter().collect::<CapabilitySet>(),
            None,
            None,
            Some(Duration::hours(-1)),
        )
        .unwrap();

    let mut card = TrustedCard::builder("Peer", "https://agents.example/peer")
        .capabilities(vec!["deploy".into()])
        .trust_score(0.8)
        .delegation_chain(chain.delegations().to_vec())
        .build()
        .unwrap();
    card.sign(&peer).unwrap();

    let handshake = TrustHandshake::new(local());
    let result = handshake.verify_peer(&card, &[], 0.5).await;

    assert!(result.trusted);
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings[0].contains("not cryptographically verified"));
    assert!(result.warnings[1].contains("has expired"));
}

// =============================================================================
// Cache behavior
// =============================================================================

/// Within the TTL the cached result is reused; after the TTL a fresh
/// verification must run. Tampering with the card between calls makes the
/// difference observable.
#[tokio::test]
async fn cache_ttl_expiry_forces_revalidation() {
    let clock = Arc::new(ManualClock::starting_now());
    let handshake = TrustHandshake::with_config(local(), HandshakeConfig::default())
        .with_clock(clock.clone());

    let peer = identity("peer", &[]);
    let mut card = signed_card(&peer, &["x"], 0.8);

    let first = handshake.verify_peer(&card, &required(&["x"]), 0.5).await;
    assert!(first.trusted);

    // Invalidate the card's signature; a cache hit will not notice
    card.trust_score = 0.9;

    clock.advance(Duration::seconds(899));
    let cached = handshake.verify_peer(&card, &required(&["x"]), 0.5).await;
    assert!(cached.trusted);
    assert_eq!(cached.trust_score, 0.8);

    // Past the TTL the stale entry is treated as absent and the tampered
    // card fails fresh verification
    clock.advance(Duration::seconds(2));
    let fresh = handshake.verify_peer(&card, &required(&["x"]), 0.5).await;
    assert!(!fresh.trusted);
    assert_eq!(fresh.reason, "card signature missing or invalid");
}

/// Required capabilities are re-checked against the card's current
/// advertised list even on a cache hit.
#[tokio::test]
async fn cache_hit_still_rechecks_capabilities() {
    let handshake = TrustHandshake::new(local());
    let peer = identity("peer", &[]);

    let card = signed_card(&peer, &["x", "y"], 0.8);
    let first = handshake.verify_peer(&card, &required(&["y"]), 0.5).await;
    assert!(first.trusted);

    // The peer re-advertises without `y`; identity trust is cached but the
    // capability check must fail
    let revoked = signed_card(&peer, &["x"], 0.8);

    let result = handshake.verify_peer(&revoked, &required(&["y"]), 0.5).await;
    assert!(!result.trusted);
    assert_eq!(result.reason, "missing required capability: y");

    // A capability the peer still advertises passes from cache
    let ok = handshake.verify_peer(&revoked, &required(&["x"]), 0.5).await;
    assert!(ok.trusted);
}

/// `is_peer_verified` reflects cache freshness.
#[tokio::test]
async fn is_peer_verified_expires_with_ttl() {
    let clock = Arc::new(ManualClock::starting_now());
    let handshake = TrustHandshake::with_config(local(), HandshakeConfig::default())
        .with_clock(clock.clone());

    let peer = identity("peer", &[]);
    let card = signed_card(&peer, &["x"], 0.8);

    handshake.verify_peer(&card, &[], 0.0).await;
    assert!(handshake.is_peer_verified(peer.did().as_str()).await);

    clock.advance(Duration::seconds(901));
    assert!(!handshake.is_peer_verified(peer.did().as_str()).await);
}

/// Separate handshake instances keep separate cache state.
#[tokio::test]
async fn caches_are_instance_owned() {
    let strict = TrustHandshake::new(local());
    let lenient = TrustHandshake::new(local());

    let peer = identity("peer", &[]);
    let card = signed_card(&peer, &["x"], 0.8);

    lenient.verify_peer(&card, &[], 0.0).await;
    assert!(lenient.is_peer_verified(peer.did().as_str()).await);
    assert!(!strict.is_peer_verified(peer.did().as_str()).await);
}

// =============================================================================
// Trust-gated client
// =============================================================================

/// The gated client dispatches for trusted peers and is fatal otherwise.
#[tokio::test]
async fn gated_client_enforces_verification() {
    let client = TrustGatedClient::new(local(), 0.5);

    let good_peer = identity("good peer", &[]);
    let good_card = signed_card(&good_peer, &["research"], 0.8);
    let task = TaskSpec {
        required_capabilities: required(&["research"]),
        payload: serde_json::json!({ "query": "quarterly metrics" }),
    };

    let receipt = client.create_task(&good_card, &task).await.unwrap();
    assert_eq!(&receipt.peer_did, good_peer.did());
    assert_eq!(receipt.verified_capabilities, vec!["research"]);

    let shady_peer = identity("shady peer", &[]);
    let shady_card = signed_card(&shady_peer, &["research"], 0.1);

    let refused = client.create_task(&shady_card, &task).await;
    match refused {
        Err(HandshakeError::PeerNotTrusted(reason)) => {
            assert!(reason.contains("below minimum"));
        }
        other => panic!("expected PeerNotTrusted, got {other:?}"),
    }
}

/// End to end: a delegated capability travels from root to a worker whose
/// card carries the chain; the verifier checks the chain fail-closed with
/// registered identities.
#[tokio::test]
async fn end_to_end_delegated_deploy() {
    let root = identity("root authority", &["deploy"]);
    let worker = identity("worker", &[]);

    let mut chain = DelegationChain::new(root.clone());
    chain
        .add_delegation(
            &worker.to_public(),
            ["deploy"].into_iter().collect::<CapabilitySet>(),
            None,
            None,
            Some(Duration::hours(24)),
        )
        .unwrap();
    assert!(chain.verify());

    let mut card = TrustedCard::builder("Worker", "https://agents.example/worker")
        .capabilities(vec!["deploy".into()])
        .trust_score(0.7)
        .delegation_chain(chain.delegations().to_vec())
        .build()
        .unwrap();
    card.sign(&worker).unwrap();

    let handshake = TrustHandshake::new(local());
    let result = handshake.verify_peer(&card, &required(&["deploy"]), 0.5).await;

    assert!(result.trusted);
    assert_eq!(result.verified_capabilities, vec!["deploy"]);
    // The chain rode along as advisory evidence
    assert!(!result.warnings.is_empty());

    // After the delegation window the chain itself fails closed
    let now = agentmesh_core::time::utc_now_micros();
    assert!(!chain.verify_at(now + Duration::hours(25)));
}
