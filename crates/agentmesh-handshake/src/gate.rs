//! Trust-gated operations
//!
//! `TrustGatedClient` is the seam between the trust layer and whatever
//! transport actually exchanges agent messages: it runs the handshake
//! before an operation and refuses to proceed for untrusted peers. No
//! network call happens here; the surrounding RPC layer consumes the
//! returned receipt and must treat a refusal as fatal for that peer
//! interaction.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use agentmesh_core::{Did, Identity, TrustedCard};

use crate::error::{HandshakeError, Result};
use crate::handshake::{HandshakeConfig, TrustHandshake};

/// What a caller wants to run against a peer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Capabilities the peer must have for this task
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    /// Opaque task payload handed to the transport layer
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Proof that verification passed for a task about to be dispatched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReceipt {
    pub task_id: String,
    pub peer_did: Did,
    pub trust_score: f64,
    pub verified_capabilities: Vec<String>,
}

/// A client facade that requires trust verification before operations
pub struct TrustGatedClient {
    min_trust_score: f64,
    handshake: TrustHandshake,
}

impl TrustGatedClient {
    /// Create a gated client for the local identity.
    ///
    /// `min_trust_score` applies to every peer this client talks to.
    pub fn new(identity: Identity, min_trust_score: f64) -> Self {
        Self {
            min_trust_score,
            handshake: TrustHandshake::new(identity),
        }
    }

    /// Create a gated client with an explicit handshake configuration
    pub fn with_config(identity: Identity, config: HandshakeConfig, min_trust_score: f64) -> Self {
        Self {
            min_trust_score,
            handshake: TrustHandshake::with_config(identity, config),
        }
    }

    /// Create a gated client around an existing handshake
    pub fn with_handshake(handshake: TrustHandshake, min_trust_score: f64) -> Self {
        Self {
            min_trust_score,
            handshake,
        }
    }

    /// The underlying handshake (e.g. for cache inspection)
    pub fn handshake(&self) -> &TrustHandshake {
        &self.handshake
    }

    /// Verify the peer and, if trusted, produce a receipt for the task.
    ///
    /// Fails with [`HandshakeError::PeerNotTrusted`] when verification
    /// returns an untrusted result; callers must not retry more often
    /// than the cache TTL without cause.
    pub async fn create_task(
        &self,
        peer_card: &TrustedCard,
        task: &TaskSpec,
    ) -> Result<TaskReceipt> {
        let peer_did = match peer_card.identity {
            Some(ref identity) => identity.did.clone(),
            None => return Err(HandshakeError::MissingPeerIdentity),
        };

        let result = self
            .handshake
            .verify_peer(peer_card, &task.required_capabilities, self.min_trust_score)
            .await;

        if !result.trusted {
            warn!(did = %peer_did, reason = %result.reason, "Refusing task for untrusted peer");
            return Err(HandshakeError::PeerNotTrusted(result.reason));
        }

        Ok(TaskReceipt {
            task_id: format!("task-{}", Uuid::new_v4()),
            peer_did,
            trust_score: result.trust_score,
            verified_capabilities: result.verified_capabilities,
        })
    }
}
