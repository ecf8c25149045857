//! Trusted agent cards
//!
//! A `TrustedCard` is an agent's advertised metadata (name, endpoint,
//! capabilities, I/O modes) bound to an identity by an Ed25519 signature
//! over a canonical serialization. Any field change after signing
//! invalidates the signature until the card is re-signed.
//!
//! ## Canonical serialization
//!
//! The signable content is JSON with lexicographically sorted object keys,
//! a sorted and deduplicated capability list, and RFC 3339 timestamps at
//! microsecond precision. Implementations in other languages must agree
//! byte-for-byte on this encoding; it is the wire contract signature
//! portability depends on.
//!
//! ## Wire form
//!
//! `to_wire` / `from_wire` exchange the card as a JSON document whose
//! trust metadata lives under a top-level `_agentmesh` extension object.
//! The round trip is lossless, including nested delegations, capability
//! proofs, and signature timestamps.

use crate::capability::CapabilitySet;
use crate::delegation::Delegation;
use crate::did::Did;
use crate::error::{Result, TrustError};
use crate::identity::{Identity, PublicIdentity, Signature};
use crate::proof::CapabilityProof;
use crate::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version tag of the `_agentmesh` trust extension
pub const TRUST_EXTENSION_VERSION: &str = "1.0";

/// Default input/output mode advertised when none is specified
const DEFAULT_MODE: &str = "text";

/// An agent card with trust metadata
///
/// Constructed via [`TrustedCard::builder`] with the trust fields at their
/// defaults; [`TrustedCard::sign`] attaches the identity and signature
/// atomically. The `identity` field holds public key material only; a
/// card never carries a private key.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustedCard {
    pub name: String,
    pub description: String,
    /// URL the agent is reachable at
    pub endpoint: String,
    pub capabilities: Vec<String>,
    pub input_modes: Vec<String>,
    pub output_modes: Vec<String>,

    pub identity: Option<PublicIdentity>,
    /// Externally assigned reputation in `0.0..=1.0`
    pub trust_score: f64,
    pub capability_proofs: BTreeMap<String, CapabilityProof>,
    pub delegation_chain: Vec<Delegation>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub card_signature: Option<Signature>,
}

impl TrustedCard {
    /// Create a builder for constructing cards
    pub fn builder(name: impl Into<String>, endpoint: impl Into<String>) -> TrustedCardBuilder {
        TrustedCardBuilder::new(name, endpoint)
    }

    /// Sign this card with the given identity.
    ///
    /// Attaches the identity's public material and a signature over the
    /// canonical serialization in one step. Calling again after mutating
    /// the card re-signs over the new content.
    pub fn sign(&mut self, identity: &Identity) -> Result<()> {
        self.identity = Some(identity.to_public());
        let payload = self.canonical_bytes()?;
        self.card_signature = Some(identity.sign(&payload)?);
        Ok(())
    }

    /// Verify the card signature against the attached identity.
    ///
    /// Returns `false` when no identity or signature is attached, or when
    /// the signature does not cover the card's current canonical bytes.
    pub fn verify_signature(&self) -> bool {
        let identity = match self.identity {
            Some(ref identity) => identity,
            None => return false,
        };
        let signature = match self.card_signature {
            Some(ref signature) => signature,
            None => return false,
        };
        let payload = match self.canonical_bytes() {
            Ok(payload) => payload,
            Err(_) => return false,
        };
        identity.verify(&payload, signature)
    }

    /// The canonical signable serialization of this card.
    ///
    /// Covers every field except the signature itself. Requires an
    /// attached identity, since the signer's DID and public key are part
    /// of the signed content.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let identity = match self.identity {
            Some(ref identity) => identity,
            None => return Err(TrustError::MissingField("identity".into())),
        };

        let capabilities: CapabilitySet = self.capabilities.iter().cloned().collect();
        let canonical = CanonicalCard {
            name: &self.name,
            description: &self.description,
            url: &self.endpoint,
            capabilities: capabilities.canonical_vec(),
            input_modes: &self.input_modes,
            output_modes: &self.output_modes,
            identity: CanonicalIdentity {
                did: &identity.did,
                public_key: &identity.public_key,
            },
            trust_score: self.trust_score,
            capability_proofs: &self.capability_proofs,
            delegation_chain: &self.delegation_chain,
            issued_at: time::rfc3339_micros(&self.issued_at),
            expires_at: self.expires_at.as_ref().map(time::rfc3339_micros),
        };

        // Round-tripping through Value re-keys every object as a BTreeMap,
        // which is what makes the encoding independent of field order.
        let value = serde_json::to_value(&canonical)?;
        serde_json::to_vec(&value).map_err(TrustError::from)
    }

    /// Whether the card has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at <= now)
    }

    /// Export as a JSON document with the `_agentmesh` trust extension.
    ///
    /// The extension is emitted only when an identity is attached; an
    /// unsigned card exports as a plain agent card.
    pub fn to_wire(&self) -> Result<String> {
        let agentmesh = self.identity.as_ref().map(|identity| WireTrustExtension {
            version: TRUST_EXTENSION_VERSION.to_string(),
            identity: WireIdentity {
                did: identity.did.clone(),
                public_key: identity.public_key.clone(),
            },
            trust_score: self.trust_score,
            capability_proofs: self.capability_proofs.clone(),
            delegation_chain: self.delegation_chain.clone(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            card_signature: self.card_signature.clone(),
        });

        let wire = WireCard {
            name: self.name.clone(),
            description: self.description.clone(),
            url: self.endpoint.clone(),
            capabilities: self.capabilities.clone(),
            input_modes: self.input_modes.clone(),
            output_modes: self.output_modes.clone(),
            agentmesh,
        };

        serde_json::to_string_pretty(&wire).map_err(TrustError::from)
    }

    /// Import a card from its wire form.
    pub fn from_wire(document: &str) -> Result<Self> {
        let wire: WireCard = serde_json::from_str(document)?;

        let mut card = TrustedCard {
            name: wire.name,
            description: wire.description,
            endpoint: wire.url,
            capabilities: wire.capabilities,
            input_modes: wire.input_modes,
            output_modes: wire.output_modes,
            identity: None,
            trust_score: 0.0,
            capability_proofs: BTreeMap::new(),
            delegation_chain: Vec::new(),
            issued_at: time::utc_now_micros(),
            expires_at: None,
            card_signature: None,
        };

        if let Some(mesh) = wire.agentmesh {
            card.identity = Some(PublicIdentity {
                did: mesh.identity.did,
                public_key: mesh.identity.public_key,
            });
            card.trust_score = mesh.trust_score;
            card.capability_proofs = mesh.capability_proofs;
            card.delegation_chain = mesh.delegation_chain;
            card.issued_at = mesh.issued_at;
            card.expires_at = mesh.expires_at;
            card.card_signature = mesh.card_signature;
        }

        Ok(card)
    }
}

/// Builder for constructing [`TrustedCard`] instances
#[derive(Debug)]
pub struct TrustedCardBuilder {
    name: String,
    description: String,
    endpoint: String,
    capabilities: Vec<String>,
    input_modes: Vec<String>,
    output_modes: Vec<String>,
    trust_score: f64,
    capability_proofs: BTreeMap<String, CapabilityProof>,
    delegation_chain: Vec<Delegation>,
    expires_at: Option<DateTime<Utc>>,
}

impl TrustedCardBuilder {
    /// Create a builder; name and endpoint are the only required fields
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            endpoint: endpoint.into(),
            capabilities: Vec::new(),
            input_modes: vec![DEFAULT_MODE.to_string()],
            output_modes: vec![DEFAULT_MODE.to_string()],
            trust_score: 0.0,
            capability_proofs: BTreeMap::new(),
            delegation_chain: Vec::new(),
            expires_at: None,
        }
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a single advertised capability
    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Set all advertised capabilities
    pub fn capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the accepted input modes
    pub fn input_modes(mut self, modes: Vec<String>) -> Self {
        self.input_modes = modes;
        self
    }

    /// Set the produced output modes
    pub fn output_modes(mut self, modes: Vec<String>) -> Self {
        self.output_modes = modes;
        self
    }

    /// Set the externally assigned trust score
    pub fn trust_score(mut self, trust_score: f64) -> Self {
        self.trust_score = trust_score;
        self
    }

    /// Attach a capability proof
    pub fn capability_proof(mut self, proof: CapabilityProof) -> Self {
        self.capability_proofs.insert(proof.capability.clone(), proof);
        self
    }

    /// Attach delegation-chain links as supporting evidence
    pub fn delegation_chain(mut self, delegations: Vec<Delegation>) -> Self {
        self.delegation_chain = delegations;
        self
    }

    /// Set the card expiry
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Build the card.
    ///
    /// Returns an error if the name or endpoint is empty.
    pub fn build(self) -> Result<TrustedCard> {
        if self.name.is_empty() {
            return Err(TrustError::MissingField("name".into()));
        }
        if self.endpoint.is_empty() {
            return Err(TrustError::MissingField("endpoint".into()));
        }

        Ok(TrustedCard {
            name: self.name,
            description: self.description,
            endpoint: self.endpoint,
            capabilities: self.capabilities,
            input_modes: self.input_modes,
            output_modes: self.output_modes,
            identity: None,
            trust_score: self.trust_score,
            capability_proofs: self.capability_proofs,
            delegation_chain: self.delegation_chain,
            issued_at: time::utc_now_micros(),
            expires_at: self.expires_at,
            card_signature: None,
        })
    }
}

/// Signable view of a card; serialized through `Value` so keys sort
#[derive(Serialize)]
struct CanonicalCard<'a> {
    name: &'a str,
    description: &'a str,
    url: &'a str,
    capabilities: Vec<String>,
    input_modes: &'a [String],
    output_modes: &'a [String],
    identity: CanonicalIdentity<'a>,
    trust_score: f64,
    capability_proofs: &'a BTreeMap<String, CapabilityProof>,
    delegation_chain: &'a [Delegation],
    issued_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<String>,
}

#[derive(Serialize)]
struct CanonicalIdentity<'a> {
    did: &'a Did,
    public_key: &'a str,
}

/// Wire document form of a card
#[derive(Serialize, Deserialize)]
struct WireCard {
    name: String,
    #[serde(default)]
    description: String,
    url: String,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default = "default_modes")]
    input_modes: Vec<String>,
    #[serde(default = "default_modes")]
    output_modes: Vec<String>,
    #[serde(rename = "_agentmesh", skip_serializing_if = "Option::is_none", default)]
    agentmesh: Option<WireTrustExtension>,
}

/// The `_agentmesh` trust extension object
#[derive(Serialize, Deserialize)]
struct WireTrustExtension {
    version: String,
    identity: WireIdentity,
    trust_score: f64,
    #[serde(default)]
    capability_proofs: BTreeMap<String, CapabilityProof>,
    #[serde(default)]
    delegation_chain: Vec<Delegation>,
    #[serde(with = "crate::time::serde_micros")]
    issued_at: DateTime<Utc>,
    #[serde(
        with = "crate::time::serde_micros_opt",
        skip_serializing_if = "Option::is_none",
        default
    )]
    expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    card_signature: Option<Signature>,
}

#[derive(Serialize, Deserialize)]
struct WireIdentity {
    did: Did,
    public_key: String,
}

fn default_modes() -> Vec<String> {
    vec![DEFAULT_MODE.to_string()]
}
