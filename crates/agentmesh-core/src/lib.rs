//! # agentmesh-core
//!
//! Identity, card, and delegation primitives for the agentmesh trust
//! layer: a decentralized scheme that lets autonomous agents prove who
//! they are, advertise capabilities, and delegate subsets of those
//! capabilities to other agents.
//!
//! ## Key Concepts
//!
//! - **Identity**: an Ed25519 key pair named by a `did:cmvk:` identifier
//! - **TrustedCard**: agent metadata bound to an identity by a signature
//!   over a canonical serialization
//! - **Delegation / DelegationChain**: signed, strictly linear capability
//!   transfer from a root authority to any descendant
//! - **CapabilityProof**: a signed statement that an agent holds a
//!   capability
//!
//! ## Trust invariants
//!
//! 1. **Authenticity**: every card and delegation signature must verify
//!    against the signer's public key over deterministic bytes
//! 2. **Linearity**: a delegation chain starts at its root and each link's
//!    delegator is the previous link's delegatee
//! 3. **Fail-closed**: unknown delegators, expired links, and malformed
//!    material all verify as `false`, never as trusted

pub mod capability;
pub mod card;
pub mod delegation;
pub mod did;
pub mod error;
pub mod identity;
pub mod proof;
pub mod time;

pub use capability::CapabilitySet;
pub use card::{TrustedCard, TrustedCardBuilder, TRUST_EXTENSION_VERSION};
pub use delegation::{Delegation, DelegationChain};
pub use did::{Did, DID_PREFIX};
pub use error::{Result, TrustError};
pub use identity::{Identity, PublicIdentity, Signature, SIGNATURE_ALGORITHM};
pub use proof::CapabilityProof;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}
