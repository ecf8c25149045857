//! # agentmesh-handshake
//!
//! The verification engine a caller invokes before interacting with a
//! peer agent. It evaluates a [`TrustedCard`](agentmesh_core::TrustedCard)
//! against policy (minimum trust score, required capabilities) and caches
//! the outcome per DID with a time-to-live.
//!
//! ## Verification sequence
//!
//! 1. Fresh cached result for the peer DID → reuse it, but re-check the
//!    required capabilities against the card's current advertised list
//! 2. No identity on the card → untrusted
//! 3. DID does not match the CMVK scheme → untrusted
//! 4. Card signature missing or invalid → untrusted
//! 5. Card expired → untrusted
//! 6. Trust score below the minimum → untrusted
//! 7. A required capability is missing → untrusted (first one reported)
//! 8. An attached delegation chain is advisory: recorded as a warning,
//!    never a substitute for the checks above
//! 9. Success → cached per DID and returned
//!
//! Every failure is a normal `TrustVerificationResult`, never an error;
//! the layer fails closed on any ambiguity. Verification is a bounded
//! computation over card and chain data that is assumed already
//! retrieved; no network I/O happens here.

pub mod cache;
pub mod clock;
pub mod error;
pub mod gate;
pub mod handshake;
pub mod result;

pub use cache::{CachedVerification, MemoryStore, VerificationStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{HandshakeError, Result};
pub use gate::{TaskReceipt, TaskSpec, TrustGatedClient};
pub use handshake::{HandshakeConfig, TrustHandshake};
pub use result::TrustVerificationResult;
