//! Verification results

use serde::{Deserialize, Serialize};

/// The outcome of a peer verification
///
/// Immutable; produced once per verification attempt and cached by the
/// handshake keyed on the peer's DID. Callers gating an operation must
/// treat `trusted == false` as fatal for that interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustVerificationResult {
    pub trusted: bool,
    pub trust_score: f64,
    /// Human-readable cause of the decision
    pub reason: String,
    pub verified_capabilities: Vec<String>,
    /// Non-fatal concerns, e.g. an advisory delegation chain that was not
    /// cryptographically verified
    pub warnings: Vec<String>,
}

impl TrustVerificationResult {
    /// A failed verification with the given cause
    pub fn untrusted(trust_score: f64, reason: impl Into<String>) -> Self {
        Self {
            trusted: false,
            trust_score,
            reason: reason.into(),
            verified_capabilities: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// A successful verification
    pub fn trusted(
        trust_score: f64,
        verified_capabilities: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            trusted: true,
            trust_score,
            reason: "verification successful".to_string(),
            verified_capabilities,
            warnings,
        }
    }
}
