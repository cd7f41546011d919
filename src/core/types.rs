use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Public key anchoring a breadcrumb chain. Opaque and immutable.
pub type IdentityKey = [u8; 32];

/// Hexagonal cell identifier at a configured resolution (7..10).
pub type CellId = u64;

/// SHA-256 digest, used for predecessor/chain-head/context hashes.
pub type Hash32 = [u8; 32];

/// Ed25519 signature bytes.
pub type Signature64 = [u8; 64];

/// One signed, spatially-quantized location attestation.
///
/// Field order 0..8 matches the wire encoding in spec.md §6; the
/// canonical encoding in `core::encoding` re-encodes fields 0..7 (the
/// signed payload) before verifying field 8.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub index: u64,
    pub identity: IdentityKey,
    pub timestamp: u64,
    pub cell: CellId,
    pub resolution: u8,
    pub context_digest: Hash32,
    /// `None` only legal at index 0 (explicit null sentinel on the wire).
    pub prev_hash: Option<Hash32>,
    pub meta: BTreeMap<String, String>,
    pub signature: Signature64,
}

impl Breadcrumb {
    pub fn has_exploration_flag(&self) -> bool {
        matches!(self.meta.get("exploration").map(String::as_str), Some("true"))
    }
}

/// A sealed, immutable group of consecutive breadcrumbs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Epoch {
    pub epoch_number: u64,
    pub identity: IdentityKey,
    pub first_index: u64,
    pub last_index: u64,
    pub first_timestamp: u64,
    pub last_timestamp: u64,
    pub merkle_root: Hash32,
    pub unique_cell_count: u64,
    pub signature: Signature64,
}

/// One great-circle displacement between consecutive breadcrumbs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    /// Great-circle distance between cell centroids, in kilometers.
    /// Clamped to a 1-meter floor for degenerate (zero-distance) cases.
    pub delta_r_km: f64,
    /// Timestamp difference in seconds.
    pub delta_t_s: f64,
}

/// Classification tag assigned to a chain by the Criticality Engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Human,
    Suspicious,
    Synthetic,
    InsufficientData,
}

/// Alert level produced by the Hamiltonian Scorer's rolling baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Nominal,
    Elevated,
    Suspicious,
    Critical,
}

/// Spectral fit result: scaling exponent and goodness-of-fit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectralFit {
    pub alpha: f64,
    pub r_squared: f64,
}

/// Truncated heavy-tail fit result.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeavyTailFit {
    pub beta: f64,
    pub kappa_km: f64,
    /// Percentile placement of the observed maximum against the fit.
    pub quality: f64,
}

/// A verdict snapshot produced by the Criticality Engine (spec.md §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub alpha: f64,
    pub alpha_r_squared: f64,
    pub beta: f64,
    pub kappa_km: f64,
    pub predictability: f64,
    pub criticality_confidence: f64,
    pub trust_score: f64,
    pub classification: Classification,
    pub alert_level: AlertLevel,
    pub unique_cell_count: u64,
    pub total_breadcrumb_count: u64,
    /// Set when the §4.4 internal-consistency check between α and β fails.
    /// Advisory only; never affects classification.
    pub consistency_warning: bool,
}

/// The serialized Proof-of-Humanity attestation (spec.md §3, field order
/// 0..14 per §6). Contains only statistical summaries: no cell ids,
/// coordinates, or breadcrumb timestamps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PohCertificate {
    pub identity: IdentityKey,
    pub issuance_timestamp: u64,
    pub epoch_count: u64,
    pub alpha: f64,
    pub beta: f64,
    pub kappa_km: f64,
    pub predictability: f64,
    pub criticality_confidence: f64,
    pub trust_score: f64,
    pub unique_cell_count: u64,
    pub total_breadcrumb_count: u64,
    pub validity_duration_secs: u64,
    pub nonce: [u8; 16],
    pub chain_head_hash: Hash32,
    pub signature: Signature64,
}

/// VerificationRequest: relying party asks the Verifier to challenge an
/// identity for liveness (spec.md §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub identity: IdentityKey,
    pub nonce: [u8; 16],
    pub request_timestamp: u64,
    pub freshness_window_secs: u64,
}

/// LivenessChallenge: Verifier to Attester.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LivenessChallenge {
    pub nonce: [u8; 16],
    pub verifier_identity: IdentityKey,
    pub challenge_timestamp: u64,
    pub response_deadline_secs: u64,
}

/// LivenessResponse: Attester to Verifier. Signature covers fields 0..3
/// (nonce_echo, chain_head_hash, response_timestamp, current_index) in
/// their canonical encoding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub nonce_echo: [u8; 16],
    pub chain_head_hash: Hash32,
    pub response_timestamp: u64,
    pub current_index: u64,
    pub signature: Signature64,
}

/// Failure reasons for a completed (non-certificate-issuing) challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeFailure {
    TimedOut,
    Cancelled,
    NonceMismatch,
    HeadHashMismatch,
    StaleIndex,
    StaleTimestamp,
    InvalidSignature,
}
