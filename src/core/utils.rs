use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signature, Signer, Verifier as DalekVerifier};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::errors::{VerifierError, VerifierResult};
use crate::core::types::{Hash32, IdentityKey, Signature64};

/// Compute SHA-256 of arbitrary data.
pub fn compute_sha256(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Current Unix time in whole seconds.
pub fn current_timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Sign `data` with an Ed25519 private key.
pub fn sign_data(private_key: &[u8], data: &[u8]) -> VerifierResult<Signature64> {
    if private_key.len() != 32 {
        return Err(VerifierError::InvalidIdentitySize(private_key.len()));
    }
    let secret_key = SecretKey::from_bytes(private_key)
        .map_err(|e| VerifierError::CryptographicError(format!("invalid private key: {e}")))?;
    let public_key = PublicKey::from(&secret_key);
    let keypair = Keypair {
        secret: secret_key,
        public: public_key,
    };
    let signature = keypair.sign(data);
    Ok(signature.to_bytes())
}

/// Verify an Ed25519 signature over `data`.
pub fn verify_signature(
    identity: &IdentityKey,
    data: &[u8],
    signature: &Signature64,
) -> VerifierResult<bool> {
    let public_key = PublicKey::from_bytes(identity)
        .map_err(|e| VerifierError::CryptographicError(format!("invalid identity key: {e}")))?;
    let signature = Signature::from_bytes(signature)
        .map_err(|e| VerifierError::CryptographicError(format!("invalid signature: {e}")))?;
    Ok(public_key.verify(data, &signature).is_ok())
}

/// Wall-clock operation timer, logged but never folded into deterministic
/// output.
pub struct PerformanceTimer {
    start: std::time::Instant,
    operation_name: &'static str,
}

impl PerformanceTimer {
    pub fn new(operation_name: &'static str) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation_name,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn finish(self) -> u64 {
        let elapsed = self.elapsed_ms();
        log::debug!("{} took {}ms", self.operation_name, elapsed);
        elapsed
    }
}

/// Median of an f64 slice. Used by the rolling Hamiltonian baseline and
/// the heavy-tail fit's quality metric.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
