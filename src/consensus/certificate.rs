//! Certificate Issuer (spec.md §4.9): assembles and signs the PoH
//! Certificate from a verdict. Contains only statistical summaries; never
//! cell identifiers, coordinates, or breadcrumb timestamps.

use crate::core::encoding::encode_certificate_payload;
use crate::core::errors::VerifierResult;
use crate::core::types::{Hash32, IdentityKey, PohCertificate, Verdict};
use crate::core::utils::{current_timestamp_secs, sign_data};

/// How long an issued certificate remains valid, in seconds. Distinct
/// from the challenge deadline: this governs relying-party caching, not
/// liveness freshness.
pub const CERTIFICATE_VALIDITY_SECS: u64 = 24 * 60 * 60;

/// Assemble and sign a PoH Certificate. `epoch_count` is the number of
/// sealed epochs on the chain at issuance time; `nonce` and
/// `chain_head_hash` bind the certificate to the relying party's
/// challenge and to a consistent chain snapshot (spec.md §5, "Ordering
/// guarantees").
pub fn issue_certificate(
    identity: IdentityKey,
    epoch_count: u64,
    verdict: &Verdict,
    nonce: [u8; 16],
    chain_head_hash: Hash32,
    signing_key: &[u8],
) -> VerifierResult<PohCertificate> {
    let mut certificate = PohCertificate {
        identity,
        issuance_timestamp: current_timestamp_secs(),
        epoch_count,
        alpha: verdict.alpha,
        beta: verdict.beta,
        kappa_km: verdict.kappa_km,
        predictability: verdict.predictability,
        criticality_confidence: verdict.criticality_confidence,
        trust_score: verdict.trust_score,
        unique_cell_count: verdict.unique_cell_count,
        total_breadcrumb_count: verdict.total_breadcrumb_count,
        validity_duration_secs: CERTIFICATE_VALIDITY_SECS,
        nonce,
        chain_head_hash,
        signature: [0u8; 64],
    };

    let payload = encode_certificate_payload(&certificate);
    certificate.signature = sign_data(signing_key, &payload)?;
    Ok(certificate)
}

/// Verify a certificate's signature against the Verifier identity that
/// issued it. Relying parties additionally check `nonce` and
/// `chain_head_hash` against their own challenge records.
pub fn verify_certificate_signature(certificate: &PohCertificate, verifier_identity: &IdentityKey) -> VerifierResult<bool> {
    let payload = encode_certificate_payload(certificate);
    crate::core::utils::verify_signature(verifier_identity, &payload, &certificate.signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AlertLevel, Classification};
    use ed25519_dalek::{PublicKey, SecretKey};

    fn verdict() -> Verdict {
        Verdict {
            alpha: 0.55,
            alpha_r_squared: 0.9,
            beta: 1.75,
            kappa_km: 8.0,
            predictability: 0.8,
            criticality_confidence: 0.9,
            trust_score: 72.0,
            classification: Classification::Human,
            alert_level: AlertLevel::Nominal,
            unique_cell_count: 40,
            total_breadcrumb_count: 256,
            consistency_warning: false,
        }
    }

    #[test]
    fn issued_certificates_verify_and_omit_raw_location() {
        let secret = SecretKey::from_bytes(&[42u8; 32]).unwrap();
        let public = PublicKey::from(&secret);
        let verifier_identity = public.to_bytes();

        let certificate = issue_certificate(
            [1u8; 32],
            3,
            &verdict(),
            [9u8; 16],
            [10u8; 32],
            &secret.to_bytes(),
        )
        .unwrap();

        assert!(verify_certificate_signature(&certificate, &verifier_identity).unwrap());
        assert_eq!(certificate.nonce, [9u8; 16]);
        assert_eq!(certificate.chain_head_hash, [10u8; 32]);
    }

    #[test]
    fn tampering_with_the_trust_score_breaks_the_signature() {
        let secret = SecretKey::from_bytes(&[43u8; 32]).unwrap();
        let public = PublicKey::from(&secret);
        let verifier_identity = public.to_bytes();

        let mut certificate = issue_certificate([1u8; 32], 1, &verdict(), [1u8; 16], [2u8; 32], &secret.to_bytes()).unwrap();
        certificate.trust_score = 99.9;
        assert!(!verify_certificate_signature(&certificate, &verifier_identity).unwrap());
    }
}
