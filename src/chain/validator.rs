//! Chain Validator (spec.md §4.1): cryptographic and structural validation
//! of a breadcrumb chain extension.

use crate::chain::state::Chain;
use crate::core::encoding::{decode_breadcrumb_sequence, encode_breadcrumb_full, encode_breadcrumb_payload};
use crate::core::errors::{VerifierError, VerifierResult};
use crate::core::logging::performance::{PerformanceCategory, VerifierPerformanceLogger};
use crate::core::types::Breadcrumb;
use crate::core::utils::{compute_sha256, verify_signature, PerformanceTimer};
use crate::core::VerifierConfig;

/// Validates and appends breadcrumbs onto an existing (possibly empty)
/// chain. Stateless across calls beyond the `Chain` it mutates; holds no
/// internal caches of its own.
pub struct ChainValidator<'a> {
    config: &'a VerifierConfig,
}

impl<'a> ChainValidator<'a> {
    pub fn new(config: &'a VerifierConfig) -> Self {
        Self { config }
    }

    /// Decode `raw` as a back-to-back sequence of canonical breadcrumbs
    /// and validate+append each onto `chain` in order. Stops at (and
    /// reports) the first failing breadcrumb; breadcrumbs validated
    /// before the failure are still appended, matching the Verifier's
    /// never-repair, never-rollback policy for already-accepted data.
    pub fn validate_and_append(&self, chain: &mut Chain, raw: &[u8]) -> VerifierResult<()> {
        let timer = PerformanceTimer::new("chain_validate_and_append");
        let breadcrumbs = decode_breadcrumb_sequence(raw)?;
        for breadcrumb in breadcrumbs {
            self.validate_one(chain, breadcrumb)?;
        }
        timer.finish();
        Ok(())
    }

    /// Validate and append a single already-decoded breadcrumb. Exposed
    /// directly so callers that receive breadcrumbs pre-decoded (e.g. the
    /// operational harness, which speaks line-delimited JSON) don't need
    /// to round-trip through the canonical encoding first.
    pub fn validate_one(&self, chain: &mut Chain, breadcrumb: Breadcrumb) -> VerifierResult<()> {
        let index = breadcrumb.index;

        // 1. Signature over fields 0..7.
        let payload = encode_breadcrumb_payload(&breadcrumb);
        let signed_ok = verify_signature(&breadcrumb.identity, &payload, &breadcrumb.signature)?;
        if !signed_ok {
            return Err(VerifierError::InvalidSignature(index));
        }

        // 2. Index contiguity.
        let expected = chain.head_index.map(|h| h + 1).unwrap_or(0);
        if index != expected {
            return Err(VerifierError::IndexGap { index, expected });
        }

        let prev = chain.breadcrumbs.last();

        // 3. Monotonic timestamp and predecessor-hash linkage.
        match prev {
            None => {
                if breadcrumb.prev_hash.is_some() {
                    return Err(VerifierError::BrokenLink(index));
                }
            }
            Some(prev) => {
                if breadcrumb.timestamp < prev.timestamp {
                    return Err(VerifierError::TimestampRegress(index));
                }
                let expected_hash = compute_sha256(&encode_breadcrumb_full(prev));
                if breadcrumb.prev_hash != Some(expected_hash) {
                    return Err(VerifierError::BrokenLink(index));
                }

                // 4. Cell deduplication.
                if breadcrumb.cell == prev.cell {
                    return Err(VerifierError::DuplicateCell(index));
                }

                // 6. Minimum collection interval / policy warning.
                let delta = breadcrumb.timestamp.saturating_sub(prev.timestamp);
                if delta < self.config.min_collection_interval_secs {
                    return Err(VerifierError::IntervalTooShort(index));
                }
                if delta < self.config.soft_collection_interval_secs
                    && !breadcrumb.has_exploration_flag()
                {
                    log::warn!(
                        "breadcrumb {index} collected only {delta}s after its predecessor \
                         (soft floor {}s); consider setting the exploration meta flag",
                        self.config.soft_collection_interval_secs
                    );
                }
            }
        }

        // 5. Per-cell cap.
        let current_count = chain.cell_counts.get(&breadcrumb.cell).copied().unwrap_or(0);
        if current_count >= self.config.per_cell_cap {
            return Err(VerifierError::CellCapExceeded(breadcrumb.cell));
        }

        let block_hash = compute_sha256(&encode_breadcrumb_full(&breadcrumb));
        chain.push_validated(breadcrumb, block_hash);
        Ok(())
    }
}

/// Log a categorized validation timing, used by callers that want the
/// decorative pipeline logging without pulling in `ChainValidator` internals.
pub fn log_validation_timing(logger: &VerifierPerformanceLogger, duration_ms: u64) {
    logger.log_categorized_operation(PerformanceCategory::ChainValidation, "validate_and_append", duration_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Hash32;
    use crate::core::utils::sign_data;
    use ed25519_dalek::{Keypair, PublicKey, SecretKey};
    use h3o::{LatLng, Resolution};
    use std::collections::BTreeMap;

    fn keypair() -> Keypair {
        let secret = SecretKey::from_bytes(&[4u8; 32]).unwrap();
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    fn cell_at(lat: f64, lng: f64) -> u64 {
        LatLng::new(lat, lng).unwrap().to_cell(Resolution::Nine).into()
    }

    fn signed_breadcrumb(
        kp: &Keypair,
        index: u64,
        timestamp: u64,
        cell: u64,
        prev_hash: Option<Hash32>,
    ) -> Breadcrumb {
        let mut b = Breadcrumb {
            index,
            identity: kp.public.to_bytes(),
            timestamp,
            cell,
            resolution: 9,
            context_digest: [0u8; 32],
            prev_hash,
            meta: BTreeMap::new(),
            signature: [0u8; 64],
        };
        let payload = encode_breadcrumb_payload(&b);
        b.signature = sign_data(&kp.secret.to_bytes(), &payload).unwrap();
        b
    }

    #[test]
    fn accepts_a_well_formed_two_breadcrumb_chain() {
        let kp = keypair();
        let config = VerifierConfig::default();
        let validator = ChainValidator::new(&config);
        let mut chain = Chain::new(kp.public.to_bytes());

        let sf = cell_at(37.7749, -122.4194);
        let nyc = cell_at(40.7128, -74.0060);

        let b0 = signed_breadcrumb(&kp, 0, 1_000, sf, None);
        let head0 = compute_sha256(&encode_breadcrumb_full(&b0));
        let b1 = signed_breadcrumb(&kp, 1, 1_000 + 600, nyc, Some(head0));

        validator.validate_one(&mut chain, b0).unwrap();
        validator.validate_one(&mut chain, b1).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.unique_cell_count(), 2);
    }

    #[test]
    fn rejects_broken_predecessor_link() {
        let kp = keypair();
        let config = VerifierConfig::default();
        let validator = ChainValidator::new(&config);
        let mut chain = Chain::new(kp.public.to_bytes());

        let sf = cell_at(37.7749, -122.4194);
        let nyc = cell_at(40.7128, -74.0060);
        let b0 = signed_breadcrumb(&kp, 0, 1_000, sf, None);
        validator.validate_one(&mut chain, b0).unwrap();

        let b1 = signed_breadcrumb(&kp, 1, 1_600, nyc, Some([0xAAu8; 32]));
        let err = validator.validate_one(&mut chain, b1).unwrap_err();
        assert!(matches!(err, VerifierError::BrokenLink(1)));
    }

    #[test]
    fn rejects_short_collection_interval() {
        let kp = keypair();
        let config = VerifierConfig::default();
        let validator = ChainValidator::new(&config);
        let mut chain = Chain::new(kp.public.to_bytes());

        let sf = cell_at(37.7749, -122.4194);
        let nyc = cell_at(40.7128, -74.0060);
        let b0 = signed_breadcrumb(&kp, 0, 1_000, sf, None);
        let head0 = compute_sha256(&encode_breadcrumb_full(&b0));
        validator.validate_one(&mut chain, b0).unwrap();

        let b1 = signed_breadcrumb(&kp, 1, 1_010, nyc, Some(head0));
        let err = validator.validate_one(&mut chain, b1).unwrap_err();
        assert!(matches!(err, VerifierError::IntervalTooShort(1)));
    }

    #[test]
    fn rejects_duplicate_consecutive_cell() {
        let kp = keypair();
        let config = VerifierConfig::default();
        let validator = ChainValidator::new(&config);
        let mut chain = Chain::new(kp.public.to_bytes());

        let sf = cell_at(37.7749, -122.4194);
        let b0 = signed_breadcrumb(&kp, 0, 1_000, sf, None);
        let head0 = compute_sha256(&encode_breadcrumb_full(&b0));
        validator.validate_one(&mut chain, b0).unwrap();

        let b1 = signed_breadcrumb(&kp, 1, 1_000 + 600, sf, Some(head0));
        let err = validator.validate_one(&mut chain, b1).unwrap_err();
        assert!(matches!(err, VerifierError::DuplicateCell(1)));
    }

    #[test]
    fn rejects_index_gap() {
        let kp = keypair();
        let config = VerifierConfig::default();
        let validator = ChainValidator::new(&config);
        let mut chain = Chain::new(kp.public.to_bytes());

        let sf = cell_at(37.7749, -122.4194);
        let b1 = signed_breadcrumb(&kp, 1, 1_000, sf, None);
        let err = validator.validate_one(&mut chain, b1).unwrap_err();
        assert!(matches!(
            err,
            VerifierError::IndexGap {
                index: 1,
                expected: 0
            }
        ));
    }
}
