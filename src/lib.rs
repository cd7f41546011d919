//! `trip-verifier`: the Verifier subsystem of the TRIP pseudonymous
//! proof-of-humanity protocol (spec.md §1).
//!
//! This crate validates a breadcrumb chain cryptographically and
//! structurally, computes the protocol's statistical physics diagnostics
//! over it, runs the nonce-bound liveness challenge protocol against an
//! Attester, and issues a signed, privacy-preserving Proof-of-Humanity
//! Certificate. Everything outside that — sensor collection, transport
//! binding, handle naming, payments — is out of scope; this library
//! consumes bytes and emits bytes (spec.md §1 "Out of scope").

pub mod analysis;
pub mod chain;
pub mod consensus;
pub mod core;
pub mod geo;
pub mod verifier;

pub use core::config::VerifierConfig;
pub use core::errors::{VerifierError, VerifierResult};
pub use core::types::*;
pub use verifier::Verifier;

#[cfg(test)]
mod integration_tests {
    //! End-to-end smoke tests assembling the full pipeline the way the
    //! `bin/trip-verifierd` harness does. The six scenarios from spec.md
    //! §8 get dedicated coverage under `tests/`; these stay small and
    //! colocated as a sanity check that the public API composes.

    use crate::core::encoding::{encode_breadcrumb_full, encode_breadcrumb_payload};
    use crate::core::types::Breadcrumb;
    use crate::core::utils::{compute_sha256, sign_data};
    use crate::core::VerifierConfig;
    use crate::Verifier;
    use ed25519_dalek::{Keypair, PublicKey, SecretKey};
    use h3o::{LatLng, Resolution};
    use std::collections::BTreeMap;

    fn keypair(seed: u8) -> Keypair {
        let secret = SecretKey::from_bytes(&[seed; 32]).unwrap();
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    fn cell_at(lat: f64, lng: f64) -> u64 {
        LatLng::new(lat, lng).unwrap().to_cell(Resolution::Nine).into()
    }

    #[test]
    fn a_realistic_trajectory_validates_and_produces_a_verdict() {
        let kp = keypair(77);
        let verifier = Verifier::new(VerifierConfig::default(), [2u8; 32], [3u8; 32]);

        // Eight distinct neighborhood cells, cycled so no two consecutive
        // breadcrumbs repeat a cell and no single cell exceeds the
        // default per-cell cap of 10 across 80 breadcrumbs.
        let cells: Vec<u64> = (0..8)
            .map(|i| cell_at(37.77 + i as f64 * 0.01, -122.42 + i as f64 * 0.01))
            .collect();

        let mut prev_hash = None;
        for i in 0..80u64 {
            let cell = cells[(i % 8) as usize];
            let mut b = Breadcrumb {
                index: i,
                identity: kp.public.to_bytes(),
                timestamp: 1_700_000_000 + i * 1_800,
                cell,
                resolution: 9,
                context_digest: [0u8; 32],
                prev_hash,
                meta: BTreeMap::new(),
                signature: [0u8; 64],
            };
            let payload = encode_breadcrumb_payload(&b);
            b.signature = sign_data(&kp.secret.to_bytes(), &payload).unwrap();
            prev_hash = Some(compute_sha256(&encode_breadcrumb_full(&b)));
            verifier.submit_breadcrumb(b).unwrap();
        }

        let verdict = verifier.verdict(&kp.public.to_bytes()).unwrap();
        assert_eq!(verdict.total_breadcrumb_count, 80);
        assert_eq!(verdict.unique_cell_count, 8);
    }
}
