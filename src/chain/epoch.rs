//! Epoch sealing (spec.md §3 "Epoch", §6 epoch wire format).

use rs_merkle::{algorithms::Sha256 as MerkleSha256, MerkleTree as RsMerkleTree};

use crate::chain::state::Chain;
use crate::core::encoding::encode_breadcrumb_full;
use crate::core::errors::{VerifierError, VerifierResult};
use crate::core::types::{Epoch, Hash32, Signature64};
use crate::core::utils::{compute_sha256, sign_data};
use crate::core::VerifierConfig;

/// Merkle root over the member block-hashes, in their natural (index)
/// order. An empty leaf set has no meaningful root and is rejected by the
/// caller before this is reached.
pub fn epoch_merkle_root(block_hashes: &[Hash32]) -> Hash32 {
    if block_hashes.is_empty() {
        return [0u8; 32];
    }
    let tree = RsMerkleTree::<MerkleSha256>::from_leaves(block_hashes);
    tree.root().unwrap_or([0u8; 32])
}

/// Seal the next `config.epoch_size` unsealed breadcrumbs of `chain` into
/// an immutable, signed `Epoch`. Returns `None` if fewer than a full
/// epoch's worth of breadcrumbs are available since the last boundary.
pub fn try_seal_epoch(
    chain: &mut Chain,
    config: &VerifierConfig,
    signing_key: &[u8],
) -> VerifierResult<Option<Epoch>> {
    let sealed_through = chain.epoch_boundaries.last().map(|&i| i + 1).unwrap_or(0) as usize;
    let available = chain.breadcrumbs.len().saturating_sub(sealed_through);
    if (available as u64) < config.epoch_size {
        return Ok(None);
    }

    let members = &chain.breadcrumbs[sealed_through..sealed_through + config.epoch_size as usize];
    let block_hashes: Vec<Hash32> = members
        .iter()
        .map(|b| compute_sha256(&encode_breadcrumb_full(b)))
        .collect();
    let merkle_root = epoch_merkle_root(&block_hashes);

    let unique_cell_count = members
        .iter()
        .map(|b| b.cell)
        .collect::<std::collections::HashSet<_>>()
        .len() as u64;

    let mut epoch = Epoch {
        epoch_number: chain.epoch_boundaries.len() as u64,
        identity: chain.identity,
        first_index: members.first().unwrap().index,
        last_index: members.last().unwrap().index,
        first_timestamp: members.first().unwrap().timestamp,
        last_timestamp: members.last().unwrap().timestamp,
        merkle_root,
        unique_cell_count,
        signature: [0u8; 64],
    };

    epoch.signature = sign_epoch(&epoch, signing_key)?;
    chain.seal_epoch(epoch.last_index);
    Ok(Some(epoch))
}

fn sign_epoch(epoch: &Epoch, signing_key: &[u8]) -> VerifierResult<Signature64> {
    let payload = crate::core::encoding::encode_epoch_payload(epoch);
    sign_data(signing_key, &payload)
}

/// Verify an epoch's signature against its claimed identity.
pub fn verify_epoch_signature(epoch: &Epoch) -> VerifierResult<bool> {
    let payload = crate::core::encoding::encode_epoch_payload(epoch);
    crate::core::utils::verify_signature(&epoch.identity, &payload, &epoch.signature)
}

/// Verify that an epoch's Merkle root matches the actual member
/// breadcrumbs it claims to seal.
pub fn verify_epoch_root(epoch: &Epoch, members: &[crate::core::types::Breadcrumb]) -> VerifierResult<()> {
    let block_hashes: Vec<Hash32> = members
        .iter()
        .map(|b| compute_sha256(&encode_breadcrumb_full(b)))
        .collect();
    let computed = epoch_merkle_root(&block_hashes);
    if computed != epoch.merkle_root {
        return Err(VerifierError::MalformedEncoding(
            "epoch merkle root does not match its member breadcrumbs".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Breadcrumb;
    use ed25519_dalek::{Keypair, PublicKey, SecretKey};
    use h3o::{LatLng, Resolution};
    use std::collections::BTreeMap;

    fn keypair() -> Keypair {
        let secret = SecretKey::from_bytes(&[6u8; 32]).unwrap();
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    fn crumb(kp: &Keypair, index: u64, cell: u64, timestamp: u64) -> Breadcrumb {
        Breadcrumb {
            index,
            identity: kp.public.to_bytes(),
            timestamp,
            cell,
            resolution: 9,
            context_digest: [0u8; 32],
            prev_hash: None,
            meta: BTreeMap::new(),
            signature: [0u8; 64],
        }
    }

    #[test]
    fn seals_once_a_full_epoch_has_accumulated() {
        let kp = keypair();
        let mut config = VerifierConfig::default();
        config.epoch_size = 4;
        let mut chain = Chain::new(kp.public.to_bytes());

        let cell = LatLng::new(10.0, 10.0).unwrap().to_cell(Resolution::Nine);
        for i in 0..3u64 {
            chain.push_validated(crumb(&kp, i, cell.into(), 1000 + i), [0u8; 32]);
        }
        assert!(try_seal_epoch(&mut chain, &config, &kp.secret.to_bytes())
            .unwrap()
            .is_none());

        chain.push_validated(crumb(&kp, 3, cell.into(), 1003), [0u8; 32]);
        let epoch = try_seal_epoch(&mut chain, &config, &kp.secret.to_bytes())
            .unwrap()
            .unwrap();
        assert_eq!(epoch.first_index, 0);
        assert_eq!(epoch.last_index, 3);
        assert!(verify_epoch_signature(&epoch).unwrap());
    }
}
