//! Challenge Coordinator (spec.md §4.8): the active liveness-verification
//! state machine. One in-flight challenge per identity; cooperative
//! suspension on the Attester's response, cancellable and deadline-bound.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::core::errors::{VerifierError, VerifierResult};
use crate::core::types::{ChallengeFailure, Hash32, IdentityKey, LivenessChallenge, LivenessResponse, VerificationRequest};
use crate::core::utils::{current_timestamp_secs, verify_signature};
use crate::core::VerifierConfig;

struct Outstanding {
    nonce: [u8; 16],
    challenge_timestamp: u64,
    deadline_secs: u64,
    completion_tx: oneshot::Sender<LivenessResponse>,
}

/// Owns all in-flight challenges. Per-identity serialization is enforced
/// by rejecting a second concurrent challenge for the same identity
/// (spec.md §5, "Challenge slots are likewise capped per identity").
pub struct ChallengeCoordinator {
    outstanding: Mutex<HashMap<IdentityKey, Outstanding>>,
    used_nonces: Mutex<HashSet<[u8; 16]>>,
}

impl ChallengeCoordinator {
    pub fn new() -> Self {
        Self {
            outstanding: Mutex::new(HashMap::new()),
            used_nonces: Mutex::new(HashSet::new()),
        }
    }

    /// REQUESTED → CHALLENGED. Returns the challenge to deliver to the
    /// Attester and the receiver the caller awaits for completion.
    pub fn issue(
        &self,
        identity: IdentityKey,
        verifier_identity: IdentityKey,
        request: &VerificationRequest,
        config: &VerifierConfig,
    ) -> VerifierResult<(LivenessChallenge, oneshot::Receiver<LivenessResponse>)> {
        let mut used_nonces = self.used_nonces.lock();
        if used_nonces.contains(&request.nonce) {
            return Err(VerifierError::NonceReuse);
        }

        let mut outstanding = self.outstanding.lock();
        if outstanding.contains_key(&identity) {
            return Err(VerifierError::ChallengeAlreadyOutstanding);
        }

        let deadline_secs = config
            .challenge_deadline_secs
            .min(request.freshness_window_secs)
            .min(config.response_deadline_max_secs)
            .max(1);
        let challenge_timestamp = current_timestamp_secs();
        let (tx, rx) = oneshot::channel();

        used_nonces.insert(request.nonce);
        outstanding.insert(
            identity,
            Outstanding {
                nonce: request.nonce,
                challenge_timestamp,
                deadline_secs,
                completion_tx: tx,
            },
        );

        Ok((
            LivenessChallenge {
                nonce: request.nonce,
                verifier_identity,
                challenge_timestamp,
                response_deadline_secs: deadline_secs,
            },
            rx,
        ))
    }

    /// CHALLENGED → RESPONDED (or a validation failure). Validates the
    /// Attester's response against the stored challenge and the
    /// Verifier's last-known chain state, then hands it to whoever is
    /// awaiting completion. The slot is freed either way.
    pub fn submit_response(
        &self,
        identity: &IdentityKey,
        response: LivenessResponse,
        expected_head_hash: Hash32,
        last_known_index: u64,
    ) -> Result<(), ChallengeFailure> {
        let mut outstanding = self.outstanding.lock();
        let entry = match outstanding.remove(identity) {
            Some(entry) => entry,
            // No outstanding challenge to match against; treat as a
            // mismatch rather than silently dropping the response.
            None => return Err(ChallengeFailure::NonceMismatch),
        };

        if response.nonce_echo != entry.nonce {
            outstanding.insert(*identity, entry);
            return Err(ChallengeFailure::NonceMismatch);
        }

        let signed_ok = verify_signature(identity, &crate::core::encoding::encode_liveness_response_payload(&response), &response.signature)
            .unwrap_or(false);
        if !signed_ok {
            return Err(ChallengeFailure::InvalidSignature);
        }
        if response.chain_head_hash != expected_head_hash {
            return Err(ChallengeFailure::HeadHashMismatch);
        }
        if response.current_index < last_known_index {
            return Err(ChallengeFailure::StaleIndex);
        }
        let deadline = entry.challenge_timestamp + entry.deadline_secs;
        if response.response_timestamp < entry.challenge_timestamp || response.response_timestamp > deadline {
            return Err(ChallengeFailure::StaleTimestamp);
        }

        let _ = entry.completion_tx.send(response);
        Ok(())
    }

    /// Relying party withdrew. Frees the slot; the waiting `await_completion`
    /// call observes `Cancelled` once the sender is dropped.
    pub fn cancel(&self, identity: &IdentityKey) {
        self.outstanding.lock().remove(identity);
    }

    /// Await the Attester's response, bounded by the challenge's deadline.
    /// Cancellable: dropping the future (or a concurrent `cancel`/timeout)
    /// never leaves the identity's state partially mutated.
    pub async fn await_completion(
        &self,
        identity: IdentityKey,
        rx: oneshot::Receiver<LivenessResponse>,
        deadline_secs: u64,
    ) -> Result<LivenessResponse, ChallengeFailure> {
        match tokio::time::timeout(Duration::from_secs(deadline_secs), rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_dropped)) => Err(ChallengeFailure::Cancelled),
            Err(_elapsed) => {
                self.outstanding.lock().remove(&identity);
                Err(ChallengeFailure::TimedOut)
            }
        }
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.lock().len()
    }
}

impl Default for ChallengeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic deadline helper kept separate from wall-clock timestamps, so
/// scheduling never depends on a clock that can jump (spec.md §5).
pub fn monotonic_deadline(from: Instant, deadline_secs: u64) -> Instant {
    from + Duration::from_secs(deadline_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Keypair, SecretKey};

    fn keypair() -> Keypair {
        let secret = SecretKey::from_bytes(&[11u8; 32]).unwrap();
        let public = ed25519_dalek::PublicKey::from(&secret);
        Keypair { secret, public }
    }

    fn signed_response(kp: &Keypair, nonce: [u8; 16], head_hash: Hash32, index: u64, timestamp: u64) -> LivenessResponse {
        let mut response = LivenessResponse {
            nonce_echo: nonce,
            chain_head_hash: head_hash,
            response_timestamp: timestamp,
            current_index: index,
            signature: [0u8; 64],
        };
        let payload = crate::core::encoding::encode_liveness_response_payload(&response);
        response.signature = crate::core::utils::sign_data(&kp.secret.to_bytes(), &payload).unwrap();
        response
    }

    #[test]
    fn reissuing_the_same_nonce_is_rejected() {
        let coordinator = ChallengeCoordinator::new();
        let config = VerifierConfig::default();
        let kp = keypair();
        let request = VerificationRequest {
            identity: kp.public.to_bytes(),
            nonce: [1u8; 16],
            request_timestamp: current_timestamp_secs(),
            freshness_window_secs: 60,
        };
        let (_challenge, _rx) = coordinator
            .issue(kp.public.to_bytes(), [2u8; 32], &request, &config)
            .unwrap();
        coordinator.cancel(&kp.public.to_bytes());

        let err = coordinator
            .issue(kp.public.to_bytes(), [2u8; 32], &request, &config)
            .unwrap_err();
        assert!(matches!(err, VerifierError::NonceReuse));
    }

    #[test]
    fn a_second_concurrent_challenge_is_rejected() {
        let coordinator = ChallengeCoordinator::new();
        let config = VerifierConfig::default();
        let kp = keypair();
        let identity = kp.public.to_bytes();
        let request1 = VerificationRequest {
            identity,
            nonce: [3u8; 16],
            request_timestamp: current_timestamp_secs(),
            freshness_window_secs: 60,
        };
        let request2 = VerificationRequest {
            nonce: [4u8; 16],
            ..request1.clone()
        };
        let _ = coordinator.issue(identity, [2u8; 32], &request1, &config).unwrap();
        let err = coordinator.issue(identity, [2u8; 32], &request2, &config).unwrap_err();
        assert!(matches!(err, VerifierError::ChallengeAlreadyOutstanding));
    }

    #[tokio::test]
    async fn a_valid_response_completes_the_challenge() {
        let coordinator = ChallengeCoordinator::new();
        let config = VerifierConfig::default();
        let kp = keypair();
        let identity = kp.public.to_bytes();
        let head_hash = [5u8; 32];
        let request = VerificationRequest {
            identity,
            nonce: [6u8; 16],
            request_timestamp: current_timestamp_secs(),
            freshness_window_secs: 60,
        };
        let (challenge, rx) = coordinator.issue(identity, [2u8; 32], &request, &config).unwrap();
        let response = signed_response(&kp, challenge.nonce, head_hash, 42, challenge.challenge_timestamp);

        coordinator.submit_response(&identity, response.clone(), head_hash, 10).unwrap();
        let completed = coordinator
            .await_completion(identity, rx, challenge.response_deadline_secs)
            .await
            .unwrap();
        assert_eq!(completed.current_index, 42);
    }

    #[tokio::test]
    async fn an_elapsed_deadline_times_out() {
        let coordinator = ChallengeCoordinator::new();
        let config = VerifierConfig::default();
        let kp = keypair();
        let identity = kp.public.to_bytes();
        let request = VerificationRequest {
            identity,
            nonce: [7u8; 16],
            request_timestamp: current_timestamp_secs(),
            freshness_window_secs: 60,
        };
        let (_challenge, rx) = coordinator.issue(identity, [2u8; 32], &request, &config).unwrap();
        let result = coordinator.await_completion(identity, rx, 0).await;
        assert_eq!(result.unwrap_err(), ChallengeFailure::TimedOut);
    }

    #[test]
    fn a_byte_flipped_nonce_is_a_mismatch() {
        let coordinator = ChallengeCoordinator::new();
        let config = VerifierConfig::default();
        let kp = keypair();
        let identity = kp.public.to_bytes();
        let head_hash = [5u8; 32];
        let request = VerificationRequest {
            identity,
            nonce: [8u8; 16],
            request_timestamp: current_timestamp_secs(),
            freshness_window_secs: 60,
        };
        let (challenge, _rx) = coordinator.issue(identity, [2u8; 32], &request, &config).unwrap();
        let mut flipped_nonce = challenge.nonce;
        flipped_nonce[0] ^= 0xFF;
        let response = signed_response(&kp, flipped_nonce, head_hash, 1, challenge.challenge_timestamp);

        let err = coordinator.submit_response(&identity, response, head_hash, 0).unwrap_err();
        assert_eq!(err, ChallengeFailure::NonceMismatch);
    }
}
