//! The Verifier (spec.md §2 item 7, "Criticality Engine — the
//! orchestrator"; §5 concurrency model): the process-wide facade that
//! owns per-identity chains and mobility profiles, runs the streaming
//! Chain Validator / Mobility Profiler / Hamiltonian Scorer on every
//! accepted breadcrumb, and serves batch verdicts, challenges, and
//! certificates on demand.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Datelike, TimeZone, Timelike, Utc};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::analysis::hamiltonian::{self, HamiltonianInput};
use crate::analysis::heavy_tail::fit_heavy_tail;
use crate::analysis::mobility::MobilityProfile;
use crate::chain::epoch::try_seal_epoch;
use crate::chain::state::Chain;
use crate::chain::validator::ChainValidator;
use crate::consensus::certificate::issue_certificate;
use crate::consensus::challenge::ChallengeCoordinator;
use crate::consensus::criticality::compute_verdict;
use crate::consensus::registry::TrustedRegistry;
use crate::core::encoding::decode_breadcrumb_sequence;
use crate::core::errors::{VerifierError, VerifierResult};
use crate::core::types::{
    Breadcrumb, ChallengeFailure, Epoch, Hash32, HeavyTailFit, IdentityKey, LivenessChallenge,
    LivenessResponse, PohCertificate, Verdict, VerificationRequest,
};
use crate::core::VerifierConfig;
use crate::geo::cell::{haversine_km, tangent_vector, MIN_DISPLACEMENT_KM};

/// Bound on the recent-velocity window fed to the phase-space
/// irregularity term (spec.md §4.6 H_structure c). Large enough to trace
/// a few gait/commute cycles, small enough that a single breadcrumb's
/// cost stays constant regardless of chain length.
const RECENT_VELOCITY_WINDOW: usize = 32;
/// Window for the interval-regularity term (spec.md §4.6 H_structure a).
const RECENT_INTERVAL_WINDOW: usize = 16;

/// Per-identity state the Verifier owns exclusively (spec.md §3
/// "Ownership summary"). Streaming accumulators (`recent_*`) exist so
/// per-breadcrumb scoring stays O(1) rather than re-deriving the whole
/// displacement series on every call, matching spec.md §9 "Streaming vs.
/// batch" for the per-breadcrumb half of that split.
struct IdentityState {
    chain: Chain,
    profile: MobilityProfile,
    /// Sticky once set: any validation failure this identity has ever
    /// produced poisons `H_structure`'s chain-break term from then on
    /// (spec.md §4.6 H_structure b), and zeroes the trust formula's
    /// integrity term (spec.md §4.7).
    chain_integrity: bool,
    last_h: f64,
    recent_magnitudes_km: VecDeque<f64>,
    recent_intervals_s: VecDeque<f64>,
    recent_velocities: VecDeque<f64>,
    heavy_tail_fit: Option<HeavyTailFit>,
    /// The trust score from this identity's last issued Verdict, used to
    /// enforce spec.md §4.6's CRITICAL trust-freeze (spec.md §4.6, §4.7).
    last_trust_score: Option<f64>,
}

impl IdentityState {
    fn new(identity: IdentityKey) -> Self {
        Self {
            chain: Chain::new(identity),
            profile: MobilityProfile::new(identity),
            chain_integrity: true,
            last_h: 0.0,
            recent_magnitudes_km: VecDeque::new(),
            recent_intervals_s: VecDeque::new(),
            recent_velocities: VecDeque::new(),
            heavy_tail_fit: None,
            last_trust_score: None,
        }
    }
}

fn hour_and_weekday(timestamp: u64) -> (u8, u8) {
    match Utc.timestamp_opt(timestamp as i64, 0).single() {
        Some(dt) => (dt.hour() as u8, dt.weekday().num_days_from_monday() as u8),
        None => (0, 0),
    }
}

/// The Verifier: a long-lived, thread-safe object serving many
/// Attesters and relying parties concurrently (spec.md §5). A sharded
/// per-identity lock table means unrelated identities never contend;
/// the signing key and trusted registry are process-global (spec.md §9
/// "Global state").
pub struct Verifier {
    config: VerifierConfig,
    signing_key: [u8; 32],
    verifier_identity: IdentityKey,
    pub registry: TrustedRegistry,
    identities: Mutex<HashMap<IdentityKey, Arc<Mutex<IdentityState>>>>,
    challenges: ChallengeCoordinator,
    /// Admission counter for the CPU-bound batch worker pool (spec.md §5
    /// "Backpressure"): spectral analysis and heavy-tail fitting run on
    /// `rayon`'s global pool, but a request that would push the number
    /// of concurrently in-flight batch jobs past
    /// `config.max_concurrent_batch_jobs` fails fast with
    /// `RESOURCE_EXHAUSTED` instead of queueing.
    in_flight_batch_jobs: AtomicUsize,
}

/// Releases one admitted batch-job slot when dropped, however the job
/// that held it exits (success, error, or panic unwinding).
struct BatchAdmission<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for BatchAdmission<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Verifier {
    /// `signing_key` is the Verifier's own Ed25519 seed; `verifier_identity`
    /// is its corresponding public key, bound into issued
    /// `LivenessChallenge`s so an Attester can confirm which Verifier is
    /// challenging it.
    pub fn new(config: VerifierConfig, signing_key: [u8; 32], verifier_identity: IdentityKey) -> Self {
        Self {
            config,
            signing_key,
            verifier_identity,
            registry: TrustedRegistry::open(),
            identities: Mutex::new(HashMap::new()),
            challenges: ChallengeCoordinator::new(),
            in_flight_batch_jobs: AtomicUsize::new(0),
        }
    }

    /// Reserve one slot in the batch worker pool, or fail fast if
    /// `config.max_concurrent_batch_jobs` are already in flight (spec.md
    /// §5 "Backpressure"). The returned guard releases the slot on drop.
    fn admit_batch_job(&self) -> VerifierResult<BatchAdmission<'_>> {
        let cap = self.config.max_concurrent_batch_jobs.max(1);
        let previous = self.in_flight_batch_jobs.fetch_add(1, Ordering::SeqCst);
        if previous >= cap {
            self.in_flight_batch_jobs.fetch_sub(1, Ordering::SeqCst);
            return Err(VerifierError::ResourceExhausted(format!(
                "batch worker pool saturated: {previous} jobs already in flight (cap {cap})"
            )));
        }
        Ok(BatchAdmission {
            counter: &self.in_flight_batch_jobs,
        })
    }

    /// Compute verdicts for many identities across `rayon`'s worker pool
    /// (spec.md §5 "Scheduling model": "parallel threads for CPU-bound
    /// numerics"). Each identity's admission is independent — if the
    /// pool is already saturated when an item's turn comes up, that
    /// item resolves to `RESOURCE_EXHAUSTED` rather than the whole batch
    /// blocking, the same fan-out/fail-independently shape as the
    /// teacher's `process_enhanced_commitments_parallel`. Reads of
    /// unrelated identities' chains proceed concurrently (spec.md §5
    /// "Per-identity serialization").
    pub fn verdicts_batch(&self, identities: &[IdentityKey]) -> Vec<VerifierResult<Verdict>> {
        identities
            .par_iter()
            .map(|identity| {
                let _admission = self.admit_batch_job()?;
                self.verdict(identity)
            })
            .collect()
    }

    pub fn with_registry(mut self, registry: TrustedRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    fn identity_slot(&self, identity: IdentityKey) -> Arc<Mutex<IdentityState>> {
        self.identities
            .lock()
            .entry(identity)
            .or_insert_with(|| Arc::new(Mutex::new(IdentityState::new(identity))))
            .clone()
    }

    /// Decode a canonical breadcrumb sequence and validate+score each in
    /// order (spec.md §4.1, §4.5, §4.6). Stops at the first failing
    /// breadcrumb, per the never-repair policy.
    pub fn submit_breadcrumbs(&self, raw: &[u8]) -> VerifierResult<()> {
        if !self.registry.is_trusted(&peek_identity(raw)?) {
            return Err(VerifierError::UntrustedIdentity);
        }
        for breadcrumb in decode_breadcrumb_sequence(raw)? {
            self.submit_breadcrumb(breadcrumb)?;
        }
        Ok(())
    }

    /// Validate and score a single breadcrumb already decoded by the
    /// caller (spec.md §4.1). On success, runs the streaming half of
    /// §4.5 (Mobility Profiler) and §4.6 (Hamiltonian Scorer) and, if a
    /// full epoch has accumulated, seals it (§3 "Epoch").
    pub fn submit_breadcrumb(&self, breadcrumb: Breadcrumb) -> VerifierResult<()> {
        if !self.registry.is_trusted(&breadcrumb.identity) {
            return Err(VerifierError::UntrustedIdentity);
        }
        let slot = self.identity_slot(breadcrumb.identity);
        let mut state = slot.lock();

        let validator = ChainValidator::new(&self.config);
        if let Err(e) = validator.validate_one(&mut state.chain, breadcrumb) {
            state.chain_integrity = false;
            return Err(e);
        }

        self.score_latest_breadcrumb(&mut state);

        if let Some(epoch) = try_seal_epoch(&mut state.chain, &self.config, &self.signing_key)? {
            log::info!(
                "sealed epoch {} for identity (first={}, last={})",
                epoch.epoch_number,
                epoch.first_index,
                epoch.last_index
            );
            state.profile.rebuild_transition_matrix();
        }
        Ok(())
    }

    /// Streaming update for the breadcrumb just appended to
    /// `state.chain`: mobility histograms/transitions, the heavy-tail
    /// refit, and the six-component Hamiltonian score (spec.md §4.5,
    /// §4.6). A no-op for index 0 (no predecessor to derive a
    /// displacement from).
    fn score_latest_breadcrumb(&self, state: &mut IdentityState) {
        let len = state.chain.len();
        if len < 2 {
            if let Some(first) = state.chain.breadcrumbs.first() {
                let (hour, weekday) = hour_and_weekday(first.timestamp);
                state.profile.observe(first.cell, None, hour, weekday, &self.config);
            }
            return;
        }

        let prev = state.chain.breadcrumbs[len - 2].clone();
        let cur = state.chain.breadcrumbs[len - 1].clone();

        let delta_r_km = haversine_km(prev.cell, cur.cell).unwrap_or(MIN_DISPLACEMENT_KM);
        let delta_t_s = cur.timestamp.saturating_sub(prev.timestamp) as f64;
        let (hour, weekday) = hour_and_weekday(cur.timestamp);

        push_bounded(&mut state.recent_magnitudes_km, delta_r_km, self.config.epoch_size as usize);
        push_bounded(&mut state.recent_intervals_s, delta_t_s, RECENT_INTERVAL_WINDOW);
        let velocity = delta_r_km / delta_t_s.max(1.0);
        push_bounded(&mut state.recent_velocities, velocity, RECENT_VELOCITY_WINDOW);

        if state.recent_magnitudes_km.len() >= 8 {
            let samples: Vec<f64> = state.recent_magnitudes_km.iter().copied().collect();
            if let Ok(fit) = fit_heavy_tail(&samples, &self.config) {
                state.heavy_tail_fit = Some(fit);
            }
        }
        let fit = state.heavy_tail_fit.unwrap_or(HeavyTailFit {
            beta: 1.75,
            kappa_km: 8.0,
            quality: 0.0,
        });
        let xmin = MIN_DISPLACEMENT_KM;
        let observed_max = state
            .recent_magnitudes_km
            .iter()
            .cloned()
            .fold(0.0_f64, f64::max);
        let xmax = (observed_max.max(fit.kappa_km * 10.0) * 2.0).max(xmin * 2.0);

        let prev_anchor = state.profile.anchor_for(prev.cell);
        let cur_anchor = state.profile.anchor_for(cur.cell);
        let transition_probability = match (prev_anchor, cur_anchor) {
            (Some(from), Some(to)) => state.profile.transition_probability(from, to),
            _ => 0.0,
        };

        let flock_cosine = prev_anchor.and_then(|anchor| {
            let (dx, dy) = tangent_vector(prev.cell, cur.cell).ok()?;
            let (mx, my) = state.profile.historical_mean_vector(anchor, hour)?;
            let v_norm = (dx * dx + dy * dy).sqrt();
            let m_norm = (mx * mx + my * my).sqrt();
            if v_norm <= f64::EPSILON || m_norm <= f64::EPSILON {
                return None;
            }
            Some((dx * mx + dy * my) / (v_norm * m_norm))
        });

        let recent_velocities: Vec<f64> = state.recent_velocities.iter().copied().collect();
        let input = HamiltonianInput {
            delta_r_km,
            heavy_tail_fit: &fit,
            xmin_km: xmin,
            xmax_km: xmax,
            hour_histogram: &state.profile.hour_histogram,
            weekday_histogram: &state.profile.weekday_histogram,
            hour,
            weekday,
            transition_probability,
            flock_cosine,
            context_divergence: None,
            interval_stddev_secs: state.profile.interval_stddev(&state.recent_intervals_s.iter().copied().collect::<Vec<_>>()),
            chain_break: !state.chain_integrity,
            recent_velocities: &recent_velocities,
        };
        let (h, _components) = hamiltonian::score(&input, &self.config.hamiltonian_weights, state.chain.len() as u64);
        state.last_h = h;
        state.profile.push_h(h);
        state.profile.record_displacement_against_fit(delta_r_km, fit, xmin);

        state.profile.observe(cur.cell, Some(prev.cell), hour, weekday, &self.config);
    }

    /// Compute a fresh Verdict over an identity's current chain state
    /// (spec.md §4.7). Caches the resulting trust score so a subsequent
    /// CRITICAL verdict can freeze growth against it (spec.md §4.6).
    pub fn verdict(&self, identity: &IdentityKey) -> VerifierResult<Verdict> {
        let slot = self.identity_slot(*identity);
        let mut state = slot.lock();
        if state.chain.is_empty() {
            return Err(VerifierError::ChainNotFound);
        }
        let h_baseline = state.profile.h_baseline();
        let verdict = compute_verdict(
            &state.chain,
            &state.profile,
            &self.config,
            state.chain_integrity,
            state.last_h,
            h_baseline,
            state.last_trust_score,
        );
        state.last_trust_score = Some(verdict.trust_score);
        Ok(verdict)
    }

    pub fn chain_head_hash(&self, identity: &IdentityKey) -> Option<Hash32> {
        self.identity_slot(*identity).lock().chain.head_hash
    }

    fn epoch_count(&self, identity: &IdentityKey) -> u64 {
        self.identity_slot(*identity).lock().chain.epoch_boundaries.len() as u64
    }

    /// REQUESTED → CHALLENGED (spec.md §4.8). Rejects unknown/untrusted
    /// identities before a challenge slot is ever allocated.
    pub fn issue_challenge(
        &self,
        request: &VerificationRequest,
    ) -> VerifierResult<(LivenessChallenge, tokio::sync::oneshot::Receiver<LivenessResponse>)> {
        if !self.registry.is_trusted(&request.identity) {
            return Err(VerifierError::UntrustedIdentity);
        }
        self.challenges
            .issue(request.identity, self.verifier_identity, request, &self.config)
    }

    /// Validate an Attester's `LivenessResponse` against this identity's
    /// current stored chain head (spec.md §4.8 "Response validation").
    pub fn submit_liveness_response(
        &self,
        identity: &IdentityKey,
        response: LivenessResponse,
    ) -> Result<(), ChallengeFailure> {
        let (expected_head_hash, last_known_index) = {
            let slot = self.identity_slot(*identity);
            let state = slot.lock();
            (
                state.chain.head_hash.unwrap_or([0u8; 32]),
                state.chain.head_index.unwrap_or(0),
            )
        };
        self.challenges
            .submit_response(identity, response, expected_head_hash, last_known_index)
    }

    pub fn cancel_challenge(&self, identity: &IdentityKey) {
        self.challenges.cancel(identity);
    }

    /// CHALLENGED → RESPONDED (or TIMED_OUT/CANCELLED); bounded by
    /// `deadline_secs` (spec.md §4.8, §5 "Timeouts").
    pub async fn await_challenge(
        &self,
        identity: IdentityKey,
        rx: tokio::sync::oneshot::Receiver<LivenessResponse>,
        deadline_secs: u64,
    ) -> Result<LivenessResponse, ChallengeFailure> {
        self.challenges.await_completion(identity, rx, deadline_secs).await
    }

    /// Assemble and sign a PoH Certificate (spec.md §4.9) once a
    /// liveness response has completed successfully. The chain-head
    /// hash bound into the certificate is read under the same
    /// per-identity lock as the verdict, so both reflect one consistent
    /// snapshot (spec.md §5 "Ordering guarantees").
    pub fn issue_certificate(&self, identity: &IdentityKey, nonce: [u8; 16]) -> VerifierResult<PohCertificate> {
        let verdict = self.verdict(identity)?;
        let head_hash = self.chain_head_hash(identity).ok_or(VerifierError::ChainNotFound)?;
        let epoch_count = self.epoch_count(identity);
        issue_certificate(*identity, epoch_count, &verdict, nonce, head_hash, &self.signing_key)
    }

    pub fn outstanding_challenge_count(&self) -> usize {
        self.challenges.outstanding_count()
    }
}

fn push_bounded(buf: &mut VecDeque<f64>, value: f64, cap: usize) {
    buf.push_back(value);
    while buf.len() > cap.max(1) {
        buf.pop_front();
    }
}

/// Peek the identity out of the first breadcrumb of a canonical
/// sequence without fully decoding it, so `submit_breadcrumbs` can reject
/// an untrusted identity before doing any validation work.
fn peek_identity(raw: &[u8]) -> VerifierResult<IdentityKey> {
    let breadcrumbs = decode_breadcrumb_sequence(raw)?;
    breadcrumbs
        .first()
        .map(|b| b.identity)
        .ok_or_else(|| VerifierError::MalformedEncoding("empty breadcrumb sequence".into()))
}

/// Verify an already-sealed epoch's Merkle root and signature against
/// the member breadcrumbs the Verifier holds for that identity (spec.md
/// §3 "Epoch", §6 epoch wire format). Exposed for relying parties that
/// receive an `Epoch` out of band and want to cross-check it against
/// this Verifier's view of the chain.
pub fn verify_epoch_against_chain(epoch: &Epoch, chain: &Chain) -> VerifierResult<()> {
    if !crate::chain::epoch::verify_epoch_signature(epoch)? {
        return Err(VerifierError::InvalidSignature(epoch.first_index));
    }
    let start = epoch.first_index as usize;
    let end = epoch.last_index as usize + 1;
    let members = chain
        .breadcrumbs
        .get(start..end)
        .ok_or_else(|| VerifierError::MalformedEncoding("epoch range outside held chain".into()))?;
    crate::chain::epoch::verify_epoch_root(epoch, members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoding::encode_breadcrumb_payload;
    use crate::core::types::Classification;
    use crate::core::utils::{compute_sha256, sign_data};
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

    fn signed_chain(kp: &Keypair, cells: &[u64], start_ts: u64, step_s: u64) -> Vec<Breadcrumb> {
        let mut out = Vec::new();
        let mut prev_hash = None;
        for (i, &cell) in cells.iter().enumerate() {
            let mut b = Breadcrumb {
                index: i as u64,
                identity: kp.public.to_bytes(),
                timestamp: start_ts + i as u64 * step_s,
                cell,
                resolution: 9,
                context_digest: [0u8; 32],
                prev_hash,
                meta: BTreeMap::new(),
                signature: [0u8; 64],
            };
            let payload = encode_breadcrumb_payload(&b);
            b.signature = sign_data(&kp.secret.to_bytes(), &payload).unwrap();
            prev_hash = Some(compute_sha256(&crate::core::encoding::encode_breadcrumb_full(&b)));
            out.push(b);
        }
        out
    }

    #[test]
    fn short_chain_reports_insufficient_data() {
        let kp = keypair(21);
        let verifier = Verifier::new(VerifierConfig::default(), [1u8; 32], [9u8; 32]);
        let a = cell_at(37.0, -122.0);
        let b = cell_at(37.1, -122.1);
        let cells: Vec<u64> = (0..10).map(|i| if i % 2 == 0 { a } else { b }).collect();
        for crumb in signed_chain(&kp, &cells, 1_000_000, 900) {
            verifier.submit_breadcrumb(crumb).unwrap();
        }
        let verdict = verifier.verdict(&kp.public.to_bytes()).unwrap();
        assert_eq!(verdict.classification, Classification::InsufficientData);
    }

    #[test]
    fn broken_link_is_rejected_and_poisons_integrity() {
        let kp = keypair(22);
        let verifier = Verifier::new(VerifierConfig::default(), [1u8; 32], [9u8; 32]);
        let a = cell_at(37.0, -122.0);
        let b = cell_at(38.0, -121.0);
        let mut chain = signed_chain(&kp, &[a, b], 1_000_000, 900);
        chain[1].prev_hash = Some([0xAAu8; 32]);

        verifier.submit_breadcrumb(chain[0].clone()).unwrap();
        let err = verifier.submit_breadcrumb(chain[1].clone()).unwrap_err();
        assert!(matches!(err, VerifierError::BrokenLink(1)));
    }

    #[test]
    fn untrusted_identity_is_rejected_by_an_allow_list_registry() {
        let kp = keypair(23);
        let verifier = Verifier::new(VerifierConfig::default(), [1u8; 32], [9u8; 32])
            .with_registry(TrustedRegistry::allow_list());
        let a = cell_at(37.0, -122.0);
        let chain = signed_chain(&kp, &[a], 1_000_000, 900);
        let err = verifier.submit_breadcrumb(chain[0].clone()).unwrap_err();
        assert!(matches!(err, VerifierError::UntrustedIdentity));
    }

    #[tokio::test]
    async fn a_timely_signed_response_completes_a_challenge() {
        let kp = keypair(24);
        let verifier = Verifier::new(VerifierConfig::default(), [1u8; 32], [9u8; 32]);
        let a = cell_at(37.0, -122.0);
        let b = cell_at(38.0, -121.0);
        let chain = signed_chain(&kp, &[a, b], 1_000_000, 900);
        for crumb in chain {
            verifier.submit_breadcrumb(crumb).unwrap();
        }
        let identity = kp.public.to_bytes();
        let head_hash = verifier.chain_head_hash(&identity).unwrap();

        let request = VerificationRequest {
            identity,
            nonce: [7u8; 16],
            request_timestamp: crate::core::utils::current_timestamp_secs(),
            freshness_window_secs: 60,
        };
        let (challenge, rx) = verifier.issue_challenge(&request).unwrap();

        let mut response = LivenessResponse {
            nonce_echo: challenge.nonce,
            chain_head_hash: head_hash,
            response_timestamp: challenge.challenge_timestamp,
            current_index: 1,
            signature: [0u8; 64],
        };
        let payload = crate::core::encoding::encode_liveness_response_payload(&response);
        response.signature = sign_data(&kp.secret.to_bytes(), &payload).unwrap();

        verifier.submit_liveness_response(&identity, response).unwrap();
        let completed = verifier
            .await_challenge(identity, rx, challenge.response_deadline_secs)
            .await
            .unwrap();
        assert_eq!(completed.current_index, 1);

        let certificate = verifier.issue_certificate(&identity, challenge.nonce).unwrap();
        assert_eq!(certificate.chain_head_hash, head_hash);
        assert_eq!(certificate.nonce, challenge.nonce);
    }

    #[test]
    fn batch_verdicts_cover_every_requested_identity() {
        let verifier = Verifier::new(VerifierConfig::default(), [1u8; 32], [9u8; 32]);
        let a = cell_at(37.0, -122.0);
        let b = cell_at(38.0, -121.0);
        let cells: Vec<u64> = (0..10).map(|i| if i % 2 == 0 { a } else { b }).collect();

        let mut identities = Vec::new();
        for seed in 30..35u8 {
            let kp = keypair(seed);
            for crumb in signed_chain(&kp, &cells, 1_000_000, 900) {
                verifier.submit_breadcrumb(crumb).unwrap();
            }
            identities.push(kp.public.to_bytes());
        }

        let verdicts = verifier.verdicts_batch(&identities);
        assert_eq!(verdicts.len(), identities.len());
        for v in verdicts {
            assert!(v.unwrap().total_breadcrumb_count == 10);
        }
    }

    #[test]
    fn batch_admission_rejects_once_the_worker_pool_cap_is_reached() {
        let mut config = VerifierConfig::default();
        config.max_concurrent_batch_jobs = 1;
        let verifier = Verifier::new(config, [1u8; 32], [9u8; 32]);

        let _first = verifier.admit_batch_job().unwrap();
        let err = verifier.admit_batch_job().unwrap_err();
        assert!(matches!(err, VerifierError::ResourceExhausted(_)));
    }
}
