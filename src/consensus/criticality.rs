//! Criticality Engine (spec.md §4.7): orchestrates the Spectral Analyzer,
//! Heavy-Tail Fitter, and Mobility Profiler into a single Verdict.
//!
//! Stateless across calls: spectral and heavy-tail fits are recomputed
//! lazily from the chain's displacement series on every verdict request
//! rather than cached (spec.md §9, "Streaming vs. batch").

use crate::analysis::hamiltonian::classify_alert;
use crate::analysis::heavy_tail::{consistency_warning, fit_heavy_tail};
use crate::analysis::mobility::MobilityProfile;
use crate::analysis::spectral::{analyze_spectrum, classify_alpha, criticality_confidence, SpectralBand};
use crate::chain::state::Chain;
use crate::core::types::{AlertLevel, Classification, HeavyTailFit, SpectralFit, Verdict};
use crate::core::utils::current_timestamp_secs;
use crate::core::VerifierConfig;
use crate::geo::displacement::extract_displacements;

const SECONDS_PER_DAY: f64 = 86_400.0;

fn classification_for(total_breadcrumbs: u64, alpha: f64, config: &VerifierConfig) -> Classification {
    if total_breadcrumbs < config.min_breadcrumbs_for_psd as u64 {
        return Classification::InsufficientData;
    }
    match classify_alpha(alpha, config) {
        SpectralBand::Synthetic | SpectralBand::ReplayDrift => Classification::Synthetic,
        SpectralBand::Biological => Classification::Human,
        SpectralBand::Suspicious => Classification::Suspicious,
    }
}

fn raw_trust_score(
    total_breadcrumbs: u64,
    unique_cells: u64,
    days_since_first: f64,
    chain_integrity: bool,
    config: &VerifierConfig,
) -> f64 {
    let w = &config.trust_score_weights;
    let count_term = w.count_weight * (total_breadcrumbs as f64 / w.count_saturation).min(1.0);
    let unique_term = w.unique_cells_weight * (unique_cells as f64 / w.unique_cells_saturation).min(1.0);
    let longevity_term = w.longevity_weight * (days_since_first / w.longevity_saturation_days).min(1.0);
    let integrity_term = w.integrity_weight * if chain_integrity { 1.0 } else { 0.0 };
    count_term + unique_term + longevity_term + integrity_term
}

/// Cap trust at 50 when α falls outside the configured biological band
/// (spec.md §4.7).
fn apply_alpha_cap(raw: f64, alpha: f64, config: &VerifierConfig) -> f64 {
    let (lo, hi) = config.alpha_biological_range;
    if alpha.is_finite() && alpha >= lo && alpha <= hi {
        raw
    } else {
        raw.min(50.0)
    }
}

/// Compute a full Verdict over `chain`'s current state. `chain_integrity`
/// reflects whether any upstream validation failure has ever been
/// recorded for this identity; `latest_h` and `h_baseline` come from the
/// Hamiltonian Scorer's most recent per-breadcrumb evaluation.
/// `previous_trust_score` is the identity's last issued trust score (if
/// any), used to enforce spec.md §4.6's "a CRITICAL result freezes
/// trust-score growth until the Criticality Engine completes a fresh
/// verdict": while the latest H is CRITICAL, the trust score this call
/// produces is capped at that prior value rather than allowed to rise.
pub fn compute_verdict(
    chain: &Chain,
    profile: &MobilityProfile,
    config: &VerifierConfig,
    chain_integrity: bool,
    latest_h: f64,
    h_baseline: f64,
    previous_trust_score: Option<f64>,
) -> Verdict {
    let total_breadcrumbs = chain.len() as u64;
    let unique_cells = chain.unique_cell_count() as u64;

    let displacements = extract_displacements(&chain.breadcrumbs).unwrap_or_default();
    let magnitudes: Vec<f64> = displacements.iter().map(|d| d.delta_r_km).collect();

    let spectral_fit = analyze_spectrum(&magnitudes, config).unwrap_or(SpectralFit {
        alpha: f64::NAN,
        r_squared: 0.0,
    });
    let heavy_tail_fit = fit_heavy_tail(&magnitudes, config).unwrap_or(HeavyTailFit {
        beta: f64::NAN,
        kappa_km: f64::NAN,
        quality: 0.0,
    });

    let days_since_first = match (chain.first_timestamp(), chain.last_timestamp()) {
        (Some(first), _) => (current_timestamp_secs().saturating_sub(first)) as f64 / SECONDS_PER_DAY,
        (None, _) => 0.0,
    };

    let raw_trust = raw_trust_score(total_breadcrumbs, unique_cells, days_since_first, chain_integrity, config);
    let alpha_capped_trust = apply_alpha_cap(raw_trust, spectral_fit.alpha, config);

    let classification = classification_for(total_breadcrumbs, spectral_fit.alpha, config);
    let confidence = criticality_confidence(&spectral_fit, config);
    let warning = consistency_warning(spectral_fit.alpha, heavy_tail_fit.beta);
    let alert_level = classify_alert(latest_h, h_baseline);

    // §4.6: a CRITICAL alert freezes trust-score growth until a fresh
    // verdict clears it, rather than letting trust keep climbing while
    // the identity is flagged.
    let trust_score = if alert_level == AlertLevel::Critical {
        match previous_trust_score {
            Some(prev) => alpha_capped_trust.min(prev),
            None => alpha_capped_trust,
        }
    } else {
        alpha_capped_trust
    };

    Verdict {
        alpha: spectral_fit.alpha,
        alpha_r_squared: spectral_fit.r_squared,
        beta: heavy_tail_fit.beta,
        kappa_km: heavy_tail_fit.kappa_km,
        predictability: profile.predictability,
        criticality_confidence: confidence,
        trust_score,
        classification,
        alert_level,
        unique_cell_count: unique_cells,
        total_breadcrumb_count: total_breadcrumbs,
        consistency_warning: warning,
    }
}

/// Handle-claim policy gate (spec.md §4.7): N ≥ 100 and T ≥ 20.
pub fn meets_handle_claim_policy(verdict: &Verdict) -> bool {
    verdict.total_breadcrumb_count >= 100 && verdict.trust_score >= 20.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Breadcrumb;
    use ed25519_dalek::{Keypair, PublicKey, SecretKey};
    use h3o::{LatLng, Resolution};
    use std::collections::BTreeMap;

    fn keypair() -> Keypair {
        let secret = SecretKey::from_bytes(&[9u8; 32]).unwrap();
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    fn cell_at(lat: f64, lng: f64) -> u64 {
        LatLng::new(lat, lng).unwrap().to_cell(Resolution::Nine).into()
    }

    fn crumb(kp: &Keypair, index: u64, cell: u64, timestamp: u64) -> Breadcrumb {
        Breadcrumb {
            index,
            identity: kp.public.to_bytes(),
            timestamp,
            cell,
            resolution: 9,
            context_digest: [0u8; 32],
            prev_hash: if index == 0 { None } else { Some([0u8; 32]) },
            meta: BTreeMap::new(),
            signature: [0u8; 64],
        }
    }

    #[test]
    fn short_chain_is_insufficient_data() {
        let kp = keypair();
        let config = VerifierConfig::default();
        let mut chain = Chain::new(kp.public.to_bytes());
        for i in 0..10u64 {
            let cell = cell_at(37.0 + i as f64 * 0.01, -122.0);
            chain.push_validated(crumb(&kp, i, cell, 1000 + i * 1000), [0u8; 32]);
        }
        let profile = MobilityProfile::new(kp.public.to_bytes());
        let verdict = compute_verdict(&chain, &profile, &config, true, 0.0, 0.0, None);
        assert_eq!(verdict.classification, Classification::InsufficientData);
    }

    #[test]
    fn handle_claim_policy_requires_both_thresholds() {
        let verdict = Verdict {
            alpha: 0.5,
            alpha_r_squared: 0.9,
            beta: 1.75,
            kappa_km: 8.0,
            predictability: 0.8,
            criticality_confidence: 0.9,
            trust_score: 19.9,
            classification: Classification::Human,
            alert_level: crate::core::types::AlertLevel::Nominal,
            unique_cell_count: 40,
            total_breadcrumb_count: 150,
            consistency_warning: false,
        };
        assert!(!meets_handle_claim_policy(&verdict));
    }
}
