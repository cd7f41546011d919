use serde::{Deserialize, Serialize};

/// Runtime-configurable knobs enumerated in spec.md §6. All fields have
/// protocol defaults; deployments may override them (spec.md §9, Open
/// Question a) without changing wire formats, since none of these values
/// are carried on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Default hexagonal cell resolution (7..10).
    pub cell_resolution_default: u8,
    /// Minimum breadcrumbs before spectral analysis is defined.
    pub min_breadcrumbs_for_psd: usize,
    /// Recommended spectral analysis window.
    pub recommended_window: usize,
    /// Per-cell breadcrumb cap.
    pub per_cell_cap: u32,
    /// Breadcrumbs per sealed epoch.
    pub epoch_size: u64,
    /// Minimum breadcrumbs at a cell before it counts as an anchor.
    pub anchor_threshold: u32,
    /// Liveness challenge response deadline, in seconds.
    pub challenge_deadline_secs: u64,
    /// Maximum allowed freshness window for a challenge, in seconds.
    pub response_deadline_max_secs: u64,
    /// [low, high) biological α band.
    pub alpha_biological_range: (f64, f64),
    /// Center of the criticality-confidence bell curve.
    pub alpha_center: f64,
    /// Half-width of the criticality-confidence bell curve.
    pub alpha_half_width: f64,
    /// Hard floor on the inter-breadcrumb collection interval, in seconds.
    pub min_collection_interval_secs: u64,
    /// Soft policy-warning threshold on the collection interval, in seconds.
    pub soft_collection_interval_secs: u64,
    /// Worker-pool concurrency cap (spec.md §5, "Backpressure"). Requests
    /// beyond this many in-flight CPU-bound jobs fail fast with
    /// `RESOURCE_EXHAUSTED` rather than queueing unboundedly.
    pub max_concurrent_batch_jobs: usize,
    pub trust_score_weights: TrustScoreWeights,
    pub hamiltonian_weights: HamiltonianWeights,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustScoreWeights {
    pub count_weight: f64,
    pub count_saturation: f64,
    pub unique_cells_weight: f64,
    pub unique_cells_saturation: f64,
    pub longevity_weight: f64,
    pub longevity_saturation_days: f64,
    pub integrity_weight: f64,
}

impl Default for TrustScoreWeights {
    fn default() -> Self {
        Self {
            count_weight: 40.0,
            count_saturation: 200.0,
            unique_cells_weight: 30.0,
            unique_cells_saturation: 50.0,
            longevity_weight: 20.0,
            longevity_saturation_days: 365.0,
            integrity_weight: 10.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HamiltonianWeights {
    pub spatial: f64,
    pub temporal: f64,
    pub kinetic: f64,
    pub flock: f64,
    pub context: f64,
    pub structure: f64,
}

impl Default for HamiltonianWeights {
    fn default() -> Self {
        Self {
            spatial: 0.25,
            temporal: 0.20,
            kinetic: 0.20,
            flock: 0.15,
            context: 0.10,
            structure: 0.10,
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            cell_resolution_default: 10,
            min_breadcrumbs_for_psd: 64,
            recommended_window: 256,
            per_cell_cap: 10,
            epoch_size: 100,
            anchor_threshold: 5,
            challenge_deadline_secs: 30,
            response_deadline_max_secs: 3600,
            alpha_biological_range: (0.30, 0.80),
            alpha_center: 0.55,
            alpha_half_width: 0.25,
            min_collection_interval_secs: 5 * 60,
            soft_collection_interval_secs: 15 * 60,
            max_concurrent_batch_jobs: 64,
            trust_score_weights: TrustScoreWeights::default(),
            hamiltonian_weights: HamiltonianWeights::default(),
        }
    }
}

impl VerifierConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let cfg = VerifierConfig::default();
        assert_eq!(cfg.min_breadcrumbs_for_psd, 64);
        assert_eq!(cfg.epoch_size, 100);
        assert_eq!(cfg.anchor_threshold, 5);
        assert_eq!(cfg.alpha_biological_range, (0.30, 0.80));
    }

    #[test]
    fn overrides_round_trip_through_toml() {
        let toml_src = r#"
            cell_resolution_default = 9
            challenge_deadline_secs = 45
        "#;
        let cfg = VerifierConfig::from_toml_str(toml_src).unwrap();
        assert_eq!(cfg.cell_resolution_default, 9);
        assert_eq!(cfg.challenge_deadline_secs, 45);
        // Unspecified fields keep their protocol defaults.
        assert_eq!(cfg.epoch_size, 100);
    }
}
