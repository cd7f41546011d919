//! Hamiltonian Scorer (spec.md §4.6): the six-component per-breadcrumb
//! energy score H and its rolling baseline / alert classification.

use crate::analysis::heavy_tail::neg_log_density;
use crate::core::config::HamiltonianWeights;
use crate::core::types::{AlertLevel, HeavyTailFit};

const EPS: f64 = 1e-3;
const CHAIN_BREAK_PENALTY: f64 = 10.0;
const MATURITY_SATURATION_COUNT: f64 = 200.0;

/// Per-breadcrumb realized value of each of the six components. Optional
/// fields are `None` when the underlying capability (co-located peers, an
/// IMU-magnitude model) is absent; their weight is then redistributed
/// across the present components (spec.md §4.6, §9 REDESIGN FLAG).
#[derive(Clone, Copy, Debug)]
pub struct HamiltonianComponents {
    pub spatial: f64,
    pub temporal: f64,
    pub kinetic: f64,
    pub flock: Option<f64>,
    pub context: Option<f64>,
    pub structure: f64,
}

/// Everything the scorer needs to evaluate one breadcrumb. Assembled by
/// the caller (the Criticality Engine) from the displacement extractor,
/// the heavy-tail fit, and the mobility profile.
pub struct HamiltonianInput<'a> {
    pub delta_r_km: f64,
    pub heavy_tail_fit: &'a HeavyTailFit,
    pub xmin_km: f64,
    pub xmax_km: f64,
    pub hour_histogram: &'a [u32; 24],
    pub weekday_histogram: &'a [u32; 7],
    pub hour: u8,
    pub weekday: u8,
    pub transition_probability: f64,
    /// `cos θ` against peer or historical-fallback mean displacement,
    /// already resolved by the caller. `None` if neither is available.
    pub flock_cosine: Option<f64>,
    /// Opaque sensor-divergence input (spec.md §4.6, §9 Open Question c).
    pub context_divergence: Option<f64>,
    pub interval_stddev_secs: f64,
    pub chain_break: bool,
    pub recent_velocities: &'a [f64],
}

fn histogram_probability(histogram: &[u32], index: usize) -> f64 {
    let total: u32 = histogram.iter().sum();
    if total == 0 {
        return EPS;
    }
    (histogram[index] as f64 / total as f64).max(EPS)
}

/// A loop traced in velocity-acceleration space that is neither a tight,
/// smooth closed curve (a well-behaved gait or commute) nor a degenerate
/// near-zero-area line scores low; a jagged or near-collapsed trajectory
/// scores high. Uses the isoperimetric ratio `area / perimeter^2`,
/// maximized by a circle, as the compactness measure.
fn phase_space_irregularity(velocities: &[f64]) -> f64 {
    if velocities.len() < 3 {
        return 0.0;
    }
    let accelerations: Vec<f64> = velocities.windows(2).map(|w| w[1] - w[0]).collect();
    let n = accelerations.len();
    if n < 2 {
        return 0.0;
    }
    let points: Vec<(f64, f64)> = velocities[..n].iter().zip(accelerations.iter()).map(|(&v, &a)| (v, a)).collect();

    let mut shoelace = 0.0;
    let mut perimeter = 0.0;
    for i in 0..points.len() {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % points.len()];
        shoelace += x0 * y1 - x1 * y0;
        perimeter += ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
    }
    let area = 0.5 * shoelace.abs();
    if perimeter <= 0.0 {
        return 1.0;
    }
    let compactness = area / perimeter.powi(2);
    let circle_compactness = 1.0 / (4.0 * std::f64::consts::PI);
    (1.0 - (compactness / circle_compactness).min(1.0)).max(0.0)
}

/// Evaluate the six components for one breadcrumb.
pub fn evaluate_components(input: &HamiltonianInput) -> HamiltonianComponents {
    let spatial = neg_log_density(input.delta_r_km, input.heavy_tail_fit, input.xmin_km, input.xmax_km);

    let hour_p = histogram_probability(input.hour_histogram, (input.hour as usize).min(23));
    let weekday_p = histogram_probability(input.weekday_histogram, (input.weekday as usize).min(6));
    let temporal = -hour_p.ln() - weekday_p.ln();

    let kinetic = -(input.transition_probability.max(EPS)).ln();

    let flock = input.flock_cosine.map(|cos_theta| 1.0 - cos_theta.max(0.0));
    let context = input.context_divergence;

    let regularity = if input.interval_stddev_secs < 30.0 { 1.0 } else { 0.0 };
    let chain_break_term = if input.chain_break { CHAIN_BREAK_PENALTY } else { 0.0 };
    let irregularity = phase_space_irregularity(input.recent_velocities);
    let structure = regularity + chain_break_term + irregularity;

    HamiltonianComponents {
        spatial,
        temporal,
        kinetic,
        flock,
        context,
        structure,
    }
}

/// Combine the six components into H, redistributing the weight of any
/// absent component proportionally over the present ones, then scaling
/// by the profile-maturity factor `m = min(breadcrumb_count/200, 1.0)`
/// (spec.md §4.6).
pub fn combine(components: &HamiltonianComponents, weights: &HamiltonianWeights, breadcrumb_count: u64) -> f64 {
    let mut present: Vec<(f64, f64)> = vec![
        (weights.spatial, components.spatial),
        (weights.temporal, components.temporal),
        (weights.kinetic, components.kinetic),
        (weights.structure, components.structure),
    ];
    let mut missing_weight = 0.0;

    match components.flock {
        Some(v) => present.push((weights.flock, v)),
        None => missing_weight += weights.flock,
    }
    match components.context {
        Some(v) => present.push((weights.context, v)),
        None => missing_weight += weights.context,
    }

    let present_weight: f64 = present.iter().map(|(w, _)| w).sum();
    let redistribution = if present_weight > 0.0 {
        (present_weight + missing_weight) / present_weight
    } else {
        1.0
    };

    let raw: f64 = present.iter().map(|(w, v)| w * redistribution * v).sum();
    let maturity = (breadcrumb_count as f64 / MATURITY_SATURATION_COUNT).min(1.0);
    raw * maturity
}

/// Score one breadcrumb end to end: components, then the combined H.
pub fn score(input: &HamiltonianInput, weights: &HamiltonianWeights, breadcrumb_count: u64) -> (f64, HamiltonianComponents) {
    let components = evaluate_components(input);
    let h = combine(&components, weights, breadcrumb_count);
    (h, components)
}

/// Alert band for a realized H against its rolling baseline (spec.md §4.6).
pub fn classify_alert(h: f64, baseline: f64) -> AlertLevel {
    if h < 1.5 * baseline {
        AlertLevel::Nominal
    } else if h < 3.0 {
        AlertLevel::Elevated
    } else if h < 5.0 {
        AlertLevel::Suspicious
    } else {
        AlertLevel::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::HeavyTailFit;

    fn fit() -> HeavyTailFit {
        HeavyTailFit {
            beta: 1.75,
            kappa_km: 8.0,
            quality: 0.5,
        }
    }

    fn base_input<'a>(
        hour_hist: &'a [u32; 24],
        weekday_hist: &'a [u32; 7],
        fit: &'a HeavyTailFit,
        velocities: &'a [f64],
    ) -> HamiltonianInput<'a> {
        HamiltonianInput {
            delta_r_km: 0.5,
            heavy_tail_fit: fit,
            xmin_km: 0.001,
            xmax_km: 200.0,
            hour_histogram: hour_hist,
            weekday_histogram: weekday_hist,
            hour: 8,
            weekday: 1,
            transition_probability: 0.8,
            flock_cosine: None,
            context_divergence: None,
            interval_stddev_secs: 120.0,
            chain_break: false,
            recent_velocities: velocities,
        }
    }

    #[test]
    fn missing_components_redistribute_weight_to_sum_one() {
        let hour_hist = [10u32; 24];
        let weekday_hist = [10u32; 7];
        let fit = fit();
        let velocities = [1.0, 1.2, 0.9, 1.1];
        let input = base_input(&hour_hist, &weekday_hist, &fit, &velocities);
        let components = evaluate_components(&input);
        assert!(components.flock.is_none());
        assert!(components.context.is_none());

        let weights = HamiltonianWeights::default();
        let h_full_maturity = combine(&components, &weights, 200);
        let manual_weight_sum =
            weights.spatial + weights.temporal + weights.kinetic + weights.structure;
        let expected = (weights.spatial * components.spatial
            + weights.temporal * components.temporal
            + weights.kinetic * components.kinetic
            + weights.structure * components.structure)
            / manual_weight_sum;
        assert!((h_full_maturity - expected).abs() < 1e-9);
    }

    #[test]
    fn immature_profile_dampens_the_score() {
        let hour_hist = [10u32; 24];
        let weekday_hist = [10u32; 7];
        let fit = fit();
        let velocities = [1.0, 1.2, 0.9, 1.1];
        let input = base_input(&hour_hist, &weekday_hist, &fit, &velocities);
        let components = evaluate_components(&input);
        let weights = HamiltonianWeights::default();

        let h_new = combine(&components, &weights, 0);
        assert_eq!(h_new, 0.0);

        let h_mature = combine(&components, &weights, 200);
        assert!(h_mature > h_new);
    }

    #[test]
    fn chain_break_dominates_the_structure_component() {
        let hour_hist = [10u32; 24];
        let weekday_hist = [10u32; 7];
        let fit = fit();
        let velocities = [1.0, 1.05, 0.98];
        let mut input = base_input(&hour_hist, &weekday_hist, &fit, &velocities);
        input.chain_break = true;
        let components = evaluate_components(&input);
        assert!(components.structure >= CHAIN_BREAK_PENALTY);
    }

    #[test]
    fn alert_bands_follow_the_configured_thresholds() {
        assert_eq!(classify_alert(1.0, 10.0), AlertLevel::Nominal);
        assert_eq!(classify_alert(2.0, 1.0), AlertLevel::Elevated);
        assert_eq!(classify_alert(4.0, 1.0), AlertLevel::Suspicious);
        assert_eq!(classify_alert(6.0, 1.0), AlertLevel::Critical);
    }

    #[test]
    fn a_smooth_closed_loop_is_less_irregular_than_a_jagged_path() {
        let smooth: Vec<f64> = (0..32)
            .map(|i| (i as f64 * std::f64::consts::TAU / 32.0).sin())
            .collect();
        let jagged: Vec<f64> = (0..32).map(|i| if i % 2 == 0 { 5.0 } else { -5.0 }).collect();
        assert!(phase_space_irregularity(&smooth) < phase_space_irregularity(&jagged));
    }
}
