//! Heavy-Tail Fitter (spec.md §4.4): maximum-likelihood fit of a
//! truncated power-law displacement distribution
//! `P(Δr) ∝ Δr^(-β) · exp(-Δr/κ)`.

use crate::core::errors::{VerifierError, VerifierResult};
use crate::core::types::HeavyTailFit;
use crate::core::VerifierConfig;
use crate::geo::cell::MIN_DISPLACEMENT_KM;

const BETA_MIN: f64 = 1.0;
const BETA_MAX: f64 = 3.0;
const KAPPA_MIN: f64 = 0.05;
const KAPPA_MAX: f64 = 1000.0;
const INTEGRATION_STEPS: usize = 400;
const COORDINATE_DESCENT_ROUNDS: usize = 6;

fn pdf_kernel(x: f64, beta: f64, kappa: f64) -> f64 {
    x.powf(-beta) * (-x / kappa).exp()
}

/// Composite Simpson's rule over an even number of steps.
fn simpson_integral(f: impl Fn(f64) -> f64, a: f64, b: f64, steps: usize) -> f64 {
    let n = if steps % 2 == 0 { steps } else { steps + 1 };
    if b <= a {
        return 0.0;
    }
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let x = a + i as f64 * h;
        sum += if i % 2 == 0 { 2.0 * f(x) } else { 4.0 * f(x) };
    }
    sum * h / 3.0
}

fn normalizer(beta: f64, kappa: f64, xmin: f64, xmax: f64) -> f64 {
    simpson_integral(|x| pdf_kernel(x, beta, kappa), xmin, xmax, INTEGRATION_STEPS)
}

fn log_likelihood(samples: &[f64], beta: f64, kappa: f64, xmin: f64, xmax: f64) -> f64 {
    let z = normalizer(beta, kappa, xmin, xmax);
    if !(z.is_finite()) || z <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let n = samples.len() as f64;
    let data_term: f64 = samples.iter().map(|&x| -beta * x.ln() - x / kappa).sum();
    data_term - n * z.ln()
}

/// Hill-estimator seed for β over the upper tail of `samples`.
fn hill_seed(samples: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = samples.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let k = (sorted.len() / 4).max(2).min(sorted.len());
    let threshold = sorted[k - 1].max(MIN_DISPLACEMENT_KM);
    let tail = &sorted[..k];
    let sum_log_ratio: f64 = tail.iter().map(|&x| (x / threshold).max(1.0).ln()).sum();
    if sum_log_ratio <= 0.0 {
        return 1.5;
    }
    (1.0 + (k as f64) / sum_log_ratio).clamp(BETA_MIN, BETA_MAX)
}

/// Golden-section search for the maximizer of `f` over `[lo, hi]`.
fn golden_section_max(lo: f64, hi: f64, iterations: usize, f: impl Fn(f64) -> f64) -> f64 {
    let gr = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut a = lo;
    let mut b = hi;
    let mut c = b - gr * (b - a);
    let mut d = a + gr * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);
    for _ in 0..iterations {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - gr * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + gr * (b - a);
            fd = f(d);
        }
    }
    (a + b) / 2.0
}

/// Fit β and κ by maximum likelihood over the most recent
/// `config.epoch_size` displacement magnitudes (or fewer, if not yet
/// available). Requires at least 8 samples to produce a meaningful fit.
pub fn fit_heavy_tail(magnitudes_km: &[f64], config: &VerifierConfig) -> VerifierResult<HeavyTailFit> {
    if magnitudes_km.len() < 8 {
        return Err(VerifierError::InsufficientData {
            have: magnitudes_km.len(),
            need: 8,
        });
    }

    let window_start = magnitudes_km.len().saturating_sub(config.epoch_size as usize);
    let samples = &magnitudes_km[window_start..];

    let xmin = samples
        .iter()
        .cloned()
        .fold(f64::INFINITY, f64::min)
        .min(MIN_DISPLACEMENT_KM)
        .max(MIN_DISPLACEMENT_KM);
    let observed_max = samples.iter().cloned().fold(0.0, f64::max);

    let mut beta = hill_seed(samples);
    let mut kappa = (observed_max / 4.0).clamp(KAPPA_MIN, KAPPA_MAX);

    for _ in 0..COORDINATE_DESCENT_ROUNDS {
        let xmax = (observed_max.max(kappa * 10.0) * 2.0).max(xmin * 2.0);
        let kappa_fixed = kappa;
        beta = golden_section_max(BETA_MIN, BETA_MAX, 30, |b| {
            log_likelihood(samples, b, kappa_fixed, xmin, xmax)
        });
        let beta_fixed = beta;
        kappa = golden_section_max(KAPPA_MIN, KAPPA_MAX, 40, |k| {
            log_likelihood(samples, beta_fixed, k, xmin, xmax)
        });
    }

    let xmax = (observed_max.max(kappa * 10.0) * 2.0).max(xmin * 2.0);
    let z = normalizer(beta, kappa, xmin, xmax);
    let quality = if z > 0.0 && z.is_finite() {
        (simpson_integral(|x| pdf_kernel(x, beta, kappa), xmin, observed_max, INTEGRATION_STEPS) / z)
            .clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(HeavyTailFit {
        beta,
        kappa_km: kappa,
        quality,
    })
}

/// Inverse-CDF lookup by bisection: the displacement magnitude at which
/// the fitted truncated distribution reaches cumulative probability `p`.
/// Used to derive the 99.9th-percentile spatial-anomaly threshold.
pub fn fitted_quantile(fit: &HeavyTailFit, xmin: f64, xmax_hint: f64, p: f64) -> f64 {
    let xmax = xmax_hint.max(xmin * 2.0);
    let z = normalizer(fit.beta, fit.kappa_km, xmin, xmax);
    if z <= 0.0 || !z.is_finite() {
        return xmax;
    }
    let cdf = |x: f64| -> f64 {
        simpson_integral(|t| pdf_kernel(t, fit.beta, fit.kappa_km), xmin, x, 200) / z
    };
    let mut lo = xmin;
    let mut hi = xmax;
    for _ in 0..40 {
        let mid = (lo + hi) / 2.0;
        if cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) / 2.0
}

/// §4.4 internal-consistency check between the spectral exponent α and
/// the heavy-tail exponent β. Advisory only; never affects classification.
pub fn consistency_warning(alpha: f64, beta: f64) -> bool {
    if !alpha.is_finite() {
        return true;
    }
    let lower = 0.3 * (3.0 - beta);
    let upper = 0.7 * (3.0 - beta);
    !(alpha >= lower && alpha <= upper)
}

/// `-ln P(Δr)` under the fitted distribution, the spatial Hamiltonian
/// component's building block (spec.md §4.6). Floors the density at a
/// small positive value so near-zero-probability displacements don't
/// blow up to infinity.
pub fn neg_log_density(delta_r_km: f64, fit: &HeavyTailFit, xmin: f64, xmax: f64) -> f64 {
    let z = normalizer(fit.beta, fit.kappa_km, xmin, xmax);
    if z <= 0.0 || !z.is_finite() {
        return 10.0;
    }
    let density = (pdf_kernel(delta_r_km, fit.beta, fit.kappa_km) / z).max(1e-9);
    -density.ln()
}
