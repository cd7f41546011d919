//! Spectral Analyzer (spec.md §4.3): Welch-style power-spectral-density
//! estimation and a power-law fit of its scaling exponent α.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::core::errors::{VerifierError, VerifierResult};
use crate::core::types::SpectralFit;
use crate::core::VerifierConfig;

/// Largest power of two ≤ `n`, floored at `floor`.
fn pow2_floor(n: usize, floor: usize) -> usize {
    if n <= floor {
        return floor;
    }
    let mut p = 1usize;
    while p * 2 <= n {
        p *= 2;
    }
    p.max(floor)
}

fn hann_window(len: usize) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (len as f64 - 1.0)).cos())
        })
        .collect()
}

/// Welch-style averaged periodogram: 50% overlapping Hann-windowed
/// segments, magnitude-squared DFT, averaged across segments.
fn welch_psd(samples: &[f64], segment_len: usize) -> Vec<f64> {
    let window = hann_window(segment_len);
    let step = (segment_len / 2).max(1);
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(segment_len);

    let mut accum = vec![0.0f64; segment_len / 2 + 1];
    let mut segment_count = 0usize;

    let mut start = 0;
    while start + segment_len <= samples.len() {
        let mut buf: Vec<Complex<f64>> = samples[start..start + segment_len]
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        fft.process(&mut buf);

        for (k, bin) in accum.iter_mut().enumerate() {
            *bin += buf[k].norm_sqr();
        }
        segment_count += 1;
        start += step;
    }

    if segment_count == 0 {
        return accum;
    }
    for bin in accum.iter_mut() {
        *bin /= segment_count as f64;
    }
    accum
}

/// Ordinary least squares fit of `y = a + b*x`, returning `(a, b, r_squared)`.
fn ols_fit(xs: &[f64], ys: &[f64]) -> (f64, f64, f64) {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x) * (x - mean_x);
    }
    if sxx == 0.0 {
        return (mean_y, 0.0, 0.0);
    }
    let b = sxy / sxx;
    let a = mean_y - b * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let predicted = a + b * x;
        ss_res += (y - predicted).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }
    let r_squared = if ss_tot == 0.0 { 0.0 } else { 1.0 - ss_res / ss_tot };
    (a, b, r_squared)
}

/// Estimate the spectral scaling exponent α over a displacement-magnitude
/// sequence. Requires at least `config.min_breadcrumbs_for_psd` samples.
pub fn analyze_spectrum(samples: &[f64], config: &VerifierConfig) -> VerifierResult<SpectralFit> {
    let n = samples.len();
    if n < config.min_breadcrumbs_for_psd {
        return Err(VerifierError::InsufficientData {
            have: n,
            need: config.min_breadcrumbs_for_psd,
        });
    }

    let segment_len = pow2_floor(n / 4, 16);
    let psd = welch_psd(samples, segment_len);

    // Discard the DC bin (index 0) and the Nyquist bin (last index).
    let usable = &psd[1..psd.len().saturating_sub(1)];
    if usable.len() < 2 {
        return Ok(SpectralFit {
            alpha: f64::NAN,
            r_squared: 0.0,
        });
    }

    let mut xs = Vec::with_capacity(usable.len());
    let mut ys = Vec::with_capacity(usable.len());
    for (offset, &power) in usable.iter().enumerate() {
        let k = offset + 1;
        let freq = k as f64 / segment_len as f64;
        if power <= 0.0 || freq <= 0.0 {
            continue;
        }
        xs.push(freq.ln());
        ys.push(power.ln());
    }

    if xs.len() < 2 {
        return Ok(SpectralFit {
            alpha: f64::NAN,
            r_squared: 0.0,
        });
    }

    let (_intercept, slope, r_squared) = ols_fit(&xs, &ys);
    let alpha = -slope;

    if !alpha.is_finite() {
        return Ok(SpectralFit {
            alpha: f64::NAN,
            r_squared: 0.0,
        });
    }
    Ok(SpectralFit {
        alpha,
        r_squared: r_squared.max(0.0),
    })
}

/// Criticality confidence derived from a spectral fit (spec.md §4.3).
pub fn criticality_confidence(fit: &SpectralFit, config: &VerifierConfig) -> f64 {
    if !fit.alpha.is_finite() {
        return 0.0;
    }
    let alpha_score =
        (1.0 - (fit.alpha - config.alpha_center).abs() / config.alpha_half_width).max(0.0);
    let r_squared = fit.r_squared.max(0.0);
    (alpha_score * r_squared).clamp(0.0, 1.0)
}

/// Classification band for a spectral exponent (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralBand {
    Synthetic,
    Biological,
    ReplayDrift,
    Suspicious,
}

pub fn classify_alpha(alpha: f64, config: &VerifierConfig) -> SpectralBand {
    if !alpha.is_finite() {
        return SpectralBand::Suspicious;
    }
    let (lo, hi) = config.alpha_biological_range;
    if alpha < 0.15 {
        SpectralBand::Synthetic
    } else if alpha >= lo && alpha <= hi {
        SpectralBand::Biological
    } else if alpha >= 1.20 {
        SpectralBand::ReplayDrift
    } else {
        SpectralBand::Suspicious
    }
}
