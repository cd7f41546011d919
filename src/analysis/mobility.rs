//! Mobility Profiler (spec.md §4.5, §3 "Mobility Profile"): per-identity
//! anchor cells, Markov transition matrix, circadian/weekly histograms,
//! and the rolling state the Hamiltonian Scorer reads from.

use std::collections::{HashMap, VecDeque};

use crate::analysis::heavy_tail::fitted_quantile;
use crate::core::types::{CellId, HeavyTailFit, IdentityKey};
use crate::core::VerifierConfig;
use crate::geo::cell::{haversine_km, tangent_vector};

/// Dense index into the per-identity anchor intern table. No back-pointers
/// to cells; callers resolve `AnchorIdx -> CellId` through the profile.
pub type AnchorIdx = usize;

const H_BASELINE_WINDOW: usize = 64;
const TRANSITION_WINDOW: usize = 512;

/// Running mean of a 2D tangent-plane displacement vector, used for the
/// H_flock fallback (spec.md §4.6): the identity's own historical mean
/// vector at the (anchor, hour) bucket it currently occupies.
#[derive(Clone, Copy, Debug, Default)]
struct RunningVector {
    sum_x: f64,
    sum_y: f64,
    count: u32,
}

impl RunningVector {
    fn add(&mut self, x: f64, y: f64) {
        self.sum_x += x;
        self.sum_y += y;
        self.count += 1;
    }

    fn mean(&self) -> Option<(f64, f64)> {
        if self.count == 0 {
            None
        } else {
            Some((self.sum_x / self.count as f64, self.sum_y / self.count as f64))
        }
    }
}

pub struct MobilityProfile {
    pub identity: IdentityKey,
    cell_counts: HashMap<CellId, u32>,
    anchor_index: HashMap<CellId, AnchorIdx>,
    anchors: Vec<CellId>,
    transitions: HashMap<AnchorIdx, HashMap<AnchorIdx, u32>>,
    /// Row-normalized transition matrix, rebuilt at epoch boundaries.
    transition_matrix: HashMap<AnchorIdx, HashMap<AnchorIdx, f64>>,
    /// Recent (from, to) anchor transitions, bounded, used to recompute Π.
    recent_transitions: VecDeque<(AnchorIdx, AnchorIdx)>,
    pub hour_histogram: [u32; 24],
    pub weekday_histogram: [u32; 7],
    last_anchor: Option<AnchorIdx>,
    flock_fallback: HashMap<(AnchorIdx, u8), RunningVector>,
    h_history: VecDeque<f64>,
    pub last_heavy_tail_fit: Option<HeavyTailFit>,
    pub spatial_anomaly_count: u64,
    pub predictability: f64,
}

impl MobilityProfile {
    pub fn new(identity: IdentityKey) -> Self {
        Self {
            identity,
            cell_counts: HashMap::new(),
            anchor_index: HashMap::new(),
            anchors: Vec::new(),
            transitions: HashMap::new(),
            transition_matrix: HashMap::new(),
            recent_transitions: VecDeque::new(),
            hour_histogram: [0; 24],
            weekday_histogram: [0; 7],
            last_anchor: None,
            flock_fallback: HashMap::new(),
            h_history: VecDeque::with_capacity(H_BASELINE_WINDOW),
            last_heavy_tail_fit: None,
            spatial_anomaly_count: 0,
            predictability: 0.0,
        }
    }

    pub fn anchor_cell(&self, idx: AnchorIdx) -> Option<CellId> {
        self.anchors.get(idx).copied()
    }

    pub fn is_anchor(&self, cell: CellId) -> bool {
        self.anchor_index.contains_key(&cell)
    }

    /// Read-only lookup of the anchor nearest `cell`, without interning a
    /// new anchor or mutating any state. `None` if no anchors exist yet.
    /// Used by callers (the Hamiltonian Scorer's input assembly) that
    /// need today's anchor structure without triggering the side effects
    /// `observe` applies once per breadcrumb.
    pub fn anchor_for(&self, cell: CellId) -> Option<AnchorIdx> {
        self.nearest_anchor(cell)
    }

    fn intern_anchor(&mut self, cell: CellId) -> AnchorIdx {
        if let Some(&idx) = self.anchor_index.get(&cell) {
            return idx;
        }
        let idx = self.anchors.len();
        self.anchors.push(cell);
        self.anchor_index.insert(cell, idx);
        idx
    }

    /// Find the anchor nearest to `cell` by great-circle distance. Used
    /// when `cell` itself is not (yet) an anchor so transitions can still
    /// be attributed to the surrounding anchor structure.
    fn nearest_anchor(&self, cell: CellId) -> Option<AnchorIdx> {
        if let Some(&idx) = self.anchor_index.get(&cell) {
            return Some(idx);
        }
        self.anchors
            .iter()
            .enumerate()
            .filter_map(|(idx, &anchor_cell)| haversine_km(cell, anchor_cell).ok().map(|d| (idx, d)))
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, _)| idx)
    }

    /// Streaming update on each accepted breadcrumb (spec.md §4.5).
    /// `hour` is 0..24, `weekday` is 0..7 (Monday = 0).
    pub fn observe(
        &mut self,
        cell: CellId,
        prev_cell: Option<CellId>,
        hour: u8,
        weekday: u8,
        config: &VerifierConfig,
    ) {
        let count = self.cell_counts.entry(cell).or_insert(0);
        *count += 1;
        let became_anchor_eligible = *count >= config.anchor_threshold;

        self.hour_histogram[(hour as usize).min(23)] += 1;
        self.weekday_histogram[(weekday as usize).min(6)] += 1;

        if became_anchor_eligible {
            self.intern_anchor(cell);
        }

        let current_anchor = self.nearest_anchor(cell);
        let prev_anchor = prev_cell.and_then(|pc| self.nearest_anchor(pc)).or(self.last_anchor);

        if let (Some(from), Some(to)) = (prev_anchor, current_anchor) {
            *self
                .transitions
                .entry(from)
                .or_insert_with(HashMap::new)
                .entry(to)
                .or_insert(0) += 1;
            self.recent_transitions.push_back((from, to));
            while self.recent_transitions.len() > TRANSITION_WINDOW {
                self.recent_transitions.pop_front();
            }
        }

        if let (Some(from_anchor), Some(pc)) = (prev_anchor, prev_cell) {
            if let Ok((dx, dy)) = tangent_vector(pc, cell) {
                self.flock_fallback
                    .entry((from_anchor, hour))
                    .or_insert_with(RunningVector::default)
                    .add(dx, dy);
            }
        }

        self.last_anchor = current_anchor;
    }

    /// Rebuild the row-normalized Markov transition matrix and
    /// predictability Π over the current recent-transition window. Called
    /// at epoch boundaries (spec.md §4.5).
    pub fn rebuild_transition_matrix(&mut self) {
        self.transition_matrix.clear();
        for (&from, row) in &self.transitions {
            let total: u32 = row.values().sum();
            if total == 0 {
                continue;
            }
            let normalized: HashMap<AnchorIdx, f64> = row
                .iter()
                .map(|(&to, &count)| (to, count as f64 / total as f64))
                .collect();
            self.transition_matrix.insert(from, normalized);
        }

        if self.recent_transitions.is_empty() {
            self.predictability = 0.0;
            return;
        }
        let mut hits = 0usize;
        for &(from, to) in &self.recent_transitions {
            let argmax = self
                .transition_matrix
                .get(&from)
                .and_then(|row| row.iter().max_by(|a, b| a.1.partial_cmp(b.1).unwrap()))
                .map(|(&idx, _)| idx);
            if argmax == Some(to) {
                hits += 1;
            }
        }
        self.predictability = hits as f64 / self.recent_transitions.len() as f64;
    }

    /// Transition probability `T[from][to]`, `0.0` if unseen.
    pub fn transition_probability(&self, from: AnchorIdx, to: AnchorIdx) -> f64 {
        self.transition_matrix
            .get(&from)
            .and_then(|row| row.get(&to))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn current_anchor(&self) -> Option<AnchorIdx> {
        self.last_anchor
    }

    /// The identity's own historical mean displacement vector for steps
    /// departing `anchor` at `hour`, the H_flock fallback (spec.md §4.6,
    /// §9 Open Question b). Keyed by the anchor a step *left from*, to
    /// match `observe`'s write key; callers must look this up against the
    /// same step's departure anchor, not its arrival anchor.
    pub fn historical_mean_vector(&self, anchor: AnchorIdx, hour: u8) -> Option<(f64, f64)> {
        self.flock_fallback.get(&(anchor, hour)).and_then(RunningVector::mean)
    }

    /// Push a realized Hamiltonian value into the rolling baseline window
    /// (spec.md §4.6: "rolling median over the last 64 H values").
    pub fn push_h(&mut self, h: f64) {
        self.h_history.push_back(h);
        while self.h_history.len() > H_BASELINE_WINDOW {
            self.h_history.pop_front();
        }
    }

    pub fn h_baseline(&self) -> f64 {
        let values: Vec<f64> = self.h_history.iter().copied().collect();
        crate::core::utils::median(&values)
    }

    pub fn h_history_len(&self) -> usize {
        self.h_history.len()
    }

    /// Regularity-score input (spec.md §4.6 H_structure a): standard
    /// deviation of the last 16 inter-breadcrumb intervals, in seconds.
    pub fn interval_stddev(&self, recent_deltas: &[f64]) -> f64 {
        if recent_deltas.len() < 2 {
            return f64::INFINITY;
        }
        let mean = recent_deltas.iter().sum::<f64>() / recent_deltas.len() as f64;
        let variance = recent_deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / recent_deltas.len() as f64;
        variance.sqrt()
    }

    /// Record a fresh heavy-tail fit and, against it, check whether
    /// `delta_r_km` exceeds the fitted 99.9th percentile, incrementing
    /// the spatial-anomaly counter if so (spec.md §4.4).
    pub fn record_displacement_against_fit(&mut self, delta_r_km: f64, fit: HeavyTailFit, xmin: f64) {
        let xmax = (delta_r_km.max(fit.kappa_km * 10.0) * 2.0).max(xmin * 2.0);
        let p999 = fitted_quantile(&fit, xmin, xmax, 0.999);
        if delta_r_km > p999 {
            self.spatial_anomaly_count += 1;
        }
        self.last_heavy_tail_fit = Some(fit);
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h3o::{LatLng, Resolution};

    fn cell_at(lat: f64, lng: f64) -> CellId {
        LatLng::new(lat, lng).unwrap().to_cell(Resolution::Nine).into()
    }

    #[test]
    fn cell_becomes_anchor_after_threshold() {
        let mut config = VerifierConfig::default();
        config.anchor_threshold = 3;
        let mut profile = MobilityProfile::new([0u8; 32]);
        let home = cell_at(37.0, -122.0);
        let away = cell_at(38.0, -121.0);

        for i in 0..3u8 {
            profile.observe(home, Some(away), i as u8 % 24, 0, &config);
        }
        assert!(profile.is_anchor(home));
    }

    #[test]
    fn predictability_is_one_for_a_deterministic_cycle() {
        let mut config = VerifierConfig::default();
        config.anchor_threshold = 1;
        let mut profile = MobilityProfile::new([0u8; 32]);
        let a = cell_at(37.0, -122.0);
        let b = cell_at(38.0, -121.0);

        let mut prev = None;
        for i in 0..40 {
            let cell = if i % 2 == 0 { a } else { b };
            profile.observe(cell, prev, (i % 24) as u8, (i % 7) as u8, &config);
            prev = Some(cell);
        }
        profile.rebuild_transition_matrix();
        assert!(profile.predictability > 0.9);
    }

    #[test]
    fn unseen_transition_probability_is_zero() {
        let profile = MobilityProfile::new([0u8; 32]);
        assert_eq!(profile.transition_probability(0, 1), 0.0);
    }
}
