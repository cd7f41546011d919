//! Displacement series extraction (spec.md §3 "Displacement Series", §4.2).

use crate::core::errors::VerifierResult;
use crate::core::types::{Breadcrumb, Displacement};
use crate::geo::cell::haversine_km;

/// Derive the (Δr, Δt) series for a chain of breadcrumbs, in order.
/// Lazily regenerated from the chain; never cached across mutation since
/// the Verifier appends to chains (spec.md §3).
pub fn extract_displacements(breadcrumbs: &[Breadcrumb]) -> VerifierResult<Vec<Displacement>> {
    let mut series = Vec::with_capacity(breadcrumbs.len().saturating_sub(1));
    for pair in breadcrumbs.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let delta_r_km = haversine_km(prev.cell, cur.cell)?;
        let delta_t_s = (cur.timestamp.saturating_sub(prev.timestamp)) as f64;
        series.push(Displacement {
            delta_r_km,
            delta_t_s,
        });
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Hash32;
    use h3o::{LatLng, Resolution};
    use std::collections::BTreeMap;

    fn crumb(index: u64, cell: u64, timestamp: u64, prev_hash: Option<Hash32>) -> Breadcrumb {
        Breadcrumb {
            index,
            identity: [1u8; 32],
            timestamp,
            cell,
            resolution: 9,
            context_digest: [0u8; 32],
            prev_hash,
            meta: BTreeMap::new(),
            signature: [0u8; 64],
        }
    }

    #[test]
    fn empty_and_singleton_chains_produce_no_displacement() {
        assert!(extract_displacements(&[]).unwrap().is_empty());
        assert!(extract_displacements(&[crumb(0, 1, 0, None)])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn series_length_is_n_minus_one() {
        let sf: u64 = LatLng::new(37.7749, -122.4194)
            .unwrap()
            .to_cell(Resolution::Nine)
            .into();
        let nyc: u64 = LatLng::new(40.7128, -74.0060)
            .unwrap()
            .to_cell(Resolution::Nine)
            .into();
        let chain = vec![
            crumb(0, sf, 1_000, None),
            crumb(1, nyc, 1_900, Some([0u8; 32])),
            crumb(2, sf, 2_800, Some([0u8; 32])),
        ];
        let series = extract_displacements(&chain).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].delta_t_s, 900.0);
        assert_eq!(series[1].delta_t_s, 900.0);
    }
}
