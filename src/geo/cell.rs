//! Hexagonal-cell centroid lookup and great-circle distance (spec.md §4.2).

use h3o::{CellIndex, LatLng};

use crate::core::errors::{VerifierError, VerifierResult};
use crate::core::types::CellId;

/// Mean Earth radius in kilometers, per spec.md §4.2.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Floor applied to degenerate (near-zero) distances so that log-domain
/// computations downstream never see exactly zero (spec.md §8).
pub const MIN_DISPLACEMENT_KM: f64 = 0.001;

/// Resolve a cell identifier to its centroid, in radians.
pub fn centroid_radians(cell: CellId) -> VerifierResult<(f64, f64)> {
    let index = CellIndex::try_from(cell)
        .map_err(|e| VerifierError::MalformedEncoding(format!("invalid H3 cell: {e}")))?;
    let latlng = LatLng::from(index);
    Ok((latlng.lat_radians(), latlng.lng_radians()))
}

/// Great-circle distance between two cells' centroids, in kilometers,
/// floored at `MIN_DISPLACEMENT_KM` for degenerate same-centroid cases.
pub fn haversine_km(from: CellId, to: CellId) -> VerifierResult<f64> {
    let (lat1, lon1) = centroid_radians(from)?;
    let (lat2, lon2) = centroid_radians(to)?;

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    let distance = EARTH_RADIUS_KM * c;

    Ok(distance.max(MIN_DISPLACEMENT_KM))
}

/// Local tangent-plane displacement vector from `from` to `to`'s centroid,
/// in radians, scaled by `cos(lat)` on the longitude axis so the two
/// components are locally isotropic. Magnitude is not physically
/// meaningful past a few tens of kilometers; only direction (used for
/// cosine-similarity comparisons in the Hamiltonian Scorer's flock
/// component) is relied upon.
pub fn tangent_vector(from: CellId, to: CellId) -> VerifierResult<(f64, f64)> {
    let (lat1, lon1) = centroid_radians(from)?;
    let (lat2, lon2) = centroid_radians(to)?;
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1) * lat1.cos();
    Ok((dlon, dlat))
}

/// Validate that a resolution falls within the protocol's allowed band.
pub fn validate_resolution(resolution: u8) -> VerifierResult<()> {
    if (7..=10).contains(&resolution) {
        Ok(())
    } else {
        Err(VerifierError::MalformedEncoding(format!(
            "cell resolution {resolution} outside the 7..10 band"
        )))
    }
}
