//! Deterministic canonical binary-object encoding (spec.md §4.1, §6).
//!
//! A restricted, canonical subset of CBOR (RFC 8949 §4.2): integer map
//! keys sorted ascending, shortest-length integer encoding, no
//! indeterminate-length forms. This is the only encoding used for
//! hashing and signing; `serde_json` elsewhere in the crate is for
//! logging and test fixtures only and is never authoritative.

use crate::core::errors::{VerifierError, VerifierResult};
use crate::core::types::*;
use std::collections::BTreeMap;

const MAJOR_UINT: u8 = 0;
const MAJOR_BYTES: u8 = 2;
const MAJOR_MAP: u8 = 5;
const SIMPLE_NULL: u8 = 0xf6;

fn write_head(buf: &mut Vec<u8>, major: u8, len: u64) {
    let major_bits = major << 5;
    if len < 24 {
        buf.push(major_bits | (len as u8));
    } else if len <= u8::MAX as u64 {
        buf.push(major_bits | 24);
        buf.push(len as u8);
    } else if len <= u16::MAX as u64 {
        buf.push(major_bits | 25);
        buf.extend_from_slice(&(len as u16).to_be_bytes());
    } else if len <= u32::MAX as u64 {
        buf.push(major_bits | 26);
        buf.extend_from_slice(&(len as u32).to_be_bytes());
    } else {
        buf.push(major_bits | 27);
        buf.extend_from_slice(&len.to_be_bytes());
    }
}

pub fn encode_uint(buf: &mut Vec<u8>, v: u64) {
    write_head(buf, MAJOR_UINT, v);
}

pub fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_head(buf, MAJOR_BYTES, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

pub fn encode_null(buf: &mut Vec<u8>) {
    buf.push(SIMPLE_NULL);
}

/// Encode a map whose values are already-encoded byte sequences. Entries
/// are sorted by integer key ascending, per the canonical form.
pub fn encode_map(buf: &mut Vec<u8>, entries: &[(u64, Vec<u8>)]) {
    let mut sorted: Vec<&(u64, Vec<u8>)> = entries.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    write_head(buf, MAJOR_MAP, sorted.len() as u64);
    for (key, value) in sorted {
        encode_uint(buf, *key);
        buf.extend_from_slice(value);
    }
}

fn encode_meta(meta: &BTreeMap<String, String>) -> Vec<u8> {
    // Meta is an open string-keyed map; BTreeMap already iterates in
    // sorted key order, so this nested map is deterministic without
    // needing the integer-key canonical form used at the top level.
    let mut buf = Vec::new();
    write_head(&mut buf, MAJOR_MAP, meta.len() as u64);
    for (k, v) in meta {
        encode_bytes(&mut buf, k.as_bytes());
        encode_bytes(&mut buf, v.as_bytes());
    }
    buf
}

fn breadcrumb_payload_entries(b: &Breadcrumb) -> Vec<(u64, Vec<u8>)> {
    let mut f0 = Vec::new();
    encode_uint(&mut f0, b.index);
    let mut f1 = Vec::new();
    encode_bytes(&mut f1, &b.identity);
    let mut f2 = Vec::new();
    encode_uint(&mut f2, b.timestamp);
    let mut f3 = Vec::new();
    encode_uint(&mut f3, b.cell);
    let mut f4 = Vec::new();
    encode_uint(&mut f4, b.resolution as u64);
    let mut f5 = Vec::new();
    encode_bytes(&mut f5, &b.context_digest);
    let mut f6 = Vec::new();
    match &b.prev_hash {
        Some(h) => encode_bytes(&mut f6, h),
        None => encode_null(&mut f6),
    }
    let f7 = encode_meta(&b.meta);

    vec![
        (0, f0),
        (1, f1),
        (2, f2),
        (3, f3),
        (4, f4),
        (5, f5),
        (6, f6),
        (7, f7),
    ]
}

/// Canonical encoding of breadcrumb fields 0..7 (the signed payload).
pub fn encode_breadcrumb_payload(b: &Breadcrumb) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_map(&mut buf, &breadcrumb_payload_entries(b));
    buf
}

/// Canonical encoding of all 9 breadcrumb fields (0..8), including the
/// signature. This is what the predecessor-hash of the next breadcrumb
/// is computed over.
pub fn encode_breadcrumb_full(b: &Breadcrumb) -> Vec<u8> {
    let mut entries = breadcrumb_payload_entries(b);
    let mut sig_field = Vec::new();
    encode_bytes(&mut sig_field, &b.signature);
    entries.push((8, sig_field));

    let mut buf = Vec::new();
    encode_map(&mut buf, &entries);
    buf
}

/// Canonical encoding of epoch fields 0..7 (signed payload).
pub fn encode_epoch_payload(e: &Epoch) -> Vec<u8> {
    let mut f0 = Vec::new();
    encode_uint(&mut f0, e.epoch_number);
    let mut f1 = Vec::new();
    encode_bytes(&mut f1, &e.identity);
    let mut f2 = Vec::new();
    encode_uint(&mut f2, e.first_index);
    let mut f3 = Vec::new();
    encode_uint(&mut f3, e.last_index);
    let mut f4 = Vec::new();
    encode_uint(&mut f4, e.first_timestamp);
    let mut f5 = Vec::new();
    encode_uint(&mut f5, e.last_timestamp);
    let mut f6 = Vec::new();
    encode_bytes(&mut f6, &e.merkle_root);
    let mut f7 = Vec::new();
    encode_uint(&mut f7, e.unique_cell_count);

    let mut buf = Vec::new();
    encode_map(
        &mut buf,
        &[
            (0, f0),
            (1, f1),
            (2, f2),
            (3, f3),
            (4, f4),
            (5, f5),
            (6, f6),
            (7, f7),
        ],
    );
    buf
}

/// Canonical encoding of the LivenessResponse's signed fields 0..3.
pub fn encode_liveness_response_payload(r: &LivenessResponse) -> Vec<u8> {
    let mut f0 = Vec::new();
    encode_bytes(&mut f0, &r.nonce_echo);
    let mut f1 = Vec::new();
    encode_bytes(&mut f1, &r.chain_head_hash);
    let mut f2 = Vec::new();
    encode_uint(&mut f2, r.response_timestamp);
    let mut f3 = Vec::new();
    encode_uint(&mut f3, r.current_index);

    let mut buf = Vec::new();
    encode_map(&mut buf, &[(0, f0), (1, f1), (2, f2), (3, f3)]);
    buf
}

/// Canonical encoding of PoH Certificate fields 0..13 (everything the
/// Verifier's signature in field 14 covers).
pub fn encode_certificate_payload(c: &PohCertificate) -> Vec<u8> {
    let mut f0 = Vec::new();
    encode_bytes(&mut f0, &c.identity);
    let mut f1 = Vec::new();
    encode_uint(&mut f1, c.issuance_timestamp);
    let mut f2 = Vec::new();
    encode_uint(&mut f2, c.epoch_count);
    let mut f3 = Vec::new();
    encode_uint(&mut f3, c.alpha.to_bits());
    let mut f4 = Vec::new();
    encode_uint(&mut f4, c.beta.to_bits());
    let mut f5 = Vec::new();
    encode_uint(&mut f5, c.kappa_km.to_bits());
    let mut f6 = Vec::new();
    encode_uint(&mut f6, c.predictability.to_bits());
    let mut f7 = Vec::new();
    encode_uint(&mut f7, c.criticality_confidence.to_bits());
    let mut f8 = Vec::new();
    encode_uint(&mut f8, c.trust_score.to_bits());
    let mut f9 = Vec::new();
    encode_uint(&mut f9, c.unique_cell_count);
    let mut f10 = Vec::new();
    encode_uint(&mut f10, c.total_breadcrumb_count);
    let mut f11 = Vec::new();
    encode_uint(&mut f11, c.validity_duration_secs);
    let mut f12 = Vec::new();
    encode_bytes(&mut f12, &c.nonce);
    let mut f13 = Vec::new();
    encode_bytes(&mut f13, &c.chain_head_hash);

    let mut buf = Vec::new();
    encode_map(
        &mut buf,
        &[
            (0, f0),
            (1, f1),
            (2, f2),
            (3, f3),
            (4, f4),
            (5, f5),
            (6, f6),
            (7, f7),
            (8, f8),
            (9, f9),
            (10, f10),
            (11, f11),
            (12, f12),
            (13, f13),
        ],
    );
    buf
}

/// Validate that a slice of bytes starts with a canonical map head and
/// return the claimed entry count, to catch indeterminate-length or
/// non-canonical inputs early (used by the chain validator before it
/// attempts the more specific field decode).
pub fn peek_map_len(bytes: &[u8]) -> VerifierResult<(u64, usize)> {
    if bytes.is_empty() {
        return Err(VerifierError::MalformedEncoding("empty input".into()));
    }
    let first = bytes[0];
    let major = first >> 5;
    if major != MAJOR_MAP {
        return Err(VerifierError::MalformedEncoding(
            "expected a canonical map".into(),
        ));
    }
    let info = first & 0x1f;
    match info {
        0..=23 => Ok((info as u64, 1)),
        24 => {
            let b = *bytes
                .get(1)
                .ok_or_else(|| VerifierError::MalformedEncoding("truncated length".into()))?;
            Ok((b as u64, 2))
        }
        25 => {
            let slice = bytes
                .get(1..3)
                .ok_or_else(|| VerifierError::MalformedEncoding("truncated length".into()))?;
            Ok((u16::from_be_bytes([slice[0], slice[1]]) as u64, 3))
        }
        _ => Err(VerifierError::MalformedEncoding(
            "unsupported or indeterminate length form".into(),
        )),
    }
}

fn read_head(bytes: &[u8], offset: usize) -> VerifierResult<(u8, u64, usize)> {
    let first = *bytes
        .get(offset)
        .ok_or_else(|| VerifierError::MalformedEncoding("truncated item head".into()))?;
    let major = first >> 5;
    let info = first & 0x1f;
    match info {
        0..=23 => Ok((major, info as u64, 1)),
        24 => {
            let b = *bytes
                .get(offset + 1)
                .ok_or_else(|| VerifierError::MalformedEncoding("truncated length".into()))?;
            Ok((major, b as u64, 2))
        }
        25 => {
            let slice = bytes
                .get(offset + 1..offset + 3)
                .ok_or_else(|| VerifierError::MalformedEncoding("truncated length".into()))?;
            Ok((major, u16::from_be_bytes([slice[0], slice[1]]) as u64, 3))
        }
        26 => {
            let slice = bytes
                .get(offset + 1..offset + 5)
                .ok_or_else(|| VerifierError::MalformedEncoding("truncated length".into()))?;
            Ok((
                major,
                u32::from_be_bytes(slice.try_into().unwrap()) as u64,
                5,
            ))
        }
        27 => {
            let slice = bytes
                .get(offset + 1..offset + 9)
                .ok_or_else(|| VerifierError::MalformedEncoding("truncated length".into()))?;
            Ok((major, u64::from_be_bytes(slice.try_into().unwrap()), 9))
        }
        _ => Err(VerifierError::MalformedEncoding(
            "unsupported or indeterminate length form".into(),
        )),
    }
}

/// Decode a single canonical uint item. Returns the value and bytes consumed.
pub fn decode_uint(bytes: &[u8], offset: usize) -> VerifierResult<(u64, usize)> {
    let (major, value, consumed) = read_head(bytes, offset)?;
    if major != MAJOR_UINT {
        return Err(VerifierError::MalformedEncoding(
            "expected a canonical uint".into(),
        ));
    }
    Ok((value, consumed))
}

/// Decode a single canonical byte-string item.
pub fn decode_bytes(bytes: &[u8], offset: usize) -> VerifierResult<(Vec<u8>, usize)> {
    let (major, len, head_len) = read_head(bytes, offset)?;
    if major != MAJOR_BYTES {
        return Err(VerifierError::MalformedEncoding(
            "expected a canonical byte string".into(),
        ));
    }
    let start = offset + head_len;
    let end = start + len as usize;
    let slice = bytes
        .get(start..end)
        .ok_or_else(|| VerifierError::MalformedEncoding("truncated byte string".into()))?;
    Ok((slice.to_vec(), head_len + len as usize))
}

/// Decode a field that is either a canonical byte string or the explicit
/// null sentinel (used for `prev_hash`).
pub fn decode_optional_bytes(bytes: &[u8], offset: usize) -> VerifierResult<(Option<Vec<u8>>, usize)> {
    if bytes.get(offset) == Some(&SIMPLE_NULL) {
        return Ok((None, 1));
    }
    let (v, consumed) = decode_bytes(bytes, offset)?;
    Ok((Some(v), consumed))
}

fn fixed_array<const N: usize>(v: Vec<u8>, what: &'static str) -> VerifierResult<[u8; N]> {
    v.try_into()
        .map_err(|v: Vec<u8>| VerifierError::MalformedEncoding(format!("{what}: expected {N} bytes, got {}", v.len())))
}

/// Decode the open string-keyed meta map.
pub fn decode_meta(bytes: &[u8], offset: usize) -> VerifierResult<(BTreeMap<String, String>, usize)> {
    let (major, count, mut pos) = read_head(bytes, offset)?;
    if major != MAJOR_MAP {
        return Err(VerifierError::MalformedEncoding("expected meta map".into()));
    }
    pos += offset;
    let mut meta = BTreeMap::new();
    for _ in 0..count {
        let (key_bytes, key_len) = decode_bytes(bytes, pos)?;
        pos += key_len;
        let (val_bytes, val_len) = decode_bytes(bytes, pos)?;
        pos += val_len;
        let key = String::from_utf8(key_bytes)
            .map_err(|_| VerifierError::MalformedEncoding("meta key not valid utf-8".into()))?;
        let val = String::from_utf8(val_bytes)
            .map_err(|_| VerifierError::MalformedEncoding("meta value not valid utf-8".into()))?;
        meta.insert(key, val);
    }
    Ok((meta, pos - offset))
}

/// Decode one breadcrumb (fields 0..7, or 0..8 if a signature is present)
/// starting at `offset`. Returns the breadcrumb and total bytes consumed.
/// Field order is assumed canonical (ascending integer keys); a non-ascending
/// or incomplete field set is rejected as `MalformedEncoding`.
pub fn decode_breadcrumb(bytes: &[u8], offset: usize) -> VerifierResult<(Breadcrumb, usize)> {
    let (major, count, head_len) = read_head(bytes, offset)?;
    if major != MAJOR_MAP {
        return Err(VerifierError::MalformedEncoding(
            "expected a canonical breadcrumb map".into(),
        ));
    }
    if count != 8 && count != 9 {
        return Err(VerifierError::MalformedEncoding(format!(
            "breadcrumb map has {count} entries, expected 8 or 9"
        )));
    }

    let mut pos = offset + head_len;
    let mut next_key = |expected: u64, pos: &mut usize| -> VerifierResult<()> {
        let (k, consumed) = decode_uint(bytes, *pos)?;
        if k != expected {
            return Err(VerifierError::MalformedEncoding(format!(
                "expected field key {expected}, found {k}"
            )));
        }
        *pos += consumed;
        Ok(())
    };

    next_key(0, &mut pos)?;
    let (index, c) = decode_uint(bytes, pos)?;
    pos += c;

    next_key(1, &mut pos)?;
    let (identity_raw, c) = decode_bytes(bytes, pos)?;
    pos += c;
    let identity = fixed_array::<32>(identity_raw, "identity")?;

    next_key(2, &mut pos)?;
    let (timestamp, c) = decode_uint(bytes, pos)?;
    pos += c;

    next_key(3, &mut pos)?;
    let (cell, c) = decode_uint(bytes, pos)?;
    pos += c;

    next_key(4, &mut pos)?;
    let (resolution, c) = decode_uint(bytes, pos)?;
    pos += c;

    next_key(5, &mut pos)?;
    let (context_digest_raw, c) = decode_bytes(bytes, pos)?;
    pos += c;
    let context_digest = fixed_array::<32>(context_digest_raw, "context_digest")?;

    next_key(6, &mut pos)?;
    let (prev_hash_raw, c) = decode_optional_bytes(bytes, pos)?;
    pos += c;
    let prev_hash = prev_hash_raw.map(|v| fixed_array::<32>(v, "prev_hash")).transpose()?;

    next_key(7, &mut pos)?;
    let (meta, c) = decode_meta(bytes, pos)?;
    pos += c;

    let signature = if count == 9 {
        next_key(8, &mut pos)?;
        let (sig_raw, c) = decode_bytes(bytes, pos)?;
        pos += c;
        fixed_array::<64>(sig_raw, "signature")?
    } else {
        [0u8; 64]
    };

    Ok((
        Breadcrumb {
            index,
            identity,
            timestamp,
            cell,
            resolution: resolution as u8,
            context_digest,
            prev_hash,
            meta,
            signature,
        },
        pos - offset,
    ))
}

/// Decode a sequence of back-to-back canonical breadcrumb maps (full
/// 9-field form, signature included) until the input is exhausted.
pub fn decode_breadcrumb_sequence(bytes: &[u8]) -> VerifierResult<Vec<Breadcrumb>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let (crumb, consumed) = decode_breadcrumb(bytes, pos)?;
        out.push(crumb);
        pos += consumed;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_breadcrumb() -> Breadcrumb {
        Breadcrumb {
            index: 0,
            identity: [7u8; 32],
            timestamp: 1_700_000_000,
            cell: 42,
            resolution: 9,
            context_digest: [1u8; 32],
            prev_hash: None,
            meta: BTreeMap::new(),
            signature: [0u8; 64],
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let b = sample_breadcrumb();
        let a1 = encode_breadcrumb_payload(&b);
        let a2 = encode_breadcrumb_payload(&b);
        assert_eq!(a1, a2);
    }

    #[test]
    fn single_bit_mutation_changes_encoding() {
        let b = sample_breadcrumb();
        let mut mutated = b.clone();
        mutated.timestamp += 1;
        assert_ne!(
            encode_breadcrumb_payload(&b),
            encode_breadcrumb_payload(&mutated)
        );
    }

    #[test]
    fn map_head_reports_entry_count() {
        let b = sample_breadcrumb();
        let encoded = encode_breadcrumb_payload(&b);
        let (len, _) = peek_map_len(&encoded).unwrap();
        assert_eq!(len, 8);
    }

    #[test]
    fn decode_round_trips_through_full_encoding() {
        let mut b = sample_breadcrumb();
        b.meta.insert("exploration".to_string(), "true".to_string());
        let encoded = encode_breadcrumb_full(&b);
        let (decoded, consumed) = decode_breadcrumb(&encoded, 0).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded.index, b.index);
        assert_eq!(decoded.identity, b.identity);
        assert_eq!(decoded.timestamp, b.timestamp);
        assert_eq!(decoded.cell, b.cell);
        assert_eq!(decoded.resolution, b.resolution);
        assert_eq!(decoded.context_digest, b.context_digest);
        assert_eq!(decoded.prev_hash, b.prev_hash);
        assert_eq!(decoded.meta, b.meta);
        assert_eq!(decoded.signature, b.signature);
    }

    #[test]
    fn decode_sequence_recovers_every_breadcrumb() {
        let mut first = sample_breadcrumb();
        first.signature = [9u8; 64];
        let mut second = sample_breadcrumb();
        second.index = 1;
        second.prev_hash = Some([5u8; 32]);
        second.signature = [8u8; 64];

        let mut bytes = encode_breadcrumb_full(&first);
        bytes.extend(encode_breadcrumb_full(&second));

        let decoded = decode_breadcrumb_sequence(&bytes).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].index, 1);
        assert_eq!(decoded[1].prev_hash, Some([5u8; 32]));
    }

    #[test]
    fn null_sentinel_differs_from_real_hash() {
        let mut with_null = sample_breadcrumb();
        with_null.prev_hash = None;
        let mut with_hash = sample_breadcrumb();
        with_hash.prev_hash = Some([0u8; 32]);
        assert_ne!(
            encode_breadcrumb_payload(&with_null),
            encode_breadcrumb_payload(&with_hash)
        );
    }
}
