//! BKDR hashing and the feature fingerprint combination rule.
//!
//! These constants are part of the wire contract with stored models: a
//! fingerprint computed today must match one computed last year, so none of
//! the arithmetic here may change.

/// BKDR hash (base 131, seed 0) of a byte string.
pub fn bkdr_hash(bytes: &[u8]) -> u64 {
    bkdr_hash_seeded(bytes, 0)
}

fn bkdr_hash_seeded(bytes: &[u8], seed: u64) -> u64 {
    let mut h = seed;
    for &b in bytes {
        h = h.wrapping_mul(131).wrapping_add(b as u64);
    }
    h
}

/// BKDR hash of `s` with a terminal `'='` appended, used for column/alias
/// names so that a name can never collide with a value hash of the same
/// text.
pub fn bkdr_hash_with_equal_postfix(s: &str) -> u64 {
    bkdr_hash_seeded(b"=", bkdr_hash(s.as_bytes()))
}

fn mix(h: u64, x: u64) -> u64 {
    h ^ (x
        .wrapping_add(0x9e3779b9)
        .wrapping_add(h << 6)
        .wrapping_add(h >> 2))
}

/// `field(n, v)`: the fingerprint of a single `(name, value)` pair.
pub fn field(name_hash: u64, value_hash: u64) -> u64 {
    mix(name_hash, value_hash)
}

/// `concat(h, n, v)`: fold one more `(name, value)` pair into a running
/// fingerprint for a compound feature.
pub fn concat(h: u64, name_hash: u64, value_hash: u64) -> u64 {
    const SEP: u64 = 0x01;
    let h = mix(h, SEP);
    let h = mix(h, name_hash);
    mix(h, value_hash)
}

/// Hash an ordered sequence of `(name, value)` string pairs into a single
/// 64-bit feature fingerprint, per the combine rule:
/// `field(n1,v1)` when there is one pair, else repeated `concat`.
///
/// `value == "none"` is rejected: tokens equal to the literal `"none"` are
/// filtered out during column parsing and should never reach this function.
pub fn compute_feature_hash(feature: &[(&str, &str)]) -> Result<u64, ComputeFeatureHashError> {
    if feature.is_empty() {
        return Err(ComputeFeatureHashError::Empty);
    }
    let mut h = 0u64;
    for (i, (name, value)) in feature.iter().enumerate() {
        if *value == "none" {
            return Err(ComputeFeatureHashError::NoneValue);
        }
        let name_hash = bkdr_hash_with_equal_postfix(name);
        let value_hash = bkdr_hash(value.as_bytes());
        h = if i == 0 {
            field(name_hash, value_hash)
        } else {
            concat(h, name_hash, value_hash)
        };
    }
    Ok(h)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ComputeFeatureHashError {
    #[error("feature can not be empty")]
    Empty,
    #[error("none as value is invalid, because it should have been filtered")]
    NoneValue,
}
