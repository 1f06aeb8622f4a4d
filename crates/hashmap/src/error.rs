//! Error kinds for the array hash map and its binary map file format.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashMapError {
    /// `value_count_per_key` was never set; the map was default-constructed
    /// and used in an operation that touches values.
    #[error("value_count_per_key is not set on this map")]
    ValueCountPerKeyUnset,

    /// Growing the map would require more than `u32::MAX` slots.
    #[error("storing {requested} keys requires {buckets} buckets, but at most {limit} are allowed")]
    CapacityExceeded {
        requested: u64,
        buckets: u64,
        limit: u64,
    },

    /// The map file's magic signature did not match.
    #[error("map file signature mismatch")]
    BadSignature,

    /// The map file declares a format version this build does not support.
    #[error("unsupported map file version {found}, expected {expected}")]
    VersionMismatch { found: u64, expected: u64 },

    /// A structural invariant in the header failed validation.
    #[error("map file header invariant violated: {0}")]
    InvalidHeader(String),

    /// Key types differ in size between the file and the in-memory map, with
    /// no safe reinterpretation possible.
    #[error("key types mismatch: expected code {expected}, found code {found}")]
    KeyTypeMismatch { expected: u64, found: u64 },

    /// Value types differ and `value_count_per_key * disk_size` does not
    /// divide evenly by the in-memory element size.
    #[error("value types mismatch: expected code {expected}, found code {found}, value_count_per_key = {value_count_per_key}")]
    ValueTypeMismatch {
        expected: u64,
        found: u64,
        value_count_per_key: u64,
    },

    /// Requested `value_count_per_key` for a partial serialize exceeds the
    /// map's own.
    #[error("requested value_count_per_key {requested} exceeds the map's {actual}")]
    ValueCountPerKeyExceeded { requested: u64, actual: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HashMapResult<T> = std::result::Result<T, HashMapError>;
