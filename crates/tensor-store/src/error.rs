//! Errors raised by [`crate::store::TensorStore`]. Map-file corruption and
//! shape mismatches are structural and fatal; a missing tensor or key is a
//! caller error that the agent layer turns into an exception reply.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TensorStoreError {
    #[error("tensor {0:?} is not registered")]
    UnknownTensor(String),

    #[error("tensor {0:?} is already registered")]
    AlreadyExists(String),

    #[error(transparent)]
    HashMap(#[from] mlps_hashmap::HashMapError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed tensor metadata: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("invalid base64 blob: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("key/value batch length mismatch: {0} keys, {1} value chunks")]
    BatchLengthMismatch(usize, usize),

    #[error("value chunk for key {key} has {found} bytes, expected {expected}")]
    ValueWidthMismatch {
        key: u64,
        found: usize,
        expected: usize,
    },
}

pub type TensorStoreResult<T> = std::result::Result<T, TensorStoreError>;
