//! Helpers for building [`crate::message::Slice`] values.

use crate::message::Slice;

/// Copy `bytes` into a freshly allocated, reference-counted slice buffer.
pub fn slice_from_bytes(bytes: &[u8]) -> Slice {
    Slice::from(bytes)
}

/// Take ownership of `bytes` without copying.
pub fn slice_from_vec(bytes: Vec<u8>) -> Slice {
    Slice::from(bytes.into_boxed_slice())
}
