//! `Message`: meta plus a sequence of typed slices.
//!
//! Messages are move-only — there is deliberately no `Clone` impl, matching
//! the ownership model where a pull response transfers slice ownership from
//! server to worker. A slice's backing buffer is reference-counted so it can
//! be shared between the message and whatever produced it (e.g. a
//! `TensorStore` holding the same bytes behind a lock), avoiding a copy on
//! the hot pull/push path.

use std::sync::Arc;

use crate::meta::MessageMeta;

/// A single typed, contiguous, reference-counted buffer.
pub type Slice = Arc<[u8]>;

/// A complete message: metadata plus its trailing slices.
#[derive(Debug)]
pub struct Message {
    pub meta: MessageMeta,
    pub slices: Vec<Slice>,
}

impl Message {
    pub fn new(meta: MessageMeta, slices: Vec<Slice>) -> Self {
        Message { meta, slices }
    }

    /// A message with no slices (plain control traffic).
    pub fn control(meta: MessageMeta) -> Self {
        Message {
            meta,
            slices: Vec::new(),
        }
    }
}
