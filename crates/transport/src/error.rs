//! Transport-level errors. Per the error handling design, a dead peer or a
//! resend timeout surfaces as an exception response to the caller rather
//! than a panic; only a bind failure after exhausting retries is fatal to
//! process startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind listener after {attempts} attempts: {source}")]
    Bind {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("no outbound connection to node {0}")]
    NotConnected(i32),

    #[error("peer {0} is dead")]
    DeadPeer(i32),

    #[error("resend exhausted for message {message_id} to node {receiver}")]
    ResendExhausted { message_id: u64, receiver: i32 },

    #[error("transport is shut down")]
    ShutDown,

    #[error(transparent)]
    Wire(#[from] mlps_wire::WireError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;
