//! Errors raised by the membership/actor layer. Per the error handling
//! design, a dead peer or resend timeout surfaces as an exception reply to
//! the caller; only startup and invariant failures are fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid configuration: {0}")]
    BadConfig(String),

    #[error("node {0} is not a member of this job")]
    UnknownNode(i32),

    #[error("node {0} reported dead")]
    DeadNode(i32),

    #[error("barrier wait on group {0} abandoned: actor process is shutting down")]
    ShuttingDown(i32),

    #[error(transparent)]
    Transport(#[from] mlps_transport::TransportError),

    #[error(transparent)]
    Wire(#[from] mlps_wire::WireError),

    #[error("malformed control message body: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClusterResult<T> = std::result::Result<T, ClusterError>;
