//! Errors surfaced by the tensor RPC layer. A dead or exception-returning
//! server turns into `Remote`; everything below it is propagated transparently.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Cluster(#[from] mlps_cluster::ClusterError),

    #[error(transparent)]
    TensorStore(#[from] mlps_tensor_store::TensorStoreError),

    #[error("malformed tensor RPC payload: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("server {server} reported an exception: {reason}")]
    Remote { server: i32, reason: String },

    #[error("{0}")]
    BadRequest(String),
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;
