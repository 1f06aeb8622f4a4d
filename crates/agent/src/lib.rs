//! The tensor RPC layer: turns `TensorStore` operations into requests over
//! an `ActorProcess`, with partition routing and key deduplication on the
//! client side and a `RequestHandler` adapter on the server side.
//!
//! - [`partition`]: `key mod server_count` routing.
//! - [`uniquifier`]: [`uniquifier::HashUniquifier`], dedups a key batch
//!   before it is split across servers.
//! - [`protocol`]: the `TensorOp` wire contract (JSON body + byte slices).
//! - [`handler`]: [`handler::PSRequestHandler`], the server-side adapter.
//! - [`agent`]: [`agent::PSAgent`], the worker-side client.

pub mod agent;
pub mod error;
pub mod handler;
pub mod partition;
pub mod protocol;
pub mod uniquifier;

pub use agent::PSAgent;
pub use error::{AgentError, AgentResult};
pub use handler::PSRequestHandler;
pub use protocol::TensorOp;
pub use uniquifier::HashUniquifier;
