//! Membership and the per-node control-plane event loop.
//!
//! - [`config`]: [`config::ActorConfig`], job topology read from the
//!   environment.
//! - [`node_manager`]: [`node_manager::NodeManager`], roster + barrier +
//!   liveness state.
//! - [`actor_process`]: [`actor_process::ActorProcess`], the Start..Ready
//!   state machine and its receiver/heartbeat threads.
//! - [`request_handler`]: the seam data messages are handed off through.

pub mod actor_process;
pub mod config;
pub mod error;
pub mod node_manager;
pub mod request_handler;

pub use actor_process::ActorProcess;
pub use config::ActorConfig;
pub use error::{ClusterError, ClusterResult};
pub use node_manager::NodeManager;
pub use request_handler::{NullRequestHandler, RequestHandler};
