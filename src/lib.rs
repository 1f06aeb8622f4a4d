//! # mlps-runtime
//!
//! A parameter server runtime for distributed machine-learning training:
//! workers compute gradients against sparse/dense tensors held by a
//! partitioned set of servers, with a coordinator handling membership and
//! barrier synchronization.
//!
//! ```text
//! worker: FeatureHasher -> fingerprints -> PSAgent::pull/push -> ActorProcess -> Transport
//! server: Transport -> ActorProcess -> PSRequestHandler -> TensorStore
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use mlps_runtime::{start_node, ActorConfig, Node};
//! use std::sync::Arc;
//!
//! # struct ZeroInit; impl mlps_runtime::Initializer for ZeroInit {
//! #     fn initialize(&self, _k: u64, _d: &mut [u8], _s: &mut [u8]) {}
//! # }
//! # struct NoopUpdate; impl mlps_runtime::Updater for NoopUpdate {
//! #     fn update(&self, _k: u64, _d: &mut [u8], _s: &mut [u8], _v: &[u8]) {}
//! # }
//! # struct NeverSmall; impl mlps_runtime::PrunePredicate for NeverSmall {
//! #     fn is_small(&self, _d: &[u8], _e: f64) -> bool { false }
//! #     fn age(&self, _s: &[u8]) -> u64 { 0 }
//! # }
//! let config = ActorConfig::from_env()?;
//! match start_node(config, Arc::new(ZeroInit), Arc::new(NoopUpdate), Arc::new(NeverSmall))? {
//!     Node::Coordinator(actor) => { actor.stop(); }
//!     Node::Server { actor, .. } => { actor.stop(); }
//!     Node::Worker { actor, .. } => { actor.stop(); }
//! }
//! # Ok::<(), mlps_runtime::ClusterError>(())
//! ```
//!
//! # Crate layout
//!
//! Internal crates (`mlps-core`, `mlps-hashmap`, `mlps-feature`, `mlps-wire`,
//! `mlps-transport`, `mlps-cluster`, `mlps-tensor-store`, `mlps-agent`) are
//! path dependencies of this facade and are not independently published;
//! this crate re-exports their stable surface.

use std::sync::Arc;

use mlps_cluster::{ActorProcess, NullRequestHandler, RequestHandler};
use mlps_core::node::NodeRole;
use mlps_tensor_store::{Initializer, PrunePredicate, TensorStore, Updater};

pub use mlps_agent::{AgentError, AgentResult, HashUniquifier, PSAgent, PSRequestHandler, TensorOp};
pub use mlps_cluster::{ActorConfig, ClusterError, ClusterResult, NodeManager};
pub use mlps_core::node::{self, NodeInfo, NodeRole};
pub use mlps_core::{Command, DataType};
pub use mlps_feature::{
    bkdr_hash, bkdr_hash_with_equal_postfix, compute_feature_hash, split_filter, CombineSchema,
    ComputeFeatureHashError, IndexBatch, IndexBatchError,
};
pub use mlps_hashmap::{codec, ArrayHashMap, HashMapError};
pub use mlps_tensor_store::{
    Initializer, PrunePredicate, TensorKind, TensorMeta, TensorStore, TensorStoreError,
    TensorStoreResult, Updater, ZeroInitializer,
};
pub use mlps_wire::{Message, MessageMeta, Slice};

/// The running node, shaped by `config.node_role`. Each variant exposes
/// exactly the capability that role has: a coordinator only ever drives
/// membership and barriers, a server owns the `TensorStore` answering RPCs,
/// a worker gets the `PSAgent` client.
pub enum Node {
    Coordinator(Arc<ActorProcess>),
    Server {
        actor: Arc<ActorProcess>,
        store: Arc<TensorStore>,
    },
    Worker {
        actor: Arc<ActorProcess>,
        agent: PSAgent,
    },
}

/// Run the Start..Ready state machine for `config.node_role` and return the
/// resulting [`Node`]. `initializer`/`updater`/`prune_predicate` are the
/// host-supplied optimizer seam (§9's capability-object pattern); they are
/// only ever installed on a `Server` node, since only servers host a
/// `TensorStore`.
pub fn start_node(
    config: ActorConfig,
    initializer: Arc<dyn Initializer>,
    updater: Arc<dyn Updater>,
    prune_predicate: Arc<dyn PrunePredicate>,
) -> ClusterResult<Node> {
    let server_count = config.server_count as u32;
    let role = config.node_role;
    tracing::info!(?role, server_count, worker_count = config.worker_count, "starting node");
    match role {
        NodeRole::Coordinator => {
            let actor = ActorProcess::start(config, Arc::new(NullRequestHandler))?;
            Ok(Node::Coordinator(actor))
        }
        NodeRole::Server => {
            let store = Arc::new(TensorStore::new());
            let handler: Arc<dyn RequestHandler> = Arc::new(PSRequestHandler::new(
                Arc::clone(&store),
                initializer,
                updater,
                prune_predicate,
            ));
            let actor = ActorProcess::start(config, handler)?;
            Ok(Node::Server { actor, store })
        }
        NodeRole::Worker => {
            let actor = ActorProcess::start(config, Arc::new(NullRequestHandler))?;
            let agent = PSAgent::new(Arc::clone(&actor), server_count);
            Ok(Node::Worker { actor, agent })
        }
    }
}
