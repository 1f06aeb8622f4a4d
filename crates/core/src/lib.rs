//! Foundational types shared by every crate in the parameter server runtime:
//! - [`DataType`]: numeric element type tags used by the hash map, tensor
//!   store and wire codec.
//! - [`NodeRole`] / node id encoding: how nodes and role-groups are named.
//! - [`Command`]: the fixed control-plane command set.

pub mod command;
pub mod data_type;
pub mod node;

pub use command::Command;
pub use data_type::{DataType, ToDataType, NULL_DATA_TYPE_CODE};
pub use node::{
    is_single_node, node_id_to_rank, node_id_to_string, rank_to_node_id, NodeInfo, NodeRole,
    NodeRoleWire, UnknownNodeRole, ALL_GROUP, COORDINATOR_GROUP, COORDINATOR_NODE_ID,
    SERVER_GROUP, SINGLE_NODE_TAG, WORKER_GROUP,
};
