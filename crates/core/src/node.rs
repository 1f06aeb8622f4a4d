//! Node roles and the integer encoding used to name nodes and role-groups.
//!
//! A node id packs a zero-based rank in its high bits and a role tag in its
//! low bits, so the same integer type can address either a single node or an
//! entire role-group (used as a message `receiver`).

use std::fmt;

/// The three roles a process in a parameter server job can take on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Coordinator,
    Server,
    Worker,
}

impl NodeRole {
    fn role_bit(self) -> i32 {
        match self {
            NodeRole::Coordinator => 0,
            NodeRole::Server => 1,
            NodeRole::Worker => 2,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeRole::Coordinator => "Coordinator",
            NodeRole::Server => "Server",
            NodeRole::Worker => "Worker",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for NodeRole {
    type Err = UnknownNodeRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Coordinator" => Ok(NodeRole::Coordinator),
            "Server" => Ok(NodeRole::Server),
            "Worker" => Ok(NodeRole::Worker),
            other => Err(UnknownNodeRole(other.to_string())),
        }
    }
}

/// Raised when `node_role` names something other than the three known roles.
#[derive(Debug, thiserror::Error)]
#[error("unknown node role '{0}'")]
pub struct UnknownNodeRole(pub String);

/// Tag bit marking an encoded id as a single node rather than a role-group.
pub const SINGLE_NODE_TAG: i32 = 1 << 3;

/// Group id covering every coordinator node (there is ever only one).
pub const COORDINATOR_GROUP: i32 = 1 << NodeRole::Coordinator.role_bit();
/// Group id covering every server node.
pub const SERVER_GROUP: i32 = 1 << NodeRole::Server.role_bit();
/// Group id covering every worker node.
pub const WORKER_GROUP: i32 = 1 << NodeRole::Worker.role_bit();
/// Group id covering every node regardless of role.
pub const ALL_GROUP: i32 = COORDINATOR_GROUP | SERVER_GROUP | WORKER_GROUP;

fn node_id_tag(role: NodeRole) -> i32 {
    (1 << role.role_bit()) | SINGLE_NODE_TAG
}

/// Encode `rank` (zero-based) as a single-node id for `role`.
pub fn rank_to_node_id(role: NodeRole, rank: i32) -> i32 {
    (rank << 4) | node_id_tag(role)
}

/// Recover the zero-based rank from a node id produced by [`rank_to_node_id`].
pub fn node_id_to_rank(id: i32) -> i32 {
    id >> 4
}

/// `true` when `id` names a single node rather than a role-group.
pub fn is_single_node(id: i32) -> bool {
    id & SINGLE_NODE_TAG != 0
}

/// The node id of the coordinator, which is always rank 0.
pub const COORDINATOR_NODE_ID: i32 = 0 << 4 | (1 << 0) | SINGLE_NODE_TAG;

/// Render a node id as a descriptive string for logging.
pub fn node_id_to_string(id: i32) -> String {
    if id == COORDINATOR_NODE_ID {
        return "Coordinator".to_string();
    }
    if is_single_node(id) {
        let rank = node_id_to_rank(id);
        let role = if id & SERVER_GROUP != 0 {
            "Server"
        } else if id & WORKER_GROUP != 0 {
            "Worker"
        } else {
            "Coordinator"
        };
        format!("{role}[{rank}]")
    } else {
        let mut roles = Vec::new();
        if id & COORDINATOR_GROUP != 0 {
            roles.push("Coordinator");
        }
        if id & SERVER_GROUP != 0 {
            roles.push("Server");
        }
        if id & WORKER_GROUP != 0 {
            roles.push("Worker");
        }
        format!("Group({})", roles.join("|"))
    }
}

/// Address of a node as known to the coordinator's membership roster.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeInfo {
    pub role: NodeRoleWire,
    pub rank: i32,
    pub host: String,
    pub port: u16,
    pub node_id: i32,
}

/// Serde-friendly mirror of [`NodeRole`] (the role itself is not `Serialize`
/// to keep it a pure domain enum; the roster wire format uses this instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NodeRoleWire {
    Coordinator,
    Server,
    Worker,
}

impl From<NodeRole> for NodeRoleWire {
    fn from(role: NodeRole) -> Self {
        match role {
            NodeRole::Coordinator => NodeRoleWire::Coordinator,
            NodeRole::Server => NodeRoleWire::Server,
            NodeRole::Worker => NodeRoleWire::Worker,
        }
    }
}

impl From<NodeRoleWire> for NodeRole {
    fn from(role: NodeRoleWire) -> Self {
        match role {
            NodeRoleWire::Coordinator => NodeRole::Coordinator,
            NodeRoleWire::Server => NodeRole::Server,
            NodeRoleWire::Worker => NodeRole::Worker,
        }
    }
}

impl NodeInfo {
    pub fn new(role: NodeRole, rank: i32, host: impl Into<String>, port: u16) -> Self {
        let node_id = rank_to_node_id(role, rank);
        NodeInfo {
            role: role.into(),
            rank,
            host: host.into(),
            port,
            node_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_round_trips() {
        for (role, rank) in [
            (NodeRole::Server, 0),
            (NodeRole::Server, 7),
            (NodeRole::Worker, 3),
        ] {
            let id = rank_to_node_id(role, rank);
            assert_eq!(node_id_to_rank(id), rank);
            assert!(is_single_node(id));
        }
    }

    #[test]
    fn group_ids_are_not_single_node() {
        assert!(!is_single_node(SERVER_GROUP));
        assert!(!is_single_node(WORKER_GROUP));
        assert!(!is_single_node(ALL_GROUP));
    }

    #[test]
    fn coordinator_is_rank_zero() {
        assert_eq!(node_id_to_rank(COORDINATOR_NODE_ID), 0);
        assert_eq!(rank_to_node_id(NodeRole::Coordinator, 0), COORDINATOR_NODE_ID);
    }
}
