//! `NodeManager`: membership roster, barrier counting, dead-node detection.
//!
//! All mutable state lives behind one mutex held across membership
//! transitions (§5's shared-resource policy): barrier arrival, roster
//! updates and liveness bookkeeping never interleave partially.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use mlps_core::node::{self, NodeInfo, NodeRole};
use parking_lot::{Condvar, Mutex};

struct Membership {
    /// node_id -> info, populated from the coordinator's broadcast roster.
    nodes: HashMap<i32, NodeInfo>,
    /// AddNode requests collected by the coordinator, not yet broadcast.
    pending: Vec<NodeInfo>,
    next_rank: HashMap<&'static str, i32>,
    last_heartbeat: HashMap<i32, Instant>,
    dead: std::collections::HashSet<i32>,
    barrier_counter: HashMap<i32, usize>,
    barrier_epoch: HashMap<i32, u64>,
}

impl Membership {
    fn new() -> Self {
        Membership {
            nodes: HashMap::new(),
            pending: Vec::new(),
            next_rank: HashMap::new(),
            last_heartbeat: HashMap::new(),
            dead: std::collections::HashSet::new(),
            barrier_counter: HashMap::new(),
            barrier_epoch: HashMap::new(),
        }
    }
}

/// Membership and barrier state for one actor process. Shared between the
/// receiver thread (which drives transitions) and caller threads (which
/// block on `await_barrier`).
pub struct NodeManager {
    server_count: usize,
    worker_count: usize,
    state: Mutex<Membership>,
    barrier_cond: Condvar,
}

impl NodeManager {
    pub fn new(server_count: usize, worker_count: usize) -> Self {
        NodeManager {
            server_count,
            worker_count,
            state: Mutex::new(Membership::new()),
            barrier_cond: Condvar::new(),
        }
    }

    /// Coordinator-side: register one `AddNode` request and assign it a
    /// rank. Returns the full roster once every expected server and worker
    /// has registered (the coordinator itself is inserted at construction).
    pub fn register_add_node(
        &self,
        role: NodeRole,
        host: String,
        port: u16,
    ) -> Option<Vec<NodeInfo>> {
        let mut state = self.state.lock();
        let role_key = match role {
            NodeRole::Coordinator => "coordinator",
            NodeRole::Server => "server",
            NodeRole::Worker => "worker",
        };
        let rank = *state.next_rank.entry(role_key).or_insert(0);
        state.next_rank.insert(role_key, rank + 1);
        let info = NodeInfo::new(role, rank, host, port);
        state.nodes.insert(info.node_id, info.clone());
        state.pending.push(info);

        if state.pending.len() == self.server_count + self.worker_count {
            Some(state.nodes.values().cloned().collect())
        } else {
            None
        }
    }

    /// Coordinator-side: seed the roster with itself before accepting
    /// `AddNode` requests.
    pub fn install_self(&self, info: NodeInfo) {
        let mut state = self.state.lock();
        state.nodes.insert(info.node_id, info);
    }

    /// Non-coordinator: install the broadcast roster received after
    /// `SendAddNode`.
    pub fn apply_roster(&self, roster: Vec<NodeInfo>) {
        let mut state = self.state.lock();
        state.nodes = roster.into_iter().map(|n| (n.node_id, n)).collect();
    }

    pub fn roster(&self) -> Vec<NodeInfo> {
        self.state.lock().nodes.values().cloned().collect()
    }

    pub fn node_info(&self, node_id: i32) -> Option<NodeInfo> {
        self.state.lock().nodes.get(&node_id).cloned()
    }

    pub fn is_dead(&self, node_id: i32) -> bool {
        self.state.lock().dead.contains(&node_id)
    }

    pub fn record_heartbeat(&self, node_id: i32) {
        let mut state = self.state.lock();
        state.last_heartbeat.insert(node_id, Instant::now());
        state.dead.remove(&node_id);
    }

    /// Coordinator-side: scan for nodes silent longer than `timeout`, mark
    /// them dead and return the newly-dead set (to broadcast as
    /// `ReportDeadNodes`). A node that has never sent a heartbeat is not
    /// considered dead until `timeout` has elapsed since `NodeManager`
    /// construction is out of scope here; callers seed `record_heartbeat`
    /// for every node at `AddNode` time.
    pub fn scan_dead(&self, timeout: Duration) -> Vec<i32> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let newly_dead: Vec<i32> = state
            .last_heartbeat
            .iter()
            .filter(|(id, seen)| !state.dead.contains(*id) && now.duration_since(**seen) > timeout)
            .map(|(id, _)| *id)
            .collect();
        for id in &newly_dead {
            state.dead.insert(*id);
        }
        newly_dead
    }

    /// Apply a `ReportDeadNodes` broadcast received from the coordinator.
    pub fn apply_dead_nodes(&self, dead: &[i32]) {
        let mut state = self.state.lock();
        for id in dead {
            state.dead.insert(*id);
        }
    }

    /// Number of currently-registered members whose node id matches `group`
    /// (a role-group bitmask, see `mlps_core::node`).
    pub fn group_size(&self, group: i32) -> usize {
        let state = self.state.lock();
        state
            .nodes
            .keys()
            .filter(|&&id| group_contains(group, id))
            .count()
    }

    /// Coordinator-side: record one member's arrival at `Barrier(group)`.
    /// Returns `true` exactly once per epoch, when the arrival completes
    /// the barrier and the caller should broadcast `Barrier` back to the
    /// group.
    pub fn barrier_arrive(&self, group: i32) -> bool {
        let mut state = self.state.lock();
        let expected = state
            .nodes
            .keys()
            .filter(|&&id| group_contains(group, id))
            .count();
        let counter = state.barrier_counter.entry(group).or_insert(0);
        *counter += 1;
        if *counter >= expected.max(1) {
            *counter = 0;
            *state.barrier_epoch.entry(group).or_insert(0) += 1;
            self.barrier_cond.notify_all();
            true
        } else {
            false
        }
    }

    /// Block until `group`'s barrier epoch advances past the value captured
    /// when this call started (i.e. until the coordinator's broadcast
    /// `Barrier` reply for this round has been applied via
    /// `complete_barrier`).
    pub fn await_barrier(&self, group: i32) {
        let mut state = self.state.lock();
        let start_epoch = *state.barrier_epoch.get(&group).unwrap_or(&0);
        while *state.barrier_epoch.get(&group).unwrap_or(&0) <= start_epoch {
            self.barrier_cond.wait(&mut state);
        }
    }

    /// Non-coordinator: apply the coordinator's `Barrier` reply, waking
    /// every local thread blocked in `await_barrier` for this group.
    pub fn complete_barrier(&self, group: i32) {
        let mut state = self.state.lock();
        *state.barrier_epoch.entry(group).or_insert(0) += 1;
        self.barrier_cond.notify_all();
    }
}

fn group_contains(group: i32, node_id: i32) -> bool {
    group & node_id != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_assembles_roster_once_all_nodes_registered() {
        let manager = NodeManager::new(1, 1);
        manager.install_self(NodeInfo::new(NodeRole::Coordinator, 0, "h", 0));
        assert!(manager
            .register_add_node(NodeRole::Server, "s".into(), 1)
            .is_none());
        let roster = manager
            .register_add_node(NodeRole::Worker, "w".into(), 2)
            .expect("roster should be complete");
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn barrier_of_three_completes_only_after_the_third_arrival() {
        let manager = NodeManager::new(0, 3);
        for rank in 0..3 {
            manager.install_self(NodeInfo::new(NodeRole::Worker, rank, "h", 0));
        }
        assert!(!manager.barrier_arrive(node::WORKER_GROUP));
        assert!(!manager.barrier_arrive(node::WORKER_GROUP));
        assert!(manager.barrier_arrive(node::WORKER_GROUP));
    }

    #[test]
    fn dead_nodes_are_tracked_after_heartbeat_timeout() {
        let manager = NodeManager::new(1, 0);
        manager.record_heartbeat(42);
        assert!(manager.scan_dead(Duration::from_millis(0)).contains(&42));
        assert!(manager.is_dead(42));
    }

    #[test]
    fn fresh_heartbeat_is_not_dead() {
        let manager = NodeManager::new(1, 0);
        manager.record_heartbeat(42);
        assert!(manager.scan_dead(Duration::from_secs(60)).is_empty());
    }
}
