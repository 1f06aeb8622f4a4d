//! `ActorProcess`: the per-node event loop driving the control protocol
//! state machine from Start through Ready, plus the background receiver and
//! heartbeat threads.
//!
//! ```text
//! Start -> BindSocket -> SendAddNode(to coordinator, proposed info)
//!       -> AwaitAddNodeBroadcast (full roster with assigned ids)
//!       -> ConnectAllPeers -> Ready
//! Ready loop: dispatch(msg) by command or as Data
//! Stop: SendTerminate(to coordinator) -> drain -> exit
//! ```

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dashmap::DashMap;
use mlps_core::node::{self, NodeInfo, NodeRole};
use mlps_core::Command;
use mlps_wire::{Message, MessageMeta};
use mlps_transport::{Transport, TransportConfig, TransportError};
use parking_lot::Mutex;

use crate::config::ActorConfig;
use crate::error::{ClusterError, ClusterResult};
use crate::node_manager::NodeManager;
use crate::request_handler::RequestHandler;

/// A running node: owns its `Transport` and `NodeManager` exclusively, and
/// calls out to an externally-owned `RequestHandler` for data messages.
pub struct ActorProcess {
    config: ActorConfig,
    self_node_id: AtomicI32,
    node_manager: Arc<NodeManager>,
    transport: Arc<Transport>,
    request_handler: Arc<dyn RequestHandler>,
    /// Outstanding requests this node sent, keyed by `message_id`, waiting
    /// for their reply to arrive on the dispatch thread. The completion-queue
    /// pattern from the concurrency design: the dispatch thread only ever
    /// pushes a reply onto the channel, never runs caller code itself.
    pending_replies: DashMap<u64, mpsc::Sender<Message>>,
    terminating: AtomicBool,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl ActorProcess {
    /// Run the full startup state machine and enter `Ready`. Blocks until
    /// this node's id is assigned and all peers are connected.
    pub fn start(
        config: ActorConfig,
        request_handler: Arc<dyn RequestHandler>,
    ) -> ClusterResult<Arc<ActorProcess>> {
        let transport_config = TransportConfig {
            is_resending_enabled: config.is_resending_enabled,
            resending_timeout_ms: config.resending_timeout_ms,
            resending_retry: config.resending_retry,
            drop_rate: config.drop_rate,
            bind_retry: config.bind_retry,
        };

        let bind_addr = format!("{}:{}", config.node_uri, config.node_port);
        let transport = Transport::bind(-1, &bind_addr, transport_config)?;
        let node_manager = Arc::new(NodeManager::new(config.server_count, config.worker_count));

        let actor = Arc::new(ActorProcess {
            config: config.clone(),
            self_node_id: AtomicI32::new(-1),
            node_manager,
            transport,
            request_handler,
            pending_replies: DashMap::new(),
            terminating: AtomicBool::new(false),
            threads: Mutex::new(Vec::new()),
        });

        match config.node_role {
            NodeRole::Coordinator => actor.start_as_coordinator()?,
            NodeRole::Server | NodeRole::Worker => actor.start_as_member()?,
        }

        actor.spawn_dispatch_thread();
        actor.spawn_heartbeat_thread();
        Ok(actor)
    }

    pub fn self_node_id(&self) -> i32 {
        self.self_node_id.load(Ordering::Acquire)
    }

    pub fn node_manager(&self) -> &Arc<NodeManager> {
        &self.node_manager
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    fn start_as_coordinator(&self) -> ClusterResult<()> {
        self.self_node_id.store(node::COORDINATOR_NODE_ID, Ordering::Release);
        self.transport.set_self_node_id(node::COORDINATOR_NODE_ID);
        let local_addr = self.transport.local_addr();
        self.node_manager.install_self(NodeInfo::new(
            NodeRole::Coordinator,
            0,
            local_addr.ip().to_string(),
            local_addr.port(),
        ));

        let expected = self.config.server_count + self.config.worker_count;
        let mut registered = 0;
        while registered < expected {
            let message = self
                .transport
                .recv()
                .ok_or_else(|| ClusterError::ShuttingDown(node::ALL_GROUP))?;
            if message.meta.command != Some(Command::AddNode) {
                continue;
            }
            let proposal: AddNodeBody = serde_json::from_slice(&message.meta.body)?;
            let roster = self
                .node_manager
                .register_add_node(proposal.role.into(), proposal.host, proposal.port);
            registered += 1;
            if let Some(roster) = roster {
                self.connect_all_peers(&roster)?;
                self.broadcast_roster(&roster)?;
            }
        }
        Ok(())
    }

    fn start_as_member(&self) -> ClusterResult<()> {
        let root_addr = format!("{}:{}", self.config.root_uri, self.config.root_port);
        self.transport
            .connect(node::COORDINATOR_NODE_ID, &root_addr, self.config.bind_retry.max(1))?;

        let local_addr = self.transport.local_addr();
        let body = serde_json::to_vec(&AddNodeBody {
            role: self.config.node_role.into(),
            host: local_addr.ip().to_string(),
            port: local_addr.port(),
        })?;
        let mut meta = MessageMeta::control(
            self.transport.next_message_id(),
            -1,
            node::COORDINATOR_NODE_ID,
            Command::AddNode,
        );
        meta.body = body;
        self.transport.send(&Message::control(meta))?;

        loop {
            let message = self
                .transport
                .recv()
                .ok_or_else(|| ClusterError::ShuttingDown(node::ALL_GROUP))?;
            if message.meta.command != Some(Command::AddNode) {
                continue;
            }
            let roster: Vec<NodeInfo> = serde_json::from_slice(&message.meta.body)?;
            self.node_manager.apply_roster(roster.clone());
            let mine = roster
                .iter()
                .find(|n| NodeRole::from(n.role) == self.config.node_role && n.host == local_addr.ip().to_string() && n.port == local_addr.port())
                .or_else(|| roster.iter().find(|n| NodeRole::from(n.role) == self.config.node_role))
                .cloned();
            if let Some(info) = mine {
                self.self_node_id.store(info.node_id, Ordering::Release);
                self.transport.set_self_node_id(info.node_id);
            }
            self.connect_all_peers(&roster)?;
            return Ok(());
        }
    }

    fn connect_all_peers(&self, roster: &[NodeInfo]) -> ClusterResult<()> {
        for peer in roster {
            if peer.node_id == self.self_node_id() {
                continue;
            }
            let addr = format!("{}:{}", peer.host, peer.port);
            self.transport.connect(peer.node_id, &addr, self.config.bind_retry.max(1))?;
        }
        Ok(())
    }

    fn broadcast_roster(&self, roster: &[NodeInfo]) -> ClusterResult<()> {
        let body = serde_json::to_vec(roster)?;
        for peer in roster {
            if peer.role == mlps_core::node::NodeRoleWire::Coordinator {
                continue;
            }
            let mut meta = MessageMeta::control(
                self.transport.next_message_id(),
                self.self_node_id(),
                peer.node_id,
                Command::AddNode,
            );
            meta.body = body.clone();
            self.transport.send(&Message::control(meta))?;
        }
        Ok(())
    }

    /// Send a data message built by `build` (which receives the freshly
    /// allocated `message_id` to stamp into the meta) and block for its
    /// reply. Requests and replies correlate by `message_id`: the peer's
    /// `RequestHandler` is expected to answer with the same id it received.
    ///
    /// A receiver the coordinator has reported dead, or a send that
    /// exhausted its resend budget, fails the wait instead of blocking
    /// forever (§7: dead peer / resend exhaustion both surface as an `Err`
    /// to the caller, never a silent hang).
    pub fn request(&self, build: impl FnOnce(u64) -> Message) -> ClusterResult<Message> {
        let message_id = self.transport.next_message_id();
        let message = build(message_id);
        let receiver = message.meta.receiver;
        let (tx, rx) = mpsc::channel();
        self.pending_replies.insert(message_id, tx);
        if let Err(err) = self.transport.send(&message) {
            self.pending_replies.remove(&message_id);
            return Err(err.into());
        }
        loop {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(reply) => return Ok(reply),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if self.transport.is_dead(receiver) {
                        self.pending_replies.remove(&message_id);
                        return Err(ClusterError::DeadNode(receiver));
                    }
                    if self.transport.take_failed_for(receiver, message_id) {
                        self.pending_replies.remove(&message_id);
                        return Err(ClusterError::Transport(TransportError::ResendExhausted {
                            message_id,
                            receiver,
                        }));
                    }
                    if self.terminating.load(Ordering::Acquire) {
                        self.pending_replies.remove(&message_id);
                        return Err(ClusterError::ShuttingDown(receiver));
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    self.pending_replies.remove(&message_id);
                    return Err(ClusterError::ShuttingDown(receiver));
                }
            }
        }
    }

    /// Block until every member of `group` has called this once.
    pub fn barrier(self: &Arc<Self>, group: i32) -> ClusterResult<()> {
        if self.config.node_role == NodeRole::Coordinator {
            let complete = self.node_manager.barrier_arrive(group);
            if complete {
                self.broadcast_barrier(group)?;
            }
            self.node_manager.await_barrier(group);
            return Ok(());
        }
        let mut meta = MessageMeta::control(
            self.transport.next_message_id(),
            self.self_node_id(),
            node::COORDINATOR_NODE_ID,
            Command::Barrier,
        );
        meta.body = group.to_le_bytes().to_vec();
        self.transport.send(&Message::control(meta))?;
        self.node_manager.await_barrier(group);
        Ok(())
    }

    fn broadcast_barrier(&self, group: i32) -> ClusterResult<()> {
        for peer in self.node_manager.roster() {
            if !node::is_single_node(peer.node_id) {
                continue;
            }
            if group & peer.node_id == 0 {
                continue;
            }
            if peer.node_id == self.self_node_id() {
                self.node_manager.complete_barrier(group);
                continue;
            }
            let mut meta = MessageMeta::control(
                self.transport.next_message_id(),
                self.self_node_id(),
                peer.node_id,
                Command::Barrier,
            );
            meta.body = group.to_le_bytes().to_vec();
            self.transport.send(&Message::control(meta))?;
        }
        Ok(())
    }

    /// Begin shutdown: notify the coordinator, stop the background threads,
    /// and join them.
    pub fn stop(&self) {
        if self.terminating.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.config.node_role != NodeRole::Coordinator {
            let meta = MessageMeta::control(
                self.transport.next_message_id(),
                self.self_node_id(),
                node::COORDINATOR_NODE_ID,
                Command::Terminate,
            );
            let _ = self.transport.send(&Message::control(meta));
        }
        self.transport.shutdown();
        for handle in self.threads.lock().drain(..) {
            let _ = handle.join();
        }
    }

    fn spawn_dispatch_thread(self: &Arc<Self>) {
        let actor = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("mlps-actor-dispatch".into())
            .spawn(move || {
                while let Some(message) = actor.transport.recv() {
                    if actor.terminating.load(Ordering::Acquire) {
                        break;
                    }
                    actor.dispatch(message);
                }
            })
            .expect("failed to spawn actor dispatch thread");
        self.threads.lock().push(handle);
    }

    fn dispatch(self: &Arc<Self>, message: Message) {
        match message.meta.command {
            None => {
                if message.meta.is_request {
                    let reply = self.request_handler.handle_request(message);
                    let _ = self.transport.send(&reply);
                } else if let Some((_, sender)) = self.pending_replies.remove(&message.meta.message_id) {
                    let _ = sender.send(message);
                } else {
                    tracing::debug!(
                        message_id = message.meta.message_id,
                        sender = message.meta.sender,
                        "reply with no matching pending request"
                    );
                }
            }
            Some(Command::Barrier) => self.on_barrier_message(message),
            Some(Command::Heartbeat) => self.node_manager.record_heartbeat(message.meta.sender),
            Some(Command::ReportDeadNodes) => {
                if let Ok(dead) = serde_json::from_slice::<Vec<i32>>(&message.meta.body) {
                    self.node_manager.apply_dead_nodes(&dead);
                    for id in dead {
                        self.transport.mark_dead(id);
                    }
                }
            }
            Some(Command::Terminate) => {
                if self.config.node_role == NodeRole::Coordinator {
                    tracing::info!(sender = message.meta.sender, "peer terminated");
                }
            }
            Some(Command::AddNode) | Some(Command::Ack) | Some(Command::Empty) => {}
        }
    }

    fn on_barrier_message(self: &Arc<Self>, message: Message) {
        let Some(group_bytes) = message.meta.body.get(..4) else {
            tracing::warn!("dropping malformed Barrier message: body too short");
            return;
        };
        let group = i32::from_le_bytes(group_bytes.try_into().expect("slice is exactly 4 bytes"));
        if self.config.node_role == NodeRole::Coordinator {
            if self.node_manager.barrier_arrive(group) {
                let _ = self.broadcast_barrier(group);
            }
        } else {
            self.node_manager.complete_barrier(group);
        }
    }

    fn spawn_heartbeat_thread(self: &Arc<Self>) {
        let actor = Arc::clone(self);
        let interval = Duration::from_millis(self.config.heartbeat_interval_ms);
        let timeout = Duration::from_millis(self.config.heartbeat_timeout_ms);
        let handle = thread::Builder::new()
            .name("mlps-actor-heartbeat".into())
            .spawn(move || {
                while !actor.terminating.load(Ordering::Acquire) {
                    thread::sleep(interval);
                    if actor.terminating.load(Ordering::Acquire) {
                        break;
                    }
                    if actor.config.node_role == NodeRole::Coordinator {
                        let dead = actor.node_manager.scan_dead(timeout);
                        if !dead.is_empty() {
                            actor.broadcast_dead_nodes(&dead);
                        }
                    } else {
                        let meta = MessageMeta::control(
                            actor.transport.next_message_id(),
                            actor.self_node_id(),
                            node::COORDINATOR_NODE_ID,
                            Command::Heartbeat,
                        );
                        let _ = actor.transport.send(&Message::control(meta));
                    }
                }
            })
            .expect("failed to spawn actor heartbeat thread");
        self.threads.lock().push(handle);
    }

    fn broadcast_dead_nodes(&self, dead: &[i32]) {
        let Ok(body) = serde_json::to_vec(dead) else {
            return;
        };
        for peer in self.node_manager.roster() {
            if dead.contains(&peer.node_id) || peer.node_id == self.self_node_id() {
                continue;
            }
            let mut meta = MessageMeta::control(
                self.transport.next_message_id(),
                self.self_node_id(),
                peer.node_id,
                Command::ReportDeadNodes,
            );
            meta.body = body.clone();
            let _ = self.transport.send(&Message::control(meta));
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct AddNodeBody {
    role: mlps_core::node::NodeRoleWire,
    host: String,
    port: u16,
}
