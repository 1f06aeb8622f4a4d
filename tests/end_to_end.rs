//! Exercises the root facade's `start_node` across all three roles, mirroring
//! spec.md §8's "pull after push" and barrier scenarios end to end rather
//! than against any single crate in isolation.

use std::sync::Arc;
use std::thread;

use mlps_runtime::{start_node, ActorConfig, Initializer, Node, NodeRole, PrunePredicate, TensorKind, TensorMeta, Updater};

struct ZeroInitializer;
impl Initializer for ZeroInitializer {
    fn initialize(&self, _key: u64, data: &mut [u8], state: &mut [u8]) {
        data.fill(0);
        state.fill(0);
    }
}

struct ReplaceUpdater;
impl Updater for ReplaceUpdater {
    fn update(&self, _key: u64, data: &mut [u8], _state: &mut [u8], values: &[u8]) {
        data.copy_from_slice(values);
    }
}

struct NeverSmall;
impl PrunePredicate for NeverSmall {
    fn is_small(&self, _data: &[u8], _epsilon: f64) -> bool {
        false
    }
    fn age(&self, _state: &[u8]) -> u64 {
        0
    }
}

fn config_for(role: NodeRole, root_port: u16, server_count: usize) -> ActorConfig {
    ActorConfig {
        root_uri: "127.0.0.1".into(),
        root_port,
        node_uri: "127.0.0.1".into(),
        node_port: 0,
        node_role: role,
        server_count,
        worker_count: 1,
        heartbeat_interval_ms: 50,
        heartbeat_timeout_ms: 5_000,
        is_resending_enabled: false,
        resending_timeout_ms: 200,
        resending_retry: 5,
        drop_rate: 0.0,
        is_local_mode: true,
        bind_retry: 20,
    }
}

fn optimizer_seam() -> (Arc<dyn Initializer>, Arc<dyn Updater>, Arc<dyn PrunePredicate>) {
    (Arc::new(ZeroInitializer), Arc::new(ReplaceUpdater), Arc::new(NeverSmall))
}

#[test]
fn pull_after_push_across_a_four_server_cluster() {
    // Mirrors spec.md §8 scenario 6: push key 5 on a 4-server cluster, then
    // pull it back from the server that owns `5 mod 4 = 1`.
    let server_count = 4;

    let (init, upd, prune) = optimizer_seam();
    let coordinator_config = config_for(NodeRole::Coordinator, 0, server_count);
    let Node::Coordinator(coordinator) = start_node(coordinator_config, init, upd, prune).unwrap() else {
        panic!("expected a coordinator node");
    };
    let root_port = coordinator.transport().local_addr().port();

    let server_handles: Vec<_> = (0..server_count)
        .map(|_| {
            let config = config_for(NodeRole::Server, root_port, server_count);
            let (init, upd, prune) = optimizer_seam();
            thread::spawn(move || match start_node(config, init, upd, prune).unwrap() {
                Node::Server { actor, .. } => actor,
                _ => panic!("expected a server node"),
            })
        })
        .collect();

    let worker_config = config_for(NodeRole::Worker, root_port, server_count);
    let (init, upd, prune) = optimizer_seam();
    let worker_handle = thread::spawn(move || match start_node(worker_config, init, upd, prune).unwrap() {
        Node::Worker { actor, agent } => (actor, agent),
        _ => panic!("expected a worker node"),
    });

    let servers: Vec<_> = server_handles.into_iter().map(|h| h.join().unwrap()).collect();
    let (worker_actor, agent) = worker_handle.join().unwrap();

    let meta = TensorMeta {
        name: "embedding".into(),
        kind: TensorKind::Sparse,
        data_type: mlps_runtime::DataType::Float32,
        data_shape: vec![1],
        state_shape: vec![],
        initializer: Vec::new(),
        updater: Vec::new(),
        partition_count: server_count as u32,
    };
    agent.init(meta).expect("init should broadcast to every server");
    agent
        .push("embedding", &[5], &[0.5f32.to_le_bytes().to_vec()], false)
        .expect("push should succeed");
    let pulled = agent.pull("embedding", &[5], true).expect("pull should succeed");
    assert_eq!(pulled, vec![0.5f32.to_le_bytes().to_vec()]);

    coordinator.stop();
    for server in &servers {
        server.stop();
    }
    worker_actor.stop();
}

#[test]
fn barrier_of_three_workers_releases_only_after_all_arrive() {
    let (init, upd, prune) = optimizer_seam();
    let coordinator_config = config_for(NodeRole::Coordinator, 0, 0);
    let Node::Coordinator(coordinator) =
        start_node(ActorConfig { worker_count: 3, ..coordinator_config }, init, upd, prune).unwrap()
    else {
        panic!("expected a coordinator node");
    };
    let root_port = coordinator.transport().local_addr().port();

    let worker_handles: Vec<_> = (0..3)
        .map(|_| {
            let config = ActorConfig { worker_count: 3, ..config_for(NodeRole::Worker, root_port, 0) };
            let (init, upd, prune) = optimizer_seam();
            thread::spawn(move || match start_node(config, init, upd, prune).unwrap() {
                Node::Worker { actor, .. } => actor,
                _ => panic!("expected a worker node"),
            })
        })
        .collect();

    let workers: Vec<_> = worker_handles.into_iter().map(|h| h.join().unwrap()).collect();

    let barrier_handles: Vec<_> = workers
        .iter()
        .map(|worker| {
            let worker = Arc::clone(worker);
            thread::spawn(move || worker.barrier(mlps_runtime::node::WORKER_GROUP))
        })
        .collect();
    for handle in barrier_handles {
        handle.join().unwrap().expect("barrier should complete once all three arrive");
    }

    coordinator.stop();
    for worker in &workers {
        worker.stop();
    }
}
