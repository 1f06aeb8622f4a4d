//! `Transport`: reliable node-to-node messaging over per-peer TCP streams.
//!
//! One inbound listener accepts a connection per peer; each accepted stream
//! gets its own reader thread that decodes frames and pushes them onto a
//! shared inbound queue. `ActorProcess` drains that queue from what the
//! concurrency model calls "the receiver thread" — the queue is the seam
//! that lets many physical sockets look like one logical inbound channel.
//! Outbound sends go out over a per-peer connection guarded by its own lock,
//! so per-peer order is preserved; nothing orders sends across peers.

use std::collections::VecDeque;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use mlps_wire::{read_message, write_message, Message};
use parking_lot::Mutex;
use rand::Rng;

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::peer::{bind_with_retry, dial_with_retry};

struct PendingSend {
    receiver: i32,
    frame: Vec<u8>,
    attempts: u32,
    deadline: Instant,
}

/// A message that could not be delivered after exhausting retries. The
/// caller (typically `ActorProcess`) turns this into an exception response.
#[derive(Debug, Clone, Copy)]
pub struct FailedSend {
    pub receiver: i32,
    pub message_id: u64,
}

/// Running counters; relaxed ordering, statistics only (§5).
#[derive(Debug, Default)]
pub struct TransportStats {
    pub send_bytes: AtomicU64,
    pub receive_bytes: AtomicU64,
    pub message_counter: AtomicU64,
}

pub struct Transport {
    self_node_id: AtomicI32,
    config: TransportConfig,
    outbound: DashMap<i32, Mutex<TcpStream>>,
    dead: DashMap<i32, ()>,
    seen: DashMap<(i32, u64), ()>,
    pending: DashMap<(i32, u64), PendingSend>,
    inbound_tx: Sender<Message>,
    inbound_rx: Mutex<Receiver<Message>>,
    failed: Mutex<VecDeque<FailedSend>>,
    next_message_id: AtomicU64,
    shutting_down: AtomicBool,
    bound_addr: std::net::SocketAddr,
    pub stats: TransportStats,
}

impl Transport {
    /// Bind the inbound listener and start the accept + resend threads.
    /// `self_node_id` identifies this node for dedup bookkeeping.
    pub fn bind(self_node_id: i32, addr: &str, config: TransportConfig) -> TransportResult<Arc<Transport>> {
        config.validate().map_err(|e| {
            TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))
        })?;
        let listener = bind_with_retry(addr, config.bind_retry)?;
        let bound_addr = listener.local_addr()?;
        let (inbound_tx, inbound_rx) = mpsc::channel();

        let transport = Arc::new(Transport {
            self_node_id: AtomicI32::new(self_node_id),
            config,
            outbound: DashMap::new(),
            dead: DashMap::new(),
            seen: DashMap::new(),
            pending: DashMap::new(),
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            failed: Mutex::new(VecDeque::new()),
            next_message_id: AtomicU64::new(1),
            shutting_down: AtomicBool::new(false),
            bound_addr,
            stats: TransportStats::default(),
        });

        spawn_accept_loop(Arc::clone(&transport), listener);
        spawn_resend_loop(Arc::clone(&transport));
        Ok(transport)
    }

    /// Local address the listener actually bound to (resolves `:0` auto-assign).
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.bound_addr
    }

    /// Update this node's id once the coordinator has assigned one. Binding
    /// happens before a non-coordinator node knows its rank, so the id used
    /// at construction is a placeholder.
    pub fn set_self_node_id(&self, node_id: i32) {
        self.self_node_id.store(node_id, Ordering::Release);
    }

    fn self_node_id(&self) -> i32 {
        self.self_node_id.load(Ordering::Acquire)
    }

    /// Allocate the next `message_id` for an outbound data message.
    pub fn next_message_id(&self) -> u64 {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Establish (or reuse) an outbound connection to `node_id` at `addr`.
    pub fn connect(&self, node_id: i32, addr: &str, attempts: u32) -> TransportResult<()> {
        if self.outbound.contains_key(&node_id) {
            return Ok(());
        }
        let stream = dial_with_retry(addr, attempts)?;
        self.outbound.insert(node_id, Mutex::new(stream));
        self.dead.remove(&node_id);
        Ok(())
    }

    pub fn is_dead(&self, node_id: i32) -> bool {
        self.dead.contains_key(&node_id)
    }

    /// Mark `node_id` dead. In-flight and future sends to it fail until a
    /// fresh `connect` clears the mark.
    pub fn mark_dead(&self, node_id: i32) {
        self.dead.insert(node_id, ());
        self.outbound.remove(&node_id);
        let receiver = node_id;
        self.pending.retain(|_, p| p.receiver != receiver);
    }

    /// Send `message` to `message.meta.receiver`. When resending is enabled
    /// and the message carries no command (a data message), the send is
    /// tracked for ack/resend until `Ack(message_id)` arrives or retries are
    /// exhausted.
    pub fn send(&self, message: &Message) -> TransportResult<()> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(TransportError::ShutDown);
        }
        let receiver = message.meta.receiver;
        if self.is_dead(receiver) {
            return Err(TransportError::DeadPeer(receiver));
        }

        let mut frame = Vec::new();
        write_message(&mut frame, message)?;

        let tracked = self.config.is_resending_enabled && message.meta.command.is_none();
        if tracked {
            self.pending.insert(
                (receiver, message.meta.message_id),
                PendingSend {
                    receiver,
                    frame: frame.clone(),
                    attempts: 0,
                    deadline: Instant::now()
                        + Duration::from_millis(self.config.resending_timeout_ms),
                },
            );
        }

        self.write_frame(receiver, &frame)
    }

    fn write_frame(&self, receiver: i32, frame: &[u8]) -> TransportResult<()> {
        if self.config.drop_rate > 0.0 && rand::thread_rng().gen::<f64>() < self.config.drop_rate {
            tracing::trace!(receiver, "simulated drop of outbound frame");
            return Ok(());
        }
        let conn = self
            .outbound
            .get(&receiver)
            .ok_or(TransportError::NotConnected(receiver))?;
        let mut stream = conn.lock();
        stream.write_all(frame)?;
        self.stats.send_bytes.fetch_add(frame.len() as u64, Ordering::Relaxed);
        self.stats.message_counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Reply to a tracked data message with `Ack(message_id)`. Acks are
    /// fire-and-forget and never themselves tracked for resend.
    fn ack(&self, receiver: i32, message_id: u64) {
        let meta = mlps_wire::MessageMeta::control(
            message_id,
            self.self_node_id(),
            receiver,
            mlps_core::Command::Ack,
        );
        let message = Message::control(meta);
        let mut frame = Vec::new();
        if write_message(&mut frame, &message).is_ok() {
            let _ = self.write_frame(receiver, &frame);
        }
    }

    /// Block until a message is available, or return `None` once the
    /// transport is shut down and drained. Polls on a short interval rather
    /// than blocking forever so `shutdown()` reliably wakes callers parked
    /// here, even with no sender thread left to drop the channel.
    pub fn recv(&self) -> Option<Message> {
        loop {
            match self.inbound_rx.lock().recv_timeout(Duration::from_millis(50)) {
                Ok(message) => return Some(message),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if self.shutting_down.load(Ordering::Acquire) {
                        return None;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    pub fn try_recv(&self) -> Option<Message> {
        self.inbound_rx.lock().try_recv().ok()
    }

    /// Drain sends that exhausted their resend budget.
    pub fn take_failed(&self) -> Vec<FailedSend> {
        let mut failed = self.failed.lock();
        failed.drain(..).collect()
    }

    /// Remove and report a specific send's failure, leaving every other
    /// entry in the queue untouched. Lets one in-flight caller check on its
    /// own `message_id` without stealing failures that belong to others
    /// polling the same queue concurrently.
    pub fn take_failed_for(&self, receiver: i32, message_id: u64) -> bool {
        let mut failed = self.failed.lock();
        if let Some(pos) = failed.iter().position(|f| f.receiver == receiver && f.message_id == message_id) {
            failed.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }
}

fn spawn_accept_loop(transport: Arc<Transport>, listener: TcpListener) {
    thread::Builder::new()
        .name("mlps-transport-accept".into())
        .spawn(move || {
            for incoming in listener.incoming() {
                if transport.shutting_down.load(Ordering::Acquire) {
                    break;
                }
                match incoming {
                    Ok(stream) => spawn_reader(Arc::clone(&transport), stream),
                    Err(err) => {
                        tracing::warn!(error = %err, "accept failed");
                    }
                }
            }
        })
        .expect("failed to spawn transport accept thread");
}

fn spawn_reader(transport: Arc<Transport>, mut stream: TcpStream) {
    thread::Builder::new()
        .name("mlps-transport-reader".into())
        .spawn(move || loop {
            if transport.shutting_down.load(Ordering::Acquire) {
                return;
            }
            match read_message(&mut stream) {
                Ok(message) => transport.on_message_received(message),
                Err(err) => {
                    tracing::debug!(error = %err, "reader stream closed");
                    return;
                }
            }
        })
        .expect("failed to spawn transport reader thread");
}

impl Transport {
    fn on_message_received(&self, message: Message) {
        self.stats
            .receive_bytes
            .fetch_add(message.meta.body.len() as u64, Ordering::Relaxed);

        if message.meta.command == Some(mlps_core::Command::Ack) {
            // Pending sends are keyed by (peer we sent to, message_id); the
            // acker is that same peer, identified here as `meta.sender`.
            self.pending.remove(&(message.meta.sender, message.meta.message_id));
            return;
        }

        let tracked = self.config.is_resending_enabled && message.meta.command.is_none();
        if tracked {
            self.ack(message.meta.sender, message.meta.message_id);
            let key = (message.meta.sender, message.meta.message_id);
            if self.seen.contains_key(&key) {
                return;
            }
            self.seen.insert(key, ());
        }

        let _ = self.inbound_tx.send(message);
    }
}

fn spawn_resend_loop(transport: Arc<Transport>) {
    thread::Builder::new()
        .name("mlps-transport-resend".into())
        .spawn(move || loop {
            thread::sleep(Duration::from_millis(10));
            if transport.shutting_down.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            let due: Vec<(i32, u64)> = transport
                .pending
                .iter()
                .filter(|entry| entry.deadline <= now)
                .map(|entry| *entry.key())
                .collect();

            for key in due {
                let Some(mut entry) = transport.pending.get_mut(&key) else {
                    continue;
                };
                if entry.attempts >= transport.config.resending_retry {
                    drop(entry);
                    transport.pending.remove(&key);
                    transport.failed.lock().push_back(FailedSend {
                        receiver: key.0,
                        message_id: key.1,
                    });
                    continue;
                }
                entry.attempts += 1;
                entry.deadline = now + Duration::from_millis(transport.config.resending_timeout_ms);
                let frame = entry.frame.clone();
                let receiver = entry.receiver;
                drop(entry);
                let _ = transport.write_frame(receiver, &frame);
            }
        })
        .expect("failed to spawn transport resend thread");
}
