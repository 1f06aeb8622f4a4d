//! `PSAgent`: the worker-side tensor RPC client. Partitions keys by
//! `key mod server_count`, issues one request per touched server, and
//! blocks the caller until every response is back (§4.5/§5's suspension
//! points — `Pull`/`Push`/`Init`/`Save`/`Load` all await their replies
//! before returning).

use std::path::Path;
use std::sync::Arc;

use mlps_cluster::ActorProcess;
use mlps_core::node::{self, NodeRole};
use mlps_tensor_store::TensorMeta;
use mlps_wire::{slice_from_vec, Message, Slice};

use crate::error::{AgentError, AgentResult};
use crate::partition::bucket_by_partition;
use crate::protocol::{request_message, TensorOp};
use crate::uniquifier::HashUniquifier;

pub struct PSAgent {
    actor: Arc<ActorProcess>,
    server_count: u32,
}

impl PSAgent {
    pub fn new(actor: Arc<ActorProcess>, server_count: u32) -> Self {
        PSAgent { actor, server_count }
    }

    fn server_node_id(&self, partition: u32) -> i32 {
        node::rank_to_node_id(NodeRole::Server, partition as i32)
    }

    fn call(&self, partition: u32, op: &TensorOp, value_slices: Vec<Slice>) -> AgentResult<Message> {
        let receiver = self.server_node_id(partition);
        let reply = self.actor.request(|message_id| {
            request_message(self.actor.self_node_id(), receiver, message_id, op, value_slices)
                .expect("encoding a TensorOp request never fails")
        })?;
        if reply.meta.is_exception {
            let reason = String::from_utf8_lossy(&reply.meta.body).into_owned();
            return Err(AgentError::Remote { server: receiver, reason });
        }
        Ok(reply)
    }

    fn broadcast(&self, build_op: impl Fn(u32) -> TensorOp) -> AgentResult<()> {
        for partition in 0..self.server_count {
            self.call(partition, &build_op(partition), Vec::new())?;
        }
        Ok(())
    }

    /// (a) buckets `keys` by owning server, (b) one request per touched
    /// server, (c) reassembles values into `keys`' original order. Duplicate
    /// keys are deduplicated before the RPC round and fanned back out here.
    pub fn pull(&self, tensor: &str, keys: &[u64], read_only: bool) -> AgentResult<Vec<Vec<u8>>> {
        let mut uniquifier = HashUniquifier::new();
        let positions = uniquifier.uniquify(keys);
        let unique_keys = uniquifier.unique_keys().to_vec();
        let buckets = bucket_by_partition(&unique_keys, self.server_count);

        let mut by_unique_index: Vec<Option<Vec<u8>>> = vec![None; unique_keys.len()];
        for (&partition, entries) in &buckets {
            let server_keys: Vec<u64> = entries.iter().map(|&(_, key)| key).collect();
            let op = TensorOp::Pull {
                tensor: tensor.to_string(),
                keys: server_keys,
                read_only,
            };
            let reply = self.call(partition, &op, Vec::new())?;
            if reply.slices.len() != entries.len() {
                return Err(AgentError::BadRequest(format!(
                    "server {} returned {} slices for {} requested keys",
                    self.server_node_id(partition),
                    reply.slices.len(),
                    entries.len()
                )));
            }
            for (&(unique_index, _), slice) in entries.iter().zip(reply.slices.iter()) {
                by_unique_index[unique_index] = Some(slice.to_vec());
            }
        }

        Ok(positions
            .into_iter()
            .map(|unique_index| {
                by_unique_index[unique_index as usize]
                    .clone()
                    .expect("every unique key was pulled from its owning server")
            })
            .collect())
    }

    /// Fire-and-forget (ack-only reply): pushes `values[i]` for `keys[i]`,
    /// `is_value = true` replacing the data region verbatim (used on load),
    /// `false` applying it as a gradient through the registered updater.
    pub fn push(&self, tensor: &str, keys: &[u64], values: &[Vec<u8>], is_value: bool) -> AgentResult<()> {
        if keys.len() != values.len() {
            return Err(AgentError::BadRequest(format!(
                "{} keys but {} value chunks",
                keys.len(),
                values.len()
            )));
        }
        let buckets = bucket_by_partition(keys, self.server_count);
        for (&partition, entries) in &buckets {
            let server_keys: Vec<u64> = entries.iter().map(|&(_, key)| key).collect();
            let slices: Vec<Slice> = entries
                .iter()
                .map(|&(index, _)| slice_from_vec(values[index].clone()))
                .collect();
            let op = TensorOp::Push {
                tensor: tensor.to_string(),
                keys: server_keys,
                is_value,
            };
            self.call(partition, &op, slices)?;
        }
        Ok(())
    }

    /// Broadcast to every server; completes only once every server acks.
    pub fn init(&self, meta: TensorMeta) -> AgentResult<()> {
        self.broadcast(|_| TensorOp::Init { meta: meta.clone() })
    }

    pub fn save(&self, tensor: &str, dir: &Path) -> AgentResult<()> {
        let dir = dir.to_string_lossy().into_owned();
        self.broadcast(|rank| TensorOp::Save {
            tensor: tensor.to_string(),
            dir: dir.clone(),
            rank,
        })
    }

    pub fn export(&self, tensor: &str, dir: &Path) -> AgentResult<()> {
        let dir = dir.to_string_lossy().into_owned();
        self.broadcast(|rank| TensorOp::Export {
            tensor: tensor.to_string(),
            dir: dir.clone(),
            rank,
        })
    }

    pub fn load(&self, tensor: &str, dir: &Path, keep_meta: bool) -> AgentResult<()> {
        let dir = dir.to_string_lossy().into_owned();
        self.broadcast(|rank| TensorOp::Load {
            tensor: tensor.to_string(),
            dir: dir.clone(),
            rank,
            keep_meta,
        })
    }

    pub fn import(&self, tensor: &str, dir: &Path, data_only: bool, skip_existing: bool) -> AgentResult<()> {
        let dir = dir.to_string_lossy().into_owned();
        self.broadcast(|rank| TensorOp::Import {
            tensor: tensor.to_string(),
            dir: dir.clone(),
            rank,
            data_only,
            skip_existing,
        })
    }
}
