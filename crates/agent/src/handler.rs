//! `PSRequestHandler`: the server-side `RequestHandler` that answers
//! `TensorOp` requests against a local `TensorStore`. Owned and supplied by
//! whatever starts the server `ActorProcess` (§9's capability-object seam);
//! `ActorProcess` calls into it but never owns it.

use std::path::Path;
use std::sync::Arc;

use mlps_cluster::RequestHandler;
use mlps_tensor_store::{Initializer, PrunePredicate, TensorStore, TensorStoreResult, Updater};
use mlps_wire::{slice_from_vec, Message};

use crate::protocol::{ack_reply, decode_op, pull_reply, TensorOp};

pub struct PSRequestHandler {
    store: Arc<TensorStore>,
    initializer: Arc<dyn Initializer>,
    updater: Arc<dyn Updater>,
    prune_predicate: Arc<dyn PrunePredicate>,
}

impl PSRequestHandler {
    pub fn new(
        store: Arc<TensorStore>,
        initializer: Arc<dyn Initializer>,
        updater: Arc<dyn Updater>,
        prune_predicate: Arc<dyn PrunePredicate>,
    ) -> Self {
        PSRequestHandler {
            store,
            initializer,
            updater,
            prune_predicate,
        }
    }

    fn run(&self, op: TensorOp) -> TensorStoreResult<Option<Vec<Vec<u8>>>> {
        match op {
            TensorOp::Pull { tensor, keys, read_only } => self
                .store
                .pull(&tensor, &keys, read_only, self.initializer.as_ref())
                .map(Some),
            TensorOp::Push { .. } => {
                // Value chunks arrive as the request's slices; `handle_request`
                // intercepts Push before this match is reached.
                unreachable!("Push is handled directly in handle_request")
            }
            TensorOp::Init { meta } => self.store.init(meta).map(|()| None),
            TensorOp::Save { tensor, dir, rank } => self.store.save(&tensor, Path::new(&dir), rank).map(|()| None),
            TensorOp::Export { tensor, dir, rank } => self.store.export(&tensor, Path::new(&dir), rank).map(|()| None),
            TensorOp::Load { tensor, dir, rank, keep_meta } => {
                self.store.load(&tensor, Path::new(&dir), rank, keep_meta).map(|()| None)
            }
            TensorOp::Import { tensor, dir, rank, data_only, skip_existing } => self
                .store
                .import(&tensor, Path::new(&dir), rank, data_only, skip_existing)
                .map(|()| None),
        }
    }
}

impl RequestHandler for PSRequestHandler {
    fn handle_request(&self, request: Message) -> Message {
        let sender = request.meta.receiver;
        let op = match decode_op(&request) {
            Ok(op) => op,
            Err(err) => return Message::control(request.meta.exception_reply(sender, err.to_string())),
        };

        if let TensorOp::Push { tensor, keys, is_value } = op {
            let values: Vec<&[u8]> = request.slices.iter().map(|slice| &slice[..]).collect();
            return match self
                .store
                .push(&tensor, &keys, &values, is_value, self.initializer.as_ref(), self.updater.as_ref())
            {
                Ok(()) => ack_reply(&request, sender),
                Err(err) => Message::control(request.meta.exception_reply(sender, err.to_string())),
            };
        }

        match self.run(op) {
            Ok(Some(values)) => pull_reply(&request, sender, values.into_iter().map(slice_from_vec).collect()),
            Ok(None) => ack_reply(&request, sender),
            Err(err) => Message::control(request.meta.exception_reply(sender, err.to_string())),
        }
    }
}

/// Exposed so a server process can wire `PrunePredicate`-driven maintenance
/// without going through the RPC layer (e.g. a periodic local sweep).
pub fn prune_small(handler: &PSRequestHandler, tensor: &str, epsilon: f64) -> TensorStoreResult<u64> {
    handler.store.prune_small(tensor, epsilon, handler.prune_predicate.as_ref())
}

pub fn prune_old(handler: &PSRequestHandler, tensor: &str, max_age: u64) -> TensorStoreResult<u64> {
    handler.store.prune_old(tensor, max_age, handler.prune_predicate.as_ref())
}
