//! The tensor RPC wire contract: a `TensorOp` JSON body names the operation
//! and its scalar arguments; value payloads travel as the message's typed
//! slices so they stay raw bytes end to end rather than JSON-inflated.

use mlps_core::DataType;
use mlps_tensor_store::TensorMeta;
use mlps_wire::{Message, MessageMeta, Slice};
use serde::{Deserialize, Serialize};

use crate::error::AgentResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TensorOp {
    Pull { tensor: String, keys: Vec<u64>, read_only: bool },
    Push { tensor: String, keys: Vec<u64>, is_value: bool },
    Init { meta: TensorMeta },
    Save { tensor: String, dir: String, rank: u32 },
    Export { tensor: String, dir: String, rank: u32 },
    Load { tensor: String, dir: String, rank: u32, keep_meta: bool },
    Import { tensor: String, dir: String, rank: u32, data_only: bool, skip_existing: bool },
}

/// Build the request `Message` for `op`, carrying `value_slices` (empty for
/// every op but `Push`).
pub fn request_message(
    sender: i32,
    receiver: i32,
    message_id: u64,
    op: &TensorOp,
    value_slices: Vec<Slice>,
) -> AgentResult<Message> {
    let mut meta = MessageMeta::data(message_id, sender, receiver, true);
    meta.body = serde_json::to_vec(op)?;
    meta.slice_data_types = vec![DataType::UInt8; value_slices.len()];
    Ok(Message::new(meta, value_slices))
}

pub fn decode_op(message: &Message) -> AgentResult<TensorOp> {
    Ok(serde_json::from_slice(&message.meta.body)?)
}

/// An empty, non-exception reply: `Push`/`Init`/`Save`/`Load` complete with
/// an ack-only response.
pub fn ack_reply(request: &Message, sender: i32) -> Message {
    let meta = MessageMeta::data(request.meta.message_id, sender, request.meta.sender, false);
    Message::control(meta)
}

/// A `Pull` reply carrying one value slice per requested key, in order.
pub fn pull_reply(request: &Message, sender: i32, values: Vec<Slice>) -> Message {
    let mut meta = MessageMeta::data(request.meta.message_id, sender, request.meta.sender, false);
    meta.slice_data_types = vec![DataType::UInt8; values.len()];
    Message::new(meta, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlps_tensor_store::TensorKind;

    #[test]
    fn pull_op_round_trips_through_json() {
        let op = TensorOp::Pull {
            tensor: "w".into(),
            keys: vec![1, 2, 3],
            read_only: true,
        };
        let message = request_message(1, 2, 7, &op, Vec::new()).unwrap();
        let decoded = decode_op(&message).unwrap();
        match decoded {
            TensorOp::Pull { tensor, keys, read_only } => {
                assert_eq!(tensor, "w");
                assert_eq!(keys, vec![1, 2, 3]);
                assert!(read_only);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn init_op_carries_a_full_tensor_meta() {
        let meta = TensorMeta {
            name: "w".into(),
            kind: TensorKind::Sparse,
            data_type: mlps_core::DataType::Float32,
            data_shape: vec![4],
            state_shape: vec![4],
            initializer: vec![1],
            updater: vec![2],
            partition_count: 2,
        };
        let op = TensorOp::Init { meta };
        let message = request_message(0, 1, 1, &op, Vec::new()).unwrap();
        let decoded = decode_op(&message).unwrap();
        assert!(matches!(decoded, TensorOp::Init { meta } if meta.name == "w"));
    }
}
