//! `MessageMeta`: the fixed set of fields carried ahead of a message's
//! slices, encoded as field-tagged records so unknown future tags can be
//! skipped by an older reader (forward compatibility).

use mlps_core::{Command, DataType};

/// Metadata preceding a message's slices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMeta {
    /// Monotonic per-sender id, used for dedup and ack correlation.
    pub message_id: u64,
    pub sender: i32,
    /// A single node id, or a role-group id (see `mlps_core::node`).
    pub receiver: i32,
    pub is_request: bool,
    pub is_exception: bool,
    /// Absent for plain data messages; present for control-plane traffic.
    pub command: Option<Command>,
    /// Opaque payload for control messages (e.g. a serialized roster) or an
    /// exception's error text.
    pub body: Vec<u8>,
    /// Declares the type of each trailing slice, in order.
    pub slice_data_types: Vec<DataType>,
}

impl MessageMeta {
    /// A bare data-message meta with no slices and no body.
    pub fn data(message_id: u64, sender: i32, receiver: i32, is_request: bool) -> Self {
        MessageMeta {
            message_id,
            sender,
            receiver,
            is_request,
            is_exception: false,
            command: None,
            body: Vec::new(),
            slice_data_types: Vec::new(),
        }
    }

    /// A control-plane meta carrying `command` and no slices.
    pub fn control(message_id: u64, sender: i32, receiver: i32, command: Command) -> Self {
        MessageMeta {
            message_id,
            sender,
            receiver,
            is_request: true,
            is_exception: false,
            command: Some(command),
            body: Vec::new(),
            slice_data_types: Vec::new(),
        }
    }

    /// Build an exception response meta answering this request.
    pub fn exception_reply(&self, sender: i32, reason: impl Into<String>) -> Self {
        MessageMeta {
            message_id: self.message_id,
            sender,
            receiver: self.sender,
            is_request: false,
            is_exception: true,
            command: self.command,
            body: reason.into().into_bytes(),
            slice_data_types: Vec::new(),
        }
    }
}
