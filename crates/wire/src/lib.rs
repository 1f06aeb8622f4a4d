//! Message wire format: field-tagged meta plus length-prefixed slice framing.
//!
//! - [`meta`]: [`meta::MessageMeta`], the fields carried ahead of a message's
//!   slices.
//! - [`message`]: [`message::Message`] and its [`message::Slice`] buffer type.
//! - [`codec`]: encode/decode for both, plus full-frame read/write over any
//!   `Read`/`Write`.

pub mod codec;
pub mod error;
pub mod message;
pub mod meta;
pub mod slice;

pub use codec::{decode_meta, encode_meta, read_message, write_message};
pub use error::{WireError, WireResult};
pub use message::{Message, Slice};
pub use meta::MessageMeta;
pub use slice::{slice_from_bytes, slice_from_vec};

#[cfg(test)]
mod tests {
    use super::*;
    use mlps_core::{Command, DataType};

    #[test]
    fn meta_round_trips_with_command_and_body() {
        let meta = MessageMeta::control(1, 10, 20, Command::Barrier);
        let bytes = encode_meta(&meta).unwrap();
        let decoded = decode_meta(&bytes).unwrap();
        assert_eq!(meta, decoded);
    }

    #[test]
    fn meta_round_trips_with_slice_types() {
        let mut meta = MessageMeta::data(7, 1, 2, true);
        meta.slice_data_types = vec![DataType::Float32, DataType::Int64];
        let bytes = encode_meta(&meta).unwrap();
        let decoded = decode_meta(&bytes).unwrap();
        assert_eq!(meta, decoded);
    }

    #[test]
    fn unknown_trailing_tag_is_skipped() {
        let meta = MessageMeta::data(1, 1, 2, true);
        let mut bytes = encode_meta(&meta).unwrap();
        // Append a field with an unrecognized tag; it must not affect decoding.
        bytes.push(200);
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(b"xyz");
        let decoded = decode_meta(&bytes).unwrap();
        assert_eq!(meta, decoded);
    }

    #[test]
    fn truncated_field_header_is_rejected() {
        let meta = MessageMeta::data(1, 1, 2, true);
        let mut bytes = encode_meta(&meta).unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(decode_meta(&bytes), Err(WireError::Truncated { .. })));
    }

    #[test]
    fn unknown_command_code_is_rejected() {
        let mut bytes = Vec::new();
        bytes.push(6u8); // TAG_COMMAND
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(255);
        assert!(matches!(decode_meta(&bytes), Err(WireError::UnknownCommand(255))));
    }

    #[test]
    fn message_frame_round_trips_over_a_cursor() {
        let mut meta = MessageMeta::data(42, 1, 2, true);
        meta.slice_data_types = vec![DataType::Float32];
        let message = Message::new(meta, vec![slice_from_bytes(&[1, 2, 3, 4])]);

        let mut buf = Vec::new();
        write_message(&mut buf, &message).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_message(&mut cursor).unwrap();
        assert_eq!(decoded.meta, message.meta);
        assert_eq!(decoded.slices.len(), 1);
        assert_eq!(&*decoded.slices[0], &[1, 2, 3, 4]);
    }

    #[test]
    fn control_message_has_no_slices() {
        let message = Message::control(MessageMeta::control(1, 0, 1, Command::Heartbeat));
        let mut buf = Vec::new();
        write_message(&mut buf, &message).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_message(&mut cursor).unwrap();
        assert!(decoded.slices.is_empty());
        assert_eq!(decoded.meta.command, Some(Command::Heartbeat));
    }

    #[test]
    fn mismatched_slice_count_is_rejected_on_write() {
        let mut meta = MessageMeta::data(1, 1, 2, true);
        meta.slice_data_types = vec![DataType::Int8, DataType::Int8];
        let message = Message::new(meta, vec![slice_from_bytes(&[1])]);
        let mut buf = Vec::new();
        assert!(matches!(
            write_message(&mut buf, &message),
            Err(WireError::SliceCountMismatch { .. })
        ));
    }
}
