//! Wire encoding for [`MessageMeta`] and [`Message`].
//!
//! A meta record is a sequence of `(tag: u8, len: u32 LE, bytes)` fields.
//! An unrecognized tag is skipped by length rather than rejected, so a
//! reader built against an older version of this crate can still parse a
//! meta written by a newer sender (forward compatibility, per the framing
//! note in the teacher's own envelope codec).
//!
//! A full message frame is `u32 LE meta_len, meta_bytes, (u32 LE slice_len,
//! slice_bytes) * slice_data_types.len()`.

use std::io::{Read, Write};
use std::sync::Arc;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use mlps_core::{Command, DataType};

use crate::error::{WireError, WireResult};
use crate::message::Message;
use crate::meta::MessageMeta;

const TAG_MESSAGE_ID: u8 = 1;
const TAG_SENDER: u8 = 2;
const TAG_RECEIVER: u8 = 3;
const TAG_IS_REQUEST: u8 = 4;
const TAG_IS_EXCEPTION: u8 = 5;
const TAG_COMMAND: u8 = 6;
const TAG_BODY: u8 = 7;
const TAG_SLICE_TYPES: u8 = 8;

fn write_field<W: Write>(w: &mut W, tag: u8, bytes: &[u8]) -> WireResult<()> {
    w.write_u8(tag)?;
    w.write_u32::<LE>(bytes.len() as u32)?;
    w.write_all(bytes)?;
    Ok(())
}

/// Encode a [`MessageMeta`] as a self-delimited sequence of tagged fields.
pub fn encode_meta(meta: &MessageMeta) -> WireResult<Vec<u8>> {
    let mut out = Vec::new();
    write_field(&mut out, TAG_MESSAGE_ID, &meta.message_id.to_le_bytes())?;
    write_field(&mut out, TAG_SENDER, &meta.sender.to_le_bytes())?;
    write_field(&mut out, TAG_RECEIVER, &meta.receiver.to_le_bytes())?;
    write_field(&mut out, TAG_IS_REQUEST, &[meta.is_request as u8])?;
    write_field(&mut out, TAG_IS_EXCEPTION, &[meta.is_exception as u8])?;
    if let Some(command) = meta.command {
        write_field(&mut out, TAG_COMMAND, &[command.code()])?;
    }
    if !meta.body.is_empty() {
        write_field(&mut out, TAG_BODY, &meta.body)?;
    }
    if !meta.slice_data_types.is_empty() {
        let mut buf = Vec::with_capacity(meta.slice_data_types.len() * 8);
        for dt in &meta.slice_data_types {
            buf.write_u64::<LE>(dt.code())?;
        }
        write_field(&mut out, TAG_SLICE_TYPES, &buf)?;
    }
    Ok(out)
}

/// Decode a [`MessageMeta`] from an exact-length buffer (no trailing bytes).
pub fn decode_meta(bytes: &[u8]) -> WireResult<MessageMeta> {
    let mut message_id = 0u64;
    let mut sender = 0i32;
    let mut receiver = 0i32;
    let mut is_request = false;
    let mut is_exception = false;
    let mut command = None;
    let mut body = Vec::new();
    let mut slice_data_types = Vec::new();

    let mut cursor = bytes;
    while !cursor.is_empty() {
        if cursor.len() < 5 {
            return Err(WireError::Truncated {
                expected: 5,
                found: cursor.len(),
            });
        }
        let tag = cursor[0];
        let len = u32::from_le_bytes([cursor[1], cursor[2], cursor[3], cursor[4]]) as usize;
        cursor = &cursor[5..];
        if cursor.len() < len {
            return Err(WireError::Truncated {
                expected: len,
                found: cursor.len(),
            });
        }
        let field = &cursor[..len];
        cursor = &cursor[len..];

        match tag {
            TAG_MESSAGE_ID => message_id = u64::from_le_bytes(field.try_into().unwrap_or_default()),
            TAG_SENDER => sender = i32::from_le_bytes(field.try_into().unwrap_or_default()),
            TAG_RECEIVER => receiver = i32::from_le_bytes(field.try_into().unwrap_or_default()),
            TAG_IS_REQUEST => is_request = field.first().copied().unwrap_or(0) != 0,
            TAG_IS_EXCEPTION => is_exception = field.first().copied().unwrap_or(0) != 0,
            TAG_COMMAND => {
                let code = field.first().copied().unwrap_or(0);
                command = Some(Command::from_code(code).ok_or(WireError::UnknownCommand(code))?);
            }
            TAG_BODY => body = field.to_vec(),
            TAG_SLICE_TYPES => {
                let mut r = field;
                slice_data_types.clear();
                while !r.is_empty() {
                    let code = r.read_u64::<LE>()?;
                    slice_data_types
                        .push(DataType::from_code(code).ok_or(WireError::UnknownDataType(code))?);
                }
            }
            // Unknown tag: skip, already consumed by length above.
            _ => {}
        }
    }

    Ok(MessageMeta {
        message_id,
        sender,
        receiver,
        is_request,
        is_exception,
        command,
        body,
        slice_data_types,
    })
}

/// Write a full message frame: length-prefixed meta, then one
/// length-prefixed frame per slice.
pub fn write_message<W: Write>(w: &mut W, message: &Message) -> WireResult<()> {
    if message.slices.len() != message.meta.slice_data_types.len() {
        return Err(WireError::SliceCountMismatch {
            slices: message.slices.len(),
            declared: message.meta.slice_data_types.len(),
        });
    }
    let meta_bytes = encode_meta(&message.meta)?;
    w.write_u32::<LE>(meta_bytes.len() as u32)?;
    w.write_all(&meta_bytes)?;
    for slice in &message.slices {
        w.write_u32::<LE>(slice.len() as u32)?;
        w.write_all(slice)?;
    }
    Ok(())
}

/// Read a full message frame. Blocks on `r` until the frame is complete or
/// an I/O error (including EOF) occurs.
pub fn read_message<R: Read>(r: &mut R) -> WireResult<Message> {
    let meta_len = r.read_u32::<LE>()? as usize;
    let mut meta_bytes = vec![0u8; meta_len];
    r.read_exact(&mut meta_bytes)?;
    let meta = decode_meta(&meta_bytes)?;

    let mut slices = Vec::with_capacity(meta.slice_data_types.len());
    for _ in &meta.slice_data_types {
        let slice_len = r.read_u32::<LE>()? as usize;
        let mut buf = vec![0u8; slice_len];
        r.read_exact(&mut buf)?;
        slices.push(Arc::from(buf.into_boxed_slice()));
    }

    Ok(Message { meta, slices })
}
