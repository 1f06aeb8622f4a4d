//! Errors raised while decoding a message frame. All of these are protocol
//! errors per the error handling design: the caller logs and drops the
//! message rather than treating a peer's malformed frame as fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("truncated frame: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("unknown command code {0}")]
    UnknownCommand(u8),

    #[error("unknown data type code {0}")]
    UnknownDataType(u64),

    #[error("slice count {slices} does not match slice_data_types length {declared}")]
    SliceCountMismatch { slices: usize, declared: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WireResult<T> = std::result::Result<T, WireError>;
