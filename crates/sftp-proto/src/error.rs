//! Decode-time errors for the packet codec.

use thiserror::Error;

/// Errors raised while decoding bytes into [`crate::Packet`] fields or typed
/// wire structures. These are always protocol violations: truncated buffers,
/// an out-of-range opcode, or a `NAME` reply with an unexpected entry count.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("unknown SFTP opcode byte: {0}")]
    UnknownOpcode(u8),

    #[error("packet read past end of buffer: cursor {pos}, length {len}")]
    ReadPastEnd { pos: usize, len: usize },

    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    #[error("NAME reply carried {count} entries, expected exactly 1")]
    UnexpectedNameCount { count: u32 },

    #[error("frame length {len} exceeds the maximum of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },
}
