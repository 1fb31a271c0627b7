//! Wire types and codec for SFTP v3: opcodes, status codes, the packet
//! buffer, attribute blocks, and directory-entry decoding.
//!
//! This crate has no I/O of its own — it only turns bytes into typed
//! values and back. Framing a packet over a transport and matching
//! requests to replies belongs to `sftp-client`.

mod attrs;
mod error;
mod name;
mod opcode;
mod packet;
mod status;

pub use attrs::{Attributes, ExtendedAttr};
pub use error::ProtoError;
pub use name::RemoteFile;
pub use opcode::Opcode;
pub use packet::{MessageCounter, Packet, NO_MESSAGE_NUMBER};
pub use status::{AllowStatus, StatusCode};

/// The only version this client speaks. Negotiation succeeds only when a
/// server's `VERSION` reply reports exactly this value; see spec.md §4.5
/// and SPEC_FULL.md's resolution of the version-mismatch open question.
pub const PROTOCOL_VERSION: u32 = 3;
