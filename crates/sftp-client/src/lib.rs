//! A client-side SFTP v3 session: packet framing over a duplex transport,
//! request/response correlation, the directory/file operation protocol,
//! and the resumable upload/download transfer engine built on top of it.
//!
//! Wire types and the byte-level codec live in [`sftp_proto`]; this crate
//! is everything that needs an open connection.

pub mod channel;
pub mod client;
pub mod correlator;
pub mod error;
pub mod ops;
pub mod path;
pub mod progress;
pub mod session;
pub mod transfer;
pub mod transport;

/// A scripted in-memory server for driving [`Session`](session::Session)
/// without a real SFTP server. Always available to this crate's own unit
/// tests; exposed to `tests/` integration tests and downstream crates only
/// behind the `test-util` feature, since a `#[cfg(test)]` module can't be
/// reached from outside the crate.
#[cfg(any(test, feature = "test-util"))]
pub mod test_support;

pub use client::{Capabilities, Client};
pub use error::{EngineOutcome, Error, Result};
pub use ops::Handle;
pub use progress::{CopyParameters, OperationProgress, Prompter};
