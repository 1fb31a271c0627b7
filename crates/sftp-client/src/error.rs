//! Runtime error type for a live session: protocol violations, `STATUS`
//! errors the caller didn't whitelist, local I/O failures, and the
//! transfer-engine's cooperative cancellation/skip signals.

use sftp_proto::{Opcode, ProtoError, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A protocol violation: wrong reply type when one was demanded, a
    /// mismatched message number, or a malformed decode. Per spec.md §7
    /// these always terminate the session.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtoError),

    /// The transport returned EOF or an I/O error while a reply was still
    /// expected — distinguished from [`Error::Protocol`] per SPEC_FULL.md's
    /// resolution of the corresponding open question, since the cause here
    /// is the connection, not a misbehaving peer.
    #[error("connection lost: {0}")]
    ConnectionLost(#[source] std::io::Error),

    /// Local filesystem I/O failure, outside the session entirely.
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `STATUS` reply carrying a code the caller's [`sftp_proto::AllowStatus`]
    /// mask did not whitelist.
    #[error("{request_type} failed: {code} ({message})")]
    Status {
        code: StatusCode,
        message: String,
        language: String,
        request_type: Opcode,
    },

    /// Version negotiation failed: the server's `VERSION` reply was outside
    /// `[3, 3]`.
    #[error("unsupported SFTP protocol version {0} (this client speaks version 3 only)")]
    UnsupportedVersion(u32),

    /// `CreateLink` was asked for a hardlink; only symlinks are supported.
    #[error("hardlinks are not supported")]
    HardlinkUnsupported,

    /// An ASCII transfer was requested together with resume; the source
    /// asserts this can't happen, but a reimplementation should return it
    /// rather than assert, per spec.md §9's design note.
    #[error("ASCII transfer cannot be resumed")]
    AsciiResumeUnsupported,

    /// The user-facing prompt layer reported a cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// The user answered `No`/`NoToAll` to an overwrite prompt. Distinct
    /// from [`Error::Cancelled`] per spec.md §4.6 step 4 ("No/NoToAll →
    /// skip-file, Abort → cancel"): this skips just the one file and the
    /// batch continues, where `Cancelled` unwinds it.
    #[error("overwrite declined")]
    OverwriteDeclined,

    /// A reply arrived whose message number matches neither the response
    /// currently being awaited nor any live reservation. Fatal: the
    /// correlator has lost track of the request stream.
    #[error("unexpected reply with message number {0}")]
    UnexpectedReply(u32),

    /// A reservation received a second reply for the same message number
    /// before the first was consumed.
    #[error("duplicate reply for message number {0}")]
    DuplicateReply(u32),

    /// `ReceiveResponse` got a reply whose message number differs from the
    /// request it answers.
    #[error("reply message number {actual} does not match request {expected}")]
    MessageNumberMismatch { expected: u32, actual: u32 },
}

/// A per-file transfer outcome, replacing the exception-based skip/abort
/// control flow of the source implementation with a sum type, per
/// spec.md §9.
#[derive(Debug)]
pub enum EngineOutcome<T> {
    /// The operation completed normally.
    Ok(T),
    /// This file was skipped; the batch continues with the next one.
    Skip,
    /// The user aborted; unwinds the whole batch.
    Abort,
    /// A fatal error that should also terminate the batch.
    Fatal(Error),
}

impl<T> EngineOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, EngineOutcome::Ok(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineOutcome::Abort | EngineOutcome::Fatal(_))
    }
}

impl<T> From<Result<T, Error>> for EngineOutcome<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(v) => EngineOutcome::Ok(v),
            Err(Error::Cancelled) => EngineOutcome::Abort,
            Err(e) => EngineOutcome::Fatal(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
