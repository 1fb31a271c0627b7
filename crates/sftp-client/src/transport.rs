//! The transport boundary: a reliable, in-order, byte-stream duplex
//! channel that carries length-prefixed SFTP packets.
//!
//! spec.md §1 puts the SSH transport itself deliberately out of scope; all
//! this crate asks of it is `AsyncRead + AsyncWrite`. `sftp-cli` supplies
//! one by spawning `ssh -s sftp` and using its stdio, the same pattern
//! `openssh`/`ssh2-rs` use to keep SSH plumbing out of the SFTP layer.

use tokio::io::{AsyncRead, AsyncWrite};

/// Anything that can carry a framed SFTP byte stream in both directions.
/// Blanket-implemented for any `AsyncRead + AsyncWrite + Unpin + Send`, so
/// a `tokio::process::Child`'s stdio pair, a `tokio::io::duplex` test
/// harness, or a real socket all satisfy it without an adapter type.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}
