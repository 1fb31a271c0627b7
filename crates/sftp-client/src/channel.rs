//! Length-prefixed framing over a [`Transport`], with a logging filter
//! that coalesces noisy `READ`/`WRITE`/`STATUS` runs.

use log::{log_enabled, Level};
use sftp_proto::{Opcode, Packet, ProtoError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Upper bound on a single frame's declared length, matching the
/// conventional SFTP implementation limit — large enough for any legal
/// reply this client decodes, small enough that a corrupt or hostile
/// length prefix can't force a multi-gigabyte allocation.
const MAX_FRAME_LEN: usize = 256 * 1024;

/// Direction a [`LogGate`] is filtering, only used for the log line's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Send => "send",
            Direction::Receive => "recv",
        }
    }
}

/// Whether an opcode belongs to the coalesced "chatty" set: `READ`/`WRITE`
/// requests and the `STATUS` replies that answer them. Per spec.md §4.2
/// these are the only types collapsed into a run counter; everything else
/// is logged individually.
fn is_chatty(ty: Opcode) -> bool {
    matches!(ty, Opcode::Read | Opcode::Write | Opcode::Status)
}

/// Per-direction logging state: tracks the previous packet's type to
/// detect a chatty run, and how many packets that run has absorbed so far.
#[derive(Debug, Default)]
struct LogGate {
    previous: Option<Opcode>,
    run_len: u32,
}

impl LogGate {
    /// Called once per packet on this direction. Emits either an
    /// individual `Type=.., Size=.., Number=..` line, or — while inside a
    /// chatty run — nothing, until the run ends (a non-chatty packet
    /// arrives) or this gate is flushed, at which point the accumulated
    /// count is logged as a single line.
    fn observe(&mut self, direction: Direction, ty: Opcode, size: usize, number: u32) {
        if !log_enabled!(Level::Debug) {
            return;
        }

        if is_chatty(ty) {
            self.run_len += 1;
            self.previous = Some(ty);
            return;
        }

        self.flush(direction);
        self.previous = Some(ty);
        log::debug!(
            "{}: Type={ty}, Size={size}, Number={number}",
            direction.label()
        );
    }

    /// Emits the accumulated run count, if any, and resets it. Called
    /// before logging a non-chatty packet and when the channel is
    /// dropped, so a run at the end of a session isn't silently lost.
    fn flush(&mut self, direction: Direction) {
        if self.run_len > 0 {
            log::debug!(
                "{}: {} skipped READ/WRITE/STATUS packets.",
                direction.label(),
                self.run_len
            );
            self.run_len = 0;
        }
    }
}

impl Drop for LogGate {
    fn drop(&mut self) {
        // best-effort: direction is cosmetic here, Send is as good as any
        self.flush(Direction::Send);
    }
}

/// Frames packets onto a [`Transport`]: a 4-byte big-endian length prefix
/// followed by the packet bytes, in both directions.
pub struct Channel<T> {
    transport: T,
    send_gate: LogGate,
    recv_gate: LogGate,
}

impl<T: Transport> Channel<T> {
    pub fn new(transport: T) -> Self {
        Channel {
            transport,
            send_gate: LogGate::default(),
            recv_gate: LogGate::default(),
        }
    }

    /// Serializes and writes one packet, length-prefixed.
    pub async fn send(&mut self, packet: &Packet) -> Result<()> {
        let bytes = packet.as_bytes();
        let len = bytes.len() as u32;
        self.transport
            .write_all(&len.to_be_bytes())
            .await
            .map_err(Error::ConnectionLost)?;
        self.transport
            .write_all(bytes)
            .await
            .map_err(Error::ConnectionLost)?;
        self.transport.flush().await.map_err(Error::ConnectionLost)?;

        if let Some(ty) = packet.ty() {
            self.send_gate
                .observe(Direction::Send, ty, bytes.len(), packet.message_number());
        }
        Ok(())
    }

    /// Reads exactly one frame into `out`, which is reinitialized from the
    /// frame's bytes via `Packet::data_updated`.
    pub async fn receive(&mut self, out: &mut Packet) -> Result<()> {
        let mut len_buf = [0u8; 4];
        self.transport
            .read_exact(&mut len_buf)
            .await
            .map_err(Error::ConnectionLost)?;
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            return Err(Error::Protocol(ProtoError::FrameTooLarge {
                len,
                max: MAX_FRAME_LEN,
            }));
        }

        let mut buf = vec![0u8; len];
        self.transport
            .read_exact(&mut buf)
            .await
            .map_err(Error::ConnectionLost)?;

        out.data_updated(buf)?;
        if let Some(ty) = out.ty() {
            self.recv_gate
                .observe(Direction::Receive, ty, out.len(), out.message_number());
        }
        Ok(())
    }
}
