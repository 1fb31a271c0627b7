//! Wires a spawned `ssh -s sftp` child process's stdio to
//! [`sftp_client::transport::Transport`], the same pattern
//! `openssh`/`ssh2-rs` use to keep the SSH transport out of the SFTP
//! client crate itself (see SPEC_FULL.md §1).

use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Joins a child process's stdout (read side) and stdin (write side)
/// into a single duplex stream. Both halves are already `Unpin`, so this
/// type is too — no projection pin-crate needed.
pub struct ChildIo {
    stdout: ChildStdout,
    stdin: ChildStdin,
    // Kept alive so the child isn't reaped (and the pipes aren't closed)
    // while this transport is still in use.
    _child: Child,
}

impl ChildIo {
    /// Spawns `ssh <destination> -s sftp` and hands back its stdio as a
    /// transport. `ssh_path` lets a caller point at a non-default `ssh`
    /// binary; `extra_args` are inserted before the destination (e.g.
    /// `-p <port>`, `-i <identity>`).
    pub fn spawn(ssh_path: &str, destination: &str, extra_args: &[String]) -> io::Result<Self> {
        let mut command = Command::new(ssh_path);
        command
            .args(extra_args)
            .arg(destination)
            .arg("-s")
            .arg("sftp")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        Ok(ChildIo {
            stdout,
            stdin,
            _child: child,
        })
    }
}

impl AsyncRead for ChildIo {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

impl AsyncWrite for ChildIo {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stdin).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdin).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdin).poll_shutdown(cx)
    }
}
