//! A scripted in-memory server for exercising [`crate::session::Session`]
//! and the operations built on it without a real SFTP server.

use sftp_proto::{Attributes, Opcode, PROTOCOL_VERSION, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::client::Client;
use crate::error::Result;
use crate::session::Session;

/// One canned reply: the background task reads the next request frame off
/// the wire, copies its message number, and writes this reply back with
/// that number stamped in.
pub struct ScriptedReply {
    opcode: Opcode,
    body: Vec<u8>,
}

impl ScriptedReply {
    pub fn status(code: StatusCode) -> Self {
        let mut body = code.code().to_be_bytes().to_vec();
        body.extend(encode_str(""));
        body.extend(encode_str(""));
        ScriptedReply {
            opcode: Opcode::Status,
            body,
        }
    }

    pub fn handle(bytes: &[u8]) -> Self {
        ScriptedReply {
            opcode: Opcode::Handle,
            body: encode_str_bytes(bytes),
        }
    }

    pub fn data(bytes: &[u8]) -> Self {
        ScriptedReply {
            opcode: Opcode::Data,
            body: encode_str_bytes(bytes),
        }
    }

    /// A `NAME` reply carrying exactly one entry with an empty attributes
    /// block, the shape `REALPATH` and `READLINK` replies use.
    pub fn name_single(name: &str) -> Self {
        let mut body = 1u32.to_be_bytes().to_vec();
        body.extend(encode_str(name));
        body.extend(encode_str(name));
        body.extend(0u32.to_be_bytes()); // empty ATTRS flag word
        ScriptedReply {
            opcode: Opcode::Name,
            body,
        }
    }

    /// A `NAME` reply carrying one entry per name in `names`, the shape a
    /// `READDIR` batch uses; every entry gets an empty attributes block.
    pub fn name_listing(names: &[&str]) -> Self {
        let mut body = (names.len() as u32).to_be_bytes().to_vec();
        for name in names {
            body.extend(encode_str(name));
            body.extend(encode_str(name));
            body.extend(0u32.to_be_bytes());
        }
        ScriptedReply {
            opcode: Opcode::Name,
            body,
        }
    }

    /// An `ATTRS` reply.
    pub fn attrs(attrs: &Attributes) -> Self {
        let mut counter = sftp_proto::MessageCounter::new();
        let mut scratch = sftp_proto::Packet::for_request(Opcode::Attrs, &mut counter);
        attrs.encode(&mut scratch);
        ScriptedReply {
            opcode: Opcode::Attrs,
            body: scratch.content().to_vec(),
        }
    }
}

fn encode_str(s: &str) -> Vec<u8> {
    encode_str_bytes(s.as_bytes())
}

fn encode_str_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = (bytes.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(bytes);
    out
}

/// Spawns a background task that plays back `replies` in order, one per
/// request frame it reads, and returns a [`Session`] wired to the other
/// end of an in-memory duplex pipe.
pub fn scripted_session(replies: Vec<ScriptedReply>) -> Session<tokio::io::DuplexStream> {
    let (client_io, mut server_io) = tokio::io::duplex(64 * 1024);

    tokio::spawn(async move {
        for reply in replies {
            let mut len_buf = [0u8; 4];
            if server_io.read_exact(&mut len_buf).await.is_err() {
                return;
            }
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut request = vec![0u8; len];
            if server_io.read_exact(&mut request).await.is_err() {
                return;
            }

            // request[0] = opcode, request[1..5] = message number
            let number = &request[1..5];
            let mut out = Vec::with_capacity(5 + reply.body.len());
            out.push(reply.opcode as u8);
            out.extend_from_slice(number);
            out.extend_from_slice(&reply.body);

            let out_len = (out.len() as u32).to_be_bytes();
            if server_io.write_all(&out_len).await.is_err() {
                return;
            }
            if server_io.write_all(&out).await.is_err() {
                return;
            }
            let _ = server_io.flush().await;
        }
    });

    Session::new(client_io)
}

/// Completes the `INIT`/`VERSION`/home-directory handshake as
/// [`crate::client::Client::connect`] expects — replying `server_version`
/// and `home` — then falls into the same scripted playback
/// [`scripted_session`] uses for `replies`, and returns the connected
/// client wired to the other end of an in-memory duplex pipe.
pub async fn scripted_client(
    server_version: u32,
    home: &str,
    replies: Vec<ScriptedReply>,
) -> Result<Client<tokio::io::DuplexStream>> {
    let (client_io, mut server_io) = tokio::io::duplex(64 * 1024);

    tokio::spawn(async move {
        // INIT has no message number: just the opcode and the proposed
        // version. Consume it and answer VERSION, which likewise carries
        // none.
        let mut len_buf = [0u8; 4];
        if server_io.read_exact(&mut len_buf).await.is_err() {
            return;
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut init = vec![0u8; len];
        if server_io.read_exact(&mut init).await.is_err() {
            return;
        }

        let mut version_reply = vec![Opcode::Version as u8];
        version_reply.extend(server_version.to_be_bytes());
        let version_len = (version_reply.len() as u32).to_be_bytes();
        if server_io.write_all(&version_len).await.is_err() {
            return;
        }
        if server_io.write_all(&version_reply).await.is_err() {
            return;
        }
        let _ = server_io.flush().await;

        if server_version != PROTOCOL_VERSION {
            // `Client::connect` bails out on the version mismatch before
            // issuing `RealPath(".")`; nothing more to serve.
            return;
        }

        // `RealPath(".")`, home-directory lookup: carries a message
        // number like every other post-handshake request, so it's served
        // exactly like the generic loop below.
        let mut len_buf = [0u8; 4];
        if server_io.read_exact(&mut len_buf).await.is_err() {
            return;
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut request = vec![0u8; len];
        if server_io.read_exact(&mut request).await.is_err() {
            return;
        }
        let number = request[1..5].to_vec();
        let home_reply = ScriptedReply::name_single(home);
        let mut out = Vec::with_capacity(5 + home_reply.body.len());
        out.push(home_reply.opcode as u8);
        out.extend_from_slice(&number);
        out.extend_from_slice(&home_reply.body);
        let out_len = (out.len() as u32).to_be_bytes();
        if server_io.write_all(&out_len).await.is_err() {
            return;
        }
        if server_io.write_all(&out).await.is_err() {
            return;
        }
        let _ = server_io.flush().await;

        for reply in replies {
            let mut len_buf = [0u8; 4];
            if server_io.read_exact(&mut len_buf).await.is_err() {
                return;
            }
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut request = vec![0u8; len];
            if server_io.read_exact(&mut request).await.is_err() {
                return;
            }

            let number = &request[1..5];
            let mut out = Vec::with_capacity(5 + reply.body.len());
            out.push(reply.opcode as u8);
            out.extend_from_slice(number);
            out.extend_from_slice(&reply.body);

            let out_len = (out.len() as u32).to_be_bytes();
            if server_io.write_all(&out_len).await.is_err() {
                return;
            }
            if server_io.write_all(&out).await.is_err() {
                return;
            }
            let _ = server_io.flush().await;
        }
    });

    Client::connect(client_io).await
}
