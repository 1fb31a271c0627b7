//! Directory/file operations: the request/reply pairs tabulated in
//! spec.md §4.5, plus the two scripted multi-request sequences
//! (`ReadDirectory`'s pipelined `READDIR`, `ReadSymlink`'s paired
//! `READLINK`+`STAT`).

use sftp_proto::{AllowStatus, Attributes, Opcode, RemoteFile};

use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::Transport;

/// `SSH_FXF_*` open flags, OR'd into the `OPEN` request's flag word.
pub mod open_flags {
    pub const READ: u32 = 0x0000_0001;
    pub const WRITE: u32 = 0x0000_0002;
    pub const APPEND: u32 = 0x0000_0004;
    pub const CREAT: u32 = 0x0000_0008;
    pub const TRUNC: u32 = 0x0000_0010;
    pub const EXCL: u32 = 0x0000_0020;
}

/// An opaque server-issued handle, naming an open remote file or
/// directory. Treated as a byte string by this client, per the GLOSSARY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle(pub Vec<u8>);

async fn status_only<T: Transport>(
    session: &mut Session<T>,
    ty: Opcode,
    body: impl FnOnce(&mut sftp_proto::Packet),
) -> Result<()> {
    let mut request = session.new_request(ty);
    body(&mut request);
    session
        .roundtrip(&request, Opcode::Status, AllowStatus::OK)
        .await?;
    Ok(())
}

async fn handle_reply<T: Transport>(
    session: &mut Session<T>,
    ty: Opcode,
    body: impl FnOnce(&mut sftp_proto::Packet),
) -> Result<Handle> {
    let mut request = session.new_request(ty);
    body(&mut request);
    let mut reply = session
        .roundtrip(&request, Opcode::Handle, AllowStatus::NONE)
        .await?;
    Ok(Handle(reply.get_bytes()?))
}

async fn attrs_reply<T: Transport>(
    session: &mut Session<T>,
    ty: Opcode,
    body: impl FnOnce(&mut sftp_proto::Packet),
) -> Result<Attributes> {
    let mut request = session.new_request(ty);
    body(&mut request);
    let mut reply = session
        .roundtrip(&request, Opcode::Attrs, AllowStatus::NONE)
        .await?;
    Ok(Attributes::decode(&mut reply)?)
}

pub async fn stat<T: Transport>(session: &mut Session<T>, path: &str) -> Result<Attributes> {
    attrs_reply(session, Opcode::Stat, |p| p.put_str(path)).await
}

pub async fn lstat<T: Transport>(session: &mut Session<T>, path: &str) -> Result<Attributes> {
    attrs_reply(session, Opcode::Lstat, |p| p.put_str(path)).await
}

pub async fn fstat<T: Transport>(session: &mut Session<T>, handle: &Handle) -> Result<Attributes> {
    attrs_reply(session, Opcode::Fstat, |p| p.put_bytes(&handle.0)).await
}

pub async fn setstat<T: Transport>(
    session: &mut Session<T>,
    path: &str,
    attrs: &Attributes,
) -> Result<()> {
    status_only(session, Opcode::Setstat, |p| {
        p.put_str(path);
        attrs.encode(p);
    })
    .await
}

pub async fn fsetstat<T: Transport>(
    session: &mut Session<T>,
    handle: &Handle,
    attrs: &Attributes,
) -> Result<()> {
    status_only(session, Opcode::Fsetstat, |p| {
        p.put_bytes(&handle.0);
        attrs.encode(p);
    })
    .await
}

pub async fn opendir<T: Transport>(session: &mut Session<T>, path: &str) -> Result<Handle> {
    handle_reply(session, Opcode::Opendir, |p| p.put_str(path)).await
}

pub async fn open<T: Transport>(
    session: &mut Session<T>,
    path: &str,
    flags: u32,
    attrs: &Attributes,
) -> Result<Handle> {
    handle_reply(session, Opcode::Open, |p| {
        p.put_str(path);
        p.put_u32(flags);
        attrs.encode(p);
    })
    .await
}

pub async fn close<T: Transport>(session: &mut Session<T>, handle: &Handle) -> Result<()> {
    status_only(session, Opcode::Close, |p| p.put_bytes(&handle.0)).await
}

pub async fn remove<T: Transport>(session: &mut Session<T>, path: &str) -> Result<()> {
    status_only(session, Opcode::Remove, |p| p.put_str(path)).await
}

pub async fn rmdir<T: Transport>(session: &mut Session<T>, path: &str) -> Result<()> {
    status_only(session, Opcode::Rmdir, |p| p.put_str(path)).await
}

pub async fn mkdir<T: Transport>(
    session: &mut Session<T>,
    path: &str,
    attrs: &Attributes,
) -> Result<()> {
    status_only(session, Opcode::Mkdir, |p| {
        p.put_str(path);
        attrs.encode(p);
    })
    .await
}

pub async fn rename<T: Transport>(session: &mut Session<T>, old: &str, new: &str) -> Result<()> {
    status_only(session, Opcode::Rename, |p| {
        p.put_str(old);
        p.put_str(new);
    })
    .await
}

/// Only symbolic links are supported; hardlinks are rejected before any
/// request is sent, per spec.md §4.5's `CreateLink`.
pub async fn symlink<T: Transport>(
    session: &mut Session<T>,
    target: &str,
    link_path: &str,
    hard: bool,
) -> Result<()> {
    if hard {
        return Err(Error::HardlinkUnsupported);
    }
    status_only(session, Opcode::Symlink, |p| {
        p.put_str(target);
        p.put_str(link_path);
    })
    .await
}

pub async fn write<T: Transport>(
    session: &mut Session<T>,
    handle: &Handle,
    offset: u64,
    data: &[u8],
) -> Result<()> {
    status_only(session, Opcode::Write, |p| {
        p.put_bytes(&handle.0);
        p.put_i64(offset as i64);
        p.put_bytes(data);
    })
    .await
}

/// One `READ` call. `None` means the server replied `STATUS=EOF`.
pub async fn read<T: Transport>(
    session: &mut Session<T>,
    handle: &Handle,
    offset: u64,
    length: u32,
) -> Result<Option<Vec<u8>>> {
    let mut request = session.new_request(Opcode::Read);
    request.put_bytes(&handle.0);
    request.put_i64(offset as i64);
    request.put_u32(length);

    let mut reply = session
        .roundtrip(&request, Opcode::Data, AllowStatus::EOF)
        .await?;
    if reply.ty() != Some(Opcode::Data) {
        return Ok(None);
    }
    Ok(Some(reply.get_bytes()?))
}

/// One `READDIR` call. `None` means the server replied `STATUS=EOF` and
/// the listing is complete.
async fn readdir_batch<T: Transport>(
    session: &mut Session<T>,
    handle: &Handle,
) -> Result<Option<Vec<RemoteFile>>> {
    let mut request = session.new_request(Opcode::Readdir);
    request.put_bytes(&handle.0);

    let mut reply = session
        .roundtrip(&request, Opcode::Name, AllowStatus::EOF)
        .await?;
    if reply.ty() != Some(Opcode::Name) {
        return Ok(None);
    }
    Ok(Some(RemoteFile::decode_listing(&mut reply, None)?))
}

/// Reads a complete directory listing, keeping exactly one `READDIR`
/// outstanding at all times: as soon as batch N arrives, batch N+1's
/// request is sent and reserved before batch N is parsed, per spec.md
/// §4.5 and the pipelining property in §8.
pub async fn read_directory<T: Transport>(
    session: &mut Session<T>,
    handle: &Handle,
) -> Result<Vec<RemoteFile>> {
    let mut entries = Vec::new();

    let mut pending_request = session.new_request(Opcode::Readdir);
    pending_request.put_bytes(&handle.0);
    session.reserve(&pending_request);
    session.send(&pending_request).await?;

    loop {
        // `receive_response` always resolves and removes `pending_request`'s
        // reservation before returning, whether the reply was read directly
        // or collected earlier by another call — there is never a leftover
        // reservation here to unreserve.
        let mut reply = session
            .receive_response(&pending_request, Opcode::Name, AllowStatus::EOF)
            .await?;

        if reply.ty() != Some(Opcode::Name) {
            break;
        }

        let mut next_request = session.new_request(Opcode::Readdir);
        next_request.put_bytes(&handle.0);
        session.reserve(&next_request);
        session.send(&next_request).await?;

        entries.extend(RemoteFile::decode_listing(&mut reply, None)?);

        pending_request = next_request;
    }

    Ok(entries)
}

/// Pipelines `READLINK` and `STAT` on the same name and consumes both in
/// order, combining the link target with the target's own attributes.
pub async fn read_symlink<T: Transport>(
    session: &mut Session<T>,
    path: &str,
) -> Result<RemoteFile> {
    let mut readlink_request = session.new_request(Opcode::Readlink);
    readlink_request.put_str(path);
    session.reserve(&readlink_request);
    session.send(&readlink_request).await?;

    // Reserved so an out-of-order `STAT` reply (arriving before `READLINK`'s)
    // is stashed rather than rejected as unexpected.
    let mut stat_request = session.new_request(Opcode::Stat);
    stat_request.put_str(path);
    session.reserve(&stat_request);
    session.send(&stat_request).await?;

    // `receive_response` always resolves and removes each request's
    // reservation before returning; there's nothing left to unreserve.
    let mut readlink_reply = session
        .receive_response(&readlink_request, Opcode::Name, AllowStatus::NONE)
        .await?;
    let target = RemoteFile::decode_single(&mut readlink_reply)?;

    let mut stat_reply = session
        .receive_response(&stat_request, Opcode::Attrs, AllowStatus::NONE)
        .await?;
    let attrs = Attributes::decode(&mut stat_reply)?;

    Ok(RemoteFile {
        name: target.name.clone(),
        long_name: target.long_name,
        attrs,
        link_target: Some(target.name),
        parent: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scripted_session, ScriptedReply};
    use sftp_proto::StatusCode;

    #[tokio::test]
    async fn readdir_eof_on_empty_reply_surfaces_as_none() {
        let mut session = scripted_session(vec![ScriptedReply::status(StatusCode::Eof)]);
        let handle = Handle(b"h".to_vec());
        let batch = readdir_batch(&mut session, &handle).await.unwrap();
        assert!(batch.is_none());
    }

    #[tokio::test]
    async fn hardlink_is_rejected_before_any_request() {
        let mut session = scripted_session(vec![]);
        let err = symlink(&mut session, "target", "link", true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HardlinkUnsupported));
    }
}
