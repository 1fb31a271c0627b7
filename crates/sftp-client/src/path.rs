//! Canonicalization and home-directory lookup, per spec.md §4.4.
//!
//! `Canonify` never collapses `..` itself — that quirk is preserved
//! deliberately (spec.md §9) since the server's `REALPATH` reply is the
//! authority on what a path resolves to, not local string surgery.

use sftp_proto::{Opcode, RemoteFile};

use crate::error::{Error, Result};
use crate::ops;
use crate::session::Session;
use crate::transport::Transport;

pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Prepends `cwd` to `path` if it's relative. Does not normalize `.`/`..`
/// segments or collapse repeated slashes.
pub fn local_canonify(path: &str, cwd: &str) -> String {
    if is_absolute(path) || cwd.is_empty() {
        return path.to_string();
    }
    if cwd.ends_with('/') {
        format!("{cwd}{path}")
    } else {
        format!("{cwd}/{path}")
    }
}

/// Issues `REALPATH` and expects a `NAME` reply with exactly one entry.
/// Any other count is fatal, per spec.md §4.4 and the symlink-readback
/// boundary case in §8.
pub async fn real_path<T: Transport>(session: &mut Session<T>, path: &str) -> Result<String> {
    let mut request = session.new_request(Opcode::Realpath);
    request.put_str(path);
    let mut reply = session
        .roundtrip(&request, Opcode::Name, sftp_proto::AllowStatus::NONE)
        .await?;
    let entry: RemoteFile = RemoteFile::decode_single(&mut reply)?;
    Ok(entry.name)
}

fn is_connection_dead(err: &Error) -> bool {
    matches!(err, Error::ConnectionLost(_) | Error::Protocol(_))
}

/// Splits `path` into `(parent, leaf)` on the last `/`. `path` with no
/// slash has an empty parent.
fn split_leaf(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Best-effort canonicalization: try the whole path first; on failure with
/// a still-live session, retry on just the parent and reattach the leaf
/// (unless the leaf is `.`/`..`, which is returned unchanged); if that also
/// fails on a live session, give up and return the input path uncanonified.
pub async fn canonify<T: Transport>(session: &mut Session<T>, path: &str, cwd: &str) -> Result<String> {
    let local = local_canonify(path, cwd);

    match real_path(session, &local).await {
        Ok(resolved) => Ok(resolved),
        Err(err) if is_connection_dead(&err) => Err(err),
        Err(_) => {
            let (parent, leaf) = split_leaf(&local);
            if leaf == "." || leaf == ".." {
                return Ok(local);
            }
            match real_path(session, parent).await {
                Ok(resolved_parent) => Ok(local_canonify(leaf, &resolved_parent)),
                Err(err) if is_connection_dead(&err) => Err(err),
                Err(_) => Ok(local),
            }
        }
    }
}

/// Resolves the server's home directory, as `RealPath(".")`. Callers (the
/// top-level [`crate::client::Client`]) memoize this after the first call.
pub async fn home_directory<T: Transport>(session: &mut Session<T>) -> Result<String> {
    real_path(session, ".").await
}

/// Resolves `path` via `RealPath`, then probes it actually exists as a
/// directory with `OPENDIR` + `CLOSE` — some servers return a plausible
/// real path for a directory that doesn't exist, per spec.md §4.5.
pub async fn change_directory<T: Transport>(
    session: &mut Session<T>,
    path: &str,
    cwd: &str,
) -> Result<String> {
    let resolved = canonify(session, path, cwd).await?;
    let handle = ops::opendir(session, &resolved).await?;
    ops::close(session, &handle).await?;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_canonify_prepends_cwd_only_when_relative() {
        assert_eq!(local_canonify("/a/b", "/home/user"), "/a/b");
        assert_eq!(local_canonify("b", "/home/user"), "/home/user/b");
        assert_eq!(local_canonify("b", "/home/user/"), "/home/user/b");
    }

    #[test]
    fn split_leaf_handles_bare_names() {
        assert_eq!(split_leaf("/a/b/c"), ("/a/b", "c"));
        assert_eq!(split_leaf("c"), ("", "c"));
    }
}
