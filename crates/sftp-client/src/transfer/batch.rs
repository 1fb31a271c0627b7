//! Batch entry points: `CopyToRemote`/`CopyToLocal` from spec.md §6's
//! "Engine API exposed". Each file or directory in the batch is
//! transferred in turn; a skip-file failure is caught, the batch
//! continues, and the failure's `Finish(name, success)` terminator is
//! collected rather than raised — only `Error::Cancelled` (an abort) or
//! a fatal protocol error unwinds the whole call.

use std::path::{Path, PathBuf};

use sftp_proto::RemoteFile;

use crate::client::Client;
use crate::error::Result;
use crate::ops;
use crate::progress::{CopyParameters, OperationProgress, Prompter};
use crate::transfer::recursion::{download_directory, upload_directory};
use crate::transfer::{download::download_file, upload::upload_file};
use crate::transport::Transport;

/// One entry's outcome: `Finish(name, success)` per spec.md §3's
/// `OperationProgress` terminator.
pub type Finish = (String, bool);

/// Uploads each of `files` into `target_dir`, recursing into local
/// directories. Stops and propagates on the first abort or fatal error;
/// every other per-file failure is recorded as `Finish(name, false)` and
/// the batch continues.
pub async fn copy_to_remote<T: Transport>(
    client: &mut Client<T>,
    files: &[PathBuf],
    target_dir: &str,
    params: &CopyParameters,
    progress: &mut OperationProgress,
    prompter: &mut dyn Prompter,
) -> Result<Vec<Finish>> {
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let outcome = if path.is_dir() {
            upload_directory(client, path, target_dir, params, progress, prompter).await
        } else {
            upload_file(client, path, target_dir, params, progress, prompter).await
        };

        match outcome {
            Ok(()) => results.push(progress.finish(true)),
            Err(crate::error::Error::Cancelled) => return Err(crate::error::Error::Cancelled),
            Err(_) => results.push(progress.finish(false)),
        }
    }

    Ok(results)
}

/// Downloads each of `files` (already listed or stat'd under
/// `remote_dir`) into `local_dir`, recursing into remote directories.
pub async fn copy_to_local<T: Transport>(
    client: &mut Client<T>,
    remote_dir: &str,
    files: &[RemoteFile],
    local_dir: &Path,
    params: &CopyParameters,
    progress: &mut OperationProgress,
    prompter: &mut dyn Prompter,
) -> Result<Vec<Finish>> {
    let mut results = Vec::with_capacity(files.len());

    for entry in files {
        if entry.name == "." || entry.name == ".." {
            continue;
        }

        let outcome = if entry.is_directory() {
            download_directory(
                client,
                remote_dir,
                &entry.name,
                local_dir,
                params,
                progress,
                prompter,
            )
            .await
            .map(|_skipped| ())
        } else {
            download_file(
                client, entry, remote_dir, local_dir, params, progress, prompter, false,
            )
            .await
        };

        match outcome {
            Ok(()) => results.push(progress.finish(true)),
            Err(crate::error::Error::Cancelled) => return Err(crate::error::Error::Cancelled),
            Err(_) => results.push(progress.finish(false)),
        }
    }

    Ok(results)
}

/// Fetches attributes for each remote name in `names` (relative to
/// `remote_dir`) so a caller building a [`RemoteFile`] list for
/// [`copy_to_local`] from bare path strings doesn't have to call
/// [`ops::stat`] itself for each one.
pub async fn stat_all<T: Transport>(
    client: &mut Client<T>,
    remote_dir: &str,
    names: &[String],
) -> Result<Vec<RemoteFile>> {
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let path = format!("{}/{}", remote_dir.trim_end_matches('/'), name);
        let attrs = ops::stat(client.session_mut(), &path).await?;
        out.push(RemoteFile {
            name: name.clone(),
            long_name: name.clone(),
            attrs,
            link_target: None,
            parent: None,
        });
    }
    Ok(out)
}
