//! Directory recursion for upload and download, per spec.md §4.6.3.
//!
//! Upload recursion walks the local tree directly. Download recursion
//! walks the remote tree with [`crate::ops::read_directory`] rather than
//! deferring to an external "generic remote directory walker" — that
//! walker is the terminal's, an out-of-scope collaborator (spec.md §1),
//! and `Directory/File Operations` already gives this crate everything
//! the walk needs.

use std::path::Path;

use sftp_proto::{Attributes, Opcode, StatusCode};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::ops;
use crate::progress::{CopyParameters, OperationProgress, Prompter};
use crate::transfer::download::download_file;
use crate::transfer::upload::upload_file;
use crate::transport::Transport;

/// Recursively uploads `local_dir`'s contents into `target_dir`. The
/// matching remote directory is created first (tolerating "already
/// exists"); each child's failure is caught as a skip, the user is asked
/// to continue or abort via [`Prompter::acknowledge_failure`], and a `.`/
/// `..` entry never reaches this far since the walk comes from
/// `std::fs::read_dir`, which never yields them.
pub async fn upload_directory<T: Transport>(
    client: &mut Client<T>,
    local_dir: &Path,
    target_dir: &str,
    params: &CopyParameters,
    progress: &mut OperationProgress,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let name = local_dir.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "non-UTF-8 directory name",
        ))
    })?;
    let dest_name = (params.change_file_name_case)(name);
    let remote_dir = format!("{}/{}", target_dir.trim_end_matches('/'), dest_name);

    let mut attrs = Attributes::empty();
    if params.preserve_rights {
        if let Ok(meta) = tokio::fs::metadata(local_dir).await {
            use std::os::unix::fs::PermissionsExt;
            attrs.permissions = Some((params.remote_file_rights)(meta.permissions().mode()));
        }
    }
    // `MKDIR` on an already-existing remote directory fails; that's fine,
    // the `STAT` below is what actually confirms the directory is usable.
    let _ = ops::mkdir(client.session_mut(), &remote_dir, &attrs).await;
    if ops::stat(client.session_mut(), &remote_dir).await.is_err() {
        return Err(Error::Status {
            code: StatusCode::Failure,
            message: format!("could not create remote directory {remote_dir}"),
            language: String::new(),
            request_type: Opcode::Mkdir,
        });
    }

    let mut entries = tokio::fs::read_dir(local_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if progress.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let path = entry.path();
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy().into_owned();

        let child_result = if path.is_dir() {
            Box::pin(upload_directory(
                client,
                &path,
                &remote_dir,
                params,
                progress,
                prompter,
            ))
            .await
        } else {
            upload_file(client, &path, &remote_dir, params, progress, prompter).await
        };

        if let Err(err) = child_result {
            if matches!(err, Error::Cancelled) {
                return Err(err);
            }
            if prompter.acknowledge_failure(&file_name, &err.to_string()) {
                return Err(Error::Cancelled);
            }
        }
    }

    Ok(())
}

/// Recursively downloads the remote directory `remote_name` (a child of
/// `remote_dir`) into `local_parent`. Returns whether any child was
/// skipped, so a caller with `cpDelete` set can suppress deleting this
/// directory on the server if its contents weren't fully transferred, per
/// spec.md §4.6.3's "mark this directory skipped so its removal is
/// suppressed upstream".
pub async fn download_directory<T: Transport>(
    client: &mut Client<T>,
    remote_dir: &str,
    remote_name: &str,
    local_parent: &Path,
    params: &CopyParameters,
    progress: &mut OperationProgress,
    prompter: &mut dyn Prompter,
) -> Result<bool> {
    let dest_name = (params.change_file_name_case)(remote_name);
    let local_dir = local_parent.join(&dest_name);
    let full_remote = format!("{}/{}", remote_dir.trim_end_matches('/'), remote_name);

    if tokio::fs::metadata(&local_dir).await.is_err() {
        tokio::fs::create_dir(&local_dir).await?;
        if params.preserve_rights {
            if let Ok(attrs) = ops::stat(client.session_mut(), &full_remote).await {
                if let Some(perm) = attrs.permissions {
                    use std::os::unix::fs::PermissionsExt;
                    let _ = tokio::fs::set_permissions(
                        &local_dir,
                        std::fs::Permissions::from_mode(perm & 0o777),
                    )
                    .await;
                }
            }
        }
    }

    let dir_handle = ops::opendir(client.session_mut(), &full_remote).await?;
    let entries = ops::read_directory(client.session_mut(), &dir_handle).await?;
    let _ = ops::close(client.session_mut(), &dir_handle).await;

    let mut any_skipped = false;
    for entry in entries {
        if entry.name == "." || entry.name == ".." {
            continue;
        }
        if progress.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if entry.is_directory() {
            match Box::pin(download_directory(
                client,
                &full_remote,
                &entry.name,
                &local_dir,
                params,
                progress,
                prompter,
            ))
            .await
            {
                Ok(skipped) => any_skipped |= skipped,
                Err(err) if matches!(err, Error::Cancelled) => return Err(err),
                Err(err) => {
                    any_skipped = true;
                    if prompter.acknowledge_failure(&entry.name, &err.to_string()) {
                        return Err(Error::Cancelled);
                    }
                }
            }
            continue;
        }

        let result = download_file(
            client,
            &entry,
            &full_remote,
            &local_dir,
            params,
            progress,
            prompter,
            false,
        )
        .await;
        if let Err(err) = result {
            if matches!(err, Error::Cancelled) {
                return Err(err);
            }
            any_skipped = true;
            if prompter.acknowledge_failure(&entry.name, &err.to_string()) {
                return Err(Error::Cancelled);
            }
        }
    }

    if params.delete_source && !any_skipped {
        let _ = ops::rmdir(client.session_mut(), &full_remote).await;
    }

    Ok(any_skipped)
}
