//! `Sink`: downloads one remote file to local disk, per spec.md §4.6,
//! symmetric to [`crate::transfer::upload::upload_file`].

use std::path::{Path, PathBuf};

use filetime::FileTime;
use sftp_proto::RemoteFile;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt, SeekFrom};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::ops::{self, open_flags};
use crate::progress::{CopyParameters, OperationProgress, OverwriteAnswer, Prompter, ResumeAnswer};
use crate::transfer::{partial_name, EolConverter};
use crate::transport::Transport;

/// Downloads `remote`, a file already listed or stat'd under `remote_dir`,
/// into `local_dir`. `drag_drop` disables resume regardless of size or
/// transfer mode, per spec.md §4.6's `¬drag_drop ∧ binary ∧ AllowResume(size)`.
#[allow(clippy::too_many_arguments)]
pub async fn download_file<T: Transport>(
    client: &mut Client<T>,
    remote: &RemoteFile,
    remote_dir: &str,
    local_dir: &Path,
    params: &CopyParameters,
    progress: &mut OperationProgress,
    prompter: &mut dyn Prompter,
    drag_drop: bool,
) -> Result<()> {
    let remote_path = format!("{}/{}", remote_dir.trim_end_matches('/'), remote.name);
    let size = remote.size().unwrap_or(0);

    let dest_name = (params.change_file_name_case)(&remote.name);
    let dest: PathBuf = local_dir.join(&dest_name);
    let dest_str = dest
        .to_str()
        .ok_or_else(|| Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "non-UTF-8 destination path",
        )))?
        .to_string();

    let ascii = (params.use_ascii_transfer)(&remote.name);
    let wants_resume = !drag_drop && (params.allow_resume)(size);
    if ascii && wants_resume {
        // Mirrors upload_file's explicit rejection: the source asserts
        // ASCII+resume can't happen, spec.md §9 asks for a returned error
        // rather than an assertion.
        return Err(Error::AsciiResumeUnsupported);
    }
    let resumable = !ascii && wants_resume;

    progress.start_file(&remote.name, size, size);
    progress.ascii = ascii;

    let partial = partial_name(&dest_str, &params.partial_ext);
    let partial_path = PathBuf::from(&partial);

    let mut resume_offset: u64 = 0;
    let mut resuming = false;

    if resumable {
        if let Ok(meta) = tokio::fs::metadata(&partial_path).await {
            let partial_size = meta.len();
            let bigger_than_source = partial_size > size;
            let answer = prompter.confirm_resume(&remote.name, bigger_than_source);
            match answer {
                ResumeAnswer::Abort => return Err(Error::Cancelled),
                ResumeAnswer::Restart => {
                    let _ = tokio::fs::remove_file(&partial_path).await;
                }
                ResumeAnswer::Resume if !bigger_than_source => {
                    resume_offset = partial_size;
                    resuming = true;
                }
                ResumeAnswer::Resume => {
                    let _ = tokio::fs::remove_file(&partial_path).await;
                }
            }
        }
    }

    let open_path: &Path = if resumable { &partial_path } else { &dest };

    let destination_exists = !resuming && tokio::fs::metadata(&dest).await.is_ok();
    if destination_exists && params.confirm_overwriting && !resuming {
        if !confirm_overwrite(progress, prompter, &remote.name)? {
            return Err(Error::OverwriteDeclined);
        }
    }

    let mut open_opts = OpenOptions::new();
    open_opts.write(true).create(true);
    if !resuming {
        open_opts.truncate(true);
    }
    let mut local_file = open_opts.open(open_path).await?;

    if resuming {
        local_file.seek(SeekFrom::Start(resume_offset)).await?;
        progress.set_resumed(resume_offset);
    }

    let attrs = sftp_proto::Attributes::empty();
    let handle = ops::open(client.session_mut(), &remote_path, open_flags::READ, &attrs).await?;

    let result = run_transfer_loop(client, &handle, &mut local_file, progress, ascii, params).await;

    if params.preserve_time && result.is_ok() {
        if let (Some(atime), Some(mtime)) = (remote.attrs.atime, remote.attrs.mtime) {
            local_file.flush().await?;
            let path = open_path.to_path_buf();
            let _ = tokio::task::spawn_blocking(move || {
                filetime::set_file_times(
                    &path,
                    FileTime::from_unix_time(atime as i64, 0),
                    FileTime::from_unix_time(mtime as i64, 0),
                )
            })
            .await;
        }
    }

    drop(local_file);
    let _ = ops::close(client.session_mut(), &handle).await;

    if resumable {
        if result.is_ok() {
            let _ = tokio::fs::remove_file(&dest).await;
            tokio::fs::rename(&partial_path, &dest).await?;
        } else if !resuming {
            let _ = tokio::fs::remove_file(&partial_path).await;
        }
    } else if result.is_err() && !resuming {
        let _ = tokio::fs::remove_file(&dest).await;
    }

    result?;

    if params.delete_source {
        ops::remove(client.session_mut(), &remote_path).await?;
    }

    Ok(())
}

fn confirm_overwrite(
    progress: &mut OperationProgress,
    prompter: &mut dyn Prompter,
    name: &str,
) -> Result<bool> {
    if progress.yes_to_all {
        return Ok(true);
    }
    if progress.no_to_all {
        return Ok(false);
    }
    match prompter.confirm_overwrite(name) {
        OverwriteAnswer::NeverAskAgain | OverwriteAnswer::YesToAll => {
            progress.yes_to_all = true;
            Ok(true)
        }
        OverwriteAnswer::Yes => Ok(true),
        OverwriteAnswer::NoToAll => {
            progress.no_to_all = true;
            Ok(false)
        }
        OverwriteAnswer::No => Ok(false),
        OverwriteAnswer::Abort => Err(Error::Cancelled),
    }
}

async fn run_transfer_loop<T: Transport>(
    client: &mut Client<T>,
    handle: &ops::Handle,
    local_file: &mut tokio::fs::File,
    progress: &mut OperationProgress,
    ascii: bool,
    params: &CopyParameters,
) -> Result<()> {
    let block_size = progress.block_size();
    let mut offset = progress.transferred;
    let mut converter = EolConverter::new(params.session_eol, params.local_eol);

    loop {
        if progress.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let block = ops::read(client.session_mut(), handle, offset, block_size).await?;
        let Some(data) = block else {
            break;
        };
        if data.is_empty() {
            break;
        }

        let data_len = data.len() as u64;
        let chunk = if ascii { converter.convert(&data) } else { data };

        local_file.write_all(&chunk).await?;
        offset += data_len;
        // Tracked in remote bytes, matching `transfer_size` (set from the
        // remote file's own size), not the post-conversion local length —
        // otherwise an ASCII download never reaches 100%.
        progress.add_transferred(data_len);
    }

    if ascii {
        // Flushes a `\r` carried from the final block; it was already
        // counted in a prior `add_transferred` call, so only the local
        // write is still owed here.
        let tail = converter.finish();
        if !tail.is_empty() {
            local_file.write_all(&tail).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_name_matches_upload_convention() {
        assert_eq!(partial_name("/tmp/a.bin", ".filepart"), "/tmp/a.bin.filepart");
    }
}
