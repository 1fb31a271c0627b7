//! `Source`: uploads one local file to the server, per spec.md §4.6.

use std::os::unix::fs::MetadataExt;
use std::path::Path;

use sftp_proto::Attributes;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::ops::{self, open_flags, Handle};
use crate::progress::{CopyParameters, OperationProgress, OverwriteAnswer, Prompter, ResumeAnswer};
use crate::transfer::{convert_eol, partial_name};
use crate::transport::Transport;

/// Uploads `local_path` into `target_dir` on the server. Returns `Ok(())`
/// on success, `Err(Error::Cancelled)` if the user aborted, and any other
/// `Err` for a transfer failure the caller should treat as a skip-file per
/// spec.md §7 (the per-file/batch distinction is the caller's to make;
/// this function always runs exactly one file).
pub async fn upload_file<T: Transport>(
    client: &mut Client<T>,
    local_path: &Path,
    target_dir: &str,
    params: &CopyParameters,
    progress: &mut OperationProgress,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let name = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, "non-UTF-8 file name")))?
        .to_string();

    let mut local_file = tokio::fs::File::open(local_path).await?;
    let metadata = local_file.metadata().await?;
    let size = metadata.len();
    let atime = metadata.atime() as u32;
    let mtime = metadata.mtime() as u32;

    let dest_name = (params.change_file_name_case)(&name);
    let dest_full = client.canonify(&format!("{target_dir}/{dest_name}")).await.unwrap_or_else(|_| {
        format!("{}/{}", target_dir.trim_end_matches('/'), dest_name)
    });

    let ascii = (params.use_ascii_transfer)(&name);
    let wants_resume = (params.allow_resume)(size);
    if ascii && wants_resume {
        // spec.md §9: the source asserts an ASCII transfer combined with
        // resume can't happen; this reimplementation returns it as an
        // error instead of asserting.
        return Err(Error::AsciiResumeUnsupported);
    }
    let resumable = !ascii && wants_resume;

    progress.start_file(&name, size, size);
    progress.ascii = ascii;

    let partial = partial_name(&dest_full, &params.partial_ext);
    let mut resume_offset: u64 = 0;
    let mut resuming = false;

    if resumable {
        if let Ok(attrs) = ops::stat(client.session_mut(), &partial).await {
            let partial_size = attrs.size.unwrap_or(0);
            let bigger_than_source = partial_size > size;
            let answer = prompter.confirm_resume(&name, bigger_than_source);
            match answer {
                ResumeAnswer::Abort => return Err(Error::Cancelled),
                ResumeAnswer::Restart => {
                    let _ = ops::remove(client.session_mut(), &partial).await;
                }
                ResumeAnswer::Resume if !bigger_than_source => {
                    resume_offset = partial_size;
                    resuming = true;
                }
                ResumeAnswer::Resume => {
                    let _ = ops::remove(client.session_mut(), &partial).await;
                }
            }
        }
    }

    let open_target = if resumable { &partial } else { &dest_full };

    let destination_exists = !resuming
        && ops::stat(client.session_mut(), &dest_full).await.is_ok();
    let mut use_excl = params.confirm_overwriting && !progress.yes_to_all && !resuming;

    if destination_exists && params.confirm_overwriting && !progress.yes_to_all && !resuming {
        if !confirm_overwrite(progress, prompter, &name)? {
            return Err(Error::OverwriteDeclined);
        }
        // Already confirmed: don't also ask OPEN to enforce EXCL, or the
        // open fails on the file we were just told to overwrite and sends
        // us into the retry-probe branch below for a second prompt.
        use_excl = false;
    }

    let mut flags = open_flags::WRITE | open_flags::CREAT;
    if !resuming {
        flags |= open_flags::TRUNC;
    }
    if use_excl {
        flags |= open_flags::EXCL;
    }

    let mut attrs = Attributes::empty();
    if params.preserve_rights {
        attrs.permissions = Some((params.remote_file_rights)(0o644));
    }

    let handle = match ops::open(client.session_mut(), open_target, flags, &attrs).await {
        Ok(h) => h,
        Err(e @ Error::Status { .. }) if use_excl => {
            // Some other failure than "already exists" under EXCL: probe.
            if ops::stat(client.session_mut(), open_target).await.is_ok() {
                if !confirm_overwrite(progress, prompter, &name)? {
                    return Err(Error::OverwriteDeclined);
                }
                use_excl = false;
                let flags = flags & !open_flags::EXCL;
                ops::open(client.session_mut(), open_target, flags, &attrs).await?
            } else {
                return Err(e);
            }
        }
        Err(e) => return Err(e),
    };

    if resuming {
        local_file.seek(SeekFrom::Start(resume_offset)).await?;
        progress.set_resumed(resume_offset);
    }

    let result = run_transfer_loop(client, &handle, &mut local_file, progress, ascii, params).await;

    if resumable {
        if result.is_ok() {
            let _ = ops::remove(client.session_mut(), &dest_full).await;
            ops::rename(client.session_mut(), &partial, &dest_full).await?;
        } else if !resuming {
            let _ = ops::remove(client.session_mut(), &partial).await;
        }
    } else if result.is_err() && !resuming {
        // Resume disallowed and the transfer failed partway through:
        // don't leave a truncated file at the destination, mirroring
        // download_file's symmetric cleanup.
        let _ = ops::remove(client.session_mut(), open_target).await;
    }

    let _ = ops::close(client.session_mut(), &handle).await;
    result?;

    if params.preserve_time {
        let mut time_attrs = Attributes::empty();
        time_attrs.atime = Some(atime);
        time_attrs.mtime = Some(mtime);
        ops::setstat(client.session_mut(), &dest_full, &time_attrs).await?;
    }

    if params.delete_source {
        tokio::fs::remove_file(local_path).await?;
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
    handle: &Handle,
    local_file: &mut tokio::fs::File,
    progress: &mut OperationProgress,
    ascii: bool,
    params: &CopyParameters,
) -> Result<()> {
    let block_size = progress.block_size() as usize;
    let mut buf = vec![0u8; block_size];
    let mut offset = progress.transferred;

    loop {
        if progress.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let n = local_file.read(&mut buf).await?;
        if n == 0 {
            break;
        }

        let chunk = if ascii {
            convert_eol(&buf[..n], params.local_eol, params.session_eol)
        } else {
            buf[..n].to_vec()
        };

        // `transfer_size` started out as the local (pre-conversion) file
        // size; nudge it by this block's delta so it settles on the total
        // remote byte count, matching what `transferred` below counts.
        let delta = chunk.len() as i64 - n as i64;
        if delta != 0 {
            progress.transfer_size = (progress.transfer_size as i64 + delta).max(0) as u64;
        }

        ops::write(client.session_mut(), handle, offset, &chunk).await?;
        offset += chunk.len() as u64;
        progress.add_transferred(chunk.len() as u64);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::EolStyle;

    #[test]
    fn partial_name_appends_suffix() {
        assert_eq!(partial_name("/home/u/a.bin", ".filepart"), "/home/u/a.bin.filepart");
    }

    #[test]
    fn ascii_plus_resume_is_rejected_before_any_io() {
        // exercised indirectly through upload_file's early return; this
        // guards the eol conversion helper stays total over both styles
        let out = convert_eol(b"x\r\n", EolStyle::CrLf, EolStyle::Lf);
        assert_eq!(out, b"x\n");
    }
}
