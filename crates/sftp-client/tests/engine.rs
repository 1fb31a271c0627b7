//! Engine-scenario integration tests, per spec.md §8: the scripted-server
//! scenarios a unit test inside the crate can't reach (full `Client`
//! handshakes, multi-request pipelining, and the transfer engine's
//! resume/overwrite decision points), driven through the public API the
//! way a real caller would use it.

use sftp_proto::{Attributes, StatusCode};
use sftp_client::ops::{self, Handle};
use sftp_client::progress::{
    CopyParameters, OperationProgress, OverwriteAnswer, Prompter, ResumeAnswer,
};
use sftp_client::test_support::{scripted_client, scripted_session, ScriptedReply};
use sftp_client::transfer::{download_file, upload_file};
use sftp_client::{Error, EngineOutcome};

/// A [`Prompter`] whose answers are fixed in advance, for scenarios that
/// need a specific overwrite/resume decision rather than always "yes".
struct ScriptedPrompter {
    overwrite: OverwriteAnswer,
    resume: ResumeAnswer,
}

impl Prompter for ScriptedPrompter {
    fn confirm_overwrite(&mut self, _name: &str) -> OverwriteAnswer {
        self.overwrite
    }

    fn confirm_resume(&mut self, _name: &str, _partial_bigger_than_source: bool) -> ResumeAnswer {
        self.resume
    }

    fn acknowledge_failure(&mut self, _name: &str, _message: &str) -> bool {
        false
    }
}

fn temp_subdir(case: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "sftp-client-engine-test-{case}-{}",
        std::process::id()
    ));
    dir
}

async fn fresh_dir(case: &str) -> std::path::PathBuf {
    let dir = temp_subdir(case);
    let _ = tokio::fs::remove_dir_all(&dir).await;
    tokio::fs::create_dir_all(&dir).await.unwrap();
    dir
}

/// Uploading a file that exists nowhere on the server: both `RealPath`
/// canonicalization attempts report `NoSuchFile` (so the engine falls back
/// to the locally-built path), the destination doesn't exist either, and
/// the whole file goes out in a single block.
#[tokio::test]
async fn upload_new_file_succeeds_with_no_prior_destination() {
    let local_dir = fresh_dir("upload-new").await;
    let local_path = local_dir.join("greeting.txt");
    tokio::fs::write(&local_path, b"hello").await.unwrap();

    let mut client = scripted_client(
        3,
        "/home/test",
        vec![
            ScriptedReply::status(StatusCode::NoSuchFile), // RealPath(full)
            ScriptedReply::status(StatusCode::NoSuchFile), // RealPath(parent)
            ScriptedReply::status(StatusCode::NoSuchFile), // Stat(dest) -> doesn't exist
            ScriptedReply::handle(b"h1"),                  // Open
            ScriptedReply::status(StatusCode::Ok),         // Write
            ScriptedReply::status(StatusCode::Ok),         // Close
            ScriptedReply::status(StatusCode::Ok),         // Setstat (preserve_time)
        ],
    )
    .await
    .unwrap();

    let mut params = CopyParameters::default();
    params.allow_resume = Box::new(|_size| false);
    let mut progress = OperationProgress::default();
    let mut prompter = ScriptedPrompter {
        overwrite: OverwriteAnswer::Yes,
        resume: ResumeAnswer::Resume,
    };

    upload_file(&mut client, &local_path, "/remote/dir", &params, &mut progress, &mut prompter)
        .await
        .unwrap();

    assert_eq!(progress.transferred, 5);
}

/// A destination that already exists and a prompter that says "no": the
/// engine returns [`Error::Cancelled`] without ever issuing `Open`.
#[tokio::test]
async fn upload_overwrite_prompt_decline_cancels_before_opening() {
    let local_dir = fresh_dir("upload-overwrite").await;
    let local_path = local_dir.join("greeting.txt");
    tokio::fs::write(&local_path, b"hello").await.unwrap();

    let mut client = scripted_client(
        3,
        "/home/test",
        vec![
            ScriptedReply::status(StatusCode::NoSuchFile), // RealPath(full)
            ScriptedReply::status(StatusCode::NoSuchFile), // RealPath(parent)
            ScriptedReply::attrs(&{
                let mut a = Attributes::empty();
                a.size = Some(1);
                a
            }), // Stat(dest) -> exists
        ],
    )
    .await
    .unwrap();

    let params = CopyParameters::default();
    let mut progress = OperationProgress::default();
    let mut prompter = ScriptedPrompter {
        overwrite: OverwriteAnswer::No,
        resume: ResumeAnswer::Resume,
    };

    let err = upload_file(&mut client, &local_path, "/remote/dir", &params, &mut progress, &mut prompter)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

/// A partial file smaller than the source and a prompter that says
/// "resume": the engine seeks past the already-transferred bytes, writes
/// only the remainder, and renames the partial into place.
#[tokio::test]
async fn upload_resumes_from_an_existing_partial_file() {
    let local_dir = fresh_dir("upload-resume").await;
    let local_path = local_dir.join("big.bin");
    tokio::fs::write(&local_path, b"HelloWorld").await.unwrap(); // 10 bytes

    let mut client = scripted_client(
        3,
        "/home/test",
        vec![
            ScriptedReply::status(StatusCode::NoSuchFile), // RealPath(full)
            ScriptedReply::status(StatusCode::NoSuchFile), // RealPath(parent)
            ScriptedReply::attrs(&{
                let mut a = Attributes::empty();
                a.size = Some(3); // partial already has 3 bytes
                a
            }), // Stat(partial)
            ScriptedReply::handle(b"h1"),                    // Open(partial)
            ScriptedReply::status(StatusCode::Ok),           // Write(remaining 7 bytes)
            ScriptedReply::status(StatusCode::NoSuchFile),   // Remove(dest) best-effort, ignored
            ScriptedReply::status(StatusCode::Ok),           // Rename(partial -> dest)
            ScriptedReply::status(StatusCode::Ok),           // Close
            ScriptedReply::status(StatusCode::Ok),           // Setstat (preserve_time)
        ],
    )
    .await
    .unwrap();

    let mut params = CopyParameters::default();
    params.allow_resume = Box::new(|_size| true);
    let mut progress = OperationProgress::default();
    let mut prompter = ScriptedPrompter {
        overwrite: OverwriteAnswer::Yes,
        resume: ResumeAnswer::Resume,
    };

    upload_file(&mut client, &local_path, "/remote/dir", &params, &mut progress, &mut prompter)
        .await
        .unwrap();

    assert!(progress.resuming);
    assert_eq!(progress.resumed, 3);
    assert_eq!(progress.transferred, 10);
}

/// Downloading a file that ends after one `DATA` block: the second `READ`
/// comes back as `STATUS=EOF`, which the engine reads as "stop", not as an
/// error.
#[tokio::test]
async fn download_stops_cleanly_on_eof() {
    let local_dir = fresh_dir("download-eof").await;

    let mut client = scripted_client(
        3,
        "/home/test",
        vec![
            ScriptedReply::handle(b"h1"),          // Open
            ScriptedReply::data(b"hello"),         // Read #1
            ScriptedReply::status(StatusCode::Eof), // Read #2 -> EOF
            ScriptedReply::status(StatusCode::Ok),  // Close
        ],
    )
    .await
    .unwrap();

    let mut attrs = Attributes::empty();
    attrs.size = Some(5);
    attrs.atime = Some(1_700_000_000);
    attrs.mtime = Some(1_700_000_100);
    let remote = sftp_proto::RemoteFile {
        name: "greeting.txt".to_string(),
        long_name: "greeting.txt".to_string(),
        attrs,
        link_target: None,
        parent: None,
    };

    let params = CopyParameters::default();
    let mut progress = OperationProgress::default();
    let mut prompter = ScriptedPrompter {
        overwrite: OverwriteAnswer::Yes,
        resume: ResumeAnswer::Resume,
    };

    download_file(&mut client, &remote, "/remote/dir", &local_dir, &params, &mut progress, &mut prompter, false)
        .await
        .unwrap();

    let written = tokio::fs::read(local_dir.join("greeting.txt")).await.unwrap();
    assert_eq!(written, b"hello");
    assert_eq!(progress.transferred, 5);
}

/// `READDIR` pipelining: the engine keeps exactly one request outstanding
/// at a time, decoding each batch only after the next request is already
/// in flight, and stops on the first non-`NAME` reply.
#[tokio::test]
async fn read_directory_pipelines_batches_until_eof() {
    let mut session = scripted_session(vec![
        ScriptedReply::name_listing(&[".", ".."]),
        ScriptedReply::name_listing(&["a.txt"]),
        ScriptedReply::status(StatusCode::Eof),
    ]);

    let handle = Handle(b"dir-handle".to_vec());
    let entries = ops::read_directory(&mut session, &handle).await.unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].name, "a.txt");
}

/// Symlink readback pairs a `READLINK` (the target name) with a `STAT`
/// (the target's own attributes), pipelined on the same path, and combines
/// them into one [`sftp_proto::RemoteFile`].
#[tokio::test]
async fn read_symlink_combines_readlink_and_stat() {
    let mut attrs = Attributes::empty();
    attrs.size = Some(42);
    let mut session = scripted_session(vec![
        ScriptedReply::name_single("/targets/real-file"),
        ScriptedReply::attrs(&attrs),
    ]);

    let resolved = ops::read_symlink(&mut session, "/links/alias").await.unwrap();

    assert_eq!(resolved.link_target.as_deref(), Some("/targets/real-file"));
    assert_eq!(resolved.size(), Some(42));
}

/// A `VERSION` reply outside `[3, 3]` is a fatal, unrecoverable error —
/// the handshake never reaches the home-directory lookup.
#[tokio::test]
async fn connect_rejects_a_version_outside_the_supported_range() {
    let err = scripted_client(4, "/home/test", vec![]).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedVersion(4)));
}

/// A reply whose message number doesn't match the request currently being
/// awaited, and isn't reserved by anything else, is a fatal protocol
/// violation: the correlator has lost track of the request stream.
#[tokio::test]
async fn unexpected_message_number_is_fatal() {
    use sftp_client::session::Session;
    use sftp_proto::Opcode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (client_io, mut server_io) = tokio::io::duplex(64 * 1024);

    tokio::spawn(async move {
        let mut len_buf = [0u8; 4];
        if server_io.read_exact(&mut len_buf).await.is_err() {
            return;
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut request = vec![0u8; len];
        let _ = server_io.read_exact(&mut request).await;

        // Reply with a well-formed ATTRS frame, but stamped with a message
        // number nothing requested.
        let bogus_number: u32 = 0xDEAD_BEEF;
        let mut out = vec![Opcode::Attrs as u8];
        out.extend(bogus_number.to_be_bytes());
        out.extend(0u32.to_be_bytes()); // empty ATTRS flags
        let out_len = (out.len() as u32).to_be_bytes();
        let _ = server_io.write_all(&out_len).await;
        let _ = server_io.write_all(&out).await;
        let _ = server_io.flush().await;
    });

    let mut session = Session::new(client_io);
    let err = ops::stat(&mut session, "/anywhere").await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedReply(0xDEAD_BEEF)));
}

/// [`EngineOutcome`] maps a cancellation to `Abort` and any other error to
/// `Fatal`, replacing the source's exception-based control flow, per
/// spec.md §9.
#[test]
fn engine_outcome_distinguishes_abort_from_fatal() {
    let cancelled: EngineOutcome<()> = Err(Error::Cancelled).into();
    assert!(cancelled.is_terminal());
    assert!(matches!(cancelled, EngineOutcome::Abort));

    let fatal: EngineOutcome<()> = Err(Error::HardlinkUnsupported).into();
    assert!(matches!(fatal, EngineOutcome::Fatal(Error::HardlinkUnsupported)));
}
