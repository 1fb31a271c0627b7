mod child_transport;
mod cli;
mod prompt;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use sftp_client::progress::{CopyParameters, OperationProgress, OperationProgressSnapshot};
use sftp_client::transfer::{copy_to_local, copy_to_remote};
use sftp_client::{Client, Error};

use child_transport::ChildIo;
use cli::{Cli, Commands};
use prompt::TerminalPrompter;

/// 0 success, 1 a per-file skip occurred somewhere in the batch, 2 a
/// fatal or protocol error terminated the run, per SPEC_FULL.md §6.
const EXIT_OK: u8 = 0;
const EXIT_SKIPPED: u8 = 1;
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(true) => ExitCode::from(EXIT_OK),
        Ok(false) => ExitCode::from(EXIT_SKIPPED),
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: &Cli) -> Result<bool, Error> {
    let transport = ChildIo::spawn(&cli.ssh, &cli.destination, &cli.ssh_args)
        .map_err(Error::ConnectionLost)?;
    let mut client = Client::connect(transport).await?;

    match &cli.command {
        Commands::Get { remote, local_dir } => {
            run_get(&mut client, remote, local_dir.clone(), cli.yes).await
        }
        Commands::Put { local, remote_dir } => {
            run_put(&mut client, local, remote_dir.clone(), cli.yes).await
        }
        Commands::Ls { path } => run_ls(&mut client, path).await,
        Commands::Mkdir { path } => {
            let attrs = sftp_proto::Attributes::empty();
            sftp_client::ops::mkdir(client.session_mut(), path, &attrs).await?;
            Ok(true)
        }
        Commands::Rmdir { path } => {
            client.delete_file(path, true).await?;
            Ok(true)
        }
        Commands::Rm { path } => {
            client.delete_file(path, false).await?;
            Ok(true)
        }
        Commands::Rename { from, to } => {
            sftp_client::ops::rename(client.session_mut(), from, to).await?;
            Ok(true)
        }
        Commands::Ln { target, link } => {
            sftp_client::ops::symlink(client.session_mut(), target, link, false).await?;
            Ok(true)
        }
        Commands::Stat { path } => run_stat(&mut client, path).await,
    }
}

fn make_progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .unwrap()
        .progress_chars("#>-"),
    );
    bar
}

fn progress_with_bar(bar: ProgressBar) -> OperationProgress {
    let mut progress = OperationProgress::default();
    progress.on_update = Some(Box::new(move |snapshot: &OperationProgressSnapshot| {
        bar.set_length(snapshot.transfer_size.max(1));
        bar.set_position(snapshot.transferred);
    }));
    progress
}

async fn run_get<T: sftp_client::transport::Transport>(
    client: &mut Client<T>,
    remote: &str,
    local_dir: Option<PathBuf>,
    assume_yes: bool,
) -> Result<bool, Error> {
    let local_dir = local_dir.unwrap_or_else(|| PathBuf::from("."));
    let (remote_dir, name) = split_remote(remote);

    let attrs = sftp_client::ops::stat(client.session_mut(), remote).await?;
    let size = attrs.size.unwrap_or(0);
    let entry = sftp_proto::RemoteFile {
        name: name.to_string(),
        long_name: name.to_string(),
        attrs,
        link_target: None,
        parent: None,
    };

    let params = CopyParameters::default();
    let mut progress = progress_with_bar(make_progress_bar(size));
    let mut prompter = TerminalPrompter { assume_yes };

    let results = copy_to_local(
        client,
        &remote_dir,
        std::slice::from_ref(&entry),
        &local_dir,
        &params,
        &mut progress,
        &mut prompter,
    )
    .await?;

    Ok(report(&results))
}

async fn run_put<T: sftp_client::transport::Transport>(
    client: &mut Client<T>,
    local: &std::path::Path,
    remote_dir: Option<String>,
    assume_yes: bool,
) -> Result<bool, Error> {
    let remote_dir = match remote_dir {
        Some(dir) => dir,
        None => client.home_directory().to_string(),
    };
    let size = tokio::fs::metadata(local).await?.len();

    let params = CopyParameters::default();
    let mut progress = progress_with_bar(make_progress_bar(size));
    let mut prompter = TerminalPrompter { assume_yes };

    let results = copy_to_remote(
        client,
        std::slice::from_ref(&local.to_path_buf()),
        &remote_dir,
        &params,
        &mut progress,
        &mut prompter,
    )
    .await?;

    Ok(report(&results))
}

async fn run_ls<T: sftp_client::transport::Transport>(
    client: &mut Client<T>,
    path: &str,
) -> Result<bool, Error> {
    let resolved = client.canonify(path).await?;
    let handle = sftp_client::ops::opendir(client.session_mut(), &resolved).await?;
    let entries = sftp_client::ops::read_directory(client.session_mut(), &handle).await?;
    sftp_client::ops::close(client.session_mut(), &handle).await?;

    for entry in &entries {
        if !entry.long_name.is_empty() {
            println!("{}", entry.long_name);
        } else {
            println!(
                "{} {}",
                entry.attrs.size.unwrap_or(0),
                entry.name
            );
        }
    }
    Ok(true)
}

async fn run_stat<T: sftp_client::transport::Transport>(
    client: &mut Client<T>,
    path: &str,
) -> Result<bool, Error> {
    let attrs = sftp_client::ops::stat(client.session_mut(), path).await?;
    println!("{path}:");
    println!("  size: {}", attrs.size.unwrap_or(0));
    println!("  permissions: {:o}", attrs.permissions.unwrap_or(0));
    println!("  directory: {}", attrs.is_directory());
    if let Some(mtime) = attrs.mtime {
        println!("  mtime: {mtime}");
    }
    Ok(true)
}

fn split_remote(path: &str) -> (String, String) {
    match path.rfind('/') {
        Some(idx) if idx > 0 => (path[..idx].to_string(), path[idx + 1..].to_string()),
        Some(_) => ("/".to_string(), path[1..].to_string()),
        None => (".".to_string(), path.to_string()),
    }
}

fn report(results: &[(String, bool)]) -> bool {
    let mut all_ok = true;
    for (name, ok) in results {
        if *ok {
            println!("{name}: done");
        } else {
            println!("{name}: skipped");
            all_ok = false;
        }
    }
    all_ok
}
