use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "A pure Rust SFTP v3 command-line client", long_about = None)]
pub struct Cli {
    /// Connection destination, passed straight to `ssh` (e.g. `user@host`).
    pub destination: String,

    /// Path to the `ssh` binary to spawn.
    #[arg(long, default_value = "ssh")]
    pub ssh: String,

    /// Extra arguments forwarded to `ssh` before the destination, e.g.
    /// `--ssh-arg=-p2222`.
    #[arg(long = "ssh-arg")]
    pub ssh_args: Vec<String>,

    /// Answer every overwrite/resume/skip prompt as "yes", for
    /// non-interactive use.
    #[arg(long)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Downloads a remote file or directory.
    Get {
        remote: String,
        /// Local destination directory; defaults to the current directory.
        local_dir: Option<PathBuf>,
    },
    /// Uploads a local file or directory.
    Put {
        local: PathBuf,
        /// Remote destination directory; defaults to the remote home directory.
        remote_dir: Option<String>,
    },
    /// Lists a remote directory.
    Ls {
        #[arg(default_value = ".")]
        path: String,
    },
    /// Creates a remote directory.
    Mkdir { path: String },
    /// Removes an empty remote directory.
    Rmdir { path: String },
    /// Removes a remote file.
    Rm { path: String },
    /// Renames (or moves) a remote path.
    Rename { from: String, to: String },
    /// Creates a remote symbolic link.
    Ln { target: String, link: String },
    /// Prints a remote path's attributes.
    Stat { path: String },
}
