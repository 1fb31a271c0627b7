//! Top-level session: version negotiation and the home-directory/cwd
//! state that every path operation is relative to.

use sftp_proto::{Opcode, PROTOCOL_VERSION};

use crate::error::{Error, Result};
use crate::ops;
use crate::path;
use crate::session::Session;
use crate::transport::Transport;

/// Capability flags this client reports to callers, per spec.md §6's
/// "Engine API exposed": mode-changing is supported; ownership changes,
/// hardlinks, arbitrary commands, and user/group listings are not.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub can_change_mode: bool,
    pub can_change_owner: bool,
    pub can_hardlink: bool,
    pub can_run_commands: bool,
    pub can_list_users: bool,
}

impl Capabilities {
    const SFTP_V3: Capabilities = Capabilities {
        can_change_mode: true,
        can_change_owner: false,
        can_hardlink: false,
        can_run_commands: false,
        can_list_users: false,
    };
}

/// A negotiated SFTP v3 session bound to one transport.
///
/// Owns the resolved current directory (`cwd`) and a memoized home
/// directory, since every relative path operation needs both and
/// re-resolving the home directory on every call would be wasteful.
pub struct Client<T> {
    session: Session<T>,
    cwd: String,
    home: Option<String>,
}

impl<T: Transport> Client<T> {
    /// Performs the `INIT`/`VERSION` handshake. Fails fatally if the
    /// server's reply falls outside `[3, 3]`, per spec.md §6.
    pub async fn connect(transport: T) -> Result<Self> {
        let mut session = Session::new(transport);

        let mut init = session.new_request(Opcode::Init);
        init.put_u32(PROTOCOL_VERSION);
        session.send(&init).await?;

        let version_reply = session.receive_untyped().await?;
        if version_reply.ty() != Some(Opcode::Version) {
            return Err(Error::UnexpectedReply(sftp_proto::NO_MESSAGE_NUMBER));
        }

        let mut version_reply = version_reply;
        let server_version = version_reply.get_u32()?;
        if server_version != PROTOCOL_VERSION {
            return Err(Error::UnsupportedVersion(server_version));
        }

        Self::negotiate_extensions(&mut version_reply)?;

        let mut client = Client {
            session,
            cwd: String::new(),
            home: None,
        };
        let home = path::home_directory(&mut client.session).await?;
        client.cwd = home.clone();
        client.home = Some(home);
        Ok(client)
    }

    /// Extension negotiation is stubbed: a hook for reading any remaining
    /// name/data pairs in the `VERSION` reply exists, but nothing is
    /// parsed yet, per SPEC_FULL.md's resolution of the corresponding open
    /// question in spec.md §9.
    fn negotiate_extensions(_version_reply: &mut sftp_proto::Packet) -> Result<()> {
        Ok(())
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::SFTP_V3
    }

    pub fn home_directory(&self) -> &str {
        self.home.as_deref().unwrap_or("/")
    }

    pub fn current_directory(&self) -> &str {
        &self.cwd
    }

    pub async fn change_directory(&mut self, path: &str) -> Result<()> {
        let resolved = path::change_directory(&mut self.session, path, &self.cwd).await?;
        self.cwd = resolved;
        Ok(())
    }

    pub async fn canonify(&mut self, path: &str) -> Result<String> {
        path::canonify(&mut self.session, path, &self.cwd).await
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    /// `DeleteFile`: removes a remote entry. Recursing into a non-symlink
    /// directory first requires the caller to have already emptied it (the
    /// generic directory walker spec.md §4.5 defers to lives outside this
    /// crate); this method issues the terminal `RMDIR`/`REMOVE` only.
    pub async fn delete_file(&mut self, path: &str, is_directory: bool) -> Result<()> {
        if is_directory {
            ops::rmdir(&mut self.session, path).await
        } else {
            ops::remove(&mut self.session, path).await
        }
    }
}
