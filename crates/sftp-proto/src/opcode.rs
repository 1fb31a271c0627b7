//! SFTP v3 packet type codes.

use std::fmt;

/// SFTP protocol packet type byte.
///
/// Reference: `draft-ietf-secsh-filexfer-02`, section 3.
///
/// `READLINK`/`SYMLINK` are not part of the upstream PuTTY `sftp.h` the
/// original implementation this client is modeled on used, but are part of
/// the SFTP v3 draft and every server this client has been tested against
/// implements them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Init = 1,
    Version = 2,
    Open = 3,
    Close = 4,
    Read = 5,
    Write = 6,
    Lstat = 7,
    Fstat = 8,
    Setstat = 9,
    Fsetstat = 10,
    Opendir = 11,
    Readdir = 12,
    Remove = 13,
    Mkdir = 14,
    Rmdir = 15,
    Realpath = 16,
    Stat = 17,
    Rename = 18,
    Readlink = 19,
    Symlink = 20,
    Status = 101,
    Handle = 102,
    Data = 103,
    Name = 104,
    Attrs = 105,
    Extended = 200,
    ExtendedReply = 201,
}

impl Opcode {
    /// Whether replies of this type carry a message number.
    ///
    /// Only `VERSION` (the reply to `INIT`) lacks one; `INIT` itself is also
    /// exempt since no message number has been allocated yet when it's sent.
    pub fn carries_message_number(self) -> bool {
        !matches!(self, Opcode::Init | Opcode::Version)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = crate::ProtoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        Ok(match value {
            1 => Init,
            2 => Version,
            3 => Open,
            4 => Close,
            5 => Read,
            6 => Write,
            7 => Lstat,
            8 => Fstat,
            9 => Setstat,
            10 => Fsetstat,
            11 => Opendir,
            12 => Readdir,
            13 => Remove,
            14 => Mkdir,
            15 => Rmdir,
            16 => Realpath,
            17 => Stat,
            18 => Rename,
            19 => Readlink,
            20 => Symlink,
            101 => Status,
            102 => Handle,
            103 => Data,
            104 => Name,
            105 => Attrs,
            200 => Extended,
            201 => ExtendedReply,
            other => return Err(crate::ProtoError::UnknownOpcode(other)),
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Init => "SSH_FXP_INIT",
            Opcode::Version => "SSH_FXP_VERSION",
            Opcode::Open => "SSH_FXP_OPEN",
            Opcode::Close => "SSH_FXP_CLOSE",
            Opcode::Read => "SSH_FXP_READ",
            Opcode::Write => "SSH_FXP_WRITE",
            Opcode::Lstat => "SSH_FXP_LSTAT",
            Opcode::Fstat => "SSH_FXP_FSTAT",
            Opcode::Setstat => "SSH_FXP_SETSTAT",
            Opcode::Fsetstat => "SSH_FXP_FSETSTAT",
            Opcode::Opendir => "SSH_FXP_OPENDIR",
            Opcode::Readdir => "SSH_FXP_READDIR",
            Opcode::Remove => "SSH_FXP_REMOVE",
            Opcode::Mkdir => "SSH_FXP_MKDIR",
            Opcode::Rmdir => "SSH_FXP_RMDIR",
            Opcode::Realpath => "SSH_FXP_REALPATH",
            Opcode::Stat => "SSH_FXP_STAT",
            Opcode::Rename => "SSH_FXP_RENAME",
            Opcode::Readlink => "SSH_FXP_READLINK",
            Opcode::Symlink => "SSH_FXP_SYMLINK",
            Opcode::Status => "SSH_FXP_STATUS",
            Opcode::Handle => "SSH_FXP_HANDLE",
            Opcode::Data => "SSH_FXP_DATA",
            Opcode::Name => "SSH_FXP_NAME",
            Opcode::Attrs => "SSH_FXP_ATTRS",
            Opcode::Extended => "SSH_FXP_EXTENDED",
            Opcode::ExtendedReply => "SSH_FXP_EXTENDED_REPLY",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_value() {
        for b in 0u8..=255 {
            if let Ok(op) = Opcode::try_from(b) {
                assert_eq!(op as u8, b);
            }
        }
    }

    #[test]
    fn unknown_opcode_is_an_error() {
        assert!(Opcode::try_from(99).is_err());
    }

    #[test]
    fn only_version_and_init_lack_a_message_number() {
        assert!(!Opcode::Init.carries_message_number());
        assert!(!Opcode::Version.carries_message_number());
        assert!(Opcode::Status.carries_message_number());
        assert!(Opcode::Read.carries_message_number());
    }
}
