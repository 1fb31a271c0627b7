//! SFTP status codes carried by `SSH_FXP_STATUS` replies.

use std::fmt;

/// `SSH_FXP_STATUS` code, as defined by the SFTP v3 draft, section 7.
///
/// Values at or above [`StatusCode::table_len`] that a server sends are not
/// protocol errors by themselves — servers are free to extend the table —
/// so decoding a status always succeeds; unrecognized codes decode to
/// [`StatusCode::Unknown`] carrying the raw value, per spec.md's boundary
/// case "STATUS with code >= table length is reported as Unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Eof,
    NoSuchFile,
    PermissionDenied,
    Failure,
    BadMessage,
    NoConnection,
    ConnectionLost,
    OpUnsupported,
    Unknown(u32),
}

impl StatusCode {
    const TABLE_LEN: u32 = 9;

    pub fn table_len() -> u32 {
        Self::TABLE_LEN
    }

    /// `true` for the two designations spec.md marks as non-errors and
    /// usable as terminators (`OK`, `EOF`).
    pub fn is_ok_or_eof(self) -> bool {
        matches!(self, StatusCode::Ok | StatusCode::Eof)
    }

    pub fn code(self) -> u32 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::Eof => 1,
            StatusCode::NoSuchFile => 2,
            StatusCode::PermissionDenied => 3,
            StatusCode::Failure => 4,
            StatusCode::BadMessage => 5,
            StatusCode::NoConnection => 6,
            StatusCode::ConnectionLost => 7,
            StatusCode::OpUnsupported => 8,
            StatusCode::Unknown(v) => v,
        }
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        match value {
            0 => StatusCode::Ok,
            1 => StatusCode::Eof,
            2 => StatusCode::NoSuchFile,
            3 => StatusCode::PermissionDenied,
            4 => StatusCode::Failure,
            5 => StatusCode::BadMessage,
            6 => StatusCode::NoConnection,
            7 => StatusCode::ConnectionLost,
            8 => StatusCode::OpUnsupported,
            other => StatusCode::Unknown(other),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Ok => "OK",
            StatusCode::Eof => "EOF",
            StatusCode::NoSuchFile => "No such file",
            StatusCode::PermissionDenied => "Permission denied",
            StatusCode::Failure => "Failure",
            StatusCode::BadMessage => "Bad message",
            StatusCode::NoConnection => "No connection",
            StatusCode::ConnectionLost => "Connection lost",
            StatusCode::OpUnsupported => "Operation unsupported",
            StatusCode::Unknown(v) => return write!(f, "Unknown status ({v})"),
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// Mask of status codes a caller is willing to accept on an otherwise
/// `STATUS`-typed reply, per spec.md's `AllowStatus` (`asOK`, `asEOF`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowStatus {
    pub ok: bool,
    pub eof: bool,
}

impl AllowStatus {
    pub const NONE: AllowStatus = AllowStatus {
        ok: false,
        eof: false,
    };
    pub const OK: AllowStatus = AllowStatus {
        ok: true,
        eof: false,
    };
    pub const EOF: AllowStatus = AllowStatus {
        ok: false,
        eof: true,
    };
    pub const OK_OR_EOF: AllowStatus = AllowStatus {
        ok: true,
        eof: true,
    };

    pub fn allows(self, status: StatusCode) -> bool {
        match status {
            StatusCode::Ok => self.ok,
            StatusCode::Eof => self.eof,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_past_table_len_round_trips_its_code() {
        let s = StatusCode::from(55);
        assert_eq!(s, StatusCode::Unknown(55));
        assert_eq!(s.code(), 55);
        assert!(55 >= StatusCode::table_len());
    }

    #[test]
    fn ok_and_eof_are_non_errors() {
        assert!(StatusCode::Ok.is_ok_or_eof());
        assert!(StatusCode::Eof.is_ok_or_eof());
        assert!(!StatusCode::Failure.is_ok_or_eof());
    }

    #[test]
    fn allow_status_mask() {
        assert!(AllowStatus::OK_OR_EOF.allows(StatusCode::Ok));
        assert!(AllowStatus::OK_OR_EOF.allows(StatusCode::Eof));
        assert!(!AllowStatus::OK.allows(StatusCode::Eof));
        assert!(!AllowStatus::NONE.allows(StatusCode::Ok));
    }
}
