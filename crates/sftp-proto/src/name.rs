//! `RemoteFile`: a decoded directory entry or stat result, and the `NAME`
//! reply that carries one or more of them.

use std::sync::Arc;

use crate::{Attributes, Packet, ProtoError};

/// A single remote filesystem entry, as returned by `READDIR`/`STAT`/
/// `LSTAT`/`REALPATH`.
///
/// `parent` lets a resolved symlink target be re-expressed relative to the
/// directory it was listed in without the caller re-threading that path
/// through every call; it is `None` for entries produced by an operation
/// that has no listing context (a bare `STAT`, for instance).
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub name: String,
    pub long_name: String,
    pub attrs: Attributes,
    pub link_target: Option<String>,
    pub parent: Option<Arc<str>>,
}

impl RemoteFile {
    pub fn is_directory(&self) -> bool {
        self.attrs.is_directory()
    }

    pub fn is_symlink(&self) -> bool {
        self.link_target.is_some()
    }

    pub fn size(&self) -> Option<u64> {
        self.attrs.size
    }

    fn from_packet(packet: &mut Packet) -> Result<Self, ProtoError> {
        let name = packet.get_string()?;
        let long_name = packet.get_string()?;
        let attrs = Attributes::decode(packet)?;
        Ok(RemoteFile {
            name,
            long_name,
            attrs,
            link_target: None,
            parent: None,
        })
    }

    /// Reads a `NAME` reply's `count` directory entries, attaching `parent`
    /// to each so a caller resolving one of them as a symlink target can
    /// express the result relative to the directory it came from.
    pub fn decode_listing(
        packet: &mut Packet,
        parent: Option<Arc<str>>,
    ) -> Result<Vec<RemoteFile>, ProtoError> {
        let count = packet.get_u32()?;
        // `count` comes straight off the wire; cap the allocation hint so a
        // bogus huge count can't force a multi-gigabyte reservation before
        // the per-entry reads below fail on the (frame-size-bounded) buffer.
        let mut entries = Vec::with_capacity(count.min(4096) as usize);
        for _ in 0..count {
            let mut entry = RemoteFile::from_packet(packet)?;
            entry.parent = parent.clone();
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Reads a `NAME` reply known to carry exactly one entry, the shape
    /// `REALPATH` and `READLINK` replies use. Any other count is a protocol
    /// violation.
    pub fn decode_single(packet: &mut Packet) -> Result<RemoteFile, ProtoError> {
        let count = packet.get_u32()?;
        if count != 1 {
            return Err(ProtoError::UnexpectedNameCount { count });
        }
        RemoteFile::from_packet(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MessageCounter, Opcode};

    fn encode_name_reply(entries: &[(&str, &str, Attributes)]) -> Packet {
        let mut counter = MessageCounter::new();
        let mut packet = Packet::for_request(Opcode::Name, &mut counter);
        packet.put_u32(entries.len() as u32);
        for (name, long, attrs) in entries {
            packet.put_str(name);
            packet.put_str(long);
            attrs.encode(&mut packet);
        }
        packet
    }

    fn reader_for(packet: &Packet) -> Packet {
        let mut reader = Packet::new();
        reader.data_updated(packet.as_bytes().to_vec()).unwrap();
        reader
    }

    #[test]
    fn decodes_multi_entry_listing_with_parent_attached() {
        let mut attrs = Attributes::empty();
        attrs.permissions = Some(0o040755);
        let packet = encode_name_reply(&[
            (".", "drwxr-xr-x . ", attrs.clone()),
            ("..", "drwxr-xr-x .. ", attrs),
        ]);
        let mut reader = reader_for(&packet);
        let parent: Arc<str> = Arc::from("/home/user");
        let entries = RemoteFile::decode_listing(&mut reader, Some(parent.clone())).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, ".");
        assert!(entries[0].is_directory());
        assert_eq!(entries[1].parent.as_deref(), Some("/home/user"));
    }

    #[test]
    fn decode_single_rejects_unexpected_count() {
        let packet = encode_name_reply(&[
            ("a", "a", Attributes::empty()),
            ("b", "b", Attributes::empty()),
        ]);
        let mut reader = reader_for(&packet);
        assert!(matches!(
            RemoteFile::decode_single(&mut reader),
            Err(ProtoError::UnexpectedNameCount { count: 2 })
        ));
    }

    #[test]
    fn decode_single_reads_one_entry() {
        let packet = encode_name_reply(&[("/home/user", "/home/user", Attributes::empty())]);
        let mut reader = reader_for(&packet);
        let file = RemoteFile::decode_single(&mut reader).unwrap();
        assert_eq!(file.name, "/home/user");
        assert!(file.parent.is_none());
    }
}
