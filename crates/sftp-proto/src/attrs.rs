//! The `ATTRS` block: a `u32` flag word followed by a fixed-order sequence
//! of optional fields, shared by `STAT`/`LSTAT`/`FSTAT` replies, `SETSTAT`/
//! `FSETSTAT` requests, and each entry of a `NAME` reply.

use crate::{Packet, ProtoError};

const ATTR_SIZE: u32 = 0x0000_0001;
const ATTR_UIDGID: u32 = 0x0000_0002;
const ATTR_PERMISSIONS: u32 = 0x0000_0004;
const ATTR_ACMODTIME: u32 = 0x0000_0008;
const ATTR_EXTENDED: u32 = 0x8000_0000;

/// `S_IFDIR`. The original implementation reads this bit directly out of
/// the raw permissions word to tell directories from files rather than
/// relying on a separate type field, since SFTP v3 has none; this client
/// preserves that reading for `Attributes::is_directory`.
const S_IFDIR: u32 = 0o040000;

/// One `name` = `(key, value)` extended attribute pair, opaque to this
/// client. Decoded so a caller can inspect them, but never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedAttr {
    pub name: String,
    pub value: Vec<u8>,
}

/// Decoded `ATTRS` block. Every field is `Option`; presence is carried by
/// the flag word and nothing is synthesized for an absent field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub size: Option<u64>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub permissions: Option<u32>,
    pub atime: Option<u32>,
    pub mtime: Option<u32>,
    pub extended: Vec<ExtendedAttr>,
}

impl Attributes {
    pub fn empty() -> Self {
        Self::default()
    }

    /// `permissions & S_IFDIR` is nonzero. `false` when permissions weren't
    /// sent at all, matching the original's fallback of leaving the entry
    /// typed as a regular file.
    pub fn is_directory(&self) -> bool {
        self.permissions.map(|p| p & S_IFDIR != 0).unwrap_or(false)
    }

    fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.size.is_some() {
            flags |= ATTR_SIZE;
        }
        if self.uid.is_some() || self.gid.is_some() {
            flags |= ATTR_UIDGID;
        }
        if self.permissions.is_some() {
            flags |= ATTR_PERMISSIONS;
        }
        if self.atime.is_some() || self.mtime.is_some() {
            flags |= ATTR_ACMODTIME;
        }
        if !self.extended.is_empty() {
            flags |= ATTR_EXTENDED;
        }
        flags
    }

    /// Appends this block to `packet`, in the fixed field order the
    /// protocol mandates: size, uid/gid, permissions, atime/mtime, then
    /// any extended pairs.
    pub fn encode(&self, packet: &mut Packet) {
        packet.put_u32(self.flags());
        if let Some(size) = self.size {
            packet.put_i64(size as i64);
        }
        if self.uid.is_some() || self.gid.is_some() {
            packet.put_u32(self.uid.unwrap_or(0));
            packet.put_u32(self.gid.unwrap_or(0));
        }
        if let Some(permissions) = self.permissions {
            packet.put_u32(permissions);
        }
        if self.atime.is_some() || self.mtime.is_some() {
            packet.put_u32(self.atime.unwrap_or(0));
            packet.put_u32(self.mtime.unwrap_or(0));
        }
        if !self.extended.is_empty() {
            packet.put_u32(self.extended.len() as u32);
            for pair in &self.extended {
                packet.put_str(&pair.name);
                packet.put_bytes(&pair.value);
            }
        }
    }

    /// Reads a block from `packet`'s current cursor position, consuming
    /// exactly the fields its flag word declares present. Extended pairs
    /// are decoded rather than skipped — servers rarely send more than a
    /// handful, and keeping them lets a caller inspect `acl`/ownership
    /// extensions instead of only knowing they exist.
    pub fn decode(packet: &mut Packet) -> Result<Self, ProtoError> {
        let flags = packet.get_u32()?;
        let mut attrs = Attributes::empty();

        if flags & ATTR_SIZE != 0 {
            attrs.size = Some(packet.get_i64()? as u64);
        }
        if flags & ATTR_UIDGID != 0 {
            attrs.uid = Some(packet.get_u32()?);
            attrs.gid = Some(packet.get_u32()?);
        }
        if flags & ATTR_PERMISSIONS != 0 {
            attrs.permissions = Some(packet.get_u32()?);
        }
        if flags & ATTR_ACMODTIME != 0 {
            attrs.atime = Some(packet.get_u32()?);
            attrs.mtime = Some(packet.get_u32()?);
        }
        if flags & ATTR_EXTENDED != 0 {
            let count = packet.get_u32()?;
            for _ in 0..count {
                let name = packet.get_string()?;
                let value = packet.get_bytes()?;
                attrs.extended.push(ExtendedAttr { name, value });
            }
        }

        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MessageCounter, Opcode};

    fn round_trip(attrs: &Attributes) -> Attributes {
        let mut counter = MessageCounter::new();
        let mut packet = Packet::for_request(Opcode::Setstat, &mut counter);
        attrs.encode(&mut packet);

        let mut reader = Packet::new();
        reader.data_updated(packet.as_bytes().to_vec()).unwrap();
        Attributes::decode(&mut reader).unwrap()
    }

    #[test]
    fn empty_attributes_round_trip() {
        let attrs = Attributes::empty();
        assert_eq!(round_trip(&attrs), attrs);
    }

    #[test]
    fn full_attributes_round_trip_in_fixed_order() {
        let attrs = Attributes {
            size: Some(4096),
            uid: Some(1000),
            gid: Some(1000),
            permissions: Some(0o100644),
            atime: Some(1_700_000_000),
            mtime: Some(1_700_000_100),
            extended: vec![ExtendedAttr {
                name: "acl".into(),
                value: vec![1, 2, 3],
            }],
        };
        assert_eq!(round_trip(&attrs), attrs);
    }

    #[test]
    fn directory_bit_is_read_from_raw_permissions() {
        let mut dir = Attributes::empty();
        dir.permissions = Some(0o040755);
        assert!(dir.is_directory());

        let mut file = Attributes::empty();
        file.permissions = Some(0o100644);
        assert!(!file.is_directory());

        assert!(!Attributes::empty().is_directory());
    }
}
