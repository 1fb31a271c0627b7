//! Byte-level packet buffer: the wire codec every request and reply is
//! built on.
//!
//! Mirrors `TSFTPPacket` from the original implementation this client is
//! modeled on: a growable byte buffer with a read cursor, typed append/read
//! primitives, and a `change_type` operation that resets the buffer and
//! stamps a fresh, process-wide-unique message number.

use crate::{Opcode, ProtoError};

/// Minimum capacity growth per [`Packet::reserve`] call, matching the
/// original's `SFTP_PACKET_ALLOC_DELTA`. Small packets (most requests) end
/// up with exactly one allocation.
const ALLOC_DELTA: usize = 256;

/// Header length for a packet whose type carries a message number (all
/// types except `INIT`/`VERSION`): 1 type byte + 4 message-number bytes.
const HEADER_LEN_WITH_NUMBER: usize = 5;
/// Header length for `INIT`/`VERSION`: 1 type byte only.
const HEADER_LEN_NO_NUMBER: usize = 1;

/// A value absent from a packet that has never had its type set, or that
/// was decoded as a `VERSION` reply (which carries no message number).
pub const NO_MESSAGE_NUMBER: u32 = u32::MAX;

/// A growable byte buffer representing one SFTP packet, plus a read cursor
/// for consuming it field by field.
///
/// `content_length() + header_len() == data.len()` is an invariant
/// maintained by every mutating method.
#[derive(Debug, Clone)]
pub struct Packet {
    data: Vec<u8>,
    position: usize,
    ty: Option<Opcode>,
    message_number: u32,
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet {
    /// An empty, untyped packet. Call [`Packet::change_type`] before use.
    pub fn new() -> Self {
        Packet {
            data: Vec::new(),
            position: 0,
            ty: None,
            message_number: NO_MESSAGE_NUMBER,
        }
    }

    /// Builds a request packet of the given type, allocating it a fresh
    /// message number via `counter`.
    pub fn for_request(ty: Opcode, counter: &mut MessageCounter) -> Self {
        let mut p = Self::new();
        p.change_type(ty, counter);
        p
    }

    /// Resets the buffer, sets a new type, and — unless the type is `INIT`
    /// — allocates a new message number one greater than any previously
    /// allocated by `counter` in this process, per spec.md §3 and §8's
    /// "`ChangeType` ... assigns a strictly greater message number" property.
    pub fn change_type(&mut self, ty: Opcode, counter: &mut MessageCounter) {
        self.data.clear();
        self.position = 0;
        self.ty = Some(ty);
        self.put_u8(ty as u8);
        if ty.carries_message_number() {
            self.message_number = counter.next(ty);
            self.put_u32(self.message_number);
        } else {
            self.message_number = NO_MESSAGE_NUMBER;
        }
    }

    /// Re-initializes this packet as the destination of a freshly received
    /// frame: resets the cursor, reads the type byte and (unless the frame
    /// is `VERSION`) the message number.
    pub fn data_updated(&mut self, raw: Vec<u8>) -> Result<(), ProtoError> {
        self.data = raw;
        self.position = 0;
        let ty_byte = self.get_u8()?;
        let ty = Opcode::try_from(ty_byte)?;
        self.ty = Some(ty);
        self.message_number = if ty.carries_message_number() {
            self.get_u32()?
        } else {
            NO_MESSAGE_NUMBER
        };
        Ok(())
    }

    pub fn ty(&self) -> Option<Opcode> {
        self.ty
    }

    pub fn message_number(&self) -> u32 {
        self.message_number
    }

    /// Header length for the current type: 5 bytes (type + number) unless
    /// the type is `INIT`/`VERSION`, which is 1 byte.
    pub fn header_len(&self) -> usize {
        match self.ty {
            Some(ty) if ty.carries_message_number() => HEADER_LEN_WITH_NUMBER,
            Some(_) => HEADER_LEN_NO_NUMBER,
            None => 0,
        }
    }

    /// Full encoded buffer, including header.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Payload after the header. Panics if called before a type is set;
    /// every caller in this crate sets one before reading content.
    pub fn content(&self) -> &[u8] {
        &self.data[self.header_len()..]
    }

    pub fn content_length(&self) -> usize {
        self.data.len() - self.header_len()
    }

    /// The remaining, unread slice of the buffer from the current cursor
    /// position — a zero-copy view for consuming a trailing data block
    /// (e.g. the payload of a `DATA` reply) without an extra read call.
    pub fn next_data(&self) -> &[u8] {
        &self.data[self.position..]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn reserve(&mut self, additional: usize) {
        if self.data.capacity() < self.data.len() + additional {
            self.data.reserve(additional + ALLOC_DELTA);
        }
    }

    // --- append (write) primitives ---

    pub fn put_u8(&mut self, value: u8) {
        self.reserve(1);
        self.data.push(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.reserve(4);
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i64(&mut self, value: i64) {
        self.put_u32((value as u64 >> 32) as u32);
        self.put_u32((value as u64 & 0xFFFF_FFFF) as u32);
    }

    pub fn put_bytes(&mut self, value: &[u8]) {
        self.put_u32(value.len() as u32);
        self.reserve(value.len());
        self.data.extend_from_slice(value);
    }

    pub fn put_str(&mut self, value: &str) {
        self.put_bytes(value.as_bytes());
    }

    // --- read primitives; each advances the cursor ---

    pub fn get_u8(&mut self) -> Result<u8, ProtoError> {
        let b = *self
            .data
            .get(self.position)
            .ok_or(ProtoError::ReadPastEnd {
                pos: self.position,
                len: self.data.len(),
            })?;
        self.position += 1;
        Ok(b)
    }

    pub fn get_u32(&mut self) -> Result<u32, ProtoError> {
        let end = self.position + 4;
        let slice = self
            .data
            .get(self.position..end)
            .ok_or(ProtoError::ReadPastEnd {
                pos: self.position,
                len: self.data.len(),
            })?;
        let value = u32::from_be_bytes(slice.try_into().unwrap());
        self.position = end;
        Ok(value)
    }

    pub fn get_i64(&mut self) -> Result<i64, ProtoError> {
        let hi = self.get_u32()? as i64;
        let lo = self.get_u32()? as i64;
        Ok((hi << 32) | lo)
    }

    pub fn get_bytes(&mut self) -> Result<Vec<u8>, ProtoError> {
        let len = self.get_u32()? as usize;
        let end = self.position + len;
        let slice = self
            .data
            .get(self.position..end)
            .ok_or(ProtoError::ReadPastEnd {
                pos: self.position,
                len: self.data.len(),
            })?;
        let out = slice.to_vec();
        self.position = end;
        Ok(out)
    }

    /// SFTP strings are not NUL-terminated or required to be UTF-8 on the
    /// wire; this is a convenience for callers (paths, messages) that know
    /// their server speaks UTF-8. Binary-safe consumers should use
    /// [`Packet::get_bytes`] instead.
    pub fn get_string(&mut self) -> Result<String, ProtoError> {
        String::from_utf8(self.get_bytes()?).map_err(|_| ProtoError::InvalidUtf8)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ProtoError> {
        let end = self.position + len;
        if end > self.data.len() {
            return Err(ProtoError::ReadPastEnd {
                pos: self.position,
                len: self.data.len(),
            });
        }
        self.position = end;
        Ok(())
    }
}

/// Process-wide, per-session allocator of message numbers.
///
/// Derives each number as `(counter << 8) | opcode`, as spec.md §3
/// describes, so a response is self-identifying by the type of its
/// originating request without a side table. A per-session counter would
/// satisfy the server's uniqueness requirement just as well (see
/// DESIGN.md); this one is shared process-wide for parity with the
/// original implementation's single `static` counter.
#[derive(Debug, Default)]
pub struct MessageCounter {
    next: u32,
}

impl MessageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self, ty: Opcode) -> u32 {
        let number = (self.next << 8) | (ty as u8 as u32);
        self.next += 1;
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_read_round_trips_in_order() {
        let mut counter = MessageCounter::new();
        let mut p = Packet::for_request(Opcode::Open, &mut counter);
        p.put_u8(7);
        p.put_u32(0xDEAD_BEEF);
        p.put_i64(-5);
        p.put_str("hello");

        // skip header (type + message number) before reading payload back
        let header_len = p.header_len();
        let mut reader = Packet::new();
        reader.data_updated(p.as_bytes().to_vec()).unwrap();
        assert_eq!(reader.position(), header_len);

        assert_eq!(reader.get_u8().unwrap(), 7);
        assert_eq!(reader.get_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.get_i64().unwrap(), -5);
        assert_eq!(reader.get_string().unwrap(), "hello");
        assert_eq!(reader.position(), reader.len());
    }

    #[test]
    fn content_length_plus_header_len_is_total_len() {
        let mut counter = MessageCounter::new();
        let mut p = Packet::for_request(Opcode::Stat, &mut counter);
        p.put_str("/home/user");
        assert_eq!(p.content_length() + p.header_len(), p.len());
    }

    #[test]
    fn init_and_version_have_one_byte_header() {
        let mut counter = MessageCounter::new();
        let p = Packet::for_request(Opcode::Init, &mut counter);
        assert_eq!(p.header_len(), 1);
        assert_eq!(p.message_number(), NO_MESSAGE_NUMBER);

        let mut reader = Packet::new();
        reader.data_updated(vec![Opcode::Version as u8, 0, 0, 0, 3]).unwrap();
        assert_eq!(reader.header_len(), 1);
        assert_eq!(reader.message_number(), NO_MESSAGE_NUMBER);
    }

    #[test]
    fn change_type_assigns_strictly_increasing_numbers() {
        let mut counter = MessageCounter::new();
        let mut p = Packet::new();
        p.change_type(Opcode::Stat, &mut counter);
        let first = p.message_number();
        p.change_type(Opcode::Read, &mut counter);
        let second = p.message_number();
        assert!(second > first);
        // low byte still encodes the request type
        assert_eq!(second & 0xFF, Opcode::Read as u32);
    }

    #[test]
    fn reading_past_length_is_an_error() {
        let mut reader = Packet::new();
        reader.data_updated(vec![Opcode::Handle as u8, 0, 0, 0, 1]).unwrap();
        assert!(reader.get_bytes().is_err());
    }
}
