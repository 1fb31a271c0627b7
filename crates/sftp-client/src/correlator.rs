//! Request/response correlation: matches replies to requests by message
//! number and supports reserving a reply to be consumed later, so the
//! engine can pipeline a second request before reading the first's answer.

use std::collections::HashMap;

use sftp_proto::{AllowStatus, Opcode, Packet, StatusCode};

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::transport::Transport;

enum Slot {
    /// Reserved, no reply has arrived yet.
    Empty,
    /// A reply arrived while the correlator was looking for something else
    /// and was stashed here for the owner of the reservation to collect.
    Filled(Packet),
    /// The reservation was cancelled; its reply, if one ever arrives,
    /// should be dropped silently rather than delivered anywhere.
    Tombstone,
}

/// A caller's promise to collect a reply later. Must be resolved with
/// [`Correlator::receive_response`] or cancelled with
/// [`Correlator::unreserve`] — dropping it without either leaks the slot.
#[derive(Debug, Clone, Copy)]
pub struct Reservation {
    message_number: u32,
}

impl Reservation {
    pub fn message_number(&self) -> u32 {
        self.message_number
    }
}

/// Drives a [`Channel`] and keeps the reservation table spec.md §4.3
/// describes: `ReserveResponse`/`UnreserveResponse`/`ReceiveResponse` built
/// on a single `ReceivePacket` primitive.
///
/// Single-task by construction (spec.md §5: one logical thread per
/// session) — the table is a plain `HashMap`, not a concurrent structure.
pub struct Correlator<T> {
    channel: Channel<T>,
    reservations: HashMap<u32, Slot>,
}

impl<T: Transport> Correlator<T> {
    pub fn new(channel: Channel<T>) -> Self {
        Correlator {
            channel,
            reservations: HashMap::new(),
        }
    }

    /// Registers `request`'s message number so a later, unrelated read
    /// that happens to observe its reply stashes it here instead of
    /// raising an unexpected-reply error.
    pub fn reserve_response(&mut self, request: &Packet) -> Reservation {
        let message_number = request.message_number();
        self.reservations.insert(message_number, Slot::Empty);
        Reservation { message_number }
    }

    /// Cancels a reservation in place. A reply that arrives afterward for
    /// this message number is silently discarded rather than delivered.
    pub fn unreserve_response(&mut self, reservation: Reservation) {
        self.reservations
            .insert(reservation.message_number, Slot::Tombstone);
    }

    /// Reads one frame not addressed to any live reservation and not
    /// awaited by an in-progress `receive_response` call — the standalone
    /// form of `ReceivePacket`, used before any pipelining has begun (e.g.
    /// the `INIT`/`VERSION` handshake has its own framing and doesn't go
    /// through the correlator at all).
    pub async fn receive_packet(
        &mut self,
        expected_type: Option<Opcode>,
        allow: AllowStatus,
    ) -> Result<Packet> {
        loop {
            let mut scratch = Packet::new();
            self.channel.receive(&mut scratch).await?;
            let number = scratch.message_number();

            match self.reservations.get(&number) {
                Some(Slot::Empty) => {
                    self.reservations.insert(number, Slot::Filled(scratch));
                }
                Some(Slot::Tombstone) => {
                    self.reservations.remove(&number);
                }
                Some(Slot::Filled(_)) => return Err(Error::DuplicateReply(number)),
                None => {
                    Self::verify_reply(&scratch, expected_type, allow)?;
                    return Ok(scratch);
                }
            }
        }
    }

    /// Resolves `request`'s reservation: if its reply already arrived (by
    /// way of an earlier `receive_response`/`receive_packet` call reading
    /// ahead), returns it immediately; otherwise drives the channel,
    /// stashing any other reserved reply it passes along the way, until
    /// this one arrives.
    ///
    /// Fatal if the eventual reply's message number doesn't match
    /// `request`'s — this should be unreachable given the reservation
    /// bookkeeping above, but is checked per spec.md §8's negative case.
    pub async fn receive_response(
        &mut self,
        request: &Packet,
        expected_type: Option<Opcode>,
        allow: AllowStatus,
    ) -> Result<Packet> {
        let number = request.message_number();

        if let Some(slot) = self.reservations.get(&number) {
            if matches!(slot, Slot::Filled(_)) {
                let Slot::Filled(packet) = self.reservations.remove(&number).unwrap() else {
                    unreachable!()
                };
                Self::check_number(&packet, number)?;
                Self::verify_reply(&packet, expected_type, allow)?;
                return Ok(packet);
            }
        }

        loop {
            let mut scratch = Packet::new();
            self.channel.receive(&mut scratch).await?;
            let got = scratch.message_number();

            if got == number {
                self.reservations.remove(&number);
                Self::verify_reply(&scratch, expected_type, allow)?;
                return Ok(scratch);
            }

            match self.reservations.get(&got) {
                Some(Slot::Empty) => {
                    self.reservations.insert(got, Slot::Filled(scratch));
                }
                Some(Slot::Tombstone) => {
                    self.reservations.remove(&got);
                }
                Some(Slot::Filled(_)) => return Err(Error::DuplicateReply(got)),
                None => return Err(Error::UnexpectedReply(got)),
            }
        }
    }

    /// Sends `request` over the underlying channel.
    pub async fn send(&mut self, request: &Packet) -> Result<()> {
        self.channel.send(request).await
    }

    fn check_number(packet: &Packet, expected: u32) -> Result<()> {
        if packet.message_number() != expected {
            return Err(Error::MessageNumberMismatch {
                expected,
                actual: packet.message_number(),
            });
        }
        Ok(())
    }

    /// Applies spec.md §4.3's post-delivery check: if an `expected_type`
    /// was demanded, a `STATUS` reply is decoded and must be on the
    /// allow-list, and anything else must match the expected type exactly.
    fn verify_reply(packet: &Packet, expected_type: Option<Opcode>, allow: AllowStatus) -> Result<()> {
        let Some(expected) = expected_type else {
            return Ok(());
        };
        let actual = packet.ty().ok_or(Error::UnexpectedReply(packet.message_number()))?;

        if actual == Opcode::Status {
            // `packet`'s cursor already sits right after the header (set
            // by `Packet::data_updated` when the frame was decoded), so
            // the clone can be read from directly.
            let mut reader = packet.clone();
            let code = StatusCode::from(reader.get_u32()?);
            if !allow.allows(code) {
                let message = reader.get_string().unwrap_or_default();
                let language = reader.get_string().unwrap_or_default();
                // The reply itself only carries a message number, not the
                // opcode that originated it, so recover it from the low
                // byte the way the source's `GetRequestType()` does.
                let request_type = Opcode::try_from((packet.message_number() & 0xFF) as u8)
                    .unwrap_or(expected);
                return Err(Error::Status {
                    code,
                    message,
                    language,
                    request_type,
                });
            }
            return Ok(());
        }

        if actual != expected {
            return Err(Error::UnexpectedReply(packet.message_number()));
        }
        Ok(())
    }
}
