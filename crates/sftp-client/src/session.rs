//! Binds the packet codec, channel framing, and correlator into the one
//! surface every higher-level operation is built from: allocate a
//! request, send it, and either await its reply immediately or reserve it
//! for later — the unit of work every entry in spec.md §4.5's operation
//! table reduces to.

use sftp_proto::{AllowStatus, MessageCounter, Opcode, Packet};

use crate::channel::Channel;
use crate::correlator::{Correlator, Reservation};
use crate::error::Result;
use crate::transport::Transport;

pub struct Session<T> {
    correlator: Correlator<T>,
    counter: MessageCounter,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Session {
            correlator: Correlator::new(Channel::new(transport)),
            counter: MessageCounter::new(),
        }
    }

    /// Allocates a fresh request packet of type `ty`, stamped with a new
    /// message number (or none, for `INIT`).
    pub fn new_request(&mut self, ty: Opcode) -> Packet {
        Packet::for_request(ty, &mut self.counter)
    }

    pub async fn send(&mut self, request: &Packet) -> Result<()> {
        self.correlator.send(request).await
    }

    pub fn reserve(&mut self, request: &Packet) -> Reservation {
        self.correlator.reserve_response(request)
    }

    pub fn unreserve(&mut self, reservation: Reservation) {
        self.correlator.unreserve_response(reservation)
    }

    pub async fn receive_response(
        &mut self,
        request: &Packet,
        expected_type: Opcode,
        allow: AllowStatus,
    ) -> Result<Packet> {
        self.correlator
            .receive_response(request, Some(expected_type), allow)
            .await
    }

    /// The INIT/VERSION handshake is the one exchange with no message
    /// number at all, so it bypasses the correlator's reservation table
    /// and reads directly off the channel.
    pub async fn receive_untyped(&mut self) -> Result<Packet> {
        self.correlator.receive_packet(None, AllowStatus::NONE).await
    }

    /// Send `request` and await its reply in one call, for the common
    /// non-pipelined case.
    pub async fn roundtrip(
        &mut self,
        request: &Packet,
        expected_type: Opcode,
        allow: AllowStatus,
    ) -> Result<Packet> {
        self.send(request).await?;
        self.receive_response(request, expected_type, allow).await
    }
}
