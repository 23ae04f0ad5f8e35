//! The logical packet carried by every frame.

use crate::{DeviceId, OpCode, PacketError, PacketResult, MAX_PAYLOAD_LEN};

/// Bounded payload storage.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

/// A packet: operation, sender and up to [`MAX_PAYLOAD_LEN`] bytes of data.
///
/// Parsers fill a single packet in place and hand out `&Packet` on success,
/// so a reference obtained from a parser is only meaningful until the next
/// byte is fed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    op: OpCode,
    from: DeviceId,
    data: Payload,
}

impl Packet {
    /// Create a packet, rejecting payloads longer than [`MAX_PAYLOAD_LEN`].
    pub fn new(op: OpCode, from: DeviceId, data: &[u8]) -> PacketResult<Self> {
        let data = Payload::from_slice(data).map_err(|_| PacketError::PayloadTooLong {
            max: MAX_PAYLOAD_LEN,
            actual: data.len(),
        })?;
        Ok(Packet { op, from, data })
    }

    /// Create a packet without payload.
    pub fn empty(op: OpCode, from: DeviceId) -> Self {
        Packet {
            op,
            from,
            data: Payload::new(),
        }
    }

    /// Operation code.
    pub fn op(&self) -> OpCode {
        self.op
    }

    /// Sender.
    pub fn from(&self) -> DeviceId {
        self.from
    }

    /// Payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the packet carries no payload.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reset to an empty `Ping` from the master, keeping the allocation.
    pub fn clear(&mut self) {
        self.op = OpCode::Ping;
        self.from = DeviceId::MASTER;
        self.data.clear();
    }

    /// Set the operation code.
    pub fn set_op(&mut self, op: OpCode) {
        self.op = op;
    }

    /// Set the sender.
    pub fn set_from(&mut self, from: DeviceId) {
        self.from = from;
    }

    /// Append one payload byte.
    pub fn push_data(&mut self, byte: u8) -> PacketResult<()> {
        self.data.push(byte).map_err(|_| PacketError::PayloadTooLong {
            max: MAX_PAYLOAD_LEN,
            actual: MAX_PAYLOAD_LEN + 1,
        })
    }
}

impl Default for Packet {
    fn default() -> Self {
        Packet::empty(OpCode::Ping, DeviceId::MASTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_new_accepts_max_payload() {
        let data = [0x41u8; MAX_PAYLOAD_LEN];
        let packet = Packet::new(OpCode::MeasureResponse, DeviceId::new(1), &data).unwrap();
        assert_eq!(packet.len(), MAX_PAYLOAD_LEN);
    }

    #[test]
    fn test_packet_new_rejects_oversized_payload() {
        let data = [0u8; MAX_PAYLOAD_LEN + 1];
        let err = Packet::new(OpCode::Pong, DeviceId::new(1), &data).unwrap_err();
        assert_eq!(
            err,
            PacketError::PayloadTooLong {
                max: MAX_PAYLOAD_LEN,
                actual: MAX_PAYLOAD_LEN + 1
            }
        );
    }

    #[test]
    fn test_push_data_fails_closed() {
        let mut packet = Packet::default();
        for _ in 0..MAX_PAYLOAD_LEN {
            packet.push_data(b'0').unwrap();
        }
        assert!(packet.push_data(b'0').is_err());
        assert_eq!(packet.len(), MAX_PAYLOAD_LEN);
    }

    #[test]
    fn test_clear_resets_fields() {
        let mut packet = Packet::new(OpCode::MeasureResponse, DeviceId::new(3), b"00FF").unwrap();
        packet.clear();
        assert_eq!(packet, Packet::default());
        assert!(packet.is_empty());
    }
}
