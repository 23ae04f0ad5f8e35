//! API-mode framing.
//!
//! Used when the radio runs in escaped API mode (`ATAP 2`). Packets travel
//! as the RF data of transmit-request frames on the way out and arrive
//! inside receive-packet frames.
//!
//! ```text
//! +------+--------+--------+-------+---------------------------+----------+
//! | 0x7E | len_hi | len_lo | apiId | frame data [len - 1]      | checksum |
//! +------+--------+--------+-------+---------------------------+----------+
//!
//! receive packet (0x90) frame data:
//! +-------------+-------------+---------+----+------+---------+
//! | source64(8) | network(2)  | options | op | from | data... |
//! +-------------+-------------+---------+----+------+---------+
//! ```
//!
//! The checksum is `0xFF` minus the sum of every byte from `apiId` through
//! the last data byte. Every byte after the delimiter that equals one of
//! [`ESCAPED_BYTES`] is sent as [`ESCAPE`] followed by the byte XOR `0x20`.

use bytes::BufMut;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use sensornet_packet::{DeviceId, OpCode, Packet, FRAME_DELIMITER, MAX_PAYLOAD_LEN};

use crate::{checksum, EncodeError, EncodeResult, FrameEncoder, FrameError, FrameParser, ParseEvent};

/// Escape prefix.
pub const ESCAPE: u8 = 0x7D;

/// Value XORed into an escaped byte.
pub const ESCAPE_XOR: u8 = 0x20;

/// Bytes that must be escaped on the wire.
pub const ESCAPED_BYTES: [u8; 4] = [0x7E, 0x7D, 0x11, 0x13];

/// Byte appended after every outgoing frame.
pub const FRAME_TERMINATOR: u8 = 0x00;

/// Frame id used for AT command frames; non-zero so the radio answers.
pub const COMMAND_FRAME_ID: u8 = 0x01;

/// Bytes of a receive-packet frame before the RF data (api id, source64, network, options).
pub const RECEIVE_HEADER_LEN: usize = 12;

/// Shortest receive-packet frame the parser accepts: header plus op and from.
pub const MIN_RECEIVE_FRAME_LEN: u16 = (RECEIVE_HEADER_LEN + 2) as u16;

/// Longest receive-packet frame the parser accepts.
pub const MAX_RECEIVE_FRAME_LEN: u16 = (RECEIVE_HEADER_LEN + 2 + MAX_PAYLOAD_LEN) as u16;

/// API frame type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApiFrameType {
    /// Local AT command.
    AtCommand = 0x08,
    /// Response to a local AT command.
    AtResponse = 0x88,
    /// Send RF data.
    TransmitRequest = 0x10,
    /// RF data received.
    ReceivePacket = 0x90,
}

/// Destination of outgoing transmit requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Addressing {
    /// Every radio on the network.
    #[default]
    Broadcast,
    /// Only the network coordinator.
    Coordinator,
}

impl Addressing {
    /// 64-bit destination address.
    pub const fn address64(self) -> u64 {
        match self {
            Addressing::Broadcast => 0x0000_0000_0000_FFFF,
            Addressing::Coordinator => 0x0000_0000_0000_0000,
        }
    }

    /// 16-bit destination network address.
    pub const fn network16(self) -> u16 {
        match self {
            Addressing::Broadcast => 0xFFFE,
            Addressing::Coordinator => 0x0000,
        }
    }
}

/// Returns true if `byte` must be escaped.
pub fn needs_escape(byte: u8) -> bool {
    ESCAPED_BYTES.contains(&byte)
}

fn put_escaped(buf: &mut Vec<u8>, byte: u8) {
    if needs_escape(byte) {
        buf.put_u8(ESCAPE);
        buf.put_u8(byte ^ ESCAPE_XOR);
    } else {
        buf.put_u8(byte);
    }
}

/// Wrap frame data in delimiter, length and checksum, escaping as needed.
fn frame(body: &[u8], terminate: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(body.len() * 2 + 6);
    buf.put_u8(FRAME_DELIMITER);
    for &b in (body.len() as u16).to_be_bytes().iter().chain(body) {
        put_escaped(&mut buf, b);
    }
    put_escaped(&mut buf, checksum(body));
    if terminate {
        buf.put_u8(FRAME_TERMINATOR);
    }
    buf
}

/// Lexer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Waiting,
    FrameLenMsb,
    FrameLenLsb,
    ApiId,
    Addr64 { seen: u8 },
    NetworkMsb,
    NetworkLsb,
    Options,
    Op,
    From,
    Data,
    Checksum,
}

/// API-mode frame parser. Accepts receive-packet frames only.
#[derive(Debug)]
pub struct ApiParser {
    state: State,
    escape_pending: bool,
    checksum: u8,
    frame_len: u16,
    frame_seen: u16,
    packet: Packet,
}

impl ApiParser {
    /// Create a parser waiting for the first delimiter.
    pub fn new() -> Self {
        ApiParser {
            state: State::Waiting,
            escape_pending: false,
            checksum: 0,
            frame_len: 0,
            frame_seen: 0,
            packet: Packet::default(),
        }
    }

    fn start_frame(&mut self) {
        if self.state != State::Waiting {
            trace!("delimiter inside frame, discarding partial frame");
        }
        self.state = State::FrameLenMsb;
        self.escape_pending = false;
        self.checksum = 0;
        self.frame_len = 0;
        self.frame_seen = 0;
        self.packet.clear();
    }

    /// Count a frame data byte towards the length and checksum.
    fn accumulate(&mut self, byte: u8) {
        self.checksum = self.checksum.wrapping_add(byte);
        self.frame_seen += 1;
    }

    fn end_of_frame(&self) -> bool {
        self.frame_seen >= self.frame_len
    }

    fn reject(&mut self, error: FrameError) -> ParseEvent<'_> {
        debug!("rejecting API frame: {}", error);
        self.state = State::Waiting;
        ParseEvent::InvalidPacket(error)
    }
}

impl Default for ApiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser for ApiParser {
    fn feed(&mut self, byte: u8) -> ParseEvent<'_> {
        // Outside a frame nothing but the delimiter means anything, escapes
        // included: a stray 0x7D on an idle line must not hide the next
        // frame start.
        if self.state == State::Waiting {
            if byte == FRAME_DELIMITER {
                self.start_frame();
                return ParseEvent::StartPacket;
            }
            return ParseEvent::Parsing;
        }

        if byte == ESCAPE {
            self.escape_pending = true;
            return ParseEvent::Parsing;
        }
        let byte = if self.escape_pending {
            self.escape_pending = false;
            byte ^ ESCAPE_XOR
        } else if byte == FRAME_DELIMITER {
            self.start_frame();
            return ParseEvent::StartPacket;
        } else {
            byte
        };

        match self.state {
            State::Waiting => {}
            State::FrameLenMsb => {
                self.frame_len = u16::from(byte) << 8;
                self.state = State::FrameLenLsb;
            }
            State::FrameLenLsb => {
                self.frame_len |= u16::from(byte);
                self.frame_seen = 0;
                self.state = State::ApiId;
            }
            State::ApiId => {
                self.accumulate(byte);
                if byte != ApiFrameType::ReceivePacket as u8 {
                    return self.reject(FrameError::UnsupportedFrameType(byte));
                }
                if !(MIN_RECEIVE_FRAME_LEN..=MAX_RECEIVE_FRAME_LEN).contains(&self.frame_len) {
                    let declared = self.frame_len;
                    return self.reject(FrameError::FrameLengthOutOfRange { declared });
                }
                self.state = State::Addr64 { seen: 0 };
            }
            State::Addr64 { seen } => {
                self.accumulate(byte);
                self.state = if seen + 1 == 8 {
                    State::NetworkMsb
                } else {
                    State::Addr64 { seen: seen + 1 }
                };
            }
            State::NetworkMsb => {
                self.accumulate(byte);
                self.state = State::NetworkLsb;
            }
            State::NetworkLsb => {
                self.accumulate(byte);
                self.state = State::Options;
            }
            State::Options => {
                self.accumulate(byte);
                self.state = State::Op;
            }
            State::Op => {
                self.accumulate(byte);
                self.packet.set_op(OpCode::from(byte));
                self.state = State::From;
            }
            State::From => {
                self.accumulate(byte);
                self.packet.set_from(DeviceId::new(byte));
                self.state = if self.end_of_frame() { State::Checksum } else { State::Data };
            }
            State::Data => {
                self.accumulate(byte);
                if self.packet.push_data(byte).is_err() {
                    let declared = self.frame_len;
                    return self.reject(FrameError::FrameLengthOutOfRange { declared });
                }
                if self.end_of_frame() {
                    self.state = State::Checksum;
                }
            }
            State::Checksum => {
                self.state = State::Waiting;
                let expected = 0xFFu8.wrapping_sub(self.checksum);
                if byte == expected {
                    return ParseEvent::ValidPacket(&self.packet);
                }
                debug!(
                    "checksum mismatch: expected 0x{:02X}, received 0x{:02X}",
                    expected, byte
                );
                return ParseEvent::InvalidPacket(FrameError::ChecksumMismatch {
                    expected,
                    received: byte,
                });
            }
        }

        ParseEvent::Parsing
    }

    fn reset(&mut self) {
        self.state = State::Waiting;
        self.escape_pending = false;
        self.checksum = 0;
        self.frame_len = 0;
        self.frame_seen = 0;
        self.packet.clear();
    }
}

/// API-mode encoder.
#[derive(Debug, Clone)]
pub struct ApiEncoder {
    device_id: DeviceId,
    addressing: Addressing,
}

impl ApiEncoder {
    /// Create an encoder sending as `device_id` to `addressing`.
    pub fn new(device_id: DeviceId, addressing: Addressing) -> Self {
        ApiEncoder {
            device_id,
            addressing,
        }
    }

    /// Current destination of transmit requests.
    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    /// Change the destination of transmit requests.
    pub fn set_addressing(&mut self, addressing: Addressing) {
        self.addressing = addressing;
    }

    /// Change the identity written into outgoing packets.
    pub fn set_device_id(&mut self, device_id: DeviceId) {
        self.device_id = device_id;
    }

    /// Encode the receive-packet frame a radio delivers to its host when
    /// `packet` arrives over the air from `source64`/`network16`.
    ///
    /// Radios do not terminate delivered frames, so neither does this.
    pub fn encode_receive_packet(source64: u64, network16: u16, packet: &Packet) -> Vec<u8> {
        let mut body = Vec::with_capacity(RECEIVE_HEADER_LEN + 2 + packet.len());
        body.put_u8(ApiFrameType::ReceivePacket as u8);
        body.put_u64(source64);
        body.put_u16(network16);
        // options: packet acknowledged
        body.put_u8(0x01);
        body.put_u8(packet.op().as_u8());
        body.put_u8(packet.from().as_u8());
        body.put_slice(packet.data());
        frame(&body, false)
    }
}

impl FrameEncoder for ApiEncoder {
    fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Transmit-request frame carrying `op`, this device's id and `payload`.
    fn encode_packet(&self, op: OpCode, payload: &[u8]) -> EncodeResult<Vec<u8>> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(EncodeError::PayloadTooLong {
                max: MAX_PAYLOAD_LEN,
                actual: payload.len(),
            });
        }

        let mut body = Vec::with_capacity(16 + payload.len());
        body.put_u8(ApiFrameType::TransmitRequest as u8);
        // frame id 0: no transmit status
        body.put_u8(0x00);
        body.put_u64(self.addressing.address64());
        body.put_u16(self.addressing.network16());
        // broadcast radius 0 = maximum hops
        body.put_u8(0x00);
        body.put_u8(0x00);
        body.put_u8(op.as_u8());
        body.put_u8(self.device_id.as_u8());
        body.put_slice(payload);
        Ok(frame(&body, true))
    }

    fn encode_command(&self, command: [u8; 2], argument: Option<&[u8]>) -> EncodeResult<Vec<u8>> {
        let arg = argument.unwrap_or(&[]);
        if arg.len() > MAX_PAYLOAD_LEN {
            return Err(EncodeError::CommandTooLong {
                max: MAX_PAYLOAD_LEN,
                actual: arg.len(),
            });
        }

        let mut body = Vec::with_capacity(4 + arg.len());
        body.put_u8(ApiFrameType::AtCommand as u8);
        body.put_u8(COMMAND_FRAME_ID);
        body.put_slice(&command);
        body.put_slice(arg);
        Ok(frame(&body, true))
    }
}
