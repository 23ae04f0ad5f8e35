//! AT-mode framing.
//!
//! Used when the radio runs in transparent mode: whatever is written to the
//! serial line is delivered byte-for-byte to the other radios.
//!
//! ```text
//! +------+----+------+-----+-----------+----------+------+
//! | 0x7E | op | from | len | data[len] | checksum | '\n' |
//! +------+----+------+-----+-----------+----------+------+
//! ```
//!
//! The checksum is `0xFF` minus the sum of `op..data`. There is no escaping,
//! so the delimiter may not appear anywhere but the checksum byte. A
//! delimiter seen anywhere else restarts the parser.

use bytes::BufMut;
use log::{debug, trace};
use sensornet_packet::{DeviceId, OpCode, Packet, FRAME_DELIMITER, MAX_FRAME_LEN, MAX_PAYLOAD_LEN};

use crate::{checksum, EncodeError, EncodeResult, FrameEncoder, FrameError, FrameParser, ParseEvent};

/// Trailing byte of every AT-mode frame.
pub const FRAME_TERMINATOR: u8 = b'\n';

/// Sequence that switches a transparent-mode radio into command mode.
/// Must be surrounded by guard times of silence.
pub const COMMAND_MODE_SEQUENCE: &[u8] = b"+++";

/// Lexer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Waiting,
    InWord,
    Op,
    From,
    Length,
    Data,
    Checksum,
}

/// AT-mode frame parser.
#[derive(Debug)]
pub struct AtParser {
    state: State,
    checksum: u8,
    expected_len: usize,
    packet: Packet,
    word: heapless::Vec<u8, MAX_FRAME_LEN>,
}

impl AtParser {
    /// Create a parser waiting for the first delimiter.
    pub fn new() -> Self {
        AtParser {
            state: State::Waiting,
            checksum: 0,
            expected_len: 0,
            packet: Packet::default(),
            word: heapless::Vec::new(),
        }
    }

    fn start_frame(&mut self) {
        if !matches!(self.state, State::Waiting | State::InWord) {
            trace!("delimiter inside frame, discarding partial frame");
        }
        self.state = State::Op;
        self.checksum = 0;
        self.expected_len = 0;
        self.packet.clear();
    }

    fn accumulate(&mut self, byte: u8) {
        self.checksum = self.checksum.wrapping_add(byte);
    }

    fn push_word(&mut self, byte: u8) {
        // Words longer than the buffer are truncated.
        let _ = self.word.push(byte);
    }
}

impl Default for AtParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser for AtParser {
    fn feed(&mut self, byte: u8) -> ParseEvent<'_> {
        if self.state != State::Checksum && byte == FRAME_DELIMITER {
            self.start_frame();
            return ParseEvent::StartPacket;
        }

        match self.state {
            State::Waiting => {
                if byte.is_ascii_alphanumeric() {
                    self.word.clear();
                    self.push_word(byte);
                    self.state = State::InWord;
                }
            }
            State::InWord => {
                if byte.is_ascii_alphanumeric() {
                    self.push_word(byte);
                } else {
                    self.state = State::Waiting;
                    return ParseEvent::PlainWord(&self.word);
                }
            }
            State::Op => {
                self.accumulate(byte);
                self.packet.set_op(OpCode::from(byte));
                self.state = State::From;
            }
            State::From => {
                self.accumulate(byte);
                self.packet.set_from(DeviceId::new(byte));
                self.state = State::Length;
            }
            State::Length => {
                let declared = byte as usize;
                if declared > MAX_PAYLOAD_LEN {
                    self.state = State::Waiting;
                    return ParseEvent::InvalidPacket(FrameError::PayloadTooLong { declared });
                }
                self.accumulate(byte);
                self.expected_len = declared;
                self.state = if declared == 0 { State::Checksum } else { State::Data };
            }
            State::Data => {
                self.accumulate(byte);
                if self.packet.push_data(byte).is_err() {
                    self.state = State::Waiting;
                    return ParseEvent::InvalidPacket(FrameError::PayloadTooLong {
                        declared: self.expected_len,
                    });
                }
                if self.packet.len() == self.expected_len {
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
        self.checksum = 0;
        self.expected_len = 0;
        self.packet.clear();
        self.word.clear();
    }
}

/// AT-mode encoder.
#[derive(Debug, Clone)]
pub struct AtEncoder {
    device_id: DeviceId,
}

impl AtEncoder {
    /// Create an encoder sending as `device_id`.
    pub fn new(device_id: DeviceId) -> Self {
        AtEncoder { device_id }
    }

    /// Change the identity written into outgoing packets.
    pub fn set_device_id(&mut self, device_id: DeviceId) {
        self.device_id = device_id;
    }
}

impl FrameEncoder for AtEncoder {
    fn device_id(&self) -> DeviceId {
        self.device_id
    }

    fn encode_packet(&self, op: OpCode, payload: &[u8]) -> EncodeResult<Vec<u8>> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(EncodeError::PayloadTooLong {
                max: MAX_PAYLOAD_LEN,
                actual: payload.len(),
            });
        }

        let mut buf = Vec::with_capacity(payload.len() + 6);
        buf.put_u8(FRAME_DELIMITER);
        buf.put_u8(op.as_u8());
        buf.put_u8(self.device_id.as_u8());
        buf.put_u8(payload.len() as u8);
        buf.put_slice(payload);

        if let Some(offset) = buf[1..].iter().position(|&b| b == FRAME_DELIMITER) {
            return Err(EncodeError::ReservedByte {
                byte: FRAME_DELIMITER,
                offset: offset + 1,
            });
        }

        let chk = checksum(&buf[1..]);
        buf.put_u8(chk);
        buf.put_u8(FRAME_TERMINATOR);
        Ok(buf)
    }

    /// `"AT" cmd [" " argument] "\r\n"`, sent verbatim while in command mode.
    fn encode_command(&self, command: [u8; 2], argument: Option<&[u8]>) -> EncodeResult<Vec<u8>> {
        let arg_len = argument.map_or(0, |a| a.len() + 1);
        let max = MAX_FRAME_LEN - 6;
        if arg_len > max {
            return Err(EncodeError::CommandTooLong { max, actual: arg_len });
        }

        let mut buf = Vec::with_capacity(6 + arg_len);
        buf.put_slice(b"AT");
        buf.put_slice(&command);
        if let Some(arg) = argument {
            buf.put_u8(b' ');
            buf.put_slice(arg);
        }
        buf.put_slice(b"\r\n");
        Ok(buf)
    }
}
