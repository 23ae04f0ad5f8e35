//! Protocol constants.

/// Start-of-frame delimiter, shared by both framing variants.
pub const FRAME_DELIMITER: u8 = 0x7E;

/// Maximum number of payload bytes carried by a single packet.
pub const MAX_PAYLOAD_LEN: usize = 68;

/// Maximum size of an AT-mode frame between the delimiter and the trailing
/// newline (op, from, length, payload, checksum). Also bounds plain words.
pub const MAX_FRAME_LEN: usize = 72;

/// Number of sensor slots on the master, including the unused slot 0.
pub const DEFAULT_SENSOR_COUNT: usize = 5;
