//! Protocol constants
//!
//! These constants define the marker bytes, command codes, field offsets and
//! size limits of the Wenglor binary framing protocol. The byte layout is a
//! fixed contract with the sensor firmware and must not change.

// ============================================================================
// Marker Bytes
// ============================================================================

/// Start-of-frame marker.
pub const FRAME_START: u8 = b'$';
/// First byte of the stop marker pair.
pub const FRAME_STOP0: u8 = b'.';
/// Second byte of the stop marker pair.
pub const FRAME_STOP1: u8 = b';';
/// Frame type byte. Only one frame type exists in this protocol generation.
pub const FRAME_TYPE: u8 = 0;

// ============================================================================
// Command Codes (host → sensor)
// ============================================================================

/// Request opcode. All host-initiated frames use this major command.
pub const CMD_REQUEST: u8 = 0x0A;
/// Gap (distance) measurement sub-opcode.
pub const CMD_GAP: u8 = 0x00;
/// Acknowledge sub-opcode.
pub const CMD_ACK: u8 = 0x01;
/// Laser control sub-opcode.
pub const CMD_LASER: u8 = 0x09;

// ============================================================================
// Field Offsets
// ============================================================================

/// Start marker.
pub const OFF_START: usize = 0;
/// Frame type.
pub const OFF_FRAME_TYPE: usize = 1;
/// Sequence number (wraps mod 256).
pub const OFF_SEQ: usize = 2;
/// Total frame length, u16 little-endian (header + payload + trailer).
pub const OFF_FRAME_LEN: usize = 4;
/// Ack/flag byte: 0 on requests, nonzero ack code on responses.
pub const OFF_ACK: usize = 6;
/// Device address, u32 little-endian.
pub const OFF_DEVICE_ADDR: usize = 8;
/// Command major byte.
pub const OFF_CMD0: usize = 12;
/// Command minor byte.
pub const OFF_CMD1: usize = 13;
/// First i16 parameter.
pub const OFF_PARAM1: usize = 14;
/// Second i16 parameter.
pub const OFF_PARAM2: usize = 16;
/// Third i16 parameter.
pub const OFF_PARAM3: usize = 18;
/// i32 parameter.
pub const OFF_PARAM4: usize = 20;
/// Payload length, u32 little-endian.
pub const OFF_PAYLOAD_LEN: usize = 24;
/// First payload byte.
pub const OFF_PAYLOAD: usize = 28;

// ============================================================================
// Sizes
// ============================================================================

/// Frame bytes that are not payload: 28-byte header plus checksum, reserved
/// byte and the two stop markers.
pub const FRAME_OVERHEAD: usize = 32;
/// Minimum length of a valid frame (empty payload).
pub const MIN_FRAME_LEN: usize = FRAME_OVERHEAD;
/// Largest frame the decoder will accumulate before giving up on the stop
/// marker pair.
pub const MAX_FRAME_LEN: usize = 1120;
/// Largest payload that fits in [`MAX_FRAME_LEN`].
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - FRAME_OVERHEAD;
/// How many leading noise bytes the decoder discards while scanning for the
/// start marker before declaring the stream unframeable.
pub const START_SCAN_LIMIT: usize = 2048;
