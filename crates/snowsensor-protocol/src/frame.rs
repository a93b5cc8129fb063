//! Frame encoding/decoding utilities.
//!
//! Every message in either direction uses the same fixed layout:
//!
//! ```text
//! +-----+------+-----+------+---------+-----+-------------+--------------+
//! | '$' | type | seq | rsvd | len u16 | ack | header cont | payload[0..N]|
//! +-----+------+-----+------+---------+-----+-------------+--------------+
//! | checksum | rsvd | '.' | ';' |
//! +----------+------+-----+-----+
//! ```
//!
//! The link offers no message boundaries, so the decoder never indexes into
//! a pre-read buffer: it scans the byte stream for the start marker
//! (discarding noise), then accumulates one byte at a time until the stop
//! marker pair. Partial frames, leading garbage and concatenated frames from
//! timing drift therefore cannot desynchronize subsequent reads.

use std::io::Read;

use crate::constants::*;
use crate::error::ProtocolError;

/// A logical request before it is laid out on the wire.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Ack/flag byte. 0 on host requests; the sensor sets it nonzero in
    /// responses, so it is only nonzero here when emulating a device.
    pub ack: u8,
    /// Command major byte.
    pub cmd0: u8,
    /// Command minor byte.
    pub cmd1: u8,
    /// First parameter.
    pub param1: i16,
    /// Second parameter.
    pub param2: i16,
    /// Third parameter.
    pub param3: i16,
    /// Fourth (wide) parameter.
    pub param4: i32,
    /// Variable payload.
    pub payload: Vec<u8>,
}

impl Request {
    /// Lay the request out on the wire.
    ///
    /// Produces a buffer of exactly `32 + payload.len()` bytes with the
    /// checksum computed over everything before the checksum byte. The
    /// sequence number and device address come from the session.
    pub fn encode(&self, seq: u8, device_addr: u32) -> Result<Vec<u8>, ProtocolError> {
        let dlen = self.payload.len();
        if dlen > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge {
                max: MAX_PAYLOAD_LEN,
                actual: dlen,
            });
        }

        let total = FRAME_OVERHEAD + dlen;
        let mut buf = vec![0u8; total];

        buf[OFF_START] = FRAME_START;
        buf[OFF_FRAME_TYPE] = FRAME_TYPE;
        buf[OFF_SEQ] = seq;
        // offset 3 reserved
        buf[OFF_FRAME_LEN..OFF_FRAME_LEN + 2].copy_from_slice(&(total as u16).to_le_bytes());
        buf[OFF_ACK] = self.ack;
        // offset 7 reserved
        buf[OFF_DEVICE_ADDR..OFF_DEVICE_ADDR + 4].copy_from_slice(&device_addr.to_le_bytes());
        buf[OFF_CMD0] = self.cmd0;
        buf[OFF_CMD1] = self.cmd1;
        buf[OFF_PARAM1..OFF_PARAM1 + 2].copy_from_slice(&self.param1.to_le_bytes());
        buf[OFF_PARAM2..OFF_PARAM2 + 2].copy_from_slice(&self.param2.to_le_bytes());
        buf[OFF_PARAM3..OFF_PARAM3 + 2].copy_from_slice(&self.param3.to_le_bytes());
        buf[OFF_PARAM4..OFF_PARAM4 + 4].copy_from_slice(&self.param4.to_le_bytes());
        buf[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 4].copy_from_slice(&(dlen as u32).to_le_bytes());
        buf[OFF_PAYLOAD..OFF_PAYLOAD + dlen].copy_from_slice(&self.payload);

        let ck = OFF_PAYLOAD + dlen;
        buf[ck] = xor_checksum(&buf[..ck]);
        // ck + 1 reserved
        buf[ck + 2] = FRAME_STOP0;
        buf[ck + 3] = FRAME_STOP1;

        Ok(buf)
    }
}

/// A validated frame received from the sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sequence number echoed by the sensor.
    pub seq: u8,
    /// Ack/flag byte. Nonzero means the sensor accepted the request.
    pub ack: u8,
    /// Command major byte.
    pub cmd0: u8,
    /// Command minor byte.
    pub cmd1: u8,
    /// First parameter.
    pub param1: i16,
    /// Second parameter.
    pub param2: i16,
    /// Third parameter.
    pub param3: i16,
    /// Fourth (wide) parameter.
    pub param4: i32,
    /// Payload bytes (frame offsets 28..len-4).
    pub payload: Vec<u8>,
}

/// XOR of all bytes in `input`.
pub fn xor_checksum(input: &[u8]) -> u8 {
    input.iter().fold(0, |sum, b| sum ^ b)
}

/// Read and validate one frame from a byte source.
///
/// Scans forward for the start marker, discarding up to
/// [`START_SCAN_LIMIT`] noise bytes, then accumulates bytes until the stop
/// marker pair. The captured candidate must be at least [`MIN_FRAME_LEN`]
/// bytes and carry a matching XOR checksum.
///
/// The source should be buffered (e.g. a `BufReader`); bytes are consumed
/// one at a time.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Frame, ProtocolError> {
    let mut buf = vec![0u8; MAX_FRAME_LEN];

    // Find the start of frame.
    let mut skipped = 0;
    loop {
        let b = read_byte(reader)?;
        if b == FRAME_START {
            buf[0] = b;
            break;
        }
        skipped += 1;
        if skipped >= START_SCAN_LIMIT {
            return Err(ProtocolError::StartTokenNotFound {
                scanned: START_SCAN_LIMIT,
            });
        }
    }
    if skipped > 0 {
        log::trace!("discarded {} noise bytes before start marker", skipped);
    }

    // Read until both stop markers.
    let mut length = None;
    for i in 1..buf.len() {
        let b = read_byte(reader)?;
        buf[i] = b;

        if b == FRAME_STOP1 && buf[i - 1] == FRAME_STOP0 {
            length = Some(i + 1);
            break;
        }
    }
    let length = length.ok_or(ProtocolError::StopTokenNotFound {
        limit: MAX_FRAME_LEN,
    })?;

    if length < MIN_FRAME_LEN {
        return Err(ProtocolError::FrameTooShort {
            expected: MIN_FRAME_LEN,
            actual: length,
        });
    }

    let frame = &buf[..length];
    let computed = xor_checksum(&frame[..length - 4]);
    let claimed = frame[length - 4];
    if computed != claimed {
        return Err(ProtocolError::ChecksumMismatch { computed, claimed });
    }

    Ok(Frame {
        seq: frame[OFF_SEQ],
        ack: frame[OFF_ACK],
        cmd0: frame[OFF_CMD0],
        cmd1: frame[OFF_CMD1],
        param1: i16::from_le_bytes([frame[OFF_PARAM1], frame[OFF_PARAM1 + 1]]),
        param2: i16::from_le_bytes([frame[OFF_PARAM2], frame[OFF_PARAM2 + 1]]),
        param3: i16::from_le_bytes([frame[OFF_PARAM3], frame[OFF_PARAM3 + 1]]),
        param4: i32::from_le_bytes([
            frame[OFF_PARAM4],
            frame[OFF_PARAM4 + 1],
            frame[OFF_PARAM4 + 2],
            frame[OFF_PARAM4 + 3],
        ]),
        payload: frame[OFF_PAYLOAD..length - 4].to_vec(),
    })
}

fn read_byte<R: Read>(reader: &mut R) -> Result<u8, ProtocolError> {
    let mut b = [0u8; 1];
    reader.read_exact(&mut b)?;
    Ok(b[0])
}
