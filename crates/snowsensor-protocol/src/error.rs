//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when encoding or decoding sensor frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// No start marker was seen within the scan window.
    #[error("start token not found after reading {scanned} bytes")]
    StartTokenNotFound {
        /// Number of bytes discarded while scanning.
        scanned: usize,
    },

    /// The stop marker pair was not seen before the frame buffer filled up.
    #[error("stop token not found within {limit} bytes")]
    StopTokenNotFound {
        /// Capacity of the frame buffer.
        limit: usize,
    },

    /// Captured frame is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Frame checksum does not match the frame contents.
    #[error("checksum mismatch: computed 0x{computed:02X}, frame claims 0x{claimed:02X}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        computed: u8,
        /// Checksum byte carried in the frame.
        claimed: u8,
    },

    /// Request payload does not fit in a frame. A contract violation on the
    /// caller's side, not something the sensor can cause.
    #[error("payload too large: {actual} bytes, maximum {max}")]
    PayloadTooLarge {
        /// Maximum payload size.
        max: usize,
        /// Offered payload size.
        actual: usize,
    },

    /// The underlying byte source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
