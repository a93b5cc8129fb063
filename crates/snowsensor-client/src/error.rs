//! Client error types.

use snowsensor_protocol::ProtocolError;
use std::io;
use thiserror::Error;

use crate::session::ProtocolVariant;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the sensor client.
///
/// Connection and transport errors are fatal to the session; framing and
/// protocol-semantic errors are fatal to the in-flight exchange and are only
/// ever retried by the measurement sequencer's policy.
#[derive(Error, Debug)]
pub enum Error {
    /// Only the Wenglor protocol dialect is implemented.
    #[error("unsupported sensor protocol variant: {0:?}")]
    UnsupportedProtocol(ProtocolVariant),

    /// The configured host:port did not resolve to an address.
    #[error("could not resolve sensor address {target}: {source}")]
    AddressResolution {
        /// The host:port string that failed to resolve.
        target: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },

    /// Dialing the sensor failed.
    #[error("connection to sensor at {target} failed: {source}")]
    Connect {
        /// The host:port that was dialed.
        target: String,
        /// Dial failure.
        #[source]
        source: io::Error,
    },

    /// The connect attempt did not complete within the deadline.
    #[error("connection attempt to {target} timed out after {seconds} seconds")]
    ConnectTimeout {
        /// The host:port that was dialed.
        target: String,
        /// Deadline in seconds.
        seconds: u64,
    },

    /// A frame write did not complete within the deadline.
    #[error("sensor write timeout after {seconds} seconds")]
    WriteTimeout {
        /// Deadline in seconds.
        seconds: u64,
    },

    /// A frame read did not complete within the deadline. The connection is
    /// left at an unknown framing position; close and reconnect.
    #[error("sensor read timeout after {seconds} seconds")]
    ReadTimeout {
        /// Deadline in seconds.
        seconds: u64,
    },

    /// The OS accepted fewer bytes than the frame length.
    #[error("partial write: {written} of expected {expected} bytes")]
    PartialWrite {
        /// Bytes the OS reported written.
        written: usize,
        /// Bytes requested.
        expected: usize,
    },

    /// An earlier read timeout abandoned the stream mid-frame; no further
    /// reads are valid on this session.
    #[error("session desynchronized by an earlier read timeout, reconnect required")]
    Desynchronized,

    /// Frame encoding or decoding failed.
    #[error("frame error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Socket-level failure outside a timed operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The response did not echo the request command with a nonzero ack.
    #[error("unexpected response: cmd0=0x{cmd0:02X}, ack=0x{ack:02X}")]
    UnexpectedResponse {
        /// Command major byte of the response.
        cmd0: u8,
        /// Ack byte of the response.
        ack: u8,
    },

    /// The measurement response payload is too short to carry a raw value.
    #[error("measurement response too short: {actual} bytes, expected at least {expected}")]
    ShortMeasurement {
        /// Minimum payload length.
        expected: usize,
        /// Received payload length.
        actual: usize,
    },

    /// The sensor reported a zero or negative raw distance.
    #[error("invalid measurement value: {0} (zero or negative)")]
    NonPositiveReading(i32),

    /// Switching the laser failed.
    #[error("turn laser {state} failed: {source}")]
    LaserControl {
        /// The attempted state, "on" or "off".
        state: &'static str,
        /// Underlying cause.
        #[source]
        source: Box<Error>,
    },

    /// Every measurement attempt was rejected or non-positive.
    #[error("no valid measurement after {attempts} attempts")]
    MeasurementUnavailable {
        /// Number of attempts made.
        attempts: u32,
    },
}
