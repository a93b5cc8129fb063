//! Wenglor sensor wire protocol
//!
//! This crate provides types and utilities for talking to a Wenglor optical
//! distance sensor over its proprietary binary framing protocol. Frames are
//! delimited by a `$` start marker and a `.` `;` stop pair, carry a fixed
//! 28-byte header followed by a variable payload, and are protected by an
//! XOR checksum.
//!
//! # Protocol Overview
//!
//! Requests and responses share one frame layout. The host builds a request
//! frame (command bytes plus up to four numeric parameters), the sensor
//! answers with a frame echoing the command opcode and carrying a nonzero
//! ack byte on success.
//!
//! # Example
//!
//! ```rust,ignore
//! use snowsensor_protocol::{SensorCommand, read_frame};
//!
//! // Build a request
//! let frame = SensorCommand::MeasureGap.request().encode(seq, device_addr)?;
//!
//! // Parse a response from any buffered byte source
//! let decoded = read_frame(&mut reader)?;
//! ```

mod commands;
mod constants;
mod error;
mod frame;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
