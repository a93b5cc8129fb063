//! Snow-depth sensor client.
//!
//! Drives a Wenglor optical distance sensor over a TCP link: switches the
//! measurement laser on, waits for the beam to stabilize, samples the raw
//! distance with bounded retries, converts it to a calibrated height and
//! switches the laser back off. One [`Session`] owns one connection and one
//! in-flight operation at a time; every blocking I/O call is raced against
//! a deadline so an unresponsive sensor can never hang the caller.

pub mod config;
pub mod error;
pub mod measurement;
pub mod session;

pub use config::SensorConfig;
pub use error::{Error, Result};
pub use measurement::Measurement;
pub use session::{ProtocolVariant, Session};
