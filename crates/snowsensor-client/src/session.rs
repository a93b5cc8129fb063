//! Transport session: one TCP connection plus its framing state.
//!
//! Every blocking I/O call is issued on its own thread and raced against a
//! deadline through a bounded channel. When the deadline wins, the in-flight
//! operation is abandoned (its eventual result is discarded) and for reads
//! the session is marked desynchronized, because the stream is then at an
//! unknown framing position. The documented recovery is to close the session
//! and reconnect, not to keep reading.

use std::io::{BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace};

use snowsensor_protocol::{read_frame, Frame, SensorCommand};

use crate::config::SensorConfig;
use crate::error::{Error, Result};

/// Deadline for establishing the TCP connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline for one frame write or one frame read.
pub const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Device address used by this protocol generation.
const DEVICE_ADDR: u32 = 0;

/// Sensor protocol dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVariant {
    /// Raw byte stream, no framing. Not implemented.
    Raw,
    /// Wenglor binary framing protocol.
    Wenglor,
}

/// One live connection to the sensor.
///
/// Owns the socket, a buffered reader over it, and the per-session sequence
/// counter (starts at 1, wraps mod 256). A session supports exactly one
/// in-flight exchange; callers reusing a session must serialize access.
pub struct Session {
    config: SensorConfig,
    stream: TcpStream,
    reader: Option<BufReader<TcpStream>>,
    seq: u8,
}

impl Session {
    /// Resolve and dial the configured sensor.
    ///
    /// Fails without any I/O if `variant` is not the implemented dialect.
    pub fn connect(variant: ProtocolVariant, config: &SensorConfig) -> Result<Session> {
        if variant != ProtocolVariant::Wenglor {
            return Err(Error::UnsupportedProtocol(variant));
        }

        let target = format!("{}:{}", config.host, config.port);
        let addr = match target.to_socket_addrs() {
            Ok(mut addrs) => addrs.next().ok_or_else(|| Error::AddressResolution {
                target: target.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no addresses resolved",
                ),
            })?,
            Err(e) => {
                return Err(Error::AddressResolution {
                    target,
                    source: e,
                })
            }
        };

        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                Error::ConnectTimeout {
                    target: target.clone(),
                    seconds: CONNECT_TIMEOUT.as_secs(),
                }
            } else {
                Error::Connect {
                    target: target.clone(),
                    source: e,
                }
            }
        })?;

        let reader = BufReader::new(stream.try_clone()?);
        info!("connection to sensor at {} established", target);

        Ok(Session {
            config: config.clone(),
            stream,
            reader: Some(reader),
            seq: 1,
        })
    }

    /// The configuration this session was built with.
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Send one request and receive its response.
    ///
    /// The protocol carries no usable correlation field, so the response is
    /// taken to be the immediate next frame; this session never pipelines.
    /// The first failing step propagates; retrying is the sequencer's call.
    pub fn exchange(&mut self, command: SensorCommand) -> Result<Frame> {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);

        let frame = command.request().encode(seq, DEVICE_ADDR)?;
        self.send(frame)?;
        self.receive()
    }

    /// Write one encoded frame, bounded by [`IO_TIMEOUT`].
    fn send(&mut self, frame: Vec<u8>) -> Result<()> {
        log_frame(">>", &frame);

        let mut stream = self.stream.try_clone()?;
        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let _ = tx.send(write_frame(&mut stream, &frame));
        });

        match rx.recv_timeout(IO_TIMEOUT) {
            Ok(result) => result,
            Err(_) => Err(Error::WriteTimeout {
                seconds: IO_TIMEOUT.as_secs(),
            }),
        }
    }

    /// Run the decode scan against the live stream, bounded by [`IO_TIMEOUT`].
    fn receive(&mut self) -> Result<Frame> {
        let mut reader = self.reader.take().ok_or(Error::Desynchronized)?;

        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let result = read_frame(&mut reader);
            let _ = tx.send((result, reader));
        });

        match rx.recv_timeout(IO_TIMEOUT) {
            Ok((result, reader)) => {
                self.reader = Some(reader);
                let frame = result?;
                debug!(
                    "received frame: seq={} ack={} cmd0=0x{:02X} cmd1=0x{:02X} payload_len={}",
                    frame.seq,
                    frame.ack,
                    frame.cmd0,
                    frame.cmd1,
                    frame.payload.len()
                );
                Ok(frame)
            }
            Err(_) => {
                // The abandoned thread keeps the reader; this session can
                // never read in sync again.
                // TODO: shut the socket down here so the abandoned reader
                // thread does not linger past the session.
                Err(Error::ReadTimeout {
                    seconds: IO_TIMEOUT.as_secs(),
                })
            }
        }
    }

    /// Release the connection. Further I/O on the session is invalid.
    pub fn close(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

fn write_frame(stream: &mut TcpStream, frame: &[u8]) -> Result<()> {
    let written = stream.write(frame)?;
    if written != frame.len() {
        return Err(Error::PartialWrite {
            written,
            expected: frame.len(),
        });
    }
    stream.flush()?;
    Ok(())
}

/// Trace-level hex dump of a raw frame, 16 bytes per line.
fn log_frame(dir: &str, frame: &[u8]) {
    for chunk in frame.chunks(16) {
        let mut line = String::with_capacity(chunk.len() * 3);
        for b in chunk {
            line.push_str(&format!(" {:02x}", b));
        }
        trace!("{}{}", dir, line);
    }
}
