//! Measurement sequencer.
//!
//! Composes laser-on, warmup, retried gap reads, calibration and laser-off
//! into one end-to-end operation. Only this layer retries, and only where
//! the device behavior calls for it: measurement reads (the beam needs a
//! moment after bad readings) and laser-off (best effort, the value already
//! in hand outranks a clean shutdown). Laser-on is never retried: without a
//! confirmed ack no measurement is attempted at all.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use snowsensor_protocol::{SensorCommand, CMD_REQUEST};

use crate::config::SensorConfig;
use crate::error::{Error, Result};
use crate::session::Session;

/// Pause between failed measurement reads.
const MEASURE_RETRY_DELAY: Duration = Duration::from_millis(200);
/// Pause between failed laser-off attempts.
const LASER_OFF_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Minimum payload length of a gap response.
const GAP_PAYLOAD_MIN: usize = 8;
/// Offset of the raw i32 distance within the gap response payload.
const GAP_RAW_OFFSET: usize = 4;

/// One calibrated reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Calibrated height.
    pub height: f32,
    /// Unix timestamp in seconds, captured when the sequence finished.
    pub timestamp: i64,
}

impl Session {
    /// Switch the measurement laser on or off.
    ///
    /// Success requires the response to echo the request opcode with a
    /// nonzero ack; anything else is a laser-control failure naming the
    /// attempted state.
    pub fn set_laser(&mut self, on: bool) -> Result<()> {
        let state = if on { "on" } else { "off" };
        debug!("set laser {}", state);

        let frame = self
            .exchange(SensorCommand::SetLaser { on })
            .map_err(|e| Error::LaserControl {
                state,
                source: Box::new(e),
            })?;

        if frame.cmd0 != CMD_REQUEST || frame.ack == 0 {
            return Err(Error::LaserControl {
                state,
                source: Box::new(Error::UnexpectedResponse {
                    cmd0: frame.cmd0,
                    ack: frame.ack,
                }),
            });
        }
        Ok(())
    }

    /// Take one calibrated measurement.
    ///
    /// Laser on, warmup, up to `retry` gap reads, laser off (best effort),
    /// in that order. The timestamp is captured after the laser-off attempts
    /// finish; that ordering is part of the observable contract.
    pub fn get_measurement(&mut self) -> Result<Measurement> {
        self.set_laser(true)?;

        thread::sleep(Duration::from_millis(self.config().warmup_ms));

        let retry = self.config().retry;
        let mut raw = None;
        for attempt in 1..=retry {
            match self.measure_gap_once() {
                Ok(value) => {
                    raw = Some(value);
                    break;
                }
                Err(e) => {
                    warn!("measurement attempt {}/{} failed: {}", attempt, retry, e);
                    if attempt < retry {
                        thread::sleep(MEASURE_RETRY_DELAY);
                    }
                }
            }
        }

        let height = raw.map(|r| calibrated_height(r, self.config()));
        if let Some(h) = height {
            info!("measurement height = {}", h);
        }

        for attempt in 1..=retry {
            match self.set_laser(false) {
                Ok(()) => break,
                Err(e) => {
                    warn!("turn laser off failed: {}", e);
                    if attempt < retry {
                        thread::sleep(LASER_OFF_RETRY_DELAY);
                    }
                }
            }
        }

        let timestamp = unix_now();
        match height {
            Some(height) => Ok(Measurement { height, timestamp }),
            None => Err(Error::MeasurementUnavailable { attempts: retry }),
        }
    }

    /// One gap exchange: request a reading, validate the response shape,
    /// extract the raw distance. Positive raw values only.
    fn measure_gap_once(&mut self) -> Result<i32> {
        let frame = self.exchange(SensorCommand::MeasureGap)?;

        if frame.cmd0 != CMD_REQUEST || frame.ack == 0 {
            return Err(Error::UnexpectedResponse {
                cmd0: frame.cmd0,
                ack: frame.ack,
            });
        }
        if frame.payload.len() < GAP_PAYLOAD_MIN {
            return Err(Error::ShortMeasurement {
                expected: GAP_PAYLOAD_MIN,
                actual: frame.payload.len(),
            });
        }

        let p = &frame.payload;
        let raw = i32::from_le_bytes([
            p[GAP_RAW_OFFSET],
            p[GAP_RAW_OFFSET + 1],
            p[GAP_RAW_OFFSET + 2],
            p[GAP_RAW_OFFSET + 3],
        ]);
        debug!("received raw measurement: {}", raw);

        if raw <= 0 {
            return Err(Error::NonPositiveReading(raw));
        }
        Ok(raw)
    }
}

/// Convert a raw distance to a calibrated height.
///
/// The trailing +0.5 biases toward the nearest visible unit when the caller
/// displays the height with truncated precision.
pub fn calibrated_height(raw: i32, config: &SensorConfig) -> f32 {
    (config.zeroline - raw as f32) * config.scale + config.offset + 0.5
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
