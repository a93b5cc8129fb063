//! Commands that can be sent to the sensor.

use crate::constants::*;
use crate::frame::Request;

/// Commands the host can send to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCommand {
    /// Request one raw gap (distance) measurement.
    MeasureGap,

    /// Switch the measurement laser on or off.
    SetLaser {
        /// Desired laser state.
        on: bool,
    },
}

impl SensorCommand {
    /// Build the request frame fields for this command.
    pub fn request(&self) -> Request {
        match self {
            SensorCommand::MeasureGap => Request {
                cmd0: CMD_REQUEST,
                cmd1: CMD_GAP,
                ..Default::default()
            },

            SensorCommand::SetLaser { on } => Request {
                cmd0: CMD_REQUEST,
                cmd1: CMD_LASER,
                // The firmware encodes the laser state inverted: 0 switches
                // the laser on, 1 switches it off.
                param1: if *on { 0 } else { 1 },
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_gap_request() {
        let req = SensorCommand::MeasureGap.request();
        assert_eq!(req.cmd0, CMD_REQUEST);
        assert_eq!(req.cmd1, CMD_GAP);
        assert_eq!(req.ack, 0);
        assert_eq!((req.param1, req.param2, req.param3, req.param4), (0, 0, 0, 0));
        assert!(req.payload.is_empty());
    }

    #[test]
    fn test_laser_state_encoding_is_inverted() {
        let on = SensorCommand::SetLaser { on: true }.request();
        assert_eq!(on.cmd1, CMD_LASER);
        assert_eq!(on.param1, 0);

        let off = SensorCommand::SetLaser { on: false }.request();
        assert_eq!(off.cmd1, CMD_LASER);
        assert_eq!(off.param1, 1);
    }
}
