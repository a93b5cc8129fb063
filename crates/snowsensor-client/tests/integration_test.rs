//! End-to-end tests against a scripted fake sensor.
//!
//! The fake device listens on a loopback TCP port, decodes real frames with
//! the protocol crate, records every exchange and answers from a script.
//! This exercises the full stack: codec, timed transport, request/response
//! exchange and the measurement sequencer.

use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use snowsensor_client::{Error, ProtocolVariant, SensorConfig, Session};
use snowsensor_protocol::{read_frame, Request, CMD_ACK, CMD_GAP, CMD_LASER, CMD_REQUEST};

// ============================================================================
// Fake Device
// ============================================================================

/// One request the fake device served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceEvent {
    LaserOn,
    LaserOff,
    Gap,
}

/// Script for the fake device.
struct DeviceBehavior {
    /// Whether laser-on requests are acknowledged.
    laser_on_ack: bool,
    /// Raw values returned to gap requests, in order; the last one repeats.
    raw_values: Vec<i32>,
}

impl Default for DeviceBehavior {
    fn default() -> Self {
        DeviceBehavior {
            laser_on_ack: true,
            raw_values: vec![1500],
        }
    }
}

struct FakeDevice {
    port: u16,
    events: Arc<Mutex<Vec<DeviceEvent>>>,
}

impl FakeDevice {
    /// Start a device on an ephemeral loopback port. Serves one connection.
    fn spawn(behavior: DeviceBehavior) -> FakeDevice {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let events: Arc<Mutex<Vec<DeviceEvent>>> = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&events);
        thread::spawn(move || {
            let (stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return,
            };
            serve(stream, &behavior, &log);
        });

        FakeDevice { port, events }
    }

    fn config(&self) -> SensorConfig {
        SensorConfig {
            host: "127.0.0.1".to_string(),
            port: self.port.to_string(),
            warmup_ms: 0,
            zeroline: 2200.0,
            scale: 0.1,
            offset: 0.0,
            retry: 4,
        }
    }

    fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().expect("events lock").clone()
    }
}

fn serve(stream: TcpStream, behavior: &DeviceBehavior, log: &Mutex<Vec<DeviceEvent>>) {
    let mut writer = stream.try_clone().expect("clone stream");
    let mut reader = BufReader::new(stream);
    let mut gap_count = 0usize;

    loop {
        let request = match read_frame(&mut reader) {
            Ok(frame) => frame,
            Err(_) => return, // client hung up
        };

        let reply = match (request.cmd0, request.cmd1) {
            (CMD_REQUEST, CMD_LASER) => {
                let on = request.param1 == 0;
                log.lock().expect("events lock").push(if on {
                    DeviceEvent::LaserOn
                } else {
                    DeviceEvent::LaserOff
                });

                let acked = !on || behavior.laser_on_ack;
                Request {
                    ack: if acked { 1 } else { 0 },
                    cmd0: CMD_REQUEST,
                    cmd1: CMD_ACK,
                    ..Default::default()
                }
            }
            (CMD_REQUEST, CMD_GAP) => {
                log.lock().expect("events lock").push(DeviceEvent::Gap);

                let idx = gap_count.min(behavior.raw_values.len() - 1);
                let raw = behavior.raw_values[idx];
                gap_count += 1;

                let mut payload = vec![0u8; 4];
                payload.extend_from_slice(&raw.to_le_bytes());
                Request {
                    ack: 1,
                    cmd0: CMD_REQUEST,
                    cmd1: CMD_GAP,
                    payload,
                    ..Default::default()
                }
            }
            _ => return,
        };

        let bytes = reply.encode(request.seq, 0).expect("encode reply");
        if writer.write_all(&bytes).is_err() {
            return;
        }
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_end_to_end_measurement() {
    let device = FakeDevice::spawn(DeviceBehavior::default());
    let mut session =
        Session::connect(ProtocolVariant::Wenglor, &device.config()).expect("connect");

    let measurement = session.get_measurement().expect("measurement");
    assert_eq!(measurement.height, 70.5);
    assert!(measurement.timestamp > 0);

    // Exactly one read attempt, one laser-on, one laser-off exchange.
    assert_eq!(
        device.events(),
        vec![DeviceEvent::LaserOn, DeviceEvent::Gap, DeviceEvent::LaserOff]
    );
    session.close();
}

#[test]
fn test_retry_bound_on_non_positive_readings() {
    let device = FakeDevice::spawn(DeviceBehavior {
        raw_values: vec![-5],
        ..Default::default()
    });
    let mut session =
        Session::connect(ProtocolVariant::Wenglor, &device.config()).expect("connect");

    match session.get_measurement() {
        Err(Error::MeasurementUnavailable { attempts }) => assert_eq!(attempts, 4),
        other => panic!("expected MeasurementUnavailable, got {:?}", other),
    }

    // Exactly `retry` read attempts, and the laser is still switched off.
    assert_eq!(
        device.events(),
        vec![
            DeviceEvent::LaserOn,
            DeviceEvent::Gap,
            DeviceEvent::Gap,
            DeviceEvent::Gap,
            DeviceEvent::Gap,
            DeviceEvent::LaserOff,
        ]
    );
}

#[test]
fn test_recovers_after_bad_readings() {
    let device = FakeDevice::spawn(DeviceBehavior {
        raw_values: vec![-1, 0, 1200],
        ..Default::default()
    });
    let mut session =
        Session::connect(ProtocolVariant::Wenglor, &device.config()).expect("connect");

    let measurement = session.get_measurement().expect("measurement");
    assert_eq!(measurement.height, 100.5);

    let gaps = device
        .events()
        .iter()
        .filter(|e| **e == DeviceEvent::Gap)
        .count();
    assert_eq!(gaps, 3);
}

#[test]
fn test_laser_on_failure_aborts_before_any_reading() {
    let device = FakeDevice::spawn(DeviceBehavior {
        laser_on_ack: false,
        ..Default::default()
    });
    let mut session =
        Session::connect(ProtocolVariant::Wenglor, &device.config()).expect("connect");

    match session.get_measurement() {
        Err(Error::LaserControl { state, .. }) => assert_eq!(state, "on"),
        other => panic!("expected LaserControl, got {:?}", other),
    }

    // No measurement request may ever precede a confirmed laser-on ack.
    assert_eq!(device.events(), vec![DeviceEvent::LaserOn]);
}

#[test]
fn test_standalone_laser_control() {
    let device = FakeDevice::spawn(DeviceBehavior::default());
    let mut session =
        Session::connect(ProtocolVariant::Wenglor, &device.config()).expect("connect");

    session.set_laser(true).expect("laser on");
    session.set_laser(false).expect("laser off");

    assert_eq!(
        device.events(),
        vec![DeviceEvent::LaserOn, DeviceEvent::LaserOff]
    );
}

#[test]
fn test_unsupported_variant_fails_without_io() {
    let config = SensorConfig {
        // Nothing listens here; the variant check must fire first.
        host: "127.0.0.1".to_string(),
        port: "1".to_string(),
        ..SensorConfig::default()
    };
    assert!(matches!(
        Session::connect(ProtocolVariant::Raw, &config),
        Err(Error::UnsupportedProtocol(ProtocolVariant::Raw))
    ));
}

#[test]
fn test_connect_refused() {
    // Grab an ephemeral port, then close the listener so the dial fails.
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let config = SensorConfig {
        host: "127.0.0.1".to_string(),
        port: port.to_string(),
        ..SensorConfig::default()
    };
    assert!(matches!(
        Session::connect(ProtocolVariant::Wenglor, &config),
        Err(Error::Connect { .. })
    ));
}
