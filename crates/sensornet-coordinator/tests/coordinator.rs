//! Coordinator behaviour over whole request/response exchanges.

use parking_lot::Mutex;
use sensornet_codec::FrameMode;
use sensornet_coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorState, ManualClock, PacketOutcome, RequestStatus,
    RequestKind, SensorResponder,
};
use sensornet_link::{LinkConfig, PacketLink, PacketSender, Result as LinkResult};
use sensornet_packet::{DeviceId, OpCode, Packet};
use sensornet_transport::pipe::serial_pair;
use sensornet_transport::ThreadBackedTransport;
use std::sync::atomic::AtomicU16;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<OpCode>>,
}

impl PacketSender for RecordingSender {
    fn send_packet(&self, op: OpCode, _payload: &[u8]) -> LinkResult<()> {
        self.sent.lock().push(op);
        Ok(())
    }
}

fn coordinator(sensor_count: usize) -> (Coordinator, Arc<RecordingSender>, Arc<ManualClock>) {
    let sender = Arc::new(RecordingSender::default());
    let clock = Arc::new(ManualClock::default());
    let config = CoordinatorConfig {
        sensor_count,
        ..Default::default()
    };
    let coordinator = Coordinator::with_clock(&config, sender.clone(), clock.clone()).unwrap();
    (coordinator, sender, clock)
}

fn response(from: u8, raw: u16) -> Packet {
    let digits = format!("{:04X}", raw);
    Packet::new(OpCode::MeasureResponse, DeviceId::new(from), digits.as_bytes()).unwrap()
}

#[test]
fn test_busy_then_timeout() {
    let (coordinator, sender, clock) = coordinator(5);

    assert_eq!(
        coordinator.request_measure().unwrap(),
        RequestStatus::Accepted(RequestKind::Measure)
    );
    let busy = coordinator.request_measure().unwrap();
    assert_eq!(busy, RequestStatus::Busy(RequestKind::Measure));
    assert_eq!(
        busy.message(),
        "300 BUSY Measurement not requested as previous requests are still pending."
    );
    assert_eq!(
        coordinator.request_calibrate().unwrap().message(),
        "300 BUSY Calibration not requested as previous requests are still pending."
    );
    assert_eq!(sender.sent.lock().len(), 1);

    clock.advance(chrono::Duration::milliseconds(1001));
    assert!(coordinator.request_measure().unwrap().is_accepted());
    assert_eq!(*sender.sent.lock(), vec![OpCode::MeasureRequest, OpCode::MeasureRequest]);
}

#[test]
fn test_configured_timeout() {
    let sender = Arc::new(RecordingSender::default());
    let clock = Arc::new(ManualClock::default());
    let config = CoordinatorConfig {
        timeout_ms: 50,
        ..Default::default()
    };
    let coordinator = Coordinator::with_clock(&config, sender, clock.clone()).unwrap();
    coordinator.request_ping().unwrap();
    clock.advance(chrono::Duration::milliseconds(51));
    assert!(!coordinator.is_busy());
}

#[test]
fn test_calibration_converges_after_last_sensor() {
    const SENSORS: u8 = 4;
    let (coordinator, sender, _) = coordinator(usize::from(SENSORS) + 1);

    assert_eq!(coordinator.request_calibrate().unwrap().message(), "200 OK Calibration requested.");
    assert_eq!(coordinator.state(), CoordinatorState::PendingCalibrate);
    assert_eq!(*sender.sent.lock(), vec![OpCode::MeasureRequest]);

    // Sensor 1 answers twice; the later value wins.
    coordinator.on_packet_received(&response(1, 0x0010));
    for id in 1..SENSORS {
        let raw = 0x0100 * u16::from(id) + 7;
        let outcome = coordinator.on_packet_received(&response(id, raw));
        assert_eq!(
            outcome,
            PacketOutcome::Recorded {
                sensor: DeviceId::new(id),
                raw: u32::from(raw),
                calibrated: true,
                state: CoordinatorState::PendingCalibrate,
            }
        );
    }
    let last = coordinator.on_packet_received(&response(SENSORS, 0x0FFF));
    assert!(matches!(
        last,
        PacketOutcome::Recorded {
            state: CoordinatorState::Idle,
            ..
        }
    ));
    assert_eq!(coordinator.state(), CoordinatorState::Idle);

    for id in 1..SENSORS {
        let slot = coordinator.sensor(DeviceId::new(id)).unwrap();
        assert_eq!(slot.config.offset, u32::from(0x0100 * u16::from(id) + 7));
        assert_eq!(slot.corrected(), 0);
    }
    assert_eq!(coordinator.sensor(DeviceId::new(SENSORS)).unwrap().config.offset, 0x0FFF);

    // Later measurements are corrected by the offsets.
    coordinator.request_measure().unwrap();
    coordinator.on_packet_received(&response(2, 0x0207 + 82));
    let report = coordinator.snapshot_data();
    assert_eq!(report.sensors[2].value, 82);
    assert_eq!(report.sensors[2].converted, 2.0);
}

#[test]
fn test_calibration_ignores_unknown_sensors() {
    let (coordinator, _, _) = coordinator(3);
    coordinator.request_calibrate().unwrap();
    coordinator.on_packet_received(&response(1, 1));
    coordinator.on_packet_received(&response(9, 1));
    assert_eq!(coordinator.state(), CoordinatorState::PendingCalibrate);
    coordinator.on_packet_received(&response(2, 1));
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
}

#[test]
fn test_data_json_includes_master_slot() {
    let (coordinator, _, _) = coordinator(3);
    let json: serde_json::Value = serde_json::from_str(&coordinator.data_json().unwrap()).unwrap();
    let sensors = json["sensors"].as_array().unwrap();
    assert_eq!(sensors.len(), 3);
    assert_eq!(sensors[0]["offset"], 0);
}

fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_master_and_sensor_over_serial_line() {
    let (master_line, sensor_line) = serial_pair();

    let master_link = Arc::new(PacketLink::new(
        Arc::new(ThreadBackedTransport::new(master_line, 128)),
        &LinkConfig::master().with_mode(FrameMode::At),
    ));
    let config = CoordinatorConfig {
        timeout_ms: 60_000,
        ..Default::default()
    };
    let coordinator = Arc::new(Coordinator::new(&config, master_link.clone()).unwrap());
    master_link.init().unwrap();
    let master_rx = master_link.receiver(coordinator.handler()).spawn().unwrap();

    let sensor_link = Arc::new(PacketLink::new(
        Arc::new(ThreadBackedTransport::new(sensor_line, 128)),
        &LinkConfig::sensor(DeviceId::new(3)).with_mode(FrameMode::At),
    ));
    sensor_link.init().unwrap();
    let adc = Arc::new(AtomicU16::new(0x0123));
    let responder = SensorResponder::new(sensor_link.clone(), adc.clone());
    responder.announce().unwrap();
    let sensor_rx = sensor_link.receiver(responder).spawn().unwrap();

    assert!(coordinator.request_measure().unwrap().is_accepted());
    assert!(wait_for(|| coordinator
        .sensor(DeviceId::new(3))
        .map_or(false, |s| s.result.valid)));
    let slot = coordinator.sensor(DeviceId::new(3)).unwrap();
    assert_eq!(slot.result.value, 0x0123);
    assert!(coordinator.is_busy());

    master_link.shutdown().unwrap();
    sensor_link.shutdown().unwrap();
    let master_stats = master_rx.join().unwrap();
    let sensor_stats = sensor_rx.join().unwrap();
    // Announcement pong plus the measurement.
    assert_eq!(master_stats.valid_packets, 2);
    assert_eq!(sensor_stats.valid_packets, 1);
}
