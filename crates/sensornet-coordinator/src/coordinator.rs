//! The master unit's request/response state machine.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sensornet_link::{PacketHandler, PacketSender};
use sensornet_metrics::{metric_defs, metrics};
use sensornet_packet::{decode_reading, DeviceId, OpCode, Packet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    Clock, CoordinatorConfig, DataReport, RequestKind, RequestStatus, Result, SensorSlot,
    SensorTable, SystemClock,
};

/// What the coordinator is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorState {
    /// Nothing outstanding.
    #[default]
    Idle,
    /// Waiting for measurement responses.
    PendingMeasure,
    /// Waiting for every sensor to report its zero point.
    PendingCalibrate,
}

impl CoordinatorState {
    fn as_str(self) -> &'static str {
        match self {
            CoordinatorState::Idle => "idle",
            CoordinatorState::PendingMeasure => "pending_measure",
            CoordinatorState::PendingCalibrate => "pending_calibrate",
        }
    }
}

/// Why a received packet was not acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Measure response from the master's id or beyond the sensor table.
    UnknownSensor(DeviceId),
    /// An op the master does not handle.
    UnsupportedOp(OpCode),
}

impl DiscardReason {
    fn as_str(self) -> &'static str {
        match self {
            DiscardReason::UnknownSensor(_) => "unknown_sensor",
            DiscardReason::UnsupportedOp(_) => "unsupported_op",
        }
    }
}

/// What [`Coordinator::on_packet_received`] did with a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Answered a ping with a pong.
    Ponged,
    /// Answering a ping failed.
    PongFailed,
    /// A pong arrived.
    PongReceived(DeviceId),
    /// A measure request arrived; the master does not answer those.
    IgnoredMeasureRequest,
    /// A reading was stored.
    Recorded {
        /// Sending sensor.
        sensor: DeviceId,
        /// Decoded raw value.
        raw: u32,
        /// The reading became the sensor's offset.
        calibrated: bool,
        /// State after the reading was handled.
        state: CoordinatorState,
    },
    /// Nothing was done.
    Discarded(DiscardReason),
}

#[derive(Debug, Default)]
struct Session {
    state: CoordinatorState,
    last_request_time: Option<DateTime<Utc>>,
}

/// Request/response state machine of the master unit.
///
/// Request methods may be called from any thread. The session lock (state
/// and last request time) is taken before any sensor lock, and sensor locks
/// are taken in ascending order.
pub struct Coordinator {
    sender: Arc<dyn PacketSender>,
    clock: Arc<dyn Clock>,
    timeout: chrono::Duration,
    session: Mutex<Session>,
    sensors: SensorTable,
}

impl Coordinator {
    /// Create a coordinator using the system clock.
    ///
    /// Fails with [`CoordinatorError::InvalidConfig`](crate::CoordinatorError::InvalidConfig) unless the table has
    /// between 2 and 256 slots.
    pub fn new(config: &CoordinatorConfig, sender: Arc<dyn PacketSender>) -> Result<Self> {
        Self::with_clock(config, sender, Arc::new(SystemClock))
    }

    /// Create a coordinator reading time from `clock`.
    pub fn with_clock(
        config: &CoordinatorConfig,
        sender: Arc<dyn PacketSender>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Coordinator {
            sender,
            clock,
            timeout: config.timeout(),
            session: Mutex::new(Session::default()),
            sensors: SensorTable::new(config.sensor_count),
        })
    }

    /// Current state, without applying the timeout.
    pub fn state(&self) -> CoordinatorState {
        self.session.lock().state
    }

    /// Returns true while a request is outstanding and has not timed out.
    /// A timed-out request is abandoned and the state returns to idle.
    pub fn is_busy(&self) -> bool {
        let mut session = self.session.lock();
        self.check_busy(&mut session)
    }

    fn check_busy(&self, session: &mut Session) -> bool {
        if let Some(last) = session.last_request_time {
            if self.clock.now() - last > self.timeout {
                if session.state != CoordinatorState::Idle {
                    debug!(state = session.state.as_str(), "outstanding request timed out");
                }
                session.state = CoordinatorState::Idle;
            }
        }
        session.state != CoordinatorState::Idle
    }

    /// Broadcast a measure request.
    pub fn request_measure(&self) -> Result<RequestStatus> {
        self.request(RequestKind::Measure, OpCode::MeasureRequest, CoordinatorState::PendingMeasure)
    }

    /// Start a calibration round: clear every sensor's calibrated flag and
    /// broadcast a measure request. Each response becomes that sensor's offset.
    pub fn request_calibrate(&self) -> Result<RequestStatus> {
        self.request(
            RequestKind::Calibrate,
            OpCode::MeasureRequest,
            CoordinatorState::PendingCalibrate,
        )
    }

    /// Broadcast a ping.
    ///
    /// The network is marked busy the same way a calibration does, so
    /// readings that arrive before the timeout are latched as offsets for
    /// sensors that have not reported since the last calibration round.
    pub fn request_ping(&self) -> Result<RequestStatus> {
        self.request(RequestKind::Ping, OpCode::Ping, CoordinatorState::PendingCalibrate)
    }

    fn request(&self, kind: RequestKind, op: OpCode, pending: CoordinatorState) -> Result<RequestStatus> {
        let mut session = self.session.lock();
        if self.check_busy(&mut session) {
            debug!(request = kind.as_str(), state = session.state.as_str(), "request refused, busy");
            record_request(kind, "busy");
            return Ok(RequestStatus::Busy(kind));
        }

        if kind == RequestKind::Calibrate {
            self.sensors.reset_calibration();
            self.record_calibrated_gauge();
        }

        let previous = (session.state, session.last_request_time);
        session.state = pending;
        session.last_request_time = Some(self.clock.now());

        if let Err(e) = self.sender.send_packet(op, &[]) {
            session.state = previous.0;
            session.last_request_time = previous.1;
            warn!(request = kind.as_str(), error = %e, "request could not be sent");
            record_request(kind, "failed");
            return Err(e.into());
        }

        info!(request = kind.as_str(), "request sent");
        record_request(kind, "sent");
        Ok(RequestStatus::Accepted(kind))
    }

    /// Readings of every slot, corrected by their offsets. Does not touch the
    /// request state.
    pub fn snapshot_data(&self) -> DataReport {
        let slots = self.sensors.snapshot();
        for (i, slot) in slots.iter().enumerate() {
            debug!(
                sensor = i,
                raw = slot.result.value,
                offset = slot.config.offset,
                corrected = slot.corrected(),
                "sensor data"
            );
        }
        DataReport::from_slots(&slots)
    }

    /// [`snapshot_data`](Self::snapshot_data) as JSON.
    pub fn data_json(&self) -> Result<String> {
        self.snapshot_data().to_json()
    }

    /// Copy of one sensor's slot.
    pub fn sensor(&self, id: DeviceId) -> Option<SensorSlot> {
        self.sensors.get(id)
    }

    /// Number of slots in the sensor table, including the master's.
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Act on a packet from the network.
    pub fn on_packet_received(&self, packet: &Packet) -> PacketOutcome {
        let from = packet.from();
        match packet.op() {
            OpCode::Ping => {
                debug!(from = %from, "ping received");
                match self.sender.send_packet(OpCode::Pong, &[]) {
                    Ok(()) => PacketOutcome::Ponged,
                    Err(e) => {
                        warn!(error = %e, "failed to answer ping");
                        PacketOutcome::PongFailed
                    }
                }
            }
            OpCode::Pong => {
                info!(from = %from, "pong received");
                PacketOutcome::PongReceived(from)
            }
            OpCode::MeasureRequest => {
                debug!("measure request received, ignored on master");
                PacketOutcome::IgnoredMeasureRequest
            }
            OpCode::MeasureResponse => self.record_measurement(from, packet.data()),
            op => {
                warn!(from = %from, %op, "unsupported op, packet discarded");
                self.discard(DiscardReason::UnsupportedOp(op))
            }
        }
    }

    fn record_measurement(&self, from: DeviceId, digits: &[u8]) -> PacketOutcome {
        if !self.sensors.is_sensor(from) {
            warn!(sensor = %from, "measure response from unknown sensor, ignored");
            return self.discard(DiscardReason::UnknownSensor(from));
        }

        let raw = decode_reading(digits);
        let now = self.clock.now();
        let mut session = self.session.lock();

        let calibrating = session.state == CoordinatorState::PendingCalibrate;
        {
            let Some(mut slot) = self.sensors.lock(from) else {
                return self.discard(DiscardReason::UnknownSensor(from));
            };
            slot.result.value = raw;
            slot.result.observed_at = Some(now);
            slot.result.valid = true;
            if calibrating {
                slot.config.offset = raw;
                slot.config.calibrated = true;
            }
        }

        if let Some(last) = session.last_request_time {
            if session.state != CoordinatorState::Idle {
                let elapsed = (now - last).num_milliseconds().max(0) as f64;
                let request = if calibrating { "calibrate" } else { "measure" };
                metrics::histogram!(metric_defs::COORDINATOR_RESPONSE_TIME.name, "request" => request)
                    .record(elapsed);
            }
        }

        if calibrating {
            self.record_calibrated_gauge();
            if self.sensors.all_calibrated() {
                info!("all sensors calibrated");
                session.state = CoordinatorState::Idle;
            }
        }

        debug!(sensor = %from, raw, calibrated = calibrating, "measurement recorded");
        PacketOutcome::Recorded {
            sensor: from,
            raw,
            calibrated: calibrating,
            state: session.state,
        }
    }

    fn discard(&self, reason: DiscardReason) -> PacketOutcome {
        metrics::counter!(
            metric_defs::COORDINATOR_DISCARDED_RESPONSES.name,
            "reason" => reason.as_str()
        )
        .increment(1);
        PacketOutcome::Discarded(reason)
    }

    fn record_calibrated_gauge(&self) {
        metrics::gauge!(metric_defs::COORDINATOR_CALIBRATED_SENSORS.name)
            .set(self.sensors.calibrated_count() as f64);
    }

    /// Packet handler feeding this coordinator, for a [`sensornet_link::Receiver`].
    pub fn handler(self: &Arc<Self>) -> CoordinatorHandler {
        CoordinatorHandler(self.clone())
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.lock();
        f.debug_struct("Coordinator")
            .field("state", &session.state)
            .field("last_request_time", &session.last_request_time)
            .field("timeout", &self.timeout)
            .field("sensors", &self.sensors)
            .finish_non_exhaustive()
    }
}

fn record_request(kind: RequestKind, outcome: &'static str) {
    metrics::counter!(
        metric_defs::COORDINATOR_REQUESTS.name,
        "request" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Hands received packets to a shared [`Coordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorHandler(Arc<Coordinator>);

impl PacketHandler for CoordinatorHandler {
    fn on_packet(&mut self, packet: &Packet) {
        self.0.on_packet_received(packet);
    }

    fn on_plain_word(&mut self, word: &[u8]) {
        info!(word = %String::from_utf8_lossy(word), "radio says");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoordinatorError, ManualClock};
    use sensornet_link::{LinkError, Result as LinkResult};
    use sensornet_transport::TransportError;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<OpCode>>,
        fail: AtomicBool,
    }

    impl PacketSender for RecordingSender {
        fn send_packet(&self, op: OpCode, _payload: &[u8]) -> LinkResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(LinkError::Transport(TransportError::Closed));
            }
            self.sent.lock().push(op);
            Ok(())
        }
    }

    fn setup() -> (Coordinator, Arc<RecordingSender>, Arc<ManualClock>) {
        let sender = Arc::new(RecordingSender::default());
        let clock = Arc::new(ManualClock::default());
        let coordinator =
            Coordinator::with_clock(&CoordinatorConfig::default(), sender.clone(), clock.clone()).unwrap();
        (coordinator, sender, clock)
    }

    fn response(from: u8, digits: &[u8]) -> Packet {
        Packet::new(OpCode::MeasureResponse, DeviceId::new(from), digits).unwrap()
    }

    #[test]
    fn test_rejects_table_without_room_for_sensors() {
        for sensor_count in [0, 1, 257] {
            let config = CoordinatorConfig {
                sensor_count,
                ..Default::default()
            };
            let result = Coordinator::new(&config, Arc::new(RecordingSender::default()));
            assert!(
                matches!(result, Err(CoordinatorError::InvalidConfig(_))),
                "sensor_count {}",
                sensor_count
            );
        }
        let widest = CoordinatorConfig {
            sensor_count: 256,
            ..Default::default()
        };
        let coordinator = Coordinator::new(&widest, Arc::new(RecordingSender::default())).unwrap();
        assert_eq!(coordinator.sensor_count(), 256);
    }

    #[test]
    fn test_measure_sets_pending() {
        let (coordinator, sender, _) = setup();
        assert!(!coordinator.is_busy());
        let status = coordinator.request_measure().unwrap();
        assert_eq!(status.message(), "200 OK Measurement requested.");
        assert_eq!(coordinator.state(), CoordinatorState::PendingMeasure);
        assert_eq!(*sender.sent.lock(), vec![OpCode::MeasureRequest]);
    }

    #[test]
    fn test_timeout_is_strict() {
        let (coordinator, _, clock) = setup();
        coordinator.request_measure().unwrap();
        clock.advance(chrono::Duration::milliseconds(1000));
        assert!(coordinator.is_busy());
        clock.advance(chrono::Duration::milliseconds(1));
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
    }

    #[test]
    fn test_measurement_does_not_clear_pending_measure() {
        let (coordinator, _, _) = setup();
        coordinator.request_measure().unwrap();
        let outcome = coordinator.on_packet_received(&response(1, b"00ff"));
        assert_eq!(
            outcome,
            PacketOutcome::Recorded {
                sensor: DeviceId::new(1),
                raw: 255,
                calibrated: false,
                state: CoordinatorState::PendingMeasure,
            }
        );
        assert_eq!(coordinator.state(), CoordinatorState::PendingMeasure);
        assert_eq!(coordinator.sensor(DeviceId::new(1)).unwrap().config.offset, 0);
    }

    #[test]
    fn test_failed_send_restores_state() {
        let (coordinator, sender, _) = setup();
        sender.fail.store(true, Ordering::SeqCst);
        assert!(coordinator.request_calibrate().is_err());
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert!(!coordinator.is_busy());
        sender.fail.store(false, Ordering::SeqCst);
        assert!(coordinator.request_measure().unwrap().is_accepted());
    }

    #[test]
    fn test_ping_marks_busy_and_returns_message() {
        let (coordinator, sender, _) = setup();
        let status = coordinator.request_ping().unwrap();
        assert_eq!(status.to_string(), "200 OK Ping request sent.");
        assert_eq!(coordinator.state(), CoordinatorState::PendingCalibrate);
        assert_eq!(
            coordinator.request_ping().unwrap().message(),
            "300 BUSY ping: previous requests still pending."
        );
        assert_eq!(*sender.sent.lock(), vec![OpCode::Ping]);
    }

    #[test]
    fn test_ping_from_network_is_answered() {
        let (coordinator, sender, _) = setup();
        let ping = Packet::empty(OpCode::Ping, DeviceId::new(2));
        assert_eq!(coordinator.on_packet_received(&ping), PacketOutcome::Ponged);
        assert_eq!(*sender.sent.lock(), vec![OpCode::Pong]);
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
    }

    #[test]
    fn test_discards() {
        let (coordinator, _, _) = setup();
        assert_eq!(
            coordinator.on_packet_received(&response(0, b"0001")),
            PacketOutcome::Discarded(DiscardReason::UnknownSensor(DeviceId::MASTER))
        );
        assert_eq!(
            coordinator.on_packet_received(&response(5, b"0001")),
            PacketOutcome::Discarded(DiscardReason::UnknownSensor(DeviceId::new(5)))
        );
        let odd = Packet::empty(OpCode::Unknown(0x42), DeviceId::new(1));
        assert_eq!(
            coordinator.on_packet_received(&odd),
            PacketOutcome::Discarded(DiscardReason::UnsupportedOp(OpCode::Unknown(0x42)))
        );
        assert_eq!(
            coordinator.on_packet_received(&Packet::empty(OpCode::MeasureRequest, DeviceId::new(1))),
            PacketOutcome::IgnoredMeasureRequest
        );
        assert!(coordinator
            .snapshot_data()
            .sensors
            .iter()
            .all(|s| s.value == 0 && s.time == 0));
    }

    #[test]
    fn test_snapshot_applies_offset() {
        let (coordinator, _, clock) = setup();
        clock.set(DateTime::from_timestamp(1_000, 0).unwrap());
        coordinator.request_calibrate().unwrap();
        coordinator.on_packet_received(&response(2, b"0100"));
        clock.advance(chrono::Duration::seconds(5));
        coordinator.on_packet_received(&response(2, b"0129"));

        let report = coordinator.snapshot_data();
        assert_eq!(report.sensors.len(), 5);
        let sensor = report.sensors[2];
        // Still calibrating: the second reading became the offset too.
        assert_eq!(sensor.offset, 0x129);
        assert_eq!(sensor.value, 0);
        assert_eq!(sensor.time, 1_005);
    }
}
