//! Metric declarations for the sensornet link.
//!
//! Every metric the workspace records is declared once in [`metric_defs`]
//! as a [`Metric`] constant, so names cannot drift between the code that
//! records a value and the code that describes it. The `metrics` crate is
//! re-exported; without an installed recorder every call is a no-op.
//!
//! # Example
//!
//! ```rust
//! use sensornet_metrics::{metric_defs, DeviceLabels};
//!
//! let labels = DeviceLabels::new(0, "master");
//! sensornet_metrics::metrics::counter!(
//!     metric_defs::LINK_TX_FRAMES.name,
//!     &labels.with(&[("op", "measure_request".to_string())])
//! )
//! .increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// Kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonically increasing count.
    Counter,
    /// Value that can go up and down.
    Gauge,
    /// Distribution of samples.
    Histogram,
}

/// A metric name together with what the recorder is told about it.
///
/// Label keys are listed in the doc comment of each definition; the
/// `metrics` macros take them at the recording site.
#[derive(Debug, Clone, Copy)]
pub struct Metric {
    /// Dotted metric name.
    pub name: &'static str,
    /// Counter, gauge or histogram.
    pub kind: MetricKind,
    /// Unit of measurement.
    pub unit: Unit,
    /// Human-readable description.
    pub description: &'static str,
}

const fn count(name: &'static str, description: &'static str) -> Metric {
    Metric {
        name,
        kind: MetricKind::Counter,
        unit: Unit::Count,
        description,
    }
}

impl Metric {
    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Gauge => describe_gauge!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

/// Every metric recorded by the workspace.
pub mod metric_defs {
    use super::{count, Metric, MetricKind, Unit};

    // Transport

    /// Received bytes dropped because the interrupt queue was full.
    ///
    /// Labels: transport
    pub const QUEUE_DROPPED_BYTES: Metric = count(
        "sensornet.queue.dropped_bytes",
        "Received bytes dropped because the receive queue was full",
    );

    // Link. Every link metric carries the device and role labels.

    /// Frames written to the radio.
    ///
    /// Labels: device, role, op
    pub const LINK_TX_FRAMES: Metric =
        count("sensornet.link.tx_frames", "Packet frames written to the radio");

    /// Bytes written to the radio, frames and commands alike.
    ///
    /// Labels: device, role
    pub const LINK_TX_BYTES: Metric = Metric {
        unit: Unit::Bytes,
        ..count("sensornet.link.tx_bytes", "Bytes written to the radio")
    };

    /// Packets that passed framing and checksum validation.
    ///
    /// Labels: device, role, op
    pub const LINK_RX_VALID_PACKETS: Metric = count(
        "sensornet.link.rx_valid_packets",
        "Received packets with a valid frame",
    );

    /// Frames rejected by the parser.
    ///
    /// Labels: device, role, reason
    pub const LINK_RX_INVALID_PACKETS: Metric = count(
        "sensornet.link.rx_invalid_packets",
        "Received frames rejected by the parser",
    );

    /// Plain words (radio command replies) seen outside frames.
    ///
    /// Labels: device, role
    pub const LINK_RX_PLAIN_WORDS: Metric = count(
        "sensornet.link.rx_plain_words",
        "Plain text words received outside frames",
    );

    // Coordinator

    /// Requests issued by the coordinator.
    ///
    /// Labels: request (ping, measure, calibrate), outcome (sent, busy, failed)
    pub const COORDINATOR_REQUESTS: Metric = count(
        "sensornet.coordinator.requests",
        "Requests issued by the coordinator",
    );

    /// Responses discarded by the coordinator.
    ///
    /// Labels: reason (unexpected, unknown_sensor, not_a_response)
    pub const COORDINATOR_DISCARDED_RESPONSES: Metric = count(
        "sensornet.coordinator.discarded_responses",
        "Received packets the coordinator did not act on",
    );

    /// Time from request to a matching response.
    ///
    /// Labels: request
    pub const COORDINATOR_RESPONSE_TIME: Metric = Metric {
        name: "sensornet.coordinator.response_time_ms",
        kind: MetricKind::Histogram,
        unit: Unit::Milliseconds,
        description: "Time from a request to a sensor response",
    };

    /// Sensors whose calibration offset has been set.
    pub const COORDINATOR_CALIBRATED_SENSORS: Metric = Metric {
        kind: MetricKind::Gauge,
        ..count(
            "sensornet.coordinator.calibrated_sensors",
            "Sensors with a recorded calibration offset",
        )
    };

    /// All metrics, for registration at startup.
    pub const ALL: &[&Metric] = &[
        &QUEUE_DROPPED_BYTES,
        &LINK_TX_FRAMES,
        &LINK_TX_BYTES,
        &LINK_RX_VALID_PACKETS,
        &LINK_RX_INVALID_PACKETS,
        &LINK_RX_PLAIN_WORDS,
        &COORDINATOR_REQUESTS,
        &COORDINATOR_DISCARDED_RESPONSES,
        &COORDINATOR_RESPONSE_TIME,
        &COORDINATOR_CALIBRATED_SENSORS,
    ];
}

/// Labels naming the device a metric was recorded on.
///
/// ```rust
/// use sensornet_metrics::DeviceLabels;
///
/// let labels = DeviceLabels::new(3, "sensor");
/// assert_eq!(labels.to_labels(), vec![("device", "3".to_string()), ("role", "sensor".to_string())]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLabels {
    /// Device id on the radio network.
    pub device: String,
    /// `master` or `sensor`.
    pub role: String,
}

impl DeviceLabels {
    /// Labels for `device` acting in `role`.
    pub fn new(device: impl ToString, role: impl Into<String>) -> Self {
        Self {
            device: device.to_string(),
            role: role.into(),
        }
    }

    /// Labels in the form the `metrics` macros take.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("device", self.device.clone()), ("role", self.role.clone())]
    }

    /// Device labels followed by `extra`.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Register the description of every metric in [`metric_defs::ALL`].
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
