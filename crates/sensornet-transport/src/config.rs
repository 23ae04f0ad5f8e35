//! Transport configuration and runtime selection.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{
    ByteTransport, Device, InterruptBackedTransport, Result, ThreadBackedTransport,
    DEFAULT_IRQ_QUEUE_CAPACITY, DEFAULT_THREAD_QUEUE_CAPACITY,
};

/// Serial device used when none is configured.
pub const DEFAULT_DEVICE: &str = "/dev/ttyAMA0";

/// Which realization of [`ByteTransport`] to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Bytes arrive through a receive interrupt and are dropped when the queue is full.
    InterruptBacked,
    /// A monitor thread reads the device and blocks when the queue is full.
    #[default]
    ThreadBacked,
}

impl TransportKind {
    /// Queue capacity used when the configuration does not set one.
    pub const fn default_capacity(self) -> usize {
        match self {
            TransportKind::InterruptBacked => DEFAULT_IRQ_QUEUE_CAPACITY,
            TransportKind::ThreadBacked => DEFAULT_THREAD_QUEUE_CAPACITY,
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "thread" | "thread_backed" => Ok(TransportKind::ThreadBacked),
            "interrupt" | "interrupt_backed" => Ok(TransportKind::InterruptBacked),
            other => Err(format!(
                "unknown transport '{}', expected 'thread' or 'interrupt'",
                other
            )),
        }
    }
}

/// Transport settings, usually read from the runner's YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Which transport to build.
    pub kind: TransportKind,
    /// Serial device path.
    pub device: PathBuf,
    /// Receive queue capacity; the kind's default when unset.
    pub queue_capacity: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            kind: TransportKind::default(),
            device: PathBuf::from(DEFAULT_DEVICE),
            queue_capacity: None,
        }
    }
}

impl TransportConfig {
    /// Effective receive queue capacity.
    pub fn capacity(&self) -> usize {
        self.queue_capacity
            .filter(|&c| c > 0)
            .unwrap_or_else(|| self.kind.default_capacity())
    }
}

/// A byte transport chosen at construction time.
#[derive(Debug)]
pub enum Transport {
    /// Interrupt-fed transport.
    InterruptBacked(InterruptBackedTransport),
    /// Thread-fed transport.
    ThreadBacked(ThreadBackedTransport),
}

impl Transport {
    /// Build the transport described by `config`. The device is not opened until `init`.
    pub fn from_config(config: &TransportConfig) -> Self {
        Self::with_device(config.kind, config.device.clone(), config.capacity())
    }

    /// Build a transport of `kind` on an arbitrary device.
    pub fn with_device(kind: TransportKind, device: impl Into<Device>, capacity: usize) -> Self {
        match kind {
            TransportKind::InterruptBacked => {
                Transport::InterruptBacked(InterruptBackedTransport::with_device(device, capacity))
            }
            TransportKind::ThreadBacked => {
                Transport::ThreadBacked(ThreadBackedTransport::new(device, capacity))
            }
        }
    }

    /// Which realization this is.
    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::InterruptBacked(_) => TransportKind::InterruptBacked,
            Transport::ThreadBacked(_) => TransportKind::ThreadBacked,
        }
    }

    fn inner(&self) -> &dyn ByteTransport {
        match self {
            Transport::InterruptBacked(t) => t,
            Transport::ThreadBacked(t) => t,
        }
    }
}

impl ByteTransport for Transport {
    fn init(&self) -> Result<()> {
        self.inner().init()
    }

    fn get_byte(&self) -> Result<u8> {
        self.inner().get_byte()
    }

    fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.inner().send_bytes(bytes)
    }

    fn shutdown(&self) -> Result<()> {
        self.inner().shutdown()
    }

    fn guard_delay(&self) {
        self.inner().guard_delay()
    }
}
