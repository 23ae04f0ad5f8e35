//! Outgoing side of the link.

use parking_lot::Mutex;
use sensornet_codec::api_mode::Addressing;
use sensornet_codec::at_mode::COMMAND_MODE_SEQUENCE;
use sensornet_codec::{Encoder, FrameEncoder, FrameMode};
use sensornet_metrics::{metric_defs, metrics, DeviceLabels};
use sensornet_packet::{DeviceId, OpCode};
use sensornet_transport::ByteTransport;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{LinkConfig, PacketHandler, Receiver, Result};

/// `AP` argument selecting escaped API operation.
const API_MODE_ESCAPED: u8 = 0x02;

/// Something that can put a packet on the air.
///
/// The coordinator and the sensor responder send through this trait, so
/// they can be driven by a recording sender in tests.
pub trait PacketSender: Send + Sync {
    /// Send `op` with `payload` from this device.
    fn send_packet(&self, op: OpCode, payload: &[u8]) -> Result<()>;
}

impl<S: PacketSender + ?Sized> PacketSender for Arc<S> {
    fn send_packet(&self, op: OpCode, payload: &[u8]) -> Result<()> {
        (**self).send_packet(op, payload)
    }
}

/// Encoder bound to a transport.
pub struct PacketLink<T> {
    transport: Arc<T>,
    /// Held across the write so frames from concurrent senders never interleave.
    encoder: Mutex<Encoder>,
    labels: DeviceLabels,
}

impl<T: ByteTransport> PacketLink<T> {
    /// Create a link over `transport`. Nothing is sent until [`init`](Self::init).
    pub fn new(transport: Arc<T>, config: &LinkConfig) -> Self {
        PacketLink {
            transport,
            encoder: Mutex::new(config.mode.encoder(config.device_id, config.addressing)),
            labels: DeviceLabels::new(config.device_id, config.role()),
        }
    }

    /// Initialise the transport. In API mode the radio is then switched to
    /// escaped API operation (`ATAP 2`).
    pub fn init(&self) -> Result<()> {
        self.transport.init()?;
        if self.mode() == FrameMode::Api {
            self.send_command(*b"AP", Some(&[API_MODE_ESCAPED]))?;
        }
        info!(mode = ?self.mode(), device = %self.device_id(), "link initialised");
        Ok(())
    }

    /// Shut the transport down, which also ends any running [`Receiver`].
    pub fn shutdown(&self) -> Result<()> {
        self.transport.shutdown()?;
        Ok(())
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Framing variant in use.
    pub fn mode(&self) -> FrameMode {
        self.encoder.lock().mode()
    }

    /// Identity written into outgoing packets.
    pub fn device_id(&self) -> DeviceId {
        self.encoder.lock().device_id()
    }

    /// Change the identity written into outgoing packets.
    pub fn set_device_id(&self, device_id: DeviceId) {
        self.encoder.lock().set_device_id(device_id);
    }

    /// Change the destination of outgoing packets (API mode only).
    pub fn set_addressing(&self, addressing: Addressing) {
        self.encoder.lock().set_addressing(addressing);
    }

    /// Send a two-letter radio command such as `NI` or `ND`.
    ///
    /// In AT mode the radio must already be in command mode
    /// ([`enter_command_mode`](Self::enter_command_mode)).
    pub fn send_command(&self, command: [u8; 2], argument: Option<&[u8]>) -> Result<()> {
        let encoder = self.encoder.lock();
        let bytes = encoder.encode_command(command, argument)?;
        debug!(
            command = %String::from_utf8_lossy(&command),
            len = bytes.len(),
            "sending radio command"
        );
        self.write(&bytes)
    }

    /// Switch a transparent-mode radio to command mode: guard time, `+++`,
    /// guard time. Blocks for at least two guard times.
    pub fn enter_command_mode(&self) -> Result<()> {
        let _encoder = self.encoder.lock();
        self.transport.guard_delay();
        self.write(COMMAND_MODE_SEQUENCE)?;
        self.transport.guard_delay();
        debug!("radio in command mode");
        Ok(())
    }

    /// Leave command mode (`ATCN`).
    pub fn exit_command_mode(&self) -> Result<()> {
        self.send_command(*b"CN", None)
    }

    /// Build the receive loop for this link's transport and framing.
    pub fn receiver<H: PacketHandler>(&self, handler: H) -> Receiver<T, H> {
        Receiver::new(self.transport.clone(), self.mode(), handler).with_labels(self.labels.clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        self.transport.send_bytes(bytes)?;
        metrics::counter!(metric_defs::LINK_TX_BYTES.name, &self.labels.to_labels())
            .increment(bytes.len() as u64);
        Ok(())
    }
}

impl<T: ByteTransport> PacketSender for PacketLink<T> {
    fn send_packet(&self, op: OpCode, payload: &[u8]) -> Result<()> {
        let encoder = self.encoder.lock();
        let frame = encoder.encode_packet(op, payload)?;
        debug!(%op, payload_len = payload.len(), frame_len = frame.len(), "sending packet");
        self.write(&frame)?;
        metrics::counter!(
            metric_defs::LINK_TX_FRAMES.name,
            &self.labels.with(&[("op", op.to_string())])
        )
        .increment(1);
        Ok(())
    }
}

impl<T> std::fmt::Debug for PacketLink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketLink")
            .field("encoder", &*self.encoder.lock())
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}
