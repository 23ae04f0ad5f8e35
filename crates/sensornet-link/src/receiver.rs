//! Incoming side of the link: the single consumer of received bytes.

use sensornet_codec::{FrameError, FrameMode, FrameParser, ParseEvent, Parser};
use sensornet_metrics::{metric_defs, metrics, DeviceLabels};
use sensornet_packet::Packet;
use sensornet_transport::{ByteTransport, TransportError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::{LinkError, Result};

/// Receives what the [`Receiver`] decodes.
///
/// Called on the receiver's thread, one event at a time.
pub trait PacketHandler: Send {
    /// A frame passed validation.
    fn on_packet(&mut self, packet: &Packet);

    /// Plain text seen outside frames, e.g. a radio's `OK`.
    fn on_plain_word(&mut self, _word: &[u8]) {}

    /// A frame was rejected.
    fn on_invalid(&mut self, _error: FrameError) {}
}

impl<F> PacketHandler for F
where
    F: FnMut(&Packet) + Send,
{
    fn on_packet(&mut self, packet: &Packet) {
        self(packet)
    }
}

/// Counts of what a receiver has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Bytes taken from the transport.
    pub bytes: u64,
    /// Frame delimiters seen.
    pub frames_started: u64,
    /// Packets handed to the handler.
    pub valid_packets: u64,
    /// Frames rejected by the parser.
    pub invalid_packets: u64,
    /// Plain words seen outside frames.
    pub plain_words: u64,
}

/// Pumps bytes from a transport through a parser into a [`PacketHandler`].
///
/// There is exactly one receiver per transport; it owns the parser state.
pub struct Receiver<T, H> {
    transport: Arc<T>,
    parser: Parser,
    handler: H,
    labels: DeviceLabels,
    stats: ReceiverStats,
}

impl<T: ByteTransport, H: PacketHandler> Receiver<T, H> {
    /// Create a receiver reading `transport` with `mode` framing.
    pub fn new(transport: Arc<T>, mode: FrameMode, handler: H) -> Self {
        Receiver {
            transport,
            parser: mode.parser(),
            handler,
            labels: DeviceLabels::new("unknown", "unknown"),
            stats: ReceiverStats::default(),
        }
    }

    /// Use `labels` for recorded metrics.
    pub fn with_labels(mut self, labels: DeviceLabels) -> Self {
        self.labels = labels;
        self
    }

    /// What has been seen so far.
    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// The handler, e.g. to inspect it after [`run`](Self::run) in tests.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Feed one received byte through the parser, dispatching the result.
    pub fn process_byte(&mut self, byte: u8) {
        self.stats.bytes += 1;
        match self.parser.feed(byte) {
            ParseEvent::Parsing => {}
            ParseEvent::StartPacket => {
                self.stats.frames_started += 1;
                trace!("start of packet");
            }
            ParseEvent::PlainWord(word) => {
                self.stats.plain_words += 1;
                debug!(word = %String::from_utf8_lossy(word), "plain word from radio");
                metrics::counter!(metric_defs::LINK_RX_PLAIN_WORDS.name, &self.labels.to_labels())
                    .increment(1);
                self.handler.on_plain_word(word);
            }
            ParseEvent::ValidPacket(packet) => {
                self.stats.valid_packets += 1;
                debug!(op = %packet.op(), from = %packet.from(), len = packet.len(), "valid packet");
                metrics::counter!(
                    metric_defs::LINK_RX_VALID_PACKETS.name,
                    &self.labels.with(&[("op", packet.op().to_string())])
                )
                .increment(1);
                self.handler.on_packet(packet);
            }
            ParseEvent::InvalidPacket(error) => {
                self.stats.invalid_packets += 1;
                debug!(%error, "invalid packet");
                metrics::counter!(
                    metric_defs::LINK_RX_INVALID_PACKETS.name,
                    &self.labels.with(&[("reason", error.reason().to_string())])
                )
                .increment(1);
                self.handler.on_invalid(error);
            }
        }
    }

    /// Consume bytes until the transport is closed.
    pub fn run(mut self) -> ReceiverStats {
        info!("receiver started");
        loop {
            match self.transport.get_byte() {
                Ok(byte) => self.process_byte(byte),
                Err(TransportError::Closed) => {
                    info!(
                        valid = self.stats.valid_packets,
                        invalid = self.stats.invalid_packets,
                        "transport closed, receiver stopping"
                    );
                    break;
                }
                Err(TransportError::NotInitialized) => {
                    warn!("receiver started before the transport was initialised");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "receive failed, receiver stopping");
                    break;
                }
            }
        }
        self.stats
    }
}

impl<T, H> Receiver<T, H>
where
    T: ByteTransport + 'static,
    H: PacketHandler + 'static,
{
    /// Run on a new thread named `receiver`.
    pub fn spawn(self) -> Result<ReceiverHandle> {
        let thread = thread::Builder::new()
            .name("receiver".to_string())
            .spawn(move || self.run())
            .map_err(LinkError::Spawn)?;
        Ok(ReceiverHandle { thread })
    }
}

impl<T, H> std::fmt::Debug for Receiver<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("parser", &self.parser)
            .field("labels", &self.labels)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Handle to a receiver running on its own thread.
#[derive(Debug)]
pub struct ReceiverHandle {
    thread: JoinHandle<ReceiverStats>,
}

impl ReceiverHandle {
    /// Returns true once the receiver has stopped.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the receiver to stop. Shut the transport down first.
    pub fn join(self) -> Result<ReceiverStats> {
        self.thread.join().map_err(|_| LinkError::ReceiverPanicked)
    }
}
