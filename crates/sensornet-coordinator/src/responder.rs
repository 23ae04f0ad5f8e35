//! Sensor-unit side: answer the master's requests.

use sensornet_link::{PacketHandler, PacketSender};
use sensornet_packet::{encode_reading, OpCode, Packet};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::Result;

/// Where a sensor unit's current reading comes from.
pub trait ReadingSource: Send + Sync {
    /// The current 16-bit reading.
    fn reading(&self) -> u16;
}

/// A value kept up to date by something else, such as an ADC writing by DMA.
impl ReadingSource for Arc<AtomicU16> {
    fn reading(&self) -> u16 {
        self.load(Ordering::Relaxed)
    }
}

impl<F> ReadingSource for F
where
    F: Fn() -> u16 + Send + Sync,
{
    fn reading(&self) -> u16 {
        self()
    }
}

/// What the responder did with a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Answered a ping.
    Pong,
    /// Sent a reading.
    Measurement(u16),
    /// Not a request this unit answers.
    Ignored,
}

/// Answers pings with pongs and measure requests with the current reading.
pub struct SensorResponder<S, R> {
    sender: S,
    source: R,
}

impl<S: PacketSender, R: ReadingSource> SensorResponder<S, R> {
    /// Create a responder sending through `sender`.
    pub fn new(sender: S, source: R) -> Self {
        SensorResponder { sender, source }
    }

    /// Tell the master this unit is up by sending an unsolicited pong.
    pub fn announce(&self) -> Result<()> {
        self.sender.send_packet(OpCode::Pong, &[])?;
        debug!("announced with pong");
        Ok(())
    }

    /// Answer `packet` if it is a request.
    pub fn respond(&self, packet: &Packet) -> Result<Response> {
        match packet.op() {
            OpCode::Ping => {
                self.sender.send_packet(OpCode::Pong, &[])?;
                Ok(Response::Pong)
            }
            OpCode::MeasureRequest => {
                let value = self.source.reading();
                self.sender.send_packet(OpCode::MeasureResponse, &encode_reading(value))?;
                debug!(value, "reading sent");
                Ok(Response::Measurement(value))
            }
            _ => Ok(Response::Ignored),
        }
    }
}

impl<S, R> PacketHandler for SensorResponder<S, R>
where
    S: PacketSender,
    R: ReadingSource,
{
    fn on_packet(&mut self, packet: &Packet) {
        if let Err(e) = self.respond(packet) {
            warn!(op = %packet.op(), error = %e, "failed to answer request");
        }
    }
}
