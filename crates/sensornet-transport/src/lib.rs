//! Byte transports for the serial line between host and radio.
//!
//! A [`ByteTransport`] is a blocking byte source and sink. Received bytes
//! arrive asynchronously and are parked in a bounded queue until the single
//! consumer asks for them with [`ByteTransport::get_byte`]. Two
//! realizations differ in who produces those bytes:
//!
//! - [`InterruptBackedTransport`]: a receive interrupt pushes bytes through
//!   an [`RxInterrupt`] handle. The producer never blocks; when the queue is
//!   full new bytes are dropped.
//! - [`ThreadBackedTransport`]: a monitor thread reads the device and blocks
//!   while the queue is full, so nothing is lost.
//!
//! Which one is used is a configuration choice ([`TransportKind`]), made
//! when the [`Transport`] is constructed.
//!
//! # Example
//!
//! ```rust,ignore
//! use sensornet_transport::{ByteTransport, Transport, TransportConfig};
//!
//! let transport = Transport::from_config(&TransportConfig::default());
//! transport.init()?;
//! transport.send_bytes(b"+++")?;
//! let byte = transport.get_byte()?;
//! transport.shutdown()?;
//! ```

mod blocking_queue;
mod config;
mod device;
mod error;
mod interrupt_backed;
mod irq_queue;
pub mod pipe;
mod ring;
mod thread_backed;
mod transport;

pub use blocking_queue::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use interrupt_backed::*;
pub use irq_queue::*;
pub use ring::*;
pub use thread_backed::*;
pub use transport::*;
