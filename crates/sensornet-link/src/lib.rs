//! Packet link for the sensornet radio network.
//!
//! This crate joins a frame codec to a byte transport:
//!
//! - [`PacketLink`] encodes outgoing packets and radio commands and writes
//!   them to the transport. It implements [`PacketSender`], the seam the
//!   application layer sends through.
//! - [`Receiver`] is the single consumer of the transport's received bytes.
//!   It feeds them through the parser and hands every valid packet to a
//!   [`PacketHandler`]. It runs until the transport is shut down.
//!
//! ```text
//!   application ──send_packet──► PacketLink ──encode──► ByteTransport ──► radio
//!   application ◄──on_packet──── Receiver ◄───parse──── ByteTransport ◄── radio
//! ```

mod config;
mod error;
mod link;
mod receiver;

pub use config::*;
pub use error::*;
pub use link::*;
pub use receiver::*;
