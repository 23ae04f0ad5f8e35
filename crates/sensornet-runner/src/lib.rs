//! Command-line runner for the sensornet radio network.
//!
//! `sensornet master` opens the radio, starts the coordinator and takes
//! single-letter commands on stdin. `sensornet sensor` simulates one sensor
//! unit answering pings and measure requests with a fixed reading.
//!
//! Both read an optional YAML file ([`RunnerConfig`]) and let flags
//! override it.

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod node;

pub use cli::*;
pub use config::*;
pub use console::*;
pub use error::*;
pub use logging::*;
pub use node::*;
