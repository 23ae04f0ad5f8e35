//! Application layer of the sensornet radio network.
//!
//! - [`Coordinator`] runs on the master unit. It issues measure, calibrate
//!   and ping requests, refuses new ones while a request is outstanding, and
//!   records sensor readings as responses arrive.
//! - [`SensorResponder`] runs on a sensor unit and answers the master's
//!   requests with the unit's current reading.
//!
//! # Example
//!
//! ```rust,ignore
//! use sensornet_coordinator::{Coordinator, CoordinatorConfig};
//!
//! let coordinator = Arc::new(Coordinator::new(&CoordinatorConfig::default(), link.clone())?);
//! let receiver = link.receiver(coordinator.handler()).spawn()?;
//!
//! println!("{}", coordinator.request_measure()?);
//! println!("{}", coordinator.data_json()?);
//! ```

mod clock;
mod config;
mod coordinator;
mod error;
mod report;
mod responder;
mod sensors;
mod status;

pub use clock::*;
pub use config::*;
pub use coordinator::*;
pub use error::*;
pub use report::*;
pub use responder::*;
pub use sensors::*;
pub use status::*;
