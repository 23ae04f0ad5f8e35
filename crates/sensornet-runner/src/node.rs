//! Master and sensor nodes: a transport, a link and a running receiver.

use sensornet_coordinator::{Coordinator, SensorResponder};
use sensornet_link::{LinkConfig, PacketLink, ReceiverHandle, ReceiverStats};
use sensornet_packet::DeviceId;
use sensornet_transport::Transport;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::{Result, RunnerConfig, RunnerError};

/// The master unit with its coordinator fed by a receiver thread.
#[derive(Debug)]
pub struct MasterNode {
    link: Arc<PacketLink<Transport>>,
    coordinator: Arc<Coordinator>,
    receiver: ReceiverHandle,
}

impl MasterNode {
    /// Open the configured device and start receiving.
    pub fn start(config: &RunnerConfig) -> Result<Self> {
        if !config.link.device_id.is_master() {
            return Err(RunnerError::InvalidArgument(format!(
                "master must use device id 0, got {}",
                config.link.device_id
            )));
        }
        Self::with_transport(Transport::from_config(&config.transport), config)
    }

    /// Start on an already built transport.
    pub fn with_transport(transport: Transport, config: &RunnerConfig) -> Result<Self> {
        let link = Arc::new(PacketLink::new(Arc::new(transport), &config.link));
        let coordinator = Arc::new(Coordinator::new(&config.coordinator, link.clone())?);
        link.init()?;
        let receiver = link.receiver(coordinator.handler()).spawn()?;
        info!(sensors = config.coordinator.sensor_count - 1, "master started");
        Ok(MasterNode {
            link,
            coordinator,
            receiver,
        })
    }

    /// Coordinator holding the sensor table.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Link used to issue radio commands.
    pub fn link(&self) -> &PacketLink<Transport> {
        &self.link
    }

    /// Shut the transport down and wait for the receiver.
    pub fn shutdown(self) -> Result<ReceiverStats> {
        self.link.shutdown()?;
        let stats = self.receiver.join()?;
        info!(valid = stats.valid_packets, invalid = stats.invalid_packets, "master stopped");
        Ok(stats)
    }
}

/// A simulated sensor unit answering with a settable reading.
#[derive(Debug)]
pub struct SensorNode {
    link: Arc<PacketLink<Transport>>,
    reading: Arc<AtomicU16>,
    receiver: ReceiverHandle,
}

impl SensorNode {
    /// Open the configured device, announce and start answering.
    pub fn start(config: &RunnerConfig, reading: u16) -> Result<Self> {
        Self::with_transport(Transport::from_config(&config.transport), &config.link, reading)
    }

    /// Start on an already built transport.
    pub fn with_transport(transport: Transport, link_config: &LinkConfig, reading: u16) -> Result<Self> {
        if link_config.device_id.is_master() {
            return Err(RunnerError::InvalidArgument(
                "sensor device id must not be 0".to_string(),
            ));
        }
        let link = Arc::new(PacketLink::new(Arc::new(transport), link_config));
        link.init()?;

        let reading = Arc::new(AtomicU16::new(reading));
        let responder = SensorResponder::new(link.clone(), reading.clone());
        responder.announce()?;
        let receiver = link.receiver(responder).spawn()?;
        info!(device = %link_config.device_id, "sensor started");
        Ok(SensorNode {
            link,
            reading,
            receiver,
        })
    }

    /// Id this sensor answers to.
    pub fn device_id(&self) -> DeviceId {
        self.link.device_id()
    }

    /// Value sent in the next measure response.
    pub fn set_reading(&self, value: u16) {
        self.reading.store(value, Ordering::Relaxed);
    }

    /// Value the next measure response will carry.
    pub fn reading(&self) -> u16 {
        self.reading.load(Ordering::Relaxed)
    }

    /// Returns false once the line has closed.
    pub fn is_running(&self) -> bool {
        !self.receiver.is_finished()
    }

    /// Shut the transport down and wait for the receiver.
    pub fn shutdown(self) -> Result<ReceiverStats> {
        self.link.shutdown()?;
        Ok(self.receiver.join()?)
    }
}
