//! Transport fed by a receive interrupt.

use log::{debug, error, warn};
use parking_lot::Mutex;
use sensornet_metrics::{metric_defs, metrics};
use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::{
    irq_queue, ByteTransport, Device, DeviceReader, DeviceWriter, IrqCloser, IrqConsumer,
    IrqProducer, Result, TransportError,
};

/// Default receive buffer size for the interrupt-backed transport: one
/// maximum-length AT-mode frame.
pub const DEFAULT_IRQ_QUEUE_CAPACITY: usize = 72;

/// The receive interrupt handler's view of the transport.
///
/// [`on_byte`](Self::on_byte) never blocks and never allocates. Bytes
/// arriving while interrupts are disabled (before `init` or after
/// `shutdown`) are discarded.
#[derive(Debug)]
pub struct RxInterrupt {
    producer: IrqProducer,
    enabled: Arc<AtomicBool>,
}

impl RxInterrupt {
    /// Deliver one received byte. Returns `false` if it was discarded.
    pub fn on_byte(&mut self, byte: u8) -> bool {
        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }
        self.producer.push(byte)
    }

    /// Returns true between `init` and `shutdown`.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

/// Hosted stand-in for the USART: reads the device and raises the interrupt per byte.
fn run_driver(mut reader: DeviceReader, mut irq: RxInterrupt, closer: IrqCloser, stop: Arc<AtomicBool>) {
    debug!("usart driver started");
    let mut buf = [0u8; 64];

    while !stop.load(Ordering::Acquire) {
        match reader.read(&mut buf) {
            Ok(0) => {
                warn!("serial device reached end of stream");
                break;
            }
            Ok(n) => {
                for &byte in &buf[..n] {
                    irq.on_byte(byte);
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
            Err(e) => {
                error!("read from serial device failed: {}", e);
                break;
            }
        }
    }

    closer.close();
    debug!("usart driver stopped");
}

/// Byte transport whose receive queue is filled from interrupt context.
///
/// The interrupt side never waits: when the queue is full the newest byte is
/// dropped and counted. The consumer sleeps in
/// [`get_byte`](ByteTransport::get_byte) until a byte arrives or the
/// transport is shut down.
pub struct InterruptBackedTransport {
    consumer: Mutex<IrqConsumer>,
    closer: IrqCloser,
    enabled: Arc<AtomicBool>,
    writer: Mutex<Option<DeviceWriter>>,
    /// Device and interrupt handle for the hosted driver, taken by `init`.
    hosted: Mutex<Option<(Device, RxInterrupt)>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    stop: Arc<AtomicBool>,
    started: AtomicBool,
}

impl InterruptBackedTransport {
    /// Create a transport writing to `writer`.
    ///
    /// The returned [`RxInterrupt`] belongs to whatever raises the receive
    /// interrupt; it is the only way bytes enter the queue.
    pub fn new(writer: DeviceWriter, capacity: usize) -> (Self, RxInterrupt) {
        let (transport, irq) = Self::build(Some(writer), capacity);
        (transport, irq)
    }

    /// Create a transport on `device`, with a driver thread delivering each
    /// received byte through the interrupt path.
    pub fn with_device(device: impl Into<Device>, capacity: usize) -> Self {
        let (transport, irq) = Self::build(None, capacity);
        *transport.hosted.lock() = Some((device.into(), irq));
        transport
    }

    fn build(writer: Option<DeviceWriter>, capacity: usize) -> (Self, RxInterrupt) {
        let (producer, consumer) = irq_queue(capacity);
        let enabled = Arc::new(AtomicBool::new(false));
        let transport = InterruptBackedTransport {
            closer: consumer.closer(),
            consumer: Mutex::new(consumer),
            enabled: enabled.clone(),
            writer: Mutex::new(writer),
            hosted: Mutex::new(None),
            driver: Mutex::new(None),
            stop: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
        };
        (transport, RxInterrupt { producer, enabled })
    }

    /// Bytes dropped so far because the queue was full.
    pub fn dropped_bytes(&self) -> u64 {
        self.closer.dropped()
    }

    /// Number of received bytes waiting for the consumer.
    pub fn buffered(&self) -> usize {
        self.closer.len()
    }
}

impl fmt::Debug for InterruptBackedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptBackedTransport")
            .field("buffered", &self.buffered())
            .field("dropped", &self.dropped_bytes())
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ByteTransport for InterruptBackedTransport {
    fn init(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(TransportError::AlreadyInitialized);
        }

        let hosted = self.hosted.lock().take();
        if let Some((device, irq)) = hosted {
            let (reader, writer) = device.open().map_err(|e| {
                // Nothing will ever feed the queue; let a consumer see the end.
                self.closer.close();
                e
            })?;
            *self.writer.lock() = Some(writer);
            let closer = self.closer.clone();
            let stop = self.stop.clone();
            let handle = thread::Builder::new()
                .name("usart-rx".to_string())
                .spawn(move || run_driver(reader, irq, closer, stop))?;
            *self.driver.lock() = Some(handle);
        }

        self.enabled.store(true, Ordering::Release);
        debug!("interrupt-backed transport initialised");
        Ok(())
    }

    fn get_byte(&self) -> Result<u8> {
        if !self.started.load(Ordering::Acquire) {
            return Err(TransportError::NotInitialized);
        }
        Ok(self.consumer.lock().pop()?)
    }

    fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        let writer = match writer.as_mut() {
            Some(w) => w,
            None if self.started.load(Ordering::Acquire) => return Err(TransportError::Closed),
            None => return Err(TransportError::NotInitialized),
        };
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        self.enabled.store(false, Ordering::Release);
        self.stop.store(true, Ordering::Release);
        self.closer.close();

        let handle = self.driver.lock().take();
        if let Some(handle) = handle {
            handle.join().map_err(|_| TransportError::ThreadPanicked)?;
        }
        self.writer.lock().take();

        let dropped = self.dropped_bytes();
        if dropped > 0 {
            warn!("receive queue dropped {} bytes", dropped);
        }
        metrics::counter!(metric_defs::QUEUE_DROPPED_BYTES.name, "transport" => "interrupt_backed")
            .absolute(dropped);
        debug!("interrupt-backed transport shut down");
        Ok(())
    }
}

impl Drop for InterruptBackedTransport {
    fn drop(&mut self) {
        self.enabled.store(false, Ordering::Release);
        self.stop.store(true, Ordering::Release);
        self.closer.close();
    }
}
