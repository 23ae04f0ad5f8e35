//! Transport fed by a dedicated monitor thread.

use log::{debug, error, warn};
use parking_lot::Mutex;
use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::{BlockingQueue, ByteTransport, Device, DeviceReader, DeviceWriter, Result, TransportError};

/// Default receive buffer size for the thread-backed transport.
pub const DEFAULT_THREAD_QUEUE_CAPACITY: usize = 256;

// ============================================================================
// Monitor Thread
// ============================================================================

/// State shared between the transport and its monitor thread.
#[derive(Debug)]
struct MonitorShared {
    queue: BlockingQueue,
    stop: AtomicBool,
}

fn run_monitor(mut reader: DeviceReader, shared: Arc<MonitorShared>) {
    debug!("serial monitor started");
    let mut buf = [0u8; 64];

    while !shared.stop.load(Ordering::Acquire) {
        match reader.read(&mut buf) {
            Ok(0) => {
                warn!("serial device reached end of stream");
                break;
            }
            Ok(n) => {
                for &byte in &buf[..n] {
                    if shared.queue.push(byte).is_err() {
                        debug!("receive queue closed, monitor exiting");
                        return;
                    }
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
            Err(e) => {
                error!("read from serial device failed: {}", e);
                break;
            }
        }
    }

    // Lets the consumer drain what is left and then see the end.
    shared.queue.close();
    debug!("serial monitor stopped");
}

// ============================================================================
// Transport
// ============================================================================

/// Byte transport whose receive queue is filled by a monitor thread.
///
/// The monitor blocks while the queue is full, so no received byte is lost.
/// [`shutdown`](ByteTransport::shutdown) stops and joins the monitor before
/// the device is released.
pub struct ThreadBackedTransport {
    shared: Arc<MonitorShared>,
    device: Mutex<Option<Device>>,
    writer: Mutex<Option<DeviceWriter>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl ThreadBackedTransport {
    /// Create a transport for `device` with a receive queue of `capacity` bytes.
    pub fn new(device: impl Into<Device>, capacity: usize) -> Self {
        ThreadBackedTransport {
            shared: Arc::new(MonitorShared {
                queue: BlockingQueue::new(capacity),
                stop: AtomicBool::new(false),
            }),
            device: Mutex::new(Some(device.into())),
            writer: Mutex::new(None),
            monitor: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Number of received bytes waiting for the consumer.
    pub fn buffered(&self) -> usize {
        self.shared.queue.len()
    }
}

impl fmt::Debug for ThreadBackedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadBackedTransport")
            .field("buffered", &self.buffered())
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ByteTransport for ThreadBackedTransport {
    fn init(&self) -> Result<()> {
        let device = self.device.lock().take().ok_or(TransportError::AlreadyInitialized)?;
        let (reader, writer) = device.open()?;
        *self.writer.lock() = Some(writer);

        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name("serial-monitor".to_string())
            .spawn(move || run_monitor(reader, shared))?;
        *self.monitor.lock() = Some(handle);
        self.started.store(true, Ordering::Release);
        debug!("thread-backed transport initialised");
        Ok(())
    }

    fn get_byte(&self) -> Result<u8> {
        if !self.started.load(Ordering::Acquire) {
            return Err(TransportError::NotInitialized);
        }
        Ok(self.shared.queue.pop()?)
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
        self.shared.stop.store(true, Ordering::Release);
        self.shared.queue.close();

        let handle = self.monitor.lock().take();
        if let Some(handle) = handle {
            handle.join().map_err(|_| TransportError::ThreadPanicked)?;
        }
        // Dropping the writer releases the device.
        self.writer.lock().take();
        debug!("thread-backed transport shut down");
        Ok(())
    }
}

impl Drop for ThreadBackedTransport {
    fn drop(&mut self) {
        // Ask the monitor to exit if shutdown() was never called.
        self.shared.stop.store(true, Ordering::Release);
        self.shared.queue.close();
    }
}
