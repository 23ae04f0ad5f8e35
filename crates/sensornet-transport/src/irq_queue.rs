//! Lossy single-producer queue for an interrupt handler.
//!
//! The producer side only touches atomics and a non-blocking doorbell, so it
//! is safe to call from a context that must never suspend. The consumer
//! sleeps on the doorbell instead of polling.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::QueueClosed;

#[derive(Debug)]
struct Shared {
    elements: Box<[AtomicU8]>,
    /// Next slot to read. Written by the consumer only.
    head: AtomicUsize,
    /// Next slot to write. Written by the producer only.
    tail: AtomicUsize,
    count: AtomicUsize,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl Shared {
    fn capacity(&self) -> usize {
        self.elements.len()
    }
}

/// Create a queue, returning its two ends.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn irq_queue(capacity: usize) -> (IrqProducer, IrqConsumer) {
    assert!(capacity > 0, "queue capacity must be non-zero");
    let shared = Arc::new(Shared {
        elements: (0..capacity).map(|_| AtomicU8::new(0)).collect(),
        head: AtomicUsize::new(0),
        tail: AtomicUsize::new(0),
        count: AtomicUsize::new(0),
        closed: AtomicBool::new(false),
        dropped: AtomicU64::new(0),
    });
    // One pending wake-up is enough: the consumer re-checks the count after every wake.
    let (doorbell_tx, doorbell_rx) = bounded(1);
    (
        IrqProducer {
            shared: shared.clone(),
            doorbell: doorbell_tx.clone(),
        },
        IrqConsumer {
            shared,
            doorbell: doorbell_rx,
            ring: doorbell_tx,
        },
    )
}

fn ring(doorbell: &Sender<()>) {
    // Full means a wake-up is already pending.
    let _ = doorbell.try_send(());
}

/// Producer end. Not `Clone`: there is exactly one producer.
#[derive(Debug)]
pub struct IrqProducer {
    shared: Arc<Shared>,
    doorbell: Sender<()>,
}

impl IrqProducer {
    /// Append a byte without blocking.
    ///
    /// Returns `false` if the byte was dropped because the queue is full or
    /// closed. Bytes already queued are never disturbed.
    pub fn push(&mut self, byte: u8) -> bool {
        let shared = &*self.shared;
        if shared.closed.load(Ordering::Acquire) {
            return false;
        }
        if shared.count.load(Ordering::Acquire) == shared.capacity() {
            shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let tail = shared.tail.load(Ordering::Relaxed);
        shared.elements[tail].store(byte, Ordering::Relaxed);
        shared.tail.store((tail + 1) % shared.capacity(), Ordering::Relaxed);
        shared.count.fetch_add(1, Ordering::Release);
        ring(&self.doorbell);
        true
    }

    /// Bytes dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer end.
#[derive(Debug)]
pub struct IrqConsumer {
    shared: Arc<Shared>,
    doorbell: Receiver<()>,
    ring: Sender<()>,
}

impl IrqConsumer {
    /// Remove the oldest byte if there is one.
    pub fn try_pop(&mut self) -> Option<u8> {
        let shared = &*self.shared;
        if shared.count.load(Ordering::Acquire) == 0 {
            return None;
        }
        let head = shared.head.load(Ordering::Relaxed);
        let byte = shared.elements[head].load(Ordering::Relaxed);
        shared.head.store((head + 1) % shared.capacity(), Ordering::Relaxed);
        shared.count.fetch_sub(1, Ordering::Release);
        Some(byte)
    }

    /// Remove the oldest byte, sleeping until one arrives.
    ///
    /// After the queue is closed, buffered bytes are still returned before
    /// [`QueueClosed`].
    pub fn pop(&mut self) -> Result<u8, QueueClosed> {
        loop {
            if let Some(byte) = self.try_pop() {
                return Ok(byte);
            }
            if self.shared.closed.load(Ordering::Acquire) {
                return self.try_pop().ok_or(QueueClosed);
            }
            if self.doorbell.recv().is_err() {
                return self.try_pop().ok_or(QueueClosed);
            }
        }
    }

    /// Handle that can close the queue from another thread.
    pub fn closer(&self) -> IrqCloser {
        IrqCloser {
            shared: self.shared.clone(),
            doorbell: self.ring.clone(),
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.shared.count.load(Ordering::Acquire)
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

/// Closes an interrupt queue, waking a sleeping consumer.
#[derive(Debug, Clone)]
pub struct IrqCloser {
    shared: Arc<Shared>,
    doorbell: Sender<()>,
}

impl IrqCloser {
    /// Refuse further bytes and wake the consumer.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        ring(&self.doorbell);
    }

    /// Bytes dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.shared.count.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let (mut producer, mut consumer) = irq_queue(8);
        for b in 10..18 {
            assert!(producer.push(b));
        }
        let drained: Vec<u8> = std::iter::from_fn(|| consumer.try_pop()).collect();
        assert_eq!(drained, (10..18).collect::<Vec<u8>>());
    }

    #[test]
    fn test_full_drops_newest() {
        let (mut producer, mut consumer) = irq_queue(3);
        assert!(producer.push(1));
        assert!(producer.push(2));
        assert!(producer.push(3));
        assert!(!producer.push(4));
        assert!(!producer.push(5));
        assert_eq!(producer.dropped(), 2);
        assert_eq!(consumer.pop(), Ok(1));
        assert_eq!(consumer.pop(), Ok(2));
        assert_eq!(consumer.pop(), Ok(3));
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_consumer_sleeps_until_byte_arrives() {
        let (mut producer, mut consumer) = irq_queue(4);
        let handle = thread::spawn(move || consumer.pop());
        thread::sleep(Duration::from_millis(20));
        assert!(producer.push(0x42));
        assert_eq!(handle.join().unwrap(), Ok(0x42));
    }

    #[test]
    fn test_close_wakes_consumer() {
        let (_producer, mut consumer) = irq_queue(4);
        let closer = consumer.closer();
        let handle = thread::spawn(move || consumer.pop());
        thread::sleep(Duration::from_millis(20));
        closer.close();
        assert_eq!(handle.join().unwrap(), Err(QueueClosed));
    }

    #[test]
    fn test_closed_queue_rejects_bytes_but_drains() {
        let (mut producer, mut consumer) = irq_queue(4);
        producer.push(1);
        consumer.closer().close();
        assert!(!producer.push(2));
        assert_eq!(consumer.pop(), Ok(1));
        assert_eq!(consumer.pop(), Err(QueueClosed));
    }

    #[test]
    fn test_concurrent_stream_preserves_order() {
        let (mut producer, mut consumer) = irq_queue(16);
        let closer = consumer.closer();
        let reader = thread::spawn(move || {
            let mut seen = Vec::new();
            while let Ok(b) = consumer.pop() {
                seen.push(b);
            }
            seen
        });

        let mut sent = Vec::new();
        for i in 0..10_000u32 {
            let b = (i % 251) as u8;
            if producer.push(b) {
                sent.push(b);
            }
        }
        closer.close();
        let seen = reader.join().unwrap();
        assert_eq!(seen, sent);
    }
}
