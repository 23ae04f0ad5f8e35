//! Lossless queue for a producer thread.

use parking_lot::{Condvar, Mutex};

use crate::{QueueClosed, RingBuffer};

#[derive(Debug)]
struct State {
    ring: RingBuffer,
    closed: bool,
}

/// Bounded byte queue where both sides block.
///
/// The producer waits on `nonfull` while the queue is full and the consumer
/// waits on `nonempty` while it is empty. Closing wakes both; the consumer
/// still drains what is buffered before seeing [`QueueClosed`].
#[derive(Debug)]
pub struct BlockingQueue {
    state: Mutex<State>,
    nonempty: Condvar,
    nonfull: Condvar,
}

impl BlockingQueue {
    /// Create an empty queue.
    pub fn new(capacity: usize) -> Self {
        BlockingQueue {
            state: Mutex::new(State {
                ring: RingBuffer::new(capacity),
                closed: false,
            }),
            nonempty: Condvar::new(),
            nonfull: Condvar::new(),
        }
    }

    /// Append a byte, waiting for space if the queue is full.
    pub fn push(&self, byte: u8) -> Result<(), QueueClosed> {
        let mut state = self.state.lock();
        while state.ring.is_full() && !state.closed {
            self.nonfull.wait(&mut state);
        }
        if state.closed {
            return Err(QueueClosed);
        }
        // Space was checked under the lock.
        let _ = state.ring.push(byte);
        self.nonempty.notify_one();
        Ok(())
    }

    /// Remove the oldest byte, waiting until one is available.
    pub fn pop(&self) -> Result<u8, QueueClosed> {
        let mut state = self.state.lock();
        loop {
            if let Some(byte) = state.ring.pop() {
                self.nonfull.notify_one();
                return Ok(byte);
            }
            if state.closed {
                return Err(QueueClosed);
            }
            self.nonempty.wait(&mut state);
        }
    }

    /// Close the queue and wake every waiter.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.nonempty.notify_all();
        self.nonfull.notify_all();
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of buffered bytes.
    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_push_pop_in_order() {
        let queue = BlockingQueue::new(8);
        for b in 0..8 {
            queue.push(b).unwrap();
        }
        for b in 0..8 {
            assert_eq!(queue.pop(), Ok(b));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_producer_blocks_when_full() {
        let queue = Arc::new(BlockingQueue::new(4));
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                for b in 0..6u8 {
                    queue.push(b).unwrap();
                }
            })
        };

        // Wait for the producer to fill the queue and stall.
        while queue.len() < 4 {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());
        assert_eq!(queue.len(), 4);

        let received: Vec<u8> = (0..6).map(|_| queue.pop().unwrap()).collect();
        producer.join().unwrap();
        assert_eq!(received, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_close_wakes_consumer() {
        let queue = Arc::new(BlockingQueue::new(4));
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(consumer.join().unwrap(), Err(QueueClosed));
    }

    #[test]
    fn test_close_wakes_blocked_producer() {
        let queue = Arc::new(BlockingQueue::new(1));
        queue.push(1).unwrap();
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(2))
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(producer.join().unwrap(), Err(QueueClosed));
    }

    #[test]
    fn test_drains_before_reporting_closed() {
        let queue = BlockingQueue::new(4);
        queue.push(7).unwrap();
        queue.close();
        assert_eq!(queue.pop(), Ok(7));
        assert_eq!(queue.pop(), Err(QueueClosed));
        assert_eq!(queue.push(8), Err(QueueClosed));
    }
}
