//! Fixed-capacity ring buffer.

/// A fixed-capacity FIFO of bytes.
///
/// `head` is the next slot to read, `tail` the next slot to write, both
/// modulo capacity. `count` disambiguates full from empty.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    elements: Box<[u8]>,
    head: usize,
    tail: usize,
    count: usize,
}

impl RingBuffer {
    /// Create an empty buffer.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        RingBuffer {
            elements: vec![0; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Append a byte, handing it back if the buffer is full.
    pub fn push(&mut self, byte: u8) -> Result<(), u8> {
        if self.is_full() {
            return Err(byte);
        }
        self.elements[self.tail] = byte;
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
        Ok(())
    }

    /// Remove the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.elements[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        Some(byte)
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Maximum number of buffered bytes.
    pub fn capacity(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if no more bytes fit.
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_across_wrap() {
        let mut ring = RingBuffer::new(4);
        for b in 0..3 {
            ring.push(b).unwrap();
        }
        assert_eq!(ring.pop(), Some(0));
        assert_eq!(ring.pop(), Some(1));
        for b in 3..6 {
            ring.push(b).unwrap();
        }
        assert!(ring.is_full());
        let drained: Vec<u8> = std::iter::from_fn(|| ring.pop()).collect();
        assert_eq!(drained, vec![2, 3, 4, 5]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_push_when_full_returns_byte() {
        let mut ring = RingBuffer::new(2);
        ring.push(1).unwrap();
        ring.push(2).unwrap();
        assert_eq!(ring.push(3), Err(3));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.pop(), Some(1));
    }

    #[test]
    fn test_clear() {
        let mut ring = RingBuffer::new(3);
        ring.push(9).unwrap();
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.pop(), None);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_panics() {
        let _ = RingBuffer::new(0);
    }
}
