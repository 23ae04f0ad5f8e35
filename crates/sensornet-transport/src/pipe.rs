//! In-memory serial lines.
//!
//! Stand-ins for a radio's serial port in tests and simulations. A read
//! with nothing to deliver waits up to [`READ_TIMEOUT`] and then fails with
//! [`ErrorKind::TimedOut`], like a tty with a read timeout. Once the writing
//! end is dropped, reads return end-of-stream.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use crate::Device;

/// How long a read waits before reporting a timeout.
pub const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Write end of a [`pipe`].
#[derive(Debug, Clone)]
pub struct PipeWriter {
    tx: Sender<Vec<u8>>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(ErrorKind::BrokenPipe, "pipe reader dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read end of a [`pipe`].
#[derive(Debug)]
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.offset >= self.pending.len() {
            match self.rx.recv_timeout(READ_TIMEOUT) {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(io::Error::new(ErrorKind::TimedOut, "no data"));
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.offset);
        buf[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

/// A one-way byte pipe.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = unbounded();
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            pending: Vec::new(),
            offset: 0,
        },
    )
}

/// Two devices wired back to back: what one writes, the other reads.
pub fn serial_pair() -> (Device, Device) {
    let (a_tx, a_rx) = pipe();
    let (b_tx, b_rx) = pipe();
    (
        Device::Stream {
            reader: Box::new(b_rx),
            writer: Box::new(a_tx),
        },
        Device::Stream {
            reader: Box::new(a_rx),
            writer: Box::new(b_tx),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_delivers_in_order() {
        let (mut tx, mut rx) = pipe();
        tx.write_all(b"abc").unwrap();
        tx.write_all(b"de").unwrap();
        let mut buf = [0u8; 2];
        let mut out = Vec::new();
        while out.len() < 5 {
            let n = rx.read(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"abcde");
    }

    #[test]
    fn test_read_times_out_then_ends() {
        let (tx, mut rx) = pipe();
        let mut buf = [0u8; 4];
        assert_eq!(rx.read(&mut buf).unwrap_err().kind(), ErrorKind::TimedOut);
        drop(tx);
        assert_eq!(rx.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_after_reader_dropped_fails() {
        let (mut tx, rx) = pipe();
        drop(rx);
        assert_eq!(tx.write(b"x").unwrap_err().kind(), ErrorKind::BrokenPipe);
    }
}
