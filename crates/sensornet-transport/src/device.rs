//! Serial device handles.

use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::fmt;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::{Result, TransportError};

/// Boxed read half of a device.
pub type DeviceReader = Box<dyn Read + Send>;

/// Boxed write half of a device.
pub type DeviceWriter = Box<dyn Write + Send>;

/// Line speed of the radio's serial port.
pub const SERIAL_BAUD_RATE: u32 = 9600;

/// Longest a read on a path device waits for data. The receive thread checks
/// for shutdown between reads, so this bounds how long `shutdown` can take on
/// a silent line.
pub const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Something that can be opened as a serial line.
pub enum Device {
    /// A serial port, opened raw at [`SERIAL_BAUD_RATE`] 8N1 without flow
    /// control, with [`SERIAL_READ_TIMEOUT`] reads.
    Path(PathBuf),
    /// Already-open halves, e.g. an in-memory [`pipe`](crate::pipe).
    Stream {
        /// Read half.
        reader: DeviceReader,
        /// Write half.
        writer: DeviceWriter,
    },
}

impl Device {
    /// Open the device, returning its read and write halves.
    pub fn open(self) -> Result<(DeviceReader, DeviceWriter)> {
        match self {
            Device::Path(path) => {
                let open_error = |e: serialport::Error| TransportError::Open {
                    path: path.clone(),
                    source: io::Error::from(e),
                };
                let port = serialport::new(path.to_string_lossy(), SERIAL_BAUD_RATE)
                    .data_bits(DataBits::Eight)
                    .parity(Parity::None)
                    .stop_bits(StopBits::One)
                    .flow_control(FlowControl::None)
                    .timeout(SERIAL_READ_TIMEOUT)
                    .open()
                    .map_err(open_error)?;
                let reader = port.try_clone().map_err(open_error)?;
                Ok((Box::new(reader), Box::new(port)))
            }
            Device::Stream { reader, writer } => Ok((reader, writer)),
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Device::Stream { .. } => f.write_str("Stream"),
        }
    }
}

impl From<PathBuf> for Device {
    fn from(path: PathBuf) -> Self {
        Device::Path(path)
    }
}
