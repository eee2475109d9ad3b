//! Byte-stream transport
//!
//! The session only needs three things from the link: a single write, a bounded wait
//! for incoming data and a read of whatever is available.

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

/// Interval between `bytes_to_read` polls while waiting on a serial port
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Outcome of waiting for the transport to become readable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Data can be read without blocking
    Ready,
    /// The timeout expired with nothing to read
    TimedOut,
    /// The wait was interrupted by a signal before it completed
    Interrupted,
}

/// Duplex byte stream to a drive
pub trait Transport: Send {
    /// Write `bytes` in one call, returning how many were accepted
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Wait up to `timeout` for data to become available
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<Readiness>;

    /// Read up to `buf.len()` bytes
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Serial port wrapper implementing [`Transport`]
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Wrap an already opened and configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .finish()
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        Write::write(&mut self.port, bytes)
    }

    fn poll_readable(&mut self, timeout: Duration) -> io::Result<Readiness> {
        let start = Instant::now();
        loop {
            match self.port.bytes_to_read() {
                Ok(0) => {}
                Ok(_) => return Ok(Readiness::Ready),
                Err(e) if e.kind() == serialport::ErrorKind::Io(io::ErrorKind::Interrupted) => {
                    return Ok(Readiness::Interrupted);
                }
                Err(e) => return Err(io::Error::new(io::ErrorKind::Other, e)),
            }

            if start.elapsed() >= timeout {
                return Ok(Readiness::TimedOut);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut self.port, buf)
    }
}
