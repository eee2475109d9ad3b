//! Wire monitor
//!
//! Observers see raw frame bytes as they cross the link. They are only invoked while a
//! session has diagnostics enabled and never influence the exchange.

use std::fmt::Write as _;

/// Which way bytes travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to drive
    Outgoing,
    /// Drive to host
    Incoming,
}

/// Receives raw frame bytes for diagnostics
pub trait FrameObserver: Send {
    /// Called with each chunk of frame bytes
    fn on_frame(&mut self, direction: Direction, bytes: &[u8]);
}

impl<F> FrameObserver for F
where
    F: FnMut(Direction, &[u8]) + Send,
{
    fn on_frame(&mut self, direction: Direction, bytes: &[u8]) {
        self(direction, bytes)
    }
}

/// Logs frames at `debug` level on the `amcdrive::wire` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FrameObserver for TracingObserver {
    fn on_frame(&mut self, direction: Direction, bytes: &[u8]) {
        let dump = hex_dump(direction, bytes);
        match direction {
            Direction::Outgoing => tracing::debug!(target: "amcdrive::wire", "tx {}", dump),
            Direction::Incoming => tracing::debug!(target: "amcdrive::wire", "rx {}", dump),
        }
    }
}

/// Render bytes as `[A5][3F]` (outgoing) or `<A5><FF>` (incoming)
pub fn hex_dump(direction: Direction, bytes: &[u8]) -> String {
    let (open, close) = match direction {
        Direction::Outgoing => ('[', ']'),
        Direction::Incoming => ('<', '>'),
    };
    let mut out = String::with_capacity(bytes.len() * 4);
    for byte in bytes {
        let _ = write!(out, "{}{:02X}{}", open, byte, close);
    }
    out
}
