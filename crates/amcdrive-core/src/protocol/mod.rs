//! Serial Protocol Communication
//!
//! Implements the AMC binary command/response protocol used by the servo drives.
//!
//! Every frame starts with an 8-byte header protected by its own CRC-16; an optional
//! payload follows with a second, independent CRC-16.

mod config;
pub mod control;
pub mod crc;
mod error;
pub mod monitor;
pub mod packet;
pub mod serial;
mod session;
pub mod transport;

pub use config::SessionConfig;
pub use control::{AccessType, ControlByte};
pub use crc::CrcTable;
pub use error::{ProtocolError, ReadStage};
pub use monitor::{Direction, FrameObserver, TracingObserver};
pub use packet::{CommandHeader, CommandParams, ResponseHeader, ResponseStatus};
pub use serial::{list_ports, open_port, PortInfo};
pub use session::{Reply, Session};
pub use transport::{Readiness, SerialTransport, Transport};

/// Start of frame marker carried by every command and response
pub const SOF_BYTE: u8 = 0xA5;

/// CRC polynomial used by AMC drives
pub const CRC_POLY: u16 = 0x1021;

/// Default baud rate for drive communication
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default timeout for each wait on response data, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default drive address
pub const DEFAULT_ADDRESS: u8 = 0x3F;

/// Destination address that reaches every drive on the bus
pub const BROADCAST_ADDRESS: u8 = 0x00;

/// Address reserved for drive-to-master messages
pub const MASTER_ADDRESS: u8 = 0xFF;

/// Size of a command or response header on the wire
pub const HEADER_SIZE: usize = 8;

/// Size of a CRC field on the wire
pub const CHECKSUM_SIZE: usize = 2;

/// Largest payload expressible in the 8-bit word count of a header
pub const MAX_PAYLOAD_WORDS: usize = u8::MAX as usize;
