//! # amcdrive Core Library
//!
//! Parameter access for AMC servo drives over a half-duplex serial link.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The binary request/response protocol (framing, CRC-16, sequence numbers)
//! - A timeout-bounded response decoder tolerant of partial reads
//! - Typed access to drive registers addressed by index and offset
//! - Serial port discovery and configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use amcdrive_core::{drive::Drive, protocol::{Session, SessionConfig}};
//!
//! let config = SessionConfig {
//!     port_name: "/dev/ttyUSB0".into(),
//!     ..Default::default()
//! };
//! let mut drive = Drive::new(Session::open(&config)?);
//! drive.get_access_control()?;
//!
//! println!("Drive name: {}", drive.drive_name()?);
//! println!("Interface 3 = {}", drive.get_command_param(3)?);
//! ```

pub mod drive;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::drive::{Drive, ProductInfo, StatusReport};
    pub use crate::protocol::{
        AccessType, CommandParams, ProtocolError, Reply, Session, SessionConfig, Transport,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
