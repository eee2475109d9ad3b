//! Protocol errors

use std::fmt;

use thiserror::Error;

/// Part of a response that was being received when a wait ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStage {
    /// The fixed-size response header
    Header,
    /// The variable-length payload
    Payload,
    /// The CRC trailing the payload
    PayloadChecksum,
}

impl fmt::Display for ReadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadStage::Header => f.write_str("response header"),
            ReadStage::Payload => f.write_str("payload"),
            ReadStage::PayloadChecksum => f.write_str("payload CRC"),
        }
    }
}

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid access type: {0}")]
    InvalidAccessType(u8),

    #[error("Short write: {written} of {expected} bytes sent")]
    WriteShortfall { expected: usize, written: usize },

    #[error("Timed out reading {stage}")]
    ReadTimeout { stage: ReadStage },

    #[error("Header CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    HeaderChecksumMismatch { expected: u16, actual: u16 },

    #[error("Payload CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    PayloadChecksumMismatch { expected: u16, actual: u16 },

    #[error("Command not completed")]
    ResponseIncomplete,

    #[error("Invalid command")]
    ResponseInvalidCommand,

    #[error("No access")]
    ResponseNoAccess,

    #[error("Frame error")]
    ResponseFrameError,

    #[error("Unknown response status: {0:#04x}")]
    ResponseUnknownStatus(u8),

    #[error("Payload received exceeds max size: {claimed} bytes into a {capacity} byte buffer")]
    PayloadBufferOverflow { capacity: usize, claimed: usize },

    #[error("Length of {bytes} bytes does not fit in a frame")]
    LengthOutOfRange { bytes: usize },

    #[error("Register returned {actual} bytes, expected {expected}")]
    UnexpectedLength { expected: usize, actual: usize },

    #[error("Invalid parameter number: {0}")]
    InvalidParameter(u8),

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the drive answered with a valid frame carrying a non-complete status
    pub fn is_drive_status(&self) -> bool {
        matches!(
            self,
            ProtocolError::ResponseIncomplete
                | ProtocolError::ResponseInvalidCommand
                | ProtocolError::ResponseNoAccess
                | ProtocolError::ResponseFrameError
                | ProtocolError::ResponseUnknownStatus(_)
        )
    }
}
