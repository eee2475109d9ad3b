//! Frame encoding/decoding
//!
//! Command and response headers share one layout; only bytes 3 and 4 differ:
//!
//! ```text
//! +-----+------+---------+--------+--------+-------------+---------+
//! | sof | addr | control | index  | offset | payload_len | crc     |
//! |     |      |         | status1| status2|   (words)   | 2 B, BE |
//! +-----+------+---------+--------+--------+-------------+---------+
//! [ payload: payload_len * 2 bytes ][ payload crc: 2 B, BE ]
//! ```
//!
//! Header and payload CRCs are computed independently, each from a zeroed accumulator.
//! Payload bytes go out exactly as given; only the CRC fields are byte-swapped.

use byteorder::{BigEndian, ByteOrder};

use super::{
    AccessType, ControlByte, CrcTable, ProtocolError, CHECKSUM_SIZE, HEADER_SIZE,
    MAX_PAYLOAD_WORDS, SOF_BYTE,
};

/// Parameters of a single command
#[derive(Debug, Clone, Copy)]
pub struct CommandParams<'a> {
    /// Access type placed in the control byte
    pub access: AccessType,
    /// Parameter group
    pub index: u8,
    /// Parameter within the group
    pub offset: u8,
    /// Expected size of the response payload in bytes (read commands only)
    pub response_len: usize,
    /// Payload sent with the command (write and read-write commands)
    pub payload: &'a [u8],
}

impl<'a> CommandParams<'a> {
    /// Read `response_len` bytes from (index, offset)
    pub fn read(index: u8, offset: u8, response_len: usize) -> Self {
        Self {
            access: AccessType::Read,
            index,
            offset,
            response_len,
            payload: &[],
        }
    }

    /// Write `payload` to (index, offset)
    pub fn write(index: u8, offset: u8, payload: &'a [u8]) -> Self {
        Self {
            access: AccessType::Write,
            index,
            offset,
            response_len: 0,
            payload,
        }
    }

    /// Write `payload` to (index, offset) and read the same number of words back
    pub fn read_write(index: u8, offset: u8, payload: &'a [u8]) -> Self {
        Self {
            access: AccessType::ReadWrite,
            index,
            offset,
            response_len: payload.len(),
            payload,
        }
    }

    /// Word count for the header's `payload_len` field
    pub fn payload_len_words(&self) -> Result<u8, ProtocolError> {
        let bytes = match self.access {
            AccessType::Read => self.response_len,
            AccessType::Write | AccessType::ReadWrite => self.payload.len(),
            AccessType::Unused => return Err(ProtocolError::InvalidAccessType(self.access as u8)),
        };
        let words = bytes / 2;
        if words > MAX_PAYLOAD_WORDS {
            return Err(ProtocolError::LengthOutOfRange { bytes });
        }
        Ok(words as u8)
    }
}

/// Header of a command sent to a drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    /// Start of frame marker
    pub sof: u8,
    /// Destination address
    pub address: u8,
    /// Access type and sequence number
    pub control: ControlByte,
    /// Parameter group
    pub index: u8,
    /// Parameter within the group
    pub offset: u8,
    /// Payload length in words
    pub payload_len: u8,
    /// CRC of the preceding header bytes
    pub crc: u16,
}

impl CommandHeader {
    /// Create a header with a zeroed CRC field
    pub fn new(address: u8, control: ControlByte, index: u8, offset: u8, payload_len: u8) -> Self {
        Self {
            sof: SOF_BYTE,
            address,
            control,
            index,
            offset,
            payload_len,
            crc: 0,
        }
    }

    /// Compute and store the header CRC
    pub fn seal(mut self, table: &CrcTable) -> Self {
        self.crc = 0;
        self.crc = header_crc(table, &self.to_bytes());
        self
    }

    /// Serialize to wire order
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [
            self.sof,
            self.address,
            self.control.as_byte(),
            self.index,
            self.offset,
            self.payload_len,
            0,
            0,
        ];
        BigEndian::write_u16(&mut bytes[HEADER_SIZE - CHECKSUM_SIZE..], self.crc);
        bytes
    }

    /// Parse from wire order
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            sof: bytes[0],
            address: bytes[1],
            control: ControlByte::from_byte(bytes[2]),
            index: bytes[3],
            offset: bytes[4],
            payload_len: bytes[5],
            crc: BigEndian::read_u16(&bytes[HEADER_SIZE - CHECKSUM_SIZE..]),
        }
    }

    /// Payload size in bytes
    pub fn payload_bytes(&self) -> usize {
        self.payload_len as usize * 2
    }
}

/// Header of a response received from a drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Start of frame marker
    pub sof: u8,
    /// Address (0xFF for drive-to-master)
    pub address: u8,
    /// Access type and sequence number
    pub control: ControlByte,
    /// Command completion status
    pub status1: u8,
    /// Secondary status flags
    pub status2: u8,
    /// Payload length in words
    pub payload_len: u8,
    /// CRC of the preceding header bytes
    pub crc: u16,
}

impl ResponseHeader {
    /// Create a header with a zeroed CRC field
    pub fn new(
        address: u8,
        control: ControlByte,
        status1: u8,
        status2: u8,
        payload_len: u8,
    ) -> Self {
        Self {
            sof: SOF_BYTE,
            address,
            control,
            status1,
            status2,
            payload_len,
            crc: 0,
        }
    }

    /// Compute and store the header CRC
    pub fn seal(mut self, table: &CrcTable) -> Self {
        self.crc = 0;
        self.crc = header_crc(table, &self.to_bytes());
        self
    }

    /// Serialize to wire order
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [
            self.sof,
            self.address,
            self.control.as_byte(),
            self.status1,
            self.status2,
            self.payload_len,
            0,
            0,
        ];
        BigEndian::write_u16(&mut bytes[HEADER_SIZE - CHECKSUM_SIZE..], self.crc);
        bytes
    }

    /// Parse from wire order
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            sof: bytes[0],
            address: bytes[1],
            control: ControlByte::from_byte(bytes[2]),
            status1: bytes[3],
            status2: bytes[4],
            payload_len: bytes[5],
            crc: BigEndian::read_u16(&bytes[HEADER_SIZE - CHECKSUM_SIZE..]),
        }
    }

    /// CRC the header should carry, recomputed from its other fields
    pub fn expected_crc(&self, table: &CrcTable) -> u16 {
        header_crc(table, &self.to_bytes())
    }

    /// Interpreted `status1`
    pub fn status(&self) -> ResponseStatus {
        ResponseStatus::from(self.status1)
    }

    /// Payload size in bytes
    pub fn payload_bytes(&self) -> usize {
        self.payload_len as usize * 2
    }
}

/// Completion status reported in `status1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Command completed
    Complete,
    /// Command not completed
    Incomplete,
    /// Invalid command
    InvalidCommand,
    /// Parameter not accessible with the current access level
    NoAccess,
    /// Drive detected a framing or CRC error in the command
    FrameError,
    /// Any other code
    Unknown(u8),
}

impl ResponseStatus {
    /// Wire code
    pub fn code(self) -> u8 {
        match self {
            ResponseStatus::Complete => 1,
            ResponseStatus::Incomplete => 2,
            ResponseStatus::InvalidCommand => 3,
            ResponseStatus::NoAccess => 6,
            ResponseStatus::FrameError => 8,
            ResponseStatus::Unknown(code) => code,
        }
    }

    /// Map to `Ok` for a completed command, otherwise the matching error
    pub fn into_result(self) -> Result<(), ProtocolError> {
        match self {
            ResponseStatus::Complete => Ok(()),
            ResponseStatus::Incomplete => Err(ProtocolError::ResponseIncomplete),
            ResponseStatus::InvalidCommand => Err(ProtocolError::ResponseInvalidCommand),
            ResponseStatus::NoAccess => Err(ProtocolError::ResponseNoAccess),
            ResponseStatus::FrameError => Err(ProtocolError::ResponseFrameError),
            ResponseStatus::Unknown(code) => Err(ProtocolError::ResponseUnknownStatus(code)),
        }
    }
}

impl From<u8> for ResponseStatus {
    fn from(code: u8) -> Self {
        match code {
            1 => ResponseStatus::Complete,
            2 => ResponseStatus::Incomplete,
            3 => ResponseStatus::InvalidCommand,
            6 => ResponseStatus::NoAccess,
            8 => ResponseStatus::FrameError,
            other => ResponseStatus::Unknown(other),
        }
    }
}

/// Assemble a complete frame: header, then payload and its CRC when the payload is non-empty
pub fn encode_frame(table: &CrcTable, header: [u8; HEADER_SIZE], payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    bytes.extend_from_slice(&header);

    if !payload.is_empty() {
        bytes.extend_from_slice(payload);
        let mut crc_bytes = [0u8; CHECKSUM_SIZE];
        BigEndian::write_u16(&mut crc_bytes, table.checksum(payload));
        bytes.extend_from_slice(&crc_bytes);
    }

    bytes
}

/// CRC over every header byte except the trailing CRC field
fn header_crc(table: &CrcTable, bytes: &[u8; HEADER_SIZE]) -> u16 {
    table.checksum(&bytes[..HEADER_SIZE - CHECKSUM_SIZE])
}
