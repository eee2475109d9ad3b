//! Control byte
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! +-------+---------------+-------+
//! | rsvd  |   sequence    | type  |
//! +-------+---------------+-------+
//! ```

use super::ProtocolError;

const ACCESS_MASK: u8 = 0b0000_0011;
const SEQUENCE_SHIFT: u8 = 2;
const SEQUENCE_MASK: u8 = 0b0011_1100;
const RESERVED_MASK: u8 = 0b1100_0000;

/// Direction of data in an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AccessType {
    /// Not used
    Unused = 0,
    /// Command carries no data, response carries `payload_len` words
    Read = 1,
    /// Command carries `payload_len` words, response carries none
    Write = 2,
    /// Command and response both carry `payload_len` words
    ReadWrite = 3,
}

impl AccessType {
    /// Decode the two access bits of a control byte
    pub fn from_bits(bits: u8) -> Self {
        match bits & ACCESS_MASK {
            1 => AccessType::Read,
            2 => AccessType::Write,
            3 => AccessType::ReadWrite,
            _ => AccessType::Unused,
        }
    }

    /// Whether a frame with this access type is followed by a payload
    pub fn carries_payload(self) -> bool {
        (self as u8) & 0x02 != 0
    }
}

impl TryFrom<u8> for AccessType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value & !ACCESS_MASK != 0 {
            return Err(ProtocolError::InvalidAccessType(value));
        }
        Ok(AccessType::from_bits(value))
    }
}

/// Control byte of a command or response header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ControlByte(u8);

impl ControlByte {
    /// Build a control byte; the sequence is truncated to four bits, reserved bits are zero
    pub fn new(access: AccessType, sequence: u8) -> Self {
        Self((access as u8) | ((sequence << SEQUENCE_SHIFT) & SEQUENCE_MASK))
    }

    /// Wrap a raw byte as received
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Raw byte for the wire
    pub fn as_byte(self) -> u8 {
        self.0
    }

    /// Access type bits
    pub fn access_type(self) -> AccessType {
        AccessType::from_bits(self.0)
    }

    /// Sequence number (0-15)
    pub fn sequence(self) -> u8 {
        (self.0 & SEQUENCE_MASK) >> SEQUENCE_SHIFT
    }

    /// Reserved bits, shifted down
    pub fn reserved(self) -> u8 {
        (self.0 & RESERVED_MASK) >> 6
    }
}

impl From<ControlByte> for u8 {
    fn from(control: ControlByte) -> u8 {
        control.0
    }
}
