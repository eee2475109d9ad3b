//! Shared test transports: a scripted byte pipe and a cooperative drive simulator

#![allow(dead_code)]

use amcdrive_core::protocol::packet::encode_frame;
use amcdrive_core::protocol::{
    AccessType, CommandHeader, ControlByte, CrcTable, Readiness, ResponseHeader, Transport,
    CHECKSUM_SIZE, CRC_POLY, HEADER_SIZE, MASTER_ADDRESS,
};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::Duration;

/// Status codes as sent by a drive
pub const STATUS_COMPLETE: u8 = 1;
pub const STATUS_INCOMPLETE: u8 = 2;
pub const STATUS_INVALID: u8 = 3;
pub const STATUS_NO_ACCESS: u8 = 6;
pub const STATUS_FRAME_ERROR: u8 = 8;

pub fn crc_table() -> CrcTable {
    CrcTable::new(CRC_POLY)
}

/// Install a test subscriber so tracing output lands in the test log
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("trace")
        .with_test_writer()
        .try_init();
}

/// Build a response frame the way a drive would
pub fn response_frame(access: AccessType, seq: u8, status1: u8, payload: &[u8]) -> Vec<u8> {
    let table = crc_table();
    let header = ResponseHeader::new(
        MASTER_ADDRESS,
        ControlByte::new(access, seq),
        status1,
        0,
        (payload.len() / 2) as u8,
    )
    .seal(&table);
    let mut frame = encode_frame(&table, header.to_bytes(), payload);
    if access.carries_payload() && payload.is_empty() {
        frame.extend_from_slice(&[0, 0]);
    }
    frame
}

/// Transport whose incoming bytes, readiness and write behaviour are scripted
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Everything the session wrote
    pub written: Vec<u8>,
    /// Accept at most this many bytes per write
    pub write_limit: Option<usize>,
    /// Bytes the "drive" has sent
    pub incoming: VecDeque<u8>,
    /// Maximum bytes returned by one read (0 = unlimited)
    pub chunk: usize,
    /// Scripted poll outcomes, consumed before the default behaviour applies
    pub polls: VecDeque<Readiness>,
    /// Error returned by the next poll
    pub poll_error: Option<io::ErrorKind>,
    /// Error returned by every read instead of data
    pub read_error: Option<io::ErrorKind>,
    /// Timeout passed to each poll
    pub waits: Vec<Duration>,
    /// Number of read calls
    pub reads: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(bytes: &[u8]) -> Self {
        let mut mock = Self::new();
        mock.push(bytes);
        mock
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    pub fn chunked(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let n = self.write_limit.map_or(bytes.len(), |limit| limit.min(bytes.len()));
        self.written.extend_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn poll_readable(&mut self, timeout: Duration) -> io::Result<Readiness> {
        self.waits.push(timeout);
        if let Some(kind) = self.poll_error.take() {
            return Err(io::Error::new(kind, "scripted poll failure"));
        }
        if let Some(readiness) = self.polls.pop_front() {
            return Ok(readiness);
        }
        if self.incoming.is_empty() {
            Ok(Readiness::TimedOut)
        } else {
            Ok(Readiness::Ready)
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        if let Some(kind) = self.read_error {
            return Err(io::Error::new(kind, "scripted read failure"));
        }
        let mut n = buf.len().min(self.incoming.len());
        if self.chunk > 0 {
            n = n.min(self.chunk);
        }
        for slot in buf.iter_mut().take(n) {
            *slot = self.incoming.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

/// Register-backed drive that answers every command it receives
#[derive(Debug, Default)]
pub struct DriveSimulator {
    /// Register contents keyed by (index, offset)
    pub registers: HashMap<(u8, u8), Vec<u8>>,
    /// Writes are refused until the access control word is written
    pub require_access: bool,
    /// Answer reads with the stored value as is instead of padding it to the requested length
    pub short_reads: bool,
    /// Every command header received, in order
    pub commands: Vec<CommandHeader>,
    /// Deliver responses this many bytes per read (0 = all at once)
    pub chunk: usize,
    outgoing: VecDeque<u8>,
    access_granted: bool,
}

impl DriveSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_register(mut self, index: u8, offset: u8, value: &[u8]) -> Self {
        self.registers.insert((index, offset), value.to_vec());
        self
    }

    pub fn register(&self, index: u8, offset: u8) -> Option<&[u8]> {
        self.registers.get(&(index, offset)).map(Vec::as_slice)
    }

    fn respond(&mut self, frame: &[u8]) -> Vec<u8> {
        let table = crc_table();
        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&frame[..HEADER_SIZE]);
        let header = CommandHeader::from_bytes(&raw);
        let seq = header.control.sequence();

        if table.checksum(&raw[..HEADER_SIZE - CHECKSUM_SIZE]) != header.crc {
            return response_frame(AccessType::Read, seq, STATUS_FRAME_ERROR, &[]);
        }
        self.commands.push(header);

        let key = (header.index, header.offset);
        let len = header.payload_bytes();
        match header.control.access_type() {
            AccessType::Read => {
                let mut value = self.registers.get(&key).cloned().unwrap_or_default();
                if self.short_reads {
                    value.truncate(len);
                } else {
                    value.resize(len, 0);
                }
                response_frame(AccessType::Write, seq, STATUS_COMPLETE, &value)
            }
            access @ (AccessType::Write | AccessType::ReadWrite) => {
                let data = &frame[HEADER_SIZE..HEADER_SIZE + len];
                let crc_at = HEADER_SIZE + len;
                let sent_crc = u16::from_be_bytes([frame[crc_at], frame[crc_at + 1]]);
                if table.checksum(data) != sent_crc {
                    return response_frame(AccessType::Read, seq, STATUS_FRAME_ERROR, &[]);
                }
                if key == (0x07, 0x00) {
                    self.access_granted = true;
                } else if self.require_access && !self.access_granted {
                    return response_frame(AccessType::Read, seq, STATUS_NO_ACCESS, &[]);
                }
                self.registers.insert(key, data.to_vec());
                if access == AccessType::ReadWrite {
                    response_frame(AccessType::ReadWrite, seq, STATUS_COMPLETE, data)
                } else {
                    response_frame(AccessType::Read, seq, STATUS_COMPLETE, &[])
                }
            }
            AccessType::Unused => response_frame(AccessType::Read, seq, STATUS_INVALID, &[]),
        }
    }
}

impl Transport for DriveSimulator {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let response = self.respond(bytes);
        self.outgoing.extend(response);
        Ok(bytes.len())
    }

    fn poll_readable(&mut self, _timeout: Duration) -> io::Result<Readiness> {
        if self.outgoing.is_empty() {
            Ok(Readiness::TimedOut)
        } else {
            Ok(Readiness::Ready)
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = buf.len().min(self.outgoing.len());
        if self.chunk > 0 {
            n = n.min(self.chunk);
        }
        for slot in buf.iter_mut().take(n) {
            *slot = self.outgoing.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}
