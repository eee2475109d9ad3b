//! Session management
//!
//! A session owns the transport to one drive and runs one exchange at a time:
//! a command goes out, then the response is consumed completely or the exchange
//! fails. Nothing is retried and the stream is never resynchronized; a failed
//! exchange leaves the session usable for the next one.

use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use std::io;
use std::time::Duration;

use super::{
    packet::encode_frame, CommandHeader, CommandParams, ControlByte, CrcTable, Direction,
    FrameObserver, ProtocolError, Readiness, ReadStage, ResponseHeader, SerialTransport,
    SessionConfig, TracingObserver, Transport, CHECKSUM_SIZE, CRC_POLY, DEFAULT_TIMEOUT_MS,
    HEADER_SIZE, SOF_BYTE,
};

/// Sequence numbers occupy four bits of the control byte
const SEQUENCE_MODULUS: u8 = 16;

/// A decoded response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// Response header as received
    pub header: ResponseHeader,
    /// Header plus payload bytes read (the payload CRC is not counted)
    pub bytes_read: usize,
}

impl Reply {
    /// Number of payload bytes delivered into the caller's buffer
    pub fn payload_len(&self) -> usize {
        self.bytes_read - HEADER_SIZE
    }
}

/// Protocol session with a single drive
pub struct Session<T: Transport> {
    /// Byte stream to the drive
    transport: T,
    /// CRC lookup table, built once
    crc_table: CrcTable,
    /// Sequence number of the last command built
    seq_ctr: u8,
    /// Destination address
    address: u8,
    /// Bound on each wait for response data
    timeout: Duration,
    /// Whether the observer sees raw frames
    diagnostics: bool,
    observer: Box<dyn FrameObserver>,
}

impl Session<SerialTransport> {
    /// Open the configured serial port and start a session on it
    pub fn open(config: &SessionConfig) -> Result<Self, ProtocolError> {
        let port = super::open_port(&config.port_name, config.baud_rate)?;
        Ok(Self::from_config(SerialTransport::new(port), config))
    }
}

impl<T: Transport> Session<T> {
    /// Create a session for the drive at `address`
    pub fn new(transport: T, address: u8) -> Self {
        Self {
            transport,
            crc_table: CrcTable::new(CRC_POLY),
            seq_ctr: 0,
            address,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            diagnostics: false,
            observer: Box::new(TracingObserver),
        }
    }

    /// Create a session using the address, timeout and diagnostics flag of `config`
    pub fn from_config(transport: T, config: &SessionConfig) -> Self {
        let mut session = Self::new(transport, config.address);
        session.timeout = config.timeout();
        session.diagnostics = config.diagnostics;
        session
    }

    /// Destination address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Sequence number of the most recently built command
    pub fn sequence(&self) -> u8 {
        self.seq_ctr
    }

    /// Bound on each wait for response data
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Change the bound on each wait for response data
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Whether raw frames are passed to the observer
    pub fn diagnostics_enabled(&self) -> bool {
        self.diagnostics
    }

    /// Enable or disable passing raw frames to the observer
    pub fn set_diagnostics(&mut self, enabled: bool) {
        self.diagnostics = enabled;
    }

    /// Replace the frame observer (defaults to [`TracingObserver`])
    pub fn set_observer(&mut self, observer: impl FrameObserver + 'static) {
        self.observer = Box::new(observer);
    }

    /// CRC table used for every checksum in this session
    pub fn crc_table(&self) -> &CrcTable {
        &self.crc_table
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// End the session and return the transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send a command and read its response into `payload`
    pub fn exchange(
        &mut self,
        params: &CommandParams<'_>,
        payload: &mut [u8],
    ) -> Result<Reply, ProtocolError> {
        self.send_command(params)?;
        self.read_response(payload)
    }

    /// Build and transmit a command frame
    ///
    /// The sequence number advances before anything else happens, so it moves even
    /// when the command is rejected or the write fails.
    pub fn send_command(
        &mut self,
        params: &CommandParams<'_>,
    ) -> Result<CommandHeader, ProtocolError> {
        let seq = self.next_sequence();
        let payload_len = params.payload_len_words()?;

        let control = ControlByte::new(params.access, seq);
        let header = CommandHeader::new(
            self.address,
            control,
            params.index,
            params.offset,
            payload_len,
        )
        .seal(&self.crc_table);
        let frame = encode_frame(&self.crc_table, header.to_bytes(), params.payload);

        tracing::debug!(
            seq,
            access = ?params.access,
            index = params.index,
            offset = params.offset,
            words = payload_len,
            "sending command"
        );
        self.observe(Direction::Outgoing, &frame);

        let written = self.transport.write(&frame)?;
        if written != frame.len() {
            tracing::debug!(written, expected = frame.len(), "could not write command");
            return Err(ProtocolError::WriteShortfall {
                expected: frame.len(),
                written,
            });
        }

        Ok(header)
    }

    /// Receive and validate a response
    ///
    /// Data-bearing responses are read into `payload`, which must be large enough for
    /// the length the drive claims. A response with a non-complete status is reported
    /// as an error before any payload is read.
    pub fn read_response(&mut self, payload: &mut [u8]) -> Result<Reply, ProtocolError> {
        let mut raw = [0u8; HEADER_SIZE];
        self.read_exact(&mut raw, ReadStage::Header)?;
        self.observe(Direction::Incoming, &raw);

        let header = ResponseHeader::from_bytes(&raw);
        tracing::trace!(seq = header.control.sequence(), "read response header");
        if header.sof != SOF_BYTE {
            tracing::warn!(sof = header.sof, "response does not start with SOF marker");
        }

        let expected = header.expected_crc(&self.crc_table);
        if expected != header.crc {
            tracing::debug!(
                "Header CRC failed (expected {:04X}, got {:04X})",
                expected,
                header.crc
            );
            return Err(ProtocolError::HeaderChecksumMismatch {
                expected,
                actual: header.crc,
            });
        }

        if let Err(e) = header.status().into_result() {
            tracing::debug!(status1 = header.status1, status2 = header.status2, "{}", e);
            return Err(e);
        }

        if !header.control.access_type().carries_payload() {
            return Ok(Reply {
                header,
                bytes_read: HEADER_SIZE,
            });
        }

        let claimed = header.payload_bytes();
        self.read_payload(payload, claimed)?;
        self.observe(Direction::Incoming, &payload[..claimed]);

        let mut crc_raw = [0u8; CHECKSUM_SIZE];
        self.read_exact(&mut crc_raw, ReadStage::PayloadChecksum)?;
        self.observe(Direction::Incoming, &crc_raw);

        let actual = BigEndian::read_u16(&crc_raw);
        let expected = self.crc_table.checksum(&payload[..claimed]);
        if expected != actual {
            tracing::debug!(
                "Payload CRC failed (expected {:04X}, got {:04X})",
                expected,
                actual
            );
            return Err(ProtocolError::PayloadChecksumMismatch { expected, actual });
        }

        Ok(Reply {
            header,
            bytes_read: HEADER_SIZE + claimed,
        })
    }

    fn next_sequence(&mut self) -> u8 {
        self.seq_ctr = (self.seq_ctr + 1) % SEQUENCE_MODULUS;
        self.seq_ctr
    }

    fn observe(&mut self, direction: Direction, bytes: &[u8]) {
        if self.diagnostics {
            self.observer.on_frame(direction, bytes);
        }
    }

    /// Read `claimed` payload bytes without ever writing past the end of `payload`
    fn read_payload(&mut self, payload: &mut [u8], claimed: usize) -> Result<(), ProtocolError> {
        let limit = claimed.min(payload.len());
        let mut filled = 0;

        while filled < claimed {
            if filled >= limit {
                tracing::debug!(
                    capacity = payload.len(),
                    claimed,
                    "Payload received exceeds max size"
                );
                return Err(ProtocolError::PayloadBufferOverflow {
                    capacity: payload.len(),
                    claimed,
                });
            }
            self.wait_readable(ReadStage::Payload)?;
            filled += self.read_chunk(&mut payload[filled..limit], ReadStage::Payload)?;
        }
        Ok(())
    }

    /// Fill `buf` completely; every wait for more data gets the full timeout
    fn read_exact(&mut self, buf: &mut [u8], stage: ReadStage) -> Result<(), ProtocolError> {
        let mut filled = 0;
        while filled < buf.len() {
            self.wait_readable(stage)?;
            filled += self.read_chunk(&mut buf[filled..], stage)?;
        }
        Ok(())
    }

    fn wait_readable(&mut self, stage: ReadStage) -> Result<(), ProtocolError> {
        loop {
            match self.transport.poll_readable(self.timeout) {
                Ok(Readiness::Ready) => return Ok(()),
                Ok(Readiness::TimedOut) => {
                    tracing::debug!("Timed out reading {}", stage);
                    return Err(ProtocolError::ReadTimeout { stage });
                }
                Ok(Readiness::Interrupted) => {
                    tracing::trace!("wait for {} interrupted, retrying", stage);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    tracing::trace!("wait for {} interrupted, retrying", stage);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_chunk(&mut self, buf: &mut [u8], stage: ReadStage) -> Result<usize, ProtocolError> {
        match self.transport.read(buf) {
            Ok(0) => {
                tracing::debug!("stream closed while reading {}", stage);
                Err(ProtocolError::ReadTimeout { stage })
            }
            Ok(n) => {
                tracing::trace!(bytes = n, "read {}", stage);
                Ok(n)
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(ref e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                ) =>
            {
                tracing::debug!("no data after readiness while reading {}", stage);
                Err(ProtocolError::ReadTimeout { stage })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport)
            .field("seq_ctr", &self.seq_ctr)
            .field("address", &self.address)
            .field("timeout", &self.timeout)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AccessType;

    /// Accepts every write, never has anything to read
    struct SilentLink {
        written: Vec<u8>,
    }

    impl Transport for SilentLink {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn poll_readable(&mut self, _timeout: Duration) -> io::Result<Readiness> {
            Ok(Readiness::TimedOut)
        }

        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    fn session() -> Session<SilentLink> {
        Session::new(
            SilentLink {
                written: Vec::new(),
            },
            0x3F,
        )
    }

    #[test]
    fn test_new_session_defaults() {
        let session = session();
        assert_eq!(session.sequence(), 0);
        assert_eq!(session.address(), 0x3F);
        assert_eq!(session.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert!(!session.diagnostics_enabled());
        assert_eq!(session.crc_table().entry(1), 0x1021);
    }

    #[test]
    fn test_from_config() {
        let config = SessionConfig {
            address: 0x05,
            timeout_ms: 50,
            diagnostics: true,
            ..Default::default()
        };
        let session = Session::from_config(
            SilentLink {
                written: Vec::new(),
            },
            &config,
        );
        assert_eq!(session.address(), 0x05);
        assert_eq!(session.timeout(), Duration::from_millis(50));
        assert!(session.diagnostics_enabled());
    }

    #[test]
    fn test_sequence_wraps() {
        let mut session = session();
        let mut seen = Vec::new();
        for _ in 0..34 {
            let header = session
                .send_command(&CommandParams::read(0x01, 0x00, 2))
                .unwrap();
            seen.push(header.control.sequence());
        }
        let expected: Vec<u8> = (1..=34).map(|n| (n % 16) as u8).collect();
        assert_eq!(seen, expected);
        assert!(seen.iter().all(|&s| s < 16));
    }

    #[test]
    fn test_read_command_header() {
        let mut session = session();
        let header = session
            .send_command(&CommandParams::read(0x0B, 0x00, 256))
            .unwrap();
        assert_eq!(header.payload_len, 128);
        assert_eq!(header.control.access_type(), AccessType::Read);
        assert_eq!(header.address, 0x3F);
        assert_eq!(session.transport().written, header.to_bytes().to_vec());
    }

    #[test]
    fn test_invalid_access_advances_sequence_without_writing() {
        let mut session = session();
        let params = CommandParams {
            access: AccessType::Unused,
            ..CommandParams::read(0x01, 0x00, 2)
        };
        assert!(matches!(
            session.send_command(&params),
            Err(ProtocolError::InvalidAccessType(0))
        ));
        assert_eq!(session.sequence(), 1);
        assert!(session.transport().written.is_empty());
    }

    #[test]
    fn test_timeout_on_silent_link() {
        let mut session = session();
        let mut buf = [0u8; 2];
        assert!(matches!(
            session.read_response(&mut buf),
            Err(ProtocolError::ReadTimeout {
                stage: ReadStage::Header
            })
        ));
    }

    #[test]
    fn test_reply_payload_len() {
        let header = ResponseHeader::new(0xFF, ControlByte::new(AccessType::Write, 1), 1, 0, 2);
        let reply = Reply {
            header,
            bytes_read: HEADER_SIZE + 4,
        };
        assert_eq!(reply.payload_len(), 4);
    }
}
