//! Table-driven CRC-16
//!
//! The drives protect headers and payloads with a 16-bit CRC (polynomial 0x1021,
//! zero initial value, no reflection). The lookup table is built once per session and
//! every checksum domain folds bytes through its own accumulator starting at zero.

/// 256-entry lookup table for a 16-bit CRC polynomial
#[derive(Clone, PartialEq, Eq)]
pub struct CrcTable {
    entries: [u16; 256],
}

impl CrcTable {
    /// Build the lookup table for `poly`
    pub fn new(poly: u16) -> Self {
        let mut entries = [0u16; 256];
        for (byte, entry) in entries.iter_mut().enumerate() {
            *entry = shift_register(byte as u8, poly, 0);
        }
        Self { entries }
    }

    /// Table entry for a byte value
    pub fn entry(&self, byte: u8) -> u16 {
        self.entries[byte as usize]
    }

    /// Fold a single byte into a running accumulator
    #[inline]
    pub fn fold(&self, byte: u8, accumulator: &mut u16) {
        let idx = ((*accumulator >> 8) ^ byte as u16) as usize;
        *accumulator = (*accumulator << 8) ^ self.entries[idx];
    }

    /// CRC of `data` using a fresh, zeroed accumulator
    pub fn checksum(&self, data: &[u8]) -> u16 {
        let mut accumulator = 0u16;
        for &byte in data {
            self.fold(byte, &mut accumulator);
        }
        accumulator
    }
}

impl std::fmt::Debug for CrcTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrcTable")
            .field("entry_1", &format_args!("{:#06x}", self.entries[1]))
            .finish_non_exhaustive()
    }
}

/// Clock one byte through an 8-bit hardware CRC shift register
fn shift_register(byte: u8, poly: u16, mut accum: u16) -> u16 {
    let mut data = (byte as u16) << 8;
    for _ in 0..8 {
        if (data ^ accum) & 0x8000 != 0 {
            accum = (accum << 1) ^ poly;
        } else {
            accum <<= 1;
        }
        data <<= 1;
    }
    accum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CRC_POLY;

    #[test]
    fn test_reference_entries() {
        let table = CrcTable::new(CRC_POLY);
        assert_eq!(table.entry(0), 0x0000);
        assert_eq!(table.entry(1), 0x1021);
        assert_eq!(table.entry(2), 0x2042);
        assert_eq!(table.entry(0xFF), 0x1EF0);
    }

    #[test]
    fn test_first_entry_zero_for_any_poly() {
        for poly in [0x0000, 0x1021, 0x8005, 0xA001, 0xFFFF] {
            assert_eq!(CrcTable::new(poly).entry(0), 0);
        }
    }

    #[test]
    fn test_fold_single_byte() {
        let table = CrcTable::new(CRC_POLY);
        let mut accumulator = 0u16;
        table.fold(0x01, &mut accumulator);
        assert_eq!(accumulator, 0x1021);
    }

    #[test]
    fn test_check_value() {
        // CRC-16/XMODEM check value
        let table = CrcTable::new(CRC_POLY);
        assert_eq!(table.checksum(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_empty_input() {
        let table = CrcTable::new(CRC_POLY);
        assert_eq!(table.checksum(&[]), 0);
    }

    #[test]
    fn test_fold_matches_checksum() {
        let table = CrcTable::new(CRC_POLY);
        let data = [0xA5, 0x3F, 0x05, 0x0B, 0x00, 0x80];
        let mut accumulator = 0u16;
        for &b in &data {
            table.fold(b, &mut accumulator);
        }
        assert_eq!(accumulator, table.checksum(&data));
    }
}
