//! Product information block (index 0x8C)

use serde::Serialize;

/// Size of the product information block in bytes
pub const PRODUCT_INFO_SIZE: usize = 352;

/// Width of each text field
const FIELD_LEN: usize = 32;
/// Reserved bytes before the control board fields
const LEADING_RESERVED: usize = 2;
/// Reserved bytes between the control board and product fields
const MIDDLE_RESERVED: usize = 30;

/// Identification strings reported by the drive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductInfo {
    /// Control board model
    pub control_board_name: String,
    /// Control board hardware version
    pub control_board_version: String,
    /// Control board serial number
    pub control_board_serial: String,
    /// Control board build date
    pub control_board_build_date: String,
    /// Control board build time
    pub control_board_build_time: String,
    /// Drive part number
    pub product_part_number: String,
    /// Drive version
    pub product_version: String,
    /// Drive serial number
    pub product_serial_number: String,
    /// Drive build date
    pub product_build_date: String,
    /// Drive build time
    pub product_build_time: String,
}

impl ProductInfo {
    /// Parse the raw block
    pub fn from_bytes(raw: &[u8; PRODUCT_INFO_SIZE]) -> Self {
        let board = LEADING_RESERVED;
        let product = board + 5 * FIELD_LEN + MIDDLE_RESERVED;
        let field = |start: usize, n: usize| {
            let at = start + n * FIELD_LEN;
            c_string(&raw[at..at + FIELD_LEN])
        };

        Self {
            control_board_name: field(board, 0),
            control_board_version: field(board, 1),
            control_board_serial: field(board, 2),
            control_board_build_date: field(board, 3),
            control_board_build_time: field(board, 4),
            product_part_number: field(product, 0),
            product_version: field(product, 1),
            product_serial_number: field(product, 2),
            product_build_date: field(product, 3),
            product_build_time: field(product, 4),
        }
    }
}

/// Text up to the first NUL
pub fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
