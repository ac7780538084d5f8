use tracing::trace;

use crate::error::{PrinterError, Result};

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";
const HEX_LOWER: &[u8; 16] = b"0123456789abcdef";

/// calculate the XOR-8 control byte of a command payload
///
/// # Arguments
///
/// * `data` - the payload between the frame markers
///
/// # Returns
///
/// * the control byte, seeded with 0xFF
///
pub fn calculate_xor(data: &[u8]) -> u8 {
    let check = data.iter().fold(0xFFu8, |check, b| check ^ b);
    trace!("XOR {:02X}", check);
    check
}

/// the XOR-8 control byte rendered as two uppercase hex digits, as it is put on the wire
pub fn xor_code(data: &[u8]) -> [u8; 2] {
    let check = calculate_xor(data);
    [
        HEX_UPPER[(check >> 4) as usize],
        HEX_UPPER[(check & 0x0F) as usize],
    ]
}

pub fn verify_xor(data: &[u8], received: &[u8]) -> Result<()> {
    let expected = xor_code(data);
    if !expected.eq_ignore_ascii_case(received) {
        return Err(PrinterError::Checksum {
            expected: String::from_utf8_lossy(&expected).into_owned(),
            received: String::from_utf8_lossy(received).into_owned(),
        });
    }
    Ok(())
}

/// calculate the CRC16 of a command or reply packet
///
/// # Arguments
///
/// * `data` - the data to calculate the checksum on
///
/// # Returns
///
/// * the checksum as a u16
///
/// # Notes
///
/// Table driven CRC_CCITT (polynomial 0x1021, initial value 0, no reflection).
/// The high and low byte tables are the ones published in the Posnet 1.01 protocol document.
pub fn calculate_crc(data: &[u8]) -> u16 {
    let mut hi: u8 = 0;
    let mut lo: u8 = 0;
    for &b in data {
        let index = (hi ^ b) as usize;
        hi = lo ^ CRC16_HTAB[index];
        lo = CRC16_LTAB[index];
    }
    let crc = u16::from_be_bytes([hi, lo]);
    trace!("CRC {:04X}", crc);
    crc
}

/// the CRC16 rendered as four lowercase hex digits, as it is put on the wire
pub fn crc_code(data: &[u8]) -> [u8; 4] {
    let crc = calculate_crc(data);
    let mut code = [0u8; 4];
    for (i, c) in code.iter_mut().enumerate() {
        let nibble = (crc >> (12 - 4 * i)) & 0x0F;
        *c = HEX_LOWER[nibble as usize];
    }
    code
}

/// compare a received CRC field with the one calculated over `data`
///
/// the printer is free to send the hex digits in either case
pub fn verify_crc(data: &[u8], received: &[u8]) -> Result<()> {
    let expected = crc_code(data);
    if !expected.eq_ignore_ascii_case(received) {
        // checksum doesn't match
        return Err(PrinterError::Checksum {
            expected: String::from_utf8_lossy(&expected).into_owned(),
            received: String::from_utf8_lossy(received).into_owned(),
        });
    }
    Ok(())
}

const CRC16_HTAB: [u8; 256] = [
    0x00, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70,
    0x81, 0x91, 0xA1, 0xB1, 0xC1, 0xD1, 0xE1, 0xF1,
    0x12, 0x02, 0x32, 0x22, 0x52, 0x42, 0x72, 0x62,
    0x93, 0x83, 0xB3, 0xA3, 0xD3, 0xC3, 0xF3, 0xE3,
    0x24, 0x34, 0x04, 0x14, 0x64, 0x74, 0x44, 0x54,
    0xA5, 0xB5, 0x85, 0x95, 0xE5, 0xF5, 0xC5, 0xD5,
    0x36, 0x26, 0x16, 0x06, 0x76, 0x66, 0x56, 0x46,
    0xB7, 0xA7, 0x97, 0x87, 0xF7, 0xE7, 0xD7, 0xC7,
    0x48, 0x58, 0x68, 0x78, 0x08, 0x18, 0x28, 0x38,
    0xC9, 0xD9, 0xE9, 0xF9, 0x89, 0x99, 0xA9, 0xB9,
    0x5A, 0x4A, 0x7A, 0x6A, 0x1A, 0x0A, 0x3A, 0x2A,
    0xDB, 0xCB, 0xFB, 0xEB, 0x9B, 0x8B, 0xBB, 0xAB,
    0x6C, 0x7C, 0x4C, 0x5C, 0x2C, 0x3C, 0x0C, 0x1C,
    0xED, 0xFD, 0xCD, 0xDD, 0xAD, 0xBD, 0x8D, 0x9D,
    0x7E, 0x6E, 0x5E, 0x4E, 0x3E, 0x2E, 0x1E, 0x0E,
    0xFF, 0xEF, 0xDF, 0xCF, 0xBF, 0xAF, 0x9F, 0x8F,
    0x91, 0x81, 0xB1, 0xA1, 0xD1, 0xC1, 0xF1, 0xE1,
    0x10, 0x00, 0x30, 0x20, 0x50, 0x40, 0x70, 0x60,
    0x83, 0x93, 0xA3, 0xB3, 0xC3, 0xD3, 0xE3, 0xF3,
    0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72,
    0xB5, 0xA5, 0x95, 0x85, 0xF5, 0xE5, 0xD5, 0xC5,
    0x34, 0x24, 0x14, 0x04, 0x74, 0x64, 0x54, 0x44,
    0xA7, 0xB7, 0x87, 0x97, 0xE7, 0xF7, 0xC7, 0xD7,
    0x26, 0x36, 0x06, 0x16, 0x66, 0x76, 0x46, 0x56,
    0xD9, 0xC9, 0xF9, 0xE9, 0x99, 0x89, 0xB9, 0xA9,
    0x58, 0x48, 0x78, 0x68, 0x18, 0x08, 0x38, 0x28,
    0xCB, 0xDB, 0xEB, 0xFB, 0x8B, 0x9B, 0xAB, 0xBB,
    0x4A, 0x5A, 0x6A, 0x7A, 0x0A, 0x1A, 0x2A, 0x3A,
    0xFD, 0xED, 0xDD, 0xCD, 0xBD, 0xAD, 0x9D, 0x8D,
    0x7C, 0x6C, 0x5C, 0x4C, 0x3C, 0x2C, 0x1C, 0x0C,
    0xEF, 0xFF, 0xCF, 0xDF, 0xAF, 0xBF, 0x8F, 0x9F,
    0x6E, 0x7E, 0x4E, 0x5E, 0x2E, 0x3E, 0x0E, 0x1E,
];

const CRC16_LTAB: [u8; 256] = [
    0x00, 0x21, 0x42, 0x63, 0x84, 0xA5, 0xC6, 0xE7,
    0x08, 0x29, 0x4A, 0x6B, 0x8C, 0xAD, 0xCE, 0xEF,
    0x31, 0x10, 0x73, 0x52, 0xB5, 0x94, 0xF7, 0xD6,
    0x39, 0x18, 0x7B, 0x5A, 0xBD, 0x9C, 0xFF, 0xDE,
    0x62, 0x43, 0x20, 0x01, 0xE6, 0xC7, 0xA4, 0x85,
    0x6A, 0x4B, 0x28, 0x09, 0xEE, 0xCF, 0xAC, 0x8D,
    0x53, 0x72, 0x11, 0x30, 0xD7, 0xF6, 0x95, 0xB4,
    0x5B, 0x7A, 0x19, 0x38, 0xDF, 0xFE, 0x9D, 0xBC,
    0xC4, 0xE5, 0x86, 0xA7, 0x40, 0x61, 0x02, 0x23,
    0xCC, 0xED, 0x8E, 0xAF, 0x48, 0x69, 0x0A, 0x2B,
    0xF5, 0xD4, 0xB7, 0x96, 0x71, 0x50, 0x33, 0x12,
    0xFD, 0xDC, 0xBF, 0x9E, 0x79, 0x58, 0x3B, 0x1A,
    0xA6, 0x87, 0xE4, 0xC5, 0x22, 0x03, 0x60, 0x41,
    0xAE, 0x8F, 0xEC, 0xCD, 0x2A, 0x0B, 0x68, 0x49,
    0x97, 0xB6, 0xD5, 0xF4, 0x13, 0x32, 0x51, 0x70,
    0x9F, 0xBE, 0xDD, 0xFC, 0x1B, 0x3A, 0x59, 0x78,
    0x88, 0xA9, 0xCA, 0xEB, 0x0C, 0x2D, 0x4E, 0x6F,
    0x80, 0xA1, 0xC2, 0xE3, 0x04, 0x25, 0x46, 0x67,
    0xB9, 0x98, 0xFB, 0xDA, 0x3D, 0x1C, 0x7F, 0x5E,
    0xB1, 0x90, 0xF3, 0xD2, 0x35, 0x14, 0x77, 0x56,
    0xEA, 0xCB, 0xA8, 0x89, 0x6E, 0x4F, 0x2C, 0x0D,
    0xE2, 0xC3, 0xA0, 0x81, 0x66, 0x47, 0x24, 0x05,
    0xDB, 0xFA, 0x99, 0xB8, 0x5F, 0x7E, 0x1D, 0x3C,
    0xD3, 0xF2, 0x91, 0xB0, 0x57, 0x76, 0x15, 0x34,
    0x4C, 0x6D, 0x0E, 0x2F, 0xC8, 0xE9, 0x8A, 0xAB,
    0x44, 0x65, 0x06, 0x27, 0xC0, 0xE1, 0x82, 0xA3,
    0x7D, 0x5C, 0x3F, 0x1E, 0xF9, 0xD8, 0xBB, 0x9A,
    0x75, 0x54, 0x37, 0x16, 0xF1, 0xD0, 0xB3, 0x92,
    0x2E, 0x0F, 0x6C, 0x4D, 0xAA, 0x8B, 0xE8, 0xC9,
    0x26, 0x07, 0x64, 0x45, 0xA2, 0x83, 0xE0, 0xC1,
    0x1F, 0x3E, 0x5D, 0x7C, 0x9B, 0xBA, 0xD9, 0xF8,
    0x17, 0x36, 0x55, 0x74, 0x93, 0xB2, 0xD1, 0xF0,
];
