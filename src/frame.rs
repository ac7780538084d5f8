use tracing::trace;

use crate::{
    checksum::{crc_code, verify_crc, xor_code},
    error::{PrinterError, Result},
};

pub const ESC: u8 = 0x1B;
pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;

const ESC_PREFIX: [u8; 2] = [ESC, b'P'];
const ESC_SUFFIX: [u8; 2] = [ESC, b'\\'];

/// envelope of a command or reply on the wire
pub trait FrameCodec {
    /// wrap a payload into a complete frame including the checksum
    fn encode(&self, payload: &[u8]) -> Vec<u8>;

    /// unwrap a received frame and return the bare payload
    fn decode(&self, raw: &[u8]) -> Result<Vec<u8>>;

    /// length of the first complete frame in `buffer`, if one was received entirely
    fn frame_end(&self, buffer: &[u8]) -> Option<usize>;
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// `ESC P payload XOR ESC \` framing of the Posnet Thermal, Innova and Optimus printers
#[derive(Debug, Clone, Copy, Default)]
pub struct EscFrame;

impl EscFrame {
    /// frame without the control code, the status request is sent this way
    pub fn encode_unchecked(&self, payload: &[u8]) -> Vec<u8> {
        let mut buffer: Vec<u8> = Vec::with_capacity(payload.len() + 4);
        buffer.extend_from_slice(&ESC_PREFIX);
        buffer.extend_from_slice(payload);
        buffer.extend_from_slice(&ESC_SUFFIX);
        buffer
    }
}

impl FrameCodec for EscFrame {
    fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut buffer: Vec<u8> = Vec::with_capacity(payload.len() + 6);
        buffer.extend_from_slice(&ESC_PREFIX);
        buffer.extend_from_slice(payload);
        buffer.extend_from_slice(&xor_code(payload));
        buffer.extend_from_slice(&ESC_SUFFIX);
        buffer
    }

    /// strip the envelope of a reply
    ///
    /// # Notes
    ///
    /// Bytes before `ESC P` are dropped. The trailing control code is removed when it matches the
    /// payload; a code that does not match is left in place and no error is raised, replies of these
    /// printers are not checked.
    fn decode(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let start = find(raw, &ESC_PREFIX).ok_or(PrinterError::MalformedFrame("no ESC P"))?;
        let body = &raw[start + 2..];
        let end = find(body, &ESC_SUFFIX).ok_or(PrinterError::MalformedFrame("no ESC \\"))?;
        let body = &body[..end];
        if body.len() >= 2 {
            let (payload, tail) = body.split_at(body.len() - 2);
            if tail.iter().all(u8::is_ascii_hexdigit) {
                if xor_code(payload).eq_ignore_ascii_case(tail) {
                    return Ok(payload.to_vec());
                }
                trace!("control code {:02X?} not stripped", tail);
            }
        }
        Ok(body.to_vec())
    }

    fn frame_end(&self, buffer: &[u8]) -> Option<usize> {
        let start = find(buffer, &ESC_PREFIX)?;
        let end = find(&buffer[start + 2..], &ESC_SUFFIX)?;
        Some(start + 2 + end + 2)
    }
}

/// `STX command # CRC ETX` framing of the Posnet 1.01 protocol
#[derive(Debug, Clone, Copy, Default)]
pub struct StxFrame;

impl FrameCodec for StxFrame {
    fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut buffer: Vec<u8> = Vec::with_capacity(payload.len() + 7);
        buffer.push(STX);
        buffer.extend_from_slice(payload);
        buffer.push(b'#');
        buffer.extend_from_slice(&crc_code(payload));
        buffer.push(ETX);
        buffer
    }

    fn decode(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let start = raw
            .iter()
            .position(|&b| b == STX)
            .ok_or(PrinterError::MalformedFrame("no STX"))?;
        let body = &raw[start + 1..];
        let end = body
            .iter()
            .position(|&b| b == ETX)
            .ok_or(PrinterError::MalformedFrame("no ETX"))?;
        let body = &body[..end];
        let hash = body
            .iter()
            .rposition(|&b| b == b'#')
            .ok_or(PrinterError::MalformedFrame("no #"))?;
        let (payload, crc) = (&body[..hash], &body[hash + 1..]);
        if crc.len() != 4 {
            return Err(PrinterError::MalformedFrame("no CRC"));
        }
        verify_crc(payload, crc)?;
        Ok(payload.to_vec())
    }

    fn frame_end(&self, buffer: &[u8]) -> Option<usize> {
        let start = buffer.iter().position(|&b| b == STX)?;
        let end = buffer[start..].iter().position(|&b| b == ETX)?;
        Some(start + end + 1)
    }
}
