use crate::{
    error::Result,
    frame::ESC,
    model::{Discount, SaleLine},
    transcode::{CodePage, minor_units_u32, pack_u32_le, pad_name, scaled_quantity},
};

/// unit of measure printed next to every quantity
const UNIT: &[u8; 4] = b"szt.";

/// extra line kinds printed below the items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraLine {
    /// system reference number
    Reference = 0x3C,
    Cashier = 0x35,
}

/// queries answered with ACK and a single status byte, in the order the status bytes are numbered
pub fn status_probes() -> [[u8; 2]; 5] {
    [
        [ESC, 0x5B],
        [ESC, 0x54],
        [ESC, 0x55],
        [ESC, 0x56],
        [ESC, 0x5F],
    ]
}

/// continue a document stopped for lack of paper
pub fn resume() -> Vec<u8> {
    vec![ESC, 0x2A]
}

/// read the programmed tax rates, answered with ACK and 14 bytes
pub fn rates_query() -> Vec<u8> {
    vec![ESC, 0xD1]
}

pub fn open() -> Vec<u8> {
    vec![ESC, 0x21]
}

/// a sale line
///
/// # Arguments
///
/// * `line` - the sold article, the name is padded to 28 characters
/// * `slot` - the device rate number resolved for the line's tax category
/// * `code_page` - encoding of the article name
///
/// # Notes
///
/// The quantity is sent as an integer plus the number of implied decimals.
pub fn line(line: &SaleLine, slot: u8, code_page: CodePage) -> Result<Vec<u8>> {
    let (quantity, precision) = scaled_quantity(line.quantity)?;
    let price = minor_units_u32(line.unit_price_minor())?;
    let gross = minor_units_u32(line.gross_minor())?;

    let mut buffer: Vec<u8> = Vec::with_capacity(50);
    buffer.extend_from_slice(&[ESC, 0x06, 0x20]);
    buffer.extend_from_slice(&code_page.encode(&pad_name(&line.name)));
    buffer.push(0x00);
    buffer.extend_from_slice(&pack_u32_le(quantity));
    buffer.push(precision);
    buffer.extend_from_slice(UNIT);
    buffer.extend_from_slice(&pack_u32_le(price));
    buffer.push(ESC);
    buffer.push(slot);
    buffer.extend_from_slice(&pack_u32_le(gross));
    Ok(buffer)
}

/// discount or surcharge following a sale line, `None` when the line has none
pub fn discount(line: &SaleLine) -> Result<Option<Vec<u8>>> {
    let sign = match line.discount {
        Discount::None => return Ok(None),
        Discount::AmountOff(_) | Discount::RateOff(_) => 0x2D,
        Discount::AmountSurcharge(_) | Discount::RateSurcharge(_) => 0x20,
    };
    let amount = minor_units_u32(line.discount_minor())?;
    let mut buffer = vec![ESC, 0x18, sign];
    buffer.extend_from_slice(&pack_u32_le(amount));
    Ok(Some(buffer))
}

/// end of the sale lines with the receipt total
pub fn end_of_items(total_minor: i64) -> Result<Vec<u8>> {
    let mut buffer = vec![ESC, 0x07];
    buffer.extend_from_slice(&pack_u32_le(minor_units_u32(total_minor)?));
    Ok(buffer)
}

pub fn extra_line(kind: ExtraLine, text: &str, code_page: CodePage) -> Vec<u8> {
    let mut buffer = vec![ESC, 0x09, kind as u8];
    buffer.extend_from_slice(&code_page.encode(text));
    buffer.push(0x0A);
    buffer
}

pub fn close() -> Vec<u8> {
    vec![ESC, 0x24]
}

pub fn drawer() -> Vec<u8> {
    vec![ESC, 0x57]
}

pub fn daily_report() -> Vec<u8> {
    vec![ESC, 0x25]
}
