use crate::error::{PrinterError, Result};

/// maximum number of fractional digits a quantity may carry on the wire
pub const MAX_QUANTITY_PRECISION: u32 = 4;

/// round `value` half away from zero to `digits` decimal places
pub fn round_to(value: f64, digits: u32) -> f64 {
    let shift = 10f64.powi(digits as i32);
    (value * shift).round() / shift
}

/// round a currency amount to 2 decimals with a small bias against binary representation errors
pub fn round_currency(value: f64) -> f64 {
    round_to(value + 0.000_000_1, 2)
}

/// convert an amount given in currency units (e.g. 12.34) to minor units (1234)
pub fn encode_minor_units(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

pub fn decode_minor_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// render minor units as a decimal amount with exactly 2 fractional digits
///
/// # Examples
///
/// ```
/// use fiscal_printer::transcode::format_decimal;
///
/// assert_eq!(format_decimal(1), "0.01");
/// assert_eq!(format_decimal(123456), "1234.56");
/// ```
pub fn format_decimal(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// the smallest number of fractional digits (0..=4) representing `quantity` exactly
///
/// # Arguments
///
/// * `quantity` - the sold quantity, e.g. 1.5 (kg)
///
/// # Notes
///
/// Fails with a logic error when more than 4 digits would be needed, the line must not be sent then.
pub fn quantity_precision(quantity: f64) -> Result<u32> {
    (0..=MAX_QUANTITY_PRECISION)
        .find(|&digits| round_to(quantity, digits) == quantity)
        .ok_or_else(|| {
            PrinterError::Logic(format!(
                "quantity {} needs more than {} fractional digits",
                quantity, MAX_QUANTITY_PRECISION
            ))
        })
}

/// render a quantity with its minimal exact precision
pub fn format_quantity(quantity: f64) -> Result<String> {
    let digits = quantity_precision(quantity)? as usize;
    Ok(format!("{:.*}", digits, quantity))
}

/// a quantity as an integer plus the number of implied fractional digits, e.g. 1.25 -> (125, 2)
pub fn scaled_quantity(quantity: f64) -> Result<(u32, u8)> {
    let digits = quantity_precision(quantity)?;
    let scaled = (quantity * 10f64.powi(digits as i32)).round();
    if scaled < 0.0 || scaled > u32::MAX as f64 {
        return Err(PrinterError::Logic(format!(
            "quantity {} out of range",
            quantity
        )));
    }
    Ok((scaled as u32, digits as u8))
}

/// render a fractional rate (0.1 = 10%) as percent with 2 decimals
pub fn format_percent(rate: f64) -> String {
    format!("{:.2}", rate * 100.0)
}

/// a fractional rate in basis points of a percent (0.1 -> 1000)
pub fn encode_rate(rate: f64) -> i64 {
    (rate * 10_000.0).round() as i64
}

/// minor units as an unsigned 32 bit wire integer
pub fn minor_units_u32(minor: i64) -> Result<u32> {
    u32::try_from(minor)
        .map_err(|_| PrinterError::Logic(format!("amount {} out of range", format_decimal(minor))))
}

/// little-endian wire form of an unsigned 32 bit value
pub fn pack_u32_le(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// cut a string to at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// fixed width article name: trimmed, at most 28 characters, at least 5 (dot padded), space padded to 28
pub fn pad_name(name: &str) -> String {
    let mut padded = String::from(truncate_chars(name.trim(), 28));
    while padded.chars().count() < 5 {
        padded.push('.');
    }
    while padded.chars().count() < 28 {
        padded.push(' ');
    }
    padded
}

const POLISH_LETTERS: [char; 18] = [
    'Ą', 'Ć', 'Ę', 'Ł', 'Ń', 'Ó', 'Ś', 'Ź', 'Ż', 'ą', 'ć', 'ę', 'ł', 'ń', 'ó', 'ś', 'ź', 'ż',
];

const MAZOVIA: [u8; 18] = [
    143, 149, 144, 156, 165, 163, 152, 160, 161, 134, 141, 145, 146, 164, 162, 158, 166, 167,
];

const WINDOWS_1250: [u8; 18] = [
    0xA5, 0xC6, 0xCA, 0xA3, 0xD1, 0xD3, 0x8C, 0x8F, 0xAF, 0xB9, 0xE6, 0xEA, 0xB3, 0xF1, 0xF3,
    0x9C, 0x9F, 0xBF,
];

/// 8 bit code page used for text fields sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePage {
    /// Mazovia, used by the ESC framed Posnet/Innova/Optimus protocols
    Mazovia,
    /// Windows-1250, used by the Posnet 1.01 protocol and Elzab
    Windows1250,
}

impl CodePage {
    fn table(&self) -> &'static [u8; 18] {
        match self {
            CodePage::Mazovia => &MAZOVIA,
            CodePage::Windows1250 => &WINDOWS_1250,
        }
    }

    /// transliterate text into device bytes
    ///
    /// Polish letters are mapped through the code page, anything else up to U+00FF passes through
    /// unchanged and characters the device cannot show become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let table = self.table();
        text.chars()
            .map(|c| match POLISH_LETTERS.iter().position(|&p| p == c) {
                Some(index) => table[index],
                None => u8::try_from(c as u32).unwrap_or(b'?'),
            })
            .collect()
    }

    pub fn decode(&self, data: &[u8]) -> String {
        let table = self.table();
        data.iter()
            .map(|&b| {
                if b < 0x80 {
                    return b as char;
                }
                match table.iter().position(|&t| t == b) {
                    Some(index) => POLISH_LETTERS[index],
                    None => b as char,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units() {
        assert_eq!(encode_minor_units(0.01), 1);
        assert_eq!(encode_minor_units(0.29), 29);
        assert_eq!(encode_minor_units(1.15), 115);
        assert_eq!(encode_minor_units(12345.67), 1234567);
        assert_eq!(encode_minor_units(-2.5), -250);
        for minor in [0i64, 1, 7, 10, 99, 100, 101, 1999, 123456] {
            let value = decode_minor_units(minor);
            assert_eq!(encode_minor_units(value), minor);
        }
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(0), "0.00");
        assert_eq!(format_decimal(1), "0.01");
        assert_eq!(format_decimal(250), "2.50");
        assert_eq!(format_decimal(-5), "-0.05");
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(0.005), 0.01);
        assert_eq!(round_currency(3.0 * 0.1), 0.3);
        assert_eq!(round_currency(2.5 * 1.99), 4.98);
    }

    #[test]
    fn test_quantity_precision() -> Result<()> {
        assert_eq!(quantity_precision(1.0)?, 0);
        assert_eq!(quantity_precision(1.5)?, 1);
        assert_eq!(quantity_precision(0.25)?, 2);
        assert_eq!(quantity_precision(2.345)?, 3);
        assert_eq!(quantity_precision(0.1234)?, 4);
        assert!(quantity_precision(0.123456).is_err());
        Ok(())
    }

    #[test]
    fn test_quantity_precision_error_is_logic() {
        let err = quantity_precision(0.123456).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Logic);
    }

    #[test]
    fn test_format_quantity() -> Result<()> {
        assert_eq!(format_quantity(1.0)?, "1");
        assert_eq!(format_quantity(0.5)?, "0.5");
        assert_eq!(format_quantity(12.125)?, "12.125");
        assert_eq!(scaled_quantity(1.25)?, (125, 2));
        assert_eq!(scaled_quantity(3.0)?, (3, 0));
        Ok(())
    }

    #[test]
    fn test_rates() {
        assert_eq!(format_percent(0.1), "10.00");
        assert_eq!(format_percent(0.055), "5.50");
        assert_eq!(encode_rate(0.1), 1000);
        assert_eq!(encode_rate(0.0725), 725);
    }

    #[test]
    fn test_mazovia() {
        assert_eq!(CodePage::Mazovia.encode("Żółć"), vec![161, 162, 146, 141]);
        assert_eq!(CodePage::Mazovia.encode("abc 1/2\r"), b"abc 1/2\r".to_vec());
        assert_eq!(CodePage::Mazovia.encode("€"), b"?".to_vec());
    }

    #[test]
    fn test_windows_1250() {
        let encoded = CodePage::Windows1250.encode("Dziękujemy");
        assert_eq!(encoded[3], 0xEA);
        assert_eq!(CodePage::Windows1250.decode(&encoded), "Dziękujemy");
        assert_eq!(CodePage::Windows1250.decode(&[0xA3, 0xF3, 0x64, 0x9F]), "Łódź");
    }

    #[test]
    fn test_names() {
        assert_eq!(truncate_chars("Zaktualizuj", 4), "Zakt");
        assert_eq!(truncate_chars("łąka", 10), "łąka");
        assert_eq!(truncate_chars("żółw", 2), "żó");
        assert_eq!(pad_name(" ab "), format!("ab...{}", " ".repeat(23)));
        assert_eq!(pad_name(&"x".repeat(40)), "x".repeat(28));
    }

    #[test]
    fn test_minor_units_u32() {
        assert_eq!(minor_units_u32(1).ok(), Some(1));
        assert!(minor_units_u32(-1).is_err());
        assert_eq!(pack_u32_le(0x0102_0304), [0x04, 0x03, 0x02, 0x01]);
    }
}
