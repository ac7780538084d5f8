use std::collections::HashMap;

use tracing::{error, trace, warn};

use crate::{
    error::{PrinterError, Result},
    model::{RateSlotMap, TaxCategory},
    registry::{BINARY_ERRORS, TAB_ERRORS, lookup},
    transcode::CodePage,
};

/// the only byte accepted as a positive acknowledgement by the Elzab printers
pub const ACK: u8 = 0x06;

/// number of rate slots (A to G) of every supported model
pub const RATE_SLOTS: usize = 7;

/// marker of an inactive slot in the binary rate table
const BINARY_RATE_INACTIVE: u16 = 0x8000;
/// marker of the tax exempt slot in the binary rate table
const BINARY_RATE_EXEMPT: u16 = 0x4000;

/// device rate numbers of the binary slots A to G
const BINARY_SLOT_NUMBERS: [u8; RATE_SLOTS] = [1, 2, 3, 4, 6, 7, 5];

/// extract the numeric code of an error status frame (`<code>#Z`)
///
/// # Arguments
///
/// * `payload` - the frame content without envelope
/// * `strip_control` - drop a leading control character of a two character code
///
/// # Returns
///
/// * the code, 0 means the last command was accepted
///
pub fn decode_error_status(payload: &[u8], strip_control: bool) -> Result<i32> {
    let text = String::from_utf8_lossy(payload);
    let unexpected = || PrinterError::UnexpectedResponse {
        command: String::from("LBERSTS"),
        response: text.to_string(),
    };
    let end = text.find("#Z").ok_or_else(unexpected)?;
    let mut code = &text[..end];
    if strip_control && code.len() == 2 && code.as_bytes()[0] < 0x20 {
        trace!("dropping control character {:02X}", code.as_bytes()[0]);
        code = &code[1..];
    }
    code.trim().parse::<i32>().map_err(|_| unexpected())
}

/// tax category printed as `xx.yy` in the status reply, `None` for inactive or unknown slots
fn esc_rate(text: &str) -> Option<TaxCategory> {
    let tax = match text {
        "22.00" => TaxCategory::Vat22,
        "07.00" => TaxCategory::Vat07,
        "03.00" => TaxCategory::Vat03,
        "23.00" => TaxCategory::Vat23,
        "08.00" => TaxCategory::Vat08,
        "05.00" => TaxCategory::Vat05,
        "00.00" => TaxCategory::Vat00,
        "100.00" => TaxCategory::Exempt,
        "101.00" => return None,
        unknown => {
            warn!("unknown tax rate \"{}\"", unknown);
            return None;
        }
    };
    Some(tax)
}

/// build the rate slot map from the reply to the status request
///
/// # Notes
///
/// The seven slots follow the first `/`. When a category is programmed twice, the highest slot wins.
pub fn decode_esc_rates(payload: &[u8]) -> Result<RateSlotMap> {
    let text = String::from_utf8_lossy(payload);
    let fields: Vec<&str> = match text.split_once('/') {
        Some((_, rest)) => rest.split('/').collect(),
        None => Vec::new(),
    };
    // every rate field is terminated by a slash
    if fields.len() <= RATE_SLOTS {
        return Err(PrinterError::UnexpectedResponse {
            command: String::from("LBFSTRQ"),
            response: text.to_string(),
        });
    }
    let mut slots = RateSlotMap::new();
    for slot in (0..RATE_SLOTS).rev() {
        if let Some(tax) = esc_rate(fields[slot]) {
            slots.assign(tax, slot as u8);
        }
    }
    Ok(slots)
}

/// parse a boolean field of a Posnet 1.01 reply
pub fn decode_bool(text: &str) -> Option<bool> {
    match text.chars().next()?.to_ascii_uppercase() {
        '1' | 'T' | 'Y' => Some(true),
        '0' | 'N' => Some(false),
        _ => None,
    }
}

/// a decoded Posnet 1.01 reply: the echoed command and its keyed fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabResponse {
    command: String,
    fields: HashMap<String, String>,
}

impl TabResponse {
    /// decode a reply payload
    ///
    /// # Notes
    ///
    /// A reply containing `?` reports a rejected command: the text before it names the command and
    /// the text after it is the error code, resolved through the error table.
    pub fn parse(payload: &[u8], code_page: CodePage) -> Result<Self> {
        let text = code_page.decode(payload);
        if let Some((command, code)) = text.split_once('?') {
            let command = command.trim();
            let code = code.trim().parse::<i32>().unwrap_or(0);
            let entry = lookup(TAB_ERRORS, code);
            error!("error {} in {}: {}", code, command, entry.text);
            return Err(entry.to_error(command, code));
        }

        let mut tokens = text.split('\t');
        let command = String::from(tokens.next().unwrap_or("").trim());
        let fields = tokens
            .filter(|token| token.len() >= 2 && token.is_char_boundary(2))
            .map(|token| {
                let (key, value) = token.split_at(2);
                (String::from(key), String::from(value.trim()))
            })
            .collect();
        Ok(TabResponse { command, fields })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// a field that must be present
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| PrinterError::UnexpectedResponse {
                command: self.command.clone(),
                response: format!("field \"{}\" missing", key),
            })
    }

    pub fn require_bool(&self, key: &str) -> Result<bool> {
        let value = self.require(key)?;
        decode_bool(value).ok_or_else(|| PrinterError::UnexpectedResponse {
            command: self.command.clone(),
            response: format!("field \"{}\" is not a boolean: {}", key, value),
        })
    }

    /// fail unless the reply echoes `command`
    pub fn expect_command(&self, command: &str) -> Result<()> {
        if self.command != command {
            return Err(PrinterError::UnexpectedResponse {
                command: String::from(command),
                response: self.command.clone(),
            });
        }
        Ok(())
    }

    /// iterate over all fields in no particular order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn tab_rate(text: &str) -> Option<TaxCategory> {
    let tax = match text {
        "22,00" => TaxCategory::Vat22,
        "7,00" => TaxCategory::Vat07,
        "3,00" => TaxCategory::Vat03,
        "23,00" => TaxCategory::Vat23,
        "8,00" => TaxCategory::Vat08,
        "5,00" => TaxCategory::Vat05,
        "0,00" => TaxCategory::Vat00,
        "100,00" => TaxCategory::Exempt,
        _ => return None,
    };
    Some(tax)
}

/// build the rate slot map from a `vatget` reply, the second letter of each key is the slot (`va` = 0)
pub fn decode_tab_rates(response: &TabResponse) -> RateSlotMap {
    let mut fields: Vec<(&str, &str)> = response.fields().collect();
    fields.sort();
    let mut slots = RateSlotMap::new();
    for (key, value) in fields {
        let Some(letter) = key.chars().nth(1).filter(char::is_ascii_lowercase) else {
            continue;
        };
        match tab_rate(value) {
            Some(tax) => slots.assign(tax, letter as u8 - b'a'),
            None => trace!("rate {} = \"{}\" not used", key, value),
        }
    }
    slots
}

/// check the reply to an Elzab command
pub fn decode_ack(reply: u8, command: &[u8]) -> Result<()> {
    if reply == ACK {
        return Ok(());
    }
    let name = format!("{:02X?}", command);
    let entry = lookup(BINARY_ERRORS, reply as i32);
    error!("NAK received for {}: {:02X}", name, reply);
    Err(entry.to_error(&name, reply as i32))
}

/// build the rate slot map from the 14 byte reply to the Elzab rate query
///
/// # Notes
///
/// Every slot is a big-endian rate in hundredths of a percent. The exempt category always uses its
/// dedicated slot.
pub fn decode_binary_rates(reply: &[u8; 14]) -> RateSlotMap {
    let mut slots = RateSlotMap::new();
    slots.assign(TaxCategory::Exempt, BINARY_SLOT_NUMBERS[6]);
    for (index, pair) in reply.chunks_exact(2).enumerate() {
        let rate = u16::from_be_bytes([pair[0], pair[1]]);
        let slot = BINARY_SLOT_NUMBERS[index];
        match rate {
            BINARY_RATE_INACTIVE | BINARY_RATE_EXEMPT => {}
            _ => match TaxCategory::ALL
                .iter()
                .find(|tax| **tax != TaxCategory::Exempt && tax.basis_points() == rate)
            {
                Some(tax) => slots.assign(*tax, slot),
                None => warn!("unknown tax rate {} in slot {}", rate, slot),
            },
        }
    }
    slots
}

/// rate table bytes for a list of basis points, the form the Elzab printers send it in
pub fn encode_binary_rates(rates: &[u16; RATE_SLOTS]) -> [u8; 14] {
    let mut reply = [0u8; 14];
    for (index, rate) in rates.iter().enumerate() {
        reply[index * 2..index * 2 + 2].copy_from_slice(&rate.to_be_bytes());
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_error_status() -> Result<()> {
        assert_eq!(decode_error_status(b"0#Z", false)?, 0);
        assert_eq!(decode_error_status(b"19#Z", false)?, 19);
        assert_eq!(decode_error_status(b"\x010#Z", true)?, 0);
        assert!(decode_error_status(b"\x010#Z", false).is_err());
        assert!(decode_error_status(b"1#X", true).is_err());
        Ok(())
    }

    #[test]
    fn test_esc_rates() -> Result<()> {
        let slots = decode_esc_rates(
            b"1;0;0;0;0;0;0;0;0;0;0;0;0;1;26;10;18/23.00/08.00/05.00/00.00/101.00/100.00/23.00/0.00/",
        )?;
        assert_eq!(slots.get(TaxCategory::Vat23), Some(6));
        assert_eq!(slots.get(TaxCategory::Vat08), Some(1));
        assert_eq!(slots.get(TaxCategory::Vat00), Some(3));
        assert_eq!(slots.get(TaxCategory::Exempt), Some(5));
        assert_eq!(slots.get(TaxCategory::Vat22), None);
        assert_eq!(slots.len(), 5);
        Ok(())
    }

    #[test]
    fn test_esc_rates_too_short() {
        let err = decode_esc_rates(b"1/23.00/08.00/").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Protocol);
    }

    #[test]
    fn test_tab_response() -> Result<()> {
        let response = TabResponse::parse(b"scomm\tnuABC1234\thr1\tts0 \t", CodePage::Windows1250)?;
        assert_eq!(response.command(), "scomm");
        assert_eq!(response.get("nu"), Some("ABC1234"));
        assert_eq!(response.require("ts")?, "0");
        assert!(response.require_bool("hr")?);
        assert!(response.require("xx").is_err());
        assert!(response.expect_command("scomm").is_ok());
        assert!(response.expect_command("sdev").is_err());
        Ok(())
    }

    #[test]
    fn test_tab_fault() {
        let err = TabResponse::parse(b"trline?2006\t", CodePage::Windows1250).unwrap_err();
        assert_eq!(
            err.to_string(),
            "device reported error 2006 in trline: price field error (price <= 0)"
        );
        let err = TabResponse::parse(b"trend?abc", CodePage::Windows1250).unwrap_err();
        assert!(err.to_string().ends_with("unrecognized fault"));
    }

    #[test]
    fn test_decode_bool() {
        assert_eq!(decode_bool("1"), Some(true));
        assert_eq!(decode_bool("y"), Some(true));
        assert_eq!(decode_bool("T"), Some(true));
        assert_eq!(decode_bool("n"), Some(false));
        assert_eq!(decode_bool("0"), Some(false));
        assert_eq!(decode_bool("x"), None);
        assert_eq!(decode_bool(""), None);
    }

    #[test]
    fn test_tab_rates() -> Result<()> {
        let response = TabResponse::parse(
            b"vatget\tva23,00\tvb8,00\tvc5,00\tvd0,00\tve100,00\tvf100,00\tvg101,00\t",
            CodePage::Windows1250,
        )?;
        let slots = decode_tab_rates(&response);
        assert_eq!(slots.get(TaxCategory::Vat23), Some(0));
        assert_eq!(slots.get(TaxCategory::Vat05), Some(2));
        assert_eq!(slots.get(TaxCategory::Exempt), Some(4));
        assert_eq!(slots.len(), 5);
        Ok(())
    }

    #[test]
    fn test_ack() {
        assert!(decode_ack(ACK, &[0x1B, 0x21]).is_ok());
        let err = decode_ack(0x15, &[0x1B, 0x21]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Protocol);
        assert!(err.to_string().contains("NAK"));
    }

    #[test]
    fn test_binary_rates() {
        let reply = encode_binary_rates(&[2300, 800, 0, 500, 0x8000, 0x8000, 0x4000]);
        assert_eq!(&reply[..2], &[0x08, 0xFC]);
        let slots = decode_binary_rates(&reply);
        assert_eq!(slots.get(TaxCategory::Vat23), Some(1));
        assert_eq!(slots.get(TaxCategory::Vat08), Some(2));
        assert_eq!(slots.get(TaxCategory::Vat00), Some(3));
        assert_eq!(slots.get(TaxCategory::Vat05), Some(4));
        assert_eq!(slots.get(TaxCategory::Exempt), Some(5));
        assert_eq!(slots.get(TaxCategory::Vat22), None);
    }
}
