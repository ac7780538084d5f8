use std::fmt::Display;

use chrono::{Months, NaiveDate};

use crate::{
    dialect::DialectDescriptor,
    error::{PrinterError, Result},
    model::{Discount, Invoice, Payment, SaleLine, Transaction},
    transcode::{CodePage, encode_minor_units, encode_rate, format_quantity, truncate_chars},
};

const TAB: char = '\t';

/// a Posnet 1.01 command: the command name followed by two letter keyed fields
///
/// # Examples
///
/// ```
/// use fiscal_printer::{encoder::tab::TabCommand, transcode::CodePage};
///
/// let command = TabCommand::new("trend").field("to", 1).field("fp", 1);
/// assert_eq!(command.encode(CodePage::Windows1250), b"trend\tto1\tfp1\t");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabCommand {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
}

impl TabCommand {
    pub fn new(name: &'static str) -> Self {
        TabCommand {
            name,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, key: &'static str, value: impl Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn encode(&self, code_page: CodePage) -> Vec<u8> {
        let mut text = String::from(self.name);
        text.push(TAB);
        for (key, value) in &self.fields {
            text.push_str(key);
            text.push_str(value);
            text.push(TAB);
        }
        code_page.encode(&text)
    }
}

/// abort whatever the printer is doing
pub fn cancel() -> TabCommand {
    TabCommand::new("prncancel")
}

/// model name and firmware release
pub fn identify() -> TabCommand {
    TabCommand::new("sid")
}

pub fn device_status() -> TabCommand {
    TabCommand::new("sdev")
}

/// state of the printing mechanism
pub fn printer_status() -> TabCommand {
    TabCommand::new("sprn")
}

/// serial number, header and transaction state
pub fn common_status() -> TabCommand {
    TabCommand::new("scomm")
}

pub fn rates() -> TabCommand {
    TabCommand::new("vatget")
}

/// transaction, fiscal, totals and counter status queries issued after the rate table
pub fn counters() -> [TabCommand; 4] {
    [
        TabCommand::new("strns"),
        TabCommand::new("sfsk"),
        TabCommand::new("stot"),
        TabCommand::new("scnt"),
    ]
}

/// cashier, register, reference and footer lines of the next document
pub fn footer_config(transaction: &Transaction, footer: [&str; 3]) -> TabCommand {
    let reference = transaction.reference.as_str();
    TabCommand::new("ftrcfg")
        .field("cc", truncate_chars(&transaction.cashier, 32))
        .field("cn", truncate_chars(&transaction.cashbox, 8))
        .field("sn", truncate_chars(reference, 30))
        .field("bc", truncate_chars(reference, 16))
        .field("ln", footer.join("\n"))
}

/// start a receipt
pub fn open() -> TabCommand {
    TabCommand::new("trinit")
}

/// start an invoice
pub fn open_invoice(invoice: &Invoice) -> TabCommand {
    TabCommand::new("trfvinit")
        .field("nb", &invoice.transaction.reference)
        .field("ni", &invoice.nip)
        .field("na", &invoice.header)
        .field("pd", &invoice.payment_due)
        .field("pt", &invoice.payment_type)
}

/// a sale line, `slot` is the rate slot (0 = a) resolved for the line's tax category
pub fn line(line: &SaleLine, slot: u8) -> Result<TabCommand> {
    let command = TabCommand::new("trline")
        .field("na", &line.name)
        .field("vt", slot)
        .field("pr", line.unit_price_minor())
        .field("il", format_quantity(line.quantity)?);
    let command = match line.discount {
        Discount::None => command,
        Discount::AmountSurcharge(v) => command.field("rd", 0).field("rw", encode_minor_units(v)),
        Discount::AmountOff(v) => command.field("rd", 1).field("rw", encode_minor_units(v)),
        Discount::RateSurcharge(v) => command.field("rd", 0).field("rp", encode_rate(v)),
        Discount::RateOff(v) => command.field("rd", 1).field("rp", encode_rate(v)),
    };
    Ok(command)
}

pub fn payment(descriptor: &DialectDescriptor, payment: &Payment) -> Result<TabCommand> {
    let command = TabCommand::new("trpayment")
        .field("ty", descriptor.payment_code(payment.kind)?)
        .field("wa", payment.amount_minor());
    if payment.name().is_empty() {
        return Ok(command);
    }
    Ok(command.field("na", payment.name()))
}

/// close the document, `paid` adds the total paid field required after payments
pub fn close(total_minor: i64, paid: bool) -> TabCommand {
    let command = TabCommand::new("trend").field("to", total_minor);
    if paid {
        return command.field("fp", total_minor);
    }
    command
}

pub fn drawer() -> TabCommand {
    TabCommand::new("opendrwr")
}

pub fn daily_report(date: NaiveDate) -> TabCommand {
    TabCommand::new("dailyrep").field("da", date.format("%Y-%m-%d"))
}

/// report of the month before the one `date` falls in
pub fn monthly_report(date: NaiveDate) -> Result<TabCommand> {
    let previous = date
        .checked_sub_months(Months::new(1))
        .ok_or_else(|| PrinterError::Logic(format!("no month before {}", date)))?;
    Ok(TabCommand::new("monthlyrep").field("da", previous.format("%Y-%m-%d")))
}
