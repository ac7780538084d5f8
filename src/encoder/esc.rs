use chrono::{Datelike, NaiveDate};

use crate::{
    dialect::{CloseGrammar, DialectDescriptor, LineGrammar},
    error::Result,
    model::{Discount, Payment, PaymentKind, SaleLine, Transaction},
    transcode::{encode_minor_units, format_percent, format_quantity, truncate_chars},
};

/// error reporting mode, the printer answers every command with an error status frame
const ERROR_MODE: u8 = 3;

/// the status request returns the rate table
const STATUS_REQUEST: u8 = 23;

/// longest reference printed as a barcode
const BARCODE_LENGTH: usize = 16;

/// switch the printer into error reporting mode (`LBSERM`)
pub fn error_mode() -> Vec<u8> {
    format!("{}#e", ERROR_MODE).into_bytes()
}

/// cancel a transaction left open (`LBTREXITCAN`)
pub fn cancel_transaction() -> Vec<u8> {
    b"0$e".to_vec()
}

/// request the fiscal status including the tax rates (`LBFSTRQ`), sent without control code
pub fn status_request() -> Vec<u8> {
    format!("{}#s", STATUS_REQUEST).into_bytes()
}

/// start a receipt (`LBTRSHDR`)
pub fn open_transaction() -> Vec<u8> {
    b"0$h".to_vec()
}

fn discount_field(descriptor: &DialectDescriptor, discount: Discount) -> String {
    match discount {
        Discount::None => descriptor.money.render(0),
        Discount::RateOff(rate) | Discount::RateSurcharge(rate) => format_percent(rate),
        Discount::AmountOff(amount) | Discount::AmountSurcharge(amount) => {
            descriptor.money.render(encode_minor_units(amount))
        }
    }
}

/// a sale line (`LBTRSLN`)
///
/// # Arguments
///
/// * `descriptor` - selects the line grammar, code page and money format
/// * `number` - 1 based position of the line on the receipt
/// * `line` - the sold article
/// * `slot` - the rate slot (0 = A) resolved for the line's tax category
///
pub fn line(
    descriptor: &DialectDescriptor,
    number: usize,
    line: &SaleLine,
    slot: u8,
) -> Result<Vec<u8>> {
    let quantity = format_quantity(line.quantity)?;
    let slot = char::from(b'A' + slot);
    let money = descriptor.money;
    let text = match descriptor.line_grammar {
        LineGrammar::Discount => format!(
            "{};{}$l{}\r{}\r{}/{}/{}/{}/",
            number,
            line.discount.ordinal(),
            line.name,
            quantity,
            slot,
            money.render(line.unit_price_minor()),
            money.render(line.gross_minor()),
            discount_field(descriptor, line.discount),
        ),
        LineGrammar::Plain => format!(
            "{}$l{}\r{}\r{}/{}/{}/",
            number,
            line.name,
            quantity,
            slot,
            money.render(line.unit_price_minor()),
            money.render(line.total_minor()),
        ),
    };
    Ok(descriptor.code_page.encode(&text))
}

/// close the receipt, the grammar depends on the model
///
/// # Arguments
///
/// * `transaction` - supplies the header fields and the total
/// * `settlement` - the payments to print, zero amounts are left out
/// * `footer` - three free text lines printed below the fiscal logo
///
/// # Notes
///
/// A payment kind the model has no code for fails with a logic error.
pub fn close(
    descriptor: &DialectDescriptor,
    transaction: &Transaction,
    settlement: &[Payment],
    footer: [&str; 3],
) -> Result<Vec<u8>> {
    let text = match descriptor.close_grammar {
        CloseGrammar::PaymentForms => close_with_forms(descriptor, transaction, settlement, footer)?,
        CloseGrammar::FixedPayments => close_fixed(descriptor, transaction, settlement, footer)?,
    };
    Ok(descriptor.code_page.encode(&text))
}

/// `$y` close of the Thermal and Optimus printers (`LBTRXEND1`)
fn close_with_forms(
    descriptor: &DialectDescriptor,
    transaction: &Transaction,
    settlement: &[Payment],
    footer: [&str; 3],
) -> Result<String> {
    let money = descriptor.money;
    let total = money.render(transaction.total_minor());
    let mut cash: i64 = 0;
    let mut forms: Vec<(u8, &Payment)> = Vec::new();
    for payment in settlement {
        let code = descriptor.payment_code(payment.kind)?;
        if payment.amount_minor() == 0 {
            continue;
        }
        if payment.kind == PaymentKind::Cash {
            cash = payment.amount_minor();
        } else {
            forms.push((code, payment));
        }
    }
    forms.sort_by_key(|(code, _)| *code);

    let codes: String = forms.iter().map(|(code, _)| format!("{};", code)).collect();
    let names: String = forms.iter().map(|(_, p)| format!("{}\r", p.name())).collect();
    let amounts: String = forms
        .iter()
        .map(|(_, p)| format!("{}/", money.render(p.amount_minor())))
        .collect();
    let reference = if descriptor.barcode_reference {
        format!("#{}#", truncate_chars(&transaction.reference, BARCODE_LENGTH))
    } else {
        transaction.reference.clone()
    };

    Ok(format!(
        "3;0;1;0;0;0;0;1;{};0;{};{}$y{}\r{}\r{}\r{}\r{}\r{}\r{}{}/{}/0/{}/{}0/",
        forms.len(),
        if cash != 0 { 1 } else { 0 },
        codes,
        transaction.cashbox,
        transaction.cashier,
        reference,
        footer[0],
        footer[1],
        footer[2],
        names,
        total,
        total,
        money.render(cash),
        amounts,
    ))
}

/// `$x` close of the Innova printers with fixed cash, card, cheque and voucher fields (`LBTRXEND`)
fn close_fixed(
    descriptor: &DialectDescriptor,
    transaction: &Transaction,
    settlement: &[Payment],
    footer: [&str; 3],
) -> Result<String> {
    let money = descriptor.money;
    let mut amounts = [0i64; 4];
    let mut names = [""; 4];
    for payment in settlement {
        let field = descriptor.payment_code(payment.kind)? as usize;
        amounts[field] += payment.amount_minor();
        names[field] = payment.name();
    }
    let flags: Vec<&str> = amounts
        .iter()
        .map(|&amount| if amount != 0 { "1" } else { "0" })
        .collect();

    Ok(format!(
        "3;0;0;0;{};0;0;0$x003\r{}\r{}\r{}\r\r\r{}\r{}\r{}\r{}/0/{}/{}/{}/{}/0/0/0/",
        flags.join(";"),
        footer[0],
        footer[1],
        footer[2],
        names[1],
        names[2],
        names[3],
        money.render(transaction.total_minor()),
        money.render(amounts[0]),
        money.render(amounts[1]),
        money.render(amounts[2]),
        money.render(amounts[3]),
    ))
}

/// open the cash drawer (`LBDSP`)
pub fn drawer() -> Vec<u8> {
    b"1$d".to_vec()
}

/// daily report for `date` (`LBFSKREP`), year given as two digits, no zero padding
pub fn daily_report(date: NaiveDate) -> Vec<u8> {
    format!(
        "1;{};{};{}#r",
        date.year() - 2000,
        date.month(),
        date.day()
    )
    .into_bytes()
}
