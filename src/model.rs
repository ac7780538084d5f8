use std::{collections::HashMap, fmt::Display};

use crate::{
    error::{PrinterError, Result},
    transcode::{encode_minor_units, round_currency, round_to, truncate_chars},
};

/// maximum length of a payment description
const PAYMENT_NAME_LENGTH: usize = 16;

/// tax category of a sold article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxCategory {
    Vat22,
    Vat07,
    Vat03,
    Vat00,
    /// exempt from tax ("zw")
    Exempt,
    Vat23,
    Vat08,
    Vat05,
}

impl TaxCategory {
    pub const ALL: [TaxCategory; 8] = [
        TaxCategory::Vat22,
        TaxCategory::Vat07,
        TaxCategory::Vat03,
        TaxCategory::Vat00,
        TaxCategory::Exempt,
        TaxCategory::Vat23,
        TaxCategory::Vat08,
        TaxCategory::Vat05,
    ];

    /// the tax rate in hundredths of a percent (23% = 2300)
    pub fn basis_points(&self) -> u16 {
        match self {
            TaxCategory::Vat22 => 2200,
            TaxCategory::Vat07 => 700,
            TaxCategory::Vat03 => 300,
            TaxCategory::Vat00 | TaxCategory::Exempt => 0,
            TaxCategory::Vat23 => 2300,
            TaxCategory::Vat08 => 800,
            TaxCategory::Vat05 => 500,
        }
    }
}

impl Display for TaxCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxCategory::Exempt => write!(f, "ZW"),
            _ => write!(f, "{}%", self.basis_points() / 100),
        }
    }
}

/// discount or surcharge applied to a single line
///
/// rates are fractions, 0.1 is 10%
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Discount {
    #[default]
    None,
    AmountOff(f64),
    RateOff(f64),
    AmountSurcharge(f64),
    RateSurcharge(f64),
}

impl Discount {
    /// position of the discount kind in the device tables (none = 0 .. rate surcharge = 4)
    pub fn ordinal(&self) -> u8 {
        match self {
            Discount::None => 0,
            Discount::AmountOff(_) => 1,
            Discount::RateOff(_) => 2,
            Discount::AmountSurcharge(_) => 3,
            Discount::RateSurcharge(_) => 4,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Discount::None => 0.0,
            Discount::AmountOff(v)
            | Discount::RateOff(v)
            | Discount::AmountSurcharge(v)
            | Discount::RateSurcharge(v) => *v,
        }
    }

    pub fn is_rate(&self) -> bool {
        matches!(self, Discount::RateOff(_) | Discount::RateSurcharge(_))
    }

    /// true for the kinds lowering the price
    pub fn is_reduction(&self) -> bool {
        matches!(self, Discount::AmountOff(_) | Discount::RateOff(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaleLine {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub tax: TaxCategory,
    pub discount: Discount,
}

impl SaleLine {
    pub fn new(name: &str, quantity: f64, unit_price: f64, tax: TaxCategory) -> Self {
        SaleLine {
            name: String::from(name.trim()),
            quantity,
            unit_price: round_currency(unit_price),
            tax,
            discount: Discount::None,
        }
    }

    pub fn with_discount(mut self, discount: Discount) -> Self {
        self.discount = match discount {
            Discount::AmountOff(v) => Discount::AmountOff(round_currency(v)),
            Discount::AmountSurcharge(v) => Discount::AmountSurcharge(round_currency(v)),
            other => other,
        };
        self
    }

    /// quantity times price, rounded to the currency
    pub fn gross(&self) -> f64 {
        round_currency(self.quantity * self.unit_price)
    }

    /// gross with the discount or surcharge applied
    pub fn total(&self) -> f64 {
        let gross = self.quantity * self.unit_price;
        let total = match self.discount {
            Discount::None => gross,
            Discount::AmountOff(v) => gross - v,
            Discount::RateOff(v) => gross - gross * v,
            Discount::AmountSurcharge(v) => gross + v,
            Discount::RateSurcharge(v) => gross + gross * v,
        };
        round_currency(total)
    }

    pub fn unit_price_minor(&self) -> i64 {
        encode_minor_units(self.unit_price)
    }

    pub fn gross_minor(&self) -> i64 {
        encode_minor_units(self.gross())
    }

    pub fn total_minor(&self) -> i64 {
        encode_minor_units(self.total())
    }

    /// the value of the discount in minor units, rate discounts are taken from the gross
    pub fn discount_minor(&self) -> i64 {
        match self.discount {
            Discount::None => 0,
            Discount::AmountOff(v) | Discount::AmountSurcharge(v) => encode_minor_units(v),
            Discount::RateOff(v) | Discount::RateSurcharge(v) => {
                encode_minor_units(round_to(v * self.gross(), 2))
            }
        }
    }

    /// reject lines no printer accepts
    pub fn validate(&self) -> Result<()> {
        if !(self.quantity > 0.0) {
            return Err(PrinterError::Logic(format!(
                "line \"{}\": quantity must be positive, got {}",
                self.name, self.quantity
            )));
        }
        if !(self.unit_price > 0.0) {
            return Err(PrinterError::Logic(format!(
                "line \"{}\": price must be positive, got {}",
                self.name, self.unit_price
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentKind {
    Cash,
    CreditCard,
    Cheque,
    Bond,
    Credit,
    Other,
    Voucher,
    Account,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub kind: PaymentKind,
    pub amount: f64,
    pub name: Option<String>,
}

impl Payment {
    pub fn amount_minor(&self) -> i64 {
        encode_minor_units(self.amount)
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// a receipt to be printed
///
/// # Examples
///
/// ```
/// use fiscal_printer::model::{PaymentKind, SaleLine, TaxCategory, Transaction};
///
/// let mut transaction = Transaction::new("R-k 0123456789", "XX99", "Bartek Prokop");
/// transaction.add_line(SaleLine::new("Test drukarki", 1.0, 0.01, TaxCategory::Vat23));
/// transaction.add_payment(PaymentKind::Cash, 0.01, None);
/// assert_eq!(transaction.total_minor(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transaction {
    pub reference: String,
    /// register (cash box) identifier
    pub cashbox: String,
    pub cashier: String,
    pub lines: Vec<SaleLine>,
    pub payments: Vec<Payment>,
}

impl Transaction {
    pub fn new(reference: &str, cashbox: &str, cashier: &str) -> Self {
        Transaction {
            reference: String::from(reference.trim()),
            cashbox: String::from(cashbox.trim()),
            cashier: String::from(cashier.trim()),
            lines: Vec::new(),
            payments: Vec::new(),
        }
    }

    pub fn add_line(&mut self, line: SaleLine) {
        self.lines.push(line);
    }

    /// add a payment, amounts of an already present payment kind are merged
    ///
    /// # Notes
    ///
    /// The description is cut to 16 characters. When merging, the first description is kept.
    pub fn add_payment(&mut self, kind: PaymentKind, amount: f64, name: Option<&str>) {
        let name = name.map(|n| String::from(truncate_chars(n, PAYMENT_NAME_LENGTH).trim()));
        match self.payments.iter_mut().find(|p| p.kind == kind) {
            Some(payment) => payment.amount = round_to(payment.amount + amount, 2),
            None => self.payments.push(Payment {
                kind,
                amount: round_to(amount, 2),
                name,
            }),
        }
    }

    pub fn total(&self) -> f64 {
        round_currency(self.lines.iter().map(SaleLine::total).sum())
    }

    pub fn total_minor(&self) -> i64 {
        encode_minor_units(self.total())
    }

    pub fn payment(&self, kind: PaymentKind) -> Option<&Payment> {
        self.payments.iter().find(|p| p.kind == kind)
    }

    /// the payments to transmit, a single cash payment of the total when none were given
    pub fn settlement(&self) -> Vec<Payment> {
        if self.payments.is_empty() {
            return vec![Payment {
                kind: PaymentKind::Cash,
                amount: self.total(),
                name: None,
            }];
        }
        self.payments.clone()
    }
}

/// a VAT invoice, printed only by devices supporting it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Invoice {
    pub transaction: Transaction,
    /// buyer tax identification number (NIP)
    pub nip: String,
    /// buyer name and address
    pub header: String,
    pub payment_due: String,
    pub payment_type: String,
}

/// device slot numbers assigned to tax categories, valid for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateSlotMap {
    slots: HashMap<TaxCategory, u8>,
}

impl RateSlotMap {
    pub fn new() -> Self {
        RateSlotMap::default()
    }

    /// assign a slot, the first assignment of a category wins
    pub fn assign(&mut self, tax: TaxCategory, slot: u8) {
        self.slots.entry(tax).or_insert(slot);
    }

    pub fn get(&self, tax: TaxCategory) -> Option<u8> {
        self.slots.get(&tax).copied()
    }

    /// the slot for `tax` or a logic error naming the missing category
    pub fn resolve(&self, tax: TaxCategory) -> Result<u8> {
        self.get(tax).ok_or_else(|| {
            PrinterError::Logic(format!("tax rate {} is not defined in the printer", tax))
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_values() {
        let line = SaleLine::new("Kawa", 3.0, 2.99, TaxCategory::Vat08);
        assert_eq!(line.gross_minor(), 897);
        assert_eq!(line.total_minor(), 897);

        let line = SaleLine::new("Kawa", 2.0, 10.0, TaxCategory::Vat08)
            .with_discount(Discount::RateOff(0.1));
        assert_eq!(line.gross_minor(), 2000);
        assert_eq!(line.total_minor(), 1800);
        assert_eq!(line.discount_minor(), 200);

        let line = SaleLine::new("Kawa", 1.0, 10.0, TaxCategory::Vat08)
            .with_discount(Discount::AmountSurcharge(1.5));
        assert_eq!(line.total_minor(), 1150);
        assert_eq!(line.discount.ordinal(), 3);
    }

    #[test]
    fn test_validate() {
        assert!(SaleLine::new("a", 1.0, 1.0, TaxCategory::Vat23).validate().is_ok());
        assert!(SaleLine::new("a", 0.0, 1.0, TaxCategory::Vat23).validate().is_err());
        assert!(SaleLine::new("a", 1.0, -1.0, TaxCategory::Vat23).validate().is_err());
    }

    #[test]
    fn test_payments_are_merged() {
        let mut transaction = Transaction::new(" R1 ", "K1", "Jan");
        transaction.add_payment(PaymentKind::CreditCard, 1.10, Some("VISA Classic Gold Card"));
        transaction.add_payment(PaymentKind::Cash, 2.00, None);
        transaction.add_payment(PaymentKind::CreditCard, 0.20, Some("other"));
        assert_eq!(transaction.reference, "R1");
        assert_eq!(transaction.payments.len(), 2);
        let card = &transaction.payments[0];
        assert_eq!(card.amount_minor(), 130);
        assert_eq!(card.name(), "VISA Classic Gol");
    }

    #[test]
    fn test_settlement_defaults_to_cash() {
        let mut transaction = Transaction::new("R1", "K1", "Jan");
        transaction.add_line(SaleLine::new("Test drukarki", 1.0, 0.01, TaxCategory::Vat23));
        let settlement = transaction.settlement();
        assert_eq!(settlement.len(), 1);
        assert_eq!(settlement[0].kind, PaymentKind::Cash);
        assert_eq!(settlement[0].amount_minor(), 1);
        // the transaction itself is left untouched
        assert!(transaction.payments.is_empty());
    }

    #[test]
    fn test_rate_slots() {
        let mut slots = RateSlotMap::new();
        slots.assign(TaxCategory::Vat23, 0);
        slots.assign(TaxCategory::Vat23, 4);
        assert_eq!(slots.get(TaxCategory::Vat23), Some(0));
        assert!(slots.resolve(TaxCategory::Vat05).is_err());
        assert_eq!(TaxCategory::Vat05.to_string(), "5%");
        assert_eq!(TaxCategory::Exempt.to_string(), "ZW");
    }
}
