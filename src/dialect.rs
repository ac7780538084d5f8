use std::{fmt::Display, str::FromStr, time::Duration};

use serial2::{CharSize, FlowControl, Parity, StopBits};

use crate::{
    error::{PrinterError, Result},
    model::PaymentKind,
    registry::{BINARY_ERRORS, ESC_ERRORS, ErrorEntry, TAB_ERRORS},
    transcode::{CodePage, format_decimal},
};

/// wire protocol family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// `ESC P ... ESC \` frames with a XOR control code and DLE/ENQ link probes
    Esc,
    /// `STX ... # CRC ETX` frames carrying tab separated tokens
    Tab,
    /// raw ESC opcodes with binary arguments, acknowledged by ACK
    Binary,
}

/// how an amount of minor units is written into a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyFormat {
    /// `12.34`
    Decimal,
    /// `1234`
    MinorUnits,
}

impl MoneyFormat {
    pub fn render(&self, minor: i64) -> String {
        match self {
            MoneyFormat::Decimal => format_decimal(minor),
            MoneyFormat::MinorUnits => minor.to_string(),
        }
    }
}

/// layout of a sale line command of the ESC family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineGrammar {
    /// `no;dt$l` with gross and discount fields
    Discount,
    /// `no$l` with the line total only
    Plain,
}

/// layout of the transaction close command of the ESC family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseGrammar {
    /// `$y` with a list of payment forms
    PaymentForms,
    /// `$x` with the fixed cash, card, cheque and voucher fields
    FixedPayments,
}

/// serial line parameters, applied when the port is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub char_size: CharSize,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

/// probe bytes sent to bring an ESC family printer into a known state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetPlan {
    /// CAN bytes sent once before the probe rounds
    pub leading_cancels: u8,
    /// number of probe rounds
    pub rounds: u8,
    /// CAN bytes sent at the start of every round, before DLE and ENQ
    pub cancels_per_round: u8,
    /// drain the input before the reset instead of after it
    pub flush_first: bool,
}

impl ResetPlan {
    pub const NONE: ResetPlan = ResetPlan {
        leading_cancels: 0,
        rounds: 0,
        cancels_per_round: 0,
        flush_first: false,
    };
}

/// deadlines and delays of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// wait for the reply byte of a DLE or ENQ probe
    pub probe: Duration,
    /// pause between two reset probe bytes
    pub reset_gap: Duration,
    /// settle time before the input is drained
    pub flush_settle: Duration,
    /// reply to a short command
    pub command: Duration,
    /// reply to a sale line
    pub line: Duration,
    /// reply to the transaction close and to reports
    pub close: Duration,
    /// reply to the invoice close, the operator has to confirm the invoice on the device
    pub invoice_close: Duration,
    /// pause between the transaction close and the drawer kick
    pub settle_before_drawer: Duration,
    /// pause between two readiness checks
    pub ready_retry: Duration,
}

const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

const ESC_TIMING: Timing = Timing {
    probe: ms(2000),
    reset_gap: ms(25),
    flush_settle: ms(200),
    command: ms(1000),
    line: ms(2000),
    close: ms(10000),
    invoice_close: ms(10000),
    settle_before_drawer: ms(250),
    ready_retry: ms(0),
};

/// top level operations a dialect may or may not support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Print,
    PrintInvoice,
    OpenDrawer,
    DailyReport,
    MonthlyReport,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Print => write!(f, "print"),
            Operation::PrintInvoice => write!(f, "invoice"),
            Operation::OpenDrawer => write!(f, "open drawer"),
            Operation::DailyReport => write!(f, "daily report"),
            Operation::MonthlyReport => write!(f, "monthly report"),
        }
    }
}

/// static description of a printer model: framing, grammar, tables and timing
#[derive(Debug)]
pub struct DialectDescriptor {
    pub name: &'static str,
    pub family: Family,
    pub serial: SerialSettings,
    pub code_page: CodePage,
    pub reset: ResetPlan,
    pub timing: Timing,
    pub errors: &'static [ErrorEntry],
    pub money: MoneyFormat,
    pub line_grammar: LineGrammar,
    pub close_grammar: CloseGrammar,
    /// the reference is printed as a barcode (`#ref#`, at most 16 characters)
    pub barcode_reference: bool,
    /// device code of every accepted payment kind
    pub payment_codes: &'static [(PaymentKind, u8)],
    pub operations: &'static [Operation],
    /// transport write failures are logged and otherwise ignored
    pub ignore_write_errors: bool,
    /// the rate status reply is followed by an error status reply
    pub status_after_rates: bool,
    /// drop a leading control character from a two character error status
    pub strip_status_control: bool,
    pub footer: [&'static str; 3],
    /// rate table (basis points, slots A to G) assumed until the device is queried
    pub default_rates: Option<[u16; 7]>,
}

impl DialectDescriptor {
    pub fn supports(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    /// fail with a logic error when `operation` is not available on this model
    pub fn require(&self, operation: Operation) -> Result<()> {
        if !self.supports(operation) {
            return Err(PrinterError::Logic(format!(
                "{} is not supported by {}",
                operation, self.name
            )));
        }
        Ok(())
    }

    pub fn payment_code(&self, kind: PaymentKind) -> Result<u8> {
        self.payment_codes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, code)| *code)
            .ok_or_else(|| {
                PrinterError::Logic(format!(
                    "payment kind {:?} is not supported by {}",
                    kind, self.name
                ))
            })
    }
}

const ESC_SERIAL: SerialSettings = SerialSettings {
    baud_rate: 9600,
    char_size: CharSize::Bits8,
    stop_bits: StopBits::One,
    parity: Parity::None,
    flow_control: FlowControl::None,
};

const THERMAL_FOOTER_1: &str = "Serwer wydruku fiskalnego wersja 2.0";
const THERMAL_FOOTER_2: &str = "(c)2014 http://fps.bart.prokop.name/";

const POSNET_THERMAL_301: DialectDescriptor = DialectDescriptor {
    name: "Posnet Thermal 3.01",
    family: Family::Esc,
    serial: ESC_SERIAL,
    code_page: CodePage::Mazovia,
    reset: ResetPlan {
        leading_cancels: 0,
        rounds: 7,
        cancels_per_round: 2,
        flush_first: false,
    },
    timing: ESC_TIMING,
    errors: ESC_ERRORS,
    money: MoneyFormat::Decimal,
    line_grammar: LineGrammar::Discount,
    close_grammar: CloseGrammar::PaymentForms,
    barcode_reference: true,
    payment_codes: &[
        (PaymentKind::Cash, 0),
        (PaymentKind::CreditCard, 1),
        (PaymentKind::Cheque, 2),
        (PaymentKind::Bond, 3),
        (PaymentKind::Other, 4),
        (PaymentKind::Credit, 5),
        (PaymentKind::Account, 6),
        (PaymentKind::Voucher, 7),
    ],
    operations: &[
        Operation::Print,
        Operation::OpenDrawer,
        Operation::DailyReport,
    ],
    ignore_write_errors: true,
    status_after_rates: true,
    strip_status_control: true,
    footer: [
        THERMAL_FOOTER_1,
        THERMAL_FOOTER_2,
        "Sterownik: PosnetThermal 3.01",
    ],
    default_rates: None,
};

const POSNET_THERMAL_203: DialectDescriptor = DialectDescriptor {
    name: "Posnet Thermal 2.03",
    reset: ResetPlan {
        leading_cancels: 0,
        rounds: 15,
        cancels_per_round: 2,
        flush_first: false,
    },
    payment_codes: &[
        (PaymentKind::Cash, 0),
        (PaymentKind::CreditCard, 1),
        (PaymentKind::Cheque, 2),
        (PaymentKind::Voucher, 3),
        (PaymentKind::Other, 4),
        (PaymentKind::Credit, 5),
    ],
    footer: [
        THERMAL_FOOTER_1,
        THERMAL_FOOTER_2,
        "Sterownik: PosnetThermal 2.03",
    ],
    ..POSNET_THERMAL_301
};

const INNOVA_PROFIT_451: DialectDescriptor = DialectDescriptor {
    name: "Innova Profit 4.51",
    family: Family::Esc,
    serial: ESC_SERIAL,
    code_page: CodePage::Mazovia,
    reset: ResetPlan {
        leading_cancels: 5,
        rounds: 3,
        cancels_per_round: 0,
        flush_first: false,
    },
    timing: Timing {
        reset_gap: ms(10),
        settle_before_drawer: ms(4000),
        ..ESC_TIMING
    },
    errors: ESC_ERRORS,
    money: MoneyFormat::Decimal,
    line_grammar: LineGrammar::Plain,
    close_grammar: CloseGrammar::FixedPayments,
    barcode_reference: false,
    // index of the cash, card, cheque and voucher fields
    payment_codes: &[
        (PaymentKind::Cash, 0),
        (PaymentKind::CreditCard, 1),
        (PaymentKind::Cheque, 2),
        (PaymentKind::Voucher, 3),
    ],
    operations: &[Operation::Print, Operation::OpenDrawer],
    ignore_write_errors: true,
    status_after_rates: true,
    strip_status_control: false,
    footer: [
        "Serwer wydruku fiskalnego wersja 1.1",
        "(c) 2001-2007 TT Soft Sp. z o.o., BPP.",
        "http://www.tt-soft.com/",
    ],
    default_rates: None,
};

const OPTIMUS_VIVO: DialectDescriptor = DialectDescriptor {
    name: "Optimus Vivo",
    family: Family::Esc,
    serial: ESC_SERIAL,
    code_page: CodePage::Mazovia,
    reset: ResetPlan {
        leading_cancels: 3,
        rounds: 2,
        cancels_per_round: 0,
        flush_first: true,
    },
    timing: Timing {
        reset_gap: ms(10),
        settle_before_drawer: ms(0),
        ..ESC_TIMING
    },
    errors: ESC_ERRORS,
    money: MoneyFormat::Decimal,
    line_grammar: LineGrammar::Discount,
    close_grammar: CloseGrammar::PaymentForms,
    barcode_reference: false,
    payment_codes: &[
        (PaymentKind::Cash, 0),
        (PaymentKind::CreditCard, 1),
        (PaymentKind::Cheque, 2),
        (PaymentKind::Voucher, 3),
        (PaymentKind::Other, 4),
        (PaymentKind::Credit, 5),
    ],
    operations: &[Operation::Print, Operation::OpenDrawer],
    ignore_write_errors: true,
    status_after_rates: false,
    strip_status_control: false,
    footer: ["Dziękujemy", "Zapraszamy ponownie", "Driver: OptimusVivo"],
    default_rates: None,
};

const POSNET_101: DialectDescriptor = DialectDescriptor {
    name: "Posnet 1.01",
    family: Family::Tab,
    serial: SerialSettings {
        flow_control: FlowControl::XonXoff,
        ..ESC_SERIAL
    },
    code_page: CodePage::Windows1250,
    reset: ResetPlan::NONE,
    timing: Timing {
        probe: ms(0),
        reset_gap: ms(0),
        flush_settle: ms(0),
        command: ms(10000),
        line: ms(10000),
        close: ms(10000),
        invoice_close: ms(45000),
        settle_before_drawer: ms(0),
        ready_retry: ms(0),
    },
    errors: TAB_ERRORS,
    money: MoneyFormat::MinorUnits,
    line_grammar: LineGrammar::Discount,
    close_grammar: CloseGrammar::PaymentForms,
    barcode_reference: true,
    payment_codes: &[
        (PaymentKind::Cash, 0),
        (PaymentKind::CreditCard, 2),
        (PaymentKind::Cheque, 3),
        (PaymentKind::Bond, 4),
        (PaymentKind::Credit, 5),
        (PaymentKind::Other, 6),
        (PaymentKind::Voucher, 7),
        (PaymentKind::Account, 8),
    ],
    operations: &[
        Operation::Print,
        Operation::PrintInvoice,
        Operation::OpenDrawer,
        Operation::DailyReport,
        Operation::MonthlyReport,
    ],
    ignore_write_errors: false,
    status_after_rates: false,
    strip_status_control: false,
    footer: ["&b&c&hDziękujemy", "&c&bZapraszamy ponownie", "&i&cPosnet 1.01"],
    default_rates: None,
};

const ELZAB_MERA: DialectDescriptor = DialectDescriptor {
    name: "Elzab Mera",
    family: Family::Binary,
    serial: SerialSettings {
        parity: Parity::Even,
        flow_control: FlowControl::RtsCts,
        ..ESC_SERIAL
    },
    code_page: CodePage::Windows1250,
    reset: ResetPlan::NONE,
    timing: Timing {
        probe: ms(0),
        reset_gap: ms(0),
        flush_settle: ms(0),
        command: ms(10000),
        line: ms(10000),
        close: ms(10000),
        invoice_close: ms(10000),
        settle_before_drawer: ms(0),
        ready_retry: ms(2000),
    },
    errors: BINARY_ERRORS,
    money: MoneyFormat::MinorUnits,
    line_grammar: LineGrammar::Discount,
    close_grammar: CloseGrammar::PaymentForms,
    barcode_reference: false,
    payment_codes: &[],
    operations: &[
        Operation::Print,
        Operation::OpenDrawer,
        Operation::DailyReport,
    ],
    ignore_write_errors: false,
    status_after_rates: false,
    strip_status_control: false,
    footer: ["", "", ""],
    default_rates: Some([2200, 700, 0, 300, 0x8000, 0x8000, 0x4000]),
};

/// supported printer models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    PosnetThermal301,
    PosnetThermal203,
    InnovaProfit451,
    OptimusVivo,
    Posnet101,
    ElzabMera,
}

impl Dialect {
    pub const ALL: [Dialect; 6] = [
        Dialect::PosnetThermal301,
        Dialect::PosnetThermal203,
        Dialect::InnovaProfit451,
        Dialect::OptimusVivo,
        Dialect::Posnet101,
        Dialect::ElzabMera,
    ];

    pub fn descriptor(&self) -> &'static DialectDescriptor {
        match self {
            Dialect::PosnetThermal301 => &POSNET_THERMAL_301,
            Dialect::PosnetThermal203 => &POSNET_THERMAL_203,
            Dialect::InnovaProfit451 => &INNOVA_PROFIT_451,
            Dialect::OptimusVivo => &OPTIMUS_VIVO,
            Dialect::Posnet101 => &POSNET_101,
            Dialect::ElzabMera => &ELZAB_MERA,
        }
    }

    fn key(&self) -> &'static str {
        match self {
            Dialect::PosnetThermal301 => "thermal301",
            Dialect::PosnetThermal203 => "thermal203",
            Dialect::InnovaProfit451 => "innova451",
            Dialect::OptimusVivo => "optimusvivo",
            Dialect::Posnet101 => "posnet101",
            Dialect::ElzabMera => "elzabmera",
        }
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Dialect {
    type Err = PrinterError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Dialect::ALL
            .iter()
            .find(|dialect| dialect.key() == wanted)
            .copied()
            .ok_or_else(|| PrinterError::Logic(format!("unknown printer model \"{}\"", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect() -> Result<()> {
        assert_eq!("thermal301".parse::<Dialect>()?, Dialect::PosnetThermal301);
        assert_eq!(" ElzabMera ".parse::<Dialect>()?, Dialect::ElzabMera);
        assert!("thermal".parse::<Dialect>().is_err());
        for dialect in Dialect::ALL {
            assert_eq!(dialect.to_string().parse::<Dialect>()?, dialect);
        }
        Ok(())
    }

    #[test]
    fn test_descriptors() {
        let thermal203 = Dialect::PosnetThermal203.descriptor();
        assert_eq!(thermal203.reset.rounds, 15);
        assert_eq!(thermal203.family, Family::Esc);
        assert_eq!(thermal203.timing.settle_before_drawer, ms(250));
        assert!(thermal203.barcode_reference);

        let optimus = Dialect::OptimusVivo.descriptor();
        assert!(optimus.reset.flush_first);
        assert!(!optimus.status_after_rates);

        let posnet = Dialect::Posnet101.descriptor();
        assert_eq!(posnet.serial.flow_control, FlowControl::XonXoff);
        assert_eq!(posnet.timing.invoice_close, ms(45000));

        let elzab = Dialect::ElzabMera.descriptor();
        assert_eq!(elzab.serial.parity, Parity::Even);
        assert_eq!(elzab.serial.flow_control, FlowControl::RtsCts);
    }

    #[test]
    fn test_operations() {
        let innova = Dialect::InnovaProfit451.descriptor();
        assert!(innova.require(Operation::Print).is_ok());
        let err = innova.require(Operation::DailyReport).unwrap_err();
        assert_eq!(
            err.to_string(),
            "daily report is not supported by Innova Profit 4.51"
        );
        assert!(
            Dialect::Posnet101
                .descriptor()
                .supports(Operation::MonthlyReport)
        );
    }

    #[test]
    fn test_payment_codes() -> Result<()> {
        assert_eq!(
            Dialect::PosnetThermal301
                .descriptor()
                .payment_code(PaymentKind::Voucher)?,
            7
        );
        assert_eq!(
            Dialect::PosnetThermal203
                .descriptor()
                .payment_code(PaymentKind::Voucher)?,
            3
        );
        assert!(
            Dialect::OptimusVivo
                .descriptor()
                .payment_code(PaymentKind::Account)
                .is_err()
        );
        Ok(())
    }

    #[test]
    fn test_money_format() {
        assert_eq!(MoneyFormat::Decimal.render(1), "0.01");
        assert_eq!(MoneyFormat::MinorUnits.render(1), "1");
    }
}
