use std::ops::RangeInclusive;

use crate::error::{
    ErrorCategory::{self, Device, Logic, Protocol, Transport},
    PrinterError,
};

/// meaning of a numeric code reported by a printer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    /// the codes sharing this entry, most entries cover a single code
    pub codes: RangeInclusive<i32>,
    pub category: ErrorCategory,
    pub text: &'static str,
}

const fn entry(code: i32, category: ErrorCategory, text: &'static str) -> ErrorEntry {
    ErrorEntry {
        codes: code..=code,
        category,
        text,
    }
}

const fn range(first: i32, last: i32, category: ErrorCategory, text: &'static str) -> ErrorEntry {
    ErrorEntry {
        codes: first..=last,
        category,
        text,
    }
}

/// returned for any code a table does not know
pub static UNRECOGNIZED: ErrorEntry = range(i32::MIN, i32::MAX, Protocol, "unrecognized fault");

impl ErrorEntry {
    /// the error to report for this entry when it was raised by `command`
    pub fn to_error(&self, command: &str, code: i32) -> PrinterError {
        match self.category {
            Device => PrinterError::DeviceFault(format!(
                "{} ({} returned {})",
                self.text, command, code
            )),
            _ => PrinterError::ProtocolFault {
                command: String::from(command),
                code,
                text: self.text,
            },
        }
    }
}

/// resolve a code, never fails
pub fn lookup(table: &'static [ErrorEntry], code: i32) -> &'static ErrorEntry {
    table
        .iter()
        .find(|entry| entry.codes.contains(&code))
        .unwrap_or(&UNRECOGNIZED)
}

/// codes of the ESC framed printers (Posnet Thermal, Innova, Optimus), reported as `<code>#Z`
pub const ESC_ERRORS: &[ErrorEntry] = &[
    entry(-1, Transport, "no response received"),
    entry(0, Protocol, "no error"),
    entry(1, Device, "real time clock not initialized"),
    entry(2, Protocol, "control byte error"),
    entry(3, Protocol, "wrong number of parameters"),
    entry(4, Protocol, "parameter error"),
    entry(5, Device, "real time clock operation error"),
    entry(6, Device, "fiscal module operation error"),
    entry(7, Logic, "date error"),
    entry(8, Protocol, "non-zero totalizers"),
    entry(9, Device, "I/O operation error"),
    entry(10, Logic, "time change out of the permitted range"),
    entry(11, Logic, "wrong number of tax rates or bad number"),
    entry(12, Logic, "bad header"),
    entry(13, Logic, "device is already fiscalized"),
    entry(14, Logic, "header to RAM on a fiscalized device"),
    entry(16, Logic, "name field error"),
    entry(17, Logic, "quantity field error"),
    entry(18, Logic, "tax rate field error"),
    entry(19, Logic, "price field error"),
    entry(20, Logic, "gross field error"),
    entry(21, Protocol, "transaction mode is off"),
    entry(22, Protocol, "void error"),
    entry(23, Protocol, "wrong number of records"),
    entry(24, Device, "print buffer overflow"),
    entry(25, Logic, "cash register code error"),
    entry(26, Logic, "cash payment amount error"),
    entry(27, Logic, "total amount error"),
    entry(28, Device, "totalizer overflow"),
    entry(29, Protocol, "transaction end without transaction start"),
    entry(30, Logic, "cash in or cash out amount error"),
    entry(31, Logic, "addition overflow"),
    entry(32, Logic, "negative result"),
    entry(33, Logic, "shift field error"),
    entry(34, Logic, "cashier field error"),
    entry(35, Protocol, "zero totalizers"),
    entry(36, Protocol, "a record with this date already exists"),
    entry(37, Device, "operation cancelled from the keyboard"),
    entry(38, Logic, "name field error"),
    entry(39, Logic, "tax rate field error"),
    entry(
        40,
        Device,
        "transaction start blocked after an error or a full fiscal module",
    ),
    range(41, 51, Protocol, "credit card error"),
    entry(80, Protocol, "database error while changing tax rates"),
    entry(81, Protocol, "database printout requested"),
    entry(82, Protocol, "function not allowed in the current device state"),
    entry(83, Logic, "deposit amount mismatch"),
    entry(90, Logic, "a deposit only transaction cannot contain goods"),
    entry(91, Protocol, "payment already sent, no more goods allowed"),
    entry(92, Device, "goods database overflow"),
    entry(93, Protocol, "payment cancel error"),
    entry(94, Logic, "sales amount overflow"),
    entry(95, Protocol, "printer is in transaction mode, operation not allowed"),
    entry(96, Protocol, "cancelled after a timeout"),
    entry(97, Device, "battery too weak, sales not possible"),
    entry(98, Device, "service jumper error"),
];

/// codes of the Posnet 1.01 protocol, reported as `command?code`
pub const TAB_ERRORS: &[ErrorEntry] = &[
    entry(10, Device, "unusual error, function cancelled or interrupted"),
    range(50, 56, Device, "cash register operation error"),
    entry(323, Logic, "function blocked in the configuration"),
    entry(360, Device, "service jumper found"),
    entry(361, Device, "service jumper not found"),
    entry(362, Device, "key data verification error"),
    entry(363, Device, "timeout waiting for the key"),
    entry(382, Protocol, "attempt to print a zero report"),
    entry(383, Protocol, "daily report missing"),
    entry(384, Protocol, "no record in memory"),
    entry(400, Logic, "bad value"),
    entry(404, Logic, "invalid check digit entered"),
    entry(460, Device, "clock error in fiscal mode"),
    entry(461, Device, "clock error in non-fiscal mode"),
    entry(480, Protocol, "printer already authorized without time limit"),
    entry(481, Protocol, "authorization not started yet"),
    entry(482, Protocol, "code already entered"),
    entry(483, Logic, "attempt to enter bad values"),
    entry(484, Protocol, "working time expired, sales blocked"),
    entry(485, Logic, "bad authorization code"),
    entry(486, Protocol, "authorization blocked, enter the code on the keyboard"),
    entry(487, Protocol, "maximum number of codes already used"),
    entry(500, Protocol, "minimum statistics overflow"),
    entry(501, Protocol, "maximum statistics overflow"),
    entry(502, Protocol, "cash drawer balance overflow"),
    entry(503, Logic, "cash drawer balance negative after cash out"),
    entry(700, Logic, "bad IP address"),
    entry(701, Logic, "bad tone number"),
    entry(702, Logic, "bad drawer pulse length"),
    entry(703, Logic, "tax rate error"),
    entry(704, Logic, "bad logout time"),
    entry(705, Logic, "bad sleep time"),
    entry(706, Logic, "bad power off time"),
    entry(713, Logic, "bad configuration parameters"),
    entry(714, Logic, "bad display contrast"),
    entry(715, Logic, "bad display backlight"),
    entry(716, Logic, "bad backlight timeout"),
    entry(717, Logic, "header or footer line too long"),
    entry(718, Logic, "bad communication configuration"),
    entry(719, Logic, "bad communication protocol configuration"),
    entry(720, Logic, "bad port identifier"),
    entry(721, Logic, "bad advertisement text number"),
    entry(722, Logic, "time out of the required range"),
    entry(723, Logic, "invalid date or time"),
    entry(724, Logic, "other hour in time differences"),
    entry(726, Logic, "bad display line text"),
    entry(727, Logic, "bad display scroll value"),
    entry(728, Logic, "bad port configuration"),
    entry(729, Logic, "bad transaction monitor configuration"),
    entry(738, Logic, "invalid Ethernet configuration"),
    entry(739, Logic, "invalid display type"),
    entry(740, Logic, "backlight timeout not supported by this display"),
    entry(820, Device, "negative test result"),
    entry(821, Logic, "tested option missing in the configuration"),
    entry(857, Device, "no memory to initialize the printer database"),
    entry(1000, Device, "fatal fiscal module error"),
    entry(1001, Device, "fiscal memory disconnected"),
    entry(1002, Device, "write error"),
    entry(1003, Device, "error not covered by the BIOS specification"),
    entry(1004, Device, "bad checksums"),
    entry(1005, Device, "error in the first control block"),
    entry(1006, Device, "error in the second control block"),
    entry(1007, Device, "bad record id"),
    entry(1008, Device, "start address initialization error"),
    entry(1009, Device, "start address already initialized"),
    entry(1010, Device, "unique number already written"),
    entry(1011, Device, "no unique number in fiscal mode"),
    entry(1012, Device, "unique number write error"),
    entry(1013, Device, "unique numbers overflow"),
    entry(1014, Device, "bad language in the unique number"),
    entry(1015, Device, "more than one tax id"),
    entry(1016, Device, "printer is read only without a fiscalization record"),
    entry(1017, Device, "number of RAM resets exceeded"),
    entry(1018, Device, "number of daily reports exceeded"),
    entry(1019, Device, "unique number verification error"),
    entry(1020, Device, "statistics verification error"),
    entry(1021, Device, "NVR read error during fiscal memory verification"),
    entry(1022, Device, "NVR write error during fiscal memory verification"),
    entry(1023, Device, "fiscal memory too small, 1 Mb instead of 2 Mb"),
    entry(1024, Device, "uninitialized data area in fiscal memory"),
    entry(1025, Device, "bad unique number format"),
    entry(1026, Device, "too many bad blocks in fiscal memory"),
    entry(1027, Device, "error marking a bad block"),
    entry(1028, Device, "fiscal memory record does not exist, area empty"),
    entry(1029, Device, "fiscal memory record dated later than the previous one"),
    entry(1030, Device, "daily report digest read error"),
    entry(1031, Device, "daily report digest write error"),
    entry(1032, Device, "daily report digest verification read error"),
    entry(1033, Device, "daily report digest verification write error"),
    entry(1034, Device, "medium label read error"),
    entry(1035, Device, "medium label write error"),
    entry(1036, Device, "electronic copy data mismatch"),
    entry(1037, Device, "bad data in the invoice bit area"),
    entry(1038, Device, "invoice area error, area is not empty"),
    entry(1039, Device, "no room for new invoices"),
    entry(1040, Device, "invoice sum of daily reports exceeds the invoice counter"),
    entry(1950, Logic, "receipt totalizer range exceeded"),
    entry(1951, Logic, "payment exceeds the maximum payment"),
    entry(1952, Logic, "sum of payments exceeds the maximum payment"),
    entry(1953, Logic, "payments already cover the amount due"),
    entry(1954, Logic, "change exceeds the maximum payment"),
    entry(1955, Logic, "sum of payments exceeds the maximum payment"),
    entry(1956, Logic, "total range exceeded"),
    entry(1957, Logic, "maximum receipt range exceeded"),
    entry(1958, Logic, "container value range exceeded"),
    entry(1959, Logic, "container value range exceeded on void"),
    entry(1961, Logic, "change too large"),
    entry(1962, Logic, "payment of value 0"),
    entry(1980, Logic, "discount or surcharge base amount out of range"),
    entry(1981, Logic, "amount after discount or surcharge out of range"),
    entry(1982, Logic, "discount or surcharge calculation error"),
    entry(1983, Logic, "base value negative or zero"),
    entry(1984, Logic, "discount or surcharge value is zero"),
    entry(1985, Logic, "value after discount negative or zero"),
    entry(1990, Protocol, "void not allowed, bad transaction state"),
    entry(1991, Protocol, "discount or surcharge not allowed, bad transaction state"),
    entry(2000, Logic, "tax rate field error"),
    entry(2002, Protocol, "no header"),
    entry(2003, Protocol, "header programmed"),
    entry(2004, Protocol, "no active tax rates"),
    entry(2005, Protocol, "not in transaction mode"),
    entry(2006, Logic, "price field error (price <= 0)"),
    entry(2007, Logic, "quantity field error (quantity <= 0)"),
    entry(2008, Logic, "total amount error"),
    entry(2009, Logic, "total amount error, equals zero"),
    entry(2010, Device, "daily totalizer range exceeded"),
    entry(2021, Protocol, "attempt to set the clock again"),
    entry(2022, Logic, "date difference too large"),
    entry(
        2023,
        Logic,
        "difference larger than an hour in user mode in fiscal mode",
    ),
    entry(2024, Logic, "bad date format"),
    entry(2025, Logic, "date earlier than the last fiscal module record"),
    entry(2026, Device, "clock error"),
    entry(2027, Protocol, "maximum number of tax rate changes exceeded"),
    entry(2028, Logic, "attempt to define identical tax rates"),
    entry(2029, Logic, "bad tax rate values"),
    entry(2030, Logic, "attempt to define all tax rates inactive"),
    entry(2031, Logic, "tax id field error"),
    entry(2032, Device, "fiscal memory unique number error"),
    entry(2033, Protocol, "device in fiscal mode"),
    entry(2034, Protocol, "device in non-fiscal mode"),
    entry(2035, Protocol, "non-zero totalizers"),
    entry(2036, Device, "device is read only"),
    entry(2037, Protocol, "device is not read only"),
    entry(2038, Protocol, "device in transaction mode"),
    entry(2039, Protocol, "zero totalizers"),
    entry(2040, Logic, "currency calculation overflow"),
    entry(2041, Logic, "attempt to close a receipt with value 0"),
    entry(2042, Logic, "bad start date format"),
    entry(2043, Logic, "bad end date format"),
    entry(2044, Protocol, "monthly report attempted within the month"),
    entry(2045, Logic, "start date later than today"),
    entry(2046, Logic, "end date earlier than the fiscalization date"),
    entry(2047, Logic, "start or end number is zero"),
    entry(2048, Logic, "start number greater than the end number"),
    entry(2049, Logic, "report number too large"),
    entry(2050, Logic, "start date later than the end date"),
    entry(2051, Device, "no memory in the text buffer"),
    entry(2052, Device, "no memory in the transaction buffer"),
    entry(2054, Logic, "payments do not cover the amount due or the change"),
    entry(2055, Logic, "bad line"),
    entry(2057, Logic, "size or number of formatting characters exceeded"),
    entry(2058, Logic, "bad number of lines"),
    entry(2060, Protocol, "bad transaction state"),
    entry(2062, Device, "part of a document is already printed"),
    entry(2063, Logic, "parameter error"),
    entry(2064, Protocol, "printout or transaction not started"),
    entry(2067, Logic, "printout or printer configuration error"),
    entry(2070, Protocol, "service date earlier than the system date"),
    entry(2101, Device, "database full"),
    entry(2102, Logic, "tax rate inactive"),
    entry(2103, Logic, "invalid tax rate"),
    entry(2104, Logic, "name error"),
    entry(2105, Logic, "tax rate assignment error"),
    entry(2106, Protocol, "blocked"),
    entry(2107, Protocol, "not found in the printer database"),
    entry(2108, Protocol, "database is not full"),
    entry(2501, Logic, "bad report identifier"),
    entry(2502, Logic, "bad report line identifier"),
    entry(2503, Logic, "bad report header identifier"),
    entry(2504, Logic, "too few report parameters"),
    entry(2505, Protocol, "report not started"),
    entry(2506, Protocol, "report started"),
    entry(2507, Logic, "bad command identifier"),
    entry(2521, Protocol, "report already started"),
    entry(2522, Protocol, "report not started"),
    entry(2523, Logic, "bad tax rate"),
    entry(2532, Logic, "bad number of invoice copies"),
    entry(2533, Logic, "empty invoice number"),
    entry(2600, Logic, "bad discount or surcharge type"),
    entry(2601, Logic, "discount or surcharge value out of range"),
    entry(2701, Logic, "tax rate identifier error"),
    entry(2702, Logic, "bad additional footer identifier"),
    entry(2703, Logic, "number of additional footers exceeded"),
    entry(2704, Device, "battery too weak"),
    entry(2705, Logic, "bad payment type identifier"),
    entry(2710, Protocol, "service with this identifier is not running"),
    entry(2801, Protocol, "discount or surcharge value verification error"),
    entry(2802, Protocol, "sale line value verification error"),
    entry(2803, Protocol, "container value verification error"),
    entry(2804, Protocol, "payment value verification error"),
    entry(2805, Protocol, "fiscal value verification error"),
    entry(2806, Protocol, "positive container value verification error"),
    entry(2807, Protocol, "negative container value verification error"),
    entry(2808, Protocol, "paid payments value verification error"),
    entry(2809, Protocol, "change value verification error"),
    entry(2851, Logic, "void error, bad quantity"),
    entry(2852, Logic, "void error, bad value"),
    entry(
        2900,
        Device,
        "electronic copy state does not allow printing this document",
    ),
    entry(2903, Device, "electronic copy cache holds too much data"),
    entry(2911, Device, "no file on the medium"),
    entry(2913, Device, "invalid test result"),
    entry(3051, Protocol, "accounting currency cannot be changed twice after a daily report"),
    entry(3052, Protocol, "attempt to set the currency already set"),
    entry(3053, Logic, "bad currency name"),
    entry(3054, Protocol, "automatic currency change"),
    entry(3055, Logic, "bad exchange rate value"),
];

/// replies of the Elzab printers other than ACK
pub const BINARY_ERRORS: &[ErrorEntry] = &[
    entry(-1, Transport, "no acknowledgement received"),
    entry(0x15, Protocol, "command rejected (NAK)"),
];
