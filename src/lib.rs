//! driver for Polish fiscal printers attached to a serial line
//!
//! Supported are the ESC framed Posnet Thermal, Innova and Optimus printers, the Posnet 1.01
//! protocol and the binary Elzab protocol. A [`printer::FiscalPrinter`] runs every operation in a
//! fresh [`session::PrinterSession`] that opens the port, talks to the device and releases the port.
//!
//! # Examples
//!
//! ```no_run
//! use fiscal_printer::{Dialect, FiscalPrinter, SaleLine, TaxCategory, Transaction};
//!
//! let printer = FiscalPrinter::new("/dev/ttyUSB0", "thermal301".parse::<Dialect>()?);
//! let mut transaction = Transaction::new("R-k 0123456789", "XX99", "Bartek Prokop");
//! transaction.add_line(SaleLine::new("Test drukarki", 1.0, 0.01, TaxCategory::Vat23));
//! printer.print(&transaction)?;
//! # Ok::<(), fiscal_printer::PrinterError>(())
//! ```

pub mod checksum;
pub mod decoder;
pub mod dialect;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod model;
pub mod printer;
pub mod registry;
pub mod session;
pub mod status;
pub mod transcode;
pub mod transport;

pub use dialect::Dialect;
pub use error::{ErrorCategory, PrinterError, Result};
pub use model::{Discount, Invoice, Payment, PaymentKind, SaleLine, TaxCategory, Transaction};
pub use printer::FiscalPrinter;
pub use session::{PrinterSession, SessionConfig, SessionState};
