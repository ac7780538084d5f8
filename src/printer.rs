use tracing::debug;

use crate::{
    dialect::{Dialect, Operation, Timing},
    error::Result,
    model::{Invoice, Transaction},
    session::{PrinterSession, SessionConfig},
    transport::{SerialTransport, Transport},
};

/// a fiscal printer attached to a serial port
///
/// Every operation opens the port, runs one session and closes the port again, so a printer
/// can be shared between operations without holding the device.
pub struct FiscalPrinter {
    /// device name of the serial port, e.g. `/dev/ttyUSB0` or `COM1`
    port_name: String,
    dialect: Dialect,
    config: SessionConfig,
}

impl FiscalPrinter {
    /// describe a printer, nothing is opened yet
    ///
    /// # Arguments
    ///
    /// * `port_name` the device name of the serial port the printer is attached to
    /// * `dialect` the printer model, see [`Dialect`]
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fiscal_printer::{dialect::Dialect, printer::FiscalPrinter};
    ///
    /// let printer = FiscalPrinter::new("/dev/ttyUSB0", Dialect::PosnetThermal301);
    /// printer.open_drawer()?;
    /// # Ok::<(), fiscal_printer::error::PrinterError>(())
    /// ```
    pub fn new(port_name: &str, dialect: Dialect) -> Self {
        FiscalPrinter::with_config(port_name, dialect, SessionConfig::default())
    }

    pub fn with_config(port_name: &str, dialect: Dialect, config: SessionConfig) -> Self {
        FiscalPrinter {
            port_name: String::from(port_name),
            dialect,
            config,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// replace the deadlines and delays of the model for the following operations
    pub fn set_timing(&mut self, timing: Timing) {
        self.config.timing = Some(timing);
    }

    /// a session with this printer's settings over any transport
    pub fn session<T: Transport>(&self, transport: T) -> PrinterSession<T> {
        PrinterSession::new(transport, self.dialect, self.config.clone())
    }

    /// print a receipt
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fiscal_printer::{
    ///     dialect::Dialect,
    ///     model::{PaymentKind, SaleLine, TaxCategory, Transaction},
    ///     printer::FiscalPrinter,
    /// };
    ///
    /// let printer = FiscalPrinter::new("/dev/ttyUSB0", Dialect::Posnet101);
    /// let mut transaction = Transaction::new("R-1", "K1", "Jan");
    /// transaction.add_line(SaleLine::new("Kawa", 2.0, 7.5, TaxCategory::Vat08));
    /// transaction.add_payment(PaymentKind::Cash, 15.0, None);
    /// printer.print(&transaction)?;
    /// # Ok::<(), fiscal_printer::error::PrinterError>(())
    /// ```
    pub fn print(&self, transaction: &Transaction) -> Result<()> {
        self.open(Operation::Print)?.print(transaction)
    }

    /// print a VAT invoice, only the Posnet 1.01 printers support it
    pub fn print_invoice(&self, invoice: &Invoice) -> Result<()> {
        self.open(Operation::PrintInvoice)?.print_invoice(invoice)
    }

    pub fn open_drawer(&self) -> Result<()> {
        self.open(Operation::OpenDrawer)?.open_drawer()
    }

    pub fn print_daily_report(&self) -> Result<()> {
        self.open(Operation::DailyReport)?.print_daily_report()
    }

    pub fn print_monthly_report(&self) -> Result<()> {
        self.open(Operation::MonthlyReport)?.print_monthly_report()
    }

    /// open the port for one operation, unsupported operations fail before the port is touched
    fn open(&self, operation: Operation) -> Result<PrinterSession<SerialTransport>> {
        let descriptor = self.dialect.descriptor();
        descriptor.require(operation)?;
        debug!("opening {} for {} on {}", self.port_name, operation, descriptor.name);
        let transport = SerialTransport::open(&self.port_name, &descriptor.serial)?;
        Ok(self.session(transport))
    }
}
