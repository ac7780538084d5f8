//! one printer operation driven over a [`Transport`]
//!
//! A session owns its transport, runs exactly one top level operation and releases the transport
//! afterwards, whatever the outcome. The family specific command flows live in the submodules.

use std::{
    fmt::Display,
    thread::sleep,
    time::{Duration, Instant},
};

use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, trace, warn};

use crate::{
    decoder::{decode_binary_rates, encode_binary_rates},
    dialect::{Dialect, DialectDescriptor, Family, Operation, Timing},
    error::{PrinterError, Result},
    frame::FrameCodec,
    model::{Invoice, RateSlotMap, SaleLine, Transaction},
    status::LinkStatus,
    transcode::quantity_precision,
    transport::Transport,
};

mod binary;
mod esc;
mod tab;

/// size of a single read from the transport
const READ_CHUNK: usize = 256;

/// progress of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Resetting,
    QueryingCapabilities,
    Idle,
    TransactionOpen,
    SendingLine,
    SendingPayment,
    Closing,
    DrawerOpening,
    /// an operation failed, the session cannot be used anymore
    Error,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// tunables of a session, the defaults suit real devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// replaces the footer lines of the model
    pub footer: Option<[String; 3]>,
    /// replaces the deadlines and delays of the model
    pub timing: Option<Timing>,
    /// date put into daily and monthly reports, today when not set
    pub report_date: Option<NaiveDate>,
    /// how often the Elzab printers are checked for readiness before giving up
    pub ready_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            footer: None,
            timing: None,
            report_date: None,
            ready_retries: 5,
        }
    }
}

/// drives one operation of one printer
///
/// # Examples
///
/// ```no_run
/// use fiscal_printer::{
///     dialect::Dialect,
///     model::{SaleLine, TaxCategory, Transaction},
///     session::{PrinterSession, SessionConfig},
///     transport::SerialTransport,
/// };
///
/// let dialect = Dialect::Posnet101;
/// let transport = SerialTransport::open("/dev/ttyUSB0", &dialect.descriptor().serial)?;
/// let mut session = PrinterSession::new(transport, dialect, SessionConfig::default());
/// let mut transaction = Transaction::new("R-1", "K1", "Jan");
/// transaction.add_line(SaleLine::new("Kawa", 1.0, 7.5, TaxCategory::Vat08));
/// session.print(&transaction)?;
/// # Ok::<(), fiscal_printer::error::PrinterError>(())
/// ```
pub struct PrinterSession<T: Transport> {
    /// `None` once released
    transport: Option<T>,
    dialect: Dialect,
    descriptor: &'static DialectDescriptor,
    config: SessionConfig,
    timing: Timing,
    state: SessionState,
    link: LinkStatus,
    rates: RateSlotMap,
    /// bytes received but not consumed yet
    input: Vec<u8>,
}

impl<T: Transport> PrinterSession<T> {
    pub fn new(transport: T, dialect: Dialect, config: SessionConfig) -> Self {
        let descriptor = dialect.descriptor();
        let timing = config.timing.unwrap_or(descriptor.timing);
        let rates = match descriptor.default_rates {
            Some(rates) => decode_binary_rates(&encode_binary_rates(&rates)),
            None => RateSlotMap::new(),
        };
        PrinterSession {
            transport: Some(transport),
            dialect,
            descriptor,
            config,
            timing,
            state: SessionState::Disconnected,
            link: LinkStatus::default(),
            rates,
            input: Vec::with_capacity(READ_CHUNK),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// link flags of the last DLE/ENQ probe, only maintained for the ESC framed printers
    pub fn link(&self) -> LinkStatus {
        self.link
    }

    /// rate slots read from the device
    pub fn rates(&self) -> &RateSlotMap {
        &self.rates
    }

    /// print a receipt
    ///
    /// # Notes
    ///
    /// When the transaction carries no payments, a cash payment of the total is printed.
    pub fn print(&mut self, transaction: &Transaction) -> Result<()> {
        self.run(Operation::Print, |session| {
            session.validate(transaction)?;
            match session.descriptor.family {
                Family::Esc => session.esc_print(transaction),
                Family::Tab => session.tab_print(transaction),
                Family::Binary => session.binary_print(transaction),
            }
        })
    }

    pub fn print_invoice(&mut self, invoice: &Invoice) -> Result<()> {
        self.run(Operation::PrintInvoice, |session| {
            session.validate(&invoice.transaction)?;
            session.tab_print_invoice(invoice)
        })
    }

    pub fn open_drawer(&mut self) -> Result<()> {
        self.run(Operation::OpenDrawer, |session| {
            match session.descriptor.family {
                Family::Esc => session.esc_open_drawer(),
                Family::Tab => session.tab_open_drawer(),
                Family::Binary => session.binary_open_drawer(),
            }
        })
    }

    pub fn print_daily_report(&mut self) -> Result<()> {
        self.run(Operation::DailyReport, |session| {
            let date = session.report_date();
            match session.descriptor.family {
                Family::Esc => session.esc_daily_report(date),
                Family::Tab => session.tab_daily_report(date),
                Family::Binary => session.binary_daily_report(),
            }
        })
    }

    /// report of the previous month
    pub fn print_monthly_report(&mut self) -> Result<()> {
        self.run(Operation::MonthlyReport, |session| {
            let date = session.report_date();
            session.tab_monthly_report(date)
        })
    }

    /// run one operation and release the transport afterwards
    fn run(
        &mut self,
        operation: Operation,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        if self.transport.is_none() {
            return Err(PrinterError::Transport(String::from(
                "session already released",
            )));
        }
        let descriptor = self.descriptor;
        info!("{} on {} started", operation, descriptor.name);
        let result = descriptor.require(operation).and_then(|()| {
            self.enter(SessionState::Connecting);
            body(self)
        });
        match &result {
            Ok(()) => {
                self.enter(SessionState::Idle);
                info!("{} on {} finished", operation, descriptor.name);
            }
            Err(err) => {
                self.enter(SessionState::Error);
                error!("{} on {} failed ({}): {}", operation, descriptor.name, err.category(), err);
            }
        }
        self.disconnect();
        result
    }

    fn enter(&mut self, state: SessionState) {
        if self.state != state {
            debug!("session {} -> {}", self.state, state);
            self.state = state;
        }
    }

    /// release the transport, only the first call has an effect
    fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            self.input.clear();
            if self.state != SessionState::Error {
                self.enter(SessionState::Disconnected);
            }
        }
    }

    /// reject what no printer could print before the first byte is sent
    fn validate(&self, transaction: &Transaction) -> Result<()> {
        if transaction.lines.is_empty() {
            return Err(PrinterError::Logic(String::from(
                "transaction has no sale lines",
            )));
        }
        for line in &transaction.lines {
            line.validate()?;
            quantity_precision(line.quantity)?;
        }
        // the Elzab printers are not told how a receipt was paid
        if self.descriptor.family != Family::Binary {
            for payment in transaction.settlement() {
                self.descriptor.payment_code(payment.kind)?;
            }
        }
        Ok(())
    }

    /// rate slot of every line, in line order
    fn resolve_slots(&self, lines: &[SaleLine]) -> Result<Vec<u8>> {
        lines
            .iter()
            .map(|line| self.rates.resolve(line.tax))
            .collect()
    }

    fn footer(&self) -> [&str; 3] {
        match &self.config.footer {
            Some([first, second, third]) => [first.as_str(), second.as_str(), third.as_str()],
            None => self.descriptor.footer,
        }
    }

    fn report_date(&self) -> NaiveDate {
        self.config
            .report_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    fn transport(&mut self) -> Result<&mut T> {
        self.transport
            .as_mut()
            .ok_or_else(|| PrinterError::Transport(String::from("session already released")))
    }

    /// send raw bytes, failures are only logged for models whose writes are not checked
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let ignore_errors = self.descriptor.ignore_write_errors;
        match self.transport()?.write_all(data) {
            Ok(()) => Ok(()),
            Err(err) if ignore_errors => {
                warn!("write of {} bytes failed, ignored: {}", data.len(), err);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// append what arrives within `timeout` to the input buffer
    fn fill(&mut self, timeout: Duration) -> Result<usize> {
        let mut buffer = [0u8; READ_CHUNK];
        let read_bytes = self.transport()?.read(&mut buffer, timeout)?;
        self.input.extend_from_slice(&buffer[..read_bytes]);
        Ok(read_bytes)
    }

    /// the next received byte, `None` when nothing arrived within `timeout`
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        if self.input.is_empty() && self.fill(timeout)? == 0 {
            return Ok(None);
        }
        let byte = self.input.remove(0);
        trace!("received {:02X}", byte);
        Ok(Some(byte))
    }

    /// exactly `count` bytes, failing with a timeout when they do not arrive in time
    fn read_exact_bytes(
        &mut self,
        count: usize,
        timeout: Duration,
        waiting_for: &'static str,
    ) -> Result<Vec<u8>> {
        let start_ts = Instant::now();
        while self.input.len() < count {
            let elapsed = start_ts.elapsed();
            if elapsed >= timeout {
                return Err(PrinterError::Timeout {
                    waiting_for,
                    elapsed,
                });
            }
            self.fill(timeout - elapsed)?;
        }
        let bytes: Vec<u8> = self.input.drain(..count).collect();
        debug!("READ FROM SERIAL {} bytes: {:02X?}", bytes.len(), bytes);
        Ok(bytes)
    }

    /// the payload of the next complete frame, bytes after the frame stay buffered
    fn read_frame<C: FrameCodec>(
        &mut self,
        codec: &C,
        timeout: Duration,
        waiting_for: &'static str,
    ) -> Result<Vec<u8>> {
        let start_ts = Instant::now();
        loop {
            if let Some(end) = codec.frame_end(&self.input) {
                let raw: Vec<u8> = self.input.drain(..end).collect();
                debug!("READ FROM SERIAL {} bytes: {:02X?}", raw.len(), raw);
                return codec.decode(&raw);
            }
            let elapsed = start_ts.elapsed();
            if elapsed >= timeout {
                return Err(PrinterError::Timeout {
                    waiting_for,
                    elapsed,
                });
            }
            self.fill(timeout - elapsed)?;
        }
    }

    /// throw away everything received so far
    fn drain_input(&mut self) -> Result<()> {
        if !self.input.is_empty() {
            trace!("discarding {} buffered bytes", self.input.len());
            self.input.clear();
        }
        self.transport()?.discard_input()?;
        Ok(())
    }

    fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            sleep(delay);
        }
    }
}

impl<T: Transport> Drop for PrinterSession<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
