//! command flow of the Elzab printers

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{PrinterSession, SessionState};
use crate::{
    decoder::{decode_ack, decode_binary_rates},
    encoder::binary::{self, ExtraLine},
    error::{PrinterError, Result},
    model::Transaction,
    status::{ElzabStatus, Readiness},
    transport::Transport,
};

impl<T: Transport> PrinterSession<T> {
    /// send a command acknowledged with a single byte
    fn binary_command(&mut self, command: &[u8], timeout: Duration) -> Result<()> {
        self.write(command)?;
        match self.read_byte(timeout)? {
            Some(reply) => decode_ack(reply, command),
            None => Err(PrinterError::Timeout {
                waiting_for: "ACK",
                elapsed: timeout,
            }),
        }
    }

    fn binary_status(&mut self) -> Result<ElzabStatus> {
        let timeout = self.timing.command;
        let mut bytes = [0u8; 5];
        for (byte, probe) in bytes.iter_mut().zip(binary::status_probes()) {
            self.binary_command(&probe, timeout)?;
            *byte = self.read_byte(timeout)?.ok_or(PrinterError::Timeout {
                waiting_for: "status byte",
                elapsed: timeout,
            })?;
        }
        let status = ElzabStatus::new(bytes);
        for condition in status.conditions() {
            warn!("printer status: {}", condition);
        }
        Ok(status)
    }

    /// poll the status until a receipt can be started
    fn binary_wait_ready(&mut self) -> Result<()> {
        let attempts = self.config.ready_retries.max(1);
        for attempt in 1..=attempts {
            match self.binary_status()?.readiness()? {
                Readiness::Ready => return Ok(()),
                Readiness::NotReady => debug!("printer busy ({}/{})", attempt, attempts),
                Readiness::Resume => {
                    info!("resuming the document stopped for lack of paper");
                    self.binary_command(&binary::resume(), self.timing.command)?;
                }
            }
            if attempt < attempts {
                self.pause(self.timing.ready_retry);
            }
        }
        Err(PrinterError::DeviceFault(format!(
            "printer not ready after {} status checks",
            attempts
        )))
    }

    fn binary_query_rates(&mut self) -> Result<()> {
        self.enter(SessionState::QueryingCapabilities);
        let timeout = self.timing.command;
        self.binary_command(&binary::rates_query(), timeout)?;
        let reply = self.read_exact_bytes(14, timeout, "rate table")?;
        let mut table = [0u8; 14];
        table.copy_from_slice(&reply);
        self.rates = decode_binary_rates(&table);
        debug!("{} rate slots defined", self.rates.len());
        Ok(())
    }

    /// print a receipt, payments are not transmitted to these printers
    pub(super) fn binary_print(&mut self, transaction: &Transaction) -> Result<()> {
        self.binary_wait_ready()?;
        self.binary_query_rates()?;
        self.enter(SessionState::Idle);
        let slots = self.resolve_slots(&transaction.lines)?;
        let code_page = self.descriptor.code_page;

        self.enter(SessionState::TransactionOpen);
        self.binary_command(&binary::open(), self.timing.command)?;
        for (line, slot) in transaction.lines.iter().zip(slots) {
            self.enter(SessionState::SendingLine);
            self.write(&binary::line(line, slot, code_page)?)?;
            if let Some(discount) = binary::discount(line)? {
                self.write(&discount)?;
            }
        }

        self.enter(SessionState::Closing);
        self.write(&binary::end_of_items(transaction.total_minor())?)?;
        self.write(&binary::extra_line(
            ExtraLine::Reference,
            &transaction.reference,
            code_page,
        ))?;
        self.write(&binary::extra_line(
            ExtraLine::Cashier,
            &transaction.cashier,
            code_page,
        ))?;
        self.binary_command(&binary::close(), self.timing.close)
    }

    pub(super) fn binary_open_drawer(&mut self) -> Result<()> {
        self.enter(SessionState::DrawerOpening);
        self.binary_command(&binary::drawer(), self.timing.command)
    }

    pub(super) fn binary_daily_report(&mut self) -> Result<()> {
        self.binary_command(&binary::daily_report(), self.timing.close)
    }
}
