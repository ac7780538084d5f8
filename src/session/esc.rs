//! command flow of the ESC framed printers (Posnet Thermal, Innova, Optimus)

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use super::{PrinterSession, SessionState};
use crate::{
    decoder::{decode_error_status, decode_esc_rates},
    encoder::esc,
    error::{PrinterError, Result},
    frame::{EscFrame, FrameCodec},
    model::Transaction,
    registry::lookup,
    status::{DleFlags, EnqFlags},
    transport::Transport,
};

const DLE: u8 = 0x10;
const ENQ: u8 = 0x05;
const CAN: u8 = 0x18;

impl<T: Transport> PrinterSession<T> {
    /// bring the printer into a known state and find out whether it answers at all
    fn esc_reset(&mut self) -> Result<()> {
        self.enter(SessionState::Resetting);
        let plan = self.descriptor.reset;
        let gap = self.timing.reset_gap;
        if plan.flush_first {
            self.esc_flush()?;
        }
        for _ in 0..plan.leading_cancels {
            self.write(&[CAN])?;
            self.pause(gap);
        }
        for _ in 0..plan.rounds {
            for _ in 0..plan.cancels_per_round {
                self.write(&[CAN])?;
                self.pause(gap);
            }
            self.probe_dle()?;
            self.pause(gap);
            self.probe_enq()?;
            self.pause(gap);
        }
        if !plan.flush_first {
            self.esc_flush()?;
        }
        info!("{} link status: {}", self.descriptor.name, self.link);
        Ok(())
    }

    fn esc_flush(&mut self) -> Result<()> {
        self.pause(self.timing.flush_settle);
        self.drain_input()
    }

    /// DLE probe, the only way to learn whether the printer is attached
    fn probe_dle(&mut self) -> Result<()> {
        self.write(&[DLE])?;
        match self.read_byte(self.timing.probe)? {
            Some(reply) => {
                self.link.connected = true;
                self.link.dle = DleFlags::from_byte(reply);
                if self.link.dle.paper_empty {
                    warn!("printer reports paper empty");
                }
                if self.link.dle.controller_error {
                    warn!("printer reports a mechanism or controller error");
                }
            }
            None => {
                if self.link.connected {
                    warn!("no reply to DLE, printer lost");
                }
                self.link.connected = false;
            }
        }
        Ok(())
    }

    fn probe_enq(&mut self) -> Result<()> {
        if !self.link.connected {
            return Ok(());
        }
        self.write(&[ENQ])?;
        if let Some(reply) = self.read_byte(self.timing.probe)? {
            self.link.enq = EnqFlags::from_byte(reply);
        }
        Ok(())
    }

    /// send one command and check the error status the printer answers with
    ///
    /// # Notes
    ///
    /// Without a link the command is skipped, the next status check reports the missing printer.
    fn esc_command(&mut self, name: &'static str, payload: &[u8], timeout: Duration) -> Result<()> {
        if !self.link.connected {
            warn!("{} skipped, printer not connected", name);
            return Ok(());
        }
        self.write(&EscFrame.encode(payload))?;
        self.esc_check_status(name, timeout)?;
        self.probe_dle()?;
        self.probe_enq()
    }

    /// read the error status frame (`LBERSTS`) and turn a non zero code into an error
    fn esc_check_status(&mut self, name: &'static str, timeout: Duration) -> Result<()> {
        let reply = self.read_frame(&EscFrame, timeout, "error status")?;
        let code = decode_error_status(&reply, self.descriptor.strip_status_control)?;
        if code != 0 {
            let entry = lookup(self.descriptor.errors, code);
            error!("{} rejected with {}: {}", name, code, entry.text);
            return Err(entry.to_error(name, code));
        }
        debug!("{} accepted", name);
        Ok(())
    }

    /// switch on error reporting, the first command that needs a live link
    fn esc_error_mode(&mut self) -> Result<()> {
        if !self.link.connected {
            return Err(PrinterError::no_communication());
        }
        self.esc_command("LBSERM", &esc::error_mode(), self.timing.command)
    }

    /// reset and error mode, shared by every operation
    fn esc_prepare(&mut self) -> Result<()> {
        self.esc_reset()?;
        self.esc_error_mode()
    }

    /// ask for the fiscal status and keep the rate table it carries
    fn esc_query_rates(&mut self) -> Result<()> {
        self.enter(SessionState::QueryingCapabilities);
        if !self.link.connected {
            return Err(PrinterError::no_communication());
        }
        self.write(&EscFrame.encode_unchecked(&esc::status_request()))?;
        let reply = self.read_frame(&EscFrame, self.timing.command, "fiscal status")?;
        self.rates = decode_esc_rates(&reply)?;
        debug!("{} rate slots defined", self.rates.len());
        if self.descriptor.status_after_rates {
            self.esc_check_status("LBFSTRQ", self.timing.command)?;
        }
        self.probe_dle()?;
        self.probe_enq()
    }

    pub(super) fn esc_print(&mut self, transaction: &Transaction) -> Result<()> {
        self.esc_prepare()?;
        if self.link.enq.in_transaction {
            info!("cancelling the transaction left open");
            self.esc_command("LBTREXITCAN", &esc::cancel_transaction(), self.timing.command)?;
            self.drain_input()?;
        }
        self.esc_query_rates()?;
        self.enter(SessionState::Idle);

        // every line must have a slot before the receipt is opened
        let slots = self.resolve_slots(&transaction.lines)?;
        let settlement = transaction.settlement();
        let close = esc::close(self.descriptor, transaction, &settlement, self.footer())?;

        self.enter(SessionState::TransactionOpen);
        self.esc_command("LBTRSHDR", &esc::open_transaction(), self.timing.command)?;
        for (index, (line, slot)) in transaction.lines.iter().zip(slots).enumerate() {
            self.enter(SessionState::SendingLine);
            let payload = esc::line(self.descriptor, index + 1, line, slot)?;
            self.esc_command("LBTRSLN", &payload, self.timing.line)?;
        }
        self.enter(SessionState::Closing);
        self.esc_command("LBTRXEND", &close, self.timing.close)?;

        self.pause(self.timing.settle_before_drawer);
        self.enter(SessionState::DrawerOpening);
        self.esc_command("LBDSP", &esc::drawer(), self.timing.command)
    }

    pub(super) fn esc_open_drawer(&mut self) -> Result<()> {
        self.esc_prepare()?;
        self.enter(SessionState::DrawerOpening);
        self.esc_command("LBDSP", &esc::drawer(), self.timing.command)
    }

    pub(super) fn esc_daily_report(&mut self, date: NaiveDate) -> Result<()> {
        self.esc_prepare()?;
        self.enter(SessionState::Idle);
        info!("daily report for {}", date);
        self.esc_command("LBFSKREP", &esc::daily_report(date), self.timing.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dialect::Dialect,
        error::ErrorCategory,
        model::{SaleLine, TaxCategory},
        session::{SessionConfig, testing::fast_config},
        transport::testing::ScriptedTransport,
    };

    const RATES: &[u8] =
        b"1;0;0;0;0;0;0;0;0;0;0;0;0;1;26;10;18/23.00/08.00/00.00/101.00/101.00/100.00/101.00/0.00/";

    /// an ESC framed printer answering every command
    ///
    /// * `enq` - reply to the ENQ probe
    /// * `status_after_rates` - follow the rate reply with an error status
    /// * `fault` - payload fragment and error code to reject it with
    fn esc_device(
        enq: u8,
        status_after_rates: bool,
        fault: Option<(&'static str, &'static str)>,
    ) -> impl FnMut(&[u8]) -> Vec<u8> {
        move |data| match data {
            [DLE] => vec![0x74],
            [ENQ] => vec![enq],
            [CAN] => Vec::new(),
            frame => {
                let payload = EscFrame.decode(frame).unwrap_or_default();
                let text = String::from_utf8_lossy(&payload).into_owned();
                if text == "23#s" {
                    let mut reply = EscFrame.encode_unchecked(RATES);
                    if status_after_rates {
                        reply.extend(EscFrame.encode_unchecked(b"0#Z"));
                    }
                    return reply;
                }
                let code = match fault {
                    Some((needle, code)) if text.contains(needle) => code,
                    _ => "0",
                };
                EscFrame.encode_unchecked(format!("{}#Z", code).as_bytes())
            }
        }
    }

    fn receipt() -> Transaction {
        let mut transaction = Transaction::new("R-k 0123456789", "XX99", "Bartek Prokop");
        transaction.add_line(SaleLine::new(
            "Test drukarki",
            1.0,
            0.01,
            TaxCategory::Vat23,
        ));
        transaction
    }

    /// payloads of all framed writes, in order
    fn payloads(writes: &[Vec<u8>]) -> Vec<String> {
        writes
            .iter()
            .filter(|write| write.len() > 1)
            .map(|write| {
                let payload = EscFrame.decode(write).unwrap_or_default();
                String::from_utf8_lossy(&payload).into_owned()
            })
            .collect()
    }

    fn position(payloads: &[String], needle: &str) -> usize {
        payloads
            .iter()
            .position(|p| p.contains(needle))
            .unwrap_or(usize::MAX)
    }

    #[test]
    fn test_thermal_receipt() -> Result<()> {
        let (transport, spy) = ScriptedTransport::new(esc_device(0x08, true, None));
        let mut session = PrinterSession::new(transport, Dialect::PosnetThermal301, fast_config());
        session.print(&receipt())?;
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.link().connected);
        assert_eq!(session.rates().get(TaxCategory::Vat23), Some(0));

        let spy = spy.borrow();
        let sent = payloads(&spy.writes);
        assert_eq!(
            sent,
            vec![
                "3#e",
                "23#s",
                "0$h",
                "1;0$lTest drukarki\r1\rA/0.01/0.01/0.00/",
                "3;0;1;0;0;0;0;1;0;0;1;$yXX99\rBartek Prokop\r#R-k 0123456789#\r\
                 Serwer wydruku fiskalnego wersja 2.0\r(c)2014 http://fps.bart.prokop.name/\r\
                 Sterownik: PosnetThermal 3.01\r0.01/0.01/0/0.01/0/",
                "1$d",
            ]
        );
        // 7 reset rounds of two cancels each
        assert_eq!(spy.writes.iter().filter(|w| w.as_slice() == [CAN]).count(), 14);
        assert_eq!(spy.closes, 1);
        Ok(())
    }

    #[test]
    fn test_open_transaction_is_cancelled() -> Result<()> {
        let (transport, spy) = ScriptedTransport::new(esc_device(0x0A, true, None));
        let mut session = PrinterSession::new(transport, Dialect::PosnetThermal203, fast_config());
        session.open_drawer()?;
        // drawer only, nothing was open for the drawer kick to cancel
        assert_eq!(spy.borrow().count(b"0$e"), 0);

        let (transport, spy) = ScriptedTransport::new(esc_device(0x0A, true, None));
        let mut session = PrinterSession::new(transport, Dialect::PosnetThermal203, fast_config());
        session.print(&receipt())?;
        let sent = payloads(&spy.borrow().writes);
        assert!(position(&sent, "3#e") < position(&sent, "0$e"));
        assert!(position(&sent, "0$e") < position(&sent, "23#s"));
        Ok(())
    }

    #[test]
    fn test_optimus_without_trailing_status() -> Result<()> {
        let (transport, spy) = ScriptedTransport::new(esc_device(0x08, false, None));
        let mut session = PrinterSession::new(transport, Dialect::OptimusVivo, fast_config());
        session.print(&receipt())?;
        let sent = payloads(&spy.borrow().writes);
        assert!(sent.iter().any(|p| p.contains("$y")));
        assert_eq!(sent.last().map(String::as_str), Some("1$d"));
        Ok(())
    }

    #[test]
    fn test_innova_fixed_close() -> Result<()> {
        let (transport, spy) = ScriptedTransport::new(esc_device(0x08, true, None));
        let mut session = PrinterSession::new(transport, Dialect::InnovaProfit451, fast_config());
        session.print(&receipt())?;
        let sent = payloads(&spy.borrow().writes);
        assert!(sent.contains(&String::from("1$lTest drukarki\r1\rA/0.01/0.01/")));
        assert!(sent.iter().any(|p| p.starts_with("3;0;0;0;1;0;0;0;0;0;0$x")));
        // five leading cancels and no cancels in the rounds
        assert_eq!(
            spy.borrow().writes.iter().filter(|w| w.as_slice() == [CAN]).count(),
            5
        );
        Ok(())
    }

    #[test]
    fn test_missing_tax_rate_prints_nothing() {
        let (transport, spy) = ScriptedTransport::new(esc_device(0x08, true, None));
        let mut session = PrinterSession::new(transport, Dialect::PosnetThermal301, fast_config());
        let mut transaction = receipt();
        transaction.add_line(SaleLine::new("Ser", 1.0, 5.0, TaxCategory::Vat05));
        let err = session.print(&transaction).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Logic);
        assert_eq!(session.state(), SessionState::Error);
        let spy = spy.borrow();
        assert_eq!(spy.count(b"$l"), 0);
        assert_eq!(spy.count(b"0$h"), 0);
        assert_eq!(spy.closes, 1);
    }

    #[test]
    fn test_rejected_line() {
        let (transport, spy) =
            ScriptedTransport::new(esc_device(0x08, true, Some(("$l", "19"))));
        let mut session = PrinterSession::new(transport, Dialect::PosnetThermal301, fast_config());
        let err = session.print(&receipt()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "device reported error 19 in LBTRSLN: price field error"
        );
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(spy.borrow().count(b"$y"), 0);
    }

    #[test]
    fn test_printer_not_connected() {
        let (transport, spy) = ScriptedTransport::silent();
        let mut session = PrinterSession::new(transport, Dialect::PosnetThermal301, fast_config());
        let err = session.print(&receipt()).unwrap_err();
        assert_eq!(err.to_string(), "transport error: no communication with device");
        assert!(!session.link().connected);
        let spy = spy.borrow();
        assert_eq!(spy.count(b"3#e"), 0);
        // every round probes DLE, ENQ is only sent to a connected printer
        assert_eq!(spy.writes.iter().filter(|w| w.as_slice() == [DLE]).count(), 7);
        assert_eq!(spy.writes.iter().filter(|w| w.as_slice() == [ENQ]).count(), 0);
        assert_eq!(spy.closes, 1);
    }

    #[test]
    fn test_write_errors_are_ignored() {
        let (transport, spy) = ScriptedTransport::new(esc_device(0x08, true, None));
        let mut session = PrinterSession::new(
            transport.with_failing_writes(),
            Dialect::PosnetThermal301,
            fast_config(),
        );
        // the failed writes surface as a missing printer, not as an I/O error
        let err = session.open_drawer().unwrap_err();
        assert_eq!(err.to_string(), "transport error: no communication with device");
        assert!(!spy.borrow().writes.is_empty());
    }

    #[test]
    fn test_missing_status_reply() {
        let (transport, _spy) = ScriptedTransport::new(|data: &[u8]| match data {
            [DLE] => vec![0x74],
            [ENQ] => vec![0x08],
            _ => Vec::new(),
        });
        let mut session = PrinterSession::new(transport, Dialect::PosnetThermal301, fast_config());
        let err = session.open_drawer().unwrap_err();
        assert!(matches!(
            err,
            PrinterError::Timeout {
                waiting_for: "error status",
                ..
            }
        ));
    }

    #[test]
    fn test_daily_report() -> Result<()> {
        let (transport, spy) = ScriptedTransport::new(esc_device(0x08, true, None));
        let config = SessionConfig {
            report_date: NaiveDate::from_ymd_opt(2026, 3, 7),
            ..fast_config()
        };
        let mut session = PrinterSession::new(transport, Dialect::PosnetThermal301, config);
        session.print_daily_report()?;
        let sent = payloads(&spy.borrow().writes);
        assert_eq!(sent, vec!["3#e", "1;26;3;7#r"]);
        Ok(())
    }
}
