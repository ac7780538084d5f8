//! command flow of the Posnet 1.01 protocol

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, error, info};

use super::{PrinterSession, SessionState};
use crate::{
    decoder::{TabResponse, decode_tab_rates},
    encoder::tab::{self, TabCommand},
    error::{PrinterError, Result},
    frame::{FrameCodec, StxFrame},
    model::{Invoice, Transaction},
    status::{DeviceState, MechanismState},
    transport::Transport,
};

/// numeric state field of a status reply
fn state_code(response: &TabResponse, key: &str) -> Result<u32> {
    let value = response.require(key)?;
    value
        .parse::<u32>()
        .map_err(|_| PrinterError::UnexpectedResponse {
            command: String::from(response.command()),
            response: format!("field \"{}\" is not a number: {}", key, value),
        })
}

impl<T: Transport> PrinterSession<T> {
    /// send a command and wait for the reply frame
    fn tab_send(&mut self, command: &TabCommand, timeout: Duration) -> Result<TabResponse> {
        let code_page = self.descriptor.code_page;
        self.write(&StxFrame.encode(&command.encode(code_page)))?;
        let reply = self.read_frame(&StxFrame, timeout, "STX reply")?;
        TabResponse::parse(&reply, code_page)
    }

    fn tab_cancel(&mut self) -> Result<()> {
        self.tab_send(&tab::cancel(), self.timing.command)?;
        Ok(())
    }

    /// check device, mechanism and header state before anything is printed
    fn tab_check_ready(&mut self) -> Result<()> {
        let command = self.timing.command;
        let identity = self.tab_send(&tab::identify(), command)?;
        info!(
            "connected to {} release {}",
            identity.get("nm").unwrap_or("unknown device"),
            identity.get("vr").unwrap_or("?")
        );

        let device = self.tab_send(&tab::device_status(), command)?;
        let state = DeviceState::from_code(state_code(&device, "ds")?);
        if let Err(err) = state.check() {
            error!("device not ready: {}", state);
            return Err(err);
        }

        let printer = self.tab_send(&tab::printer_status(), command)?;
        let state = MechanismState::from_code(state_code(&printer, "pr")?);
        if let Err(err) = state.check() {
            error!("printing mechanism not ready: {}", state);
            return Err(err);
        }

        let common = self.tab_send(&tab::common_status(), command)?;
        debug!("unique number {}", common.get("nu").unwrap_or("unknown"));
        if !common.require_bool("hr")? {
            return Err(PrinterError::DeviceFault(String::from(
                "header is not programmed",
            )));
        }
        if common.require("ts")? != "0" {
            return Err(PrinterError::DeviceFault(String::from(
                "previous transaction is not finished",
            )));
        }
        Ok(())
    }

    /// read the rate table and log the counters
    fn tab_query_rates(&mut self) -> Result<()> {
        self.enter(SessionState::QueryingCapabilities);
        let command = self.timing.command;
        let rates = self.tab_send(&tab::rates(), command)?;
        self.rates = decode_tab_rates(&rates);
        debug!("{} rate slots defined", self.rates.len());
        for query in tab::counters() {
            let reply = self.tab_send(&query, command)?;
            let mut fields: Vec<String> = reply
                .fields()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            fields.sort();
            debug!("{}: {}", query.name(), fields.join(" "));
        }
        Ok(())
    }

    /// everything up to the open command, shared by receipts and invoices
    fn tab_prepare(&mut self, transaction: &Transaction) -> Result<Vec<u8>> {
        self.tab_cancel()?;
        self.tab_check_ready()?;
        self.tab_query_rates()?;
        self.enter(SessionState::Idle);
        let slots = self.resolve_slots(&transaction.lines)?;
        let footer = tab::footer_config(transaction, self.footer());
        self.tab_send(&footer, self.timing.command)?;
        Ok(slots)
    }

    fn tab_lines(&mut self, transaction: &Transaction, slots: &[u8]) -> Result<()> {
        for (line, slot) in transaction.lines.iter().zip(slots) {
            self.enter(SessionState::SendingLine);
            self.tab_send(&tab::line(line, *slot)?, self.timing.line)?;
        }
        Ok(())
    }

    pub(super) fn tab_print(&mut self, transaction: &Transaction) -> Result<()> {
        let slots = self.tab_prepare(transaction)?;
        self.enter(SessionState::TransactionOpen);
        self.tab_send(&tab::open(), self.timing.command)?;
        self.tab_lines(transaction, &slots)?;

        let settlement = transaction.settlement();
        for payment in &settlement {
            self.enter(SessionState::SendingPayment);
            let command = tab::payment(self.descriptor, payment)?;
            self.tab_send(&command, self.timing.command)?;
        }
        self.enter(SessionState::Closing);
        let close = tab::close(transaction.total_minor(), !settlement.is_empty());
        self.tab_send(&close, self.timing.close)?;

        self.enter(SessionState::DrawerOpening);
        self.tab_send(&tab::drawer(), self.timing.command)?;
        Ok(())
    }

    pub(super) fn tab_print_invoice(&mut self, invoice: &Invoice) -> Result<()> {
        let transaction = &invoice.transaction;
        let slots = self.tab_prepare(transaction)?;
        self.enter(SessionState::TransactionOpen);
        self.tab_send(&tab::open_invoice(invoice), self.timing.command)?;
        self.tab_lines(transaction, &slots)?;
        self.enter(SessionState::Closing);
        info!("waiting for the invoice to be confirmed on the device");
        let close = tab::close(transaction.total_minor(), false);
        self.tab_send(&close, self.timing.invoice_close)?;
        Ok(())
    }

    pub(super) fn tab_open_drawer(&mut self) -> Result<()> {
        self.enter(SessionState::DrawerOpening);
        let command = tab::drawer();
        let reply = self.tab_send(&command, self.timing.command)?;
        reply.expect_command(command.name())
    }

    pub(super) fn tab_daily_report(&mut self, date: NaiveDate) -> Result<()> {
        self.tab_cancel()?;
        info!("daily report for {}", date);
        let command = tab::daily_report(date);
        let reply = self.tab_send(&command, self.timing.close)?;
        reply.expect_command(command.name())
    }

    pub(super) fn tab_monthly_report(&mut self, date: NaiveDate) -> Result<()> {
        let command = tab::monthly_report(date)?;
        self.tab_cancel()?;
        info!("monthly report for the month before {}", date);
        let reply = self.tab_send(&command, self.timing.close)?;
        reply.expect_command(command.name())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::{
        dialect::Dialect,
        error::ErrorCategory,
        model::{PaymentKind, SaleLine, TaxCategory},
        session::{SessionConfig, testing::fast_config},
        transcode::CodePage,
        transport::testing::ScriptedTransport,
    };

    /// a Posnet 1.01 printer, `replies` overrides the answer to single commands
    fn tab_device(
        replies: &'static [(&'static str, &'static str)],
        corrupt: Option<&'static str>,
    ) -> impl FnMut(&[u8]) -> Vec<u8> {
        move |data| {
            let payload = StxFrame.decode(data).unwrap_or_default();
            let text = CodePage::Windows1250.decode(&payload);
            let command = text.split('\t').next().unwrap_or("").to_string();
            let reply = match replies.iter().find(|(name, _)| *name == command) {
                Some((_, reply)) => String::from(*reply),
                None => match command.as_str() {
                    "sid" => String::from("sid\tnmPosnet Thermal HS\tvr1.01\t"),
                    "sdev" => String::from("sdev\tds0\t"),
                    "sprn" => String::from("sprn\tpr0\t"),
                    "scomm" => String::from("scomm\tnuABC12345678\thr1\tts0\t"),
                    "vatget" => String::from("vatget\tva23,00\tvb8,00\tvc5,00\tvd0,00\tve100,00\t"),
                    other => format!("{}\t", other),
                },
            };
            let mut frame = StxFrame.encode(&CodePage::Windows1250.encode(&reply));
            if corrupt == Some(command.as_str()) {
                let crc = frame.len() - 2;
                frame[crc] = if frame[crc] == b'0' { b'1' } else { b'0' };
            }
            frame
        }
    }

    fn sent_commands(writes: &[Vec<u8>]) -> Vec<String> {
        writes
            .iter()
            .map(|write| {
                let payload = StxFrame.decode(write).unwrap_or_default();
                CodePage::Windows1250.decode(&payload)
            })
            .collect()
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

    #[test]
    fn test_receipt() -> Result<()> {
        let (transport, spy) = ScriptedTransport::new(tab_device(&[], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        session.print(&receipt())?;
        assert_eq!(session.state(), SessionState::Idle);

        let sent = sent_commands(&spy.borrow().writes);
        let names: Vec<&str> = sent
            .iter()
            .map(|s| s.split('\t').next().unwrap_or(""))
            .collect();
        assert_eq!(
            names,
            vec![
                "prncancel", "sid", "sdev", "sprn", "scomm", "vatget", "strns", "sfsk", "stot",
                "scnt", "ftrcfg", "trinit", "trline", "trpayment", "trend", "opendrwr",
            ]
        );
        assert!(sent.contains(&String::from("trline\tnaTest drukarki\tvt0\tpr1\til1\t")));
        assert!(sent.contains(&String::from("trpayment\tty0\twa1\t")));
        assert!(sent.contains(&String::from("trend\tto1\tfp1\t")));
        assert_eq!(spy.borrow().closes, 1);
        Ok(())
    }

    #[test]
    fn test_corrupted_reply() {
        let (transport, spy) = ScriptedTransport::new(tab_device(&[], Some("sid")));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        let err = session.print(&receipt()).unwrap_err();
        assert!(matches!(err, PrinterError::Checksum { .. }));
        assert_eq!(session.state(), SessionState::Error);
        let spy = spy.borrow();
        // nothing is sent after the corrupted reply
        assert_eq!(spy.writes.len(), 2);
        assert_eq!(spy.closes, 1);
    }

    #[test]
    fn test_paper_out() {
        let (transport, spy) =
            ScriptedTransport::new(tab_device(&[("sprn", "sprn\tpr4\t")], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        let err = session.print(&receipt()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Device);
        assert_eq!(err.to_string(), "device fault: no paper, copy");
        assert_eq!(spy.borrow().count(b"trinit"), 0);
    }

    #[test]
    fn test_missing_header() {
        let (transport, _spy) =
            ScriptedTransport::new(tab_device(&[("scomm", "scomm\tnu1\thr0\tts0\t")], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        let err = session.print(&receipt()).unwrap_err();
        assert_eq!(err.to_string(), "device fault: header is not programmed");
    }

    #[test]
    fn test_unfinished_transaction() {
        let (transport, _spy) =
            ScriptedTransport::new(tab_device(&[("scomm", "scomm\tnu1\thr1\tts2\t")], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        let err = session.print(&receipt()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Device);
    }

    #[test]
    fn test_silent_printer() {
        let (transport, spy) = ScriptedTransport::silent();
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        let start_ts = Instant::now();
        let err = session.print(&receipt()).unwrap_err();
        assert!(matches!(err, PrinterError::Timeout { .. }));
        assert!(start_ts.elapsed() >= Duration::from_millis(50));
        assert_eq!(spy.borrow().writes.len(), 1);
        assert_eq!(session.state(), SessionState::Error);
    }

    #[test]
    fn test_rejected_line() {
        let (transport, spy) =
            ScriptedTransport::new(tab_device(&[("trline", "trline?2006\t")], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        let err = session.print(&receipt()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "device reported error 2006 in trline: price field error (price <= 0)"
        );
        assert_eq!(spy.borrow().count(b"trend"), 0);
    }

    #[test]
    fn test_missing_tax_rate() {
        let (transport, spy) = ScriptedTransport::new(tab_device(&[], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        let mut transaction = receipt();
        transaction.add_line(SaleLine::new("Kawa", 1.0, 5.0, TaxCategory::Vat22));
        let err = session.print(&transaction).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Logic);
        assert_eq!(spy.borrow().count(b"trinit"), 0);
        assert_eq!(spy.borrow().count(b"trline"), 0);
    }

    #[test]
    fn test_payments() -> Result<()> {
        let (transport, spy) = ScriptedTransport::new(tab_device(&[], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        let mut transaction = receipt();
        transaction.add_line(SaleLine::new("Kawa", 2.0, 5.0, TaxCategory::Vat08));
        transaction.add_payment(PaymentKind::CreditCard, 5.0, Some("VISA"));
        transaction.add_payment(PaymentKind::Cash, 5.01, None);
        session.print(&transaction)?;
        let sent = sent_commands(&spy.borrow().writes);
        assert!(sent.contains(&String::from("trline\tnaKawa\tvt1\tpr500\til2\t")));
        assert!(sent.contains(&String::from("trpayment\tty2\twa500\tnaVISA\t")));
        assert!(sent.contains(&String::from("trpayment\tty0\twa501\t")));
        assert!(sent.contains(&String::from("trend\tto1001\tfp1001\t")));
        Ok(())
    }

    #[test]
    fn test_invoice() -> Result<()> {
        let (transport, spy) = ScriptedTransport::new(tab_device(&[], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        let invoice = Invoice {
            transaction: receipt(),
            nip: String::from("5260250274"),
            header: String::from("Firma"),
            payment_due: String::from("2026-11-01"),
            payment_type: String::from("przelew"),
        };
        session.print_invoice(&invoice)?;
        let sent = sent_commands(&spy.borrow().writes);
        assert!(sent.iter().any(|s| s.starts_with("trfvinit\t")));
        assert_eq!(sent.last().map(String::as_str), Some("trend\tto1\t"));
        assert_eq!(spy.borrow().count(b"trinit"), 0);
        assert_eq!(spy.borrow().count(b"trpayment"), 0);
        Ok(())
    }

    #[test]
    fn test_drawer() -> Result<()> {
        let (transport, spy) = ScriptedTransport::new(tab_device(&[], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        session.open_drawer()?;
        assert_eq!(sent_commands(&spy.borrow().writes), vec!["opendrwr\t"]);

        let (transport, _spy) =
            ScriptedTransport::new(tab_device(&[("opendrwr", "prncancel\t")], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, fast_config());
        let err = session.open_drawer().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Protocol);
        Ok(())
    }

    #[test]
    fn test_reports() -> Result<()> {
        let config = SessionConfig {
            report_date: NaiveDate::from_ymd_opt(2026, 3, 31),
            ..fast_config()
        };
        let (transport, spy) = ScriptedTransport::new(tab_device(&[], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, config.clone());
        session.print_daily_report()?;
        assert_eq!(
            sent_commands(&spy.borrow().writes),
            vec!["prncancel\t", "dailyrep\tda2026-03-31\t"]
        );

        let (transport, spy) = ScriptedTransport::new(tab_device(&[], None));
        let mut session = PrinterSession::new(transport, Dialect::Posnet101, config);
        session.print_monthly_report()?;
        assert_eq!(
            sent_commands(&spy.borrow().writes),
            vec!["prncancel\t", "monthlyrep\tda2026-02-28\t"]
        );
        Ok(())
    }
}
