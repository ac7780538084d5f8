extern crate fiscal_printer;

use anyhow::Result;
use fiscal_printer::{
    Dialect, Discount, FiscalPrinter, PaymentKind, SaleLine, TaxCategory, Transaction,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // console output
    let console_layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_filter(EnvFilter::from_default_env());

    tracing_subscriber::registry().with(console_layer).init();

    // usage: print_receipt [port] [model]
    let mut args = std::env::args().skip(1);
    let serial_port = args.next().unwrap_or_else(|| String::from("/dev/ttyUSB0"));
    let dialect: Dialect = args.next().as_deref().unwrap_or("thermal301").parse()?;
    info!("using port {} with {}", serial_port, dialect);

    let mut transaction = Transaction::new("R-k 0123456789", "XX99", "Bartek Prokop");
    transaction.add_line(SaleLine::new("Test drukarki", 1.0, 0.01, TaxCategory::Vat23));
    transaction.add_line(
        SaleLine::new("Kawa", 2.0, 7.5, TaxCategory::Vat08).with_discount(Discount::RateOff(0.1)),
    );
    transaction.add_payment(PaymentKind::CreditCard, 10.0, Some("VISA"));
    transaction.add_payment(PaymentKind::Cash, 3.51, None);

    let printer = FiscalPrinter::new(&serial_port, dialect);
    printer.print(&transaction)?;
    println!("printed receipt {} for {:.2}", transaction.reference, transaction.total());

    Ok(())
}
