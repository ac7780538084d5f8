extern crate fiscal_printer;

use anyhow::Result;
use fiscal_printer::{Dialect, FiscalPrinter};
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // console output
    let console_layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_filter(EnvFilter::from_default_env());

    tracing_subscriber::registry().with(console_layer).init();

    // usage: daily_report [port] [model]
    let mut args = std::env::args().skip(1);
    let serial_port = args.next().unwrap_or_else(|| String::from("/dev/ttyUSB0"));
    let dialect: Dialect = args.next().as_deref().unwrap_or("posnet101").parse()?;
    info!("using port {} with {}", serial_port, dialect);

    let printer = FiscalPrinter::new(&serial_port, dialect);
    printer.print_daily_report()?;
    println!("daily report printed");
    if dialect.descriptor().supports(fiscal_printer::dialect::Operation::MonthlyReport) {
        printer.print_monthly_report()?;
        println!("monthly report printed");
    }

    Ok(())
}
