//! receipt-print: print an image file on an ESC/POS network printer
//!
//! Configuration comes from `PRINTER_*` variables (a `.env` file is loaded
//! first), then command line flags.

mod cli;
mod logger;

use clap::Parser;
use receipt_printer::PrinterConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let args = cli::Args::parse();
    logger::init_logger(args.log_level.as_deref(), args.log_dir.as_deref());

    let config = PrinterConfig::from_env();
    tracing::info!("Starting receipt-print v{}", env!("CARGO_PKG_VERSION"));

    cli::run(&args, config).await
}
