//! Command line interface
//!
//! Flags override the `PRINTER_*` environment (and `.env`) configuration.

use anyhow::{Context, bail};
use clap::Parser;
use receipt_printer::imaging::{load_image, prepare_for_print};
use receipt_printer::{Encoding, PrinterConfig, render_job, run_job};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "receipt-print", version, about = "Print an image on an ESC/POS network printer")]
pub struct Args {
    /// Image file to print
    pub image: PathBuf,

    /// Printer host (overrides PRINTER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Printer port (overrides PRINTER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Print head width in dots (overrides PRINTER_DOT_WIDTH)
    #[arg(long)]
    pub width: Option<u32>,

    /// Image command: raster or strip (overrides PRINTER_ENCODING)
    #[arg(long)]
    pub encoding: Option<Encoding>,

    /// Do not cut the paper after printing
    #[arg(long)]
    pub no_cut: bool,

    /// Write the command stream to this file instead of printing
    #[arg(long, value_name = "FILE")]
    pub dry_run: Option<PathBuf>,

    /// Log level for this tool and the printer library
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Directory for daily rolling log files
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    /// Apply flag overrides on top of a loaded config
    pub fn apply(&self, mut config: PrinterConfig) -> PrinterConfig {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(width) = self.width {
            config.dot_width = width;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if self.no_cut {
            config.cut = false;
        }
        config
    }
}

/// Load, prepare and print (or dump) one image
pub async fn run(args: &Args, config: PrinterConfig) -> anyhow::Result<()> {
    let config = args.apply(config);
    if config.dot_width == 0 {
        bail!("dot width must be greater than 0");
    }

    let img = load_image(&args.image)?;
    let prepared = prepare_for_print(&img, config.dot_width)?;

    if let Some(out) = &args.dry_run {
        let command = render_job(&prepared, config.encoding, config.cut)?;
        std::fs::write(out, command.as_bytes())
            .with_context(|| format!("writing {}", out.display()))?;
        tracing::info!(
            path = %out.display(),
            bytes = command.len(),
            "Command stream written"
        );
        return Ok(());
    }

    let report = run_job(&config, &prepared)
        .await
        .with_context(|| format!("printing to {}", config.addr()))?;
    tracing::info!(
        bytes = report.bytes_sent,
        encoding = %report.encoding,
        cut = report.cut,
        "Done"
    );
    Ok(())
}
