//! # receipt-printer
//!
//! Bitmap printing for ESC/POS thermal receipt printers over raw TCP.
//!
//! ## Scope
//!
//! This crate handles HOW to print a picture:
//! - Thresholding pixels to print/no-print dots
//! - `GS v 0` raster and `ESC *` 24-dot strip image encoding
//! - A printer session (connect, send, cut, disconnect) on TCP port 9100
//! - Image loading and scaling to the print head width (optional)
//!
//! Producing the picture (receipt layout, text rendering) stays in
//! application code.
//!
//! ## Example
//!
//! ```ignore
//! use receipt_printer::{Encoding, PrinterSession, SessionOptions, print_bitmap};
//!
//! let img = receipt_printer::imaging::load_image("logo.png")?;
//! let img = receipt_printer::imaging::prepare_for_print(&img, 576)?;
//!
//! let session = PrinterSession::new(SessionOptions::default());
//! session.connect("192.168.1.100", 9100).await?;
//! print_bitmap(&session, &img, Encoding::Raster).await?;
//! session.cut_paper().await?;
//! session.disconnect().await;
//! ```

pub mod bitmap;
mod bits;
pub mod config;
mod error;
mod escpos;
#[cfg(feature = "image")]
pub mod imaging;
mod job;
pub mod raster;
mod session;
pub mod strip;
pub mod threshold;
mod transport;

// Re-exports
pub use bitmap::{Bitmap, ColorSample, PixelBuffer, PixelFormat, RawPixels};
pub use bits::BitWriter;
pub use config::PrinterConfig;
pub use error::{ConnectionError, EncodingError, PrintError, PrintResult};
pub use escpos::{CommandBuffer, EscPosBuilder, RasterHeader, commands, u16_le};
pub use job::{Encoding, JobReport, print_bitmap, render_job, run_job, run_job_with};
pub use raster::encode_raster;
pub use session::{PrinterSession, SendHandle, SessionOptions, SessionState};
pub use strip::encode_strips;
pub use transport::{DEFAULT_PORT, TcpTransport, Transport, probe};
