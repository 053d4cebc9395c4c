//! Print jobs: encode a bitmap and push it through a session
//!
//! [`print_bitmap`] is the bare operation (encode, then send) and leaves the
//! session as it found it. [`run_job`] owns the whole lifecycle and always
//! disconnects, whichever step fails.

use crate::bitmap::Bitmap;
use crate::config::PrinterConfig;
use crate::error::{ConnectionError, EncodingError, PrintError, PrintResult};
use crate::escpos::{CommandBuffer, EscPosBuilder, commands};
use crate::raster::encode_raster;
use crate::session::PrinterSession;
use crate::strip::encode_strips;
use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument, warn};

/// Bit image command used for the picture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// `GS v 0`, one block of arbitrary height
    #[default]
    Raster,
    /// `ESC *` 24-dot strips, for printers without raster support
    Strip,
}

impl Encoding {
    pub fn encode<B: Bitmap + ?Sized>(self, bitmap: &B) -> Result<CommandBuffer, EncodingError> {
        match self {
            Encoding::Raster => encode_raster(bitmap),
            Encoding::Strip => encode_strips(bitmap),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Raster => f.write_str("raster"),
            Encoding::Strip => f.write_str("strip"),
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raster" => Ok(Encoding::Raster),
            "strip" | "column" => Ok(Encoding::Strip),
            other => Err(format!("unknown image encoding: {}", other)),
        }
    }
}

/// Outcome of a completed [`run_job`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    pub bytes_sent: usize,
    pub encoding: Encoding,
    pub cut: bool,
}

/// Encode `bitmap` and send it through a Ready session.
///
/// Returns the number of bytes sent. Nothing is encoded or sent when the
/// session is not Ready. Does not cut or disconnect.
pub async fn print_bitmap<B: Bitmap + ?Sized>(
    session: &PrinterSession,
    bitmap: &B,
    encoding: Encoding,
) -> PrintResult<usize> {
    if !session.is_ready() {
        warn!(state = %session.state(), "Print skipped, session not ready");
        return Err(ConnectionError::NotConnected.into());
    }

    let command = encoding.encode(bitmap)?;
    let len = command.len();
    session.send(command).await?;
    Ok(len)
}

/// The bytes a job puts on the wire, without any I/O.
pub fn render_job<B: Bitmap + ?Sized>(
    bitmap: &B,
    encoding: Encoding,
    cut: bool,
) -> Result<CommandBuffer, EncodingError> {
    let mut builder = EscPosBuilder::new();
    match encoding {
        Encoding::Raster => builder.raster_image(bitmap)?,
        Encoding::Strip => builder.bit_image(bitmap)?,
    };
    if cut {
        builder.cut();
    }
    Ok(builder.build())
}

/// Connect, print, optionally cut, and disconnect on a fresh TCP session.
pub async fn run_job<B: Bitmap + ?Sized>(
    config: &PrinterConfig,
    bitmap: &B,
) -> PrintResult<JobReport> {
    let session = PrinterSession::new(config.session_options());
    run_job_with(&session, config, bitmap).await
}

/// [`run_job`] on a caller-provided session.
///
/// The session is disconnected on every exit path, including validation,
/// connect, encode and send failures. The one exception is a session that
/// was already active: the job is rejected with `AlreadyActive` and the
/// caller's connection is left as it was.
#[instrument(skip_all, fields(addr = %config.addr(), encoding = %config.encoding))]
pub async fn run_job_with<B: Bitmap + ?Sized>(
    session: &PrinterSession,
    config: &PrinterConfig,
    bitmap: &B,
) -> PrintResult<JobReport> {
    let outcome = execute(session, config, bitmap).await;
    if let Err(PrintError::Connection(ConnectionError::AlreadyActive(state))) = &outcome {
        warn!(%state, "Print job rejected, session already in use");
        return outcome;
    }
    session.disconnect().await;

    match &outcome {
        Ok(report) => info!(bytes = report.bytes_sent, cut = report.cut, "Print job sent successfully"),
        Err(e) => warn!(error = %e, "Print job failed"),
    }
    outcome
}

async fn execute<B: Bitmap + ?Sized>(
    session: &PrinterSession,
    config: &PrinterConfig,
    bitmap: &B,
) -> PrintResult<JobReport> {
    config.validate()?;
    session.connect(&config.host, config.port).await?;

    let mut report = JobReport {
        bytes_sent: print_bitmap(session, bitmap, config.encoding).await?,
        encoding: config.encoding,
        cut: false,
    };

    if config.cut {
        session.cut_paper().await?;
        report.bytes_sent += commands::CUT_PAPER.len();
        report.cut = true;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{ColorSample, PixelBuffer};

    #[test]
    fn test_encoding_parse() {
        assert_eq!("raster".parse::<Encoding>(), Ok(Encoding::Raster));
        assert_eq!(" Strip ".parse::<Encoding>(), Ok(Encoding::Strip));
        assert_eq!("column".parse::<Encoding>(), Ok(Encoding::Strip));
        assert!("sixel".parse::<Encoding>().is_err());
        assert_eq!(Encoding::Strip.to_string(), "strip");
    }

    #[test]
    fn test_render_job_appends_cut() {
        let img = PixelBuffer::filled(8, 8, ColorSample::BLACK).unwrap();

        let with_cut = render_job(&img, Encoding::Raster, true).unwrap();
        assert_eq!(with_cut.len(), 16 + 4);
        assert_eq!(&with_cut[16..], &commands::CUT_PAPER);

        let without = render_job(&img, Encoding::Raster, false).unwrap();
        assert_eq!(without, encode_raster(&img).unwrap());

        let strips = render_job(&img, Encoding::Strip, false).unwrap();
        assert_eq!(strips, encode_strips(&img).unwrap());
    }

    #[tokio::test]
    async fn test_print_bitmap_requires_ready_session() {
        let session = PrinterSession::new(Default::default());
        let img = PixelBuffer::filled(8, 8, ColorSample::BLACK).unwrap();
        let err = print_bitmap(&session, &img, Encoding::Raster).await.unwrap_err();
        assert!(matches!(
            err,
            crate::PrintError::Connection(ConnectionError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_run_job_rejects_missing_host() {
        let session = PrinterSession::new(Default::default());
        let img = PixelBuffer::filled(8, 8, ColorSample::BLACK).unwrap();
        let err = run_job_with(&session, &PrinterConfig::default(), &img)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::PrintError::Connection(ConnectionError::InvalidConfig(_))
        ));
        assert_eq!(session.state(), crate::SessionState::Idle);
    }
}
