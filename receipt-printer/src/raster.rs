//! `GS v 0` raster bit image encoder
//!
//! ```text
//! 1D 76 30 00  xL xH  yL yH  d1...dk
//!              │      │      └ k = bytes_per_row × height, row-major
//!              │      └ height in dots, little-endian
//!              └ bytes_per_row = ceil(width / 8), little-endian
//! ```
//!
//! Each data byte covers 8 horizontal dots, bit 7 = leftmost. Columns past
//! the bitmap width in the last byte of a row are left blank.

use crate::bitmap::{Bitmap, pixels_of};
use crate::bits::BitWriter;
use crate::error::EncodingError;
use crate::escpos::{CommandBuffer, commands, u16_le};
use crate::threshold::is_dark;
use tracing::debug;

/// Bytes per raster row for a bitmap `width` dots wide
pub fn bytes_per_row(width: u32) -> u32 {
    width.div_ceil(8)
}

/// Encode a bitmap as a single `GS v 0` command.
///
/// The bitmap must already be at the printer's dot width; nothing is resized.
pub fn encode_raster<B: Bitmap + ?Sized>(bitmap: &B) -> Result<CommandBuffer, EncodingError> {
    let mut buf = Vec::new();
    write_raster(&mut buf, bitmap)?;
    Ok(CommandBuffer::from(buf))
}

pub(crate) fn write_raster<B: Bitmap + ?Sized>(
    buf: &mut Vec<u8>,
    bitmap: &B,
) -> Result<(), EncodingError> {
    let (width, height, pixels) = pixels_of(bitmap)?;
    let row_bytes = bytes_per_row(width);

    buf.reserve(8 + row_bytes as usize * height as usize);
    buf.extend_from_slice(&commands::RASTER_IMAGE);
    buf.extend_from_slice(&u16_le(row_bytes));
    buf.extend_from_slice(&u16_le(height));

    let mut bits = BitWriter::new(buf);
    for y in 0..height {
        for x in 0..width {
            bits.push(is_dark(pixels.sample(x, y)));
        }
        // Blank the unused low bits of the last byte in the row
        bits.pad((row_bytes * 8 - width) as usize);
    }
    bits.finish();

    debug!(width, height, row_bytes, bytes = buf.len(), "raster image encoded");
    Ok(())
}
