//! `ESC *` 24-dot double-density column image encoder
//!
//! Older printers only understand the column form. The image is cut into
//! 24-dot tall strips printed one per line with zero line spacing:
//!
//! ```text
//! 1B 33 00                          line spacing 0
//! ┌ 1B 2A 21 nL nH  c0 c1 ... 0A    one strip, nL/nH = width in dots
//! └ ... repeated ceil(height / 24) times
//! 1B 32                             default line spacing
//! ```
//!
//! Each column `ci` is 3 bytes, top to bottom; within a byte bit 7 is the
//! topmost dot. Rows past the bitmap height in the last strip stay blank.

use crate::bitmap::{Bitmap, pixels_of};
use crate::bits::BitWriter;
use crate::error::EncodingError;
use crate::escpos::{CommandBuffer, commands, u16_le};
use crate::threshold::is_dark;
use tracing::debug;

/// Dots per strip
pub const STRIP_HEIGHT: u32 = 24;

/// Number of strips needed for a bitmap `height` dots tall
pub fn strip_count(height: u32) -> u32 {
    height.div_ceil(STRIP_HEIGHT)
}

/// Encode a bitmap as a sequence of `ESC *` strips.
pub fn encode_strips<B: Bitmap + ?Sized>(bitmap: &B) -> Result<CommandBuffer, EncodingError> {
    let mut buf = Vec::new();
    write_strips(&mut buf, bitmap)?;
    Ok(CommandBuffer::from(buf))
}

pub(crate) fn write_strips<B: Bitmap + ?Sized>(
    buf: &mut Vec<u8>,
    bitmap: &B,
) -> Result<(), EncodingError> {
    let (width, height, pixels) = pixels_of(bitmap)?;
    let strips = strip_count(height);
    let strip_len = commands::STRIP_IMAGE.len() + 2 + width as usize * 3 + 1;

    buf.reserve(
        commands::STRIP_PREAMBLE.len()
            + strips as usize * strip_len
            + commands::RESTORE_SPACING.len(),
    );
    buf.extend_from_slice(&commands::STRIP_PREAMBLE);

    for strip in 0..strips {
        let top = strip * STRIP_HEIGHT;

        buf.extend_from_slice(&commands::STRIP_IMAGE);
        buf.extend_from_slice(&u16_le(width));

        let mut bits = BitWriter::new(buf);
        for x in 0..width {
            for y in top..top + STRIP_HEIGHT {
                bits.push(y < height && is_dark(pixels.sample(x, y)));
            }
        }
        bits.finish();

        buf.push(commands::STRIP_TERMINATOR);
    }

    buf.extend_from_slice(&commands::RESTORE_SPACING);

    debug!(width, height, strips, bytes = buf.len(), "strip image encoded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{ColorSample, PixelBuffer};

    const PREAMBLE: usize = 3;
    const HEADER: usize = 5;

    #[test]
    fn test_single_black_strip() {
        let img = PixelBuffer::filled(2, 24, ColorSample::BLACK).unwrap();
        let cmd = encode_strips(&img).unwrap();

        assert_eq!(
            cmd.as_bytes(),
            &[
                0x1B, 0x33, 0x00, // spacing 0
                0x1B, 0x2A, 33, 2, 0, // strip header
                0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // 2 columns
                0x0A, // terminator
                0x1B, 0x32, // restore spacing
            ]
        );
    }

    #[test]
    fn test_partial_last_strip_is_blank_below_height() {
        // 30 rows: second strip has 6 real rows, 18 padded
        let img = PixelBuffer::filled(1, 30, ColorSample::BLACK).unwrap();
        let cmd = encode_strips(&img).unwrap();

        let second = PREAMBLE + (HEADER + 3 + 1);
        assert_eq!(&cmd[second..second + HEADER], &[0x1B, 0x2A, 33, 1, 0]);
        assert_eq!(
            &cmd[second + HEADER..second + HEADER + 3],
            &[0b1111_1100, 0x00, 0x00]
        );
        assert_eq!(cmd[second + HEADER + 3], 0x0A);
        assert_eq!(&cmd[cmd.len() - 2..], &[0x1B, 0x32]);
    }

    #[test]
    fn test_top_dot_is_msb_of_first_byte() {
        // Only rows 0, 8 and 23 are dark
        let img = PixelBuffer::from_fn(1, 24, |_, y| {
            if y == 0 || y == 8 || y == 23 {
                ColorSample::BLACK
            } else {
                ColorSample::WHITE
            }
        })
        .unwrap();
        let cmd = encode_strips(&img).unwrap();
        let data = &cmd[PREAMBLE + HEADER..PREAMBLE + HEADER + 3];
        assert_eq!(data, &[0b1000_0000, 0b1000_0000, 0b0000_0001]);
    }

    #[test]
    fn test_columns_left_to_right() {
        let img = PixelBuffer::from_fn(3, 24, |x, _| {
            if x == 1 {
                ColorSample::BLACK
            } else {
                ColorSample::WHITE
            }
        })
        .unwrap();
        let cmd = encode_strips(&img).unwrap();
        let data = &cmd[PREAMBLE + HEADER..PREAMBLE + HEADER + 9];
        assert_eq!(data, &[0, 0, 0, 0xFF, 0xFF, 0xFF, 0, 0, 0]);
    }

    #[test]
    fn test_strip_count_and_sizes() {
        for (width, height) in [(1u32, 1u32), (5, 23), (5, 24), (5, 25), (16, 48), (7, 100)] {
            let img = PixelBuffer::filled(width, height, ColorSample::WHITE).unwrap();
            let cmd = encode_strips(&img).unwrap();

            let strips = strip_count(height) as usize;
            let per_strip = HEADER + width as usize * 3 + 1;
            assert_eq!(cmd.len(), PREAMBLE + strips * per_strip + 2);

            let headers = (0..strips)
                .filter(|s| {
                    let at = PREAMBLE + s * per_strip;
                    cmd[at..at + 3] == [0x1B, 0x2A, 33]
                })
                .count();
            assert_eq!(headers, strips);
        }
    }

    #[test]
    fn test_width_header_little_endian() {
        let img = PixelBuffer::filled(576, 1, ColorSample::WHITE).unwrap();
        let cmd = encode_strips(&img).unwrap();
        assert_eq!(&cmd[PREAMBLE + 3..PREAMBLE + 5], &[0x40, 0x02]);
    }

    #[test]
    fn test_strip_count() {
        assert_eq!(strip_count(1), 1);
        assert_eq!(strip_count(24), 1);
        assert_eq!(strip_count(25), 2);
        assert_eq!(strip_count(48), 2);
    }
}
