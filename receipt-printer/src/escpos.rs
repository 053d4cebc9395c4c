//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data and the immutable
//! [`CommandBuffer`] that is handed to the printer session.

use crate::bitmap::Bitmap;
use crate::error::EncodingError;
use std::ops::Deref;

pub const ESC: u8 = 0x1B;
pub const GS: u8 = 0x1D;
pub const LF: u8 = 0x0A;

/// ESC/POS command byte sequences
pub mod commands {
    use super::{ESC, GS, LF};

    /// GS v 0 m - Raster bit image, normal density (m = 0)
    pub const RASTER_IMAGE: [u8; 4] = [GS, b'v', b'0', 0x00];

    /// ESC 3 0 - Line spacing 0 so image strips join seamlessly
    pub const STRIP_PREAMBLE: [u8; 3] = [ESC, b'3', 0x00];

    /// ESC * 33 - Column bit image, 24-dot double density
    pub const STRIP_IMAGE: [u8; 3] = [ESC, b'*', 33];

    /// LF - Ends one strip
    pub const STRIP_TERMINATOR: u8 = LF;

    /// ESC 2 - Restore default line spacing
    pub const RESTORE_SPACING: [u8; 2] = [ESC, b'2'];

    /// GS V 66 0 - Full cut, no extra feed
    pub const CUT_PAPER: [u8; 4] = [GS, b'V', 66, 0];
}

/// Little-endian split of a 16-bit length field.
///
/// Values past 65535 silently keep only their low 16 bits.
#[inline]
pub fn u16_le(n: u32) -> [u8; 2] {
    [(n & 0xFF) as u8, ((n >> 8) & 0xFF) as u8]
}

/// An immutable, ordered run of ESC/POS command bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBuffer(Vec<u8>);

impl CommandBuffer {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for CommandBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for CommandBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for CommandBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for CommandBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for CommandBuffer {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Decoded `GS v 0` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterHeader {
    pub mode: u8,
    pub bytes_per_row: u16,
    pub height: u16,
}

impl RasterHeader {
    pub const LEN: usize = 8;

    /// Parse the first 8 bytes of a raster image command
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::LEN || bytes[..3] != commands::RASTER_IMAGE[..3] {
            return None;
        }
        Some(Self {
            mode: bytes[3],
            bytes_per_row: u16::from_le_bytes([bytes[4], bytes[5]]),
            height: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }

    /// Width in dots, rounded up to a whole byte
    pub fn width_dots(&self) -> u32 {
        self.bytes_per_row as u32 * 8
    }

    /// Size of the data section that follows the header
    pub fn data_len(&self) -> usize {
        self.bytes_per_row as usize * self.height as usize
    }
}

/// ESC/POS command builder
///
/// Accumulates commands in order; `build` freezes them into a [`CommandBuffer`].
#[derive(Debug, Default)]
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(4096),
        }
    }

    // === Paper Control ===

    /// Full cut (GS V 66 0)
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&commands::CUT_PAPER);
        self
    }

    // === Images ===

    /// Append a `GS v 0` raster image
    pub fn raster_image<B: Bitmap + ?Sized>(&mut self, bitmap: &B) -> Result<&mut Self, EncodingError> {
        crate::raster::write_raster(&mut self.buf, bitmap)?;
        Ok(self)
    }

    /// Append an `ESC *` 24-dot strip image
    pub fn bit_image<B: Bitmap + ?Sized>(&mut self, bitmap: &B) -> Result<&mut Self, EncodingError> {
        crate::strip::write_strips(&mut self.buf, bitmap)?;
        Ok(self)
    }

    // === Build ===

    pub fn build(self) -> CommandBuffer {
        CommandBuffer(self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{ColorSample, PixelBuffer};

    #[test]
    fn test_u16_le_split_and_truncation() {
        assert_eq!(u16_le(72), [72, 0]);
        assert_eq!(u16_le(500), [0xF4, 0x01]);
        assert_eq!(u16_le(65535), [0xFF, 0xFF]);
        // 65536 keeps only the low 16 bits
        assert_eq!(u16_le(65536), [0, 0]);
    }

    #[test]
    fn test_builder_strips_then_cut() {
        let img = PixelBuffer::filled(1, 24, ColorSample::BLACK).unwrap();
        let mut b = EscPosBuilder::new();
        b.bit_image(&img).unwrap().cut();
        let cmd = b.build();
        assert_eq!(
            cmd.as_bytes(),
            &[
                0x1B, 0x33, 0x00, 0x1B, 0x2A, 33, 1, 0, 0xFF, 0xFF, 0xFF, 0x0A, 0x1B, 0x32, 0x1D,
                0x56, 0x42, 0x00
            ]
        );
    }

    #[test]
    fn test_builder_image_then_cut() {
        let img = PixelBuffer::filled(8, 1, ColorSample::BLACK).unwrap();
        let mut b = EscPosBuilder::new();
        b.raster_image(&img).unwrap().cut();
        let cmd = b.build();
        assert_eq!(
            cmd.as_bytes(),
            &[0x1D, 0x76, 0x30, 0x00, 1, 0, 1, 0, 0xFF, 0x1D, 0x56, 0x42, 0x00]
        );
    }

    #[test]
    fn test_raster_header_parse() {
        let header = RasterHeader::parse(&[0x1D, 0x76, 0x30, 0x00, 0x48, 0x00, 0xF4, 0x01]).unwrap();
        assert_eq!(header.bytes_per_row, 72);
        assert_eq!(header.height, 500);
        assert_eq!(header.width_dots(), 576);
        assert_eq!(header.data_len(), 72 * 500);

        assert!(RasterHeader::parse(&[0x1B, 0x2A, 33, 0, 0, 0, 0, 0]).is_none());
        assert!(RasterHeader::parse(&[0x1D, 0x76]).is_none());
    }

    #[test]
    fn test_command_buffer_conversions() {
        let cmd = CommandBuffer::from(commands::CUT_PAPER);
        assert_eq!(cmd.len(), 4);
        assert_eq!(&cmd[..2], &[0x1D, 0x56]);
        assert_eq!(cmd.into_vec(), vec![0x1D, 0x56, 0x42, 0x00]);
        assert!(CommandBuffer::default().is_empty());
    }
}
