//! Bitmap sources for the encoders
//!
//! Encoders only read pixels. A [`Bitmap`] hands out a borrowed [`RawPixels`]
//! view for the duration of one encode call, or `None` when its storage is
//! not plain 8-bit samples.

use crate::error::EncodingError;

/// One 8-bit RGB color sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorSample {
    pub const BLACK: ColorSample = ColorSample::new(0, 0, 0);
    pub const WHITE: ColorSample = ColorSample::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(v: u8) -> Self {
        Self::new(v, v, v)
    }
}

/// Layout of one pixel in a raw buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray8,
    GrayAlpha8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::GrayAlpha8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Borrowed view over raw pixel rows
#[derive(Debug, Clone, Copy)]
pub struct RawPixels<'a> {
    pub data: &'a [u8],
    /// Bytes from the start of one row to the next
    pub stride: usize,
    pub format: PixelFormat,
}

impl RawPixels<'_> {
    /// Read the sample at (x, y). Alpha is ignored.
    ///
    /// Caller keeps (x, y) inside the bitmap.
    #[inline]
    pub fn sample(&self, x: u32, y: u32) -> ColorSample {
        let offset = y as usize * self.stride + x as usize * self.format.bytes_per_pixel();
        match self.format {
            PixelFormat::Gray8 | PixelFormat::GrayAlpha8 => ColorSample::gray(self.data[offset]),
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => ColorSample::new(
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
            ),
        }
    }

    /// Check that every (x, y) of a `width x height` bitmap lies inside `data`
    pub fn check_geometry(&self, width: u32, height: u32) -> Result<(), String> {
        let row_bytes = width as usize * self.format.bytes_per_pixel();
        if self.stride < row_bytes {
            return Err(format!(
                "stride {} shorter than row ({} bytes)",
                self.stride, row_bytes
            ));
        }
        let needed = (height as usize)
            .checked_sub(1)
            .and_then(|rows| self.stride.checked_mul(rows))
            .and_then(|n| n.checked_add(row_bytes))
            .ok_or_else(|| format!("{}x{} bitmap size overflows", width, height))?;
        if self.data.len() < needed {
            return Err(format!(
                "pixel buffer holds {} bytes, {}x{} {:?} needs {}",
                self.data.len(),
                width,
                height,
                self.format,
                needed
            ));
        }
        Ok(())
    }
}

/// Read-only monochrome-ready image
pub trait Bitmap {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Raw sample storage, or `None` if the pixel format is not 8-bit
    fn raw_pixels(&self) -> Option<RawPixels<'_>>;
}

/// Resolve the raw view of a bitmap, checking the encoder preconditions.
pub(crate) fn pixels_of<B: Bitmap + ?Sized>(
    bitmap: &B,
) -> Result<(u32, u32, RawPixels<'_>), EncodingError> {
    let (width, height) = (bitmap.width(), bitmap.height());
    if width == 0 || height == 0 {
        return Err(EncodingError::EmptyBitmap { width, height });
    }
    let pixels = bitmap.raw_pixels().ok_or_else(|| {
        EncodingError::UnsupportedPixelFormat(format!(
            "{}x{} bitmap does not expose 8-bit samples",
            width, height
        ))
    })?;
    pixels
        .check_geometry(width, height)
        .map_err(EncodingError::UnsupportedPixelFormat)?;
    Ok((width, height, pixels))
}

/// Owned pixel storage with validated geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap tightly packed rows (`stride = width * bytes_per_pixel`)
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, EncodingError> {
        let stride = width as usize * format.bytes_per_pixel();
        Self::with_stride(width, height, stride, format, data)
    }

    /// Wrap rows that may carry trailing padding
    pub fn with_stride(
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, EncodingError> {
        if width == 0 || height == 0 {
            return Err(EncodingError::EmptyBitmap { width, height });
        }
        RawPixels {
            data: &data,
            stride,
            format,
        }
        .check_geometry(width, height)
        .map_err(EncodingError::RasterizeFailed)?;
        Ok(Self {
            width,
            height,
            stride,
            format,
            data,
        })
    }

    /// Single-color RGB bitmap
    pub fn filled(width: u32, height: u32, color: ColorSample) -> Result<Self, EncodingError> {
        Self::from_fn(width, height, |_, _| color)
    }

    /// Build an RGB bitmap by evaluating `f(x, y)` for every pixel
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Result<Self, EncodingError>
    where
        F: FnMut(u32, u32) -> ColorSample,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                let c = f(x, y);
                data.extend_from_slice(&[c.r, c.g, c.b]);
            }
        }
        Self::new(width, height, PixelFormat::Rgb8, data)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn sample(&self, x: u32, y: u32) -> Option<ColorSample> {
        (x < self.width && y < self.height).then(|| self.view().sample(x, y))
    }

    fn view(&self) -> RawPixels<'_> {
        RawPixels {
            data: &self.data,
            stride: self.stride,
            format: self.format,
        }
    }
}

impl Bitmap for PixelBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn raw_pixels(&self) -> Option<RawPixels<'_>> {
        Some(self.view())
    }
}

impl<B: Bitmap + ?Sized> Bitmap for &B {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn raw_pixels(&self) -> Option<RawPixels<'_>> {
        (**self).raw_pixels()
    }
}

#[cfg(feature = "image")]
mod image_support {
    use super::{Bitmap, PixelFormat, RawPixels};
    use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

    macro_rules! impl_buffer_bitmap {
        ($ty:ty, $format:expr) => {
            impl Bitmap for $ty {
                fn width(&self) -> u32 {
                    self.width()
                }

                fn height(&self) -> u32 {
                    self.height()
                }

                fn raw_pixels(&self) -> Option<RawPixels<'_>> {
                    Some(RawPixels {
                        data: self.as_raw(),
                        stride: self.width() as usize * $format.bytes_per_pixel(),
                        format: $format,
                    })
                }
            }
        };
    }

    impl_buffer_bitmap!(GrayImage, PixelFormat::Gray8);
    impl_buffer_bitmap!(GrayAlphaImage, PixelFormat::GrayAlpha8);
    impl_buffer_bitmap!(RgbImage, PixelFormat::Rgb8);
    impl_buffer_bitmap!(RgbaImage, PixelFormat::Rgba8);

    impl Bitmap for DynamicImage {
        fn width(&self) -> u32 {
            DynamicImage::width(self)
        }

        fn height(&self) -> u32 {
            DynamicImage::height(self)
        }

        /// Only 8-bit variants expose samples; 16-bit and float images must
        /// be converted by the caller first.
        fn raw_pixels(&self) -> Option<RawPixels<'_>> {
            match self {
                DynamicImage::ImageLuma8(b) => b.raw_pixels(),
                DynamicImage::ImageLumaA8(b) => b.raw_pixels(),
                DynamicImage::ImageRgb8(b) => b.raw_pixels(),
                DynamicImage::ImageRgba8(b) => b.raw_pixels(),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_expands_to_rgb() {
        let buf = PixelBuffer::new(2, 1, PixelFormat::Gray8, vec![10, 200]).unwrap();
        assert_eq!(buf.sample(0, 0), Some(ColorSample::gray(10)));
        assert_eq!(buf.sample(1, 0), Some(ColorSample::gray(200)));
        assert_eq!(buf.sample(2, 0), None);
    }

    #[test]
    fn test_rgba_ignores_alpha() {
        let buf = PixelBuffer::new(1, 1, PixelFormat::Rgba8, vec![1, 2, 3, 0]).unwrap();
        assert_eq!(buf.sample(0, 0), Some(ColorSample::new(1, 2, 3)));
    }

    #[test]
    fn test_padded_stride() {
        // 2x2 gray with 2 bytes of row padding
        let data = vec![0, 1, 0xEE, 0xEE, 2, 3];
        let buf = PixelBuffer::with_stride(2, 2, 4, PixelFormat::Gray8, data).unwrap();
        assert_eq!(buf.sample(1, 1), Some(ColorSample::gray(3)));
    }

    #[test]
    fn test_rejects_short_buffer() {
        let err = PixelBuffer::new(4, 4, PixelFormat::Rgb8, vec![0; 10]).unwrap_err();
        assert!(matches!(err, EncodingError::RasterizeFailed(_)));
    }

    /// Reports a view smaller than its dimensions
    struct TruncatedBitmap {
        data: Vec<u8>,
        stride: usize,
    }

    impl Bitmap for TruncatedBitmap {
        fn width(&self) -> u32 {
            8
        }

        fn height(&self) -> u32 {
            8
        }

        fn raw_pixels(&self) -> Option<RawPixels<'_>> {
            Some(RawPixels {
                data: &self.data,
                stride: self.stride,
                format: PixelFormat::Gray8,
            })
        }
    }

    #[test]
    fn test_short_view_is_unsupported() {
        let short = TruncatedBitmap {
            data: vec![0; 10],
            stride: 8,
        };
        assert!(matches!(
            pixels_of(&short),
            Err(EncodingError::UnsupportedPixelFormat(ref m)) if m.contains("needs 64")
        ));

        let narrow = TruncatedBitmap {
            data: vec![0; 64],
            stride: 4,
        };
        assert!(matches!(
            pixels_of(&narrow),
            Err(EncodingError::UnsupportedPixelFormat(ref m)) if m.contains("stride")
        ));

        let exact = TruncatedBitmap {
            data: vec![0; 64],
            stride: 8,
        };
        assert!(pixels_of(&exact).is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        let err = PixelBuffer::new(0, 4, PixelFormat::Gray8, vec![]).unwrap_err();
        assert_eq!(err, EncodingError::EmptyBitmap { width: 0, height: 4 });
    }

    #[cfg(feature = "image")]
    #[test]
    fn test_dynamic_image_formats() {
        use image::DynamicImage;

        let rgb = DynamicImage::new_rgb8(3, 2);
        assert_eq!(rgb.raw_pixels().map(|p| p.format), Some(PixelFormat::Rgb8));

        let wide = DynamicImage::new_rgb16(3, 2);
        assert!(wide.raw_pixels().is_none());
        assert!(matches!(
            pixels_of(&wide),
            Err(EncodingError::UnsupportedPixelFormat(_))
        ));
    }
}
