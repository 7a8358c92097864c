//! Content-driven image decoding into a single canonical pixel layout.

use std::io::Cursor;

use image::{ImageError, ImageReader, RgbImage};
use tracing::debug;

use crate::error::DecodeError;

/// Channels per pixel after normalization.
pub const CHANNELS: usize = 3;

/// Decoded 8-bit RGB pixels, non-premultiplied.
///
/// Whatever the source encoding (palette, greyscale, alpha, 16-bit), the
/// buffer is converted before it leaves [`decode`].
#[derive(Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn channels(&self) -> usize {
        CHANNELS
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbImage {
        self.pixels
    }
}

/// Decode `bytes` by sniffing the container from content.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| DecodeError::Malformed(err.to_string()))?;

    let Some(detected) = reader.format() else {
        return Err(DecodeError::Unrecognized);
    };

    let image = reader.decode().map_err(|err| match err {
        ImageError::Unsupported(_) => DecodeError::Unrecognized,
        other => DecodeError::Malformed(other.to_string()),
    })?;

    debug!(
        format = ?detected,
        color = ?image.color(),
        width = image.width(),
        height = image.height(),
        "decoded image payload"
    );

    Ok(DecodedImage {
        pixels: image.into_rgb8(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{
        DynamicImage, GrayImage, ImageFormat, Luma, Rgb, Rgba, RgbaImage,
    };

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).expect("encode test image");
        out.into_inner()
    }

    #[test]
    fn decodes_ten_by_ten_jpeg() {
        let rgb = RgbImage::from_pixel(10, 10, Rgb([200, 120, 40]));
        let bytes = encode(DynamicImage::ImageRgb8(rgb), ImageFormat::Jpeg);

        let decoded = decode(&bytes).expect("valid jpeg decodes");
        assert_eq!(decoded.dimensions(), (10, 10));
        assert_eq!(decoded.channels(), 3);
        assert_eq!(decoded.pixels().as_raw().len(), 10 * 10 * CHANNELS);
    }

    #[test]
    fn normalizes_greyscale_and_alpha_sources() {
        let grey = GrayImage::from_pixel(4, 3, Luma([90]));
        let decoded =
            decode(&encode(DynamicImage::ImageLuma8(grey), ImageFormat::Png))
                .unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.pixels().get_pixel(0, 0), &Rgb([90, 90, 90]));

        let rgba = RgbaImage::from_pixel(2, 5, Rgba([10, 20, 30, 128]));
        let decoded =
            decode(&encode(DynamicImage::ImageRgba8(rgba), ImageFormat::Png))
                .unwrap();
        assert_eq!(decoded.dimensions(), (2, 5));
        assert_eq!(decoded.pixels().as_raw().len(), 2 * 5 * CHANNELS);
    }

    #[test]
    fn ignores_declared_format_and_sniffs_content() {
        // PNG bytes are decoded as PNG even if the caller thinks otherwise;
        // decode never sees the hint at all.
        let rgb = RgbImage::from_pixel(3, 3, Rgb([1, 2, 3]));
        let bytes = encode(DynamicImage::ImageRgb8(rgb), ImageFormat::Png);
        assert_eq!(decode(&bytes).unwrap().dimensions(), (3, 3));
    }

    #[test]
    fn rejects_empty_unknown_and_truncated_payloads() {
        assert!(matches!(decode(&[]), Err(DecodeError::Empty)));
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(DecodeError::Unrecognized)
        ));

        let rgb = RgbImage::from_pixel(32, 32, Rgb([5, 6, 7]));
        let bytes = encode(DynamicImage::ImageRgb8(rgb), ImageFormat::Png);
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(decode(truncated), Err(DecodeError::Malformed(_))));
    }
}
