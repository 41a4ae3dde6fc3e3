use image::{imageops::FilterType, DynamicImage};
use std::io::Cursor;
use crate::error::TransformError;
use crate::key_codec::OutputFormat;

/// Height that keeps the aspect ratio at the new width (never below 1px)
pub fn scaled_height(orig_width: u32, orig_height: u32, new_width: u32) -> u32 {
    if orig_width == 0 {
        return 1;
    }
    let height = (u64::from(orig_height) * u64::from(new_width) + u64::from(orig_width) / 2)
        / u64::from(orig_width);
    height.clamp(1, u64::from(u32::MAX)) as u32
}

/// Upper bounds on what a single resize may decode or produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeLimits {
    pub max_width: u32,
    /// Applies to both the source and the output image
    pub max_pixels: u64,
}

impl Default for ResizeLimits {
    fn default() -> Self {
        Self {
            max_width: 4096,
            max_pixels: 40_000_000,
        }
    }
}

impl ResizeLimits {
    /// Check a source of `orig_width`x`orig_height` resized to `target_width`
    /// Returns the output height when it fits
    pub fn check(
        &self,
        orig_width: u32,
        orig_height: u32,
        target_width: u32,
    ) -> Result<u32, TransformError> {
        let source_pixels = u64::from(orig_width) * u64::from(orig_height);
        if source_pixels > self.max_pixels {
            return Err(TransformError::TooLarge {
                width: orig_width,
                height: orig_height,
                limit: self.max_pixels,
            });
        }

        let new_height = scaled_height(orig_width, orig_height, target_width);
        let output_pixels = u64::from(target_width) * u64::from(new_height);
        if target_width > self.max_width || output_pixels > self.max_pixels {
            return Err(TransformError::TooLarge {
                width: target_width,
                height: new_height,
                limit: self.max_pixels,
            });
        }

        Ok(new_height)
    }
}

/// Resize image to `target_width`, scaling height proportionally
/// Returns the encoded bytes in `format`
pub fn resize(
    image_bytes: &[u8],
    target_width: u32,
    format: OutputFormat,
    limits: &ResizeLimits,
) -> Result<Vec<u8>, TransformError> {
    // Header only, before any pixel buffer is allocated
    let (orig_width, orig_height) = get_dimensions(image_bytes)?;
    let new_height = limits.check(orig_width, orig_height, target_width)?;

    // Load image
    let img = image::load_from_memory(image_bytes).map_err(TransformError::Decode)?;

    // Resize with high-quality Lanczos3 filter
    let resized = img.resize_exact(target_width, new_height, FilterType::Lanczos3);

    // JPEG has no alpha channel
    let resized = match format {
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
        OutputFormat::Png => resized,
    };

    let mut buf = Cursor::new(Vec::new());
    resized
        .write_to(&mut buf, format.image_format())
        .map_err(TransformError::Encode)?;

    Ok(buf.into_inner())
}

/// Read image dimensions from the encoded header without decoding pixels
pub fn get_dimensions(image_bytes: &[u8]) -> Result<(u32, u32), TransformError> {
    image::io::Reader::new(Cursor::new(image_bytes))
        .with_guessed_format()
        .map_err(|e| TransformError::Decode(image::ImageError::IoError(e)))?
        .into_dimensions()
        .map_err(TransformError::Decode)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    /// Encode a gradient test image
    pub(crate) fn sample_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200])
        });
        let img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
            _ => DynamicImage::ImageRgba8(img),
        };
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(400, 200, 100), 50);
        assert_eq!(scaled_height(300, 200, 100), 67); // 66.67 rounds up
        assert_eq!(scaled_height(1000, 1, 10), 1);
        assert_eq!(scaled_height(100, 50, 200), 100);
    }

    #[test]
    fn test_resize_jpeg_keeps_aspect_ratio() {
        let source = sample_image(400, 200, ImageFormat::Jpeg);

        let resized = resize(&source, 100, OutputFormat::Jpeg, &ResizeLimits::default()).unwrap();

        assert_eq!(image::guess_format(&resized).unwrap(), ImageFormat::Jpeg);
        assert_eq!(get_dimensions(&resized).unwrap(), (100, 50));
    }

    #[test]
    fn test_resize_png_with_alpha_to_jpeg() {
        let source = sample_image(64, 64, ImageFormat::Png);

        let resized = resize(&source, 16, OutputFormat::Jpeg, &ResizeLimits::default()).unwrap();
        assert_eq!(get_dimensions(&resized).unwrap(), (16, 16));
    }

    #[test]
    fn test_resize_png_output() {
        let source = sample_image(120, 90, ImageFormat::Png);

        let resized = resize(&source, 40, OutputFormat::Png, &ResizeLimits::default()).unwrap();

        assert_eq!(image::guess_format(&resized).unwrap(), ImageFormat::Png);
        assert_eq!(get_dimensions(&resized).unwrap(), (40, 30));
    }

    #[test]
    fn test_resize_is_deterministic() {
        let source = sample_image(200, 100, ImageFormat::Png);

        let first = resize(&source, 50, OutputFormat::Png, &ResizeLimits::default()).unwrap();
        let second = resize(&source, 50, OutputFormat::Png, &ResizeLimits::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resize_rejects_corrupt_source() {
        let result = resize(b"definitely not an image", 100, OutputFormat::Jpeg, &ResizeLimits::default());
        assert!(matches!(result, Err(TransformError::Decode(_))));
    }

    #[test]
    fn test_resize_rejects_oversized_output_before_decoding() {
        let source = sample_image(10, 10, ImageFormat::Png);

        let result = resize(&source, 200_000, OutputFormat::Png, &ResizeLimits::default());
        assert!(matches!(
            result,
            Err(TransformError::TooLarge { width: 200_000, height: 200_000, .. })
        ));
    }

    #[test]
    fn test_limits_check() {
        let limits = ResizeLimits {
            max_width: 1000,
            max_pixels: 1_000_000,
        };

        assert_eq!(limits.check(1000, 500, 500).unwrap(), 250);
        assert_eq!(limits.check(100, 100, 1000).unwrap(), 1000);
        // Width cap
        assert!(limits.check(1000, 10, 1001).is_err());
        // Tall output stays under the width cap but not the pixel cap
        assert!(limits.check(10, 1000, 1000).is_err());
        // Source itself too big to decode
        assert!(matches!(
            limits.check(2000, 1000, 10),
            Err(TransformError::TooLarge { width: 2000, height: 1000, limit: 1_000_000 })
        ));
    }

    #[test]
    fn test_get_dimensions_reads_header() {
        let source = sample_image(33, 21, ImageFormat::Jpeg);
        assert_eq!(get_dimensions(&source).unwrap(), (33, 21));
        assert!(matches!(get_dimensions(b"nope"), Err(TransformError::Decode(_))));
    }
}
