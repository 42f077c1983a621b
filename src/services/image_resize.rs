//! Aspect-preserving image downscaling on in-memory buffers.

use image::{
    DynamicImage, ExtendedColorType, ImageFormat, codecs::jpeg::JpegEncoder,
    imageops::FilterType,
};
use std::io::Cursor;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizeOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// Encoder quality, 1–100. Only lossy formats use it.
    pub quality: u8,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            quality: 90,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("unsupported image type `{0}`")]
    UnsupportedType(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub fn format_for_media_type(media_type: &str) -> Option<ImageFormat> {
    match media_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/gif" => Some(ImageFormat::Gif),
        "image/webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

/// Dimensions after clamping width to `max_width`, then height to
/// `max_height`, keeping the aspect ratio. Never returns a zero side.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let (mut w, mut h) = (f64::from(width), f64::from(height));

    if w > f64::from(max_width) {
        h *= f64::from(max_width) / w;
        w = f64::from(max_width);
    }
    if h > f64::from(max_height) {
        w *= f64::from(max_height) / h;
        h = f64::from(max_height);
    }

    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

/// Downscale `bytes` (encoded as `media_type`) to fit the configured box and
/// re-encode in the same format.
///
/// Returns `Ok(None)` when the image already fits, so the caller keeps the
/// original bytes untouched.
pub fn resize(
    bytes: &[u8],
    media_type: &str,
    options: ResizeOptions,
) -> Result<Option<Vec<u8>>, ResizeError> {
    let format = format_for_media_type(media_type)
        .ok_or_else(|| ResizeError::UnsupportedType(media_type.to_string()))?;
    let image = image::load_from_memory_with_format(bytes, format)?;

    let (width, height) = (image.width(), image.height());
    let (target_width, target_height) =
        fit_within(width, height, options.max_width, options.max_height);
    if (target_width, target_height) == (width, height) {
        return Ok(None);
    }

    let resized = image.resize_exact(target_width, target_height, FilterType::Lanczos3);
    encode(&resized, format, options.quality).map(Some)
}

fn encode(image: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, ResizeError> {
    let mut out = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        other => image.write_to(&mut Cursor::new(&mut out), other)?,
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage};

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let pixel = image::Rgb([200, 40, 90]);
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, pixel));
        let mut out = Vec::new();
        image.write_to(&mut Cursor::new(&mut out), format).unwrap();
        out
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(4000, 2000, 1920, 1080), (1920, 960));
        assert_eq!(fit_within(1000, 3000, 1920, 1080), (360, 1080));
        assert_eq!(fit_within(3000, 3000, 1920, 1080), (1080, 1080));
        assert_eq!(fit_within(800, 600, 1920, 1080), (800, 600));
        assert_eq!(fit_within(10_000, 1, 100, 100), (100, 1));
    }

    #[test]
    fn test_resize_png_keeps_format_and_aspect() {
        let original = encoded(400, 200, ImageFormat::Png);
        let options = ResizeOptions {
            max_width: 100,
            max_height: 100,
            quality: 90,
        };
        let out = resize(&original, "image/png", options).unwrap().unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (100, 50));
    }

    #[test]
    fn test_resize_jpeg() {
        let original = encoded(300, 600, ImageFormat::Jpeg);
        let options = ResizeOptions {
            max_width: 200,
            max_height: 200,
            quality: 80,
        };
        let out = resize(&original, "image/jpeg", options).unwrap().unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (100, 200));
    }

    #[test]
    fn test_small_image_is_left_alone() {
        let original = encoded(64, 64, ImageFormat::Png);
        assert!(resize(&original, "image/png", ResizeOptions::default()).unwrap().is_none());
    }

    #[test]
    fn test_resize_errors() {
        assert!(matches!(
            resize(b"not an image", "image/png", ResizeOptions::default()),
            Err(ResizeError::Image(_))
        ));
        assert!(matches!(
            resize(b"", "image/svg+xml", ResizeOptions::default()),
            Err(ResizeError::UnsupportedType(_))
        ));
    }
}
