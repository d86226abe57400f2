//! Cover image ingestion: decode, downscale and re-encode in memory, then write.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// JPEG quality used for re-encoded covers.
pub const JPEG_QUALITY: u8 = 85;

/// Default maximum cover width in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 800;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported image format: {0:?}")]
    UnsupportedFormat(String),
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Map a file extension (with or without the leading dot) to an image format.
pub fn format_for_extension(ext: &str) -> Result<ImageFormat, ImageError> {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        _ => Err(ImageError::UnsupportedFormat(ext.to_string())),
    }
}

/// Shrink `img` to at most `max_width` pixels wide, keeping the aspect ratio.
/// Images already within the limit are returned unchanged.
pub fn fit_to_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    if max_width == 0 || img.width() <= max_width {
        return img;
    }
    let height = ((img.height() as u64 * max_width as u64) / img.width() as u64).max(1) as u32;
    img.resize_exact(max_width, height, FilterType::Lanczos3)
}

/// Decode `data` as the format implied by `ext`, downscale it to `max_width`
/// and re-encode it in the same format.
///
/// The format is taken from the extension only; the content is not sniffed.
pub fn encode_resized(data: &[u8], ext: &str, max_width: u32) -> Result<Vec<u8>, ImageError> {
    let format = format_for_extension(ext)?;
    let img = image::load_from_memory_with_format(data, format).map_err(ImageError::Decode)?;
    let img = fit_to_width(img, max_width);

    let mut out = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            rgb.write_with_encoder(encoder).map_err(ImageError::Encode)?;
        }
        _ => {
            let encoder = PngEncoder::new(&mut out);
            img.write_with_encoder(encoder).map_err(ImageError::Encode)?;
        }
    }
    Ok(out)
}

/// Write already encoded image bytes to `dest`.
pub fn write_image(bytes: &[u8], dest: &Path) -> Result<(), ImageError> {
    let mut out = BufWriter::new(File::create(dest)?);
    out.write_all(bytes)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(format_for_extension(".JPG").unwrap(), ImageFormat::Jpeg);
        assert_eq!(format_for_extension("jpeg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(format_for_extension(".png").unwrap(), ImageFormat::Png);
        assert!(matches!(
            format_for_extension(".gif"),
            Err(ImageError::UnsupportedFormat(_))
        ));
        assert!(format_for_extension("").is_err());
    }

    #[test]
    fn wide_jpeg_is_downscaled_preserving_aspect() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("wide.jpg");
        let data = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(1600, 900, Rgb([200, 40, 40]))),
            ImageFormat::Jpeg,
        );

        let bytes = encode_resized(&data, ".jpg", 800).unwrap();
        write_image(&bytes, &dest).unwrap();

        let (w, h) = image::image_dimensions(&dest).unwrap();
        assert_eq!(w, 800);
        assert_eq!(h, 450);
    }

    #[test]
    fn narrow_png_keeps_its_size() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("small.png");
        let data = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(120, 60, Rgba([0, 0, 255, 128]))),
            ImageFormat::Png,
        );

        let bytes = encode_resized(&data, ".png", 800).unwrap();
        write_image(&bytes, &dest).unwrap();

        assert_eq!(image::image_dimensions(&dest).unwrap(), (120, 60));
    }

    #[test]
    fn extension_decides_decoder() {
        let png = encode(
            DynamicImage::ImageRgb8(RgbImage::new(10, 10)),
            ImageFormat::Png,
        );

        let err = encode_resized(&png, ".jpg", 800).unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn encode_does_not_touch_the_filesystem() {
        let data = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(1000, 500, Rgb([10, 10, 10]))),
            ImageFormat::Png,
        );

        let bytes = encode_resized(&data, ".png", 800).unwrap();

        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((img.width(), img.height()), (800, 400));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = encode_resized(b"GIF89a", ".gif", 800).unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedFormat(_)));
    }
}
