use std::path::Path;

use image::{ImageFormat, RgbaImage, imageops::FilterType};
use thiserror::Error;

/// Reasons an uploaded file could not become a source image.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("file is not a supported image")]
    NotAnImage,
    #[error("could not decode {format:?} image: {source}")]
    Decode {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },
    #[error("image has zero width or height")]
    Empty,
}

/// Identify the container of `bytes` from its magic number.
pub fn sniff_image_format(bytes: &[u8]) -> Result<ImageFormat, ImageLoadError> {
    image::guess_format(bytes).map_err(|_| ImageLoadError::NotAnImage)
}

/// Decode an uploaded file into an RGBA raster.
///
/// Payloads that are not recognizable images are rejected before decoding is attempted.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ImageLoadError> {
    let format = sniff_image_format(bytes)?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|source| ImageLoadError::Decode { format, source })?
        .to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(ImageLoadError::Empty);
    }
    Ok(image)
}

/// Read and decode an image from disk.
///
/// # Arguments
///
/// * `path` - The path to the image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbaImage, ImageLoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ImageLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    decode_image(&bytes)
}

/// Resize a raster to exactly `width` x `height` (aspect is not preserved).
pub fn resize_exact(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    image::imageops::resize(image, width.max(1), height.max(1), FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn decodes_png_payload() {
        let decoded = decode_image(&png_bytes(5, 3)).expect("decode");
        assert_eq!(decoded.dimensions(), (5, 3));
    }

    #[test]
    fn rejects_text_payload() {
        let err = decode_image(b"hello, this is not an image").unwrap_err();
        assert!(matches!(err, ImageLoadError::NotAnImage));
    }

    #[test]
    fn rejects_truncated_png() {
        let bytes = png_bytes(16, 16);
        let err = decode_image(&bytes[..40]).unwrap_err();
        assert!(matches!(err, ImageLoadError::Decode { .. }));
    }

    #[test]
    fn missing_file_reports_io() {
        let err = load_image("definitely/not/here.png").unwrap_err();
        assert!(matches!(err, ImageLoadError::Io { .. }));
    }

    #[test]
    fn resize_exact_changes_dimensions() {
        let image = RgbaImage::new(40, 60);
        assert_eq!(resize_exact(&image, 4, 6).dimensions(), (4, 6));
    }
}
