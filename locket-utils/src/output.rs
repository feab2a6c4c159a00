//! Encoders for finished print sheets and preview thumbnails.
//!
//! This module centralizes PNG/JPEG/PDF encoding so every delivery channel receives the same
//! bytes. PNG output records the print resolution in a `pHYs` chunk; PDF output places the
//! bleed-inclusive sheet on a trim-sized page.

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use crc32fast::Hasher as Crc32;
use image::{
    ExtendedColorType, ImageEncoder, RgbaImage,
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
    },
};
use log::{debug, warn};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const POINTS_PER_INCH: f32 = 72.0;
const METERS_PER_INCH: f64 = 0.0254;

/// Simplified PNG compression strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngCompression {
    Fast,
    Default,
    Best,
}

impl PngCompression {
    /// Parse compression string/level into a compression strategy.
    pub fn parse(input: &str) -> Self {
        let normalized = input.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "fast" => Self::Fast,
            "best" => Self::Best,
            "default" => Self::Default,
            _ => {
                if let Ok(level) = normalized.parse::<u8>() {
                    match level {
                        0..=3 => Self::Fast,
                        7..=9 => Self::Best,
                        _ => Self::Default,
                    }
                } else {
                    warn!(
                        "Unknown PNG compression '{}', falling back to default strategy",
                        input
                    );
                    Self::Default
                }
            }
        }
    }

    fn into_image(self) -> CompressionType {
        match self {
            Self::Fast => CompressionType::Fast,
            Self::Default => CompressionType::Default,
            Self::Best => CompressionType::Best,
        }
    }
}

/// Encode an RGBA raster to PNG, tagging it with `dpi` when provided.
pub fn encode_png(
    image: &RgbaImage,
    compression: PngCompression,
    dpi: Option<u32>,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let encoder = PngEncoder::new_with_quality(
            &mut buffer,
            compression.into_image(),
            FilterType::Adaptive,
        );
        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .context("failed to encode PNG")?;
    }

    match dpi.filter(|&dpi| dpi > 0) {
        Some(dpi) => Ok(inject_png_chunk(buffer, &build_phys_chunk(dpi))),
        None => Ok(buffer),
    }
}

/// Encode an RGBA raster to baseline JPEG, dropping alpha.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut buffer = Vec::new();
    {
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .context("failed to encode JPEG")?;
    }
    Ok(buffer)
}

/// Wrap encoded bytes in a `data:` URL.
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

/// Base64 payload without any data-URL prefix, as handed to native file sinks.
pub fn base64_payload(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Physical page description for PDF output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPage {
    /// Trim width in inches; the page is exactly this wide.
    pub trim_width_in: f32,
    /// Trim height in inches; the page is exactly this tall.
    pub trim_height_in: f32,
    /// Bleed carried by the raster on every edge, in inches.
    pub bleed_in: f32,
}

/// Encode a single-page PDF with `image` placed full-bleed.
///
/// The page is sized to the trim. The raster is drawn at trim + bleed and shifted by the
/// bleed, so the bleed band falls outside the page and no margin is visible.
pub fn encode_pdf(image: &RgbaImage, page: PdfPage) -> Result<Vec<u8>> {
    anyhow::ensure!(
        image.width() > 0 && image.height() > 0,
        "cannot embed an empty raster in a PDF"
    );

    let page_w = page.trim_width_in * POINTS_PER_INCH;
    let page_h = page.trim_height_in * POINTS_PER_INCH;
    let bleed = page.bleed_in.max(0.0) * POINTS_PER_INCH;
    let image_w = page_w + 2.0 * bleed;
    let image_h = page_h + 2.0 * bleed;

    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(i64::from(width)),
            "Height" => Object::Integer(i64::from(height)),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
        },
        rgb.into_raw(),
    );
    image_stream
        .compress()
        .context("failed to compress PDF image stream")?;
    let image_id = doc.add_object(image_stream);

    let content = format!(
        "q\n{image_w:.4} 0 0 {image_h:.4} {offset:.4} {offset:.4} cm\n/Sheet Do\nQ\n",
        offset = -bleed
    );
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let page_box = || {
        vec![
            Object::from(0.0_f32),
            Object::from(0.0_f32),
            Object::from(page_w),
            Object::from(page_h),
        ]
    };
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => page_box(),
        "TrimBox" => page_box(),
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Sheet" => image_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).context("failed to serialize PDF")?;
    debug!(
        "Encoded {}x{} raster into {:.1}x{:.1}pt PDF ({} bytes)",
        width,
        height,
        page_w,
        page_h,
        buffer.len()
    );
    Ok(buffer)
}

/// Build a `pHYs` chunk declaring `dpi` in pixels per metre.
fn build_phys_chunk(dpi: u32) -> Vec<u8> {
    let ppm = (f64::from(dpi) / METERS_PER_INCH).round() as u32;
    let mut data = Vec::with_capacity(9);
    data.extend_from_slice(&ppm.to_be_bytes());
    data.extend_from_slice(&ppm.to_be_bytes());
    data.push(1);
    build_png_chunk(b"pHYs", &data)
}

fn build_png_chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(12 + data.len());
    chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
    chunk.extend_from_slice(kind);
    chunk.extend_from_slice(data);

    let mut hasher = Crc32::new();
    hasher.update(kind);
    hasher.update(data);
    chunk.extend_from_slice(&hasher.finalize().to_be_bytes());
    chunk
}

/// Insert `chunk` directly after IHDR. Malformed input is returned untouched.
fn inject_png_chunk(encoded: Vec<u8>, chunk: &[u8]) -> Vec<u8> {
    if encoded.len() < 16 || &encoded[..8] != PNG_SIGNATURE {
        return encoded;
    }
    let cursor = 8usize;
    let ihdr_length = u32::from_be_bytes([
        encoded[cursor],
        encoded[cursor + 1],
        encoded[cursor + 2],
        encoded[cursor + 3],
    ]) as usize;
    let ihdr_end = cursor + 8 + ihdr_length + 4;
    if ihdr_end > encoded.len() {
        return encoded;
    }

    let mut output = Vec::with_capacity(encoded.len() + chunk.len());
    output.extend_from_slice(&encoded[..ihdr_end]);
    output.extend_from_slice(chunk);
    output.extend_from_slice(&encoded[ihdr_end..]);
    output
}

/// Write bytes to disk, creating the parent directory when needed.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}
