use image::{DynamicImage, GenericImageView, ImageFormat, ImageResult};
use std::io::Cursor;

/// Longest edge of a gallery thumbnail.
pub const THUMBNAIL_MAX: u32 = 512;

/// Encoded PNG bytes together with their pixel dimensions.
#[derive(Debug, Clone)]
pub struct PngImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub fn decode(data: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory(data)
}

pub fn encode_png(img: &DynamicImage) -> ImageResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Re-encodes any decodable image as PNG. Callers decide what to do with
/// undecodable input; nothing here falls back silently.
pub fn normalize_to_png(data: &[u8]) -> ImageResult<PngImage> {
    let img = decode(data)?;
    if image::guess_format(data).ok() == Some(ImageFormat::Png) {
        let (width, height) = img.dimensions();
        return Ok(PngImage {
            bytes: data.to_vec(),
            width,
            height,
        });
    }
    to_png(&img)
}

pub fn to_png(img: &DynamicImage) -> ImageResult<PngImage> {
    let (width, height) = img.dimensions();
    Ok(PngImage {
        bytes: encode_png(img)?,
        width,
        height,
    })
}

/// Fit-inside thumbnail: aspect preserved, never enlarged.
pub fn create_thumbnail(data: &[u8], max: u32) -> ImageResult<PngImage> {
    let img = decode(data)?;
    let (w, h) = img.dimensions();
    let thumb = if w <= max && h <= max {
        img
    } else {
        img.resize(max, max, image::imageops::FilterType::Lanczos3)
    };
    to_png(&thumb)
}

/// True when at least one pixel is not fully opaque.
pub fn has_transparency(img: &DynamicImage) -> bool {
    if !img.color().has_alpha() {
        return false;
    }
    img.to_rgba8().pixels().any(|p| p.0[3] < 255)
}

pub fn mime_for_format(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        _ => "application/octet-stream",
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        _ => "bin",
    }
}
