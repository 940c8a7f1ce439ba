use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::{ImageError, Result};

/// Decode `data` when it is exactly the standard base64 encoding of some
/// byte string, which is checked by re-encoding the decoded bytes and
/// comparing with the input. Returns `None` for anything else, including
/// base64 variants with missing padding or foreign alphabets.
pub(crate) fn decode_canonical_base64(data: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(data).ok()?;
    let decoded = STANDARD.decode(text).ok()?;
    if STANDARD.encode(&decoded).as_bytes() == data {
        Some(decoded)
    } else {
        None
    }
}

/// Decode a byte buffer holding canonical base64 text, pass anything else
/// through untouched.
pub(crate) fn decode_if_base64(data: Vec<u8>) -> Vec<u8> {
    match decode_canonical_base64(&data) {
        Some(decoded) => decoded,
        None => data,
    }
}

/// Decode a value declared base64 by the caller. No round-trip check; a
/// decode failure is an input error.
pub(crate) fn decode_base64_strict(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| ImageError::InvalidInput(format!("invalid base64 image data: {e}")))
}

/// Encode resolved image bytes for transport.
///
/// With no size limit the bytes are base64-encoded untouched. With a limit
/// the bytes are decoded as an image, scaled down only when the longer side
/// exceeds the limit (aspect ratio preserved, the shorter side rounded
/// down), converted to RGB and re-encoded as JPEG before the base64 step.
/// The JPEG re-encode happens even when no scaling was needed, so setting a
/// limit also normalizes the output format and color space.
///
/// # Arguments
///
/// * `data` - Raw image bytes from a [`Resolver`](crate::Resolver)
/// * `max_image_size` - Upper bound for the longer image side in pixels
pub fn encode_image(data: &[u8], max_image_size: Option<u32>) -> Result<String> {
    let Some(limit) = max_image_size else {
        return Ok(STANDARD.encode(data));
    };
    let image = image::load_from_memory(data).map_err(|e| ImageError::Decode(e.to_string()))?;
    let (width, height) = (image.width(), image.height());
    let image = if width.max(height) > limit {
        let (new_width, new_height) = bounded_dimensions(width, height, limit);
        image.resize_exact(new_width, new_height, FilterType::CatmullRom)
    } else {
        image
    };
    Ok(STANDARD.encode(jpeg_bytes(image)?))
}

/// Scale `(width, height)` so the longer side equals `limit`, keeping the
/// aspect ratio and rounding the shorter side down.
fn bounded_dimensions(width: u32, height: u32, limit: u32) -> (u32, u32) {
    let aspect = f64::from(width) / f64::from(height);
    if width > height {
        (limit, (f64::from(limit) / aspect) as u32)
    } else {
        ((f64::from(limit) * aspect) as u32, limit)
    }
}

/// Serialize a decoded image to in-memory JPEG, converting to RGB first
/// since JPEG has no alpha channel.
pub(crate) fn jpeg_bytes(image: DynamicImage) -> Result<Vec<u8>> {
    let rgb = match image {
        DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    Ok(buffer.into_inner())
}
