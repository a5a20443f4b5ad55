use std::io::Cursor;

use base64::Engine as _;

use crate::errors::PhoneClawResult;
use crate::perception::types::Screenshot;

/// Wraps encoded image bytes, reading the geometry from the image header.
pub fn from_image_bytes(bytes: &[u8]) -> PhoneClawResult<Screenshot> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(Screenshot {
        base64_data: base64::engine::general_purpose::STANDARD.encode(bytes),
        width,
        height,
        is_fallback: false,
        is_sensitive: false,
    })
}

/// Solid black PNG standing in for a capture that could not be taken.
pub fn fallback(width: u32, height: u32, is_sensitive: bool) -> PhoneClawResult<Screenshot> {
    let canvas = image::RgbImage::new(width, height);
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(canvas)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)?;
    Ok(Screenshot {
        base64_data: base64::engine::general_purpose::STANDARD.encode(&out),
        width,
        height,
        is_fallback: true,
        is_sensitive,
    })
}
