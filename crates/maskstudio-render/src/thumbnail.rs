//! Gallery thumbnails.

use crate::error::{CompositeError, CompositeResult};
use image::codecs::jpeg::JpegEncoder;

/// Longest side of a gallery thumbnail.
pub const THUMBNAIL_MAX_SIDE: u32 = 300;

/// JPEG quality used for thumbnails.
pub const THUMBNAIL_QUALITY: u8 = 70;

/// Downscale `bytes` so neither side exceeds `max_side` and encode as JPEG.
///
/// Images already within bounds keep their size.
pub fn thumbnail(bytes: &[u8], max_side: u32) -> CompositeResult<Vec<u8>> {
    if bytes.is_empty() {
        return Err(CompositeError::MissingSourceImage);
    }
    if max_side == 0 {
        return Err(CompositeError::Allocation { width: 0, height: 0 });
    }

    let decoded = image::load_from_memory(bytes).map_err(|e| CompositeError::Decode(e.to_string()))?;
    let scaled = if decoded.width() > max_side || decoded.height() > max_side {
        decoded.thumbnail(max_side, max_side)
    } else {
        decoded
    };
    // JPEG has no alpha channel
    let rgb = scaled.to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, THUMBNAIL_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| {
            log::error!("Failed to encode thumbnail: {:?}", e);
            CompositeError::Encode(e.to_string())
        })?;
    Ok(out)
}
