use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::path::Path;

use crate::errors::{AppError, AppResult};

/// Encoder quality for the rendered copy.
pub const JPEG_QUALITY: u8 = 75;

/// Dimension limits the rendered photo must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeBounds {
    pub max_dimension: u32,
    pub min_dimension: u32,
}

/// JPEG bytes ready for upload. Dropping it releases the buffer.
#[derive(Debug)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl EncodedImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Work out the output size for an image of `width` x `height`.
///
/// Oversized images are scaled down so the longer side equals
/// `max_dimension` exactly and the shorter side is truncated. Undersized images are stretched to a
/// `min_dimension` square, which does not keep the aspect ratio.
pub fn target_dimensions(width: u32, height: u32, bounds: ResizeBounds) -> (u32, u32) {
    let longest = width.max(height);
    let shortest = width.min(height);

    if longest > bounds.max_dimension {
        let max = bounds.max_dimension;
        let scale = |side: u32| {
            if side == longest {
                max
            } else {
                let scaled = u64::from(side) * u64::from(max) / u64::from(longest);
                (scaled as u32).max(1)
            }
        };
        (scale(width), scale(height))
    } else if shortest < bounds.min_dimension {
        // TODO: decide with users whether the square stretch should keep aspect ratio
        (bounds.min_dimension, bounds.min_dimension)
    } else {
        (width, height)
    }
}

/// Decode `file_path`, fit it into `bounds` and re-encode it as JPEG.
pub fn normalize(file_path: &Path, bounds: ResizeBounds) -> AppResult<EncodedImage> {
    let display_path = file_path.to_string_lossy();
    let img = load_image(file_path)?;

    let (width, height) = (img.width(), img.height());
    let (target_width, target_height) = target_dimensions(width, height, bounds);

    let img = if (target_width, target_height) != (width, height) {
        log::debug!(
            "Resizing {} from {}x{} to {}x{}",
            display_path,
            width,
            height,
            target_width,
            target_height
        );
        img.resize_exact(target_width, target_height, FilterType::Lanczos3)
    } else {
        img
    };

    let bytes = encode_jpeg(&img)?;

    Ok(EncodedImage {
        bytes,
        width: img.width(),
        height: img.height(),
    })
}

fn load_image(file_path: &Path) -> AppResult<DynamicImage> {
    let display_path = file_path.to_string_lossy();

    let reader = ImageReader::open(file_path)?.with_guessed_format()?;
    if reader.format().is_none() {
        return Err(AppError::unsupported_format(&display_path));
    }

    reader.decode().map_err(|e| {
        log::debug!("Decoding {} failed: {}", display_path, e);
        AppError::unsupported_format(&display_path)
    })
}

fn encode_jpeg(img: &DynamicImage) -> AppResult<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();

    let mut output = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY);
        encoder.encode_image(&rgb)?;
    }

    Ok(output)
}
