//! Resize policy.
//!
//! Thumbnails always come out at exactly the requested size. The source is scaled so it
//! covers the target box, then the overflow is cropped evenly from both sides. Aspect ratio
//! is preserved and nothing is letterboxed.

use crate::error::ProcessingError;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Largest accepted side of a requested thumbnail. Caps the output buffer at about 1 GiB.
pub const MAX_TARGET_SIDE: u32 = 0x3FFF;

/// Requested output size. Both sides are between 1 and [`MAX_TARGET_SIDE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDimensions {
    width: u32,
    height: u32,
}

impl TargetDimensions {
    pub fn new(width: u32, height: u32) -> Result<Self, ProcessingError> {
        let side_ok = |side: u32| (1..=MAX_TARGET_SIDE).contains(&side);
        if !side_ok(width) || !side_ok(height) {
            return Err(ProcessingError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Scale `image` to cover `target` and crop the centre.
pub fn resize_to_cover(image: DynamicImage, target: TargetDimensions) -> DynamicImage {
    let wanted = (target.width, target.height);
    if image.dimensions() == wanted {
        return image;
    }

    let resized = image.resize_to_fill(target.width, target.height, RESIZE_FILTER);
    if resized.dimensions() == wanted {
        resized
    } else {
        // Rounding in the cover step can leave a one-pixel shortfall on extreme ratios.
        resized.resize_exact(target.width, target.height, RESIZE_FILTER)
    }
}
