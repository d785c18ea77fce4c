//! Shrink-on-load.
//!
//! A box filter that consumes decoded rows one at a time and keeps only the reduced image.
//! It is fed straight from a row decoder, so the full-resolution source is never held in
//! memory. The reduction factor is an integer chosen so the result still covers the target;
//! the final Lanczos pass in `resize` then works on a small image.

use super::resize::TargetDimensions;
use crate::error::ProcessingError;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

/// Largest integer factor that keeps both sides at or above the target.
pub(crate) fn shrink_factor(width: u32, height: u32, target: TargetDimensions) -> u32 {
    (width / target.width()).min(height / target.height()).max(1)
}

/// Averages `factor` x `factor` blocks of interleaved 8-bit samples.
pub(crate) struct RowShrinker {
    width: usize,
    channels: usize,
    factor: usize,
    out_width: usize,
    sums: Vec<u64>,
    rows_pending: usize,
    out: Vec<u8>,
}

impl RowShrinker {
    pub(crate) fn new(width: u32, height: u32, channels: usize, factor: u32) -> Self {
        let width = width as usize;
        let factor = factor.max(1) as usize;
        let out_width = width.div_ceil(factor);
        let out_height = (height as usize).div_ceil(factor);

        Self {
            width,
            channels,
            factor,
            out_width,
            sums: vec![0; out_width * channels],
            rows_pending: 0,
            out: Vec::with_capacity(out_width * out_height * channels),
        }
    }

    pub(crate) fn push_row(&mut self, row: &[u8]) {
        let channels = self.channels;
        for (x, pixel) in row.chunks_exact(channels).take(self.width).enumerate() {
            let base = (x / self.factor) * channels;
            for (sum, sample) in self.sums[base..base + channels].iter_mut().zip(pixel) {
                *sum += u64::from(*sample);
            }
        }

        self.rows_pending += 1;
        if self.rows_pending == self.factor {
            self.emit_row();
        }
    }

    fn emit_row(&mut self) {
        for out_x in 0..self.out_width {
            // The last column block is narrower when the width is not a multiple of the factor.
            let columns = (self.width - out_x * self.factor).min(self.factor);
            let count = (columns * self.rows_pending) as u64;
            let base = out_x * self.channels;

            for sum in &mut self.sums[base..base + self.channels] {
                self.out.push(((*sum + count / 2) / count) as u8);
                *sum = 0;
            }
        }
        self.rows_pending = 0;
    }

    pub(crate) fn finish(mut self) -> Result<DynamicImage, ProcessingError> {
        if self.rows_pending > 0 {
            self.emit_row();
        }

        let width = self.out_width as u32;
        let height = (self.out.len() / (self.out_width * self.channels).max(1)) as u32;
        image_from_samples(width, height, self.channels, self.out)
    }
}

/// Wrap interleaved 8-bit samples with 1 to 4 channels.
pub(crate) fn image_from_samples(
    width: u32,
    height: u32,
    channels: usize,
    samples: Vec<u8>,
) -> Result<DynamicImage, ProcessingError> {
    let image = match channels {
        1 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        2 => GrayAlphaImage::from_raw(width, height, samples).map(DynamicImage::ImageLumaA8),
        3 => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, samples).map(DynamicImage::ImageRgba8),
        _ => None,
    };

    image.ok_or_else(|| {
        ProcessingError::Decode(format!(
            "decoded samples do not match a {}x{} image with {} channels",
            width, height, channels
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn target(width: u32, height: u32) -> TargetDimensions {
        TargetDimensions::new(width, height).unwrap()
    }

    #[test]
    fn test_factor_keeps_cover() {
        assert_eq!(shrink_factor(8000, 8000, target(32, 32)), 250);
        assert_eq!(shrink_factor(1000, 100, target(32, 32)), 3);
        assert_eq!(shrink_factor(10, 10, target(64, 64)), 1);
    }

    #[test]
    fn test_averages_blocks() {
        let mut shrinker = RowShrinker::new(4, 2, 1, 2);
        shrinker.push_row(&[0, 10, 100, 200]);
        shrinker.push_row(&[20, 30, 100, 201]);

        let out = shrinker.finish().unwrap();
        assert_eq!(out.dimensions(), (2, 1));
        assert_eq!(out.as_bytes(), &[15, 150]);
    }

    #[test]
    fn test_partial_edge_blocks() {
        // 5x3 RGBA, factor 2: the last column and row blocks hold fewer pixels.
        let mut shrinker = RowShrinker::new(5, 3, 4, 2);
        for _ in 0..3 {
            shrinker.push_row(&[50; 5 * 4]);
        }

        let out = shrinker.finish().unwrap();
        assert_eq!(out.dimensions(), (3, 2));
        assert!(out.color().has_alpha());
        assert!(out.as_bytes().iter().all(|&v| v == 50));
    }

    #[test]
    fn test_factor_one_is_identity() {
        let rows: [[u8; 6]; 2] = [[1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12]];
        let mut shrinker = RowShrinker::new(2, 2, 3, 1);
        for row in &rows {
            shrinker.push_row(row);
        }

        let out = shrinker.finish().unwrap();
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.as_bytes(), rows.concat().as_slice());
    }

    #[test]
    fn test_mismatched_samples_rejected() {
        assert!(matches!(
            image_from_samples(4, 4, 3, vec![0; 10]),
            Err(ProcessingError::Decode(_))
        ));
    }
}
