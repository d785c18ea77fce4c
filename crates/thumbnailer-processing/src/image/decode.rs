//! Source decoding with shrink-on-load.
//!
//! The decoded source is only an intermediate on the way to a small thumbnail, so the common
//! formats are reduced while they are read:
//! - PNG (non-interlaced) is decoded row by row into a [`RowShrinker`].
//! - JPEG (8-bit grey or RGB) uses the decoder's DCT scaling (1/2, 1/4 or 1/8).
//!
//! Everything else (interlaced PNG, CMYK or 16-bit JPEG, GIF, WebP, BMP, TIFF) is decoded at
//! full size under [`decode_limits`]. Every path checks the header dimensions against
//! [`MAX_INPUT_PIXELS`] before any pixel data is read.

use super::resize::TargetDimensions;
use super::shrink::{image_from_samples, shrink_factor, RowShrinker};
use crate::error::ProcessingError;
use crate::spool::SpooledInput;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Limits};
use std::io::Read;

/// Largest accepted source, in pixels (16383 x 16383).
pub const MAX_INPUT_PIXELS: u64 = 0x3FFF * 0x3FFF;

/// Largest buffer a full-size decode may allocate: the pixel limit at 8-bit RGBA.
pub const MAX_DECODE_BYTES: u64 = MAX_INPUT_PIXELS * 4;

/// Limits applied to full-size decodes.
pub fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_alloc = Some(MAX_DECODE_BYTES);
    limits
}

/// Decode `spooled`, reducing it on the way when the format allows, so that the result
/// still covers `target`. Blocking.
pub(crate) fn decode_for_target(
    spooled: &SpooledInput,
    target: TargetDimensions,
) -> Result<DynamicImage, ProcessingError> {
    let sniffed = ImageReader::new(spooled.reader().map_err(ProcessingError::Spool)?)
        .with_guessed_format()
        .map_err(ProcessingError::Spool)?;
    let format = sniffed.format().ok_or(ProcessingError::UnsupportedFormat)?;
    drop(sniffed);

    let reader = spooled.reader().map_err(ProcessingError::Spool)?;
    let shrunk = match format {
        ImageFormat::Png => decode_png_rows(reader, target)?,
        ImageFormat::Jpeg => decode_jpeg_scaled(reader, target)?,
        _ => None,
    };

    let image = match shrunk {
        Some(image) => image,
        None => {
            tracing::debug!(format = ?format, "Decoding source at full size");
            decode_full(spooled)?
        }
    };

    tracing::debug!(
        format = ?format,
        decoded_width = image.width(),
        decoded_height = image.height(),
        "Source image decoded"
    );

    Ok(image)
}

fn check_input_pixels(width: u32, height: u32) -> Result<(), ProcessingError> {
    if u64::from(width) * u64::from(height) > MAX_INPUT_PIXELS {
        return Err(ProcessingError::InputTooLarge { width, height });
    }
    Ok(())
}

fn decode_error(err: impl std::fmt::Display) -> ProcessingError {
    ProcessingError::Decode(err.to_string())
}

/// Row-streamed PNG decode. `None` for interlaced files, whose rows arrive out of order.
fn decode_png_rows<R: Read>(
    reader: R,
    target: TargetDimensions,
) -> Result<Option<DynamicImage>, ProcessingError> {
    let mut decoder = png::Decoder::new(reader);
    // Palette, low bit depths and tRNS expand to 8-bit grey/RGB(A); 16-bit is stripped.
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info().map_err(decode_error)?;

    let (width, height, interlaced) = {
        let info = reader.info();
        (info.width, info.height, info.interlaced)
    };
    check_input_pixels(width, height)?;
    if interlaced {
        return Ok(None);
    }

    let (color_type, _) = reader.output_color_type();
    let factor = shrink_factor(width, height, target);
    let mut shrinker = RowShrinker::new(width, height, color_type.samples(), factor);

    while let Some(row) = reader.next_row().map_err(decode_error)? {
        shrinker.push_row(row.data());
    }

    shrinker.finish().map(Some)
}

/// JPEG decode with DCT scaling. `None` for pixel formats other than 8-bit grey and RGB.
fn decode_jpeg_scaled<R: Read>(
    reader: R,
    target: TargetDimensions,
) -> Result<Option<DynamicImage>, ProcessingError> {
    let mut decoder = jpeg_decoder::Decoder::new(reader);
    decoder.read_info().map_err(decode_error)?;
    let info = decoder
        .info()
        .ok_or_else(|| ProcessingError::Decode("JPEG header missing".to_string()))?;
    check_input_pixels(info.width.into(), info.height.into())?;

    let channels = match info.pixel_format {
        jpeg_decoder::PixelFormat::L8 => 1,
        jpeg_decoder::PixelFormat::RGB24 => 3,
        _ => return Ok(None),
    };

    let (width, height) = match cover_size(info.width, info.height, target) {
        Some((cover_width, cover_height)) => decoder
            .scale(cover_width, cover_height)
            .map_err(decode_error)?,
        None => (info.width, info.height),
    };

    let samples = decoder.decode().map_err(decode_error)?;
    image_from_samples(width.into(), height.into(), channels, samples).map(Some)
}

/// Smallest size with the source's aspect ratio that covers `target`, or `None` when the
/// source is not larger than that.
fn cover_size(width: u16, height: u16, target: TargetDimensions) -> Option<(u16, u16)> {
    let scale = f64::max(
        f64::from(target.width()) / f64::from(width),
        f64::from(target.height()) / f64::from(height),
    );
    if scale >= 1.0 {
        return None;
    }

    let side = |len: u16| (f64::from(len) * scale).ceil().clamp(1.0, f64::from(len)) as u16;
    Some((side(width), side(height)))
}

fn decode_full(spooled: &SpooledInput) -> Result<DynamicImage, ProcessingError> {
    let mut reader = ImageReader::new(spooled.reader().map_err(ProcessingError::Spool)?)
        .with_guessed_format()
        .map_err(ProcessingError::Spool)?;
    reader.limits(decode_limits());

    let decoder = reader.into_decoder().map_err(decode_error)?;
    let (width, height) = decoder.dimensions();
    check_input_pixels(width, height)?;
    if decoder.total_bytes() > MAX_DECODE_BYTES {
        return Err(ProcessingError::InputTooLarge { width, height });
    }

    DynamicImage::from_decoder(decoder).map_err(decode_error)
}
