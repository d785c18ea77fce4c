use crate::error::ProcessingError;
use image::{DynamicImage, GenericImageView};
use std::borrow::Cow;
use std::io::{self, Write};

/// Encode `image` as an 8-bit PNG into `sink`, row by row.
///
/// Compressed data leaves the encoder in IDAT chunks of `idat_size` bytes as it is
/// produced. Images with an alpha channel keep it; everything else becomes RGB or grey.
pub(crate) fn encode<W: Write>(
    image: &DynamicImage,
    sink: W,
    idat_size: usize,
) -> Result<(), ProcessingError> {
    let (width, height) = image.dimensions();
    let (color, pixels) = pixel_layout(image);
    let row_len = width as usize * color.samples();

    let mut encoder = png::Encoder::new(sink, width, height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header().map_err(encoding_error)?;
    {
        let mut stream = writer
            .stream_writer_with_size(idat_size.max(1))
            .map_err(encoding_error)?;
        for row in pixels.chunks(row_len) {
            stream.write_all(row).map_err(io_error)?;
        }
        stream.finish().map_err(encoding_error)?;
    }
    writer.finish().map_err(encoding_error)
}

fn pixel_layout(image: &DynamicImage) -> (png::ColorType, Cow<'_, [u8]>) {
    match image {
        DynamicImage::ImageLuma8(buf) => (
            png::ColorType::Grayscale,
            Cow::Borrowed(buf.as_raw().as_slice()),
        ),
        DynamicImage::ImageLumaA8(buf) => (
            png::ColorType::GrayscaleAlpha,
            Cow::Borrowed(buf.as_raw().as_slice()),
        ),
        DynamicImage::ImageRgb8(buf) => (png::ColorType::Rgb, Cow::Borrowed(buf.as_raw().as_slice())),
        DynamicImage::ImageRgba8(buf) => (
            png::ColorType::Rgba,
            Cow::Borrowed(buf.as_raw().as_slice()),
        ),
        other if other.color().has_alpha() => (
            png::ColorType::Rgba,
            Cow::Owned(other.to_rgba8().into_raw()),
        ),
        other => (png::ColorType::Rgb, Cow::Owned(other.to_rgb8().into_raw())),
    }
}

fn io_error(err: io::Error) -> ProcessingError {
    if err.kind() == io::ErrorKind::BrokenPipe {
        ProcessingError::OutputClosed
    } else {
        ProcessingError::Encode(err.to_string())
    }
}

fn encoding_error(err: png::EncodingError) -> ProcessingError {
    match err {
        png::EncodingError::IoError(e) => io_error(e),
        other => ProcessingError::Encode(other.to_string()),
    }
}
