//! Heap usage of the resize stage on large sources.
//!
//! The whole binary runs on dhat's allocator so the heap peak of one transform can be
//! measured. Fixtures are built before profiling starts; only the transform is counted.
//! dhat allows one profiler at a time, so this file holds a single test.

use bytes::Bytes;
use futures::StreamExt;
use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Write};
use thumbnailer_processing::{ProcessingError, ResizeStage};
use thumbnailer_storage::{ByteStream, StorageError};

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

const PNG_SIDE: u32 = 4096;
const JPEG_SIDE: u32 = 3072;
const CHUNK: usize = 64 * 1024;

/// RGB gradient PNG written row by row, so the fixture itself never needs a full frame.
fn large_png(side: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, side, side);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        let mut writer = encoder.write_header().unwrap();
        let mut stream = writer.stream_writer().unwrap();

        let mut row = vec![0u8; side as usize * 3];
        for y in 0..side {
            for (x, pixel) in row.chunks_exact_mut(3).enumerate() {
                pixel.copy_from_slice(&[(x % 256) as u8, (y % 256) as u8, 128]);
            }
            stream.write_all(&row).unwrap();
        }
        stream.finish().unwrap();
    }
    out
}

fn large_jpeg(side: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(side, side, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
        .unwrap();
    out
}

fn chunks(data: &[u8]) -> Vec<Result<Bytes, StorageError>> {
    data.chunks(CHUNK)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect()
}

async fn thumbnail(
    input: Vec<Result<Bytes, StorageError>>,
    side: u32,
) -> Result<Vec<u8>, ProcessingError> {
    let stream: ByteStream = Box::pin(futures::stream::iter(input));
    let mut output = ResizeStage::new(side, side)?.apply(stream);

    let mut png = Vec::new();
    while let Some(chunk) = output.next().await {
        png.extend_from_slice(&chunk?);
    }
    Ok(png)
}

#[test]
fn test_large_sources_resized_without_full_decode() {
    let png_input = chunks(&large_png(PNG_SIDE));
    let jpeg_input = chunks(&large_jpeg(JPEG_SIDE));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let _profiler = dhat::Profiler::builder().testing().build();

    let png = runtime.block_on(thumbnail(png_input, 32)).unwrap();
    let png_peak = dhat::HeapStats::get().max_bytes;
    let png_decoded = (PNG_SIDE * PNG_SIDE * 3) as usize;
    dhat::assert!(
        png_peak < png_decoded / 8,
        "PNG peak {} bytes vs {} bytes decoded",
        png_peak,
        png_decoded
    );

    let jpeg = runtime.block_on(thumbnail(jpeg_input, 32)).unwrap();
    let jpeg_peak = dhat::HeapStats::get().max_bytes;
    let jpeg_decoded = (JPEG_SIDE * JPEG_SIDE * 3) as usize;
    dhat::assert!(
        jpeg_peak < jpeg_decoded / 4,
        "JPEG peak {} bytes vs {} bytes decoded",
        jpeg_peak,
        jpeg_decoded
    );

    for output in [png, jpeg] {
        let thumb = image::load_from_memory(&output).unwrap();
        assert_eq!(thumb.dimensions(), (32, 32));
    }
}
