use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use thumbnailer_core::{BucketPair, InvocationEvent, ObjectSpec};

use super::{INPUT_BUCKET, OUTPUT_BUCKET};

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), format)
        .expect("Failed to encode fixture");
    buf
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 96])
    })
}

pub fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Jpeg)
}

pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Png)
}

pub fn transparent_png_fixture(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 0]))),
        ImageFormat::Png,
    )
}

pub fn event(key: &str, width: u32, height: u32) -> InvocationEvent {
    InvocationEvent {
        bucket: BucketPair {
            input: INPUT_BUCKET.to_string(),
            output: OUTPUT_BUCKET.to_string(),
        },
        object: ObjectSpec {
            key: key.to_string(),
            width,
            height,
        },
    }
}
