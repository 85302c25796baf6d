use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

pub(crate) fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

pub(crate) fn png_bytes(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    let mut buf = Vec::new();
    solid(width, height, color)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}
