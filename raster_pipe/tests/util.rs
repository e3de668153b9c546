// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utility functions shared across different tests.

use raster_pipe::raster_pipe_common::format::FormatExt;
use raster_pipe::raster_pipe_common::gradient::GradientLut;
use raster_pipe::raster_pipe_common::peniko::{Color, ColorStop};
use raster_pipe::{Image, RasterContext};

pub(crate) const BLUE: u32 = 0xFF00_00FF;
pub(crate) const GREEN: u32 = 0xFF00_FF00;
pub(crate) const RED: u32 = 0xFFFF_0000;

/// A `PRGB32` context whose pixels are all `fill`.
pub(crate) fn get_ctx(width: u32, height: u32, fill: u32) -> RasterContext {
    let pixels = vec![fill; width as usize * height as usize];
    let image = Image::from_pixels(&pixels, width, height, FormatExt::Prgb32).unwrap();
    RasterContext::new(image)
}

/// A transparent `A8` context.
pub(crate) fn get_a8_ctx(width: u32, height: u32) -> RasterContext {
    RasterContext::new(Image::new(width, height, FormatExt::A8).unwrap())
}

/// A single row `PRGB32` image.
pub(crate) fn row_image(pixels: &[u32]) -> Image {
    Image::from_pixels(pixels, pixels.len() as u32, 1, FormatExt::Prgb32).unwrap()
}

pub(crate) fn row(ctx: &RasterContext, y: u32) -> Vec<u32> {
    let image = ctx.image();
    (0..image.width()).map(|x| image.pixel(x, y)).collect()
}

pub(crate) fn stop(offset: f32, r: u8, g: u8, b: u8, a: u8) -> ColorStop {
    ColorStop {
        offset,
        color: Color::rgba8(r, g, b, a),
    }
}

/// An opaque black to white ramp that maps entry `i` to gray level `i`.
pub(crate) fn gray_lut() -> GradientLut {
    GradientLut::from_stops(&[stop(0.0, 0, 0, 0, 255), stop(1.0, 255, 255, 255, 255)], 256)
}
