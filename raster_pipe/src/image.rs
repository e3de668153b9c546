// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use raster_pipe_common::fetch::PatternSource;
use raster_pipe_common::format::FormatExt;

use crate::dispatch::DstBuffer;
use crate::error::{PipelineError, Result};
use crate::pixel::load_src;

/// An owned raster with tightly packed rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    format: FormatExt,
    data: Vec<u8>,
}

impl Image {
    /// A transparent image.
    ///
    /// Only `PRGB32`, `XRGB32` and `A8` images can be rendered to.
    pub fn new(width: u32, height: u32, format: FormatExt) -> Result<Self> {
        if !matches!(format, FormatExt::Prgb32 | FormatExt::Xrgb32 | FormatExt::A8) {
            return Err(PipelineError::UnsupportedFormat(format));
        }
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Ok(Self {
            width,
            height,
            format,
            data: vec![0; len],
        })
    }

    /// An image holding `pixels`, which are native endian 32-bit words in rows of `width`.
    pub fn from_pixels(pixels: &[u32], width: u32, height: u32, format: FormatExt) -> Result<Self> {
        if !matches!(format, FormatExt::Prgb32 | FormatExt::Xrgb32) {
            return Err(PipelineError::UnsupportedFormat(format));
        }
        if pixels.len() != width as usize * height as usize {
            return Err(PipelineError::InvalidBuffer);
        }
        Ok(Self {
            width,
            height,
            format,
            data: bytemuck::cast_slice(pixels).to_vec(),
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format.
    pub fn format(&self) -> FormatExt {
        self.format
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// All rows.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// All rows, mutably.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes of row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        &self.data[y as usize * stride..][..stride]
    }

    /// Pixel `x, y` as premultiplied ARGB32. `A8` values are replicated into every channel.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        load_src(self.format, self.row(y), x as usize)
    }

    /// Every pixel, row by row, as returned by [`Image::pixel`].
    pub fn pixels(&self) -> Vec<u32> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .map(|(x, y)| self.pixel(x, y))
            .collect()
    }

    /// The image as the source of a pattern.
    pub fn as_pattern(&self) -> PatternSource<'_> {
        PatternSource {
            pixels: &self.data,
            stride: self.stride(),
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }

    /// The image as a render target.
    pub fn dst_buffer(&mut self) -> Result<DstBuffer<'_>> {
        let (stride, width, height, format) = (self.stride(), self.width, self.height, self.format);
        DstBuffer::new(&mut self.data, stride, width, height, format)
    }
}
