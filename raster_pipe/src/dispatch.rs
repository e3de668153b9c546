// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline assembly and the callbacks a runtime hands out for a signature.
//!
//! A [`Pipeline`] is the decoded part tree of a [`Signature`]: one fill part driving one
//! compositor, which reads its source from one fetch part. A [`DispatchData`] pairs it with
//! the functions that run it over a [`ContextData`].

use core::fmt;

use raster_pipe_common::compop::CompOpExt;
use raster_pipe_common::fetch::FetchData;
use raster_pipe_common::fill::{BoxI, FillData};
use raster_pipe_common::format::FormatExt;
use raster_pipe_common::signature::{FetchType, FillType, Signature};

use crate::compositor::Compositor;
use crate::error::{PipelineError, Result};
use crate::fetch::Fetcher;
use crate::fill;
use crate::pixel::{DstFormat, Prgb32, Xrgb32, A8};

/// Mutable view of destination pixel rows.
///
/// The view may start at a row other than zero, in which case fills still address rows by
/// their index in the whole image.
#[derive(Debug)]
pub struct DstBuffer<'a> {
    data: &'a mut [u8],
    stride: usize,
    width: u32,
    height: u32,
    format: FormatExt,
    y_offset: i32,
}

impl<'a> DstBuffer<'a> {
    /// Wrap `height` rows of `width` pixels, each row starting `stride` bytes after the previous.
    pub fn new(
        data: &'a mut [u8],
        stride: usize,
        width: u32,
        height: u32,
        format: FormatExt,
    ) -> Result<Self> {
        if !is_dst_format(format) {
            return Err(PipelineError::UnsupportedFormat(format));
        }
        let row_bytes = width as usize * format.bytes_per_pixel();
        if stride < row_bytes {
            return Err(PipelineError::InvalidBuffer);
        }
        if height > 0 && data.len() < stride * (height as usize - 1) + row_bytes {
            return Err(PipelineError::InvalidBuffer);
        }
        Ok(Self {
            data,
            stride,
            width,
            height,
            format,
            y_offset: 0,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in this view.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format of the rows.
    pub fn format(&self) -> FormatExt {
        self.format
    }

    /// Bytes from one row to the next.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Rows of the image this view covers.
    pub fn rows(&self) -> core::ops::Range<i32> {
        self.y_offset..self.y_offset + self.height as i32
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Whether a fill with `bounds` stays inside the view.
    pub(crate) fn contains(&self, bounds: BoxI) -> bool {
        let rows = self.rows();
        bounds.x0 >= 0
            && bounds.x1 <= self.width as i32
            && bounds.y0 >= rows.start
            && bounds.y1 <= rows.end
    }

    /// Pixels of image row `y`.
    #[inline]
    pub(crate) fn row_mut(&mut self, y: i32) -> &mut [u8] {
        debug_assert!(self.rows().contains(&y), "row {y} is outside of {:?}", self.rows());
        let start = (y - self.y_offset) as usize * self.stride;
        let len = self.row_bytes();
        &mut self.data[start..start + len]
    }

    /// Split the view into disjoint bands of `band_height` rows.
    #[cfg(feature = "multithreading")]
    pub(crate) fn bands(&mut self, band_height: u32) -> Vec<DstBuffer<'_>> {
        let band_height = band_height.max(1);
        let (stride, width, format) = (self.stride, self.width, self.format);
        let mut y = self.y_offset;
        let mut left = self.height;
        self.data
            .chunks_mut(stride * band_height as usize)
            .take(self.height.div_ceil(band_height) as usize)
            .map(|data| {
                let height = band_height.min(left);
                let band = DstBuffer {
                    data,
                    stride,
                    width,
                    height,
                    format,
                    y_offset: y,
                };
                y += height as i32;
                left -= height;
                band
            })
            .collect()
    }
}

fn is_dst_format(format: FormatExt) -> bool {
    matches!(format, FormatExt::Prgb32 | FormatExt::Xrgb32 | FormatExt::A8)
}

/// Per-call state of a render target.
#[derive(Debug)]
pub struct ContextData<'a> {
    /// Destination rows.
    pub dst: DstBuffer<'a>,
    /// Offset of the destination in the whole render target, which anchors dithering.
    pub pixel_origin: (i32, i32),
}

impl<'a> ContextData<'a> {
    /// Context data for `dst` with the origin at zero.
    pub fn new(dst: DstBuffer<'a>) -> Self {
        Self {
            dst,
            pixel_origin: (0, 0),
        }
    }
}

/// The parts of a pipeline, decoded from its signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pipeline {
    signature: Signature,
    dst_format: FormatExt,
    src_format: FormatExt,
    comp_op: CompOpExt,
    fill_type: FillType,
    fetch_type: FetchType,
}

impl Pipeline {
    /// Decode `signature`.
    ///
    /// Signatures with the pending flag don't describe a pipeline, and every field has to hold
    /// a valid id. A fill type of [`FillType::None`] can't be run either.
    pub fn new(signature: Signature) -> Result<Self> {
        if signature.is_pending() {
            return Err(PipelineError::Pending(signature));
        }
        let invalid = PipelineError::InvalidSignature(signature);
        let (Some(dst_format), Some(src_format), Some(comp_op), Some(fill_type), Some(fetch_type)) = (
            signature.dst_format(),
            signature.src_format(),
            signature.comp_op(),
            signature.fill_type(),
            signature.fetch_type(),
        ) else {
            return Err(invalid);
        };
        if fill_type == FillType::None {
            return Err(invalid);
        }
        Ok(Self {
            signature,
            dst_format,
            src_format,
            comp_op,
            fill_type,
            fetch_type,
        })
    }

    /// The signature this pipeline was assembled for.
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Destination format.
    pub fn dst_format(&self) -> FormatExt {
        self.dst_format
    }

    /// Source format.
    pub fn src_format(&self) -> FormatExt {
        self.src_format
    }

    /// Operator of the compositor.
    pub fn comp_op(&self) -> CompOpExt {
        self.comp_op
    }

    /// Fill part.
    pub fn fill_type(&self) -> FillType {
        self.fill_type
    }

    /// Fetch part.
    pub fn fetch_type(&self) -> FetchType {
        self.fetch_type
    }
}

/// Runs a pipeline over the fill and fetch descriptors.
pub type FillFunc = for<'a, 'b, 'c> fn(
    &Pipeline,
    &mut ContextData<'a>,
    &mut FillData<'b>,
    &FetchData<'c>,
) -> Result<()>;

/// Prepares a fetch before the fill runs.
pub type FetchFunc =
    for<'a, 'b, 'c> fn(&Pipeline, &mut ContextData<'a>, &FillData<'b>, &FetchData<'c>);

/// What a runtime returns for a signature.
#[derive(Clone, Copy)]
pub struct DispatchData {
    /// Runs the fill.
    pub fill_func: FillFunc,
    /// Runs before [`fill_func`](Self::fill_func), if set.
    pub fetch_func: Option<FetchFunc>,
    /// The assembled parts.
    pub pipeline: Pipeline,
}

impl DispatchData {
    /// The signature the pipeline was assembled for.
    pub fn signature(&self) -> Signature {
        self.pipeline.signature
    }

    /// Run the pipeline.
    pub fn run(
        &self,
        ctx: &mut ContextData<'_>,
        fill: &mut FillData<'_>,
        fetch: &FetchData<'_>,
    ) -> Result<()> {
        if let Some(fetch_func) = self.fetch_func {
            fetch_func(&self.pipeline, ctx, fill, fetch);
        }
        (self.fill_func)(&self.pipeline, ctx, fill, fetch)
    }
}

impl fmt::Debug for DispatchData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchData")
            .field("pipeline", &self.pipeline)
            .field("fetch_func", &self.fetch_func.is_some())
            .finish_non_exhaustive()
    }
}

/// The reference fill function for destinations of `format`.
pub(crate) fn static_fill_func(format: FormatExt) -> Option<FillFunc> {
    match format {
        FormatExt::Prgb32 => Some(fill_static::<Prgb32>),
        FormatExt::Xrgb32 => Some(fill_static::<Xrgb32>),
        FormatExt::A8 => Some(fill_static::<A8>),
        _ => None,
    }
}

fn fill_static<D: DstFormat>(
    pipeline: &Pipeline,
    ctx: &mut ContextData<'_>,
    fill: &mut FillData<'_>,
    fetch: &FetchData<'_>,
) -> Result<()> {
    let invalid = PipelineError::InvalidSignature(pipeline.signature);
    let buffer_format = ctx.dst.format();
    // `XRGB32` images are rendered by `PRGB32` pipelines.
    let compatible = buffer_format == D::FORMAT
        || (D::FORMAT == FormatExt::Prgb32 && buffer_format == FormatExt::Xrgb32);
    if fill.fill_type() != pipeline.fill_type || !compatible {
        return Err(invalid);
    }
    if !ctx.dst.contains(fill.bounds()) {
        return Err(PipelineError::InvalidBuffer);
    }
    let mut fetcher = Fetcher::new(pipeline.fetch_type, fetch, ctx.pixel_origin).ok_or(invalid)?;
    if buffer_format == FormatExt::Xrgb32 {
        let comp = Compositor::<Xrgb32>::new(pipeline.comp_op);
        fill::run(&mut ctx.dst, fill, &mut fetcher, &comp);
    } else {
        let comp = Compositor::<D>::new(pipeline.comp_op);
        fill::run(&mut ctx.dst, fill, &mut fetcher, &comp);
    }
    Ok(())
}
