// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A reference 2D raster pipeline.
//!
//! A pipeline is identified by a [`Signature`](raster_pipe_common::signature::Signature), which
//! names a destination format, a source format, a composition operator, a fill type and a fetch
//! type. Fills drive a compositor over rows of the destination, and the compositor combines each
//! destination pixel with a source pixel read from a fetch part.
//!
//! # Usage
//!
//! Most users draw through a [`RasterContext`], which simplifies the requested operator, looks the
//! pipeline up in a [`SignatureCache`] and runs it:
//!
//! ```
//! use raster_pipe::{Image, RasterContext};
//! use raster_pipe::raster_pipe_common::fill::BoxI;
//! use raster_pipe::raster_pipe_common::format::FormatExt;
//!
//! let image = Image::from_pixels(&[0xFF00_0000; 16], 4, 4, FormatExt::Prgb32).unwrap();
//! let mut ctx = RasterContext::new(image);
//! ctx.set_solid(0x8080_8080);
//! ctx.fill_box_a(BoxI::new(0, 0, 4, 4)).unwrap();
//! assert_eq!(ctx.image().pixel(0, 0), 0xFF80_8080);
//! ```
//!
//! Pipelines can also be obtained from a [`PipelineRuntime`] and run directly over a
//! [`DstBuffer`] with [`DispatchData::run`].
//!
//! # Features
//!
//! - `multithreading`: splits tall box fills into bands of rows rendered on the rayon thread pool.
// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![expect(
    clippy::cast_possible_truncation,
    reason = "Pixel arithmetic packs u32 lanes into bytes and fixed-point positions into indices."
)]

mod cache;
mod compose;
mod compositor;
mod context;
mod dispatch;
mod error;
mod fetch;
mod fill;
mod image;
mod pixel;
mod runtime;
mod util;

pub use raster_pipe_common;

pub use cache::SignatureCache;
pub use compose::{apply_mask, kernel, CompOpKernel};
pub use context::{
    ContextConfig, GradientGeometry, GradientStyle, PatternStyle, RasterContext, Style,
};
pub use dispatch::{ContextData, DispatchData, DstBuffer, FetchFunc, FillFunc, Pipeline};
pub use error::PipelineError;
pub use image::Image;
pub use pixel::{addus8, alpha, div255, pack, unpack, Unpacked, ALPHA};
pub use runtime::{PipeProvider, PipelineRuntime, RuntimeKind, StaticRuntime};
