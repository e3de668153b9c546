// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate includes the plain data that drives the raster pipeline: pixel format and composition
//! operator metadata, the operator simplification table, pipeline signatures, and the fill/fetch
//! descriptors consumed by [`raster_pipe`][raster_pipe].
//!
//! # Usage
//!
//! This crate holds no pixel processing code. It is meant to be used through `raster_pipe`, which
//! re-exports the parts needed to describe a fill.
//!
//! # Contents
//!
//! - [`format`]: internal pixel formats including the synthetic `ZERO32` and `FRGB32` hints.
//! - [`compop`]: composition operators and their static flags.
//! - [`simplify`]: the `(operator, dst, src)` simplification table.
//! - [`signature`]: the packed pipeline key and the fill/fetch type ids.
//! - [`fill`] and [`fetch`]: descriptors and the init functions that compute their fixed-point constants.
//! - [`gradient`]: gradient lookup tables built from color stops.
//!
//! [raster_pipe]: https://crates.io/crates/raster_pipe
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
    reason = "Fixed-point setup truncates f64 to integer and u32 fields to their packed widths on purpose."
)]

pub mod compop;
pub mod fetch;
pub mod fill;
pub mod format;
pub mod gradient;
pub mod signature;
pub mod simplify;

pub use peniko;
pub use peniko::kurbo;
