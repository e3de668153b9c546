// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use raster_pipe_common::fill::AnalyticBufferError;
use raster_pipe_common::format::FormatExt;
use raster_pipe_common::signature::Signature;
use thiserror::Error;

/// Errors that can occur while assembling or running a pipeline.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PipelineError {
    /// The runtime has no pipeline for this signature.
    #[error("No pipeline available for {0}")]
    NotImplemented(Signature),
    /// The signature still carries the pending flag, so its fetch data isn't known yet.
    #[error("Signature {0} is pending")]
    Pending(Signature),
    /// A field of the signature is out of range.
    #[error("Invalid signature {0}")]
    InvalidSignature(Signature),
    /// The runtime can't generate code on this target.
    #[error("Code generation is not available")]
    JitUnavailable,
    /// Images and destinations only support `PRGB32`, `XRGB32` and `A8`.
    #[error("Format {0} can't be used as a destination")]
    UnsupportedFormat(FormatExt),
    /// The destination buffer is too small for its size, or the fill reaches outside of it.
    #[error("Destination buffer doesn't match the fill")]
    InvalidBuffer,
    /// Analytic bit or cell buffers are too small.
    #[error(transparent)]
    AnalyticBuffers(#[from] AnalyticBufferError),
}

pub(crate) type Result<T, E = PipelineError> = std::result::Result<T, E>;
