// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline runtimes, which turn signatures into runnable pipelines.
//!
//! The [`StaticRuntime`] is the reference implementation and supports every signature with a
//! `PRGB32`, `XRGB32` or `A8` destination. Other runtimes, such as one that generates code,
//! plug in through [`PipelineRuntime`] and are wrapped by a [`PipeProvider`], which degrades to
//! the static runtime when they fail.

use core::fmt::Debug;

use raster_pipe_common::signature::Signature;

use crate::dispatch::{static_fill_func, DispatchData, Pipeline};
use crate::error::{PipelineError, Result};

/// How a runtime produces its pipelines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
    /// Pipelines are assembled from precompiled parts.
    Static,
    /// Pipelines are generated at runtime.
    Jit,
}

/// Source of pipelines for signatures.
pub trait PipelineRuntime: Debug {
    /// How this runtime produces pipelines.
    fn runtime_kind(&self) -> RuntimeKind;

    /// Get the pipeline for `signature`.
    fn get(&self, signature: Signature) -> Result<DispatchData>;

    /// Whether [`get`](Self::get) would succeed for `signature`.
    fn test(&self, signature: Signature) -> Result<()> {
        self.get(signature).map(|_| ())
    }
}

/// The reference runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticRuntime;

impl PipelineRuntime for StaticRuntime {
    fn runtime_kind(&self) -> RuntimeKind {
        RuntimeKind::Static
    }

    fn get(&self, signature: Signature) -> Result<DispatchData> {
        let pipeline = Pipeline::new(signature)?;
        let fill_func = static_fill_func(pipeline.dst_format())
            .ok_or(PipelineError::UnsupportedFormat(pipeline.dst_format()))?;
        Ok(DispatchData {
            fill_func,
            fetch_func: None,
            pipeline,
        })
    }
}

/// A primary runtime backed by the static runtime.
#[derive(Debug)]
pub struct PipeProvider {
    primary: Option<Box<dyn PipelineRuntime + Send + Sync>>,
    fallback: StaticRuntime,
    fallback_enabled: bool,
}

impl Default for PipeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PipeProvider {
    /// A provider that only uses the static runtime.
    pub fn new() -> Self {
        Self {
            primary: None,
            fallback: StaticRuntime,
            fallback_enabled: true,
        }
    }

    /// A provider that asks `primary` first.
    ///
    /// With `fallback_enabled` the static runtime serves every signature `primary` fails on,
    /// otherwise the error of `primary` is returned.
    pub fn with_primary(
        primary: Box<dyn PipelineRuntime + Send + Sync>,
        fallback_enabled: bool,
    ) -> Self {
        Self {
            primary: Some(primary),
            fallback: StaticRuntime,
            fallback_enabled,
        }
    }

    /// The kind of the runtime asked first.
    pub fn runtime_kind(&self) -> RuntimeKind {
        self.primary
            .as_ref()
            .map_or(RuntimeKind::Static, |p| p.runtime_kind())
    }

    /// Get the pipeline for `signature`.
    pub fn get(&self, signature: Signature) -> Result<DispatchData> {
        let Some(primary) = &self.primary else {
            return self.fallback.get(signature);
        };
        match primary.get(signature) {
            Ok(dispatch) => Ok(dispatch),
            // The fallback can't do better on signatures that aren't pipelines.
            Err(err @ (PipelineError::Pending(_) | PipelineError::InvalidSignature(_))) => Err(err),
            Err(err) if self.fallback_enabled => {
                log::warn!(
                    "{:?} runtime failed for {signature}: {err}, using the static pipeline",
                    primary.runtime_kind()
                );
                self.fallback.get(signature)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_pipe_common::compop::CompOpExt;
    use raster_pipe_common::format::FormatExt;
    use raster_pipe_common::signature::{FetchType, FillType};

    #[derive(Debug)]
    struct NoCodegen;

    impl PipelineRuntime for NoCodegen {
        fn runtime_kind(&self) -> RuntimeKind {
            RuntimeKind::Jit
        }

        fn get(&self, _: Signature) -> Result<DispatchData> {
            Err(PipelineError::JitUnavailable)
        }
    }

    fn signature(dst: FormatExt) -> Signature {
        Signature::new(dst, FormatExt::Prgb32, CompOpExt::SrcOver, FillType::BoxA, FetchType::Solid)
    }

    #[test]
    fn static_runtime_formats() {
        let rt = StaticRuntime;
        for dst in [FormatExt::Prgb32, FormatExt::Xrgb32, FormatExt::A8] {
            assert!(rt.test(signature(dst)).is_ok());
        }
        assert_eq!(
            rt.test(signature(FormatExt::Frgb32)),
            Err(PipelineError::UnsupportedFormat(FormatExt::Frgb32))
        );
    }

    #[test]
    fn provider_falls_back() {
        let sig = signature(FormatExt::Prgb32);
        let provider = PipeProvider::with_primary(Box::new(NoCodegen), true);
        assert_eq!(provider.runtime_kind(), RuntimeKind::Jit);
        assert_eq!(provider.get(sig).unwrap().signature(), sig);

        let strict = PipeProvider::with_primary(Box::new(NoCodegen), false);
        assert_eq!(strict.get(sig).err(), Some(PipelineError::JitUnavailable));
    }
}
