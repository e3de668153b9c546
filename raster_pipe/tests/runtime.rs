// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline runtimes behind a render context.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::util::{get_ctx, RED};
use raster_pipe::raster_pipe_common::compop::CompOpExt;
use raster_pipe::raster_pipe_common::fill::BoxI;
use raster_pipe::raster_pipe_common::format::FormatExt;
use raster_pipe::raster_pipe_common::kurbo::Rect;
use raster_pipe::raster_pipe_common::signature::{FetchType, FillType, Signature};
use raster_pipe::{
    ContextConfig, DispatchData, PipelineError, PipelineRuntime, RasterContext, RuntimeKind,
    SignatureCache, StaticRuntime,
};

/// A code generating runtime that can't generate code, counting how often it was asked.
#[derive(Debug, Default)]
struct Unavailable {
    calls: Arc<AtomicUsize>,
}

impl PipelineRuntime for Unavailable {
    fn runtime_kind(&self) -> RuntimeKind {
        RuntimeKind::Jit
    }

    fn get(&self, _: Signature) -> Result<DispatchData, PipelineError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(PipelineError::JitUnavailable)
    }
}

fn ctx_with(config: ContextConfig, calls: &Arc<AtomicUsize>) -> RasterContext {
    let image = get_ctx(4, 4, 0).into_image();
    let runtime = Unavailable {
        calls: Arc::clone(calls),
    };
    RasterContext::with_runtime(image, config, Box::new(runtime))
}

#[test]
fn falls_back_to_the_static_runtime() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut ctx = ctx_with(ContextConfig::default(), &calls);
    ctx.set_solid(RED);
    ctx.fill_box_a(BoxI::new(0, 0, 4, 4)).unwrap();
    ctx.fill_box_a(BoxI::new(1, 1, 3, 3)).unwrap();

    assert!(ctx.image().pixels().iter().all(|&p| p == RED));
    // The second fill hit the cache.
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(ctx.cache().len(), 1);
}

#[test]
fn errors_without_fallback() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = ContextConfig {
        fallback_enabled: false,
        ..ContextConfig::default()
    };
    let mut ctx = ctx_with(config, &calls);
    ctx.set_solid(RED);
    assert_eq!(
        ctx.fill_box_a(BoxI::new(0, 0, 4, 4)),
        Err(PipelineError::JitUnavailable)
    );
    assert!(ctx.image().pixels().iter().all(|&p| p == 0));
    assert!(ctx.cache().is_empty());
}

#[test]
fn fills_of_different_shapes_use_different_pipelines() {
    let mut ctx = get_ctx(4, 4, 0);
    ctx.set_solid(0x8000_0080);
    ctx.fill_box_a(BoxI::new(0, 0, 2, 2)).unwrap();
    ctx.fill_box_u(Rect::new(0.5, 0.5, 3.5, 3.5)).unwrap();
    ctx.set_solid(RED);
    ctx.fill_box_a(BoxI::new(0, 0, 2, 2)).unwrap();
    assert_eq!(ctx.cache().len(), 3);
}

#[test]
fn cache_evicts_the_oldest_pipeline() {
    let ops = [
        CompOpExt::SrcOver,
        CompOpExt::SrcCopy,
        CompOpExt::Plus,
        CompOpExt::Xor,
    ];
    let signature = |op| {
        Signature::new(FormatExt::Prgb32, FormatExt::Prgb32, op, FillType::BoxA, FetchType::Solid)
    };
    let mut cache = SignatureCache::<3>::new();
    for op in ops {
        cache.insert(StaticRuntime.get(signature(op)).unwrap());
    }
    assert_eq!(cache.len(), 3);
    assert!(!cache.contains(signature(CompOpExt::SrcOver)));
    for op in &ops[1..] {
        let sig = signature(*op);
        assert_eq!(cache.get(sig).map(DispatchData::signature), Some(sig));
    }
}
