// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fill parts, one per [`FillType`](raster_pipe_common::signature::FillType).

mod analytic;
mod box_a;
mod box_u;
mod mask;

use raster_pipe_common::fill::FillData;

use crate::compositor::Compositor;
use crate::dispatch::DstBuffer;
use crate::fetch::FetchPart;
use crate::pixel::DstFormat;

#[cfg(feature = "multithreading")]
pub(crate) use box_u::clip_rows;

/// Run the fill part matching `fill`.
///
/// Analytic fills leave their bit and cell buffers zeroed.
pub(crate) fn run<D: DstFormat>(
    dst: &mut DstBuffer<'_>,
    fill: &mut FillData<'_>,
    fetch: &mut impl FetchPart,
    comp: &Compositor<D>,
) {
    match fill {
        FillData::BoxA(data) => box_a::fill(dst, data, fetch, comp),
        FillData::BoxU(data) => box_u::fill(dst, data, fetch, comp),
        FillData::Mask(data) => mask::fill(dst, data, fetch, comp),
        FillData::Analytic(data) => analytic::fill(dst, data, fetch, comp),
    }
}
