// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use raster_pipe_common::fill::BoxAData;

use crate::compositor::Compositor;
use crate::dispatch::DstBuffer;
use crate::fetch::FetchPart;
use crate::pixel::DstFormat;

pub(crate) fn fill<D: DstFormat>(
    dst: &mut DstBuffer<'_>,
    data: &BoxAData,
    fetch: &mut impl FetchPart,
    comp: &Compositor<D>,
) {
    let b = data.bounds;
    let (x0, x1) = (b.x0 as usize, b.x1 as usize);

    fetch.init_y(b.y0);
    for y in b.y0..b.y1 {
        fetch.start_x(b.x0);
        comp.composite_cspan(dst.row_mut(y), x0, x1, fetch, data.alpha);
        fetch.advance_y();
    }
}
