// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use raster_pipe_common::fill::BoxUData;
#[cfg(any(feature = "multithreading", test))]
use raster_pipe_common::fill::{BoxI, BoxUTier};

use crate::compositor::Compositor;
use crate::dispatch::DstBuffer;
use crate::fetch::FetchPart;
use crate::pixel::DstFormat;

/// Fill the rows of every tier, with the left and right columns composited separately.
pub(crate) fn fill<D: DstFormat>(
    dst: &mut DstBuffer<'_>,
    data: &BoxUData,
    fetch: &mut impl FetchPart,
    comp: &Compositor<D>,
) {
    let b = data.bounds;
    let (x0, x1) = (b.x0 as usize, b.x1 as usize);
    let w = x1 - x0;

    fetch.init_y(b.y0);
    let mut y = b.y0;
    for tier in data.tiers() {
        for _ in 0..tier.rows {
            if y >= b.y1 {
                return;
            }
            let row = dst.row_mut(y);
            fetch.start_x(b.x0);
            comp.composite_next(row, x0, fetch, tier.left);
            if w > 1 {
                if w > 2 {
                    comp.composite_cspan(row, x0 + 1, x1 - 1, fetch, tier.inner);
                }
                comp.composite_next(row, x1 - 1, fetch, tier.right);
            }
            fetch.advance_y();
            y += 1;
        }
    }
}

#[cfg(any(feature = "multithreading", test))]
/// The part of `data` that falls into rows `y0..y1`, or `None` if there is none.
pub(crate) fn clip_rows(data: &BoxUData, y0: i32, y1: i32) -> Option<BoxUData> {
    let b = data.bounds;
    let (start, end) = (y0.max(b.y0), y1.min(b.y1));
    if start >= end {
        return None;
    }

    let mut tiers = [BoxUTier::default(); 3];
    let mut count = 0;
    let mut row = b.y0;
    for tier in data.tiers() {
        let tier_end = row.saturating_add(tier.rows as i32);
        let (from, to) = (row.max(start), tier_end.min(end));
        if from < to {
            tiers[count] = BoxUTier {
                rows: (to - from) as u32,
                ..*tier
            };
            count += 1;
        }
        row = tier_end;
    }

    Some(BoxUData {
        bounds: BoxI {
            y0: start,
            y1: end,
            ..b
        },
        tiers,
        tier_count: count as u32,
    })
}
