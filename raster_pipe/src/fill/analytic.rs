// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fill from accumulated coverage cells.
//!
//! Cells hold signed coverage deltas scaled so that one full winding adds `0x20000`. A row is
//! scanned through its bit words: set bits mark groups of cells to accumulate pixel by pixel,
//! and the gaps between them are composited with the coverage the last accumulated cell left
//! behind, which is constant until the next set bit.

use raster_pipe_common::fill::{AnalyticData, PIXELS_PER_BIT_WORD, PIXELS_PER_ONE_BIT};

use crate::compositor::Compositor;
use crate::dispatch::DstBuffer;
use crate::fetch::FetchPart;
use crate::pixel::DstFormat;

const BITS: usize = usize::BITS as usize;

/// Accumulated coverage that corresponds to zero winding.
const COVERAGE_BIAS: u32 = 256 << 9;

/// Coverage of an accumulated cell value, scaled by the global alpha.
#[inline(always)]
fn calc_mask(cov: u32, fill_rule_mask: u32, alpha: u32) -> u32 {
    let winding = (((cov as i32) >> 9) as u32 & fill_rule_mask).wrapping_sub(256);
    let m = (winding as i32).unsigned_abs().min(256);
    (m * alpha) >> 8
}

/// All bits at or above `i`, none if `i` is past the last bit.
#[inline(always)]
fn ones_from(i: usize) -> usize {
    usize::MAX.checked_shl(i as u32).unwrap_or(0)
}

pub(crate) fn fill<D: DstFormat>(
    dst: &mut DstBuffer<'_>,
    data: &mut AnalyticData<'_>,
    fetch: &mut impl FetchPart,
    comp: &Compositor<D>,
) {
    let b = data.bounds;
    let x_end = b.x1.max(0) as usize;
    let (bit_stride, cell_stride) = (data.bit_stride, data.cell_stride);
    let (mask, alpha) = (data.fill_rule_mask, data.alpha);

    fetch.init_y(b.y0);
    for (r, y) in (b.y0..b.y1).enumerate() {
        let bits = &mut data.bits[r * bit_stride..(r + 1) * bit_stride];
        let start = r * cell_stride;
        let cells_end = (start + cell_stride).min(data.cells.len());
        let cells = &mut data.cells[start..cells_end];

        let row = dst.row_mut(y);
        fill_row(row, bits, cells, x_end, mask, alpha, fetch, comp);
        bits.fill(0);
        fetch.advance_y();
    }
}

#[expect(
    clippy::too_many_arguments,
    reason = "The row loop is split out of the fill only to keep the row slices separate."
)]
fn fill_row<D: DstFormat>(
    row: &mut [u8],
    bits: &mut [usize],
    cells: &mut [u32],
    x_end: usize,
    fill_rule_mask: u32,
    alpha: u32,
    fetch: &mut impl FetchPart,
    comp: &Compositor<D>,
) {
    // Find the first non-zero bit word.
    let mut x_off = 0;
    let mut next = 0;
    let mut word = loop {
        let Some(&w) = bits.get(next) else {
            return;
        };
        bits[next] = 0;
        next += 1;
        if w != 0 {
            break w;
        }
        x_off += PIXELS_PER_BIT_WORD;
    };

    let first = word.trailing_zeros() as usize;
    let mut x0 = first * PIXELS_PER_ONE_BIT + x_off;
    fetch.start_x(x0 as i32);

    // A vertical edge clipped to the end of the raster leaves a cell that renders nothing.
    if x0 >= x_end {
        if let Some(cell) = cells.get_mut(x0) {
            *cell = 0;
        }
        return;
    }

    let mut cov = COVERAGE_BIAS;
    let mut msk;

    // From here on `word` holds the bits of the current word inverted from the start of the
    // current run, so its lowest set bit is where the run ends.
    word ^= ones_from(first);

    loop {
        let end_bit = loop {
            if word != 0 {
                break word.trailing_zeros() as usize;
            }
            let Some(&w) = bits.get(next) else {
                break BITS;
            };
            bits[next] = 0;
            next += 1;
            x_off += PIXELS_PER_BIT_WORD;
            word = !w;
        };
        word ^= ones_from(end_bit);
        let run_end = (end_bit * PIXELS_PER_ONE_BIT + x_off).min(x_end);

        // Accumulate one cell per pixel, plus the cell after the run.
        cov = cov.wrapping_add(cells[x0]);
        cells[x0] = 0;
        msk = calc_mask(cov, fill_rule_mask, alpha);
        for x in x0..run_end {
            comp.composite_next(row, x, fetch, msk);
            cov = cov.wrapping_add(cells[x + 1]);
            cells[x + 1] = 0;
            msk = calc_mask(cov, fill_rule_mask, alpha);
        }
        x0 = x0.max(run_end);
        if x0 >= x_end {
            return;
        }

        // Skip to the start of the next run.
        while word == 0 {
            x_off += PIXELS_PER_BIT_WORD;
            let Some(&w) = bits.get(next) else {
                return;
            };
            bits[next] = 0;
            next += 1;
            word = w;
        }
        let start_bit = word.trailing_zeros() as usize;
        word ^= ones_from(start_bit);

        let gap_end = (start_bit * PIXELS_PER_ONE_BIT + x_off).min(x_end);
        if gap_end > x0 {
            if msk == 0 {
                fetch.advance_x(gap_end as i32, (gap_end - x0) as u32);
            } else {
                comp.composite_cspan(row, x0, gap_end, fetch, msk);
            }
            x0 = gap_end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_pipe_common::fill::FillRule;

    const FULL: u32 = 0x20000;

    #[test]
    fn mask_follows_winding() {
        let non_zero = FillRule::NonZero.mask();
        let even_odd = FillRule::EvenOdd.mask();
        let cov = |winding: i32| COVERAGE_BIAS.wrapping_add((winding * FULL as i32) as u32);

        assert_eq!(calc_mask(cov(0), non_zero, 255), 0);
        assert_eq!(calc_mask(cov(1), non_zero, 255), 255);
        assert_eq!(calc_mask(cov(-1), non_zero, 255), 255);
        assert_eq!(calc_mask(cov(2), non_zero, 255), 255);
        assert_eq!(calc_mask(cov(2), even_odd, 255), 0);
        assert_eq!(calc_mask(cov(-1), even_odd, 255), 255);
        assert_eq!(calc_mask(cov(1), non_zero, 128), 128);
        // Half a winding.
        assert_eq!(
            calc_mask(COVERAGE_BIAS + FULL / 2, non_zero, 255),
            (128 * 255) >> 8
        );
    }

    #[test]
    fn ones_from_saturates() {
        assert_eq!(ones_from(0), usize::MAX);
        assert_eq!(ones_from(BITS - 1), 1 << (BITS - 1));
        assert_eq!(ones_from(BITS), 0);
    }
}
