// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositor combines destination pixels with fetched source pixels.
//!
//! Coverage is always applied to the result of the operator, see [`apply_mask`]. Spans with a
//! constant coverage (`CMask`) and spans with one coverage value per pixel (`VMask`) go through
//! the same per-pixel step, so both produce identical pixels for identical coverage.

use core::marker::PhantomData;

use raster_pipe_common::compop::CompOpExt;
use raster_pipe_common::format::FormatExt;

use crate::compose::{apply_mask, kernel, CompOpKernel};
use crate::fetch::FetchPart;
use crate::pixel::DstFormat;
use crate::util::scalar::mul_255;

/// Composites one operator into destination rows of format `D`.
#[derive(Debug)]
pub(crate) struct Compositor<D> {
    kernel: &'static CompOpKernel,
    /// At full coverage the operator stores the source as is.
    copy_opaque: bool,
    _dst: PhantomData<D>,
}

impl<D: DstFormat> Compositor<D> {
    pub(crate) fn new(op: CompOpExt) -> Self {
        Self {
            kernel: kernel(op),
            copy_opaque: op == CompOpExt::SrcCopy,
            _dst: PhantomData,
        }
    }

    #[inline(always)]
    fn blend(&self, dst: u32, src: u32) -> u32 {
        if D::FORMAT == FormatExt::A8 {
            self.kernel.a8(dst, src)
        } else {
            self.kernel.prgb32(dst, src)
        }
    }

    /// Composite `src` onto pixel `x` of `row` with coverage `m`.
    #[inline(always)]
    pub(crate) fn composite_pixel(&self, row: &mut [u8], x: usize, src: u32, m: u32) {
        if self.copy_opaque && m == 255 {
            D::store(row, x, src);
            return;
        }
        let dst = D::load(row, x);
        D::store(row, x, apply_mask(self.blend(dst, src), dst, m));
    }

    /// Fetch the next source pixel and composite it onto pixel `x` with coverage `m`.
    #[inline(always)]
    pub(crate) fn composite_next(&self, row: &mut [u8], x: usize, fetch: &mut impl FetchPart, m: u32) {
        let src = fetch.fetch();
        self.composite_pixel(row, x, src, m);
    }

    /// Composite pixels `x0..x1` of `row` with the constant coverage `m`.
    ///
    /// The fetcher must be positioned at `x0` and is left at `x1`.
    pub(crate) fn composite_cspan(
        &self,
        row: &mut [u8],
        x0: usize,
        x1: usize,
        fetch: &mut impl FetchPart,
        m: u32,
    ) {
        debug_assert!(x0 <= x1, "span {x0}..{x1} is reversed");
        if x0 >= x1 {
            return;
        }
        if m == 0 {
            fetch.advance_x(x1 as i32, (x1 - x0) as u32);
            return;
        }

        if let Some(src) = fetch.solid() {
            if self.copy_opaque && m == 255 {
                for x in x0..x1 {
                    D::store(row, x, src);
                }
            } else {
                for x in x0..x1 {
                    self.composite_pixel(row, x, src, m);
                }
            }
        } else {
            for x in x0..x1 {
                self.composite_next(row, x, fetch, m);
            }
        }
    }

    /// Composite `masks.len()` pixels of `row` starting at `x0`, one coverage byte per pixel.
    ///
    /// With `global_alpha` every coverage byte is first multiplied by it.
    pub(crate) fn composite_vspan(
        &self,
        row: &mut [u8],
        x0: usize,
        masks: &[u8],
        fetch: &mut impl FetchPart,
        global_alpha: Option<u32>,
    ) {
        for (x, &m) in (x0..).zip(masks) {
            let m = match global_alpha {
                Some(ga) => mul_255(u32::from(m), ga),
                None => u32::from(m),
            };
            self.composite_next(row, x, fetch, m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::SolidFetch;
    use crate::pixel::{Prgb32, A8};

    fn row_of(pixels: &[u32]) -> Vec<u8> {
        pixels.iter().flat_map(|p| p.to_ne_bytes()).collect()
    }

    fn pixels(row: &[u8]) -> Vec<u32> {
        row.chunks_exact(4)
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// A fetcher producing a fixed sequence, which isn't solid.
    struct Sequence(Vec<u32>, usize);

    impl FetchPart for Sequence {
        fn init_y(&mut self, _: i32) {}
        fn start_x(&mut self, x: i32) {
            self.1 = x as usize;
        }
        fn advance_x(&mut self, x: i32, _: u32) {
            self.1 = x as usize;
        }
        fn advance_y(&mut self) {}
        fn fetch(&mut self) -> u32 {
            let p = self.0[self.1];
            self.1 += 1;
            p
        }
    }

    #[test]
    fn cspan_and_vspan_agree() {
        let comp = Compositor::<Prgb32>::new(CompOpExt::Multiply);
        let src = vec![0x8040_2010, 0xFF80_8080, 0x4040_4040, 0];
        let dst = [0xFF20_4060, 0x8080_0000, 0xFFFF_FFFF, 0x1010_1010];
        for m in [0_u8, 1, 77, 128, 254, 255] {
            let mut a = row_of(&dst);
            let mut b = row_of(&dst);
            let mut fa = Sequence(src.clone(), 0);
            let mut fb = Sequence(src.clone(), 0);
            comp.composite_cspan(&mut a, 0, 4, &mut fa, u32::from(m));
            comp.composite_vspan(&mut b, 0, &[m; 4], &mut fb, None);
            assert_eq!(a, b, "coverage {m}");
            assert_eq!(fa.1, 4);
        }
    }

    #[test]
    fn solid_span_matches_per_pixel_fetch() {
        let comp = Compositor::<Prgb32>::new(CompOpExt::SrcOver);
        let dst = [0xFF00_0000, 0x8000_0080, 0, 0xFFFF_FFFF];
        let mut a = row_of(&dst);
        let mut b = row_of(&dst);
        comp.composite_cspan(&mut a, 0, 4, &mut SolidFetch::new(0x8080_8080), 200);
        comp.composite_cspan(&mut b, 0, 4, &mut Sequence(vec![0x8080_8080; 4], 0), 200);
        assert_eq!(a, b);
    }

    #[test]
    fn opaque_copy_stores_source() {
        let comp = Compositor::<Prgb32>::new(CompOpExt::SrcCopy);
        let mut row = row_of(&[0x1234_5678; 3]);
        comp.composite_cspan(&mut row, 1, 3, &mut SolidFetch::new(0x8000_0080), 255);
        assert_eq!(pixels(&row), [0x1234_5678, 0x8000_0080, 0x8000_0080]);
    }

    #[test]
    fn global_alpha_scales_vmask() {
        let comp = Compositor::<Prgb32>::new(CompOpExt::SrcCopy);
        let mut a = row_of(&[0; 2]);
        let mut b = row_of(&[0; 2]);
        comp.composite_vspan(&mut a, 0, &[255, 128], &mut SolidFetch::new(0xFFFF_FFFF), Some(128));
        comp.composite_vspan(&mut b, 0, &[128, 64], &mut SolidFetch::new(0xFFFF_FFFF), None);
        assert_eq!(a, b);
    }

    #[test]
    fn a8_destination_uses_alpha_kernel() {
        let comp = Compositor::<A8>::new(CompOpExt::SrcOver);
        let mut row = vec![0x40_u8, 0xFF, 0];
        comp.composite_cspan(&mut row, 0, 3, &mut SolidFetch::new(0x8012_3456), 255);
        assert_eq!(row, [0xA0, 0xFF, 0x80]);
    }

    #[test]
    fn zero_coverage_skips_source() {
        let comp = Compositor::<Prgb32>::new(CompOpExt::SrcCopy);
        let mut row = row_of(&[7; 4]);
        let mut fetch = Sequence(vec![1, 2, 3, 4], 0);
        comp.composite_cspan(&mut row, 0, 2, &mut fetch, 0);
        comp.composite_cspan(&mut row, 2, 4, &mut fetch, 255);
        assert_eq!(pixels(&row), [7, 7, 3, 4]);
    }
}
