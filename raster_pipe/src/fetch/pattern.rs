// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pattern fetchers.
//!
//! Aligned and fractional fetchers walk the pattern one pixel per destination pixel, affine
//! fetchers step through it in 32.32 fixed point.

use raster_pipe_common::fetch::{PatternAffineData, PatternSimpleData, PatternSource};
use raster_pipe_common::peniko::Extend;
use raster_pipe_common::signature::FetchType;

use super::{pmod, FetchPart};
use crate::pixel::{load_src, pack, unpack, Unpacked};

/// Vertical position in a pattern with an integer translation.
#[derive(Debug, Clone, Copy)]
struct PatternRows {
    ty: i32,
    ry: i32,
    h: i32,
    extend: Extend,
    y: i32,
}

impl PatternRows {
    fn new(src: &PatternSource<'_>, ty: i32, ry: i32, extend: Extend) -> Self {
        Self {
            ty,
            ry,
            h: src.height as i32,
            // A zero period means the axis pads.
            extend: if ry == 0 { Extend::Pad } else { extend },
            y: 0,
        }
    }

    #[inline]
    fn init(&mut self, y: i32) {
        self.y = y.wrapping_add(self.ty);
        if self.extend != Extend::Pad {
            self.y = pmod(self.y, self.ry);
        }
    }

    #[inline]
    fn row(&self) -> u32 {
        let y = match self.extend {
            Extend::Pad => self.y.clamp(0, self.h - 1),
            _ if self.y < self.h => self.y,
            _ => self.ry - 1 - self.y,
        };
        y as u32
    }

    #[inline]
    fn advance(&mut self) {
        self.y = self.y.saturating_add(1);
        if self.extend != Extend::Pad && self.y >= self.ry {
            self.y = 0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnMode {
    Pad,
    Repeat,
    /// Repeat or reflect, reflected columns are kept negative.
    RoR,
}

/// Horizontal position in a pattern with an integer translation.
#[derive(Debug, Clone, Copy)]
struct PatternColumns {
    mode: ColumnMode,
    tx: i32,
    rx: i32,
    w: i32,
    x: i32,
}

impl PatternColumns {
    fn new(src: &PatternSource<'_>, mode: ColumnMode, tx: i32, rx: i32) -> Self {
        let w = src.width as i32;
        let mode = match mode {
            ColumnMode::Repeat | ColumnMode::RoR if rx == 0 => ColumnMode::Pad,
            _ => mode,
        };
        Self {
            mode,
            tx,
            rx,
            w,
            x: 0,
        }
    }

    #[inline]
    fn start(&mut self, x: i32) {
        let x = x.wrapping_add(self.tx);
        self.x = match self.mode {
            ColumnMode::Pad => x,
            ColumnMode::Repeat => pmod(x, self.w),
            ColumnMode::RoR => {
                let x = pmod(x, self.rx);
                if x >= self.w {
                    x - self.rx
                } else {
                    x
                }
            }
        };
    }

    #[inline]
    fn index(&self) -> usize {
        let x = match self.mode {
            ColumnMode::Pad => self.x.clamp(0, self.w - 1),
            ColumnMode::Repeat => self.x,
            ColumnMode::RoR => self.x ^ (self.x >> 31),
        };
        x as usize
    }

    #[inline]
    fn advance(&mut self) {
        self.x = self.x.saturating_add(1);
        match self.mode {
            ColumnMode::Pad => {}
            ColumnMode::Repeat => {
                if self.x >= self.w {
                    self.x = 0;
                }
            }
            ColumnMode::RoR => {
                if self.x >= self.w {
                    self.x -= self.rx;
                }
            }
        }
    }
}

/// Aligned blits and integer translations.
#[derive(Debug)]
pub(crate) struct AlignedFetch<'a> {
    src: PatternSource<'a>,
    cols: PatternColumns,
    rows: PatternRows,
    row: &'a [u8],
}

impl<'a> AlignedFetch<'a> {
    pub(crate) fn new(fetch_type: FetchType, src: PatternSource<'a>, data: &PatternSimpleData) -> Self {
        let (mode, tx, ty) = match fetch_type {
            // The blit translation is the position of the pattern, not the offset of the fetch.
            FetchType::PatternAlignedBlit => (ColumnMode::Pad, -data.tx, -data.ty),
            FetchType::PatternAlignedRepeat => (ColumnMode::Repeat, data.tx, data.ty),
            FetchType::PatternAlignedRoR => (ColumnMode::RoR, data.tx, data.ty),
            _ => (ColumnMode::Pad, data.tx, data.ty),
        };
        let (ry, extend_y) = if fetch_type == FetchType::PatternAlignedBlit {
            (0, Extend::Pad)
        } else {
            (data.ry, data.extend_y)
        };
        Self {
            src,
            cols: PatternColumns::new(&src, mode, tx, data.rx),
            rows: PatternRows::new(&src, ty, ry, extend_y),
            row: &[],
        }
    }
}

impl FetchPart for AlignedFetch<'_> {
    fn init_y(&mut self, y: i32) {
        self.rows.init(y);
        self.row = self.src.row(self.rows.row());
    }

    #[inline]
    fn start_x(&mut self, x: i32) {
        self.cols.start(x);
    }

    #[inline]
    fn advance_x(&mut self, x: i32, _: u32) {
        self.cols.start(x);
    }

    fn advance_y(&mut self) {
        self.rows.advance();
        self.row = self.src.row(self.rows.row());
    }

    #[inline]
    fn fetch(&mut self) -> u32 {
        let p = load_src(self.src.format, self.row, self.cols.index());
        self.cols.advance();
        p
    }
}

/// Fractional translations, interpolating horizontally, vertically or both.
///
/// The translation points one pixel up and to the left of the sampled position, so every
/// output pixel mixes columns `x - 1` and `x` of rows `y` and `y + 1`. The contribution of the
/// left column is carried over from the previous pixel.
#[derive(Debug)]
pub(crate) struct BilinearFetch<'a> {
    src: PatternSource<'a>,
    cols: PatternColumns,
    rows: PatternRows,
    row0: &'a [u8],
    row1: &'a [u8],
    wa: u32,
    wb: u32,
    wc: u32,
    wd: u32,
    acc: Unpacked,
}

impl<'a> BilinearFetch<'a> {
    pub(crate) fn new(fetch_type: FetchType, src: PatternSource<'a>, data: &PatternSimpleData) -> Self {
        let mode = match fetch_type {
            FetchType::PatternFxRoR | FetchType::PatternFyRoR | FetchType::PatternFxFyRoR => {
                ColumnMode::RoR
            }
            _ => ColumnMode::Pad,
        };
        Self {
            src,
            cols: PatternColumns::new(&src, mode, data.tx, data.rx),
            rows: PatternRows::new(&src, data.ty, data.ry, data.extend_y),
            row0: &[],
            row1: &[],
            wa: data.wa,
            wb: data.wb,
            wc: data.wc,
            wd: data.wd,
            acc: [0; 4],
        }
    }

    fn load_rows(&mut self) {
        let mut next = self.rows;
        next.advance();
        self.row0 = self.src.row(self.rows.row());
        self.row1 = self.src.row(next.row());
    }

    #[inline]
    fn weigh(&self, x: usize, w0: u32, w1: u32) -> Unpacked {
        let p0 = unpack(load_src(self.src.format, self.row0, x));
        let p1 = unpack(load_src(self.src.format, self.row1, x));
        core::array::from_fn(|i| p0[i] * w0 + p1[i] * w1)
    }
}

impl FetchPart for BilinearFetch<'_> {
    fn init_y(&mut self, y: i32) {
        self.rows.init(y);
        self.load_rows();
    }

    fn start_x(&mut self, x: i32) {
        self.cols.start(x);
        self.acc = self.weigh(self.cols.index(), self.wa, self.wc);
    }

    fn advance_x(&mut self, x: i32, _: u32) {
        self.start_x(x);
    }

    fn advance_y(&mut self) {
        self.rows.advance();
        self.load_rows();
    }

    #[inline]
    fn fetch(&mut self) -> u32 {
        self.cols.advance();
        let x = self.cols.index();
        let cur = self.weigh(x, self.wb, self.wd);
        let acc = self.acc;
        self.acc = self.weigh(x, self.wa, self.wc);
        pack(core::array::from_fn(|i| (cur[i] + acc[i]) >> 8))
    }
}

/// Affine transformed patterns, nearest or bilinear.
#[derive(Debug)]
pub(crate) struct AffineFetch<'a> {
    src: PatternSource<'a>,
    data: PatternAffineData,
    bilinear: bool,
    /// Sample position of the first pixel of the current row.
    base: [u64; 2],
    /// Current sample position.
    pos: [u64; 2],
}

#[inline(always)]
fn fixed(v: i64) -> u64 {
    v as u64
}

#[inline(always)]
fn hi(v: u64) -> i32 {
    (v >> 32) as i32
}

#[inline(always)]
fn with_hi(v: u64, hi: i32) -> u64 {
    (u64::from(hi as u32) << 32) | (v & 0xFFFF_FFFF)
}

impl<'a> AffineFetch<'a> {
    pub(crate) fn new(fetch_type: FetchType, src: PatternSource<'a>, data: &PatternAffineData) -> Self {
        Self {
            src,
            data: *data,
            bilinear: matches!(
                fetch_type,
                FetchType::PatternAffineBIAny | FetchType::PatternAffineBIOpt
            ),
            base: [0; 2],
            pos: [0; 2],
        }
    }

    #[inline]
    fn step(&self) -> [u64; 2] {
        [fixed(self.data.xx), fixed(self.data.xy)]
    }

    /// Bring the integer part of a position back into the period of each axis.
    fn normalize(&self, pos: [u64; 2]) -> [u64; 2] {
        let d = &self.data;
        let axis = |v: u64, tw: i32, rx: i32, ox: i32| {
            let mut x = hi(v) % tw;
            if x < 0 {
                x += rx;
            }
            if x > ox {
                x -= rx;
            }
            with_hi(v, x)
        };
        [
            axis(pos[0], d.tw, d.rx, d.ox),
            axis(pos[1], d.th, d.ry, d.oy),
        ]
    }

    #[inline]
    fn index_x(&self, off: i32) -> usize {
        let d = &self.data;
        index(self.pos[0], off, d.min_x, d.max_x, d.cor_x).min(self.src.width as usize - 1)
    }

    #[inline]
    fn index_y(&self, off: i32) -> u32 {
        let d = &self.data;
        index(self.pos[1], off, d.min_y, d.max_y, d.cor_y).min(self.src.height as usize - 1) as u32
    }

    #[inline]
    fn load(&self, x: usize, y: u32) -> Unpacked {
        unpack(load_src(self.src.format, self.src.row(y), x))
    }
}

#[inline(always)]
fn index(v: u64, off: i32, min: i32, max: i32, cor: i32) -> usize {
    let mut x = hi(v).wrapping_add(off).max(min);
    if x > max {
        x = cor;
    }
    (x ^ (x >> 31)) as usize
}

impl FetchPart for AffineFetch<'_> {
    fn init_y(&mut self, y: i32) {
        let y = y as i64 as u64;
        let d = &self.data;
        self.base = [
            fixed(d.tx).wrapping_add(fixed(d.yx).wrapping_mul(y)),
            fixed(d.ty).wrapping_add(fixed(d.yy).wrapping_mul(y)),
        ];
    }

    fn start_x(&mut self, x: i32) {
        let x = x as i64 as u64;
        let step = self.step();
        self.pos = self.normalize([
            self.base[0].wrapping_add(step[0].wrapping_mul(x)),
            self.base[1].wrapping_add(step[1].wrapping_mul(x)),
        ]);
    }

    fn advance_x(&mut self, _: i32, diff: u32) {
        let diff = u64::from(diff);
        let step = self.step();
        self.pos = self.normalize([
            self.pos[0].wrapping_add(step[0].wrapping_mul(diff)),
            self.pos[1].wrapping_add(step[1].wrapping_mul(diff)),
        ]);
    }

    fn advance_y(&mut self) {
        self.base = [
            self.base[0].wrapping_add(fixed(self.data.yx)),
            self.base[1].wrapping_add(fixed(self.data.yy)),
        ];
    }

    fn fetch(&mut self) -> u32 {
        let x0 = self.index_x(0);
        let y0 = self.index_y(0);
        let pixel = if self.bilinear {
            let x1 = self.index_x(1);
            let y1 = self.index_y(1);
            let wx = (self.pos[0] as u32) >> 24;
            let wy = (self.pos[1] as u32) >> 24;

            let p00 = self.load(x0, y0);
            let p01 = self.load(x0, y1);
            let p10 = self.load(x1, y0);
            let p11 = self.load(x1, y1);
            pack(core::array::from_fn(|i| {
                let left = ((p00[i] * (256 - wy) + p01[i] * wy) >> 8) * (256 - wx);
                let right = ((p10[i] * (256 - wy) + p11[i] * wy) >> 8) * wx;
                (left + right) >> 8
            }))
        } else {
            load_src(self.src.format, self.src.row(y0), x0)
        };

        let d = &self.data;
        let advance = |v: u64, step: u64, o: i32, r: i32| {
            let v = v.wrapping_add(step);
            if hi(v) > o {
                with_hi(v, hi(v).wrapping_sub(r))
            } else {
                v
            }
        };
        self.pos = [
            advance(self.pos[0], fixed(d.xx), d.ox, d.rx),
            advance(self.pos[1], fixed(d.xy), d.oy, d.ry),
        ];
        pixel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_pipe_common::fetch::{ExtendMode, PatternData, PatternMode, PatternQuality};
    use raster_pipe_common::format::FormatExt;
    use raster_pipe_common::kurbo::Affine;

    const RAMP: [u32; 4] = [0xFF00_0000, 0xFF40_4040, 0xFF80_8080, 0xFFC0_C0C0];

    fn simple(data: &PatternData<'_>) -> PatternSimpleData {
        match data.mode {
            PatternMode::Simple(s) => s,
            PatternMode::Affine(_) => panic!("expected a simple pattern"),
        }
    }

    fn row_of(fetch: &mut impl FetchPart, x: i32, n: usize) -> Vec<u32> {
        fetch.start_x(x);
        (0..n).map(|_| fetch.fetch()).collect()
    }

    #[test]
    fn aligned_repeat_wraps() {
        let src = PatternSource::from_pixels(&RAMP, 4, 1, FormatExt::Prgb32).unwrap();
        let (data, sig) = PatternData::init_ax_ay(src, ExtendMode::Repeat, 0, 0);
        let mut f = AlignedFetch::new(sig.fetch_type().unwrap(), src, &simple(&data));
        f.init_y(0);
        assert_eq!(row_of(&mut f, 3, 3), [RAMP[3], RAMP[0], RAMP[1]]);
        assert_eq!(row_of(&mut f, -1, 1), [RAMP[3]]);
    }

    #[test]
    fn aligned_reflect_mirrors() {
        let src = PatternSource::from_pixels(&RAMP, 4, 1, FormatExt::Prgb32).unwrap();
        let (data, sig) = PatternData::init_ax_ay(src, ExtendMode::Reflect, 0, 0);
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternAlignedRoR));
        let mut f = AlignedFetch::new(FetchType::PatternAlignedRoR, src, &simple(&data));
        f.init_y(0);
        assert_eq!(
            row_of(&mut f, 2, 8),
            [RAMP[2], RAMP[3], RAMP[3], RAMP[2], RAMP[1], RAMP[0], RAMP[0], RAMP[1]]
        );
    }

    #[test]
    fn blit_reads_pattern_at_its_position() {
        let src = PatternSource::from_pixels(&RAMP, 2, 2, FormatExt::Prgb32).unwrap();
        let (data, sig) = PatternData::init_blit(src, 10, 20);
        let mut f = AlignedFetch::new(sig.fetch_type().unwrap(), src, &simple(&data));
        f.init_y(21);
        assert_eq!(row_of(&mut f, 10, 2), [RAMP[2], RAMP[3]]);
    }

    #[test]
    fn half_pixel_shift_averages_neighbours() {
        let src = PatternSource::from_pixels(&RAMP, 4, 1, FormatExt::Prgb32).unwrap();
        // Shift right by half a pixel.
        let (data, sig) =
            PatternData::init_fx_fy(src, ExtendMode::Pad, PatternQuality::Bilinear, -128, 0);
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternFxPad));
        let mut f = BilinearFetch::new(FetchType::PatternFxPad, src, &simple(&data));
        f.init_y(0);
        assert_eq!(
            row_of(&mut f, 0, 4),
            [0xFF20_2020, 0xFF60_6060, 0xFFA0_A0A0, RAMP[3]]
        );
    }

    #[test]
    fn affine_scale_samples_every_other_pixel() {
        let src = PatternSource::from_pixels(&RAMP, 4, 1, FormatExt::Prgb32).unwrap();
        let (data, sig) = PatternData::init_affine(
            src,
            ExtendMode::Pad,
            PatternQuality::Nearest,
            &Affine::scale(0.5),
        );
        let PatternMode::Affine(affine) = data.mode else {
            panic!("expected an affine pattern");
        };
        let mut f = AffineFetch::new(sig.fetch_type().unwrap(), src, &affine);
        f.init_y(0);
        assert_eq!(row_of(&mut f, 0, 3), [RAMP[1], RAMP[3], RAMP[3]]);
    }
}
