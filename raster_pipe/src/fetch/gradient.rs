// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gradient fetchers.
//!
//! Every fetcher computes a lookup table index per pixel. Nearest fetchers read the 8-bit
//! table, dithered fetchers read the 16-bit table and round each channel with an ordered
//! dither matrix anchored at the destination origin.

use raster_pipe_common::fetch::{ConicData, LinearData, RadialData};
use raster_pipe_common::gradient::GradientLut;

use super::FetchPart;

/// 16x16 ordered dither matrix.
#[rustfmt::skip]
const BAYER: [[u8; 16]; 16] = [
    [  0, 191,  48, 239,  12, 203,  60, 251,   3, 194,  51, 242,  15, 206,  63, 254],
    [127,  64, 175, 112, 139,  76, 187, 124, 130,  67, 178, 115, 142,  79, 190, 127],
    [ 32, 223,  16, 207,  44, 235,  28, 219,  35, 226,  19, 210,  47, 238,  31, 222],
    [159,  96, 143,  80, 171, 108, 155,  92, 162,  99, 146,  83, 174, 111, 158,  95],
    [  8, 199,  56, 247,   4, 195,  52, 243,  11, 202,  59, 250,   7, 198,  55, 246],
    [135,  72, 183, 120, 131,  68, 179, 116, 138,  75, 186, 123, 134,  71, 182, 119],
    [ 40, 231,  24, 215,  36, 227,  20, 211,  43, 234,  27, 218,  39, 230,  23, 214],
    [167, 104, 151,  88, 163, 100, 147,  84, 170, 107, 154,  91, 166, 103, 150,  87],
    [  2, 193,  50, 241,  14, 205,  62, 253,   1, 192,  49, 240,  13, 204,  61, 252],
    [129,  66, 177, 114, 141,  78, 189, 126, 128,  65, 176, 113, 140,  77, 188, 125],
    [ 34, 225,  18, 209,  46, 237,  30, 221,  33, 224,  17, 208,  45, 236,  29, 220],
    [161,  98, 145,  82, 173, 110, 157,  94, 160,  97, 144,  81, 172, 109, 156,  93],
    [ 10, 201,  58, 249,   6, 197,  54, 245,   9, 200,  57, 248,   5, 196,  53, 244],
    [137,  74, 185, 122, 133,  70, 181, 118, 136,  73, 184, 121, 132,  69, 180, 117],
    [ 42, 233,  26, 217,  38, 229,  22, 213,  41, 232,  25, 216,  37, 228,  21, 212],
    [169, 106, 153,  90, 165, 102, 149,  86, 168, 105, 152,  89, 164, 101, 148,  85],
];

/// Round a 16-bit per channel entry to 8 bits, adding dither value `d`.
///
/// Channels never exceed the (undithered) alpha, so the result stays premultiplied.
#[inline]
fn dither(p64: u64, d: u32) -> u32 {
    let a = (p64 >> 56) as u32;
    let channel = |shift: u32| {
        let c = ((p64 >> shift) & 0xFFFF) as u32;
        ((c + d) >> 8).min(a)
    };
    (a << 24) | (channel(32) << 16) | (channel(16) << 8) | channel(0)
}

/// Position in the dither matrix.
#[derive(Debug, Clone, Copy)]
struct DitherPos {
    origin: (i32, i32),
    row: usize,
    x: i32,
}

impl DitherPos {
    #[inline]
    fn next(&mut self) -> u32 {
        let d = BAYER[self.row][(self.x & 15) as usize];
        self.x = self.x.wrapping_add(1);
        u32::from(d)
    }
}

/// Table reads shared by all gradient fetchers.
#[derive(Debug)]
struct Lookup<'a> {
    lut: &'a GradientLut,
    dither: Option<DitherPos>,
}

impl<'a> Lookup<'a> {
    fn new(lut: &'a GradientLut, dither: Option<(i32, i32)>) -> Self {
        Self {
            lut,
            dither: dither.map(|origin| DitherPos {
                origin,
                row: 0,
                x: 0,
            }),
        }
    }

    fn init_y(&mut self, y: i32) {
        if let Some(d) = &mut self.dither {
            d.row = (d.origin.1.wrapping_add(y) & 15) as usize;
        }
    }

    #[inline]
    fn start_x(&mut self, x: i32) {
        if let Some(d) = &mut self.dither {
            d.x = d.origin.0.wrapping_add(x);
        }
    }

    fn advance_y(&mut self) {
        if let Some(d) = &mut self.dither {
            d.row = (d.row + 1) & 15;
        }
    }

    #[inline]
    fn get(&mut self, index: u32) -> u32 {
        let index = index as usize;
        match &mut self.dither {
            None => self.lut.prgb32()[index],
            Some(d) => dither(self.lut.prgb64()[index], d.next()),
        }
    }
}

/// Map an unbounded index into `0..=maxi`, by clamping or by repeating/reflecting.
#[inline(always)]
fn extend_index(index: u32, maxi: u32, rori: u32, ror: bool) -> u32 {
    if ror {
        let t = index & maxi;
        t.min(t ^ rori)
    } else {
        (index as i32).clamp(0, maxi as i32) as u32
    }
}

#[derive(Debug)]
pub(crate) struct LinearFetch<'a> {
    lookup: Lookup<'a>,
    data: LinearData,
    ror: bool,
    /// Table position at `x = 0` of the current row.
    row: u64,
    pos: u64,
}

impl<'a> LinearFetch<'a> {
    pub(crate) fn new(
        lut: &'a GradientLut,
        data: &LinearData,
        ror: bool,
        dither: Option<(i32, i32)>,
    ) -> Self {
        Self {
            lookup: Lookup::new(lut, dither),
            data: *data,
            ror,
            row: 0,
            pos: 0,
        }
    }
}

impl FetchPart for LinearFetch<'_> {
    fn init_y(&mut self, y: i32) {
        self.row = self
            .data
            .pt
            .wrapping_add(self.data.dy.wrapping_mul(y as i64 as u64));
        self.lookup.init_y(y);
    }

    fn start_x(&mut self, x: i32) {
        self.pos = self
            .row
            .wrapping_add(self.data.dt.wrapping_mul(x as i64 as u64));
        self.lookup.start_x(x);
    }

    fn advance_x(&mut self, x: i32, diff: u32) {
        self.pos = self
            .pos
            .wrapping_add(self.data.dt.wrapping_mul(u64::from(diff)));
        self.lookup.start_x(x);
    }

    fn advance_y(&mut self) {
        self.row = self.row.wrapping_add(self.data.dy);
        self.lookup.advance_y();
    }

    #[inline]
    fn fetch(&mut self) -> u32 {
        let index = extend_index(
            (self.pos >> 32) as u32,
            self.data.maxi,
            self.data.rori,
            self.ror,
        );
        self.pos = self.pos.wrapping_add(self.data.dt);
        self.lookup.get(index)
    }
}

/// Two point radial gradients.
///
/// The table position along a row is `b + sqrt(d)`, where `b` is linear and `d` quadratic in
/// `x`. Both are set up per row in double precision and evaluated per pixel in single
/// precision.
#[derive(Debug)]
pub(crate) struct RadialFetch<'a> {
    lookup: Lookup<'a>,
    data: RadialData,
    ror: bool,
    y: f64,
    x: f32,
    b: f32,
    d: f32,
    dd: f32,
}

impl<'a> RadialFetch<'a> {
    pub(crate) fn new(
        lut: &'a GradientLut,
        data: &RadialData,
        ror: bool,
        dither: Option<(i32, i32)>,
    ) -> Self {
        Self {
            lookup: Lookup::new(lut, dither),
            data: *data,
            ror,
            y: 0.0,
            x: 0.0,
            b: 0.0,
            d: 0.0,
            dd: 0.0,
        }
    }
}

impl FetchPart for RadialFetch<'_> {
    fn init_y(&mut self, y: i32) {
        self.y = f64::from(y);
        self.lookup.init_y(y);
    }

    fn start_x(&mut self, x: i32) {
        let r = &self.data;
        let y = self.y;
        let ptx = r.yx * y + r.tx;
        let pty = r.yy * y + r.ty;
        let b = y * r.by + r.b0;

        self.x = x as f32;
        self.b = (b * r.inv2a) as f32;
        self.d = ((r.amul4 * (ptx * ptx + pty * pty - r.sq_fr) + b * b) * r.sq_inv2a) as f32;
        self.dd = ((y * r.ddy + r.dd0) * r.sq_inv2a) as f32;
        self.lookup.start_x(x);
    }

    fn advance_x(&mut self, x: i32, diff: u32) {
        self.x += diff as f32;
        self.lookup.start_x(x);
    }

    fn advance_y(&mut self) {
        self.y += 1.0;
        self.lookup.advance_y();
    }

    #[inline]
    fn fetch(&mut self) -> u32 {
        let x = self.x;
        let a = (x * x * self.data.ddd + (x * self.dd + self.d)).abs().sqrt();
        let v = x * self.data.bd + self.b + a;
        self.x += 1.0;

        let index = extend_index(v as i32 as u32, self.data.maxi, self.data.rori, self.ror);
        self.lookup.get(index)
    }
}

/// Conic gradients, with a polynomial `atan` folded into one octant.
#[derive(Debug)]
pub(crate) struct ConicFetch<'a> {
    lookup: Lookup<'a>,
    data: ConicData,
    y: f64,
    x: f32,
    tx: f32,
    /// Absolute vertical distance from the center, constant along a row.
    ay: f32,
    /// Angle added below the center.
    by: f32,
}

impl<'a> ConicFetch<'a> {
    pub(crate) fn new(lut: &'a GradientLut, data: &ConicData, dither: Option<(i32, i32)>) -> Self {
        Self {
            lookup: Lookup::new(lut, dither),
            data: *data,
            y: 0.0,
            x: 0.0,
            tx: 0.0,
            ay: 0.0,
            by: 0.0,
        }
    }
}

impl FetchPart for ConicFetch<'_> {
    fn init_y(&mut self, y: i32) {
        self.y = f64::from(y);
        self.lookup.init_y(y);
    }

    fn start_x(&mut self, x: i32) {
        let c = &self.data;
        let tpx = c.tx + c.yx * self.y;
        let tpy = (c.ty + c.yy * self.y) as f32;

        self.tx = tpx as f32;
        self.by = if tpy < 0.0 { c.n_div_1_2_4[0] } else { 0.0 };
        self.ay = tpy.abs();
        self.x = x as f32;
        self.lookup.start_x(x);
    }

    fn advance_x(&mut self, x: i32, diff: u32) {
        self.x += diff as f32;
        self.lookup.start_x(x);
    }

    fn advance_y(&mut self) {
        self.y += 1.0;
        self.lookup.advance_y();
    }

    #[inline]
    fn fetch(&mut self) -> u32 {
        let c = &self.data;
        let [n, n_2, n_4] = c.n_div_1_2_4;

        let x = self.x * c.xx + self.tx;
        let ax = x.abs();
        let mn = ax.min(self.ay);
        let mx = ax.max(self.ay);
        let s = if ax == mn { n_4 } else { 0.0 };

        let p = if mx > 0.0 { mn / mx } else { 0.0 };
        let p2 = p * p;
        let mut v = ((p2 * c.q[3] + c.q[2]) * p2 + c.q[1]) * p2 + c.q[0];
        v = (v * p - s).abs();
        v = (v - if x.is_sign_negative() { n_2 } else { 0.0 }).abs();
        v = (v - self.by).abs() + c.offset;
        self.x += 1.0;

        let index = (v.round_ties_even() as i32).min(c.maxi) as u32 & c.rori;
        self.lookup.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_pipe_common::fetch::{
        ConicGradientValues, GradientData, GradientKind, GradientQuality, LinearGradientValues,
        RadialGradientValues,
    };
    use raster_pipe_common::kurbo::{Affine, Point};
    use raster_pipe_common::peniko::{Color, ColorStop, Extend};

    fn gray_lut() -> GradientLut {
        let stops = [
            ColorStop {
                offset: 0.0,
                color: Color::BLACK,
            },
            ColorStop {
                offset: 1.0,
                color: Color::WHITE,
            },
        ];
        GradientLut::from_stops(&stops, 256)
    }

    fn sample(f: &mut impl FetchPart, x: i32, y: i32) -> u32 {
        f.init_y(y);
        f.start_x(x);
        f.fetch()
    }

    /// One table entry per pixel, entry `x` at pixel `x`.
    fn linear(lut: &GradientLut, extend: Extend) -> LinearData {
        let values = LinearGradientValues {
            p0: Point::new(0.0, 0.0),
            p1: Point::new(256.0, 0.0),
        };
        let (data, _) = GradientData::init_linear(
            lut,
            &values,
            extend,
            GradientQuality::Nearest,
            &Affine::IDENTITY,
        );
        match data.kind {
            GradientKind::Linear(linear) => linear,
            _ => panic!("expected a linear gradient"),
        }
    }

    #[test]
    fn linear_extend_modes() {
        let lut = gray_lut();
        let e = lut.prgb32();

        let pad = linear(&lut, Extend::Pad);
        let mut f = LinearFetch::new(&lut, &pad, false, None);
        assert_eq!(sample(&mut f, 0, 0), e[0]);
        assert_eq!(sample(&mut f, 100, 7), e[100]);
        assert_eq!(sample(&mut f, -5, 0), e[0]);
        assert_eq!(sample(&mut f, 300, 0), e[255]);

        let repeat = linear(&lut, Extend::Repeat);
        let mut f = LinearFetch::new(&lut, &repeat, true, None);
        assert_eq!(sample(&mut f, 259, 0), e[3]);
        assert_eq!(sample(&mut f, -1, 0), e[255]);

        let reflect = linear(&lut, Extend::Reflect);
        let mut f = LinearFetch::new(&lut, &reflect, true, None);
        assert_eq!(sample(&mut f, 256, 0), e[255]);
        assert_eq!(sample(&mut f, 300, 0), e[211]);
        assert_eq!(sample(&mut f, -1, 0), e[0]);
    }

    #[test]
    fn linear_gaps_and_rows() {
        let lut = gray_lut();
        let pad = linear(&lut, Extend::Pad);
        let mut f = LinearFetch::new(&lut, &pad, false, None);
        f.init_y(0);
        f.start_x(10);
        assert_eq!(f.fetch(), lut.prgb32()[10]);
        f.advance_x(20, 9);
        assert_eq!(f.fetch(), lut.prgb32()[20]);
        f.advance_y();
        f.start_x(30);
        assert_eq!(f.fetch(), lut.prgb32()[30]);
    }

    #[test]
    fn dither_rounds_within_alpha() {
        let p64 = 0xFFFF_8080_4000_0000;
        assert_eq!(dither(p64, 0), 0xFF80_4000);
        assert_eq!(dither(p64, 255), 0xFF81_4000);
        // Channels are capped by alpha.
        assert_eq!(dither(0x8000_80FF_0000_0000, 255), 0x8080_0000);
        assert_eq!(BAYER[0][0], 0);
        assert_eq!(BAYER[15][15], 85);
    }

    #[test]
    fn dither_anchors_to_origin() {
        let lut = gray_lut();
        let pad = linear(&lut, Extend::Pad);
        let mut f = LinearFetch::new(&lut, &pad, false, Some((1, 0)));
        f.init_y(0);
        f.start_x(0);
        f.fetch();
        let second = f.fetch();
        // Pixel 1 with the origin shifted by one reads dither column 2.
        assert_eq!(second, dither(lut.prgb64()[1], u32::from(BAYER[0][2])));
    }

    #[test]
    fn radial_index_is_distance() {
        let lut = gray_lut();
        let values = RadialGradientValues {
            center: Point::new(0.0, 0.0),
            focal: Point::new(0.0, 0.0),
            center_radius: 256.0,
            focal_radius: 0.0,
        };
        let radial = |extend| {
            let (data, _) = GradientData::init_radial(
                &lut,
                &values,
                extend,
                GradientQuality::Nearest,
                &Affine::IDENTITY,
            );
            match data.kind {
                GradientKind::Radial(radial) => radial,
                _ => panic!("expected a radial gradient"),
            }
        };
        let e = lut.prgb32();

        let pad = radial(Extend::Pad);
        let mut f = RadialFetch::new(&lut, &pad, false, None);
        assert_eq!(sample(&mut f, 100, 0), e[100]);
        assert_eq!(sample(&mut f, 0, 100), e[100]);
        assert_eq!(sample(&mut f, 300, 0), e[255]);

        let repeat = radial(Extend::Repeat);
        let mut f = RadialFetch::new(&lut, &repeat, true, None);
        assert_eq!(sample(&mut f, 300, 0), e[44]);
    }

    #[test]
    fn conic_quadrants() {
        let lut = gray_lut();
        let values = ConicGradientValues {
            center: Point::new(0.0, 0.0),
            angle: 0.0,
            repeat: 1.0,
        };
        let (data, _) = GradientData::init_conic(
            &lut,
            &values,
            GradientQuality::Nearest,
            &Affine::IDENTITY,
        );
        let GradientKind::Conic(conic) = data.kind else {
            panic!("expected a conic gradient");
        };
        let e = lut.prgb32();
        let mut f = ConicFetch::new(&lut, &conic, None);
        assert_eq!(sample(&mut f, 99, 0), e[0]);
        assert_eq!(sample(&mut f, 0, 99), e[63]);
        assert_eq!(sample(&mut f, -100, 0), e[127]);
        assert_eq!(sample(&mut f, 0, -100), e[192]);
    }
}
