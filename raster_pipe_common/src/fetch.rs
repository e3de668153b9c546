// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fetch descriptors.
//!
//! The init functions in this module turn a high level source description (a pattern with a
//! transform, gradient values with a transform) into the fixed-point constants consumed by the
//! fetch parts. Each returns the descriptor together with a [`Signature`] that only holds the
//! fetch type, or only the pending flag if the source can't be rendered.

use peniko::kurbo::{Affine, Point};
use peniko::{Color, Extend};

use crate::format::FormatExt;
use crate::gradient::GradientLut;
use crate::signature::{FetchType, Signature};

/// Extend mode of a pattern, which may differ per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExtendMode {
    /// Pad both axes.
    #[default]
    Pad,
    /// Repeat both axes.
    Repeat,
    /// Reflect both axes.
    Reflect,
    /// Pad horizontally, repeat vertically.
    PadXRepeatY,
    /// Pad horizontally, reflect vertically.
    PadXReflectY,
    /// Repeat horizontally, pad vertically.
    RepeatXPadY,
    /// Repeat horizontally, reflect vertically.
    RepeatXReflectY,
    /// Reflect horizontally, pad vertically.
    ReflectXPadY,
    /// Reflect horizontally, repeat vertically.
    ReflectXRepeatY,
}

impl ExtendMode {
    /// Combine per axis extend modes.
    pub const fn from_xy(x: Extend, y: Extend) -> Self {
        match (x, y) {
            (Extend::Pad, Extend::Pad) => Self::Pad,
            (Extend::Repeat, Extend::Repeat) => Self::Repeat,
            (Extend::Reflect, Extend::Reflect) => Self::Reflect,
            (Extend::Pad, Extend::Repeat) => Self::PadXRepeatY,
            (Extend::Pad, Extend::Reflect) => Self::PadXReflectY,
            (Extend::Repeat, Extend::Pad) => Self::RepeatXPadY,
            (Extend::Repeat, Extend::Reflect) => Self::RepeatXReflectY,
            (Extend::Reflect, Extend::Pad) => Self::ReflectXPadY,
            (Extend::Reflect, Extend::Repeat) => Self::ReflectXRepeatY,
        }
    }

    /// Horizontal extend mode.
    pub const fn x(self) -> Extend {
        match self {
            Self::Pad | Self::PadXRepeatY | Self::PadXReflectY => Extend::Pad,
            Self::Repeat | Self::RepeatXPadY | Self::RepeatXReflectY => Extend::Repeat,
            Self::Reflect | Self::ReflectXPadY | Self::ReflectXRepeatY => Extend::Reflect,
        }
    }

    /// Vertical extend mode.
    pub const fn y(self) -> Extend {
        match self {
            Self::Pad | Self::RepeatXPadY | Self::ReflectXPadY => Extend::Pad,
            Self::Repeat | Self::PadXRepeatY | Self::ReflectXRepeatY => Extend::Repeat,
            Self::Reflect | Self::PadXReflectY | Self::RepeatXReflectY => Extend::Reflect,
        }
    }
}

impl From<Extend> for ExtendMode {
    fn from(value: Extend) -> Self {
        Self::from_xy(value, value)
    }
}

const fn extend_index(extend: Extend) -> u32 {
    match extend {
        Extend::Pad => 0,
        Extend::Repeat => 1,
        Extend::Reflect => 2,
    }
}

/// Pattern sampling quality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PatternQuality {
    /// Nearest neighbor.
    #[default]
    Nearest,
    /// Bilinear interpolation.
    Bilinear,
}

/// Gradient quality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GradientQuality {
    /// Nearest lookup table entry.
    #[default]
    Nearest,
    /// Ordered dithering of a 16-bit per channel lookup table.
    Dither,
}

/// A constant color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolidData {
    /// Premultiplied ARGB32.
    pub prgb32: u32,
}

impl SolidData {
    /// A solid source from a premultiplied color.
    pub const fn new(prgb32: u32) -> Self {
        Self { prgb32 }
    }

    /// A solid source from a straight ARGB32 color.
    pub const fn from_argb32(argb32: u32) -> Self {
        Self::new(premultiply_argb32(argb32))
    }

    /// A solid source from a color.
    pub const fn from_color(color: Color) -> Self {
        let argb32 = ((color.a as u32) << 24)
            | ((color.r as u32) << 16)
            | ((color.g as u32) << 8)
            | color.b as u32;
        Self::from_argb32(argb32)
    }
}

#[inline(always)]
const fn mul_div_255(a: u32, b: u32) -> u32 {
    let x = a * b + 128;
    (x + (x >> 8)) >> 8
}

/// Premultiply a straight ARGB32 color, rounding each channel with the exact division by 255.
pub const fn premultiply_argb32(argb32: u32) -> u32 {
    let a = argb32 >> 24;
    let r = mul_div_255((argb32 >> 16) & 0xFF, a);
    let g = mul_div_255((argb32 >> 8) & 0xFF, a);
    let b = mul_div_255(argb32 & 0xFF, a);
    (a << 24) | (r << 16) | (g << 8) | b
}

/// Pixels of a pattern.
#[derive(Clone, Copy, Debug)]
pub struct PatternSource<'a> {
    /// Pixel rows, `stride` bytes apart. 32-bit pixels are native endian ARGB32 words.
    pub pixels: &'a [u8],
    /// Distance between rows in bytes.
    pub stride: usize,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: FormatExt,
}

impl<'a> PatternSource<'a> {
    /// Create a pattern source, returning `None` if `pixels` is too short or the format can't be
    /// sampled.
    pub fn new(
        pixels: &'a [u8],
        stride: usize,
        width: u32,
        height: u32,
        format: FormatExt,
    ) -> Option<Self> {
        if matches!(format, FormatExt::None) {
            return None;
        }
        let row_bytes = width as usize * format.bytes_per_pixel();
        if stride < row_bytes {
            return None;
        }
        if height != 0 && pixels.len() < stride * (height as usize - 1) + row_bytes {
            return None;
        }
        Some(Self {
            pixels,
            stride,
            width,
            height,
            format,
        })
    }

    /// Create a pattern source over tightly packed 32-bit pixels.
    pub fn from_pixels(pixels: &'a [u32], width: u32, height: u32, format: FormatExt) -> Option<Self> {
        if format.bytes_per_pixel() != 4 {
            return None;
        }
        Self::new(
            bytemuck::cast_slice(pixels),
            width as usize * 4,
            width,
            height,
            format,
        )
    }

    /// Bytes of row `y`.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        &self.pixels[start..start + self.width as usize * self.format.bytes_per_pixel()]
    }

    /// Whether the pattern has no pixels.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Constants of aligned and fractionally translated pattern fetchers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternSimpleData {
    /// Horizontal translation, added to the destination x.
    pub tx: i32,
    /// Vertical translation, added to the destination y.
    pub ty: i32,
    /// Horizontal repeat extent, `0` when padding, `2 * width` when reflecting.
    pub rx: i32,
    /// Vertical repeat extent, `0` when padding, `2 * height` when reflecting.
    pub ry: i32,
    /// Vertical extend mode; horizontal extend is encoded in the fetch type.
    pub extend_y: Extend,
    /// Bilinear weight of `[x0, y0]`.
    pub wa: u32,
    /// Bilinear weight of `[x1, y0]`.
    pub wb: u32,
    /// Bilinear weight of `[x0, y1]`.
    pub wc: u32,
    /// Bilinear weight of `[x1, y1]`.
    pub wd: u32,
}

/// Constants of affine pattern fetchers, in 32.32 fixed point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternAffineData {
    /// Source x advance per destination x.
    pub xx: i64,
    /// Source y advance per destination x.
    pub xy: i64,
    /// Source x advance per destination y.
    pub yx: i64,
    /// Source y advance per destination y.
    pub yy: i64,
    /// Source x at the destination origin.
    pub tx: i64,
    /// Source y at the destination origin.
    pub ty: i64,
    /// Horizontal normalization extent.
    pub rx: i32,
    /// Vertical normalization extent.
    pub ry: i32,
    /// Largest horizontal integer position before normalization kicks in.
    pub ox: i32,
    /// Largest vertical integer position before normalization kicks in.
    pub oy: i32,
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
    /// Index used when `x > max_x`.
    pub cor_x: i32,
    /// Index used when `y > max_y`.
    pub cor_y: i32,
    /// Modulus of the integer x position, `i32::MAX` when padding.
    pub tw: i32,
    /// Modulus of the integer y position, `i32::MAX` when padding.
    pub th: i32,
}

/// How pattern coordinates are derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternMode {
    /// Integer or fractional translation.
    Simple(PatternSimpleData),
    /// Arbitrary affine transform.
    Affine(PatternAffineData),
}

/// A pattern fetch.
#[derive(Clone, Copy, Debug)]
pub struct PatternData<'a> {
    /// Pixels.
    pub src: PatternSource<'a>,
    /// Coordinate constants.
    pub mode: PatternMode,
}

#[inline]
fn is_near(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-14
}

fn invert(transform: &Affine) -> Option<Affine> {
    let det = transform.determinant();
    (det != 0.0 && det.is_finite()).then(|| transform.inverse())
}

impl<'a> PatternData<'a> {
    fn pending(src: PatternSource<'a>) -> (Self, Signature) {
        let data = Self {
            src,
            mode: PatternMode::Simple(PatternSimpleData::default()),
        };
        (data, Signature::ZERO.with_pending())
    }

    /// A pattern placed at integer `x, y` that never samples outside of its pixels.
    pub fn init_blit(src: PatternSource<'a>, x: i32, y: i32) -> (Self, Signature) {
        let simple = PatternSimpleData {
            tx: x,
            ty: y,
            ..PatternSimpleData::default()
        };
        let data = Self {
            src,
            mode: PatternMode::Simple(simple),
        };
        (
            data,
            Signature::ZERO.with_fetch_type(FetchType::PatternAlignedBlit),
        )
    }

    /// A pattern placed at integer `x, y`.
    pub fn init_ax_ay(
        src: PatternSource<'a>,
        extend: ExtendMode,
        x: i32,
        y: i32,
    ) -> (Self, Signature) {
        Self::init_tx_ty(
            src,
            FetchType::PatternAlignedPad,
            extend,
            -x,
            -y,
            false,
            PatternSimpleData::default(),
        )
    }

    /// A pattern placed at `tx64, ty64` in 24.8 fixed point.
    pub fn init_fx_fy(
        src: PatternSource<'a>,
        extend: ExtendMode,
        quality: PatternQuality,
        tx64: i64,
        ty64: i64,
    ) -> (Self, Signature) {
        let wx = (tx64 & 0xFF) as u32;
        let wy = (ty64 & 0xFF) as u32;
        let mut tx = -((tx64 >> 8) as i32);
        let mut ty = -((ty64 >> 8) as i32);

        let mut base = FetchType::PatternAlignedPad;
        let mut weights = PatternSimpleData::default();
        let mut fractional = (wx | wy) != 0;

        if fractional {
            if quality == PatternQuality::Nearest {
                tx -= i32::from(wx >= 128);
                ty -= i32::from(wy >= 128);
                fractional = false;
            } else {
                weights.wa = (wy * wx) >> 8;
                weights.wb = (wy * (256 - wx) + 255) >> 8;
                weights.wc = ((256 - wy) * wx) >> 8;
                weights.wd = ((256 - wy) * (256 - wx) + 255) >> 8;

                // The bilinear fetchers start one pixel up and to the left.
                tx -= 1;
                ty -= 1;

                base = if wy == 0 {
                    FetchType::PatternFxPad
                } else if wx == 0 {
                    FetchType::PatternFyPad
                } else {
                    FetchType::PatternFxFyPad
                };
            }
        }

        Self::init_tx_ty(src, base, extend, tx, ty, fractional, weights)
    }

    fn init_tx_ty(
        src: PatternSource<'a>,
        base: FetchType,
        extend: ExtendMode,
        mut tx: i32,
        mut ty: i32,
        fractional: bool,
        weights: PatternSimpleData,
    ) -> (Self, Signature) {
        let mut extend_x = extend.x();
        let mut extend_y = extend.y();

        // All extend modes agree for a single pixel, and the repeating fetchers need two.
        if src.width <= 1 {
            extend_x = Extend::Pad;
        }
        if src.height <= 1 {
            extend_y = Extend::Pad;
        }

        let mut rx = 0;
        let mut ry = 0;
        let mut offset = extend_index(extend_x);

        if extend_x != Extend::Pad {
            rx = (src.width as i32) << u32::from(extend_x == Extend::Reflect);
            if tx as u32 >= rx as u32 {
                tx %= rx;
            }
            if tx < 0 {
                tx += rx;
            }
            // Fractional fetchers only have a combined repeat-or-reflect variant.
            if fractional {
                offset = 1;
            }
        }

        if extend_y != Extend::Pad {
            ry = (src.height as i32) << u32::from(extend_y == Extend::Reflect);
            if ty as u32 >= ry as u32 {
                ty %= ry;
            }
            if ty < 0 {
                ty += ry;
            }
        }

        let simple = PatternSimpleData {
            tx,
            ty,
            rx,
            ry,
            extend_y,
            ..weights
        };
        let fetch = base.offset(offset).unwrap_or(base);
        (
            Self {
                src,
                mode: PatternMode::Simple(simple),
            },
            Signature::ZERO.with_fetch_type(fetch),
        )
    }

    /// A pattern mapped to the destination by `transform`.
    ///
    /// Transforms that only translate are routed to [`PatternData::init_fx_fy`].
    pub fn init_affine(
        src: PatternSource<'a>,
        extend: ExtendMode,
        quality: PatternQuality,
        transform: &Affine,
    ) -> (Self, Signature) {
        let Some(inv) = invert(transform) else {
            return Self::pending(src);
        };

        let mut tw = src.width as i32;
        let mut th = src.height as i32;
        if tw == 0 {
            return Self::pending(src);
        }

        let [mut xx, mut xy, mut yx, mut yy, m20, m21] = inv.as_coeffs();

        if is_near(xx, 1.0) && is_near(xy, 0.0) && is_near(yx, 0.0) && is_near(yy, 1.0) {
            let tx64 = (-m20 * 256.0).floor() as i64;
            let ty64 = (-m21 * 256.0).floor() as i64;
            return Self::init_fx_fy(src, extend, quality, tx64, ty64);
        }

        // The bilinear fetcher has no 16-bit addressing variant.
        let fetch = match quality {
            PatternQuality::Nearest
                if tw.max(th) < 32767 && src.stride <= i16::MAX as usize =>
            {
                FetchType::PatternAffineNNOpt
            }
            PatternQuality::Nearest => FetchType::PatternAffineNNAny,
            PatternQuality::Bilinear => FetchType::PatternAffineBIAny,
        };

        let extend_x = extend.x();
        let extend_y = extend.y();

        // Sample at pixel centers.
        let mut tx = m20 + 0.5 * (xx + yx);
        let mut ty = m21 + 0.5 * (xy + yy);

        let mut ox = i32::MAX;
        let mut oy = i32::MAX;
        let mut rx = 0;
        let mut ry = 0;

        let mut data = PatternAffineData {
            min_x: 0,
            min_y: 0,
            max_x: tw - 1,
            max_y: th - 1,
            cor_x: tw - 1,
            cor_y: th - 1,
            ..PatternAffineData::default()
        };

        if extend_x != Extend::Pad {
            data.min_x = i32::MIN;
            if extend_x == Extend::Repeat {
                data.cor_x = 0;
            }

            ox = tw;
            if extend_x == Extend::Reflect {
                tw *= 2;
            }

            if xx < 0.0 {
                xx = -xx;
                yx = -yx;
                tx = f64::from(tw) - tx;

                if extend_x == Extend::Repeat {
                    ox = 0;
                    data.cor_x = data.max_x;
                    data.max_x = -1;
                }
            }
            ox -= 1;
        }

        if extend_y != Extend::Pad {
            data.min_y = i32::MIN;
            if extend_y == Extend::Repeat {
                data.cor_y = 0;
            }

            oy = th;
            if extend_y == Extend::Reflect {
                th *= 2;
            }

            // Mirrors on the sign of `xy`, the same test the horizontal axis does on `xx`.
            if xy < 0.0 {
                xy = -xy;
                yy = -yy;
                ty = f64::from(th) - ty;

                if extend_y == Extend::Repeat {
                    oy = 0;
                    data.cor_y = data.max_y;
                    data.max_y = -1;
                }
            }
            oy -= 1;
        }

        if quality != PatternQuality::Nearest {
            tx -= 0.5;
            ty -= 0.5;
        }

        let mut tw_d = f64::from(tw);
        let mut th_d = f64::from(th);

        // Keep a single step from wrapping around the pattern more than once.
        if extend_x == Extend::Pad {
            tw_d = 2147483647.0;
        } else {
            tx %= tw_d;
            rx = tw;
            if xx >= tw_d {
                xx %= tw_d;
            }
        }

        if extend_y == Extend::Pad {
            th_d = 2147483647.0;
        } else {
            ty %= th_d;
            ry = th;
            if xy >= th_d {
                xy %= th_d;
            }
        }

        const FP_SCALE: f64 = 4294967296.0;
        let scaled = [xx, xy, yx, yy, tx, ty].map(|v| v * FP_SCALE);
        let in_range = scaled
            .iter()
            .all(|&v| v >= (i64::MIN + 1) as f64 && v <= i64::MAX as f64);

        if in_range {
            let [xx, xy, yx, yy, tx, ty] = scaled.map(|v| v.floor() as i64);
            data.xx = xx;
            data.xy = xy;
            data.yx = yx;
            data.yy = yy;
            data.tx = tx;
            data.ty = ty;
        }

        data.rx = rx;
        data.ry = ry;
        data.ox = ox;
        data.oy = oy;
        data.tw = tw_d as i32;
        data.th = th_d as i32;

        (
            Self {
                src,
                mode: PatternMode::Affine(data),
            },
            Signature::ZERO.with_fetch_type(fetch),
        )
    }
}

/// Linear gradient geometry, from `p0` (offset 0) to `p1` (offset 1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearGradientValues {
    pub p0: Point,
    pub p1: Point,
}

/// Two point radial gradient geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadialGradientValues {
    /// Center of the end circle.
    pub center: Point,
    /// Center of the start circle.
    pub focal: Point,
    /// Radius of the end circle.
    pub center_radius: f64,
    /// Radius of the start circle.
    pub focal_radius: f64,
}

/// Conic (sweep) gradient geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConicGradientValues {
    pub center: Point,
    /// Start angle in radians.
    pub angle: f64,
    /// Number of times the lookup table is swept per turn.
    pub repeat: f64,
}

/// Linear gradient constants, 32.32 fixed point lookup table positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinearData {
    /// Position at the destination origin.
    pub pt: u64,
    /// Advance per destination x.
    pub dt: u64,
    /// Advance per destination y.
    pub dy: u64,
    /// Largest index before wrapping: `size - 1`, or `2 * size - 1` when reflecting.
    pub maxi: u32,
    /// Reflection mask, `maxi` when reflecting and `0` otherwise.
    pub rori: u32,
}

/// Radial gradient constants.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RadialData {
    pub tx: f64,
    pub ty: f64,
    pub yx: f64,
    pub yy: f64,
    pub amul4: f64,
    pub inv2a: f64,
    pub sq_inv2a: f64,
    pub sq_fr: f64,
    pub b0: f64,
    pub by: f64,
    pub dd0: f64,
    pub ddy: f64,
    pub bd: f32,
    pub ddd: f32,
    pub maxi: u32,
    pub rori: u32,
}

/// Conic gradient constants.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConicData {
    pub tx: f64,
    pub ty: f64,
    pub yx: f64,
    pub yy: f64,
    /// Scaled coefficients of the `atan` approximation.
    pub q: [f32; 4],
    /// `n`, `n / 2` and `n / 4` where `n` is the swept table size.
    pub n_div_1_2_4: [f32; 3],
    pub offset: f32,
    pub xx: f32,
    pub maxi: i32,
    pub rori: u32,
}

/// Gradient kind and its constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientKind {
    Linear(LinearData),
    Radial(RadialData),
    Conic(ConicData),
}

/// A gradient fetch.
#[derive(Clone, Copy, Debug)]
pub struct GradientData<'a> {
    /// Lookup table.
    pub lut: &'a GradientLut,
    /// Geometry constants.
    pub kind: GradientKind,
}

fn ror_indices(extend: Extend, lut_size: u32) -> (u32, u32) {
    if extend == Extend::Reflect {
        let maxi = lut_size * 2 - 1;
        (maxi, maxi)
    } else {
        (lut_size - 1, 0)
    }
}

fn gradient_fetch(
    nn_pad: FetchType,
    dither_pad: FetchType,
    quality: GradientQuality,
    extend: Extend,
) -> FetchType {
    let base = match quality {
        GradientQuality::Nearest => nn_pad,
        GradientQuality::Dither => dither_pad,
    };
    base.offset(u32::from(extend != Extend::Pad))
        .unwrap_or(base)
}

/// Minimum distance of the focal point from the border of the end circle.
const FOCAL_DIST_LIMIT: f64 = 0.5;

/// Coefficients of `atan(x) * 256 / 2PI ~= x * (q0 + x^2 * (q1 + x^2 * (q2 + x^2 * q3)))`.
const CONIC_Q_256: [f64; 4] = [
    4.071421038552e+1,
    -1.311160794048e+1,
    6.017670215625,
    -1.623253505085,
];

impl<'a> GradientData<'a> {
    fn pending(lut: &'a GradientLut, kind: GradientKind) -> (Self, Signature) {
        (Self { lut, kind }, Signature::ZERO.with_pending())
    }

    /// A linear gradient.
    pub fn init_linear(
        lut: &'a GradientLut,
        values: &LinearGradientValues,
        extend: Extend,
        quality: GradientQuality,
        transform: &Affine,
    ) -> (Self, Signature) {
        let Some(inv) = invert(transform) else {
            return Self::pending(lut, GradientKind::Linear(LinearData::default()));
        };
        let [m00, m01, m10, m11, _, _] = inv.as_coeffs();

        let lut_size = lut.len() as u32;
        let (maxi, rori) = ror_indices(extend, lut_size);

        let ax = values.p1.x - values.p0.x;
        let ay = values.p1.y - values.p0.y;
        let dist = ax * ax + ay * ay;

        let p0 = *transform * values.p0;
        let ox = 0.5 - p0.x;
        let oy = 0.5 - p0.y;

        let mut dt = ax * m00 + ay * m01;
        let mut dy = ax * m10 + ay * m11;

        let scale = ((u64::from(lut_size) << 32) as i64) as f64 / dist;
        let mut offset = ox * dt + oy * dy;

        dt *= scale;
        dy *= scale;
        offset *= scale;

        let data = LinearData {
            pt: offset.floor() as i64 as u64,
            dt: dt.floor() as i64 as u64,
            dy: dy.floor() as i64 as u64,
            maxi,
            rori,
        };
        let fetch = gradient_fetch(
            FetchType::LinearNNPad,
            FetchType::LinearDitherPad,
            quality,
            extend,
        );
        (
            Self {
                lut,
                kind: GradientKind::Linear(data),
            },
            Signature::ZERO.with_fetch_type(fetch),
        )
    }

    /// A two point radial gradient.
    ///
    /// Computes the constants of `pos = (b + sqrt(d)) * scale` where `b` is linear in `x, y` and
    /// `d` is quadratic, evaluated incrementally along a row with first and second differences.
    pub fn init_radial(
        lut: &'a GradientLut,
        values: &RadialGradientValues,
        extend: Extend,
        quality: GradientQuality,
        transform: &Affine,
    ) -> (Self, Signature) {
        let Some(inv) = invert(transform) else {
            return Self::pending(lut, GradientKind::Radial(RadialData::default()));
        };

        let lut_size = lut.len() as u32;
        let (maxi, rori) = ror_indices(extend, lut_size);

        let cp = values.center;
        let mut fp = values.focal;
        let cr = values.center_radius;
        let fr = values.focal_radius;

        let mut dp = cp - fp;
        let dr = cr - fr;

        let mut sq_dx_plus_dy = dp.x * dp.x + dp.y * dp.y;
        let dx_plus_dy = sq_dx_plus_dy.sqrt();

        // Move a focal point that is too close to the border of the end circle.
        let dist_from_border = (dx_plus_dy - dr).abs();
        if dist_from_border < FOCAL_DIST_LIMIT {
            let dp0 = dp * (dr - FOCAL_DIST_LIMIT) / dx_plus_dy;
            let dp1 = dp * (dr + FOCAL_DIST_LIMIT) / dx_plus_dy;

            let dp0_dist = (dp0.x * dp0.x + dp0.y * dp0.y - sq_dx_plus_dy).abs();
            let dp1_dist = (dp1.x * dp1.x + dp1.y * dp1.y - sq_dx_plus_dy).abs();

            dp = if dp0_dist < dp1_dist { dp0 } else { dp1 };
            fp = cp - dp;
            sq_dx_plus_dy = dp.x * dp.x + dp.y * dp.y;
        }

        let a = dr * dr - sq_dx_plus_dy;
        let sq_fr = fr * fr;
        let scale = f64::from(lut_size);

        let [xx, xy, yx, yy, m20, m21] = inv.as_coeffs();
        let tp_x = m20 + (xx + xy) * 0.5 - fp.x;
        let tp_y = m21 + (yx + yy) * 0.5 - fp.y;

        let amul4 = a * 4.0;
        let inv2a = (scale * 0.5) / a;
        let sq_inv2a = inv2a * inv2a;

        let sq_xx_plus_sq_yx = xx * xx + xy * xy;
        let b0 = 2.0 * (dr * fr + tp_x * dp.x + tp_y * dp.y);
        let bx = 2.0 * (dp.x * xx + dp.y * xy);
        let by = 2.0 * (dp.x * yx + dp.y * yy);

        let bx_mul_2 = bx * 2.0;
        let sq_bx = bx * bx;

        let dd0 = sq_bx + bx_mul_2 * b0 + amul4 * (sq_xx_plus_sq_yx + 2.0 * (tp_x * xx + tp_y * xy));
        let ddy = bx_mul_2 * by + amul4 * (2.0 * (xx * yx + yy * xy));
        let ddd_half = sq_bx + amul4 * sq_xx_plus_sq_yx;

        let data = RadialData {
            tx: tp_x,
            ty: tp_y,
            yx,
            yy,
            amul4,
            inv2a,
            sq_inv2a,
            sq_fr,
            b0: -b0,
            by: -by,
            dd0: dd0 - ddd_half,
            ddy,
            bd: (-bx * inv2a) as f32,
            ddd: (ddd_half * sq_inv2a) as f32,
            maxi,
            rori,
        };
        let fetch = gradient_fetch(
            FetchType::RadialNNPad,
            FetchType::RadialDitherPad,
            quality,
            extend,
        );
        (
            Self {
                lut,
                kind: GradientKind::Radial(data),
            },
            Signature::ZERO.with_fetch_type(fetch),
        )
    }

    /// A conic gradient. The extend mode has no effect, the angle always repeats.
    pub fn init_conic(
        lut: &'a GradientLut,
        values: &ConicGradientValues,
        quality: GradientQuality,
        transform: &Affine,
    ) -> (Self, Signature) {
        let lut_size = lut.len() as u32;

        let center = *transform * values.center;
        let c = Point::new(0.5 - center.x, 0.5 - center.y);

        let [t00, t01, ..] = transform.as_coeffs();
        let matrix_angle = t01.atan2(t00);

        // Rotating the input only changes the linear part that is used below.
        let updated = *transform * Affine::rotate(-matrix_angle);

        let angle = values.angle + matrix_angle;
        let turns = angle / -core::f64::consts::TAU;
        let mut off = turns - turns.floor();
        if off != 0.0 {
            off -= 1.0;
        }

        let Some(inv) = invert(&updated) else {
            return Self::pending(lut, GradientKind::Conic(ConicData::default()));
        };
        let [m00, m01, m10, m11, _, _] = inv.as_coeffs();

        let repeated_lut_size = f64::from(lut_size) * values.repeat;
        let q_scale = repeated_lut_size / 256.0;

        let data = ConicData {
            tx: c.x * m00 + c.y * m10,
            ty: c.x * m01 + c.y * m11,
            yx: m10,
            yy: m11,
            q: CONIC_Q_256.map(|q| (q * q_scale) as f32),
            n_div_1_2_4: [
                repeated_lut_size as f32,
                (repeated_lut_size * 0.5) as f32,
                (repeated_lut_size * 0.25) as f32,
            ],
            offset: (off * repeated_lut_size - 0.5) as f32,
            xx: m00 as f32,
            maxi: i32::MAX,
            rori: lut_size - 1,
        };
        let fetch = match quality {
            GradientQuality::Nearest => FetchType::ConicNN,
            GradientQuality::Dither => FetchType::ConicDither,
        };
        (
            Self {
                lut,
                kind: GradientKind::Conic(data),
            },
            Signature::ZERO.with_fetch_type(fetch),
        )
    }
}

/// Fetch descriptor, one variant per family of [`FetchType`].
#[derive(Clone, Copy, Debug)]
pub enum FetchData<'a> {
    /// See [`SolidData`].
    Solid(SolidData),
    /// See [`PatternData`].
    Pattern(PatternData<'a>),
    /// See [`GradientData`].
    Gradient(GradientData<'a>),
}

impl FetchData<'_> {
    /// Whether this is a solid fetch.
    pub const fn is_solid(&self) -> bool {
        matches!(self, Self::Solid(_))
    }

    /// The format of the fetched pixels, as seen by the simplification table.
    pub fn src_format(&self) -> FormatExt {
        match self {
            Self::Solid(solid) => crate::format::format_from_rgba32(solid.prgb32),
            Self::Pattern(pattern) => pattern.src.format,
            Self::Gradient(gradient) => gradient.lut.format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::ColorStop;

    fn blue_green() -> [u32; 2] {
        [0xFF00_00FF, 0xFF00_FF00]
    }

    #[test]
    fn complex_extend_axes() {
        for x in [Extend::Pad, Extend::Repeat, Extend::Reflect] {
            for y in [Extend::Pad, Extend::Repeat, Extend::Reflect] {
                let mode = ExtendMode::from_xy(x, y);
                assert_eq!(mode.x(), x);
                assert_eq!(mode.y(), y);
            }
        }
    }

    #[test]
    fn premultiply_half_white() {
        assert_eq!(premultiply_argb32(0x80FF_FFFF), 0x8080_8080);
        assert_eq!(premultiply_argb32(0xFF12_3456), 0xFF12_3456);
        assert_eq!(premultiply_argb32(0x00FF_FFFF), 0);
    }

    #[test]
    fn pattern_source_is_validated() {
        let pixels = blue_green();
        assert!(PatternSource::from_pixels(&pixels, 2, 1, FormatExt::Prgb32).is_some());
        assert!(PatternSource::from_pixels(&pixels, 2, 2, FormatExt::Prgb32).is_none());
        assert!(PatternSource::from_pixels(&pixels, 2, 1, FormatExt::A8).is_none());
        assert!(PatternSource::new(&[0; 3], 2, 2, 2, FormatExt::A8).is_none());
        assert!(PatternSource::new(&[0; 4], 2, 2, 2, FormatExt::A8).is_some());
    }

    #[test]
    fn ax_ay_selects_extend_variant() {
        let pixels = [0_u32; 16];
        let src = PatternSource::from_pixels(&pixels, 4, 4, FormatExt::Prgb32).unwrap();

        let (_, sig) = PatternData::init_ax_ay(src, ExtendMode::Pad, 0, 0);
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternAlignedPad));
        let (_, sig) = PatternData::init_ax_ay(src, ExtendMode::Repeat, 0, 0);
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternAlignedRepeat));
        let (data, sig) = PatternData::init_ax_ay(src, ExtendMode::Reflect, 3, 0);
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternAlignedRoR));
        let PatternMode::Simple(simple) = data.mode else {
            panic!("expected a simple pattern");
        };
        assert_eq!(simple.rx, 8);
        assert_eq!(simple.tx, 5);
    }

    #[test]
    fn single_pixel_axis_always_pads() {
        let pixels = blue_green();
        let src = PatternSource::from_pixels(&pixels, 2, 1, FormatExt::Prgb32).unwrap();
        let (data, _) = PatternData::init_ax_ay(src, ExtendMode::Repeat, 0, 0);
        let PatternMode::Simple(simple) = data.mode else {
            panic!("expected a simple pattern");
        };
        assert_eq!(simple.extend_y, Extend::Pad);
        assert_eq!(simple.ry, 0);
        assert_eq!(simple.rx, 2);
    }

    #[test]
    fn fx_fy_weights() {
        let pixels = [0_u32; 16];
        let src = PatternSource::from_pixels(&pixels, 4, 4, FormatExt::Prgb32).unwrap();

        let (data, sig) =
            PatternData::init_fx_fy(src, ExtendMode::Pad, PatternQuality::Bilinear, 128, 128);
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternFxFyPad));
        let PatternMode::Simple(simple) = data.mode else {
            panic!("expected a simple pattern");
        };
        assert_eq!((simple.wa, simple.wb, simple.wc, simple.wd), (64, 64, 64, 64));
        assert_eq!((simple.tx, simple.ty), (-1, -1));

        let (_, sig) = PatternData::init_fx_fy(src, ExtendMode::Pad, PatternQuality::Bilinear, 64, 0);
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternFxPad));
        let (_, sig) =
            PatternData::init_fx_fy(src, ExtendMode::Repeat, PatternQuality::Bilinear, 0, 64);
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternFyRoR));

        // Nearest rounds the translation instead.
        let (data, sig) =
            PatternData::init_fx_fy(src, ExtendMode::Pad, PatternQuality::Nearest, 128 + 256, 0);
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternAlignedPad));
        let PatternMode::Simple(simple) = data.mode else {
            panic!("expected a simple pattern");
        };
        assert_eq!(simple.tx, -2);
    }

    #[test]
    fn affine_routes_translations() {
        let pixels = [0_u32; 16];
        let src = PatternSource::from_pixels(&pixels, 4, 4, FormatExt::Prgb32).unwrap();

        let (_, sig) = PatternData::init_affine(
            src,
            ExtendMode::Pad,
            PatternQuality::Nearest,
            &Affine::translate((2.0, 1.0)),
        );
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternAlignedPad));

        let (data, sig) = PatternData::init_affine(
            src,
            ExtendMode::Repeat,
            PatternQuality::Bilinear,
            &Affine::scale(2.0),
        );
        assert_eq!(sig.fetch_type(), Some(FetchType::PatternAffineBIAny));
        let PatternMode::Affine(affine) = data.mode else {
            panic!("expected an affine pattern");
        };
        assert_eq!(affine.xx, 1 << 31);
        assert_eq!(affine.rx, 4);
        assert_eq!(affine.ox, 3);

        let (_, sig) = PatternData::init_affine(
            src,
            ExtendMode::Pad,
            PatternQuality::Nearest,
            &Affine::scale(0.0),
        );
        assert!(sig.is_pending());
    }

    #[test]
    fn gradient_init_fetch_types() {
        let stops = [
            ColorStop {
                offset: 0.0,
                color: Color::rgba8(0, 0, 0, 255),
            },
            ColorStop {
                offset: 1.0,
                color: Color::rgba8(255, 255, 255, 255),
            },
        ];
        let lut = GradientLut::from_stops(&stops, 256);
        let linear = LinearGradientValues {
            p0: Point::new(0.0, 0.0),
            p1: Point::new(256.0, 0.0),
        };
        let (data, sig) = GradientData::init_linear(
            &lut,
            &linear,
            Extend::Reflect,
            GradientQuality::Dither,
            &Affine::IDENTITY,
        );
        assert_eq!(sig.fetch_type(), Some(FetchType::LinearDitherRoR));
        let GradientKind::Linear(l) = data.kind else {
            panic!("expected a linear gradient");
        };
        assert_eq!((l.maxi, l.rori), (511, 511));
        // One table entry per pixel.
        assert_eq!(l.dt, 1 << 32);
        assert_eq!(l.pt, 1 << 31);

        let conic = ConicGradientValues {
            center: Point::new(8.0, 8.0),
            angle: 0.0,
            repeat: 1.0,
        };
        let (data, sig) =
            GradientData::init_conic(&lut, &conic, GradientQuality::Nearest, &Affine::IDENTITY);
        assert_eq!(sig.fetch_type(), Some(FetchType::ConicNN));
        let GradientKind::Conic(c) = data.kind else {
            panic!("expected a conic gradient");
        };
        assert_eq!(c.rori, 255);
        assert_eq!(c.n_div_1_2_4, [256.0, 128.0, 64.0]);

        let (_, sig) = GradientData::init_linear(
            &lut,
            &linear,
            Extend::Pad,
            GradientQuality::Nearest,
            &Affine::scale(0.0),
        );
        assert!(sig.is_pending());
    }
}
