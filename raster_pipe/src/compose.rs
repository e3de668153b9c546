// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composition operator kernels.
//!
//! Every operator has a kernel for premultiplied 32-bit pixels and one for alpha-only
//! destinations. All values are integers in `0..=255` and products are rounded with an exact
//! division by 255. Coverage is applied after the operator, see [`apply_mask`].

use raster_pipe_common::compop::CompOpExt;

use crate::pixel::{addus8, div255, pack, unpack, ALPHA};
use crate::util::scalar::{self, div_255};

/// Kernels of one composition operator.
#[derive(Clone, Copy)]
pub struct CompOpKernel {
    op: CompOpExt,
    prgb32: fn(u32, u32) -> u32,
    a8: fn(u32, u32) -> u32,
}

impl CompOpKernel {
    /// The operator these kernels implement.
    pub const fn comp_op(&self) -> CompOpExt {
        self.op
    }

    /// Composite a premultiplied source pixel onto a premultiplied destination pixel.
    #[inline(always)]
    pub fn prgb32(&self, dst: u32, src: u32) -> u32 {
        (self.prgb32)(dst, src)
    }

    /// Composite a source alpha onto a destination alpha.
    #[inline(always)]
    pub fn a8(&self, dst: u32, src: u32) -> u32 {
        (self.a8)(dst, src)
    }
}

impl core::fmt::Debug for CompOpKernel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("CompOpKernel").field(&self.op).finish()
    }
}

/// Kernels of `op`.
pub fn kernel(op: CompOpExt) -> &'static CompOpKernel {
    &KERNELS[op.id() as usize]
}

/// Blend the unmasked result `res` with the original destination `dst` by coverage `m`.
///
/// This is `res * m + dst * (1 - m)` per channel, so a coverage of 255 keeps `res` and a
/// coverage of 0 keeps `dst`.
#[inline(always)]
pub fn apply_mask(res: u32, dst: u32, m: u32) -> u32 {
    match m {
        255 => res,
        0 => dst,
        _ => {
            let r = unpack(res);
            let d = unpack(dst);
            let m_inv = 255 - m;
            pack(div255(core::array::from_fn(|i| r[i] * m + d[i] * m_inv)))
        }
    }
}

#[inline(always)]
fn clamp_div_255(v: i32) -> u32 {
    div_255(v.clamp(0, 255 * 255) as u32)
}

#[inline(always)]
fn union_alpha(sa: u32, da: u32) -> u32 {
    div_255(sa * 255 + da * (255 - sa))
}

macro_rules! compose {
    ($name:ident, $fa:expr, $fb:expr, $sat:expr) => {
        struct $name;

        impl $name {
            #[inline(always)]
            fn factors(sa: u32, da: u32) -> (u32, u32) {
                let fa: fn(u32, u32) -> u32 = $fa;
                let fb: fn(u32, u32) -> u32 = $fb;
                (fa(sa, da), fb(sa, da))
            }

            fn prgb32(dst: u32, src: u32) -> u32 {
                let s = unpack(src);
                let d = unpack(dst);
                let (fa, fb) = Self::factors(s[ALPHA], d[ALPHA]);
                let s = s.map(|c| c * fa);
                let d = d.map(|c| c * fb);
                if $sat {
                    pack(addus8(div255(s), div255(d)))
                } else {
                    pack(div255(core::array::from_fn(|i| s[i] + d[i])))
                }
            }

            fn a8(dst: u32, src: u32) -> u32 {
                let (sa, da) = (src >> 24, dst >> 24);
                let (fa, fb) = Self::factors(sa, da);
                let (s, d) = (sa * fa, da * fb);
                let a = if $sat {
                    scalar::addus8(div_255(s), div_255(d))
                } else {
                    div_255(s + d)
                };
                a.min(255) << 24
            }
        }
    };
}

compose!(SrcOver, |_, _| 255, |sa, _| 255 - sa, false);
compose!(SrcCopy, |_, _| 255, |_, _| 0, false);
compose!(SrcIn, |_, da| da, |_, _| 0, false);
compose!(SrcOut, |_, da| 255 - da, |_, _| 0, false);
compose!(SrcAtop, |_, da| da, |sa, _| 255 - sa, false);
compose!(DstOver, |_, da| 255 - da, |_, _| 255, false);
compose!(DstCopy, |_, _| 0, |_, _| 255, false);
compose!(DstIn, |_, _| 0, |sa, _| sa, false);
compose!(DstOut, |_, _| 0, |sa, _| 255 - sa, false);
compose!(DstAtop, |_, da| 255 - da, |sa, _| sa, false);
compose!(Xor, |_, da| 255 - da, |sa, _| 255 - sa, false);
compose!(Clear, |_, _| 0, |_, _| 0, false);
compose!(Plus, |_, _| 255, |_, _| 255, true);

/// Separable operators, `$color` is evaluated per color channel as `(s, d, sa, da)`.
///
/// Without an `$alpha` rule, the alpha channel uses `$color` evaluated on the alphas.
macro_rules! blend {
    ($name:ident, $color:expr) => {
        blend!($name, $color, |sa: u32, da: u32| {
            let color: fn(u32, u32, u32, u32) -> u32 = $color;
            color(sa, da, sa, da)
        });
    };
    ($name:ident, $color:expr, $alpha:expr) => {
        struct $name;

        impl $name {
            fn prgb32(dst: u32, src: u32) -> u32 {
                let color: fn(u32, u32, u32, u32) -> u32 = $color;
                let alpha: fn(u32, u32) -> u32 = $alpha;
                let s = unpack(src);
                let d = unpack(dst);
                let (sa, da) = (s[ALPHA], d[ALPHA]);
                pack([
                    color(s[0], d[0], sa, da),
                    color(s[1], d[1], sa, da),
                    color(s[2], d[2], sa, da),
                    alpha(sa, da),
                ])
            }

            fn a8(dst: u32, src: u32) -> u32 {
                let alpha: fn(u32, u32) -> u32 = $alpha;
                alpha(src >> 24, dst >> 24).min(255) << 24
            }
        }
    };
}

blend!(
    Minus,
    |s, d, _, da| (d.saturating_sub(s) + div_255(s * (255 - da))).min(255),
    |sa, da| da + div_255(sa * (255 - da))
);
blend!(Modulate, |s, d, _, _| div_255(s * d));
blend!(Multiply, |s, d, sa, da| {
    div_255(d * (s + 255 - sa) + s * (255 - da)).min(255)
});
blend!(Screen, |s, d, _, _| s + div_255(d * (255 - s)));
blend!(Overlay, |s, d, sa, da| {
    let [s, d, sa, da] = [s, d, sa, da].map(|v| v as i32);
    let sum = (d + s) * 255;
    let cross = d * sa + s * da - 2 * s * d;
    clamp_div_255(if 2 * d < da {
        sum - cross
    } else {
        sum + cross - sa * da
    })
});
blend!(Darken, |s, d, sa, da| {
    (d + div_255(s * (255 - da))).min(s + div_255(d * (255 - sa)))
});
blend!(Lighten, |s, d, sa, da| {
    (d + div_255(s * (255 - da))).max(s + div_255(d * (255 - sa)))
});
blend!(
    ColorDodge,
    |s, d, sa, da| {
        let [fs, fd, fsa, fda] = [s, d, sa, da].map(|v| v as f32);
        let dodge = (fd * fsa * fsa / (fsa - fs).max(0.001)).min(fsa * fda);
        div_255(dodge as u32 + s * (255 - da) + d * (255 - sa)).min(255)
    },
    union_alpha
);
blend!(
    ColorBurn,
    |s, d, sa, da| {
        let [fs, fd, fsa, fda] = [s, d, sa, da].map(|v| v as f32);
        let sada = fsa * fda;
        let burn = sada - sada.min((fda - fd) * fsa * fsa / fs.max(0.001));
        div_255(burn as u32 + s * (255 - da) + d * (255 - sa)).min(255)
    },
    union_alpha
);
blend!(LinearBurn, |s, d, sa, da| {
    (d as i32 + s as i32 - div_255(sa * da) as i32).clamp(0, 255) as u32
});
blend!(LinearLight, |s, d, sa, da| {
    let [s, d, sa, da] = [s, d, sa, da].map(|v| v as i32);
    let light = (d * sa + 2 * s * da - sa * da).clamp(0, sa * da);
    clamp_div_255(light + s * (255 - da) + d * (255 - sa))
});
blend!(PinLight, |s, d, sa, da| {
    let [s, d, sa, da] = [s, d, sa, da].map(|v| v as i32);
    let sum = (d + s) * 255;
    let darker = sum - s * da;
    let lighter = sum + s * da - d * sa;
    clamp_div_255(if 2 * s <= sa {
        darker.min(lighter)
    } else {
        darker.max(lighter - da * sa)
    })
});
blend!(HardLight, |s, d, sa, da| {
    let [s, d, sa, da] = [s, d, sa, da].map(|v| v as i32);
    let sum = (d + s) * 255;
    let cross = d * sa + s * da - 2 * s * d;
    clamp_div_255(if 2 * s < sa {
        sum - cross
    } else {
        sum + cross - sa * da
    })
});
blend!(
    SoftLight,
    |s, d, sa, da| {
        let [s, d, sa, da] = [s, d, sa, da].map(|v| v as f32 / 255.0);
        let dc = d / da.max(0.001);
        let k = 2.0 * s - sa;
        let x = if k <= 0.0 {
            dc * (1.0 - dc)
        } else if 4.0 * dc <= 1.0 {
            ((16.0 * dc - 12.0) * dc + 4.0) * dc - dc
        } else {
            dc.sqrt() - dc
        };
        let v = d + s * (1.0 - da) + k * da * x;
        (v * 255.0).round().clamp(0.0, 255.0) as u32
    },
    union_alpha
);
blend!(
    Difference,
    |s, d, sa, da| (d + s).saturating_sub(2 * div_255((s * da).min(d * sa))),
    |sa, da| da + sa - div_255(sa * da)
);
blend!(
    Exclusion,
    |s, d, _, _| (d + s).saturating_sub(2 * div_255(s * d)),
    |sa, da| da + sa - div_255(sa * da)
);

/// The inverse of the destination alpha, with the color channels set to that same value.
struct AlphaInv;

impl AlphaInv {
    fn prgb32(dst: u32, _: u32) -> u32 {
        (255 - (dst >> 24)) * 0x0101_0101
    }

    fn a8(dst: u32, _: u32) -> u32 {
        (255 - (dst >> 24)) << 24
    }
}

macro_rules! kernels {
    ($($op:ident),* $(,)?) => {
        [$(CompOpKernel {
            op: CompOpExt::$op,
            prgb32: $op::prgb32,
            a8: $op::a8,
        }),*]
    };
}

static KERNELS: [CompOpKernel; CompOpExt::COUNT] = kernels![
    SrcOver,
    SrcCopy,
    SrcIn,
    SrcOut,
    SrcAtop,
    DstOver,
    DstCopy,
    DstIn,
    DstOut,
    DstAtop,
    Xor,
    Clear,
    Plus,
    Minus,
    Modulate,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    LinearBurn,
    LinearLight,
    PinLight,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    AlphaInv,
];

#[cfg(test)]
mod tests {
    use super::*;

    const DST: u32 = 0xC060_3010;
    const SRC: u32 = 0x8040_2000;

    #[test]
    fn table_is_ordered_by_id() {
        for op in CompOpExt::ALL {
            assert_eq!(kernel(op).comp_op(), op);
        }
    }

    #[test]
    fn src_over_half_white_on_black() {
        let k = kernel(CompOpExt::SrcOver);
        assert_eq!(k.prgb32(0xFF00_0000, 0x8080_8080), 0xFF80_8080);
        assert_eq!(k.a8(0x4000_0000, 0x8000_0000), 0xA000_0000);
    }

    #[test]
    fn porter_duff_extremes() {
        assert_eq!(kernel(CompOpExt::Clear).prgb32(DST, SRC), 0);
        assert_eq!(kernel(CompOpExt::SrcCopy).prgb32(DST, SRC), SRC);
        assert_eq!(kernel(CompOpExt::DstCopy).prgb32(DST, SRC), DST);
        assert_eq!(kernel(CompOpExt::SrcIn).prgb32(0xFF00_0000, SRC), SRC);
        assert_eq!(kernel(CompOpExt::DstOut).prgb32(DST, 0xFF00_0000), 0);
        assert_eq!(kernel(CompOpExt::Xor).prgb32(0xFF00_0000, 0xFF00_0000), 0);
    }

    #[test]
    fn plus_saturates() {
        let k = kernel(CompOpExt::Plus);
        assert_eq!(k.prgb32(0xC0C0_C0C0, 0x8080_8080), 0xFFFF_FFFF);
        assert_eq!(k.a8(0x1000_0000, 0x2000_0000), 0x3000_0000);
    }

    #[test]
    fn blend_modes_with_transparent_source_keep_destination() {
        for op in CompOpExt::ALL {
            if matches!(
                op,
                CompOpExt::SrcCopy
                    | CompOpExt::SrcIn
                    | CompOpExt::DstIn
                    | CompOpExt::DstAtop
                    | CompOpExt::SrcOut
                    | CompOpExt::Clear
                    | CompOpExt::Modulate
                    | CompOpExt::AlphaInv
            ) {
                continue;
            }
            assert_eq!(kernel(op).prgb32(DST, 0), DST, "{op}");
        }
    }

    #[test]
    fn blend_modes_on_transparent_destination_return_source() {
        for op in [
            CompOpExt::Multiply,
            CompOpExt::Screen,
            CompOpExt::Overlay,
            CompOpExt::Darken,
            CompOpExt::Lighten,
            CompOpExt::ColorDodge,
            CompOpExt::ColorBurn,
            CompOpExt::LinearLight,
            CompOpExt::PinLight,
            CompOpExt::HardLight,
            CompOpExt::SoftLight,
            CompOpExt::Difference,
            CompOpExt::Exclusion,
        ] {
            assert_eq!(kernel(op).prgb32(0, SRC), SRC, "{op}");
        }
    }

    #[test]
    fn multiply_and_screen_on_opaque() {
        let white = 0xFFFF_FFFF;
        let gray = 0xFF80_8080;
        assert_eq!(kernel(CompOpExt::Multiply).prgb32(white, gray), gray);
        assert_eq!(kernel(CompOpExt::Screen).prgb32(0xFF00_0000, gray), gray);
        assert_eq!(kernel(CompOpExt::Modulate).prgb32(gray, gray), 0xFF40_4040);
    }

    #[test]
    fn difference_of_opaque_colors() {
        let k = kernel(CompOpExt::Difference);
        assert_eq!(k.prgb32(0xFF20_8000, 0xFF80_2000), 0xFF60_6000);
    }

    #[test]
    fn alpha_inv_inverts() {
        let k = kernel(CompOpExt::AlphaInv);
        assert_eq!(k.a8(0x4000_0000, 0xFFFF_FFFF), 0xBF00_0000);
        assert_eq!(k.prgb32(0xFF12_3456, 0xFFFF_FFFF), 0);
    }

    #[test]
    fn mask_is_convex() {
        let res = 0xFF80_8080;
        let dst = 0xFF00_0000;
        assert_eq!(apply_mask(res, dst, 255), res);
        assert_eq!(apply_mask(res, dst, 0), dst);
        assert_eq!(apply_mask(res, dst, 128), 0xFF40_4040);
    }
}
