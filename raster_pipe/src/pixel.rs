// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed and unpacked pixels, and loading/storing them in destination rows.
//!
//! A packed pixel is a `u32` holding `a << 24 | r << 16 | g << 8 | b`. Unpacking widens every
//! channel into its own `u32` lane so that products of two channels and their sums can be
//! computed without overflowing into the neighbouring channel.

use raster_pipe_common::format::FormatExt;

use crate::util::scalar;

/// Channels of an unpacked pixel, ordered `[b, g, r, a]`.
pub type Unpacked = [u32; 4];

/// Index of the alpha lane in [`Unpacked`].
pub const ALPHA: usize = 3;

/// Widen a packed pixel.
#[inline(always)]
pub const fn unpack(p: u32) -> Unpacked {
    [p & 0xFF, (p >> 8) & 0xFF, (p >> 16) & 0xFF, p >> 24]
}

/// Narrow an unpacked pixel, saturating every lane at 255.
#[inline(always)]
pub fn pack(u: Unpacked) -> u32 {
    let [b, g, r, a] = u.map(|l| l.min(255));
    b | (g << 8) | (r << 16) | (a << 24)
}

/// [`scalar::div_255`] applied to every lane.
///
/// Exact for lanes holding a product of two 8-bit values or a sum of such products up to
/// `255 * 255`.
#[inline(always)]
pub fn div255(u: Unpacked) -> Unpacked {
    u.map(scalar::div_255)
}

/// Add two unpacked pixels, saturating every lane at 255.
#[inline(always)]
pub fn addus8(a: Unpacked, b: Unpacked) -> Unpacked {
    core::array::from_fn(|i| scalar::addus8(a[i], b[i]))
}

/// Alpha of a packed pixel.
#[inline(always)]
pub const fn alpha(p: u32) -> u32 {
    p >> 24
}

/// A destination format the compositor can write.
///
/// Loads widen the stored value to a packed pixel, A8 destinations keep their value in the
/// alpha byte.
pub(crate) trait DstFormat {
    const FORMAT: FormatExt;
    const BYTES_PER_PIXEL: usize;

    fn load(row: &[u8], x: usize) -> u32;
    fn store(row: &mut [u8], x: usize, pixel: u32);
}

pub(crate) struct Prgb32;
pub(crate) struct Xrgb32;
pub(crate) struct A8;

#[inline(always)]
fn load_u32(row: &[u8], x: usize) -> u32 {
    let o = x * 4;
    u32::from_ne_bytes([row[o], row[o + 1], row[o + 2], row[o + 3]])
}

#[inline(always)]
fn store_u32(row: &mut [u8], x: usize, pixel: u32) {
    let o = x * 4;
    row[o..o + 4].copy_from_slice(&pixel.to_ne_bytes());
}

impl DstFormat for Prgb32 {
    const FORMAT: FormatExt = FormatExt::Prgb32;
    const BYTES_PER_PIXEL: usize = 4;

    #[inline(always)]
    fn load(row: &[u8], x: usize) -> u32 {
        load_u32(row, x)
    }

    #[inline(always)]
    fn store(row: &mut [u8], x: usize, pixel: u32) {
        store_u32(row, x, pixel);
    }
}

impl DstFormat for Xrgb32 {
    const FORMAT: FormatExt = FormatExt::Xrgb32;
    const BYTES_PER_PIXEL: usize = 4;

    #[inline(always)]
    fn load(row: &[u8], x: usize) -> u32 {
        load_u32(row, x) | 0xFF00_0000
    }

    #[inline(always)]
    fn store(row: &mut [u8], x: usize, pixel: u32) {
        store_u32(row, x, pixel | 0xFF00_0000);
    }
}

impl DstFormat for A8 {
    const FORMAT: FormatExt = FormatExt::A8;
    const BYTES_PER_PIXEL: usize = 1;

    #[inline(always)]
    fn load(row: &[u8], x: usize) -> u32 {
        u32::from(row[x]) << 24
    }

    #[inline(always)]
    fn store(row: &mut [u8], x: usize, pixel: u32) {
        row[x] = (pixel >> 24) as u8;
    }
}

/// Read pixel `x` of a source row stored in `format` as premultiplied ARGB32.
///
/// `XRGB32` and `FRGB32` sources are opaque, `A8` sources are replicated into every channel
/// and `ZERO32` sources are read like `PRGB32`.
#[inline(always)]
pub(crate) fn load_src(format: FormatExt, row: &[u8], x: usize) -> u32 {
    match format {
        FormatExt::A8 => u32::from(row[x]) * 0x0101_0101,
        FormatExt::Xrgb32 | FormatExt::Frgb32 => load_u32(row, x) | 0xFF00_0000,
        FormatExt::Prgb32 | FormatExt::Zero32 | FormatExt::None => load_u32(row, x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trip() {
        for byte in 0..4 {
            let shift = byte * 8;
            for v in 0..=255_u32 {
                for o in 0..=255_u32 {
                    let others = [o, o ^ 0xA5, 255 - o]
                        .iter()
                        .zip((0..4).filter(|&b| b != byte))
                        .fold(0, |acc, (c, b)| acc | (c << (b * 8)));
                    let p = others | (v << shift);
                    assert_eq!(pack(unpack(p)), p, "{p:#010x}");
                    assert_eq!(unpack(p)[byte as usize], v);
                }
            }
        }
        assert_eq!(unpack(0x8040_2010), [0x10, 0x20, 0x40, 0x80]);
    }

    #[test]
    fn lane_arithmetic() {
        let a = unpack(0x80FF_1020);
        assert_eq!(addus8(a, a), [0x40, 0x20, 0xFF, 0xFF]);
        assert_eq!(div255([255 * 255, 128 * 255, 0, 255 * 2]), [255, 128, 0, 2]);
        assert_eq!(pack([0x100, 0x20, 0x3FF, 0x80]), 0x80FF_20FF);
    }

    #[test]
    fn destination_formats() {
        let mut row = [0_u8; 8];
        Xrgb32::store(&mut row, 1, 0x0012_3456);
        assert_eq!(Prgb32::load(&row, 1), 0xFF12_3456);
        assert_eq!(Xrgb32::load(&[1, 2, 3, 0], 0), 0xFF03_0201);

        let mut a8 = [0_u8; 2];
        A8::store(&mut a8, 1, 0x7F00_0000);
        assert_eq!(a8, [0, 0x7F]);
        assert_eq!(A8::load(&a8, 1), 0x7F00_0000);
    }

    #[test]
    fn source_formats() {
        let row = 0x8011_2233_u32.to_ne_bytes();
        assert_eq!(load_src(FormatExt::Prgb32, &row, 0), 0x8011_2233);
        assert_eq!(load_src(FormatExt::Xrgb32, &row, 0), 0xFF11_2233);
        assert_eq!(load_src(FormatExt::A8, &[0, 0x40], 1), 0x4040_4040);
    }
}
