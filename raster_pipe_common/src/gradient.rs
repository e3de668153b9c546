// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gradient lookup tables.

use peniko::{Color, ColorStop};

use crate::format::FormatExt;

/// Premultiplied color ramp sampled at a power of two number of positions.
///
/// The table is kept in two precisions: 8-bit channels for nearest lookups and 16-bit channels
/// for dithered lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GradientLut {
    prgb32: Vec<u32>,
    prgb64: Vec<u64>,
    format: FormatExt,
}

impl GradientLut {
    /// Sample `stops` at `size` positions, where `size` is rounded up to a power of two.
    ///
    /// Entry `i` holds the color at offset `i / (size - 1)`. Stops must be sorted by offset;
    /// an empty stop list produces a transparent ramp.
    pub fn from_stops(stops: &[ColorStop], size: usize) -> Self {
        let size = size.max(2).next_power_of_two();
        let mut prgb32 = Vec::with_capacity(size);
        let mut prgb64 = Vec::with_capacity(size);

        let last = (size - 1) as f64;
        let mut stop = 0;
        for i in 0..size {
            let t = i as f64 / last;
            while stop + 1 < stops.len() && f64::from(stops[stop + 1].offset) <= t {
                stop += 1;
            }
            let rgba16 = match stops.get(stop) {
                None => [0; 4],
                Some(s) if stop + 1 == stops.len() || t <= f64::from(s.offset) => {
                    expand(s.color)
                }
                Some(s) => {
                    let next = &stops[stop + 1];
                    let span = f64::from(next.offset - s.offset);
                    let w = if span > 0.0 {
                        (t - f64::from(s.offset)) / span
                    } else {
                        1.0
                    };
                    lerp(expand(s.color), expand(next.color), w)
                }
            };
            let p64 = premultiply_rgba16(rgba16);
            prgb64.push(p64);
            prgb32.push(narrow(p64));
        }

        let opaque = !stops.is_empty() && stops.iter().all(|s| s.color.a == 255);
        Self {
            prgb32,
            prgb64,
            format: if opaque {
                FormatExt::Frgb32
            } else {
                FormatExt::Prgb32
            },
        }
    }

    /// A table size suited to `stops`, following how many transitions they contain.
    pub fn optimal_size(stops: &[ColorStop]) -> usize {
        match stops {
            [] | [_] => 256,
            [a, b] if b.offset - a.offset >= 0.998 => 256,
            [_, _] => 512,
            [a, b, c] if a.offset <= 0.002 && b.offset == 0.5 && c.offset >= 0.998 => 512,
            _ => 1024,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.prgb32.len()
    }

    /// Always `false`, tables have at least two entries.
    pub fn is_empty(&self) -> bool {
        self.prgb32.is_empty()
    }

    /// Entries as premultiplied ARGB32.
    pub fn prgb32(&self) -> &[u32] {
        &self.prgb32
    }

    /// Entries as premultiplied 16-bit per channel ARGB64, alpha in the top 16 bits.
    pub fn prgb64(&self) -> &[u64] {
        &self.prgb64
    }

    /// `FRGB32` if every stop is opaque, `PRGB32` otherwise.
    pub fn format(&self) -> FormatExt {
        self.format
    }
}

/// Straight color as `[r, g, b, a]` with 16-bit channels.
fn expand(color: Color) -> [u32; 4] {
    [color.r, color.g, color.b, color.a].map(|c| u32::from(c) * 257)
}

fn lerp(a: [u32; 4], b: [u32; 4], w: f64) -> [u32; 4] {
    core::array::from_fn(|i| {
        let v = f64::from(a[i]) + (f64::from(b[i]) - f64::from(a[i])) * w;
        (v + 0.5).clamp(0.0, 65535.0) as u32
    })
}

fn premultiply_rgba16([r, g, b, a]: [u32; 4]) -> u64 {
    let mul = |c: u32| u64::from((c * a + 32767) / 65535);
    (u64::from(a) << 48) | (mul(r) << 32) | (mul(g) << 16) | mul(b)
}

fn narrow(p64: u64) -> u32 {
    let channel = |shift: u32| {
        let c = ((p64 >> shift) & 0xFFFF) as u32;
        (c + 128 - ((c + 128) >> 8)) >> 8
    };
    (channel(48) << 24) | (channel(32) << 16) | (channel(16) << 8) | channel(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(offset: f32, r: u8, g: u8, b: u8, a: u8) -> ColorStop {
        ColorStop {
            offset,
            color: Color::rgba8(r, g, b, a),
        }
    }

    #[test]
    fn endpoints_match_stops() {
        let stops = [stop(0.0, 255, 0, 0, 255), stop(1.0, 0, 0, 255, 255)];
        let lut = GradientLut::from_stops(&stops, 256);
        assert_eq!(lut.len(), 256);
        assert_eq!(lut.prgb32()[0], 0xFFFF_0000);
        assert_eq!(lut.prgb32()[255], 0xFF00_00FF);
        assert_eq!(lut.prgb64()[0], 0xFFFF_FFFF_0000_0000);
        assert_eq!(lut.format(), FormatExt::Frgb32);
    }

    #[test]
    fn monotonic_ramp() {
        let stops = [stop(0.0, 0, 0, 0, 255), stop(1.0, 255, 255, 255, 255)];
        let lut = GradientLut::from_stops(&stops, 256);
        for (i, pair) in lut.prgb32().windows(2).enumerate() {
            assert!(pair[0] & 0xFF <= pair[1] & 0xFF, "entry {i}");
        }
        // A 256 entry table over 0..=255 hits every value exactly.
        assert_eq!(lut.prgb32()[128], 0xFF80_8080);
    }

    #[test]
    fn sizes_round_up_to_powers_of_two() {
        let stops = [
            stop(0.0, 0, 0, 0, 255),
            stop(0.5, 0, 255, 0, 255),
            stop(1.0, 0, 0, 0, 255),
        ];
        let lut = GradientLut::from_stops(&stops, 3);
        assert_eq!(lut.len(), 4);
        assert_eq!(lut.prgb32()[0], 0xFF00_0000);
        assert_eq!(lut.prgb32()[3], 0xFF00_0000);

        let lut = GradientLut::from_stops(&stops, 5);
        assert_eq!(lut.len(), 8);
        let mid = GradientLut::from_stops(&stops, 256 + 1);
        assert_eq!(mid.len(), 512);
    }

    #[test]
    fn translucent_stops_are_premultiplied() {
        let stops = [stop(0.0, 255, 255, 255, 128), stop(1.0, 255, 255, 255, 128)];
        let lut = GradientLut::from_stops(&stops, 2);
        assert_eq!(lut.prgb32()[0], 0x8080_8080);
        assert_eq!(lut.format(), FormatExt::Prgb32);
    }

    #[test]
    fn optimal_sizes() {
        let two = [stop(0.0, 0, 0, 0, 255), stop(1.0, 0, 0, 0, 255)];
        assert_eq!(GradientLut::optimal_size(&two), 256);
        let short = [stop(0.2, 0, 0, 0, 255), stop(0.6, 0, 0, 0, 255)];
        assert_eq!(GradientLut::optimal_size(&short), 512);
        let four = [two[0], two[0], two[1], two[1]];
        assert_eq!(GradientLut::optimal_size(&four), 1024);
    }
}
