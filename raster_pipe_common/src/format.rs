// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel formats as seen by the pipeline.

use core::fmt;
use core::ops::BitOr;

/// Pixel format, including internal formats used only to drive simplification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FormatExt {
    /// No format, used by results that never touch pixels.
    #[default]
    None = 0,
    /// 32-bit premultiplied ARGB.
    Prgb32 = 1,
    /// 32-bit RGB; the alpha byte is undefined and read as `0xFF`.
    Xrgb32 = 2,
    /// 8-bit alpha only.
    A8 = 3,
    /// 32-bit premultiplied ARGB that is known to be fully opaque.
    Frgb32 = 4,
    /// 32-bit premultiplied ARGB that is known to be fully transparent.
    Zero32 = 5,
}

impl FormatExt {
    /// Number of format ids, including the internal ones.
    pub const COUNT: usize = 6;

    /// All formats in id order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::None,
        Self::Prgb32,
        Self::Xrgb32,
        Self::A8,
        Self::Frgb32,
        Self::Zero32,
    ];

    /// Formats a caller may request as a destination.
    pub const DESTINATIONS: [Self; 3] = [Self::Prgb32, Self::Xrgb32, Self::A8];

    /// Decode a format id.
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Prgb32),
            2 => Some(Self::Xrgb32),
            3 => Some(Self::A8),
            4 => Some(Self::Frgb32),
            5 => Some(Self::Zero32),
            _ => None,
        }
    }

    /// The id of this format.
    #[inline(always)]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Static information about this format.
    #[inline]
    pub const fn info(self) -> &'static FormatInfo {
        &FORMAT_INFO[self as usize]
    }

    /// Bytes occupied by a single pixel.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        (self.info().depth / 8) as usize
    }

    /// Whether the format only exists to drive simplification.
    pub const fn is_internal(self) -> bool {
        matches!(self, Self::Frgb32 | Self::Zero32)
    }
}

impl fmt::Display for FormatExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Prgb32 => "PRGB32",
            Self::Xrgb32 => "XRGB32",
            Self::A8 => "A8",
            Self::Frgb32 => "FRGB32",
            Self::Zero32 => "ZERO32",
        };
        f.write_str(name)
    }
}

/// Format flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FormatFlags(u32);

impl FormatFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// The format has RGB components.
    pub const RGB: Self = Self(0x0000_0001);
    /// The format has an alpha component.
    pub const ALPHA: Self = Self(0x0000_0002);
    /// Both RGB and alpha.
    pub const RGBA: Self = Self(0x0000_0003);
    /// The RGB components are premultiplied by alpha.
    pub const PREMULTIPLIED: Self = Self(0x0000_0100);
    /// Every component is byte aligned.
    pub const BYTE_ALIGNED: Self = Self(0x0001_0000);
    /// Some bits of a pixel are undefined (the alpha byte of XRGB32).
    pub const UNDEFINED_BITS: Self = Self(0x0002_0000);

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether all flags in `other` are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for FormatFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Layout of a pixel format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatInfo {
    /// Bits per pixel.
    pub depth: u32,
    /// Format flags.
    pub flags: FormatFlags,
    /// Component sizes in bits, in `[r, g, b, a]` order.
    pub sizes: [u8; 4],
    /// Component shifts, in `[r, g, b, a]` order.
    pub shifts: [u8; 4],
}

impl FormatInfo {
    const fn argb32(flags: FormatFlags) -> Self {
        Self {
            depth: 32,
            flags,
            sizes: [8, 8, 8, 8],
            shifts: [16, 8, 0, 24],
        }
    }
}

const PRGB32_FLAGS: FormatFlags = FormatFlags::RGBA
    .union(FormatFlags::PREMULTIPLIED)
    .union(FormatFlags::BYTE_ALIGNED);

static FORMAT_INFO: [FormatInfo; FormatExt::COUNT] = [
    FormatInfo {
        depth: 0,
        flags: FormatFlags::NONE,
        sizes: [0; 4],
        shifts: [0; 4],
    },
    FormatInfo::argb32(PRGB32_FLAGS),
    FormatInfo {
        depth: 32,
        flags: FormatFlags::RGB
            .union(FormatFlags::BYTE_ALIGNED)
            .union(FormatFlags::UNDEFINED_BITS),
        sizes: [8, 8, 8, 0],
        shifts: [16, 8, 0, 0],
    },
    FormatInfo {
        depth: 8,
        flags: FormatFlags::ALPHA.union(FormatFlags::BYTE_ALIGNED),
        sizes: [0, 0, 0, 8],
        shifts: [0, 0, 0, 0],
    },
    FormatInfo::argb32(PRGB32_FLAGS),
    FormatInfo::argb32(PRGB32_FLAGS),
];

/// Classify a non-premultiplied ARGB32 color: `ZERO32` if it is all zero, `FRGB32` if it
/// is opaque and `PRGB32` otherwise.
pub const fn format_from_rgba32(argb32: u32) -> FormatExt {
    if argb32 == 0 {
        FormatExt::Zero32
    } else if argb32 >= 0xFF00_0000 {
        FormatExt::Frgb32
    } else {
        FormatExt::Prgb32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for format in FormatExt::ALL {
            assert_eq!(FormatExt::from_u32(format.id()), Some(format));
        }
        assert_eq!(FormatExt::from_u32(6), None);
    }

    #[test]
    fn bytes_per_pixel() {
        assert_eq!(FormatExt::None.bytes_per_pixel(), 0);
        assert_eq!(FormatExt::Prgb32.bytes_per_pixel(), 4);
        assert_eq!(FormatExt::Xrgb32.bytes_per_pixel(), 4);
        assert_eq!(FormatExt::A8.bytes_per_pixel(), 1);
        assert_eq!(FormatExt::Zero32.bytes_per_pixel(), 4);
    }

    #[test]
    fn xrgb_has_undefined_alpha() {
        let info = FormatExt::Xrgb32.info();
        assert!(info.flags.contains(FormatFlags::UNDEFINED_BITS));
        assert!(!info.flags.contains(FormatFlags::ALPHA));
        assert!(FormatExt::Prgb32.info().flags.contains(FormatFlags::PREMULTIPLIED));
    }

    #[test]
    fn classify_rgba32() {
        assert_eq!(format_from_rgba32(0), FormatExt::Zero32);
        assert_eq!(format_from_rgba32(0xFF12_3456), FormatExt::Frgb32);
        assert_eq!(format_from_rgba32(0x80FF_FFFF), FormatExt::Prgb32);
        // Transparent but with color bits set is not the zero hint.
        assert_eq!(format_from_rgba32(0x00FF_FFFF), FormatExt::Prgb32);
    }
}
